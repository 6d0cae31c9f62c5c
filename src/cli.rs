//! Command-line entrypoint for the `hexpand` tool.
//!
//! Reads a typed crate serialized as JSON, runs the expansion pipeline over it
//! and prints or writes the expanded crate.

use crate::compiler_messages::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_messages::display_messages::print_compiler_messages;
use crate::hir::hir_display::display_crate;
use crate::hir::hir_nodes::Crate;
use crate::hir_expand::{ExpansionReport, Flag, expand_crate};
use crate::settings::{DEFAULT_CONFIG_FILE, load_config};
use saying::say;
use std::path::Path;
use std::process::ExitCode;
use std::{env, fs};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Expand {
        input: String,
        options: ExpandOptions,
    },

    Help,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ExpandOptions {
    config: Option<String>,
    emit: Option<String>,
    dump: bool,
}

pub fn start_cli() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help(false);
        return ExitCode::SUCCESS;
    }

    let command = match get_command(&args[1..]) {
        Ok(command) => command,
        Err(e) => {
            say!(Red e);
            print_help(true);
            return ExitCode::FAILURE;
        }
    };

    let flags = get_flags(&args);

    match command {
        Command::Help => {
            print_help(false);
            ExitCode::SUCCESS
        }

        Command::Expand { input, options } => run_expand(&input, &options, &flags),
    }
}

fn run_expand(input: &str, options: &ExpandOptions, flags: &[Flag]) -> ExitCode {
    let config_path = options.config.as_deref().unwrap_or(DEFAULT_CONFIG_FILE);
    let config = match load_config(Path::new(config_path)) {
        Ok(config) => config,
        Err(e) => {
            print_compiler_messages(CompilerMessages::from_error(e, Vec::new()), false);
            return ExitCode::FAILURE;
        }
    };

    let show_warnings = config.output.warnings && !flags.contains(&Flag::DisableWarnings);

    let mut krate = match read_crate(Path::new(input)) {
        Ok(krate) => krate,
        Err(e) => {
            print_compiler_messages(CompilerMessages::from_error(e, Vec::new()), show_warnings);
            return ExitCode::FAILURE;
        }
    };

    let report = match expand_crate(&mut krate, &config, flags) {
        Ok(report) => report,
        Err(messages) => {
            print_compiler_messages(messages, show_warnings);
            return ExitCode::FAILURE;
        }
    };

    if !flags.contains(&Flag::DisableTimers) {
        print_report(&report);
    }
    print_compiler_messages(
        CompilerMessages {
            errors: Vec::new(),
            warnings: report.warnings,
        },
        show_warnings,
    );

    if options.dump {
        println!("{}", display_crate(&krate));
    }

    if let Some(output) = &options.emit {
        if let Err(e) = write_crate(&krate, Path::new(output)) {
            print_compiler_messages(CompilerMessages::from_error(e, Vec::new()), false);
            return ExitCode::FAILURE;
        }
        say!(Green "Wrote expanded crate to ", Bright output);
    }

    ExitCode::SUCCESS
}

pub fn read_crate(path: &Path) -> Result<Crate, CompilerError> {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => return Err(CompilerError::file_error(path, e.to_string())),
    };

    serde_json::from_str(&source)
        .map_err(|e| CompilerError::file_error(path, format!("Not a valid serialized crate: {e}")))
}

pub fn write_crate(krate: &Crate, path: &Path) -> Result<(), CompilerError> {
    let json = serde_json::to_string_pretty(krate)
        .map_err(|e| CompilerError::compiler_error(format!("Could not serialize crate: {e}")))?;

    fs::write(path, json).map_err(|e| CompilerError::file_error(path, e.to_string()))
}

fn print_report(report: &ExpansionReport) {
    say!(Green Bold "\nExpansion summary");
    say!("  Bindings annotated:   ", Yellow report.bindings_annotated);
    say!("  Closures expanded:    ", Yellow report.closures_expanded);
    say!("  Dispatch normalized:  ", Yellow report.dispatch_sites_normalized);
    say!("  Reborrows inserted:   ", Yellow report.reborrows_inserted);
    say!(
        "  Erased types:         ",
        Blue report.erased_static, " static, ",
        Blue report.erased_dynamic, " boxed, ",
        Blue report.erased_dropped, " dropped"
    );
}

fn get_command(args: &[String]) -> Result<Command, String> {
    let Some(first) = args.first().map(String::as_str) else {
        return Ok(Command::Help);
    };

    if matches!(first, "help" | "--help" | "-h") {
        return Ok(Command::Help);
    }

    let mut input = None;
    let mut options = ExpandOptions::default();
    let mut index = 0usize;

    while let Some(arg) = args.get(index) {
        match arg.as_str() {
            "--config" | "--emit" => {
                let Some(value) = args.get(index + 1).filter(|value| !value.starts_with("--")) else {
                    return Err(format!("Missing value for {arg}"));
                };
                if arg == "--config" {
                    options.config = Some(value.to_owned());
                } else {
                    options.emit = Some(value.to_owned());
                }
                index += 2;
            }
            "--dump" => {
                options.dump = true;
                index += 1;
            }
            "--sequential" | "--disable-warnings" | "--disable-timers" => {
                index += 1;
            }
            _ if arg.starts_with("--") => {
                return Err(format!("Unknown flag: '{arg}'"));
            }
            _ => {
                if input.is_some() {
                    return Err(String::from("Only one input crate can be expanded at a time."));
                }
                input = Some(arg.to_owned());
                index += 1;
            }
        }
    }

    match input {
        Some(input) => Ok(Command::Expand { input, options }),
        None => Err(String::from("Missing input crate (a .json file)")),
    }
}

fn get_flags(args: &[String]) -> Vec<Flag> {
    let mut flags = Vec::new();

    for arg in args {
        match arg.as_str() {
            "--sequential" => flags.push(Flag::Sequential),
            "--disable-warnings" => flags.push(Flag::DisableWarnings),
            "--disable-timers" => flags.push(Flag::DisableTimers),
            _ => {}
        }
    }

    flags
}

fn print_help(commands_only: bool) {
    if !commands_only {
        say!(Bright Black "------------------------------------");
        say!(Green Bold "hexpand - HIR expansion stage");
        say!("Usage: ", Bold "hexpand ", Italic "<crate.json> [flags]");
    }

    say!(Green Bold "\nFlags:");
    say!("  --config <file>      (default: ", DEFAULT_CONFIG_FILE, ")");
    say!("  --emit <file>        Write the expanded crate as JSON");
    say!("  --dump               Print the expanded crate");
    say!("  --sequential         Don't process functions in parallel");
    say!("  --disable-warnings");
    say!("  --disable-timers");
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;

//! Tests for CLI argument parsing and crate JSON input/output.

use super::{Command, ExpandOptions, get_command, get_flags, read_crate, write_crate};
use crate::compiler_messages::compiler_errors::ErrorType;
use crate::hir::hir_builder::{BodyBuilder, block, function, function_item, int};
use crate::hir::hir_nodes::Crate;
use crate::hir_expand::Flag;

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn input_path_with_default_options() {
    let command = get_command(&args(&["demo.json"])).expect("command should parse");
    assert_eq!(
        command,
        Command::Expand {
            input: String::from("demo.json"),
            options: ExpandOptions::default(),
        }
    );
}

#[test]
fn config_emit_and_dump_options() {
    let command = get_command(&args(&[
        "demo.json",
        "--config",
        "custom.toml",
        "--emit",
        "out.json",
        "--dump",
        "--sequential",
    ]))
    .expect("command should parse");

    assert_eq!(
        command,
        Command::Expand {
            input: String::from("demo.json"),
            options: ExpandOptions {
                config: Some(String::from("custom.toml")),
                emit: Some(String::from("out.json")),
                dump: true,
            },
        }
    );
}

#[test]
fn option_values_are_required() {
    let error = get_command(&args(&["demo.json", "--emit"])).expect_err("missing value");
    assert!(error.contains("Missing value for --emit"));

    let error =
        get_command(&args(&["demo.json", "--config", "--dump"])).expect_err("flag is not a value");
    assert!(error.contains("Missing value for --config"));
}

#[test]
fn unknown_flags_and_extra_inputs_are_rejected() {
    let error = get_command(&args(&["demo.json", "--wat"])).expect_err("unknown flag");
    assert!(error.contains("Unknown flag"));

    let error = get_command(&args(&["a.json", "b.json"])).expect_err("two inputs");
    assert!(error.contains("Only one input crate"));

    let error = get_command(&args(&["--dump"])).expect_err("no input");
    assert!(error.contains("Missing input crate"));
}

#[test]
fn help_command() {
    assert_eq!(get_command(&args(&["help"])), Ok(Command::Help));
    assert_eq!(get_command(&args(&["--help"])), Ok(Command::Help));
}

#[test]
fn pipeline_flags_are_collected() {
    let flags = get_flags(&args(&[
        "hexpand",
        "demo.json",
        "--disable-timers",
        "--disable-warnings",
        "--sequential",
    ]));

    assert_eq!(
        flags,
        vec![Flag::DisableTimers, Flag::DisableWarnings, Flag::Sequential]
    );
}

#[test]
fn crate_json_survives_a_write_and_read() {
    let mut body = BodyBuilder::new();
    let (_, declare) = body.let_binding("x", false, int(4, 2), 2);
    let root = block(vec![declare], None, 1);

    let mut krate = Crate::new("demo");
    krate.push_item(function_item(
        "demo::main",
        function(Vec::new(), root.ty.to_owned(), body.finish(root)),
        1,
    ));

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("demo.json");
    write_crate(&krate, &path).expect("crate should serialize");

    let read_back = read_crate(&path).expect("crate should deserialize");
    assert_eq!(read_back, krate);
}

#[test]
fn invalid_json_is_a_file_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ \"name\": ").expect("write input");

    let error = read_crate(&path).expect_err("invalid json");
    assert_eq!(error.error_type, ErrorType::File);
    assert!(error.msg.contains("Not a valid serialized crate"));
}

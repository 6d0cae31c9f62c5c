use std::process::ExitCode;

fn main() -> ExitCode {
    hir_expand::cli::start_cli()
}

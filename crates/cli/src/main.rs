use std::process::ExitCode;

fn main() -> ExitCode {
    supportflow_cli::run()
}

use std::process::ExitCode;

fn main() -> ExitCode {
    wattson_cli::run()
}

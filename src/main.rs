use std::process::ExitCode;

fn main() -> ExitCode {
    topexpect::cli::run()
}

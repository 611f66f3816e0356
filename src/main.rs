use std::process::ExitCode;

fn main() -> ExitCode {
    pgfleet::run()
}

use std::process::ExitCode;

fn main() -> ExitCode {
    akservo_lib::cli::run()
}

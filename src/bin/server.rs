//! Mock API server binary.
//! Run with: cargo run --bin socratic-server

use std::process::ExitCode;

use socratic_mentor::start_socratic_mentor;

fn main() -> ExitCode {
    start_socratic_mentor::run()
}

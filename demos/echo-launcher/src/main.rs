//! `launchpad` command-line interface with the `echo` plugin linked in.

use std::process::ExitCode;

// Linked for its launcher registrations.
extern crate echo_launcher;

fn main() -> ExitCode {
    launchpad::runtime::cli::main()
}

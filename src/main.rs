//! mars-rs binary entry point.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use mars_rs::cli::{Cli, execute};

fn main() -> ExitCode {
    let cli = Cli::parse();
    mars_rs::init_tracing(cli.verbose);

    match execute(&cli) {
        Ok(output) => {
            if !output.is_empty() {
                let _ = write!(std::io::stdout().lock(), "{output}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let _ = writeln!(std::io::stderr().lock(), "Error: {e}");
            ExitCode::FAILURE
        }
    }
}

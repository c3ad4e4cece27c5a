//! Mermaid Check CLI - Validate Mermaid.js diagrams in Markdown
//!
//! Exit status: 0 when every diagram is valid (or there are none), 1 when
//! at least one diagram is invalid, 2 when the tool itself could not run.

mod cli;
mod inputs;
mod printer;

use clap::Parser;
use mermaid_check::{CheckError, Outcome};

fn main() {
    // Usage errors and a bare invocation exit here with clap's status 2
    let cli_args = cli::Cli::parse();

    let mut app = cli::CheckApp::new();

    let outcome = match app.run(cli_args) {
        Ok(outcome) => outcome,
        Err(e) => {
            match e.downcast_ref::<CheckError>() {
                Some(CheckError::Setup { .. }) => eprintln!("Setup error: {}", e),
                _ => eprintln!("Error: {:#}", e),
            }
            Outcome::OperationalError
        }
    };

    std::process::exit(outcome.exit_code());
}

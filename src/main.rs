// Flightcheck - Main entry point
use clap::Parser;
use flightcheck::cli::Cli;
use std::process;

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    };

    process::exit(exit_code);
}

use clap::Parser;
use signalbench::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}

// route -t/--tool to a tool; only dir-diff exists so far
// usage problems print to stderr but still exit 0

use anyhow::Context;
use clap::Parser;
use console::style;
use std::process;

use dirdiff::cli::Cli;
use dirdiff::error::{exit_code, format_error};

fn run(cli: &Cli) -> anyhow::Result<()> {
    let args = cli.dir_diff_args()?;
    let cwd = std::env::current_dir().context("failed to read the current directory")?;

    let path = dirdiff::dir_diff(&args, &cwd)?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    println!("{} {}", style("Report written:").green(), name);
    Ok(())
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("{}", format_error(&e));
        process::exit(exit_code(&e));
    }
}

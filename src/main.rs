use anyhow::Result;
use clap::Parser;
use std::io::{self, Write};
use tracing::{error, Level};

use visitchart::utils::setup_logging;
use visitchart::{init_default_template, render_page, Args, ReportError};

fn run(args: &Args) -> Result<()> {
    if args.init {
        init_default_template(args.template.as_deref())?;
        return Ok(());
    }

    let page = render_page(io::stdin().lock(), args.template.as_deref())?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(page.as_bytes())
        .map_err(ReportError::OutputWrite)?;
    stdout.flush().map_err(ReportError::OutputWrite)?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    setup_logging(args.verbose);

    if let Err(e) = run(&args) {
        if tracing::enabled!(Level::ERROR) {
            error!("Error: {:#}", e);
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

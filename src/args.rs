use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "visitchart",
    about = "Render the daily visitors of a JSON analytics report as an HTML page with an SVG chart",
    long_about = "Reads one JSON report from stdin and writes one HTML page to stdout.",
    version
)]
pub struct Args {
    /// Path to the HTML page template (defaults to ./template.html, then the built-in template)
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Enable verbose logging on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Write the built-in template to template.html (or --template) and exit
    #[arg(long)]
    pub init: bool,
}

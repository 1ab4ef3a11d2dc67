use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use footfall::report::{render_report, PersonRow};

#[derive(Parser, Debug)]
#[command(name = "report", about = "Render the paginated video analysis report")]
struct Args {
    /// Prose summary from the summarize stage
    #[arg(long, default_value = "analysis.txt")]
    summary: PathBuf,
    /// Per-person summary table input
    #[arg(long, default_value = "detections_summary.json")]
    people: PathBuf,
    #[arg(long, default_value = "video_analysis_report.pdf")]
    output: PathBuf,
    /// Directory holding the LiberationSans font files
    #[arg(long, default_value = "assets/fonts")]
    font_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> Result<()> {
    let summary_text = fs::read_to_string(&args.summary)
        .with_context(|| format!("failed to read {}", args.summary.display()))?;
    let raw = fs::read_to_string(&args.people)
        .with_context(|| format!("failed to read {}", args.people.display()))?;
    let people: HashMap<String, PersonRow> = serde_json::from_str(&raw)
        .with_context(|| format!("malformed person summary {}", args.people.display()))?;

    render_report(&summary_text, &people, &args.font_dir, &args.output)?;
    info!("report saved: {}", args.output.display());
    Ok(())
}

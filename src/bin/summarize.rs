use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use footfall::llm::{AzureSettings, AzureSummarizer, Summarizer};
use footfall::prompt::build_prompt;
use footfall::timeline::{summarize_frames, FrameRecord};

#[derive(Parser, Debug)]
#[command(
    name = "summarize",
    about = "Compress per-person movement data and generate a prose summary"
)]
struct Args {
    /// Frame-by-frame detection record from the tracking stage
    #[arg(long, default_value = "detections.json")]
    detections: PathBuf,
    /// Prose summary output
    #[arg(long, default_value = "analysis.txt")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();
    let client = AzureSummarizer::new(AzureSettings::from_env()?);
    run(args, &client).await
}

async fn run(args: Args, client: &dyn Summarizer) -> Result<()> {
    let raw = fs::read_to_string(&args.detections)
        .with_context(|| format!("failed to read {}", args.detections.display()))?;
    let frames: Vec<FrameRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("malformed detection record {}", args.detections.display()))?;

    let people = summarize_frames(&frames);
    info!(
        "compressed {} people from {} frames",
        people.len(),
        frames.len()
    );

    let prompt = build_prompt(&people)?;
    let summary = client.summarize(&prompt).await?;

    // written only after a successful response, so a failed call leaves no
    // partial artifact
    fs::write(&args.output, &summary)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("summary saved: {}", args.output.display());
    Ok(())
}

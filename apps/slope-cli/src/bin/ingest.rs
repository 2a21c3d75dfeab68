use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use slope_core::config::Settings;
use slope_rag::bootstrap::{ingest_service, open_indexes};

#[derive(Parser, Debug)]
#[command(name = "slope-ingest", about = "Extract, chunk and index a document directory")]
struct Args {
    /// Defaults to `data_dir` from the configuration.
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    slope_cli::init_logging();
    let args = Args::parse();
    let settings = Settings::load()?;
    let data_dir = args.data_dir.unwrap_or_else(|| settings.data_dir());

    let (lexical, vector) = open_indexes(&settings).await?;
    let service = ingest_service(&settings, lexical, vector)?;

    let pb = ProgressBar::new(0);
    pb.set_style(ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")?.progress_chars("=> "));
    let report = service.ingest_with_progress(&data_dir, &pb).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

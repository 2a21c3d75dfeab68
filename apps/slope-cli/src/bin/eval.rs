use clap::Parser;
use std::path::PathBuf;

use slope_core::config::Settings;
use slope_rag::eval::{load_questions, run_eval, write_report};

#[derive(Parser, Debug)]
#[command(name = "slope-eval", about = "Score retrieval against a JSONL question set")]
struct Args {
    /// One `{"question", "answers": [{"doc_id", "page"}]}` object per line.
    #[arg(long, default_value = "data/eval/questions.jsonl")]
    questions: PathBuf,
    /// Directory receiving `eval_results.json`.
    #[arg(long, default_value = "data/eval")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    slope_cli::init_logging();
    let args = Args::parse();
    let settings = Settings::load()?;
    let questions = load_questions(&args.questions)?;
    let app = slope_rag::bootstrap::build(&settings).await?;

    let report = run_eval(&app.pipeline, &questions).await?;
    let path = write_report(&report, &args.output)?;
    println!("{}", serde_json::to_string_pretty(&report.summary)?);
    println!("Results written to {}", path.display());
    Ok(())
}

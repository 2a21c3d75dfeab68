use clap::Parser;

use slope_core::config::Settings;

#[derive(Parser, Debug)]
#[command(name = "slope-ask", about = "Answer one question against the indexed documents")]
struct Args {
    question: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    slope_cli::init_logging();
    let args = Args::parse();
    let settings = Settings::load()?;
    let app = slope_rag::bootstrap::build(&settings).await?;
    let response = app.pipeline.run(&args.question).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

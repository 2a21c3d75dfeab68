use clap::Parser;

use slope_cli::server::{router, AppState};
use slope_core::config::Settings;

#[derive(Parser, Debug)]
#[command(name = "slope-server", about = "Serve the slope RAG pipeline over HTTP")]
struct Args {
    /// Overrides `host` from the configuration.
    #[arg(long)]
    host: Option<String>,
    /// Overrides `port` from the configuration.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    slope_cli::init_logging();
    let args = Args::parse();
    let settings = Settings::load()?;
    // models, indexes and the generator must be ready before we bind
    let app = slope_rag::bootstrap::build(&settings).await?;
    let state = AppState::new(app, settings.data_dir());

    let addr = format!("{}:{}", args.host.unwrap_or(settings.host), args.port.unwrap_or(settings.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

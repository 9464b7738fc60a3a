use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use legalrag::api::{router, ApiSettings};
use legalrag::config::init_tracing;
use legalrag::{AnswerArgs, ServiceArgs};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "legalrag-api",
    about = "HTTP API that answers legal questions grounded in the article index"
)]
struct ApiCli {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "LEGALRAG_BIND", default_value = "127.0.0.1:8080")]
    bind: String,

    /// Maximum result limit a client may request.
    #[arg(long, default_value_t = 15)]
    max_limit: usize,

    /// Max requests per minute allowed (0 disables rate limiting).
    #[arg(long, default_value_t = 60)]
    max_requests_per_minute: u32,

    /// Rate-limit burst size (tokens available instantly).
    #[arg(long, default_value_t = 6)]
    rate_limit_burst: u32,

    /// Enable verbose logging.
    #[arg(long, short, default_value_t = false)]
    verbose: bool,

    #[command(flatten)]
    services: ServiceArgs,

    #[command(flatten)]
    answer: AnswerArgs,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = ApiCli::parse();
    init_tracing(cli.verbose);

    // Blocking HTTP clients must be created and dropped outside the async runtime.
    let assistant = Arc::new(cli.services.build_assistant(cli.answer.assistant_config())?);
    let app = router(
        Arc::clone(&assistant),
        ApiSettings {
            max_limit: cli.max_limit,
            max_requests_per_minute: cli.max_requests_per_minute,
            rate_limit_burst: cli.rate_limit_burst,
        },
    );
    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    runtime.block_on(serve(addr, app))?;
    drop(runtime);
    drop(assistant);
    Ok(())
}

async fn serve(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("legalrag-api listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server shutdown")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {err}");
    }
}

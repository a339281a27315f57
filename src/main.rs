use anyhow::Context;
use code_feedback::analyzer::MockAnalyzer;
use code_feedback::server::{run_until_signal, shutdown_signal, Server};
use code_feedback::{app, AppConfig, AppState};
use tracing_subscriber::fmt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    // Initialise structured logging once; the subscriber lives for the whole process.
    fmt()
        .with_env_filter(config.env_filter()?)
        .with_writer(std::io::stderr)
        .init();

    let app = app(AppState::new(MockAnalyzer));

    let server = match Server::start(config.addr, app).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "error starting server");
            return Err(e).context("server failed to start");
        }
    };

    // Shutdown errors are logged by run_until_signal; exit normally regardless.
    let _ = run_until_signal(server, shutdown_signal(), config.shutdown_timeout).await;
    Ok(())
}

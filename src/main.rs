//! caido-mcp CLI binary entry point.

use caido_mcp::cli::{auth, Cli, Commands};
use caido_mcp::config::CaidoConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("caido_mcp=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();

    let mut config = CaidoConfig::from_env();
    if let Some(url) = cli.url {
        config.set_base_url(url);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted; cancelling");
            on_interrupt.cancel();
        }
    });

    let result = match cli.command {
        Commands::Login(args) => {
            auth::handle_login(&config, args.timeout, args.no_browser, &cancel).await
        }
        Commands::Token => auth::handle_token(&config, &cancel).await,
        Commands::Status => auth::handle_status(&config),
        Commands::Logout => auth::handle_logout(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

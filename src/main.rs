//! VoiceGit CLI binary entry point.

use std::io;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use voicegit::cli::errors::format_error_help;
use voicegit::cli::{commands, Cli, Commands};
use voicegit::config::{GatewayConfig, ProfileStore};
use voicegit::git::Git;
use voicegit::session::SessionExit;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = ProfileStore::new_default();
    let mut stdout = io::stdout();

    let result = match cli.command {
        Commands::Status => commands::handle_status(&Git::new(), &mut stdout).await,
        Commands::Diff => commands::handle_diff(&Git::new(), &mut stdout).await,
        Commands::Configure(args) => commands::handle_configure(
            &store,
            args.name,
            args.email,
            &mut io::stdin().lock(),
            &mut stdout,
        ),
        Commands::Greeter => commands::handle_greeter(&store, &mut stdout),
        Commands::Debug => commands::handle_debug(&store, &GatewayConfig::from_env(), &mut stdout),
        Commands::Chat(args) => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });
            match commands::handle_chat(&args, GatewayConfig::from_env(), &store, cancel).await {
                Ok(exit) => {
                    tracing::debug!(?exit, "chat ended");
                    // Stdin reads block a runtime thread; exit instead of waiting for it.
                    std::process::exit(if exit == SessionExit::Interrupted { 130 } else { 0 });
                }
                Err(err) => Err(err),
            }
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", format_error_help(&e));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "voicegit=debug" } else { "voicegit=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

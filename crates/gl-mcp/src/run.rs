//! Stdio entry point for an embedding binary

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::context::ClientAccessor;
use crate::error::Result;
use crate::logging;
use crate::server::{GitLabMcpServer, ServerOptions};
use crate::translations::{DEFAULT_DUMP_FILE, Translations};
use crate::transport::{TransportOptions, serve};

/// Serve MCP over the process's stdin and stdout until EOF, SIGINT or SIGTERM.
///
/// The caller builds `accessor` from [`ServerConfig::require_token`] and
/// [`ServerConfig::gitlab_host`].
pub async fn run_stdio(config: ServerConfig, accessor: Arc<dyn ClientAccessor>) -> Result<()> {
    logging::init(&config.logging_config())?;
    tracing::debug!(?config, "Loaded configuration");

    let translations = Arc::new(match &config.translations_file {
        Some(path) if path.exists() => Translations::from_file(path)?,
        _ => Translations::defaults(),
    });

    let server = GitLabMcpServer::new(
        accessor,
        env!("CARGO_PKG_VERSION"),
        config.read_only,
        translations.translator(),
        ServerOptions::default(),
    )?;

    // Every description has been resolved once the catalog exists.
    if config.export_translations {
        let path = config
            .translations_file
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_DUMP_FILE));
        translations.dump(path)?;
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal.cancel();
    });

    eprintln!("GitLab MCP Server running on stdio");

    let options = TransportOptions {
        log_commands: config.enable_command_logging,
    };
    let result = serve(
        Arc::new(server),
        tokio::io::stdin(),
        tokio::io::stdout(),
        options,
        shutdown,
    )
    .await;

    if let Err(e) = &result {
        tracing::error!(error = %e, "Transport stopped with an error");
    }
    result
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

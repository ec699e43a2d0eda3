//! # xbmcmd
//!
//! Command-line remote for an XBMC/Kodi media center. Talks JSON-RPC 2.0 over
//! HTTP to the server's web interface (`http://localhost:8080/jsonrpc` by
//! default).
//!
//! ## Usage
//!
//! ```text
//! xbmcmd                      interactive shell (XBMC> prompt)
//! xbmcmd movies               run one command and exit
//! xbmcmd --url http://htpc:8080/jsonrpc play inception
//! ```
//!
//! ## Architecture
//!
//! ```text
//! main.rs      — entry point, config loading, logging, startup handshake
//! config.rs    — clap CLI, TOML file and env-var configuration
//! rpc.rs       — JSON-RPC request/response types
//! commands.rs  — command schemas and request builder
//! client.rs    — HTTP transport (reqwest)
//! movies.rs    — movie records and the cached title index
//! session.rs   — command dispatch, resolution, output formatting
//! shell.rs     — rustyline loop with movie-title completion
//! ```

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use xbmcmd::client::HttpTransport;
use xbmcmd::config::{Cli, Config};
use xbmcmd::session::Session;
use xbmcmd::shell::{self, Editor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("xbmcmd: configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize tracing
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_filter))
        .with_writer(io::stderr)
        .init();

    let endpoint = config.endpoint();
    info!("xbmcmd v{} using {endpoint}", env!("CARGO_PKG_VERSION"));

    let transport = match HttpTransport::new(endpoint, config.credentials(), config.timeout()) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "failed to build HTTP client");
            eprintln!("xbmcmd: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut session = Session::new(transport);

    if let Err(e) = session.handshake().await {
        eprintln!("xbmcmd: cannot reach {}: {e}", session.transport().url());
        return ExitCode::FAILURE;
    }

    let mut stdout = io::stdout();
    let result = match cli.one_shot() {
        Some(line) => session
            .run_once(&line, &mut stdout)
            .await
            .map(|ok| if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }),
        None => run_shell(&mut session, &config.shell.prompt, &mut stdout).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("xbmcmd: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_shell(
    session: &mut Session<HttpTransport>,
    prompt: &str,
    out: &mut io::Stdout,
) -> io::Result<ExitCode> {
    let mut editor = Editor::new().map_err(io::Error::other)?;
    shell::run(session, &mut editor, prompt, out).await?;
    Ok(ExitCode::SUCCESS)
}

// crates/stillvo-server/src/main.rs
// ============================================================================
// Module: Stillvo Server Binary
// Description: Entry point for the digest trigger service.
// Purpose: Load configuration, build the server, and serve until shutdown.
// Dependencies: stillvo-config, stillvo-server, tokio
// ============================================================================

//! ## Overview
//! The binary loads configuration (explicit path argument, `STILLVO_CONFIG`,
//! or `stillvo.toml`), constructs the digest server, and serves the trigger
//! and health endpoints. Any startup failure prints one line to stderr and
//! exits nonzero.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use stillvo_config::StillvoConfig;
use stillvo_server::DigestServer;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Starts the digest trigger service.
#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match StillvoConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => return fail(&format!("failed to load config: {err}")),
    };
    let server = match DigestServer::from_config(&config) {
        Ok(server) => server,
        Err(err) => return fail(&format!("failed to start server: {err}")),
    };
    match server.serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(&format!("server stopped: {err}")),
    }
}

/// Prints a startup failure and returns a nonzero exit code.
fn fail(message: &str) -> ExitCode {
    let _ = writeln!(std::io::stderr(), "stillvo-server: {message}");
    ExitCode::FAILURE
}

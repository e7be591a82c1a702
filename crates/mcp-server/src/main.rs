//! Context Finder MCP Server
//!
//! Exposes the local code-intelligence index to AI agents over MCP.
//!
//! ## Tools
//!
//! - `index_codebase` - scan, chunk, embed, and index a project directory
//! - `search_code` - hybrid semantic + keyword search
//! - `find_symbol` - definitions and references for a symbol name
//! - `get_stats` - chunk counts by language/type and last indexed commit
//!
//! ## Usage
//!
//! Add to your MCP client configuration:
//! ```json
//! {
//!   "mcpServers": {
//!     "context-finder": {
//!       "command": "context-finder-mcp"
//!     }
//!   }
//! }
//! ```

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use context_search::QueryEngine;
use context_vector_store::{default_prefixes_for, LocalEmbedder};
use rmcp::transport::io::stdio;
use rmcp::ServiceExt;

mod config;
mod tools;

use config::Config;
use tools::ContextFinderService;

fn print_help() {
    println!("Context Finder MCP server");
    println!();
    println!("Usage: context-finder-mcp [--version|--help]");
    println!();
    println!("Configuration is read from the environment (PROJECT_ROOT, DATA_DIR,");
    println!("EMBEDDING_MODEL, EMBEDDING_DIMENSIONS, LOG_LEVEL); see README.");
    println!();
    println!("Flags:");
    println!("  --version      Print version and exit");
    println!("  --help         Print this help and exit");
}

/// Returns `Some(exit_code)` if a flag short-circuited startup.
fn handle_cli_args() -> Option<i32> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        return None;
    }

    if args.len() == 1 {
        match args[0].as_str() {
            "--version" | "-V" => {
                println!("context-finder-mcp {}", env!("CARGO_PKG_VERSION"));
                return Some(0);
            }
            "--help" | "-h" => {
                print_help();
                return Some(0);
            }
            _ => {}
        }
    }

    eprintln!("Unknown arguments: {}", args.join(" "));
    print_help();
    Some(2)
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Some(exit_code) = handle_cli_args() {
        std::process::exit(exit_code);
    }

    let config = Config::from_env();

    // Logging to stderr only; stdout is reserved for the MCP protocol.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .target(env_logger::Target::Stderr)
        .filter_module("ort", log::LevelFilter::Off) // Silence ONNX Runtime
        .init();

    log::info!(
        "Starting Context Finder MCP server (project_root={}, model={})",
        config.project_root.display(),
        config.embedding_model
    );

    let prefixes = default_prefixes_for(&config.embedding_model);
    let embedder = LocalEmbedder::load(&config.model_dir(), config.embedding_model.clone(), config.embedding_dimensions, prefixes)
        .context("failed to load embedding model")?;

    let engine = Arc::new(
        QueryEngine::initialize(&config.project_root, Arc::new(embedder))
            .await
            .context("failed to initialize query engine")?,
    );

    let service = ContextFinderService::new(engine).serve(stdio()).await?;
    service.waiting().await?;

    log::info!("Context Finder MCP server stopped");
    Ok(())
}

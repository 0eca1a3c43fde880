//! Nova ask server.
//!
//! Wires the engine from the environment: Groq clients for the four model
//! roles, the two JSON-RPC tool servers, a memory or SQLite session store,
//! and the background title worker. Start `math-server` and `joke-server`
//! first; an unreachable tool server fails startup.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use nova::service::AskService;
use nova::session::{MemorySessionStore, SessionStore, SqliteSessionStore};
use nova::title::{TitleGenerator, TitleWorker};
use nova::tool_source::{RpcToolSource, ToolRegistry, ToolSource};
use nova::{build_ask_graph, NovaConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = NovaConfig::from_env();

    let store: Arc<dyn SessionStore> = match &config.db_path {
        Some(path) => {
            tracing::info!(%path, "using SQLite session store");
            Arc::new(SqliteSessionStore::new(path)?)
        }
        None => {
            tracing::info!("using in-memory session store");
            Arc::new(MemorySessionStore::new())
        }
    };

    let math: Arc<dyn ToolSource> = Arc::new(RpcToolSource::connect(&config.math_server_url).await?);
    let joke: Arc<dyn ToolSource> = Arc::new(RpcToolSource::connect(&config.joke_server_url).await?);
    let registry = Arc::new(ToolRegistry::discover(vec![math, joke]).await?);

    let graph = build_ask_graph(
        Arc::new(config.router_client()),
        Arc::new(config.chat_client()),
        Arc::new(config.tool_client(registry.specs().to_vec())),
        registry,
    )?;

    let titles = TitleWorker::spawn(
        TitleGenerator::new(Arc::new(config.title_client())),
        store.clone(),
    );
    let service = AskService::new(graph, store, titles, config.history_limit);

    serve::run_serve(&config.serve_addr, service).await
}

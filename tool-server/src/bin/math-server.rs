//! Math tool server: arithmetic and geometry tools over JSON-RPC.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use nova::tool_source::MathToolSource;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("MATH_SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8001".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tool_server::run_tool_server(listener, Arc::new(MathToolSource::new()), "math-server").await
}

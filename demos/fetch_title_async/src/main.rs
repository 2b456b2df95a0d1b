use futures::future::join_all;
use library_model::*;
use restate::{AsyncClient, ClientConfig, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
pub async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_INGRESS.to_owned());
    let client = AsyncClient::with_config(ClientConfig::new(base_url).with_debug(true))?;

    let calls = (1..=3u64).map(|id| {
        let pending = client
            .service("gutenberg")
            .handler("fetch_title")
            .call::<_, Book>(&FetchTitle { id });
        async move { (id, pending.await) }
    });

    for (id, reply) in join_all(calls).await {
        match reply {
            Ok(book) => info!(id, title = %book.title, "received"),
            Err(err) => error!(id, kind = %err.kind(), error = %err, "call failed"),
        }
    }
    Ok(())
}

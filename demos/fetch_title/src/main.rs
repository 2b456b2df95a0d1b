use library_model::*;
use restate::{Client, ClientConfig, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_INGRESS.to_owned());
    let client = Client::with_config(ClientConfig::new(base_url).with_debug(true))?;
    let gutenberg = client.service("gutenberg");

    for id in 1..=3 {
        let reply: Result<Book> = gutenberg
            .handler("fetch_title")
            .call(&FetchTitle { id });
        match reply {
            Ok(book) => info!(id, title = %book.title, "received"),
            Err(err) => error!(id, kind = %err.kind(), error = %err, "call failed"),
        }
    }
    Ok(())
}

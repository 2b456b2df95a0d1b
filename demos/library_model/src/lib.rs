use serde::{Deserialize, Serialize};

/// payload of `gutenberg/fetch_title`.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
pub struct FetchTitle {
    pub id: u64,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
}

/// ingress used when no address is given on the command line.
pub const DEFAULT_INGRESS: &str = "http://localhost:9070";

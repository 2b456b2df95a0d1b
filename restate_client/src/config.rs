use std::time::Duration;

use hyper::{
    header::{HeaderName, HeaderValue},
    Uri,
};
use restate_protocol::{Error, Metadata, Result, SerializeType};

/// seconds to wait for a TCP connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
/// total time allowed for one request/response exchange.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// idle time before a pooled connection is closed; also the TCP keep-alive interval.
pub const KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_CONNECTIONS: usize = 100;
pub const MAX_IDLE_PER_HOST: usize = 30;

/// Settings for a client. Fixed once the client is built.
///
/// A zero `connect_timeout` or `request_timeout` disables that deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// ingress address, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// emit request/response traces.
    pub debug: bool,
    pub serialize_type: SerializeType,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub keep_alive_timeout: Duration,
    /// upper bound on connections in use at the same time.
    pub max_connections: usize,
    pub max_idle_per_host: usize,
    pub nodelay: Option<bool>,
    /// headers sent with every request.
    pub headers: Metadata,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: String::new(),
            debug: false,
            serialize_type: SerializeType::JSON,
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            keep_alive_timeout: KEEP_ALIVE_TIMEOUT,
            max_connections: MAX_CONNECTIONS,
            max_idle_per_host: MAX_IDLE_PER_HOST,
            nodelay: None,
            headers: Metadata::new(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_serialize_type(mut self, st: SerializeType) -> Self {
        self.serialize_type = st;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.keep_alive_timeout = timeout;
        self
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Checks the config and returns it with a normalized `base_url`
    /// (no trailing slash).
    pub fn validate(mut self) -> Result<Self> {
        let uri: Uri = self
            .base_url
            .trim()
            .parse()
            .map_err(|err| Error::configuration(format!("invalid base url {:?}: {}", self.base_url, err)))?;

        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            Some(other) => {
                return Err(Error::configuration(format!(
                    "unsupported scheme {:?} in base url",
                    other
                )))
            }
            None => {
                return Err(Error::configuration(format!(
                    "base url {:?} is not absolute",
                    self.base_url
                )))
            }
        }
        if uri.authority().is_none() {
            return Err(Error::configuration(format!(
                "base url {:?} has no host",
                self.base_url
            )));
        }
        if uri.query().is_some() {
            return Err(Error::configuration("base url must not carry a query"));
        }
        if self.max_connections == 0 {
            return Err(Error::configuration("max_connections must be at least 1"));
        }
        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| Error::configuration(format!("header name {:?}: {}", name, err)))?;
            HeaderValue::from_str(value)
                .map_err(|err| Error::configuration(format!("header {:?} value: {}", name, err)))?;
        }

        self.base_url = self.base_url.trim().trim_end_matches('/').to_owned();
        Ok(self)
    }
}

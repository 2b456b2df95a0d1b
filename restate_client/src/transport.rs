use std::{error::Error as StdError, fmt, io, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use hyper::{
    client::HttpConnector,
    header::{HeaderName, HeaderValue, CONTENT_TYPE},
    Body,
};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use tokio::sync::Semaphore;

use crate::ClientConfig;
use restate_protocol::{Error, ErrorKind, Method, Result};

/// a request as it goes on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// snapshot of connection usage.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PoolStatus {
    pub max_connections: usize,
    /// connections currently held by a request.
    pub in_flight: usize,
}

/// Performs one HTTP exchange.
///
/// Implementations must not retry, and must release whatever they hold for
/// the exchange when the returned future is dropped.
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync + 'static {
    async fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse>;

    fn pool_status(&self) -> PoolStatus {
        PoolStatus::default()
    }
}

/// hyper's pooled HTTP/1 client, bounded to `max_connections` concurrent exchanges.
///
/// Speaks both `http` and `https`; TLS uses rustls with the webpki root store.
pub struct HyperTransport {
    client: hyper::Client<HttpsConnector<HttpConnector>>,
    slots: Arc<Semaphore>,
    max_connections: usize,
    request_timeout: Duration,
}

impl fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransport")
            .field("max_connections", &self.max_connections)
            .field("in_flight", &self.in_flight())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl HyperTransport {
    pub fn new(config: &ClientConfig) -> HyperTransport {
        let mut connector = HttpConnector::new();
        if !config.connect_timeout.is_zero() {
            connector.set_connect_timeout(Some(config.connect_timeout));
        }
        if !config.keep_alive_timeout.is_zero() {
            connector.set_keepalive(Some(config.keep_alive_timeout));
        }
        if let Some(nodelay) = config.nodelay {
            connector.set_nodelay(nodelay);
        }
        connector.enforce_http(false);
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(connector);

        let mut builder = hyper::Client::builder();
        builder.pool_max_idle_per_host(config.max_idle_per_host);
        if !config.keep_alive_timeout.is_zero() {
            builder.pool_idle_timeout(config.keep_alive_timeout);
        }

        HyperTransport {
            client: builder.build(connector),
            slots: Arc::new(Semaphore::new(config.max_connections)),
            max_connections: config.max_connections,
            request_timeout: config.request_timeout,
        }
    }

    fn in_flight(&self) -> usize {
        self.max_connections - self.slots.available_permits()
    }

    async fn exchange(&self, request: hyper::Request<Body>) -> Result<HttpResponse> {
        let response = self.client.request(request).await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(transport_error)?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse> {
        let request = build_request(request)?;

        // waiting for a slot counts against the request timeout
        let exchange = async {
            // held until the exchange finishes or this future is dropped
            let _slot = self
                .slots
                .clone()
                .acquire_owned()
                .await
                .map_err(|err| Error::new(ErrorKind::Transport, err))?;
            self.exchange(request).await
        };

        if self.request_timeout.is_zero() {
            return exchange.await;
        }
        match tokio::time::timeout(self.request_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!(
                "no response within {:?}",
                self.request_timeout
            ))),
        }
    }

    fn pool_status(&self) -> PoolStatus {
        PoolStatus {
            max_connections: self.max_connections,
            in_flight: self.in_flight(),
        }
    }
}

fn build_request(request: HttpRequest) -> Result<hyper::Request<Body>> {
    let mut builder = hyper::Request::builder()
        .method(request.method.to_string().as_str())
        .uri(request.url.as_str());
    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| Error::new(ErrorKind::Serialization, err))?;
        let value =
            HeaderValue::from_str(value).map_err(|err| Error::new(ErrorKind::Serialization, err))?;
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from(request.body))
        .map_err(|err| Error::new(ErrorKind::Serialization, err))
}

fn transport_error(err: hyper::Error) -> Error {
    if err.is_timeout() || caused_by_timeout(&err) {
        return Error::timeout(err.to_string());
    }
    Error::new(ErrorKind::Transport, err)
}

fn caused_by_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<io::Error>() {
            if io.kind() == io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

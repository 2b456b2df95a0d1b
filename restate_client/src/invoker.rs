use std::{sync::Arc, time::Instant};

use hyper::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{ClientConfig, HttpRequest, HttpResponse, PoolStatus, Transport};
use restate_protocol::{Error, RemoteError, Request, Result, SerializeType};

/// Request construction, tracing, status mapping and decoding shared by the
/// blocking and async clients. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Invoker {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl Invoker {
    /// `config` must already be validated.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Invoker {
        Invoker {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.transport.pool_status()
    }

    /// Runs exactly one exchange for `request` and decodes the answer.
    pub async fn execute<T>(&self, request: Request) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let http = self.http_request(&request);
        let debug = self.config.debug;
        if debug {
            debug!(
                service = request.service.as_deref().unwrap_or("-"),
                handler = request.handler.as_deref().unwrap_or("-"),
                method = %http.method,
                url = %http.url,
                body = %String::from_utf8_lossy(&http.body),
                "sending request"
            );
        }

        let started = Instant::now();
        let response = match self.transport.round_trip(http).await {
            Ok(response) => response,
            Err(err) => {
                if debug {
                    debug!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        timeout = err.is_timeout(),
                        error = %err,
                        "request failed"
                    );
                }
                return Err(err);
            }
        };

        if debug {
            debug!(
                status = response.status,
                elapsed_ms = started.elapsed().as_millis() as u64,
                body = %String::from_utf8_lossy(&response.body),
                "received response"
            );
        }

        let result = decode_response(&request, response);
        if debug {
            if let Err(err) = &result {
                debug!(error = %err, "call failed");
            }
        }
        result
    }

    fn http_request(&self, request: &Request) -> HttpRequest {
        let st = request.serialize_type;
        let mut headers: Vec<(String, String)> = self
            .config
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        headers.extend(
            request
                .metadata
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.clone())),
        );
        headers.push((ACCEPT.as_str().to_owned(), st.content_type().to_owned()));
        if request.body.is_some() {
            headers.push((CONTENT_TYPE.as_str().to_owned(), st.content_type().to_owned()));
        }

        HttpRequest {
            method: request.method,
            url: format!("{}{}", self.config.base_url, request.path_and_query()),
            headers,
            body: request.body.clone().unwrap_or_default(),
        }
    }
}

/// Maps a response to the caller's value or one of the error kinds.
pub fn decode_response<T>(request: &Request, response: HttpResponse) -> Result<T>
where
    T: DeserializeOwned,
{
    match response.status {
        200..=299 => {
            let st = response
                .content_type
                .as_deref()
                .and_then(SerializeType::from_content_type)
                .unwrap_or(request.serialize_type);
            st.decode(&response.body)
        }
        404 if request.not_found_is_null => request.serialize_type.decode(b""),
        status => Err(Error::remote(RemoteError::from_body(status, &response.body))),
    }
}

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::{HttpRequest, HttpResponse, Transport};
use restate_protocol::{Error, Result};

/// canned answer for `CountingTransport`.
#[derive(Debug, Clone)]
pub enum Reply {
    Response(HttpResponse),
    Timeout,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Reply {
        Reply::raw(status, "application/json", &body.to_string())
    }

    pub fn raw(status: u16, content_type: &str, body: &str) -> Reply {
        Reply::bytes(status, content_type, Bytes::copy_from_slice(body.as_bytes()))
    }

    pub fn bytes(status: u16, content_type: &str, body: Bytes) -> Reply {
        Reply::Response(HttpResponse {
            status,
            content_type: Some(content_type.to_owned()),
            body,
        })
    }
}

/// In-memory transport that records every request it is asked to send.
#[derive(Debug)]
pub struct CountingTransport {
    reply: Reply,
    count: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
}

impl CountingTransport {
    pub fn new(reply: Reply) -> Self {
        CountingTransport {
            reply,
            count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for CountingTransport {
    async fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        match &self.reply {
            Reply::Response(response) => Ok(response.clone()),
            Reply::Timeout => Err(Error::timeout("simulated")),
        }
    }
}

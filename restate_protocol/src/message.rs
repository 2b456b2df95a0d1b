use std::{collections::HashMap, time::Duration};

use bytes::Bytes;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{HandlerCall, SerializeType};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// extra request headers, keyed by lowercase name.
pub type Metadata = HashMap<String, String>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// One outbound HTTP exchange, relative to the client's base url.
///
/// Every operation the client offers is lowered into a `Request` first, so
/// the blocking and async paths only differ in how they drive it.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// path below the base url, starting with `/`, segments already escaped.
    pub path: String,
    pub query: Option<String>,
    pub metadata: Metadata,
    pub body: Option<Bytes>,
    pub serialize_type: SerializeType,
    /// a 404 answer decodes as `null` instead of failing.
    pub not_found_is_null: bool,
    /// service/handler labels used in traces.
    pub service: Option<String>,
    pub handler: Option<String>,
}

impl Request {
    fn new(method: Method, path: String, serialize_type: SerializeType) -> Request {
        Request {
            method,
            path,
            query: None,
            metadata: Metadata::new(),
            body: None,
            serialize_type,
            not_found_is_null: false,
            service: None,
            handler: None,
        }
    }

    fn labelled(mut self, call: &HandlerCall) -> Request {
        self.service = Some(call.service.clone());
        self.handler = Some(call.handler.clone());
        self
    }

    /// `POST /{service}[/{key}]/{handler}` with the payload as body.
    pub fn call(call: HandlerCall) -> Request {
        let mut req = Request::new(Method::Post, call.path(), call.serialize_type).labelled(&call);
        if let Some(key) = &call.idempotency_key {
            req.metadata
                .insert(IDEMPOTENCY_KEY_HEADER.to_owned(), key.clone());
        }
        req.metadata.extend(call.metadata);
        req.body = Some(call.payload);
        req
    }

    /// `POST /{service}[/{key}]/{handler}/send[?delay=Ns]`.
    pub fn send(call: HandlerCall, opts: &SendOptions) -> Request {
        let path = format!("{}/send", call.path());
        let mut req = Request::new(Method::Post, path, call.serialize_type).labelled(&call);
        if let Some(delay) = opts.delay.filter(|d| d.as_secs() > 0) {
            req.query = Some(format!("delay={}s", delay.as_secs()));
        }
        if let Some(key) = opts.idempotency_key.as_ref().or(call.idempotency_key.as_ref()) {
            req.metadata
                .insert(IDEMPOTENCY_KEY_HEADER.to_owned(), key.clone());
        }
        req.metadata.extend(call.metadata);
        req.body = Some(call.payload);
        req
    }

    /// `GET /restate/invocation/{service}[/{key}]/{handler}/{idempotency_key}/attach`.
    pub fn attach(call: &HandlerCall, idempotency_key: &str) -> Request {
        Request::invocation(call, idempotency_key, "attach")
    }

    /// `GET /restate/invocation/{service}[/{key}]/{handler}/{idempotency_key}/output`.
    pub fn output(call: &HandlerCall, idempotency_key: &str) -> Request {
        Request::invocation(call, idempotency_key, "output")
    }

    fn invocation(call: &HandlerCall, idempotency_key: &str, action: &str) -> Request {
        let path = format!(
            "/restate/invocation{}/{}/{}",
            call.path(),
            urlencoding::encode(idempotency_key),
            action
        );
        let mut req = Request::new(Method::Get, path, call.serialize_type).labelled(call);
        req.metadata.extend(call.metadata.clone());
        req
    }

    /// `DELETE /invocation/{invocation_id}`; a missing invocation is not an error.
    pub fn delete_invocation(invocation_id: &str, serialize_type: SerializeType) -> Request {
        let path = format!("/invocation/{}", urlencoding::encode(invocation_id));
        let mut req = Request::new(Method::Delete, path, serialize_type);
        req.not_found_is_null = true;
        req
    }

    /// path plus query, ready to append to the base url.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }
}

/// options for a one-way send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendOptions {
    /// delay before the ingress starts the invocation; whole seconds.
    pub delay: Option<Duration>,
    pub idempotency_key: Option<String>,
}

impl SendOptions {
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

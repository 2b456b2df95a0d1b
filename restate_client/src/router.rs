use serde::{de::DeserializeOwned, Serialize};

use restate_protocol::{
    Error, ErrorKind, HandlerCall, Metadata, Request, SendOptions, SendReceipt, SerializeType,
};

/// How a client turns a lowered [`Request`] into a result.
///
/// The blocking [`Client`](crate::Client) answers with `Result<T>` directly,
/// the [`AsyncClient`](crate::AsyncClient) with a [`CallFuture`](crate::CallFuture).
/// Routing is written once against this trait.
pub trait Invoke {
    type Output<T: DeserializeOwned + Send + 'static>;

    /// Sends `request`. Performs I/O (or schedules it) exactly once.
    fn dispatch<T>(&self, request: Request) -> Self::Output<T>
    where
        T: DeserializeOwned + Send + 'static;

    /// An output that fails with `error` without touching the network.
    fn reject<T>(&self, error: Error) -> Self::Output<T>
    where
        T: DeserializeOwned + Send + 'static;

    /// format used for payloads and the `accept` header.
    fn serialize_type(&self) -> SerializeType;

    fn invoke<T>(&self, call: HandlerCall) -> Self::Output<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.dispatch(Request::call(call))
    }
}

/// A service (or keyed virtual object) on the ingress.
///
/// Resolving a proxy or a handler never does I/O and never checks that the
/// name exists remotely.
#[derive(Debug)]
pub struct ServiceProxy<'a, C> {
    client: &'a C,
    service: String,
    key: Option<String>,
}

impl<'a, C> Clone for ServiceProxy<'a, C> {
    fn clone(&self) -> Self {
        ServiceProxy {
            client: self.client,
            service: self.service.clone(),
            key: self.key.clone(),
        }
    }
}

impl<'a, C: Invoke> ServiceProxy<'a, C> {
    pub fn new(client: &'a C, service: &str) -> Self {
        ServiceProxy {
            client,
            service: service.to_owned(),
            key: None,
        }
    }

    pub fn keyed(client: &'a C, service: &str, key: &str) -> Self {
        ServiceProxy {
            client,
            service: service.to_owned(),
            key: Some(key.to_owned()),
        }
    }

    pub fn name(&self) -> &str {
        &self.service
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn handler(&self, name: &str) -> Handler<'a, C> {
        Handler {
            client: self.client,
            service: self.service.clone(),
            key: self.key.clone(),
            handler: name.to_owned(),
            idempotency_key: None,
            metadata: Metadata::new(),
        }
    }
}

/// A handler bound to `(base url, service, [key,] handler)`, ready to be called.
#[derive(Debug)]
pub struct Handler<'a, C> {
    client: &'a C,
    service: String,
    key: Option<String>,
    handler: String,
    idempotency_key: Option<String>,
    metadata: Metadata,
}

impl<'a, C> Clone for Handler<'a, C> {
    fn clone(&self) -> Self {
        Handler {
            client: self.client,
            service: self.service.clone(),
            key: self.key.clone(),
            handler: self.handler.clone(),
            idempotency_key: self.idempotency_key.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

impl<'a, C: Invoke> Handler<'a, C> {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn name(&self) -> &str {
        &self.handler
    }

    /// Sends `idempotency-key` with calls and sends made through this handler.
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Empty names would collapse path segments (`/shelf//count`).
    fn check_target(&self) -> Result<(), Error> {
        if self.service.is_empty() {
            return Err(Error::simple(ErrorKind::Serialization, "service name is required"));
        }
        if self.handler.is_empty() {
            return Err(Error::simple(ErrorKind::Serialization, "handler name is required"));
        }
        if self.key.as_deref() == Some("") {
            return Err(Error::simple(ErrorKind::Serialization, "object key is required"));
        }
        Ok(())
    }

    fn handler_call<P>(&self, payload: &P) -> Result<HandlerCall, Error>
    where
        P: Serialize + ?Sized,
    {
        self.check_target()?;
        let mut call = HandlerCall::new(
            &self.service,
            &self.handler,
            payload,
            self.client.serialize_type(),
        )?;
        call.key = self.key.clone();
        call.idempotency_key = self.idempotency_key.clone();
        call.metadata = self.metadata.clone();
        Ok(call)
    }

    fn target(&self, idempotency_key: &str) -> Result<HandlerCall, Error> {
        self.check_target()?;
        if idempotency_key.is_empty() {
            return Err(missing_idempotency_key());
        }
        let mut call = HandlerCall::target(
            &self.service,
            self.key.as_deref(),
            &self.handler,
            self.client.serialize_type(),
        );
        call.metadata = self.metadata.clone();
        Ok(call)
    }

    /// Calls the handler and waits for its result.
    pub fn call<P, T>(&self, payload: &P) -> C::Output<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned + Send + 'static,
    {
        match self.handler_call(payload) {
            Ok(call) => self.client.invoke(call),
            Err(err) => self.client.reject(err),
        }
    }

    /// Starts the handler without waiting for its result.
    pub fn send<P>(&self, payload: &P, opts: SendOptions) -> C::Output<SendReceipt>
    where
        P: Serialize + ?Sized,
    {
        match self.handler_call(payload) {
            Ok(call) => self.client.dispatch(Request::send(call, &opts)),
            Err(err) => self.client.reject(err),
        }
    }

    /// Waits for the invocation started with `idempotency_key` to finish.
    pub fn attach<T>(&self, idempotency_key: &str) -> C::Output<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match self.target(idempotency_key) {
            Ok(call) => self.client.dispatch(Request::attach(&call, idempotency_key)),
            Err(err) => self.client.reject(err),
        }
    }

    /// Fetches the output of the invocation started with `idempotency_key`.
    pub fn output<T>(&self, idempotency_key: &str) -> C::Output<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match self.target(idempotency_key) {
            Ok(call) => self.client.dispatch(Request::output(&call, idempotency_key)),
            Err(err) => self.client.reject(err),
        }
    }
}

fn missing_idempotency_key() -> Error {
    Error::simple(ErrorKind::Serialization, "idempotency key is required")
}

/// Calls a handler with the `client => service.handler(payload)` shape.
///
/// ```ignore
/// let title: Value = call!(client => gutenberg.fetch_title(json!({"id": 42})))?;
/// let cart: Value = call!(client => cart["user-7"].add(item)).await?;
/// ```
#[macro_export]
macro_rules! call {
    ($client:expr => $service:ident [ $key:expr ] . $handler:ident ( $payload:expr )) => {
        $client
            .object(stringify!($service), $key)
            .handler(stringify!($handler))
            .call(&$payload)
    };
    ($client:expr => $service:ident . $handler:ident ( $payload:expr )) => {
        $client
            .service(stringify!($service))
            .handler(stringify!($handler))
            .call(&$payload)
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;
    use serde::ser::Error as _;
    use serde_json::{json, Value};

    use crate::{
        testing::{CountingTransport, Reply},
        AsyncClient, Client, ClientConfig,
    };
    use restate_protocol::{ErrorKind, SendOptions, IDEMPOTENCY_KEY_HEADER};

    struct Unserializable;

    impl serde::Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("not encodable"))
        }
    }

    fn blocking(reply: Reply) -> (Client, Arc<CountingTransport>) {
        let transport = Arc::new(CountingTransport::new(reply));
        let client = Client::with_transport(
            ClientConfig::new("http://localhost:9070"),
            transport.clone(),
        )
        .unwrap();
        (client, transport)
    }

    fn nonblocking(reply: Reply) -> (AsyncClient, Arc<CountingTransport>) {
        let transport = Arc::new(CountingTransport::new(reply));
        let client = AsyncClient::with_transport(
            ClientConfig::new("http://localhost:9070"),
            transport.clone(),
        )
        .unwrap();
        (client, transport)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn resolving_never_does_io(service in "[a-zA-Z_][a-zA-Z0-9_]{0,20}",
                                   handler in "[a-zA-Z_][a-zA-Z0-9_]{0,20}") {
            let (client, transport) = blocking(Reply::json(200, json!(null)));
            let proxy = client.service(&service);
            let bound = proxy.handler(&handler);
            prop_assert_eq!(service.as_str(), bound.service());
            prop_assert_eq!(handler.as_str(), bound.name());
            prop_assert_eq!(0, transport.count());

            let (client, transport) = nonblocking(Reply::json(200, json!(null)));
            let _bound = client.object(&service, "k").handler(&handler);
            prop_assert_eq!(0, transport.count());
        }

        #[test]
        fn unserializable_payload_never_reaches_the_wire(service in "[a-z]{1,12}",
                                                         handler in "[a-z]{1,12}") {
            let (client, transport) = blocking(Reply::json(200, json!(null)));
            let err = client
                .service(&service)
                .handler(&handler)
                .call::<_, Value>(&Unserializable)
                .unwrap_err();
            prop_assert_eq!(ErrorKind::Serialization, err.kind());
            prop_assert_eq!(0, transport.count());
        }
    }

    #[test]
    fn reserved_names_are_not_shadowed() {
        let (client, transport) = blocking(Reply::json(200, json!({"ok": true})));
        assert_eq!("http://localhost:9070", client.config().base_url);
        let proxy = client.service("config");
        assert_eq!("config", proxy.name());
        let _: Value = proxy.handler("pool_status").call(&json!({})).unwrap();
        assert_eq!(
            "http://localhost:9070/config/pool_status",
            transport.requests()[0].url
        );
    }

    #[test]
    fn call_macro_routes_like_the_builder() {
        let (client, transport) = blocking(Reply::json(200, json!({"title": "Moby Dick"})));
        let v: Value = call!(client => gutenberg.fetch_title(json!({"id": 42}))).unwrap();
        assert_eq!(json!({"title": "Moby Dick"}), v);
        let _: Value = call!(client => shelf["north wing"].count(json!(null))).unwrap();

        let sent = transport.requests();
        assert_eq!("http://localhost:9070/gutenberg/fetch_title", sent[0].url);
        assert_eq!("http://localhost:9070/shelf/north%20wing/count", sent[1].url);
    }

    #[tokio::test]
    async fn async_rejection_happens_before_io() {
        let (client, transport) = nonblocking(Reply::json(200, json!(null)));
        let err = client
            .service("gutenberg")
            .handler("fetch_title")
            .call::<_, Value>(&Unserializable)
            .await
            .unwrap_err();
        assert_eq!(ErrorKind::Serialization, err.kind());
        assert_eq!(0, transport.count());
    }

    #[tokio::test]
    async fn idempotency_key_and_headers_are_sent() {
        let (client, transport) = nonblocking(Reply::json(200, json!(1)));
        let _: Value = client
            .service("orders")
            .handler("place")
            .idempotency_key("order-9")
            .header("X-Trace", "t1")
            .call(&json!({}))
            .await
            .unwrap();

        let sent = &transport.requests()[0];
        assert!(sent
            .headers
            .contains(&(IDEMPOTENCY_KEY_HEADER.to_owned(), "order-9".to_owned())));
        assert!(sent.headers.contains(&("x-trace".to_owned(), "t1".to_owned())));
    }

    #[test]
    fn attach_requires_idempotency_key() {
        let (client, transport) = blocking(Reply::json(200, json!(null)));
        let handler = client.service("orders").handler("place");
        let err = handler.attach::<Value>("").unwrap_err();
        assert_eq!(ErrorKind::Serialization, err.kind());
        let err = handler.output::<Value>("").unwrap_err();
        assert_eq!(ErrorKind::Serialization, err.kind());
        assert_eq!(0, transport.count());
    }

    #[test]
    fn empty_names_are_rejected_before_io() {
        let (client, transport) = blocking(Reply::json(200, json!(null)));
        let err = client
            .object("shelf", "")
            .handler("count")
            .call::<_, Value>(&json!({}))
            .unwrap_err();
        assert_eq!(ErrorKind::Serialization, err.kind());
        let err = client
            .object("shelf", "")
            .handler("count")
            .send(&json!({}), SendOptions::default())
            .unwrap_err();
        assert_eq!(ErrorKind::Serialization, err.kind());
        let err = client
            .object("shelf", "")
            .handler("count")
            .attach::<Value>("idem-1")
            .unwrap_err();
        assert_eq!(ErrorKind::Serialization, err.kind());
        let err = client.service("").handler("count").call::<_, Value>(&json!({})).unwrap_err();
        assert_eq!(ErrorKind::Serialization, err.kind());
        let err = client.service("shelf").handler("").output::<Value>("idem-1").unwrap_err();
        assert_eq!(ErrorKind::Serialization, err.kind());
        assert_eq!(0, transport.count());
    }
}

use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::future::{self, BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    ClientConfig, Handler, HyperTransport, Invoke, Invoker, PoolStatus, ServiceProxy, Transport,
};
use restate_protocol::{Error, Request, Result, SerializeType};

/// The pending result of an async call.
///
/// Nothing is sent until the future is first polled. Dropping it before it
/// completes aborts the exchange and hands its connection slot back to the pool.
#[must_use = "a call does nothing unless awaited"]
pub struct CallFuture<T> {
    inner: BoxFuture<'static, Result<T>>,
}

impl<T> CallFuture<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        CallFuture { inner: f.boxed() }
    }

    pub fn ready(result: Result<T>) -> Self
    where
        T: Send + 'static,
    {
        CallFuture::new(future::ready(result))
    }
}

impl<T> fmt::Debug for CallFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallFuture").finish_non_exhaustive()
    }
}

impl<T> Future for CallFuture<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<T>> {
        self.inner.as_mut().poll(cx)
    }
}

/// A non-blocking client for an ingress. Cheap to clone; clones share one
/// connection pool.
#[derive(Debug, Clone)]
pub struct AsyncClient {
    invoker: Invoker,
}

impl AsyncClient {
    pub fn new(base_url: &str) -> Result<AsyncClient> {
        AsyncClient::with_config(ClientConfig::new(base_url))
    }

    pub fn with_config(config: ClientConfig) -> Result<AsyncClient> {
        let config = config.validate()?;
        let transport = Arc::new(HyperTransport::new(&config));
        Ok(AsyncClient {
            invoker: Invoker::new(config, transport),
        })
    }

    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<AsyncClient> {
        Ok(AsyncClient {
            invoker: Invoker::new(config.validate()?, transport),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.invoker.config()
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.invoker.pool_status()
    }

    pub fn service(&self, name: &str) -> ServiceProxy<'_, AsyncClient> {
        ServiceProxy::new(self, name)
    }

    pub fn object(&self, name: &str, key: &str) -> ServiceProxy<'_, AsyncClient> {
        ServiceProxy::keyed(self, name, key)
    }

    pub fn get(&self, service: &str) -> ServiceProxy<'_, AsyncClient> {
        self.service(service)
    }

    /// Removes an invocation. Resolves to `None` if the ingress does not know it.
    pub fn delete_invocation(&self, invocation_id: &str) -> CallFuture<Option<Value>> {
        self.dispatch(Request::delete_invocation(
            invocation_id,
            self.config().serialize_type,
        ))
    }
}

impl<'a> ServiceProxy<'a, AsyncClient> {
    pub fn get(&self, handler: &str) -> Handler<'a, AsyncClient> {
        self.handler(handler)
    }
}

impl Invoke for AsyncClient {
    type Output<T: DeserializeOwned + Send + 'static> = CallFuture<T>;

    fn dispatch<T>(&self, request: Request) -> CallFuture<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let invoker = self.invoker.clone();
        CallFuture::new(async move { invoker.execute(request).await })
    }

    fn reject<T>(&self, error: Error) -> CallFuture<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        CallFuture::ready(Err(error))
    }

    fn serialize_type(&self) -> SerializeType {
        self.config().serialize_type
    }
}

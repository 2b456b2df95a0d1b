use std::{sync::Arc, thread};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::{Builder, Handle, Runtime};

use crate::{
    ClientConfig, Handler, HyperTransport, Invoke, Invoker, PoolStatus, ServiceProxy, Transport,
};
use restate_protocol::{Error, ErrorKind, Request, Result, SerializeType};

/// A blocking client for an ingress.
///
/// Each call occupies the calling thread until the response has been read.
/// The client is `Send + Sync`; share it behind an `Arc` to call from several
/// threads. It owns a small runtime to drive its connection pool. Called
/// from inside an async context it still works, but parks the calling worker
/// for the whole exchange; prefer [`AsyncClient`](crate::AsyncClient) there.
#[derive(Debug)]
pub struct Client {
    invoker: Invoker,
    /// `None` only while dropping.
    runtime: Option<Runtime>,
}

impl Client {
    /// Connects lazily to `base_url`; nothing is sent until the first call.
    pub fn new(base_url: &str) -> Result<Client> {
        Client::with_config(ClientConfig::new(base_url))
    }

    pub fn with_config(config: ClientConfig) -> Result<Client> {
        let config = config.validate()?;
        let transport = Arc::new(HyperTransport::new(&config));
        Client::build(config, transport)
    }

    /// Uses `transport` instead of the built-in hyper pool.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Client> {
        Client::build(config.validate()?, transport)
    }

    fn build(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Client> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("restate-client")
            .enable_all()
            .build()
            .map_err(|err| Error::new(ErrorKind::Configuration, err))?;

        Ok(Client {
            invoker: Invoker::new(config, transport),
            runtime: Some(runtime),
        })
    }

    fn run<T>(&self, request: Request) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let runtime = match &self.runtime {
            Some(runtime) => runtime,
            None => return Err(Error::simple(ErrorKind::Transport, "client is shut down")),
        };
        if Handle::try_current().is_err() {
            return runtime.block_on(self.invoker.execute(request));
        }
        // a runtime thread cannot block_on another runtime
        thread::scope(|scope| {
            scope
                .spawn(move || runtime.block_on(self.invoker.execute(request)))
                .join()
                .unwrap_or_else(|_| Err(Error::simple(ErrorKind::Transport, "call thread panicked")))
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.invoker.config()
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.invoker.pool_status()
    }

    pub fn service(&self, name: &str) -> ServiceProxy<'_, Client> {
        ServiceProxy::new(self, name)
    }

    /// A virtual object addressed by `key`.
    pub fn object(&self, name: &str, key: &str) -> ServiceProxy<'_, Client> {
        ServiceProxy::keyed(self, name, key)
    }

    /// `get("svc").get("handler")` spelling of `service(..).handler(..)`.
    pub fn get(&self, service: &str) -> ServiceProxy<'_, Client> {
        self.service(service)
    }

    /// Removes an invocation. `Ok(None)` if the ingress does not know it.
    pub fn delete_invocation(&self, invocation_id: &str) -> Result<Option<Value>> {
        self.dispatch(Request::delete_invocation(
            invocation_id,
            self.config().serialize_type,
        ))
    }
}

impl<'a> ServiceProxy<'a, Client> {
    pub fn get(&self, handler: &str) -> Handler<'a, Client> {
        self.handler(handler)
    }
}

impl Invoke for Client {
    type Output<T: DeserializeOwned + Send + 'static> = Result<T>;

    fn dispatch<T>(&self, request: Request) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.run(request)
    }

    fn reject<T>(&self, error: Error) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        Err(error)
    }

    fn serialize_type(&self) -> SerializeType {
        self.config().serialize_type
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            if Handle::try_current().is_ok() {
                runtime.shutdown_background();
            }
        }
    }
}

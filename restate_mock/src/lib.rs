//! A tiny ingress stand-in: answers registered `service/handler` routes with
//! canned replies over real HTTP and records every request it sees.

use std::{
    collections::HashMap,
    convert::Infallible,
    io,
    net::{SocketAddr, TcpListener},
    sync::{Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
    time::Duration,
};

use bytes::Bytes;
use hyper::{
    header::CONTENT_TYPE,
    service::{make_service_fn, service_fn},
    Body, Response, Server,
};
use serde_json::{json, Value};
use tokio::{runtime::Builder, sync::oneshot};
use tracing::debug;

/// what a route answers with.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
    /// wait this long before answering.
    pub delay: Duration,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Reply {
        Reply {
            status,
            content_type: Some("application/json".to_owned()),
            body: Bytes::from(body.to_string()),
            delay: Duration::ZERO,
        }
    }

    pub fn ok(body: Value) -> Reply {
        Reply::json(200, body)
    }

    pub fn text(status: u16, body: &str) -> Reply {
        Reply {
            status,
            content_type: Some("text/plain".to_owned()),
            body: Bytes::copy_from_slice(body.as_bytes()),
            delay: Duration::ZERO,
        }
    }

    pub fn empty(status: u16) -> Reply {
        Reply {
            status,
            content_type: None,
            body: Bytes::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Reply {
        self.delay = delay;
        self
    }

    fn not_found(path: &str) -> Reply {
        Reply::json(
            404,
            json!({"code": "NOT_FOUND", "message": format!("no handler at {}", path)}),
        )
    }
}

/// A request as the mock received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// lowercase header names.
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

pub type RouteFn = Arc<dyn Fn(&RecordedRequest) -> Reply + Send + Sync>;

#[derive(Default)]
struct State {
    routes: HashMap<String, RouteFn>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Routes are matched on the exact request path; unknown paths answer 404
/// with a `NOT_FOUND` descriptor.
#[derive(Default)]
pub struct MockServer {
    routes: HashMap<String, RouteFn>,
}

impl MockServer {
    pub fn new() -> Self {
        MockServer::default()
    }

    /// Answers `/{service}/{handler}` with `f`.
    pub fn register_fn<F>(&mut self, service: &str, handler: &str, f: F) -> &mut Self
    where
        F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        self.register_path(&format!("/{}/{}", service, handler), f)
    }

    pub fn register_reply(&mut self, service: &str, handler: &str, reply: Reply) -> &mut Self {
        self.register_fn(service, handler, move |_| reply.clone())
    }

    /// Answers any exact `path` with `f`.
    pub fn register_path<F>(&mut self, path: &str, f: F) -> &mut Self
    where
        F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        self.routes.insert(path.to_owned(), Arc::new(f));
        self
    }

    /// Binds `127.0.0.1` on a free port and serves from a background thread
    /// until the returned handle is dropped.
    pub fn start(self) -> io::Result<RunningServer> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let state = Arc::new(State {
            routes: self.routes,
            requests: Mutex::new(Vec::new()),
        });

        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("restate-mock")
            .enable_all()
            .build()?;

        let service_state = state.clone();
        let make_svc = make_service_fn(move |_conn| {
            let state = service_state.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| handle(state.clone(), req)))
            }
        });

        let server = {
            let _guard = runtime.enter();
            Server::from_tcp(listener)
                .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?
                .serve(make_svc)
        };

        let (shutdown, stop) = oneshot::channel::<()>();
        let thread = thread::spawn(move || {
            runtime.block_on(async move {
                tokio::select! {
                    result = server => {
                        if let Err(err) = result {
                            debug!(error = %err, "mock ingress stopped");
                        }
                    }
                    _ = stop => {}
                }
            });
        });

        Ok(RunningServer {
            addr,
            state,
            shutdown: Some(shutdown),
            thread: Some(thread),
        })
    }
}

async fn handle(
    state: Arc<State>,
    req: hyper::Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let method = req.method().to_string();
    let path = req.uri().path().to_owned();
    let query = req.uri().query().map(str::to_owned);
    let headers = req
        .headers()
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
        .collect();
    let body = hyper::body::to_bytes(req.into_body())
        .await
        .unwrap_or_default();

    let recorded = RecordedRequest {
        method,
        path,
        query,
        headers,
        body,
    };
    debug!(method = %recorded.method, path = %recorded.path, "mock ingress request");

    let reply = match state.routes.get(&recorded.path) {
        Some(route) => route(&recorded),
        None => Reply::not_found(&recorded.path),
    };
    state
        .requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(recorded);

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let mut builder = Response::builder().status(reply.status);
    if let Some(content_type) = &reply.content_type {
        builder = builder.header(CONTENT_TYPE, content_type.as_str());
    }
    let response = builder.body(Body::from(reply.body)).unwrap_or_else(|err| {
        let mut response = Response::new(Body::from(err.to_string()));
        *response.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        response
    });
    Ok(response)
}

/// Handle to a started [`MockServer`]. Stops the server on drop.
pub struct RunningServer {
    addr: SocketAddr,
    state: Arc<State>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl RunningServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://127.0.0.1:<port>`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    fn post(addr: SocketAddr, path: &str, body: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(
            stream,
            "POST {} HTTP/1.1\r\nhost: localhost\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            path,
            body.len(),
            body
        )
        .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn serves_registered_route() {
        let mut server = MockServer::new();
        server.register_fn("gutenberg", "fetch_title", |req| {
            let id = req.json().and_then(|v| v["id"].as_u64()).unwrap_or(0);
            Reply::ok(json!({ "id": id, "title": "Moby Dick" }))
        });
        let running = server.start().unwrap();

        let response = post(running.addr(), "/gutenberg/fetch_title", r#"{"id":42}"#);
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(r#""title":"Moby Dick""#));

        let requests = running.requests();
        assert_eq!(1, requests.len());
        assert_eq!("POST", requests[0].method);
        assert_eq!(Some("application/json"), requests[0].header("content-type"));
        assert_eq!(Some(json!({"id": 42})), requests[0].json());
    }

    #[test]
    fn unknown_route_is_not_found() {
        let running = MockServer::new().start().unwrap();
        let response = post(running.addr(), "/nope/nothing", "{}");
        assert!(response.starts_with("HTTP/1.1 404"));
        assert!(response.contains("NOT_FOUND"));
        assert_eq!(1, running.request_count());
    }
}

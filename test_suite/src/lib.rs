//! Shared fixtures for the integration tests.

use std::time::Duration;

use restate_mock::{MockServer, Reply, RunningServer};
use serde_json::json;

/// how long the `slow` handlers take to answer.
pub const SLOW: Duration = Duration::from_secs(10);

/// A mock ingress exposing a small library service:
///
/// * `gutenberg/fetch_title` answers `{"title": "Moby Dick"}`;
/// * `gutenberg/explode` answers 500 with an `INTERNAL` descriptor;
/// * `gutenberg/garbled` answers 200 with a body that is not JSON;
/// * `gutenberg/slow` answers after [`SLOW`];
/// * `gutenberg/shelve` answers 200 with an empty body;
/// * `shelf/<key>/count` echoes the payload back with the key;
/// * send, attach, output and delete endpoints for the `orders/place` handler.
pub fn library() -> RunningServer {
    let mut server = MockServer::new();
    server
        .register_reply("gutenberg", "fetch_title", Reply::ok(json!({"title": "Moby Dick"})))
        .register_reply(
            "gutenberg",
            "explode",
            Reply::json(500, json!({"code": "INTERNAL", "message": "handler panicked"})),
        )
        .register_reply("gutenberg", "garbled", Reply::text(200, "<html>oops</html>"))
        .register_reply("gutenberg", "slow", Reply::ok(json!("late")).delayed(SLOW))
        .register_reply("gutenberg", "shelve", Reply::empty(200))
        .register_path("/shelf/north/count", |req| {
            Reply::ok(json!({"key": "north", "echo": req.json()}))
        })
        .register_path("/orders/place/send", |_| {
            Reply::ok(json!({"invocationId": "inv_1", "status": "Accepted"}))
        })
        .register_path("/restate/invocation/orders/place/order-7/attach", |_| {
            Reply::ok(json!({"placed": true}))
        })
        .register_path("/restate/invocation/orders/place/order-7/output", |_| {
            Reply::ok(json!({"placed": true}))
        })
        .register_path("/invocation/inv_1", |_| Reply::ok(json!({"status": "deleted"})));
    server.start().expect("mock ingress should start")
}

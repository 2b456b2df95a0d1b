#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::future::join_all;
    use restate::*;
    use serde_json::{json, Value};
    use test_suite::library;

    #[tokio::test]
    async fn fetch_title_round_trip() {
        let ingress = library();
        let client = AsyncClient::new(&ingress.base_url()).unwrap();

        let book: Value = client
            .service("gutenberg")
            .handler("fetch_title")
            .call(&json!({"id": 42}))
            .await
            .unwrap();
        assert_eq!(json!({"title": "Moby Dick"}), book);
        assert_eq!("/gutenberg/fetch_title", ingress.requests()[0].path);
    }

    #[tokio::test]
    async fn unknown_handler_is_remote_not_found() {
        let ingress = library();
        let client = AsyncClient::new(&ingress.base_url()).unwrap();
        let err = call!(client => gutenberg.fetch_author(json!({"id": 42})))
            .await
            .map(|v: Value| v)
            .unwrap_err();
        assert_eq!(ErrorKind::Remote, err.kind());
        assert_eq!(
            Some("NOT_FOUND"),
            err.remote_detail().and_then(|d| d.code.as_deref())
        );
    }

    #[tokio::test]
    async fn many_calls_in_flight() {
        let ingress = library();
        let client = AsyncClient::with_config(
            ClientConfig::new(ingress.base_url()).with_max_connections(4),
        )
        .unwrap();

        let calls = (0..32).map(|i| {
            client
                .service("gutenberg")
                .handler("fetch_title")
                .call::<_, Value>(&json!({ "id": i }))
        });
        for result in join_all(calls).await {
            assert_eq!(json!({"title": "Moby Dick"}), result.unwrap());
        }
        assert_eq!(32, ingress.request_count());
        assert_eq!(0, client.pool_status().in_flight);
    }

    #[tokio::test]
    async fn timeout_is_transport_error() {
        let ingress = library();
        let client = AsyncClient::with_config(
            ClientConfig::new(ingress.base_url()).with_request_timeout(Duration::from_millis(200)),
        )
        .unwrap();

        let err = client
            .service("gutenberg")
            .handler("slow")
            .call::<_, Value>(&json!({}))
            .await
            .unwrap_err();
        assert_eq!(ErrorKind::Transport, err.kind());
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn cancelled_calls_release_the_pool() {
        let ingress = library();
        let client = AsyncClient::with_config(
            ClientConfig::new(ingress.base_url())
                .with_request_timeout(Duration::ZERO)
                .with_max_connections(4),
        )
        .unwrap();

        for _ in 0..20 {
            let pending = client
                .service("gutenberg")
                .handler("slow")
                .call::<_, Value>(&json!({}));
            let cancelled = tokio::time::timeout(Duration::from_millis(50), pending).await;
            assert!(cancelled.is_err());
            assert_eq!(0, client.pool_status().in_flight);
        }

        // with leaked slots this would wait forever on a pool of four
        let book: Value = tokio::time::timeout(
            Duration::from_secs(5),
            client
                .service("gutenberg")
                .handler("fetch_title")
                .call(&json!({"id": 42})),
        )
        .await
        .expect("pool should have free connections")
        .unwrap();
        assert_eq!(json!({"title": "Moby Dick"}), book);
        assert_eq!(
            PoolStatus {
                max_connections: 4,
                in_flight: 0
            },
            client.pool_status()
        );
    }

    #[tokio::test]
    async fn send_and_delete() {
        let ingress = library();
        let client = AsyncClient::new(&ingress.base_url()).unwrap();

        let receipt = client
            .service("orders")
            .handler("place")
            .idempotency_key("order-7")
            .send(&json!({"sku": "moby"}), SendOptions::default())
            .await
            .unwrap();
        assert_eq!("inv_1", receipt.invocation_id);
        assert_eq!(Some("order-7"), ingress.requests()[0].header("idempotency-key"));
        assert_eq!(None, ingress.requests()[0].query);

        assert_eq!(None, client.delete_invocation("inv_unknown").await.unwrap());
    }
}

// Per-key ordering tests: FIFO admission within a key, independence across keys.

mod test_utils;

use herald_rest::RequestData;
use serde_json::json;
use std::time::Duration;
use test_utils::{
    MockBehavior, MockResponse, MockTransport, keyed, keyed_json, mock_rest, test_options,
};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_same_key_admitted_in_submission_order() -> anyhow::Result<()> {
    // The first request needs two retries; later ones must still wait their turn.
    let transport = MockTransport::new_sequence(vec![
        MockResponse::status(503),
        MockResponse::status(503),
    ]);
    let rest = mock_rest(transport.clone(), test_options(50));

    let requests: Vec<_> = (0..5)
        .map(|n| tokio::spawn(rest.post("/sendMessage", keyed_json("chat", json!({"n": n})))))
        .collect();
    for request in requests {
        request.await??;
    }

    let order: Vec<i64> = transport
        .sent()
        .into_iter()
        .filter_map(|sent| sent.body.and_then(|body| body["n"].as_i64()))
        .collect();
    assert_eq!(order, vec![0, 0, 0, 1, 2, 3, 4]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_submission_order_wins_over_poll_order() -> anyhow::Result<()> {
    let transport = MockTransport::new_success();
    let rest = mock_rest(transport.clone(), test_options(50));

    let first = rest.post("/sendMessage", keyed_json("chat", json!({"n": 1})));
    let second = rest.post("/sendMessage", keyed_json("chat", json!({"n": 2})));

    // Poll the later submission first.
    let second = tokio::spawn(second);
    tokio::task::yield_now().await;
    let first = tokio::spawn(first);
    first.await??;
    second.await??;

    let order: Vec<i64> = transport
        .sent()
        .into_iter()
        .filter_map(|sent| sent.body.and_then(|body| body["n"].as_i64()))
        .collect();
    assert_eq!(order, vec![1, 2]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_same_key_never_sends_concurrently() -> anyhow::Result<()> {
    let transport = MockTransport::with_latency(
        MockBehavior::Always(MockResponse::ok(json!(true))),
        Duration::from_millis(100),
    );
    let rest = mock_rest(transport.clone(), test_options(50));
    let start = Instant::now();

    let first = tokio::spawn(rest.get("/getMe", RequestData::default()));
    let second = tokio::spawn(rest.get("/getMe", RequestData::default()));
    first.await??;
    second.await??;

    let sent = transport.sent_at();
    assert_eq!(sent[0], start);
    assert!(sent[1] - sent[0] >= Duration::from_millis(100));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_different_keys_run_concurrently() -> anyhow::Result<()> {
    let transport = MockTransport::with_latency(
        MockBehavior::Always(MockResponse::ok(json!(true))),
        Duration::from_millis(100),
    );
    let rest = mock_rest(transport.clone(), test_options(50));
    let start = Instant::now();

    let first = tokio::spawn(rest.get("/getMe", keyed("a")));
    let second = tokio::spawn(rest.get("/getMe", keyed("b")));
    first.await??;
    second.await??;

    let sent = transport.sent_at();
    assert_eq!(sent, vec![start, start]);
    assert!(start.elapsed() < Duration::from_millis(200));
    assert_eq!(rest.handler_count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_request_releases_key() {
    let transport = MockTransport::new_sequence(vec![MockResponse::api_error(400, "Bad Request")]);
    let rest = mock_rest(transport.clone(), test_options(50));

    let failing = rest.get("/getChat", RequestData::default());
    let following = rest.get("/getMe", RequestData::default());

    assert!(failing.await.is_err());
    assert!(following.await.is_ok());
    assert_eq!(transport.call_count(), 2);
}

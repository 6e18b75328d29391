// Global limiter tests through the dispatcher.
//
// The limit is soft across keys in general, but on a single-threaded runtime
// check and decrement never interleave, so these bounds hold exactly.

mod test_utils;

use herald_rate_limit::GlobalLimiter;
use herald_rest::{RequestData, Rest};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{MockResponse, MockTransport, TEST_TOKEN, keyed, mock_rest, test_options};
use tokio::time::Instant;

/// Largest number of sends falling in any window of `window` starting at a send.
fn max_in_rolling_window(sent: &[Instant], window: Duration) -> usize {
    sent.iter()
        .map(|start| {
            sent.iter()
                .filter(|at| **at >= *start && **at - *start < window)
                .count()
        })
        .max()
        .unwrap_or(0)
}

#[tokio::test(start_paused = true)]
async fn test_third_request_waits_for_next_window() -> anyhow::Result<()> {
    let transport = MockTransport::new_success();
    let rest = mock_rest(transport.clone(), test_options(2));
    let start = Instant::now();

    let requests: Vec<_> = (0..3)
        .map(|_| tokio::spawn(rest.get("/getMe", RequestData::default())))
        .collect();
    for request in requests {
        request.await??;
    }

    let sent = transport.sent_at();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0], start);
    assert_eq!(sent[1], start);
    assert!(sent[2] - start >= Duration::from_millis(1_000));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_budget_holds_across_keys() -> anyhow::Result<()> {
    let transport = MockTransport::new_success();
    let rest = mock_rest(transport.clone(), test_options(3));

    let mut requests = Vec::new();
    for _ in 0..3 {
        for key in ["a", "b", "c", "d"] {
            requests.push(tokio::spawn(rest.get("/getMe", keyed(key))));
        }
    }
    for request in requests {
        request.await??;
    }

    let sent = transport.sent_at();
    assert_eq!(sent.len(), 12);
    assert!(max_in_rolling_window(&sent, Duration::from_millis(1_000)) <= 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_on_one_key_stalls_all_keys() -> anyhow::Result<()> {
    let transport = MockTransport::new_sequence(vec![MockResponse::rate_limited(500)]);
    let rest = mock_rest(transport.clone(), test_options(50));

    let limited = tokio::spawn(rest.get("/getUpdates", keyed("a")));
    let bystander = tokio::spawn(rest.get("/getMe", keyed("b")));
    limited.await??;
    bystander.await??;

    let sent = transport.sent_at();
    assert_eq!(sent.len(), 3);
    for later in &sent[1..] {
        assert!(*later - sent[0] >= Duration::from_millis(500));
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dispatchers_can_share_a_limiter() -> anyhow::Result<()> {
    let limiter = Arc::new(GlobalLimiter::new(
        2,
        Duration::from_millis(1_000),
        Duration::from_millis(50),
    ));
    let transport = MockTransport::new_success();
    let build = || {
        Rest::builder()
            .options(test_options(2))
            .transport(transport.clone())
            .limiter(Arc::clone(&limiter))
            .token(TEST_TOKEN)
            .build()
    };
    let first = build();
    let second = build();
    let start = Instant::now();

    first.get("/a", RequestData::default()).await?;
    second.get("/b", RequestData::default()).await?;
    assert_eq!(start.elapsed(), Duration::ZERO);

    second.get("/c", RequestData::default()).await?;
    assert!(start.elapsed() >= Duration::from_millis(1_000));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_separate_dispatchers_have_separate_budgets() -> anyhow::Result<()> {
    let transport = MockTransport::new_success();
    let first = mock_rest(transport.clone(), test_options(1));
    let second = mock_rest(transport.clone(), test_options(1));
    let start = Instant::now();

    first.get("/a", RequestData::default()).await?;
    second.get("/b", RequestData::default()).await?;

    assert_eq!(start.elapsed(), Duration::ZERO);
    Ok(())
}

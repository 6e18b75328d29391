// Tests for the re-exported API and tracing setup.

use herald::{
    HeraldErrorKind, RequestData, RequestDescriptor, RequestMethod, Rest, RestEvent, RestOptions,
};
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "42:FACADE";

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: i64,
    is_bot: bool,
    username: String,
}

fn rest_for(server: &MockServer) -> Rest {
    let options = RestOptions::builder()
        .api(server.uri())
        .handler_sweep_interval_ms(0u64)
        .build()
        .expect("Failed to build options");
    Rest::builder().options(options).token(TOKEN).build()
}

#[tokio::test]
async fn test_typed_call_through_facade() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/bot{}/getMe", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"id": 7, "is_bot": true, "username": "herald_bot"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rest = rest_for(&server);
    let mut events = rest.subscribe();
    let user: User = rest
        .request_as(RequestDescriptor::new(
            RequestMethod::Get,
            "/getMe",
            RequestData::default(),
        ))
        .await?;

    assert_eq!(
        user,
        User {
            id: 7,
            is_bot: true,
            username: "herald_bot".to_string(),
        }
    );

    let mut saw_response = false;
    while let Ok(event) = events.try_recv() {
        if let RestEvent::Response { request, response } = event {
            assert_eq!(request.route(), "/getMe");
            assert!(!request.url().contains(TOKEN));
            assert_eq!(*response.status(), 200);
            saw_response = true;
        }
    }
    assert!(saw_response);
    Ok(())
}

#[tokio::test]
async fn test_typed_call_shape_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/bot{}/getMe", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": 5})))
        .mount(&server)
        .await;

    let rest = rest_for(&server);
    let err = rest
        .request_as::<User>(RequestDescriptor::new(
            RequestMethod::Get,
            "/getMe",
            RequestData::default(),
        ))
        .await
        .expect_err("5 is not a user");

    assert!(matches!(err.kind(), HeraldErrorKind::Json(json) if json.is_shape_mismatch()));
}

#[test]
fn test_tracing_installs_once() {
    assert!(herald::init_tracing().is_ok());
    assert!(herald::init_tracing().is_err());
}

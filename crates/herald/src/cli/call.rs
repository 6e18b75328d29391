//! Handlers for `herald call` and `herald config`.

use herald::{
    HeraldConfig, HeraldResult, JsonError, RequestData, RequestDescriptor, RequestMethod, Rest,
};
use serde_json::Value;
use tracing::{debug, instrument};

/// Environment variable holding the default bot token.
const TOKEN_VAR: &str = "HERALD_TOKEN";

/// Arguments of one `herald call`.
#[derive(Debug, Clone)]
pub struct CallArgs {
    /// Route, e.g. `/getMe`
    pub route: String,
    /// HTTP method
    pub method: RequestMethod,
    /// Raw JSON body
    pub json: Option<String>,
    /// Query parameters
    pub query: Vec<(String, String)>,
    /// Explicit token, overriding the environment
    pub token: Option<String>,
    /// Routing key
    pub key: Option<String>,
}

impl CallArgs {
    fn request_data(&self) -> HeraldResult<RequestData> {
        let mut builder = RequestData::builder();
        if let Some(json) = &self.json {
            let body: Value = serde_json::from_str(json).map_err(JsonError::from)?;
            builder = builder.body(body);
        }
        for (name, value) in &self.query {
            builder = builder.query_param(name, value);
        }
        if let Some(key) = &self.key {
            builder = builder.route_key(key.clone());
        }
        Ok(builder.build()?)
    }
}

/// Send one call through a dispatcher built from the layered configuration.
#[instrument(skip_all, fields(route = %args.route, method = %args.method))]
pub async fn run_call(args: CallArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = HeraldConfig::load()?;
    let data = args.request_data()?;

    let mut builder = Rest::builder().options(config.rest().clone());
    match args.token.clone().or_else(|| std::env::var(TOKEN_VAR).ok()) {
        Some(token) => builder = builder.token(token),
        None => debug!("No token given and {} is unset", TOKEN_VAR),
    }
    let rest = builder.build();

    let result = rest
        .request(RequestDescriptor::new(args.method, args.route, data))
        .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Print the effective configuration.
pub fn show_config() -> Result<(), Box<dyn std::error::Error>> {
    let config = HeraldConfig::load()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald::HeraldErrorKind;

    fn args(json: Option<&str>) -> CallArgs {
        CallArgs {
            route: "/sendMessage".to_string(),
            method: RequestMethod::Post,
            json: json.map(str::to_string),
            query: vec![("disable_notification".to_string(), "true".to_string())],
            token: None,
            key: Some("chat:1".to_string()),
        }
    }

    #[test]
    fn test_request_data_from_args() {
        let data = args(Some(r#"{"chat_id": 1, "text": "hi"}"#))
            .request_data()
            .expect("valid args");
        assert_eq!(
            data.body(),
            &Some(serde_json::json!({"chat_id": 1, "text": "hi"}))
        );
        assert_eq!(data.resolved_route_key(), "chat:1");
    }

    #[test]
    fn test_invalid_json_body_is_json_error() {
        let err = args(Some("{not json")).request_data().expect_err("bad JSON");
        assert!(matches!(err.kind(), HeraldErrorKind::Json(json) if !json.is_shape_mismatch()));
    }
}

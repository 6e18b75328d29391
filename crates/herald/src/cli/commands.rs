//! CLI command definitions.

use clap::{Parser, Subcommand};
use herald::RequestMethod;

/// Herald - rate-limited client for bot HTTP JSON APIs
#[derive(Parser, Debug)]
#[command(name = "herald")]
#[command(about = "Rate-limited client for bot HTTP JSON APIs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Call one API method and print its result as JSON
    Call {
        /// Route, e.g. /getMe or /sendMessage
        route: String,

        /// HTTP method
        #[arg(long, short = 'X', default_value = "GET", value_parser = parse_method)]
        method: RequestMethod,

        /// JSON request body
        #[arg(long)]
        json: Option<String>,

        /// Query parameter as key=value (repeatable)
        #[arg(long = "query", short = 'q', value_parser = parse_key_val)]
        query: Vec<(String, String)>,

        /// Bot token (defaults to HERALD_TOKEN)
        #[arg(long)]
        token: Option<String>,

        /// Routing key for ordering (defaults to the global key)
        #[arg(long)]
        key: Option<String>,
    },

    /// Print the effective configuration as JSON
    Config,
}

fn parse_method(s: &str) -> Result<RequestMethod, String> {
    s.parse()
        .map_err(|_| format!("unsupported method '{}'", s))
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_defaults_to_get() {
        let cli = Cli::try_parse_from(["herald", "call", "/getMe"]).expect("parses");
        match cli.command {
            Commands::Call {
                route,
                method,
                json,
                query,
                ..
            } => {
                assert_eq!(route, "/getMe");
                assert_eq!(method, RequestMethod::Get);
                assert!(json.is_none());
                assert!(query.is_empty());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_call_with_method_body_and_query() {
        let cli = Cli::try_parse_from([
            "herald",
            "-v",
            "call",
            "/sendMessage",
            "--method",
            "post",
            "--json",
            r#"{"chat_id": 1}"#,
            "-q",
            "a=1",
            "--query",
            "b=x=y",
            "--key",
            "chat:1",
        ])
        .expect("parses");
        assert!(cli.verbose);
        match cli.command {
            Commands::Call {
                method, query, key, ..
            } => {
                assert_eq!(method, RequestMethod::Post);
                assert_eq!(
                    query,
                    vec![
                        ("a".to_string(), "1".to_string()),
                        ("b".to_string(), "x=y".to_string()),
                    ]
                );
                assert_eq!(key.as_deref(), Some("chat:1"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_query_and_method() {
        assert!(Cli::try_parse_from(["herald", "call", "/x", "-q", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["herald", "call", "/x", "-q", "=v"]).is_err());
        assert!(Cli::try_parse_from(["herald", "call", "/x", "-X", "TRACE"]).is_err());
    }
}

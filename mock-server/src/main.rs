//! Standalone ODB mock server.
//!
//! Reads `PORT` (default 8000) and `ODB_TOKEN` (default `test-token`), and
//! serves the API under `http://127.0.0.1:$PORT/api`. Point a client at it
//! with `OdbClient::new(token, Some("http://127.0.0.1:8000/api"))`.

use tokio::net::TcpListener;

const DEFAULT_PORT: &str = "8000";
const DEFAULT_TOKEN: &str = "test-token";

/// Bind address and accepted token, with defaults for anything unset.
fn settings(port: Option<String>, token: Option<String>) -> (String, String) {
    let port = port.unwrap_or_else(|| DEFAULT_PORT.to_string());
    let token = token.unwrap_or_else(|| DEFAULT_TOKEN.to_string());
    (format!("127.0.0.1:{port}"), token)
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let (addr, token) = settings(std::env::var("PORT").ok(), std::env::var("ODB_TOKEN").ok());
    let listener = TcpListener::bind(&addr).await?;
    println!("ODB mock listening on http://{addr}/api");
    mock_server::run(listener, &token).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_env_falls_back_to_defaults() {
        let (addr, token) = settings(None, None);
        assert_eq!(addr, "127.0.0.1:8000");
        assert_eq!(token, "test-token");
    }

    #[test]
    fn env_values_override_defaults() {
        let (addr, token) = settings(Some("9100".into()), Some("secret".into()));
        assert_eq!(addr, "127.0.0.1:9100");
        assert_eq!(token, "secret");
    }
}

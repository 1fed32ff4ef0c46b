//! traffic statistics client for the engine's local control api.
//!
//! the engine exposes its counters on a locally-bound port; each query
//! builds a fresh connection and drops it afterwards - nothing is held
//! open between queries.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;

/// how long a single stats query may take before it is abandoned.
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// aggregate and per-client counters returned by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    /// aggregate upload bytes.
    pub up: i64,
    /// aggregate download bytes.
    pub down: i64,
    /// per-client counters.
    #[serde(default)]
    pub clients: Vec<ClientTrafficStat>,
}

/// counters for a single client credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientTrafficStat {
    /// the client's email/identifier.
    pub email: String,
    /// upload bytes.
    pub up: i64,
    /// download bytes.
    pub down: i64,
}

/// queries the engine's stats endpoint on its locally-bound api port.
#[derive(Debug, Clone)]
pub struct StatsClient {
    api_port: u16,
}

impl StatsClient {
    /// create a client for the given local api port.
    pub fn new(api_port: u16) -> Self {
        Self { api_port }
    }

    /// fetch current counters; `reset` asks the engine to zero them
    /// after reading, so successive queries return deltas.
    pub async fn query(&self, reset: bool) -> Result<TrafficSnapshot> {
        let client = reqwest::Client::builder().timeout(QUERY_TIMEOUT).build()?;
        let url = format!("http://127.0.0.1:{}/stats?reset={}", self.api_port, reset);
        debug!(%url, "querying engine traffic stats");

        let snapshot = client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<TrafficSnapshot>()
            .await?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, extract::Query, routing::get};
    use std::collections::HashMap;

    /// serve a fake stats endpoint on an ephemeral port.
    async fn spawn_fake_engine() -> u16 {
        let app = Router::new().route(
            "/stats",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let reset = params.get("reset").map(String::as_str) == Some("true");
                axum::Json(serde_json::json!({
                    "up": if reset { 10 } else { 1000 },
                    "down": 2000,
                    "clients": [{"email": "a@x", "up": 1, "down": 2}],
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        port
    }

    #[tokio::test]
    async fn query_parses_counters() {
        let port = spawn_fake_engine().await;
        let client = StatsClient::new(port);

        let snapshot = client.query(false).await.unwrap();
        assert_eq!(snapshot.up, 1000);
        assert_eq!(snapshot.down, 2000);
        assert_eq!(snapshot.clients.len(), 1);
        assert_eq!(snapshot.clients[0].email, "a@x");

        // reset flag reaches the engine
        let snapshot = client.query(true).await.unwrap();
        assert_eq!(snapshot.up, 10);
    }

    #[tokio::test]
    async fn query_fails_when_engine_is_down() {
        // nothing listens on the port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = StatsClient::new(port);
        assert!(client.query(false).await.is_err());
    }
}

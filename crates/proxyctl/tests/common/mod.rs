//! shared fixture for master integration tests: an in-memory database,
//! the app served on an ephemeral listener, and a websocket client
//! acting as a node.

#![allow(dead_code)] // Test utilities may not all be used in every test file

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use proxyctl::{AppState, create_app};
use proxyctl_db::{Database, ProxyctlDb};
use proxyctl_proto::{MasterFrame, NodeFrame};
use proxyctl_types::{Config, Node, test_utils::TestNodeBuilder};

/// the pre-shared secret of the fixture's node.
pub const NODE_SECRET: &str = "test-secret";

/// a running master with one node record in its store.
pub struct MasterFixture {
    pub db: ProxyctlDb,
    pub state: AppState,
    pub addr: SocketAddr,
    pub node: Node,
    server: tokio::task::JoinHandle<()>,
}

impl MasterFixture {
    /// create a fixture with default configuration.
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    /// create a fixture with custom configuration.
    pub async fn with_config(config: Config) -> Self {
        let db = ProxyctlDb::new_in_memory()
            .await
            .expect("failed to create in-memory database");
        let node = db
            .create_node(
                &TestNodeBuilder::new(0)
                    .with_name("edge-1")
                    .with_secret(NODE_SECRET)
                    .build(),
            )
            .await
            .expect("failed to create node");

        let state = AppState::new(db.clone(), config);
        let app = create_app(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            db,
            state,
            addr,
            node,
            server,
        }
    }

    /// open a websocket connection without performing the handshake.
    pub async fn connect_raw(&self) -> NodeClient {
        let url = format!("ws://{}/node/ws", self.addr);
        let (ws, _response) = connect_async(&url)
            .await
            .expect("failed to connect websocket");
        NodeClient { ws }
    }

    /// connect and complete the handshake with the given identity.
    pub async fn connect_as(&self, name: &str, secret: &str) -> NodeClient {
        let mut client = self.connect_raw().await;
        match client.hello(name, secret).await {
            MasterFrame::HelloOk { .. } => client,
            other => panic!("handshake failed: {other:?}"),
        }
    }

    /// connect and complete the handshake as the fixture's node.
    pub async fn connect_node(&self) -> NodeClient {
        self.connect_as(&self.node.name, NODE_SECRET).await
    }
}

impl Drop for MasterFixture {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// a node-side websocket client for tests.
pub struct NodeClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl NodeClient {
    /// send a hello frame and return the master's response.
    pub async fn hello(&mut self, name: &str, secret: &str) -> MasterFrame {
        self.send(&NodeFrame::Hello {
            name: name.to_string(),
            secret: secret.to_string(),
        })
        .await;
        self.next_master_frame().await
    }

    /// send a frame to the master.
    pub async fn send(&mut self, frame: &NodeFrame) {
        let json = frame.to_json().expect("failed to encode frame");
        self.ws
            .send(Message::Text(json.into()))
            .await
            .expect("failed to send frame");
    }

    /// read frames until the next decodable master frame.
    pub async fn next_master_frame(&mut self) -> MasterFrame {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(5), self.ws.next())
                .await
                .expect("timed out waiting for master frame")
                .expect("channel closed")
                .expect("websocket error");
            if let Message::Text(text) = message {
                return MasterFrame::from_json(&text).expect("undecodable master frame");
            }
        }
    }

    /// wait for a config push and return its id and document text.
    pub async fn next_push(&mut self) -> (u64, String) {
        match self.next_master_frame().await {
            MasterFrame::ConfigPush { push_id, config } => (push_id, config.get().to_string()),
            other => panic!("expected config push, got {other:?}"),
        }
    }

    /// acknowledge a push.
    pub async fn ack(&mut self, push_id: u64, applied: bool, reason: Option<&str>) {
        self.send(&NodeFrame::Ack {
            push_id,
            applied,
            reason: reason.map(String::from),
        })
        .await;
    }

    /// spawn a task that positively acknowledges every push.
    pub fn auto_ack(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let (push_id, _document) = self.next_push().await;
                self.ack(push_id, true, None).await;
            }
        })
    }

    /// close the connection.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info};

use crate::error::{BridgecamError, Result};
use crate::msg::{BridgeOp, CompressedImage, COMPRESSED_IMAGE_TYPE};

/// rosbridge websocket client.
///
/// Speaks just enough of the rosbridge v2 JSON protocol to publish:
/// advertise, publish, unadvertise.
pub struct BridgeClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl BridgeClient {
    /// Connect to a rosbridge server.
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| BridgecamError::Connect(e.to_string()))?;
        info!("connected to rosbridge at {url}");
        Ok(Self { ws })
    }

    /// Advertise the image topic.
    pub async fn advertise(&mut self, topic: &str) -> Result<()> {
        self.send_op(&BridgeOp::Advertise {
            topic,
            msg_type: COMPRESSED_IMAGE_TYPE,
        })
        .await
    }

    /// Publish one CompressedImage on the topic.
    pub async fn publish(&mut self, topic: &str, msg: &CompressedImage) -> Result<()> {
        self.send_op(&BridgeOp::Publish { topic, msg }).await
    }

    /// Withdraw the topic advertisement.
    pub async fn unadvertise(&mut self, topic: &str) -> Result<()> {
        self.send_op(&BridgeOp::Unadvertise { topic }).await
    }

    /// Close the websocket.
    pub async fn close(mut self) -> Result<()> {
        self.ws
            .close(None)
            .await
            .map_err(|e| BridgecamError::Transport(e.to_string()))
    }

    async fn send_op(&mut self, op: &BridgeOp<'_>) -> Result<()> {
        let json =
            serde_json::to_string(op).map_err(|e| BridgecamError::Serialise(e.to_string()))?;
        self.ws
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| BridgecamError::Transport(e.to_string()))
    }
}

/// Spawn the bridge task: drain the channel and publish each message.
///
/// A transport error ends the task; the render loop keeps producing and
/// its sends start failing, which it logs as drops. When the channel
/// closes the topic is unadvertised and the socket shut down.
pub fn spawn_publisher(
    mut client: BridgeClient,
    topic: String,
    mut rx: mpsc::Receiver<CompressedImage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = client.publish(&topic, &msg).await {
                error!("bridge publish failed: {e}");
                return;
            }
        }
        if let Err(e) = client.unadvertise(&topic).await {
            debug!("unadvertise on shutdown failed: {e}");
        }
        if let Err(e) = client.close().await {
            debug!("websocket close failed: {e}");
        }
        debug!("bridge publisher task finished");
    })
}

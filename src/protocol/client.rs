// ABOUTME: WebSocket client for the room relay
// ABOUTME: Splits into an inbound message stream and a cloneable sender

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::error::Error;
use crate::protocol::messages::Message;

/// A connected relay channel.
///
/// Reading and writing run on spawned tasks; the caller interacts through
/// plain channels of [`Message`] values. Both tasks finish on their own when
/// the socket closes or the caller drops its channel halves.
pub struct ProtocolClient {
    inbound: mpsc::UnboundedReceiver<Message>,
    outbound: mpsc::UnboundedSender<Message>,
}

impl ProtocolClient {
    /// Connect to the relay at `url`.
    pub async fn connect(url: &str) -> crate::Result<Self> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        log::error!("failed to encode outbound message: {}", e);
                        continue;
                    }
                };
                if sink.send(WsMessage::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => match serde_json::from_str::<Message>(&text) {
                        Ok(msg) => {
                            if in_tx.send(msg).is_err() {
                                break;
                            }
                        }
                        Err(e) => log::warn!("dropping unparseable relay message: {}", e),
                    },
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        log::warn!("relay read error: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            inbound: in_rx,
            outbound: out_tx,
        })
    }

    /// A cloneable sender for outbound messages.
    pub fn sender(&self) -> mpsc::UnboundedSender<Message> {
        self.outbound.clone()
    }

    /// Split into the inbound receiver and outbound sender.
    pub fn split(
        self,
    ) -> (
        mpsc::UnboundedReceiver<Message>,
        mpsc::UnboundedSender<Message>,
    ) {
        (self.inbound, self.outbound)
    }
}

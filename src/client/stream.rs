//! Receiving end of a config subscription.

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::client::error::ClientResult;
use crate::control::ConfigSnapshot;

/// Open WebSocket yielding one `ConfigSnapshot` per text frame.
pub struct ConfigStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl ConfigStream {
    pub async fn connect(url: &Url) -> ClientResult<Self> {
        let (socket, _) = connect_async(url.as_str()).await?;
        tracing::debug!(url = %url, "Config stream connected");
        Ok(Self { socket })
    }

    /// Next snapshot. `None` once the control plane closes the stream.
    pub async fn next(&mut self) -> Option<ClientResult<ConfigSnapshot>> {
        loop {
            match self.socket.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(text.as_str()).map_err(Into::into))
                }
                Ok(Message::Binary(bytes)) => {
                    return Some(serde_json::from_slice(&bytes).map_err(Into::into))
                }
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "Config stream closed by control plane");
                    return None;
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    /// Cancel the subscription.
    pub async fn close(mut self) -> ClientResult<()> {
        self.socket.close(None).await?;
        Ok(())
    }
}

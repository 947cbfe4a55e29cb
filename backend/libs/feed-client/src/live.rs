//! Live broadcast stream over WebSocket

use event_schema::FeedEvent;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

use crate::error::ClientError;

/// An open `/ws` connection yielding decoded [`FeedEvent`]s
pub struct LiveFeed {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

/// Open the live stream. Posts published before this returns are not
/// replayed.
pub async fn connect(url: &str) -> Result<LiveFeed, ClientError> {
    let (stream, _response) = connect_async(url).await?;
    tracing::debug!(%url, "live feed connected");
    Ok(LiveFeed { stream })
}

impl LiveFeed {
    /// Next event, or `None` once the connection is closed.
    ///
    /// Control frames are handled internally; an undecodable text frame is
    /// returned as an error without closing the stream.
    pub async fn next_event(&mut self) -> Option<Result<FeedEvent, ClientError>> {
        loop {
            let frame = match self.stream.next().await? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(e.into())),
            };
            match frame {
                Message::Text(text) => {
                    return Some(FeedEvent::from_json(&text).map_err(ClientError::from));
                }
                Message::Close(frame) => {
                    tracing::debug!(?frame, "live feed closed by server");
                    return None;
                }
                // pongs are queued by tungstenite and flushed on the next read
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => {}
            }
        }
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

use super::stream_manager::FeedTransport;
use crate::domain::errors::ChartError;
use crate::domain::logging::{LogComponent, get_logger};
use futures::{SinkExt, StreamExt};
use gloo_net::websocket::{Message, futures::WebSocket};

/// Browser WebSocket transport
pub struct GlooFeedTransport {
    url: String,
    socket: Option<WebSocket>,
}

impl GlooFeedTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), socket: None }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FeedTransport for GlooFeedTransport {
    async fn open(&mut self) -> Result<(), ChartError> {
        self.close();
        get_logger().info(LogComponent::Infrastructure("GlooFeedTransport"), &format!("connecting to {}", self.url));
        let socket = WebSocket::open(&self.url)
            .map_err(|e| ChartError::StreamDisconnected(format!("failed to open {}: {e:?}", self.url)))?;
        self.socket = Some(socket);
        Ok(())
    }

    async fn send(&mut self, text: String) -> Result<(), ChartError> {
        let socket = self
            .socket
            .as_mut()
            .ok_or_else(|| ChartError::StreamDisconnected("socket is closed".to_string()))?;
        socket
            .send(Message::Text(text))
            .await
            .map_err(|e| ChartError::StreamDisconnected(format!("send failed: {e:?}")))
    }

    async fn next_message(&mut self) -> Option<Result<String, ChartError>> {
        let socket = self.socket.as_mut()?;
        loop {
            match socket.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Bytes(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => continue,
                },
                Err(e) => return Some(Err(ChartError::StreamDisconnected(format!("{e:?}")))),
            }
        }
    }

    fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            if let Err(e) = socket.close(None, None) {
                get_logger().debug(
                    LogComponent::Infrastructure("GlooFeedTransport"),
                    &format!("close failed: {e:?}"),
                );
            }
        }
    }
}

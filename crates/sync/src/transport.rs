// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the persistent timer connection.
//!
//! The transport is a raw send/receive primitive with connect and disconnect.
//! It never retries on its own; reconnection belongs to the session.

use std::future::Future;
use std::pin::Pin;

use futures_util::{SinkExt, StreamExt};
use tk_core::protocol::{ClientMessage, Envelope};
use tokio_tungstenite::tungstenite::Message;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// A frame could not be encoded or decoded. The connection is still usable.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl TransportError {
    /// True if the connection survived this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TransportError::SerializationError(_))
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Persistent duplex connection to the timer authority.
///
/// Implemented over WebSocket in production and by in-memory doubles in
/// tests.
pub trait Transport: Send {
    /// Connect to the authority.
    fn connect(
        &mut self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Disconnect from the authority.
    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Send a command.
    fn send(
        &mut self,
        msg: ClientMessage,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Receive the next pushed event.
    ///
    /// Returns `None` if the connection is closed.
    fn recv(&mut self)
        -> Pin<Box<dyn Future<Output = TransportResult<Option<Envelope>>> + Send + '_>>;

    /// Check if connected.
    fn is_connected(&self) -> bool;
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// What one inbound WebSocket frame means to the session.
#[derive(Debug, PartialEq)]
pub(crate) enum Frame {
    Event(Envelope),
    /// Control frames and empty payloads.
    Skip,
    Closed,
    Malformed(String),
}

/// Interprets one frame. Text and binary frames both carry JSON envelopes.
pub(crate) fn decode_frame(message: Message) -> Frame {
    let bytes = match message {
        Message::Text(text) => text.as_bytes().to_vec(),
        Message::Binary(data) => data.to_vec(),
        Message::Close(_) => return Frame::Closed,
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => return Frame::Skip,
    };
    let text = match std::str::from_utf8(&bytes) {
        Ok(text) => text.trim(),
        Err(e) => return Frame::Malformed(format!("frame is not UTF-8: {}", e)),
    };
    if text.is_empty() {
        return Frame::Skip;
    }
    match Envelope::from_json(text) {
        Ok(envelope) => Frame::Event(envelope),
        Err(e) => Frame::Malformed(e.to_string()),
    }
}

fn check_scheme(url: &str) -> TransportResult<()> {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        Ok(())
    } else {
        Err(TransportError::ConnectionFailed(format!(
            "unsupported url '{}': expected ws:// or wss://",
            url
        )))
    }
}

/// WebSocket transport over tokio-tungstenite.
#[derive(Default)]
pub struct WebSocketTransport {
    stream: Option<WsStream>,
    url: Option<String>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The URL of the open connection.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn drop_connection(&mut self) {
        self.stream = None;
        self.url = None;
    }
}

impl Transport for WebSocketTransport {
    fn connect(
        &mut self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        let url = url.to_string();
        Box::pin(async move {
            check_scheme(&url)?;
            let (stream, response) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            tracing::debug!(%url, status = %response.status(), "websocket handshake done");

            self.stream = Some(stream);
            self.url = Some(url);
            Ok(())
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            let stream = self.stream.take();
            self.url = None;
            if let Some(mut stream) = stream {
                // The peer may already be gone
                let _ = stream.close(None).await;
            }
            Ok(())
        })
    }

    fn send(
        &mut self,
        msg: ClientMessage,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            let json = msg
                .to_json()
                .map_err(|e| TransportError::SerializationError(e.to_string()))?;
            let stream = self.stream.as_mut().ok_or(TransportError::ConnectionClosed)?;

            // send() flushes, so a dead peer shows up here
            if let Err(e) = stream.send(Message::Text(json.into())).await {
                self.drop_connection();
                return Err(TransportError::SendFailed(e.to_string()));
            }
            Ok(())
        })
    }

    fn recv(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Option<Envelope>>> + Send + '_>> {
        Box::pin(async move {
            let stream = self.stream.as_mut().ok_or(TransportError::ConnectionClosed)?;

            loop {
                let message = match stream.next().await {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        self.drop_connection();
                        return Err(TransportError::ReceiveFailed(e.to_string()));
                    }
                    None => {
                        self.drop_connection();
                        return Ok(None);
                    }
                };

                match decode_frame(message) {
                    Frame::Event(envelope) => return Ok(Some(envelope)),
                    Frame::Skip => continue,
                    Frame::Closed => {
                        self.drop_connection();
                        return Ok(None);
                    }
                    Frame::Malformed(reason) => {
                        return Err(TransportError::SerializationError(reason));
                    }
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;

use crate::config::IngestConfig;
use crate::connector::{IngestError, VenueConnector, VenueStream};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

/// WebSocket connector for venue market-data feeds.
pub struct WsConnector {
    config: IngestConfig,
}

impl WsConnector {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    fn subscribe_message(&self, symbol: &str, credential: Option<&str>) -> String {
        match credential {
            Some(token) => {
                format!(r#"{{"op":"subscribe","symbol":"{symbol}","token":"{token}"}}"#)
            }
            None => format!(r#"{{"op":"subscribe","symbol":"{symbol}"}}"#),
        }
    }
}

#[async_trait]
impl VenueConnector for WsConnector {
    fn venue(&self) -> &str {
        &self.config.venue
    }

    async fn connect(&self) -> Result<Box<dyn VenueStream>, IngestError> {
        let credential = self.config.credential().map_err(IngestError::Config)?;

        info!(venue = %self.config.venue, url = %self.config.url, "connecting venue feed");
        let (mut stream, _) = connect_async(self.config.url.as_str())
            .await
            .map_err(|e| IngestError::Connect(e.to_string()))?;

        for symbol in &self.config.subscriptions {
            let msg = self.subscribe_message(symbol, credential.as_deref());
            stream
                .send(Message::Text(msg))
                .await
                .map_err(|e| IngestError::Subscribe(e.to_string()))?;
        }

        Ok(Box::new(WsStream { inner: stream }))
    }
}

struct WsStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl VenueStream for WsStream {
    async fn next_message(&mut self) -> Result<Option<String>, IngestError> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => {
                        debug!("skipping non-utf8 binary frame");
                        continue;
                    }
                },
                Some(Ok(Message::Ping(payload))) => {
                    self.inner
                        .send(Message::Pong(payload))
                        .await
                        .map_err(|e| IngestError::Transport(e.to_string()))?;
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Err(e)) => return Err(IngestError::Transport(e.to_string())),
                None => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffPolicy;

    #[test]
    fn test_subscribe_message_shape() {
        let connector = WsConnector::new(IngestConfig {
            venue: "simex".to_string(),
            url: "wss://feed.simex.test/ws".to_string(),
            credential_env: None,
            subscriptions: vec![],
            backoff: BackoffPolicy::default(),
        });

        let plain = connector.subscribe_message("BTC-USD", None);
        assert_eq!(plain, r#"{"op":"subscribe","symbol":"BTC-USD"}"#);

        let with_token = connector.subscribe_message("BTC-USD", Some("abc"));
        assert!(with_token.contains(r#""token":"abc""#));
    }
}

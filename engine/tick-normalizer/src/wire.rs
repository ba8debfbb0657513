use serde::Deserialize;
use thiserror::Error;
use tick_core::Side;

/// Errors from wire decoding. Every variant maps to a counted drop; none
/// propagate downstream as a malformed tick.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("undecodable payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid field: {0}")]
    InvalidField(&'static str),
}

/// One decoded message in the venue's wire dialect.
///
/// The reference dialect is a tagged JSON object; other dialects normalize
/// through the same enum so the rest of the pipeline never sees venue
/// specifics.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireMessage {
    Trade {
        symbol: String,
        price: f64,
        size: f64,
        side: Side,
        /// Venue event time, epoch milliseconds
        ts: i64,
        #[serde(default)]
        seq: Option<u64>,
    },
    Quote {
        symbol: String,
        bid: f64,
        ask: f64,
        #[serde(default)]
        bid_size: f64,
        #[serde(default)]
        ask_size: f64,
        ts: i64,
        #[serde(default)]
        seq: Option<u64>,
    },
    /// Venue housekeeping (heartbeats, subscription acks); decoded and
    /// discarded without counting as malformed.
    Heartbeat {
        #[serde(default)]
        ts: i64,
    },
}

/// Decode a raw payload into the wire dialect, validating field ranges.
pub fn decode_message(payload: &str) -> Result<WireMessage, WireError> {
    let msg: WireMessage = serde_json::from_str(payload)?;

    match &msg {
        WireMessage::Trade { price, size, .. } => {
            if !price.is_finite() || *price <= 0.0 {
                return Err(WireError::InvalidField("price"));
            }
            if !size.is_finite() || *size <= 0.0 {
                return Err(WireError::InvalidField("size"));
            }
        }
        WireMessage::Quote { bid, ask, .. } => {
            if !bid.is_finite() || !ask.is_finite() || *bid <= 0.0 || *ask <= 0.0 {
                return Err(WireError::InvalidField("quote"));
            }
            if bid > ask {
                return Err(WireError::InvalidField("crossed quote"));
            }
        }
        WireMessage::Heartbeat { .. } => {}
    }

    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_trade() {
        let msg = decode_message(
            r#"{"type":"trade","symbol":"BTC-USD","price":42000.5,"size":0.25,"side":"buy","ts":1700000000123,"seq":42}"#,
        )
        .unwrap();

        match msg {
            WireMessage::Trade { symbol, price, size, side, ts, seq } => {
                assert_eq!(symbol, "BTC-USD");
                assert_eq!(price, 42000.5);
                assert_eq!(size, 0.25);
                assert_eq!(side, Side::Buy);
                assert_eq!(ts, 1700000000123);
                assert_eq!(seq, Some(42));
            }
            other => panic!("expected trade, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_quote_without_sequence() {
        let msg = decode_message(
            r#"{"type":"quote","symbol":"ETH-USD","bid":2200.0,"ask":2200.5,"ts":1700000000500}"#,
        )
        .unwrap();
        assert!(matches!(msg, WireMessage::Quote { seq: None, .. }));
    }

    #[test]
    fn test_garbage_payload_fails_closed() {
        assert!(matches!(decode_message("not json"), Err(WireError::Decode(_))));
        assert!(matches!(decode_message(r#"{"type":"snapshot"}"#), Err(WireError::Decode(_))));
    }

    #[test]
    fn test_invalid_fields_fail_closed() {
        let negative_price = r#"{"type":"trade","symbol":"X","price":-1.0,"size":1.0,"side":"buy","ts":1}"#;
        assert!(matches!(decode_message(negative_price), Err(WireError::InvalidField("price"))));

        let crossed = r#"{"type":"quote","symbol":"X","bid":10.0,"ask":9.0,"ts":1}"#;
        assert!(matches!(decode_message(crossed), Err(WireError::InvalidField("crossed quote"))));
    }

    #[test]
    fn test_heartbeat_decodes() {
        assert!(matches!(
            decode_message(r#"{"type":"heartbeat","ts":1700000000000}"#),
            Ok(WireMessage::Heartbeat { .. })
        ));
    }
}

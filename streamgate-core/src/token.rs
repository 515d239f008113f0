//! Opaque token codec for URL path parameters
//!
//! Encodes small serde payloads into a compact, URL-safe string and back.
//! Tokens are opaque identifiers, not credentials: they carry routing data
//! (container/item ids, upstream URLs) without exposing it in the path.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Error types for token encoding and decoding
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token is not valid hex or truncated.
    #[error("Token is not decodable: {reason}")]
    Undecodable {
        /// Description of the decode failure
        reason: String,
    },

    /// The decoded payload does not match the expected shape.
    #[error("Token payload mismatch: {reason}")]
    PayloadMismatch {
        /// Description of the payload failure
        reason: String,
    },
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;

/// Encode a small payload into an opaque URL-safe token.
///
/// # Errors
/// - `TokenError::PayloadMismatch` - Payload cannot be serialized
pub fn encode<T: Serialize>(payload: &T) -> TokenResult<String> {
    let json = serde_json::to_vec(payload).map_err(|e| TokenError::PayloadMismatch {
        reason: e.to_string(),
    })?;
    Ok(hex::encode(json))
}

/// Decode an opaque token back into its payload.
///
/// # Errors
/// - `TokenError::Undecodable` - Token is not valid hex
/// - `TokenError::PayloadMismatch` - Decoded bytes are not the expected payload
pub fn decode<T: DeserializeOwned>(token: &str) -> TokenResult<T> {
    let bytes = hex::decode(token).map_err(|e| TokenError::Undecodable {
        reason: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::PayloadMismatch {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        container_id: i64,
        item_id: i64,
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let payload = Payload {
            container_id: -1001234567890,
            item_id: 42,
        };

        let token = encode(&payload).unwrap();
        let decoded: Payload = decode(&token).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = encode(&Payload {
            container_id: 1,
            item_id: 2,
        })
        .unwrap();

        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_decode_rejects_non_hex() {
        let result = decode::<Payload>("not a token!");
        assert!(matches!(result, Err(TokenError::Undecodable { .. })));
    }

    #[test]
    fn test_decode_rejects_wrong_payload() {
        // Valid hex, valid JSON, wrong shape
        let token = hex::encode(br#"{"url":"https://example.com"}"#);
        let result = decode::<Payload>(&token);
        assert!(matches!(result, Err(TokenError::PayloadMismatch { .. })));
    }
}

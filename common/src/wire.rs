//! Wire payload shapes shared by the server dispatcher and the client driver.
//!
//! Field names and the `AddKeyPayload.key` base64 encoding mirror
//! `original_source/lib/common.go`'s `TokenRequestPayload`/`AddKeyPayload`,
//! whose fields went over the wire unchanged (Go's `encoding/json`
//! marshals exported struct fields as-is, and marshals `[]byte` as a
//! base64 string).

use serde::{Deserialize, Serialize};

/// Body of `POST /token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequestPayload {
    #[serde(rename = "KeyName")]
    pub key_name: String,
}

/// Body of `POST /add-key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddKeyPayload {
    #[serde(rename = "Key", with = "base64_bytes")]
    pub key: Vec<u8>,
    #[serde(rename = "KeyName")]
    pub key_name: String,
}

/// Signed-token claim set: `{ran, exp}` per spec, HMAC-SHA-512 signed
/// and then RSA-OAEP encrypted as a whole before it leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub ran: String,
    pub exp: i64,
}

/// serde helper serializing `Vec<u8>` as a base64 string, matching Go's
/// default `[]byte` JSON marshaling.
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_key_payload_round_trips_through_base64_json() {
        let payload = AddKeyPayload {
            key: b"-----BEGIN RSA PUBLIC KEY-----".to_vec(),
            key_name: "alice".to_string(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"KeyName\":\"alice\""));
        let parsed: AddKeyPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.key, payload.key);
        assert_eq!(parsed.key_name, payload.key_name);
    }

    #[test]
    fn token_request_payload_uses_go_field_name() {
        let json = r#"{"KeyName":"bob"}"#;
        let parsed: TokenRequestPayload = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.key_name, "bob");
    }
}

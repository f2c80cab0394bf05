// cartflow/src/rpc/envelope.rs

//! Wire format of the message-queue transport.
//!
//! Requests arrive as `{pattern, data, id}`. Replies go out as
//! `{success, message, data}` where `data` is the JSON-encoded result carried
//! as bytes, base64 on the wire, or `null`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Undecoded request: the pattern selects the command, `data` is its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRequest {
  pub pattern: String,
  #[serde(default)]
  pub data: Value,
  #[serde(default)]
  pub id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
  pub success: Outcome,
  pub message: String,
  #[serde(with = "base64_bytes", default)]
  pub data: Option<Vec<u8>>,
}

impl Reply {
  pub fn ok<T: Serialize>(message: impl Into<String>, value: &T) -> Result<Self, serde_json::Error> {
    Ok(Reply {
      success: Outcome::Success,
      message: message.into(),
      data: Some(serde_json::to_vec(value)?),
    })
  }

  /// A success without a payload, e.g. after a delete.
  pub fn done(message: impl Into<String>) -> Self {
    Reply {
      success: Outcome::Success,
      message: message.into(),
      data: None,
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Reply {
      success: Outcome::Error,
      message: message.into(),
      data: None,
    }
  }

  pub fn is_success(&self) -> bool {
    self.success == Outcome::Success
  }

  /// Decodes the payload bytes back into `T`.
  pub fn decode_data<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
    self.data.as_deref().map(serde_json::from_slice).transpose()
  }

  pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(self)
  }

  pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
    serde_json::from_slice(bytes)
  }
}

mod base64_bytes {
  use base64::engine::general_purpose::STANDARD;
  use base64::Engine;
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
      Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
    let encoded: Option<String> = Option::deserialize(deserializer)?;
    encoded
      .map(|text| STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom))
      .transpose()
  }
}

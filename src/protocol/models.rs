//! Request payloads and license/message records read from responses.

use crate::protocol::extract::{blocks, extract_block, extract_scalar, BlockKind};
use serde::{Deserialize, Serialize};

/// Body of a validation request.
///
/// Account fields are serialized only when both are known.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest<'a> {
    /// License key being validated.
    pub key: &'a str,
    /// Device fingerprint.
    pub hwid: &'a str,
    /// Public address of the caller.
    pub ip: &'a str,
    /// Account id, unsealed for the duration of the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<&'a str>,
    /// API token, unsealed for the duration of the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<&'a str>,
}

/// Body of a messages request.
#[derive(Serialize)]
pub struct MessagesRequest<'a> {
    /// The last validated key.
    pub key: &'a str,
    /// Device fingerprint.
    pub hwid: &'a str,
}

/// License metadata returned with a successful validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    /// Licensed duration as reported by the server (e.g. "30d").
    pub duration: String,
    /// Amount / quantity attached to the license.
    pub amount: String,
    /// Expiry timestamp.
    pub expires_at: String,
    /// Human-readable remaining time.
    pub time_remaining: String,
    /// Remaining time in seconds; 0 when missing or unparsable.
    pub time_remaining_seconds: i64,
    /// Fingerprint the key is bound to.
    pub hwid: String,
    /// Address the key is bound to.
    pub ip: String,
    /// First-use timestamp.
    pub used_at: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Whether the `data` object was present.
    pub is_valid: bool,
}

impl LicenseInfo {
    /// Read license info from the `data` object of a response body.
    ///
    /// A body without a `data` object yields a default record with
    /// `is_valid == false`.
    pub fn from_response(body: &str) -> Self {
        let Some(data) = extract_block(body, "data", BlockKind::Object) else {
            return Self::default();
        };

        let field = |key: &str| extract_scalar(data, key).to_string();
        Self {
            duration: field("duration"),
            amount: field("amount"),
            expires_at: field("expiresAt"),
            time_remaining: field("timeRemaining"),
            time_remaining_seconds: extract_scalar(data, "timeRemainingSeconds")
                .parse()
                .unwrap_or(0),
            hwid: field("hwid"),
            ip: field("ip"),
            used_at: field("usedAt"),
            created_at: field("createdAt"),
            is_valid: true,
        }
    }
}

/// A server-pushed notice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Category (e.g. "info", "warning").
    #[serde(rename = "type")]
    pub kind: String,
    /// Creation timestamp.
    pub created_at: String,
}

impl Message {
    fn from_object(object: &str) -> Self {
        let field = |key: &str| extract_scalar(object, key).to_string();
        Self {
            id: field("id"),
            title: field("title"),
            content: field("content"),
            kind: field("type"),
            created_at: field("createdAt"),
        }
    }

    /// A message needs both an id and a title.
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && !self.title.is_empty()
    }
}

/// Read the `messages` array of a response body, dropping invalid entries.
///
/// Returns `None` when the body has no `messages` array.
pub fn parse_messages(body: &str) -> Option<Vec<Message>> {
    let array = extract_block(body, "messages", BlockKind::Array)?;
    Some(
        blocks(array, BlockKind::Object)
            .map(Message::from_object)
            .filter(Message::is_valid)
            .collect(),
    )
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Connection lifecycle state.
///
/// Exactly one state is current at any time; it is owned by the
/// [`ConnectionManager`](crate::connection::ConnectionManager) and observed by
/// subscribers through status envelopes. The wire form is the lowercase state
/// name.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    /// A connection attempt is in progress
    Connecting,
    /// The transport handshake succeeded and the link is live
    Open,
    /// The transport is closed, either cleanly or after a failure
    Closed,
    /// A transport-level failure occurred; a `Closed` transition follows
    Error,
}

impl ConnectionState {
    /// Check if the connection is currently live.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// The unit of data delivered to subscribers.
///
/// Status envelopes are synthesized locally by the connection manager and
/// never travel on the wire. Message and raw envelopes come from inbound
/// frames via the [`FrameClassifier`](crate::classify::FrameClassifier):
/// structured payloads arrive as [`Envelope::Message`] with their parsed
/// shape unchanged, and frames that are not well-formed JSON arrive verbatim
/// as [`Envelope::Raw`] so no information is ever dropped.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Locally synthesized connection status notice
    Status(ConnectionState),
    /// A classified inbound frame, structure preserved as-is
    Message(Value),
    /// An inbound frame that did not parse, carried verbatim
    Raw(String),
}

impl Envelope {
    /// The connection state, if this is a status envelope.
    #[must_use]
    pub fn as_status(&self) -> Option<ConnectionState> {
        match self {
            Self::Status(state) => Some(*state),
            _ => None,
        }
    }

    /// The parsed payload, if this is a message envelope.
    #[must_use]
    pub fn as_message(&self) -> Option<&Value> {
        match self {
            Self::Message(value) => Some(value),
            _ => None,
        }
    }

    /// The verbatim frame text, if this is a raw envelope.
    #[must_use]
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Self::Raw(text) => Some(text),
            _ => None,
        }
    }

    /// The `type` field of a message envelope, when present.
    ///
    /// Semantic interpretation of `type` belongs to listeners; this is a
    /// convenience accessor, not a schema check.
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.as_message()?.get("type")?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ConnectionState::Connecting).unwrap(),
            "\"connecting\""
        );
        assert_eq!(
            serde_json::to_string(&ConnectionState::Error).unwrap(),
            "\"error\""
        );
    }

    #[test]
    fn state_display_matches_wire_form() {
        assert_eq!(ConnectionState::Open.to_string(), "open");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
    }

    #[test]
    fn accessors_are_exclusive() {
        let status = Envelope::Status(ConnectionState::Open);
        assert_eq!(status.as_status(), Some(ConnectionState::Open));
        assert!(status.as_message().is_none());
        assert!(status.as_raw().is_none());

        let message = Envelope::Message(json!({"type": "new_activity", "payload": {"id": "1"}}));
        assert_eq!(message.message_type(), Some("new_activity"));
        assert!(message.as_status().is_none());

        let raw = Envelope::Raw("hello".to_owned());
        assert_eq!(raw.as_raw(), Some("hello"));
        assert!(raw.message_type().is_none());
    }
}

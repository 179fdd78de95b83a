//! Classification of raw inbound frames into typed envelopes.

use serde_json::Value;

use crate::envelope::Envelope;

/// Frame classifier trait for converting raw frame text into an envelope.
///
/// Classification is infallible by design: a frame whose payload is not
/// well-formed structured data degrades to a raw-text envelope rather than an
/// error. Every inbound frame yields exactly one envelope; nothing is ever
/// dropped.
pub trait FrameClassifier: Send + Sync + 'static {
    /// Classify one inbound frame.
    fn classify(&self, text: &str) -> Envelope;
}

/// Default classifier for the hub's wire contract.
///
/// A frame is either one JSON document or opaque text. No schema is enforced
/// at this layer; checking the `type` field before acting is the listener's
/// responsibility.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonClassifier;

impl FrameClassifier for JsonClassifier {
    fn classify(&self, text: &str) -> Envelope {
        // Surrounding whitespace is tolerated by the parser; anything that
        // is not a single well-formed document survives byte-for-byte.
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Envelope::Message(value),
            Err(_parse) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(len = text.len(), "Frame is not structured, delivering verbatim");

                Envelope::Raw(text.to_owned())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn classifies_domain_event() {
        let envelope = JsonClassifier.classify(r#"{"type":"new_activity","payload":{"id":"1"}}"#);
        assert_eq!(
            envelope.as_message(),
            Some(&json!({"type": "new_activity", "payload": {"id": "1"}}))
        );
    }

    #[test]
    fn non_json_text_falls_back_to_raw() {
        let envelope = JsonClassifier.classify("hello");
        assert_eq!(envelope, Envelope::Raw("hello".to_owned()));
    }

    #[test]
    fn raw_fallback_preserves_frame_verbatim() {
        let text = "  not json {oops\nsecond line  ";
        let envelope = JsonClassifier.classify(text);
        assert_eq!(envelope, Envelope::Raw(text.to_owned()));
    }

    #[test]
    fn whitespace_frames_are_delivered_verbatim() {
        assert_eq!(JsonClassifier.classify(""), Envelope::Raw(String::new()));
        assert_eq!(
            JsonClassifier.classify(" \n\t "),
            Envelope::Raw(" \n\t ".to_owned())
        );
    }

    #[test]
    fn json_array_is_not_flattened() {
        let envelope = JsonClassifier.classify(r#"[{"type":"a"},{"type":"b"}]"#);
        assert_eq!(
            envelope.as_message(),
            Some(&json!([{"type": "a"}, {"type": "b"}]))
        );
    }

    #[test]
    fn multi_line_frame_is_one_raw_envelope() {
        // Two documents in one frame is not one document; the frame comes
        // back whole, newline included.
        let text = "{\"type\":\"a\"}\n{\"type\":\"b\"}";
        let envelope = JsonClassifier.classify(text);
        assert_eq!(envelope, Envelope::Raw(text.to_owned()));
    }

    #[test]
    fn bare_scalars_are_structured_values() {
        // "42" and "\"hi\"" are valid JSON documents, not raw text.
        assert_eq!(JsonClassifier.classify("42"), Envelope::Message(json!(42)));
        assert_eq!(
            JsonClassifier.classify("\"hi\""),
            Envelope::Message(json!("hi"))
        );
    }
}

use serde::{Deserialize, Serialize};

use crate::types::MessageId;

/// Literal prefix that introduces an in-band completion marker.
pub const COMPLETION_SENTINEL: &str = r#"{"done":true"#;

/// In-band chunk that ends a streamed answer and carries the id the service
/// assigned to it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMarker {
    /// Always true for a marker.
    pub done: bool,

    /// Server-assigned id for the streamed message.
    #[serde(rename = "messageId")]
    pub message_id: MessageId,
}

impl CompletionMarker {
    /// Create a new `CompletionMarker`.
    pub fn new(message_id: MessageId) -> Self {
        Self {
            done: true,
            message_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_form_starts_with_sentinel() {
        let json = serde_json::to_string(&CompletionMarker::new(MessageId(42))).unwrap();
        assert!(json.starts_with(COMPLETION_SENTINEL));
        assert_eq!(json, r#"{"done":true,"messageId":42}"#);
    }
}

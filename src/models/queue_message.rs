use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A chat message as delivered by the queue consumer.
///
/// The same value is pushed verbatim to every room member, so the wire
/// format of a broadcast frame is the JSON form of this struct.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    /// Stable across queue redeliveries of the same logical message
    pub message_id: String,
    pub room_id: String,
    pub user_id: String,
    pub username: String,
    pub message: String,
    pub message_type: String,
    /// ISO-8601 timestamp
    pub timestamp: String,
}

impl QueueMessage {
    /// Names of the required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("messageId", &self.message_id),
            ("roomId", &self.room_id),
            ("userId", &self.user_id),
            ("messageType", &self.message_type),
            ("timestamp", &self.timestamp),
        ];
        fields
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QueueMessage {
        QueueMessage {
            message_id: "m1".to_string(),
            room_id: "r1".to_string(),
            user_id: "u1".to_string(),
            username: "alice".to_string(),
            message: "hello".to_string(),
            message_type: "TEXT".to_string(),
            timestamp: "2025-01-01T10:00:00Z".to_string(),
        }
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["messageId"], "m1");
        assert_eq!(json["roomId"], "r1");
        assert_eq!(json["messageType"], "TEXT");
    }

    #[test]
    fn reports_blank_required_fields() {
        let mut msg = sample();
        msg.message_id = "  ".to_string();
        msg.room_id = String::new();
        assert_eq!(msg.missing_fields(), vec!["messageId", "roomId"]);
        assert!(sample().missing_fields().is_empty());
    }

    #[test]
    fn rejects_payload_without_message_id() {
        let body = r#"{"roomId":"r1","userId":"u1","username":"a","message":"x","messageType":"TEXT","timestamp":"t"}"#;
        assert!(serde_json::from_str::<QueueMessage>(body).is_err());
    }
}

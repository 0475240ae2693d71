use super::{require_text, Resource, ResourceHook};
use crate::backend::Query;
use crate::error::BackendError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest message body accepted, in characters
const MAX_BODY_CHARS: usize = 4000;

pub struct Messages;

impl Resource for Messages {
    const TABLE: &'static str = "messages";
    type Record = Message;
    type New = NewMessage;
    type Patch = MessagePatch;
}

pub type MessagesHook = ResourceHook<Messages>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub conversation_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MessagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

impl ResourceHook<Messages> {
    /// Messages of one conversation, oldest first
    pub async fn conversation(&self, conversation_id: &str) -> Result<Vec<Message>, BackendError> {
        let query = Query::new()
            .eq("conversation_id", conversation_id)
            .order("created_at", true);
        self.list(&query).await
    }

    /// Unread messages addressed to `user_id`, newest first
    pub async fn unread_for(&self, user_id: &str) -> Result<Vec<Message>, BackendError> {
        let query = Query::new()
            .eq("recipient_id", user_id)
            .is_null("read_at")
            .order("created_at", false);
        self.list(&query).await
    }

    pub async fn send(&self, message: NewMessage) -> Result<Message, BackendError> {
        require_text("message body", &message.body)?;
        if message.body.chars().count() > MAX_BODY_CHARS {
            return Err(BackendError::Validation(format!(
                "message body exceeds {} characters",
                MAX_BODY_CHARS
            )));
        }
        if message.sender_id == message.recipient_id {
            return Err(BackendError::Validation(
                "cannot send a message to yourself".to_string(),
            ));
        }
        self.create(&message).await
    }

    pub async fn mark_read(&self, message_id: &str) -> Result<Message, BackendError> {
        let patch = MessagePatch {
            read_at: Some(Utc::now()),
            ..Default::default()
        };
        self.update(message_id, &patch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::test_support::client;
    use wiremock::{
        matchers::{body_partial_json, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn message_json(id: &str, read: bool) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "conversation_id": "conv-1",
            "sender_id": "buyer-1",
            "recipient_id": "supplier-1",
            "body": "Can you ship 200 units?",
            "created_at": "2026-03-01T09:30:00Z",
            "read_at": if read { serde_json::json!("2026-03-01T10:00:00Z") } else { serde_json::Value::Null }
        })
    }

    fn new_message(body: &str) -> NewMessage {
        NewMessage {
            conversation_id: "conv-1".to_string(),
            sender_id: "buyer-1".to_string(),
            recipient_id: "supplier-1".to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_conversation_is_ordered_oldest_first() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/messages"))
            .and(query_param("conversation_id", "eq.conv-1"))
            .and(query_param("order", "created_at.asc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([message_json("m1", true), message_json("m2", false)])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let messages = MessagesHook::new(client(&server))
            .conversation("conv-1")
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_read());
        assert!(!messages[1].is_read());
    }

    #[tokio::test]
    async fn test_unread_filters_on_null_read_at() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/messages"))
            .and(query_param("recipient_id", "eq.supplier-1"))
            .and(query_param("read_at", "is.null"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([message_json("m2", false)])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let unread = MessagesHook::new(client(&server))
            .unread_for("supplier-1")
            .await
            .unwrap();
        assert_eq!(unread[0].id, "m2");
    }

    #[tokio::test]
    async fn test_send_posts_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/messages"))
            .and(body_partial_json(serde_json::json!({"body": "Can you ship 200 units?"})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!([message_json("m3", false)])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sent = MessagesHook::new(client(&server))
            .send(new_message("Can you ship 200 units?"))
            .await
            .unwrap();
        assert_eq!(sent.id, "m3");
    }

    #[tokio::test]
    async fn test_send_rejects_invalid_messages_locally() {
        let server = MockServer::start().await;
        let hook = MessagesHook::new(client(&server));

        let err = hook.send(new_message("   ")).await.unwrap_err();
        assert!(matches!(err, BackendError::Validation(_)));

        let err = hook
            .send(new_message(&"x".repeat(MAX_BODY_CHARS + 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Validation(_)));

        let mut to_self = new_message("hi");
        to_self.recipient_id = to_self.sender_id.clone();
        assert!(hook.send(to_self).await.is_err());

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_patches_read_at() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/messages"))
            .and(query_param("id", "eq.m2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([message_json("m2", true)])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let message = MessagesHook::new(client(&server)).mark_read("m2").await.unwrap();
        assert!(message.is_read());

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("read_at").is_some());
        assert!(body.get("body").is_none());
    }

    #[tokio::test]
    async fn test_mark_read_missing_message_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let err = MessagesHook::new(client(&server))
            .mark_read("gone")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }
}

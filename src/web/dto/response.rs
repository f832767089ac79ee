//! Response DTOs for Web API.

use serde::Serialize;

use crate::placeholder::{CustomPlaceholder, ExternalProperty};
use crate::store::{Connection, ConnectionTarget};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Delivery target as exposed by the API. Webhook tokens are never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum TargetResponse {
    #[serde(rename = "channel", rename_all = "camelCase")]
    Channel { channel_id: String },
    #[serde(rename = "webhook", rename_all = "camelCase")]
    Webhook { webhook_id: String },
}

impl From<&ConnectionTarget> for TargetResponse {
    fn from(target: &ConnectionTarget) -> Self {
        match target {
            ConnectionTarget::Channel { channel_id } => TargetResponse::Channel {
                channel_id: channel_id.clone(),
            },
            ConnectionTarget::Webhook { webhook_id, .. } => TargetResponse::Webhook {
                webhook_id: webhook_id.clone(),
            },
        }
    }
}

/// Connection response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResponse {
    pub id: String,
    pub feed_id: String,
    pub name: String,
    pub target: TargetResponse,
    pub custom_placeholders: Vec<CustomPlaceholder>,
    pub external_properties: Vec<ExternalProperty>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Connection> for ConnectionResponse {
    fn from(connection: Connection) -> Self {
        Self {
            target: TargetResponse::from(&connection.target),
            id: connection.id,
            feed_id: connection.feed_id,
            name: connection.name,
            custom_placeholders: connection.custom_placeholders,
            external_properties: connection.external_properties,
            created_at: connection.created_at.to_rfc3339(),
            updated_at: connection.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_api_response_wraps_data() {
        let json = serde_json::to_value(ApiResponse::new(vec![1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({ "data": [1, 2] }));
    }

    #[test]
    fn test_webhook_token_is_not_exposed() {
        let connection = Connection {
            id: "id".to_string(),
            feed_id: "feed".to_string(),
            name: "News".to_string(),
            target: ConnectionTarget::webhook("w1", "secret"),
            custom_placeholders: vec![],
            external_properties: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(ConnectionResponse::from(connection)).unwrap();
        assert_eq!(
            json["target"],
            serde_json::json!({ "type": "webhook", "webhookId": "w1" })
        );
        assert!(!json.to_string().contains("secret"));
        assert_eq!(json["feedId"], "feed");
    }
}

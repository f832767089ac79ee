//! Connection types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::placeholder::{CustomPlaceholder, ExternalProperty};

/// Where a connection delivers articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectionTarget {
    /// A Discord channel.
    #[serde(rename_all = "camelCase")]
    Channel { channel_id: String },
    /// A Discord webhook.
    #[serde(rename_all = "camelCase")]
    Webhook { webhook_id: String, token: String },
}

impl ConnectionTarget {
    /// Channel target.
    pub fn channel(channel_id: impl Into<String>) -> Self {
        Self::Channel {
            channel_id: channel_id.into(),
        }
    }

    /// Webhook target.
    pub fn webhook(webhook_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::Webhook {
            webhook_id: webhook_id.into(),
            token: token.into(),
        }
    }
}

/// A feed connection: a delivery target plus its definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Connection ID (UUID v4).
    pub id: String,
    /// Feed the connection belongs to.
    pub feed_id: String,
    /// Display name.
    pub name: String,
    /// Delivery target.
    pub target: ConnectionTarget,
    /// Saved custom placeholders.
    pub custom_placeholders: Vec<CustomPlaceholder>,
    /// Saved external properties.
    pub external_properties: Vec<ExternalProperty>,
    /// When the connection was created.
    pub created_at: DateTime<Utc>,
    /// When the connection was last updated.
    pub updated_at: DateTime<Utc>,
}

/// New connection for creation.
#[derive(Debug, Clone)]
pub struct NewConnection {
    /// Feed the connection belongs to.
    pub feed_id: String,
    /// Display name.
    pub name: String,
    /// Delivery target.
    pub target: ConnectionTarget,
}

impl NewConnection {
    pub fn new(
        feed_id: impl Into<String>,
        name: impl Into<String>,
        target: ConnectionTarget,
    ) -> Self {
        Self {
            feed_id: feed_id.into(),
            name: name.into(),
            target,
        }
    }
}

/// Options for cloning a connection.
#[derive(Debug, Clone, Default)]
pub struct CloneConnection {
    /// Name of the copy.
    pub name: String,
    /// Replacement channel for the copy's target.
    pub channel_id: Option<String>,
}

/// New delivery target of an updated connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetUpdate {
    /// Deliver to a channel.
    Channel { channel_id: String },
    /// Deliver to a webhook. Without a token the stored token is kept,
    /// which requires the connection to already target a webhook.
    Webhook {
        webhook_id: String,
        token: Option<String>,
    },
}

/// Changes to a connection. Absent fields are left as they are.
#[derive(Debug, Clone, Default)]
pub struct ConnectionUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New delivery target.
    pub target: Option<TargetUpdate>,
}

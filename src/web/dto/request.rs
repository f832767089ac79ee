//! Request DTOs for Web API.

use serde::Deserialize;
use validator::{Validate, ValidationError};

use super::validation::{not_empty_trimmed, valid_name};
use crate::format::MessageTemplate;
use crate::placeholder::{CustomPlaceholder, ExternalProperty};
use crate::store::{ConnectionTarget, ConnectionUpdate, TargetUpdate};

/// Webhook target of a new connection.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WebhookTarget {
    /// Webhook ID.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub id: String,
    /// Webhook token.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub token: String,
}

/// Connection creation request.
///
/// Exactly one of `channelId` and `webhook` must be given.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_single_target"))]
pub struct CreateConnectionRequest {
    /// Display name.
    #[validate(
        length(max = 250, message = "Must be at most 250 characters"),
        custom(function = "valid_name")
    )]
    pub name: String,
    /// Discord channel to deliver to.
    #[serde(default)]
    #[validate(custom(function = "not_empty_trimmed"))]
    pub channel_id: Option<String>,
    /// Discord webhook to deliver to.
    #[serde(default)]
    pub webhook: Option<WebhookTarget>,
}

fn validate_single_target(request: &CreateConnectionRequest) -> Result<(), ValidationError> {
    match (&request.channel_id, &request.webhook) {
        (Some(_), None) => Ok(()),
        (None, Some(webhook)) => webhook.validate().map_err(|_| {
            ValidationError::new("webhook").with_message("Webhook id and token are required".into())
        }),
        _ => Err(ValidationError::new("target")
            .with_message("Exactly one of channelId and webhook is required".into())),
    }
}

impl CreateConnectionRequest {
    /// The delivery target. Call after validation.
    pub fn target(&self) -> Option<ConnectionTarget> {
        match (&self.channel_id, &self.webhook) {
            (Some(channel_id), None) => Some(ConnectionTarget::channel(channel_id.trim())),
            (None, Some(webhook)) => Some(ConnectionTarget::webhook(
                webhook.id.trim(),
                webhook.token.trim(),
            )),
            _ => None,
        }
    }
}

/// Webhook of an updated connection. The token may be omitted to keep the
/// stored one.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WebhookUpdate {
    /// Webhook ID.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub id: String,
    /// Webhook token.
    #[serde(default)]
    #[validate(custom(function = "not_empty_trimmed"))]
    pub token: Option<String>,
}

/// Connection update request.
///
/// At most one of `channelId` and `webhook`; at least one field.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_update_target"))]
pub struct UpdateConnectionRequest {
    /// New display name.
    #[serde(default)]
    #[validate(
        length(max = 250, message = "Must be at most 250 characters"),
        custom(function = "valid_name")
    )]
    pub name: Option<String>,
    /// New delivery channel.
    #[serde(default)]
    #[validate(custom(function = "not_empty_trimmed"))]
    pub channel_id: Option<String>,
    /// New delivery webhook.
    #[serde(default)]
    pub webhook: Option<WebhookUpdate>,
}

fn validate_update_target(request: &UpdateConnectionRequest) -> Result<(), ValidationError> {
    match (&request.name, &request.channel_id, &request.webhook) {
        (None, None, None) => Err(ValidationError::new("empty")
            .with_message("At least one of name, channelId and webhook is required".into())),
        (_, Some(_), Some(_)) => Err(ValidationError::new("target")
            .with_message("Only one of channelId and webhook may be given".into())),
        (_, None, Some(webhook)) => webhook.validate().map_err(|_| {
            ValidationError::new("webhook").with_message("Webhook id must not be empty".into())
        }),
        _ => Ok(()),
    }
}

impl UpdateConnectionRequest {
    /// The store-level update. Call after validation.
    pub fn into_update(self) -> ConnectionUpdate {
        let target = match (self.channel_id, self.webhook) {
            (Some(channel_id), _) => Some(TargetUpdate::Channel { channel_id }),
            (None, Some(webhook)) => Some(TargetUpdate::Webhook {
                webhook_id: webhook.id,
                token: webhook.token,
            }),
            (None, None) => None,
        };
        ConnectionUpdate {
            name: self.name,
            target,
        }
    }
}

/// Connection clone request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CloneConnectionRequest {
    /// Name of the copy.
    #[validate(
        length(max = 250, message = "Must be at most 250 characters"),
        custom(function = "valid_name")
    )]
    pub name: String,
    /// Channel for the copy; the original target is kept when absent.
    #[serde(default)]
    #[validate(custom(function = "not_empty_trimmed"))]
    pub channel_id: Option<String>,
}

/// Save request for custom placeholders.
///
/// Field-level checks on the placeholders themselves happen in the store.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveCustomPlaceholdersRequest {
    #[validate(length(max = 50, message = "At most 50 custom placeholders are allowed"))]
    pub custom_placeholders: Vec<CustomPlaceholder>,
}

/// Save request for external properties.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveExternalPropertiesRequest {
    #[validate(length(max = 50, message = "At most 50 external properties are allowed"))]
    pub external_properties: Vec<ExternalProperty>,
}

/// Preview request.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewRequest {
    /// Article to preview; a sample article is used when absent.
    pub article_id: Option<String>,
    /// Pending custom placeholders.
    #[validate(length(max = 50, message = "At most 50 custom placeholders are allowed"))]
    pub custom_placeholders: Option<Vec<CustomPlaceholder>>,
    /// Pending external properties.
    #[validate(length(max = 50, message = "At most 50 external properties are allowed"))]
    pub external_properties: Option<Vec<ExternalProperty>>,
    /// Fields to return (`*` for all).
    pub select_properties: Vec<String>,
    /// Pick a random sample article.
    pub random: Option<bool>,
    /// Client session id for last-write-wins tracking.
    #[validate(length(min = 1, max = 128, message = "Must be 1 to 128 characters"))]
    pub session_id: Option<String>,
    /// Message template to render.
    pub template: Option<MessageTemplate>,
}

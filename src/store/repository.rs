//! In-process connection registry.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use super::types::{
    CloneConnection, Connection, ConnectionTarget, ConnectionUpdate, NewConnection, TargetUpdate,
};
use super::validation::{
    normalize_placeholders, validate_custom_placeholders, validate_external_properties,
};
use crate::placeholder::{CustomPlaceholder, ExternalProperty};
use crate::{FeedhookError, Result};

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FeedhookError::Validation(
            "name must not be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn validate_target(target: &ConnectionTarget) -> Result<()> {
    match target {
        ConnectionTarget::Channel { channel_id } if channel_id.trim().is_empty() => Err(
            FeedhookError::Validation("channel id must not be empty".to_string()),
        ),
        ConnectionTarget::Webhook { webhook_id, token }
            if webhook_id.trim().is_empty() || token.trim().is_empty() =>
        {
            Err(FeedhookError::Validation(
                "webhook id and token must not be empty".to_string(),
            ))
        }
        _ => Ok(()),
    }
}

/// Resolve a target update against the current target.
fn apply_target_update(current: &ConnectionTarget, update: TargetUpdate) -> Result<ConnectionTarget> {
    let target = match update {
        TargetUpdate::Channel { channel_id } => ConnectionTarget::channel(channel_id.trim()),
        TargetUpdate::Webhook {
            webhook_id,
            token: Some(token),
        } => ConnectionTarget::webhook(webhook_id.trim(), token.trim()),
        TargetUpdate::Webhook {
            webhook_id,
            token: None,
        } => match current {
            ConnectionTarget::Webhook { token, .. } => {
                ConnectionTarget::webhook(webhook_id.trim(), token.clone())
            }
            ConnectionTarget::Channel { .. } => {
                return Err(FeedhookError::Validation(
                    "webhook token is required when switching to a webhook".to_string(),
                ))
            }
        },
    };
    validate_target(&target)?;
    Ok(target)
}

/// Copy placeholders with fresh placeholder and step ids.
fn fresh_placeholders(placeholders: &[CustomPlaceholder]) -> Vec<CustomPlaceholder> {
    placeholders
        .iter()
        .map(|placeholder| {
            let mut copy = placeholder.clone();
            copy.id = new_id();
            for step in &mut copy.steps {
                step.id = new_id();
            }
            copy
        })
        .collect()
}

fn fresh_external_properties(properties: &[ExternalProperty]) -> Vec<ExternalProperty> {
    properties
        .iter()
        .map(|property| ExternalProperty {
            id: new_id(),
            ..property.clone()
        })
        .collect()
}

/// Registry of connections, keyed by connection id.
#[derive(Debug, Default)]
pub struct ConnectionStore {
    connections: RwLock<HashMap<String, Connection>>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connection with no definitions.
    pub async fn create(&self, new: NewConnection) -> Result<Connection> {
        let name = validate_name(&new.name)?;
        validate_target(&new.target)?;

        let now = Utc::now();
        let connection = Connection {
            id: new_id(),
            feed_id: new.feed_id,
            name,
            target: new.target,
            custom_placeholders: vec![],
            external_properties: vec![],
            created_at: now,
            updated_at: now,
        };

        self.connections
            .write()
            .await
            .insert(connection.id.clone(), connection.clone());
        tracing::info!(
            "Created connection {} for feed {}",
            connection.id,
            connection.feed_id
        );
        Ok(connection)
    }

    /// Get a connection of `feed_id` by id.
    pub async fn get(&self, feed_id: &str, id: &str) -> Result<Connection> {
        self.connections
            .read()
            .await
            .get(id)
            .filter(|c| c.feed_id == feed_id)
            .cloned()
            .ok_or_else(|| FeedhookError::NotFound("connection".to_string()))
    }

    /// List the connections of a feed, oldest first.
    pub async fn list_by_feed(&self, feed_id: &str) -> Vec<Connection> {
        let mut connections: Vec<Connection> = self
            .connections
            .read()
            .await
            .values()
            .filter(|c| c.feed_id == feed_id)
            .cloned()
            .collect();
        connections.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        connections
    }

    /// Rename or retarget a connection.
    ///
    /// Nothing changes unless every given field is valid.
    pub async fn update(
        &self,
        feed_id: &str,
        id: &str,
        update: ConnectionUpdate,
    ) -> Result<Connection> {
        let name = update.name.as_deref().map(validate_name).transpose()?;

        let mut connections = self.connections.write().await;
        let connection = connections
            .get_mut(id)
            .filter(|c| c.feed_id == feed_id)
            .ok_or_else(|| FeedhookError::NotFound("connection".to_string()))?;

        let target = update
            .target
            .map(|target| apply_target_update(&connection.target, target))
            .transpose()?;

        if let Some(name) = name {
            connection.name = name;
        }
        if let Some(target) = target {
            connection.target = target;
        }
        connection.updated_at = Utc::now();
        tracing::info!("Updated connection {}", id);
        Ok(connection.clone())
    }

    /// Copy a connection, its definitions included.
    ///
    /// Definitions are deep-copied with fresh ids. `channel_id` replaces the
    /// delivery channel of the copy.
    pub async fn clone_connection(
        &self,
        feed_id: &str,
        id: &str,
        options: CloneConnection,
    ) -> Result<Connection> {
        let name = validate_name(&options.name)?;
        let source = self.get(feed_id, id).await?;

        let target = match options.channel_id {
            Some(channel_id) => {
                let target = ConnectionTarget::channel(channel_id);
                validate_target(&target)?;
                target
            }
            None => source.target.clone(),
        };

        let now = Utc::now();
        let copy = Connection {
            id: new_id(),
            feed_id: source.feed_id.clone(),
            name,
            target,
            custom_placeholders: fresh_placeholders(&source.custom_placeholders),
            external_properties: fresh_external_properties(&source.external_properties),
            created_at: now,
            updated_at: now,
        };

        self.connections
            .write()
            .await
            .insert(copy.id.clone(), copy.clone());
        tracing::info!("Cloned connection {} into {}", source.id, copy.id);
        Ok(copy)
    }

    /// Delete a connection.
    pub async fn delete(&self, feed_id: &str, id: &str) -> Result<()> {
        let mut connections = self.connections.write().await;
        match connections.get(id) {
            Some(c) if c.feed_id == feed_id => {
                connections.remove(id);
                tracing::info!("Deleted connection {}", id);
                Ok(())
            }
            _ => Err(FeedhookError::NotFound("connection".to_string())),
        }
    }

    /// Replace a connection's custom placeholders.
    ///
    /// New or edited patterns have their `\n` escapes normalized first. The
    /// whole batch is rejected if any placeholder is invalid.
    pub async fn save_custom_placeholders(
        &self,
        feed_id: &str,
        id: &str,
        placeholders: Vec<CustomPlaceholder>,
    ) -> Result<Connection> {
        let mut connections = self.connections.write().await;
        let connection = connections
            .get_mut(id)
            .filter(|c| c.feed_id == feed_id)
            .ok_or_else(|| FeedhookError::NotFound("connection".to_string()))?;

        let placeholders = normalize_placeholders(placeholders, &connection.custom_placeholders);
        validate_custom_placeholders(&placeholders).into_result()?;

        connection.custom_placeholders = placeholders;
        connection.updated_at = Utc::now();
        tracing::info!(
            "Saved {} custom placeholders for connection {}",
            connection.custom_placeholders.len(),
            id
        );
        Ok(connection.clone())
    }

    /// Replace a connection's external properties.
    pub async fn save_external_properties(
        &self,
        feed_id: &str,
        id: &str,
        properties: Vec<ExternalProperty>,
    ) -> Result<Connection> {
        validate_external_properties(&properties).into_result()?;

        let mut connections = self.connections.write().await;
        let connection = connections
            .get_mut(id)
            .filter(|c| c.feed_id == feed_id)
            .ok_or_else(|| FeedhookError::NotFound("connection".to_string()))?;

        connection.external_properties = properties
            .into_iter()
            .map(|p| ExternalProperty {
                source_field: p.source_field.trim().to_string(),
                css_selector: p.css_selector.trim().to_string(),
                ..p
            })
            .collect();
        connection.updated_at = Utc::now();
        tracing::info!(
            "Saved {} external properties for connection {}",
            connection.external_properties.len(),
            id
        );
        Ok(connection.clone())
    }
}

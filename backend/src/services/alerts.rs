//! Stock alerts and their realtime feed

use std::sync::Arc;

use shared::{can_update_fields, Action, Actor, Alert, PermissionError, Subject};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::authorize;
use crate::error::{AppError, AppResult};
use crate::repository::Repository;

/// Fan-out of newly raised alerts to realtime subscribers.
///
/// Subscribers that fall more than the channel capacity behind lose the
/// oldest alerts; the alert rows themselves are always persisted first.
#[derive(Clone)]
pub struct AlertFeed {
    sender: broadcast::Sender<Alert>,
}

impl AlertFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, alert: Alert) {
        // No listeners is not an error
        let delivered = self.sender.send(alert).unwrap_or(0);
        tracing::debug!(delivered, "Published alert");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.sender.subscribe()
    }
}

#[derive(Clone)]
pub struct AlertService {
    repo: Arc<dyn Repository>,
    feed: AlertFeed,
}

impl AlertService {
    pub fn new(repo: Arc<dyn Repository>, feed: AlertFeed) -> Self {
        Self { repo, feed }
    }

    pub async fn list(&self, actor: &impl Actor, unread_only: bool) -> AppResult<Vec<Alert>> {
        authorize(actor, Action::Read, Subject::Alert)?;
        self.repo.list_alerts(actor.restaurant_id(), unread_only).await
    }

    pub async fn unread_count(&self, actor: &impl Actor) -> AppResult<usize> {
        Ok(self.list(actor, true).await?.len())
    }

    /// Set the read flag of one alert
    pub async fn mark_read(
        &self,
        actor: &impl Actor,
        alert_id: Uuid,
        is_read: bool,
    ) -> AppResult<Alert> {
        authorize(actor, Action::Update, Subject::Alert)?;
        if !can_update_fields(Some(actor), Subject::Alert, &["is_read"]) {
            return Err(PermissionError::RestrictedFields.into());
        }

        let alert = self
            .repo
            .set_alert_read(actor.restaurant_id(), alert_id, is_read)
            .await?
            .ok_or_else(|| AppError::not_found("Alert"))?;

        tracing::debug!(alert_id = %alert_id, is_read, "Alert read state changed");
        Ok(alert)
    }

    /// Returns how many alerts were unread
    pub async fn mark_all_read(&self, actor: &impl Actor) -> AppResult<u64> {
        authorize(actor, Action::Update, Subject::Alert)?;
        let changed = self.repo.mark_all_alerts_read(actor.restaurant_id()).await?;
        tracing::info!(restaurant_id = %actor.restaurant_id(), changed, "Marked all alerts read");
        Ok(changed)
    }

    /// Receive alerts as they are raised. Callers filter by restaurant.
    pub fn subscribe(&self, actor: &impl Actor) -> AppResult<broadcast::Receiver<Alert>> {
        authorize(actor, Action::Read, Subject::Alert)?;
        Ok(self.feed.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::AlertType;

    fn alert() -> Alert {
        Alert {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            alert_type: AlertType::LowStock,
            message: "Basil is running low".to_string(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_alerts() {
        let feed = AlertFeed::new(4);
        let mut rx = feed.subscribe();
        let sent = alert();

        feed.publish(sent.clone());

        assert_eq!(rx.recv().await.unwrap(), sent);
    }

    #[test]
    fn publishing_without_listeners_is_fine() {
        AlertFeed::new(1).publish(alert());
    }
}

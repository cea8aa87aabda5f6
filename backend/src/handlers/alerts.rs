//! HTTP handlers for stock alerts, including the realtime stream

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use shared::Alert;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AlertQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadInput {
    pub is_read: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: usize,
}

#[derive(Debug, Serialize)]
pub struct MarkedAllRead {
    pub updated: u64,
}

pub async fn list_alerts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AlertQuery>,
) -> AppResult<Json<Vec<Alert>>> {
    Ok(Json(state.services.alerts.list(&user, query.unread_only).await?))
}

pub async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<UnreadCount>> {
    let unread = state.services.alerts.unread_count(&user).await?;
    Ok(Json(UnreadCount { unread }))
}

pub async fn mark_alert_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(alert_id): Path<Uuid>,
    Json(input): Json<MarkReadInput>,
) -> AppResult<Json<Alert>> {
    Ok(Json(
        state
            .services
            .alerts
            .mark_read(&user, alert_id, input.is_read)
            .await?,
    ))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<MarkedAllRead>> {
    let updated = state.services.alerts.mark_all_read(&user).await?;
    Ok(Json(MarkedAllRead { updated }))
}

/// Server-sent events carrying each alert raised for the caller's restaurant
pub async fn alert_stream(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let receiver = state.services.alerts.subscribe(&user)?;
    let restaurant_id = user.restaurant_id;
    tracing::debug!(restaurant_id = %restaurant_id, "Alert stream opened");

    let events = stream::unfold(receiver, move |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(alert) if alert.restaurant_id == restaurant_id => {
                    let event = Event::default()
                        .event("alert")
                        .id(alert.id.to_string())
                        .json_data(&alert)
                        .unwrap_or_else(|_| Event::default().event("alert"));
                    return Some((Ok::<_, Infallible>(event), receiver));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Alert stream subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

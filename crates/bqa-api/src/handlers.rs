//! API Handlers
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use bqa_core::Intent;
use chrono::Utc;
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub session_id: Option<String>,
    pub query: String,
    pub file_context: Option<String>,
    pub query_type: Option<String>,
}

impl QueryRequest {
    fn resolve(&self) -> Result<(String, Option<Intent>), String> {
        let query_type = match &self.query_type {
            Some(raw) => Some(Intent::from_str(raw)?),
            None => None,
        };
        let session_id = self
            .session_id
            .clone()
            .unwrap_or_else(|| derive_session_id(&self.query));
        Ok((session_id, query_type))
    }
}

/// Session id for callers that did not supply one: deterministic in the
/// query content and arrival time.
fn derive_session_id(query: &str) -> String {
    let seed = format!("{}|{}", query, Utc::now().timestamp_millis());
    let hash = blake3::hash(seed.as_bytes()).to_hex();
    format!("s-{}", &hash.as_str()[..16])
}

pub async fn process_query(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> (StatusCode, Json<Value>) {
    state.queries_total.inc();

    let (session_id, query_type) = match payload.resolve() {
        Ok(resolved) => resolved,
        Err(reason) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error": reason})),
            )
        }
    };

    match state
        .service
        .process_query(
            &session_id,
            &payload.query,
            payload.file_context.as_deref(),
            query_type,
        )
        .await
    {
        Ok(response) => match serde_json::to_value(&response) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            ),
        },
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": err.to_string()})),
        ),
    }
}

/// Streaming variant: one JSON progress event per SSE message, closed
/// after the terminal complete/error event.
pub async fn stream_query(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<Value>)> {
    state.queries_total.inc();

    let (session_id, query_type) = payload
        .resolve()
        .map_err(|reason| (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"error": reason}))))?;

    let rx = state.service.clone().stream_query(
        session_id,
        payload.query.clone(),
        payload.file_context.clone(),
        query_type,
    );

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Some((Ok(Event::default().event("progress").data(data)), rx))
    });

    Ok(Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": bqa_core::BQA_VERSION })),
    )
}

pub async fn metrics(State(state): State<AppState>) -> (StatusCode, String) {
    match crate::metrics::encode(&state.registry) {
        Ok(body) => (StatusCode::OK, body),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

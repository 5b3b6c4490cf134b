use super::{NewContact, RecordsError, VisitOutcome};
use crate::AppState;
use crate::auth::require_api_key;
use axum::{
    Json,
    body::Bytes,
    extract::{ConnectInfo, Path, State, rejection::JsonRejection},
    http::{Extensions, HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use std::net::SocketAddr;

/// First `x-forwarded-for` hop, then the socket peer.
fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn record_visit_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    body: Bytes,
) -> Result<impl IntoResponse, RecordsError> {
    let ip = client_ip(&headers, &extensions);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            serde_json::from_slice::<serde_json::Value>(&body)
                .ok()?
                .get("userAgent")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_default();

    let outcome = app_state
        .records
        .record_visit(&ip, &user_agent, chrono::Utc::now())
        .await?;

    Ok(match outcome {
        VisitOutcome::Counted(id) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "counted": true, "id": id })),
        ),
        VisitOutcome::AlreadyRecorded => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "counted": false,
                "message": format!(
                    "Visitor already recorded in last {} hours",
                    app_state.records.visitor_window_hours()
                ),
            })),
        ),
    })
}

pub async fn visitor_count_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let count = app_state.records.visitor_count().await;
    Json(json!({ "count": count }))
}

pub async fn visitor_data_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, RecordsError> {
    require_api_key(&headers, app_state.config.app.api_key.as_deref())?;
    let visitors = app_state.records.visitors().await;
    Ok(Json(json!({ "success": true, "visitors": visitors })))
}

pub async fn submit_contact_handler(
    State(app_state): State<AppState>,
    contact: Result<Json<NewContact>, JsonRejection>,
) -> Result<Json<serde_json::Value>, RecordsError> {
    let Json(contact) = contact?;
    app_state
        .records
        .add_contact(contact, chrono::Utc::now())
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Your message has been received.",
    })))
}

pub async fn list_contacts_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, RecordsError> {
    require_api_key(&headers, app_state.config.app.api_key.as_deref())?;
    let messages = app_state.records.contacts().await;
    Ok(Json(json!({ "success": true, "messages": messages })))
}

pub async fn delete_contact_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, RecordsError> {
    require_api_key(&headers, app_state.config.app.api_key.as_deref())?;
    app_state.records.delete_contact(&id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Message deleted successfully.",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        assert_eq!(client_ip(&headers, &extensions), "203.0.113.7");
        assert_eq!(client_ip(&HeaderMap::new(), &extensions), "127.0.0.1");
        assert_eq!(client_ip(&HeaderMap::new(), &Extensions::new()), "unknown");
    }
}

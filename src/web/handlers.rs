use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::error::{Result as WebResult, WebError};
use crate::content::{Question, next_locked_id, unlocked_questions};
use crate::scoring::{LeaderboardEntry, RecentAward};
use crate::state::AppState;
use crate::store::{MEDIA_PATH, media_path};

/// Checks the static admin passphrase: `Authorization: Passphrase <secret>`.
/// Failure is an inline rejection; the client may simply retry.
fn authorize_admin(headers: &HeaderMap, expected: &str) -> WebResult<()> {
    let auth_header = headers
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| WebError::Unauthorized("Missing Authorization header".to_string()))?;

    let auth_header_str = auth_header.to_str().unwrap_or("");
    let provided = auth_header_str.strip_prefix("Passphrase ").ok_or_else(|| {
        WebError::Unauthorized(
            "Invalid Authorization header format. Expected 'Passphrase <secret>'".to_string(),
        )
    })?;

    if provided.trim() != expected {
        tracing::warn!("Rejected admin request: wrong passphrase");
        return Err(WebError::Unauthorized("Invalid passphrase".to_string()));
    }
    Ok(())
}

fn media_for(media: &Option<Value>, question: &Question) -> Option<String> {
    media
        .as_ref()
        .and_then(|m| m.get(question.id.to_string()))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| question.youtube.clone())
}

#[derive(Serialize, Debug)]
pub struct LearnCard {
    pub id: u32,
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
}

/// The Learn view: unlocked questions in ascending id order, media links
/// merged from the store over the bundled data.
pub async fn learn_handler(State(app_state): State<AppState>) -> WebResult<Json<Vec<LearnCard>>> {
    let questions = app_state.bank.questions().await;
    let unlocked_ids = app_state.store.unlocked_ids().await;
    let media = app_state.store.snapshot(MEDIA_PATH).await;

    let cards = unlocked_questions(&questions, &unlocked_ids)
        .into_iter()
        .map(|q| LearnCard {
            id: q.id,
            question: q.question.clone(),
            answer: q.answer.clone(),
            youtube: media_for(&media, &q),
        })
        .collect();

    Ok(Json(cards))
}

#[derive(Serialize, Debug)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
    pub recent: Vec<RecentAward>,
}

pub async fn leaderboard_handler(
    State(app_state): State<AppState>,
) -> WebResult<Json<LeaderboardResponse>> {
    let limit = app_state.settings.game.leaderboard_size;
    Ok(Json(LeaderboardResponse {
        entries: app_state.ledger.leaderboard(limit).await,
        recent: app_state.ledger.recent_awards().await,
    }))
}

#[derive(Serialize, Debug)]
pub struct AdminQuestionRow {
    pub id: u32,
    pub question: String,
    pub answer: String,
    pub unlocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
}

pub async fn admin_questions_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> WebResult<Json<Vec<AdminQuestionRow>>> {
    authorize_admin(&headers, &app_state.settings.admin.passphrase)?;

    let questions = app_state.bank.questions().await;
    let unlocked_ids = app_state.store.unlocked_ids().await;
    let media = app_state.store.snapshot(MEDIA_PATH).await;

    let rows = questions
        .iter()
        .map(|q| AdminQuestionRow {
            id: q.id,
            question: q.question.clone(),
            answer: q.answer.clone(),
            unlocked: unlocked_ids.contains(&q.id),
            youtube: media_for(&media, q),
        })
        .collect();

    Ok(Json(rows))
}

#[derive(Serialize, Debug)]
pub struct UnlockResponse {
    pub unlocked: Vec<u32>,
}

pub async fn unlock_next_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> WebResult<Json<UnlockResponse>> {
    authorize_admin(&headers, &app_state.settings.admin.passphrase)?;

    let questions = app_state.bank.questions().await;
    let mut unlocked_ids = app_state.store.unlocked_ids().await;

    if let Some(next_id) = next_locked_id(&questions, &unlocked_ids) {
        unlocked_ids.insert(next_id);
        app_state
            .store
            .write_unlocked_ids(&unlocked_ids)
            .await
            .map_err(WebError::InternalServerError)?;
        tracing::info!(question.id = next_id, "Unlocked next question");
    }

    Ok(Json(UnlockResponse {
        unlocked: unlocked_ids.into_iter().collect(),
    }))
}

pub async fn unlock_all_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> WebResult<Json<UnlockResponse>> {
    authorize_admin(&headers, &app_state.settings.admin.passphrase)?;

    let questions = app_state.bank.questions().await;
    let unlocked_ids = questions.iter().map(|q| q.id).collect();
    app_state
        .store
        .write_unlocked_ids(&unlocked_ids)
        .await
        .map_err(WebError::InternalServerError)?;
    tracing::info!(questions.count = unlocked_ids.len(), "Unlocked all questions");

    Ok(Json(UnlockResponse {
        unlocked: unlocked_ids.into_iter().collect(),
    }))
}

#[derive(Deserialize, Debug)]
pub struct UnlockRequest {
    pub id: u32,
    pub unlocked: bool,
}

pub async fn unlock_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UnlockRequest>,
) -> WebResult<Json<UnlockResponse>> {
    authorize_admin(&headers, &app_state.settings.admin.passphrase)?;

    let questions = app_state.bank.questions().await;
    if !questions.iter().any(|q| q.id == payload.id) {
        return Err(WebError::QuestionNotFound(payload.id));
    }

    let mut unlocked_ids = app_state.store.unlocked_ids().await;
    if payload.unlocked {
        unlocked_ids.insert(payload.id);
    } else {
        unlocked_ids.remove(&payload.id);
    }
    app_state
        .store
        .write_unlocked_ids(&unlocked_ids)
        .await
        .map_err(WebError::InternalServerError)?;
    tracing::info!(
        question.id = payload.id,
        question.unlocked = payload.unlocked,
        "Toggled unlock state"
    );

    Ok(Json(UnlockResponse {
        unlocked: unlocked_ids.into_iter().collect(),
    }))
}

#[derive(Deserialize, Debug)]
pub struct MediaRequest {
    pub id: u32,
    pub url: String,
}

/// Stores a media link for a question. The URL is kept as an opaque string;
/// the client is responsible for turning it into something embeddable.
pub async fn media_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<MediaRequest>,
) -> WebResult<StatusCode> {
    authorize_admin(&headers, &app_state.settings.admin.passphrase)?;

    let questions = app_state.bank.questions().await;
    if !questions.iter().any(|q| q.id == payload.id) {
        return Err(WebError::QuestionNotFound(payload.id));
    }

    app_state
        .store
        .write(media_path(payload.id), json!(payload.url))
        .await
        .map_err(WebError::InternalServerError)?;
    tracing::info!(question.id = payload.id, "Updated media link");

    Ok(StatusCode::OK)
}

pub async fn refresh_content_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> WebResult<StatusCode> {
    authorize_admin(&headers, &app_state.settings.admin.passphrase)?;

    app_state.bank.refresh().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to refresh question bank");
        WebError::InternalServerError(format!("Failed to refresh question bank: {}", e))
    })?;

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::AUTHORIZATION,
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn test_authorize_admin_accepts_correct_passphrase() {
        let headers = headers_with_auth("Passphrase godfirst");
        assert!(authorize_admin(&headers, "godfirst").is_ok());
    }

    #[test]
    fn test_authorize_admin_rejects_wrong_passphrase() {
        let headers = headers_with_auth("Passphrase wrong");
        assert!(matches!(
            authorize_admin(&headers, "godfirst"),
            Err(WebError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_authorize_admin_rejects_missing_or_malformed_header() {
        assert!(matches!(
            authorize_admin(&HeaderMap::new(), "godfirst"),
            Err(WebError::Unauthorized(_))
        ));

        let headers = headers_with_auth("Bearer godfirst");
        assert!(matches!(
            authorize_admin(&headers, "godfirst"),
            Err(WebError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_media_for_prefers_store_override() {
        let question = Question {
            id: 4,
            question: "Q".to_string(),
            answer: "A".to_string(),
            youtube: Some("https://bundled.example".to_string()),
        };

        let media = Some(json!({ "4": "https://override.example" }));
        assert_eq!(
            media_for(&media, &question).as_deref(),
            Some("https://override.example")
        );

        assert_eq!(
            media_for(&None, &question).as_deref(),
            Some("https://bundled.example")
        );
    }
}

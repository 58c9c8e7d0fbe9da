// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the game API.
//!
//! Routes: POST/GET /api/rooms, GET /api/random-message, POST /api/guess,
//! POST /api/context. Every game outcome maps to one stable status code;
//! faults never leak stack traces, only an `{"error": ...}` body.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::warn;

use whosaid_core::{ArchiveMessage, MessageContext, WhosaidError};
use whosaid_game::{ContextUnlockOutcome, GuessOutcome, ScoreSnapshot};

use crate::server::GatewayState;

/// Request body for POST /api/rooms.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Optional display name; sanitized server-side.
    #[serde(default)]
    pub room_name: Option<String>,
    /// Base64-encoded SQLite archive.
    pub db_base64: String,
}

/// Response body for POST /api/rooms.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreatedResponse {
    pub room_id: String,
    pub display_name: String,
}

/// Query parameters for GET /api/rooms.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfoQuery {
    pub room_id: String,
}

/// Response body for GET /api/rooms.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfoResponse {
    pub room_id: String,
    pub display_name: String,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// One leaderboard row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub total_points: i64,
    pub current_streak: u32,
    pub best_streak: u32,
}

/// Query parameters for GET /api/random-message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionQuery {
    pub room_id: String,
    pub username: String,
}

/// Response body for GET /api/random-message.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBody {
    pub question_id: String,
    #[serde(flatten)]
    pub message: ArchiveMessage,
    pub score: ScoreSnapshot,
}

/// Request body for POST /api/guess.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessRequest {
    pub room_id: String,
    pub username: String,
    pub question_id: String,
    #[serde(default)]
    pub choice_id: Option<String>,
    /// Skip the question, scoring it as incorrect regardless of choice.
    #[serde(default)]
    pub forfeit: bool,
}

/// Response body for POST /api/guess.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessBody {
    pub correct: bool,
    pub display_name: Option<String>,
    pub full_name: Option<String>,
    pub correct_choice_id: Option<String>,
    pub awarded_points: i64,
    pub base_points: f64,
    pub streak_multiplier: f64,
    pub elapsed_seconds: f64,
    pub total_points: i64,
    pub current_streak: u32,
    pub best_streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<MessageContext>,
}

/// Request body for POST /api/context.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextRequest {
    pub room_id: String,
    pub username: String,
    pub question_id: String,
}

/// Response body for POST /api/context.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextBody {
    pub cost: i64,
    pub context_unlocked: bool,
    pub context: MessageContext,
    pub score: ScoreSnapshot,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Status code for a propagated fault.
fn fault_status(error: &WhosaidError) -> StatusCode {
    match error {
        WhosaidError::NoEligibleMessages => StatusCode::BAD_REQUEST,
        WhosaidError::ArchiveTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        WhosaidError::Config(_) | WhosaidError::EmptyDeck => StatusCode::BAD_REQUEST,
        WhosaidError::Archive { .. }
        | WhosaidError::RoomIdCollision(_)
        | WhosaidError::Io(_)
        | WhosaidError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /api/rooms
///
/// Creates a room from a base64-encoded archive upload.
pub async fn create_room(
    State(state): State<GatewayState>,
    Json(body): Json<CreateRoomRequest>,
) -> Response {
    let archive_bytes = match base64::engine::general_purpose::STANDARD.decode(&body.db_base64) {
        Ok(bytes) => bytes,
        Err(_) => return error_body(StatusCode::BAD_REQUEST, "invalid database encoding"),
    };

    match state
        .rooms
        .create_room(body.room_name.as_deref(), &archive_bytes)
        .await
    {
        Ok(created) => (
            StatusCode::CREATED,
            Json(RoomCreatedResponse {
                room_id: created.room_id,
                display_name: created.display_name,
            }),
        )
            .into_response(),
        Err(error) => {
            warn!(%error, "room creation failed");
            error_body(fault_status(&error), &error.to_string())
        }
    }
}

/// GET /api/rooms
///
/// Returns the room's display name and leaderboard.
pub async fn room_info(
    State(state): State<GatewayState>,
    Query(query): Query<RoomInfoQuery>,
) -> Response {
    let Some(room) = state.rooms.room(&query.room_id) else {
        return error_body(StatusCode::NOT_FOUND, "room not found");
    };

    let leaderboard = room
        .leaderboard()
        .into_iter()
        .map(|record| LeaderboardEntry {
            username: record.username,
            total_points: record.score.total_points,
            current_streak: record.score.current_streak,
            best_streak: record.score.best_streak,
        })
        .collect();

    Json(RoomInfoResponse {
        room_id: room.id().to_string(),
        display_name: room.display_name().to_string(),
        leaderboard,
    })
    .into_response()
}

/// GET /api/random-message
///
/// Issues the player's next question.
pub async fn next_question(
    State(state): State<GatewayState>,
    Query(query): Query<QuestionQuery>,
) -> Response {
    let Some(room) = state.rooms.room(&query.room_id) else {
        return error_body(StatusCode::NOT_FOUND, "room not found");
    };
    let session = match room.get_or_create_player(&query.username) {
        Ok(session) => session,
        Err(error) => return error_body(fault_status(&error), &error.to_string()),
    };

    match session.engine().prepare_question().await {
        Ok(Some(question)) => Json(QuestionBody {
            question_id: question.question_id,
            message: question.message,
            score: question.score,
        })
        .into_response(),
        Ok(None) => error_body(StatusCode::SERVICE_UNAVAILABLE, "no messages available"),
        Err(error) => {
            warn!(%error, "question preparation failed");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "archive error while loading message",
            )
        }
    }
}

/// POST /api/guess
///
/// Evaluates a guess, or forfeits the question when the body asks for it.
pub async fn submit_guess(
    State(state): State<GatewayState>,
    Json(body): Json<GuessRequest>,
) -> Response {
    let Some(room) = state.rooms.room(&body.room_id) else {
        return error_body(StatusCode::NOT_FOUND, "room not found");
    };
    let session = match room.get_or_create_player(&body.username) {
        Ok(session) => session,
        Err(error) => return error_body(fault_status(&error), &error.to_string()),
    };

    let outcome = if body.forfeit {
        session.engine().forfeit_question(&body.question_id).await
    } else {
        session
            .engine()
            .evaluate_guess(&body.question_id, body.choice_id.as_deref())
            .await
    };

    match outcome {
        GuessOutcome::Success(response) => Json(GuessBody {
            correct: response.correct,
            display_name: response.display_name,
            full_name: response.full_name,
            correct_choice_id: response.correct_choice_id,
            awarded_points: response.awarded_points,
            base_points: response.base_points,
            streak_multiplier: response.streak_multiplier,
            elapsed_seconds: response.elapsed_seconds,
            total_points: response.score.total_points,
            current_streak: response.score.current_streak,
            best_streak: response.score.best_streak,
            context: response.context,
        })
        .into_response(),
        GuessOutcome::NotFound => {
            error_body(StatusCode::NOT_FOUND, "question not found or expired")
        }
        GuessOutcome::InvalidRequest => error_body(StatusCode::BAD_REQUEST, "missing choiceId"),
    }
}

/// POST /api/context
///
/// Purchases the surrounding messages for an open question.
pub async fn unlock_context(
    State(state): State<GatewayState>,
    Json(body): Json<ContextRequest>,
) -> Response {
    let Some(room) = state.rooms.room(&body.room_id) else {
        return error_body(StatusCode::NOT_FOUND, "room not found");
    };
    let session = match room.get_or_create_player(&body.username) {
        Ok(session) => session,
        Err(error) => return error_body(fault_status(&error), &error.to_string()),
    };

    match session.engine().unlock_context(&body.question_id).await {
        ContextUnlockOutcome::Success(response) => Json(ContextBody {
            cost: response.cost,
            context_unlocked: true,
            context: response.context,
            score: response.score,
        })
        .into_response(),
        ContextUnlockOutcome::NotFound => {
            error_body(StatusCode::NOT_FOUND, "question not found or expired")
        }
        ContextUnlockOutcome::InsufficientFunds => {
            error_body(StatusCode::BAD_REQUEST, "not enough points to buy context")
        }
        ContextUnlockOutcome::Failed(error) => {
            warn!(%error, "context unlock failed");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "archive error while fetching context",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_room_request_deserializes_without_name() {
        let json = r#"{"dbBase64": "AAAA"}"#;
        let req: CreateRoomRequest = serde_json::from_str(json).unwrap();
        assert!(req.room_name.is_none());
        assert_eq!(req.db_base64, "AAAA");
    }

    #[test]
    fn guess_request_defaults() {
        let json = r#"{
            "roomId": "abcdefghij",
            "username": "alice",
            "questionId": "q-1"
        }"#;
        let req: GuessRequest = serde_json::from_str(json).unwrap();
        assert!(req.choice_id.is_none());
        assert!(!req.forfeit);
    }

    #[test]
    fn question_body_flattens_message_fields() {
        let body = QuestionBody {
            question_id: "q-1".to_string(),
            message: ArchiveMessage {
                id: "m1".to_string(),
                content: Some("hello".to_string()),
                timestamp: None,
                display_name: None,
                full_name: None,
                attachments: vec![],
                embeds: vec![],
                author_id: Some("p1".to_string()),
                choices: vec![],
            },
            score: ScoreSnapshot {
                total_points: 10,
                current_streak: 1,
                best_streak: 2,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"questionId\":\"q-1\""));
        assert!(json.contains("\"content\":\"hello\""));
        assert!(json.contains("\"totalPoints\":10"));
    }

    #[test]
    fn guess_body_serializes_camel_case_and_skips_missing_context() {
        let body = GuessBody {
            correct: true,
            display_name: Some("Ali".to_string()),
            full_name: None,
            correct_choice_id: Some("p1".to_string()),
            awarded_points: 750,
            base_points: 750.0,
            streak_multiplier: 1.0,
            elapsed_seconds: 10.0,
            total_points: 750,
            current_streak: 1,
            best_streak: 1,
            context: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"correctChoiceId\":\"p1\""));
        assert!(json.contains("\"awardedPoints\":750"));
        assert!(!json.contains("\"context\""));
    }

    #[test]
    fn context_body_serializes() {
        let body = ContextBody {
            cost: 100,
            context_unlocked: true,
            context: MessageContext::default(),
            score: ScoreSnapshot {
                total_points: 900,
                current_streak: 1,
                best_streak: 1,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"cost\":100"));
        assert!(json.contains("\"contextUnlocked\":true"));
        assert!(json.contains("\"before\":null"));
    }

    #[test]
    fn fault_statuses_are_stable() {
        assert_eq!(
            fault_status(&WhosaidError::NoEligibleMessages),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            fault_status(&WhosaidError::ArchiveTooLarge { limit: 1 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            fault_status(&WhosaidError::Archive {
                source: "down".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

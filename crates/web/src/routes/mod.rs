use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use chess_academy_core::{
    prepare_upload, BoardView, Error, Headers, HistoryEntry, Navigator, Replayer, UploadPayload,
};

use crate::AppState;

pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::GameNotFound { .. } => StatusCode::NOT_FOUND,
            Error::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        tracing::warn!("Request failed: {}", self.0);
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Deserialize)]
pub struct ReplayQuery {
    #[serde(default)]
    pub game: usize,
}

#[derive(Serialize)]
pub struct ReplayResponse {
    pub headers: Headers,
    pub history: Vec<HistoryEntry>,
    pub board: BoardView,
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn parse_pgn(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<UploadPayload>, ApiError> {
    let payload = prepare_upload(body, &state.config)?;
    Ok(Json(payload))
}

pub async fn replay_game(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReplayQuery>,
    body: String,
) -> Result<Json<ReplayResponse>, ApiError> {
    let payload = prepare_upload(body, &state.config)?;
    let count = payload.games.len();
    let game = payload
        .games
        .into_iter()
        .nth(query.game)
        .ok_or(Error::GameNotFound {
            index: query.game,
            count,
        })?;

    let mut replayer = Replayer::new();
    replayer.load_game(&game);
    let navigator = Navigator::new(replayer.into_history());

    Ok(Json(ReplayResponse {
        board: navigator.board_view(),
        history: navigator.history().to_vec(),
        headers: game.headers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chess_academy_core::Config;
    use serde_json::Value;
    use tower::ServiceExt;

    const GAME: &str = "[Event \"Test\"]\n[White \"A\"]\n[Black \"B\"]\n\n1. e4 e5 2. Nf3 Nc6 *";

    fn router() -> axum::Router {
        crate::app(Arc::new(AppState {
            config: Config::default(),
        }))
    }

    async fn post(uri: &str, body: &str) -> (StatusCode, Value) {
        let response = router()
            .oneshot(
                Request::post(uri)
                    .header("content-type", "text/plain")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_parse_returns_payload() {
        let (status, body) = post("/api/pgn/parse", GAME).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["games"].as_array().unwrap().len(), 1);
        assert_eq!(body["games"][0]["moveCount"], 4);
        assert_eq!(body["metadata"]["validGames"], 1);
        assert_eq!(body["usedFallback"], false);
    }

    #[tokio::test]
    async fn test_parse_empty_body_is_rejected() {
        let (status, body) = post("/api/pgn/parse", "   ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "PGN content is empty");
    }

    #[tokio::test]
    async fn test_replay_game() {
        let (status, body) = post("/api/pgn/replay?game=0", GAME).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["headers"]["White"], "A");
        assert_eq!(body["history"].as_array().unwrap().len(), 4);
        assert_eq!(body["history"][3]["san"], "Nc6");
        assert_eq!(body["board"]["moveIndex"], -1);
    }

    #[tokio::test]
    async fn test_replay_unknown_game() {
        let (status, body) = post("/api/pgn/replay?game=5", GAME).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("Game 5"));
    }
}

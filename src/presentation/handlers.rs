// HTTP request handlers
use crate::application::builder::BoardEditor;
use crate::application::dashboard_service::{EmbedRequest, LoadOutcome};
use crate::application::render::render_dashboard;
use crate::domain::board::{Board, MAX_GRID_EXTENT};
use crate::domain::dashboard::{EmbedConfigPatch, EmbedType};
use crate::domain::parameter::ParameterValues;
use crate::infrastructure::board_store::StoreError;
use crate::infrastructure::chunked_stream::stream_from_receiver;
use crate::infrastructure::embed_codec::{
    generate_embed_url, generate_iframe_code, sandbox_attributes, validate_embed_permissions,
    Dimension, EmbedOptions, EmbedPermission, IframeOptions, SIGNED_TOKEN_KEY,
};
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::infrastructure::signed_token::verify_signed_token;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

async fn respond<T: Serialize>(status: StatusCode, data: &T, compress: bool) -> Response {
    match json_response(status, data, compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

async fn error_response(status: StatusCode, error: &str, message: String, compress: bool) -> Response {
    respond(status, &json!({ "error": error, "message": message }), compress).await
}

async fn not_found(id: &str, compress: bool) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "Dashboard Not Found",
        format!("The dashboard \"{id}\" could not be found."),
        compress,
    )
    .await
}

/// List catalog dashboards
pub async fn list_dashboards(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let compress = accepts_brotli(&headers);
    match state.dashboard_service.list_dashboards().await {
        Ok(dashboards) => respond(StatusCode::OK, &dashboards, compress).await,
        Err(e) => {
            tracing::error!(error = %e, "failed to list dashboards");
            respond(StatusCode::OK, &Vec::<()>::new(), compress).await
        }
    }
}

/// Render an embedded dashboard from the embed URL surface
pub async fn embed_dashboard(
    Path((embed_type, id)): Path<(String, String)>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);
    let embed_type: EmbedType = match embed_type.parse() {
        Ok(embed_type) => embed_type,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, "Invalid Embed Type", message, compress).await,
    };

    let claims = if embed_type == EmbedType::Signed {
        let Some(token) = query.iter().find(|(k, _)| k == SIGNED_TOKEN_KEY).map(|(_, v)| v) else {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "Missing Token",
                "signed embeds require a `signed` token".to_string(),
                compress,
            )
            .await;
        };
        let Some(secret) = state.secret_key() else {
            tracing::warn!(dashboard_id = %id, "signed embed requested but no secret key is configured");
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Signing Disabled",
                "signed embeds are not configured".to_string(),
                compress,
            )
            .await;
        };
        match verify_signed_token(token, secret, Utc::now().timestamp()) {
            Ok(claims) if claims.covers(&id) => Some(claims),
            Ok(claims) => {
                tracing::warn!(
                    dashboard_id = %id,
                    resource = ?claims.resource.dashboard,
                    "embed token was minted for another dashboard"
                );
                return error_response(
                    StatusCode::UNAUTHORIZED,
                    "Invalid Token",
                    "token does not cover this dashboard".to_string(),
                    compress,
                )
                .await;
            }
            Err(e) => {
                tracing::warn!(dashboard_id = %id, error = %e, "rejected embed token");
                return error_response(StatusCode::UNAUTHORIZED, "Invalid Token", e.to_string(), compress).await;
            }
        }
    } else {
        None
    };

    let request = EmbedRequest {
        embed_type,
        query: &query,
        claims: claims.as_ref(),
    };
    match state.dashboard_service.open_embedded(&id, request).await {
        Ok(Some(session)) => {
            let view = render_dashboard(&session);
            respond(StatusCode::OK, &view, compress).await
        }
        Ok(None) => not_found(&id, compress).await,
        Err(e) => {
            tracing::error!(dashboard_id = %id, error = %e, "failed to open dashboard");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedUrlRequest {
    /// Defaults to the dashboard's own embed type.
    pub embed_type: Option<EmbedType>,
    #[serde(default)]
    pub parameters: ParameterValues,
    #[serde(default)]
    pub config: EmbedConfigPatch,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub class_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmbedUrlResponse {
    pub url: String,
    pub iframe: String,
}

/// Generate a shareable embed URL and iframe snippet
pub async fn create_embed_url(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmbedUrlRequest>,
) -> Response {
    let compress = accepts_brotli(&headers);
    let dashboard = match state.dashboard_service.load(&id, request.embed_type).await {
        Ok(LoadOutcome::Loaded(dashboard)) => dashboard,
        Ok(LoadOutcome::NotFound) => return not_found(&id, compress).await,
        Err(e) => {
            tracing::error!(dashboard_id = %id, error = %e, "failed to load dashboard");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let permissions: Result<Vec<EmbedPermission>, String> =
        request.permissions.iter().map(|p| p.parse()).collect();
    let permissions = match permissions {
        Ok(permissions) => permissions,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, "Invalid Permission", message, compress).await,
    };
    if !validate_embed_permissions(dashboard.embed_type, &permissions) {
        return error_response(
            StatusCode::FORBIDDEN,
            "Permission Denied",
            format!("{} embeds do not grant {:?}", dashboard.embed_type, request.permissions),
            compress,
        )
        .await;
    }

    let config = dashboard.embed_config.merged(&request.config);
    let options = EmbedOptions {
        base_url: &state.embed.base_url,
        dashboard_id: &dashboard.id,
        embed_type: dashboard.embed_type,
        parameters: &request.parameters,
        config: &config,
        secret_key: state.secret_key(),
        expires_in: Some(state.embed.token_ttl_secs),
        now: Utc::now().timestamp(),
    };
    let url = match generate_embed_url(&options) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(dashboard_id = %id, error = %e, "failed to generate embed url");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Embed Failed", e.to_string(), compress).await;
        }
    };

    let iframe = generate_iframe_code(&IframeOptions {
        width: request.width.map(Dimension::Px),
        height: request.height.map(Dimension::Px),
        class_name: request.class_name,
        sandbox: Some(
            sandbox_attributes(dashboard.embed_type)
                .into_iter()
                .map(String::from)
                .collect(),
        ),
        ..IframeOptions::new(url.clone())
    });
    respond(StatusCode::OK, &EmbedUrlResponse { url, iframe }, compress).await
}

/// Stream a dashboard's active tab (progressive loading)
pub async fn stream_dashboard(
    Path(id): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);
    match state.dashboard_service.open(&id, &query).await {
        Ok(Some(session)) => {
            let rx = state.streaming_service.stream_dashboard(&session);
            stream_from_receiver(rx, compress).into_response()
        }
        Ok(None) => not_found(&id, compress).await,
        Err(e) => {
            tracing::error!(dashboard_id = %id, error = %e, "failed to open dashboard");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Names of saved builder boards
pub async fn list_boards(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let compress = accepts_brotli(&headers);
    match state.board_store.list() {
        Ok(names) => respond(StatusCode::OK, &names, compress).await,
        Err(e) => store_error(e, compress).await,
    }
}

pub async fn get_board(
    Path(name): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);
    match state.board_store.load(&name) {
        Ok(board) => respond(StatusCode::OK, &board, compress).await,
        Err(e) => store_error(e, compress).await,
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveBoardQuery {
    /// Tab to auto-organize before saving.
    pub organize: Option<String>,
}

/// Save a board under the path name, optionally repacking one tab first
pub async fn save_board(
    Path(name): Path<String>,
    Query(query): Query<SaveBoardQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(mut board): Json<Board>,
) -> Response {
    let compress = accepts_brotli(&headers);
    if let Some(card) = board.oversized_item() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid Board",
            format!("card {:?} lies beyond {MAX_GRID_EXTENT} grid units", card.id),
            compress,
        )
        .await;
    }
    // The path name is the stored key and decides template handling.
    board.name = name;
    let mut editor = BoardEditor::from_board(board);
    if let Some(tab) = query.organize.as_deref() {
        if !editor.set_active_tab(tab) {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Unknown Tab",
                format!("board has no tab named {tab:?}"),
                compress,
            )
            .await;
        }
        editor.auto_organize();
    }

    let board = editor.into_board();
    match state.board_store.save(&board) {
        Ok(()) => respond(StatusCode::OK, &board, compress).await,
        Err(e) => store_error(e, compress).await,
    }
}

async fn store_error(error: StoreError, compress: bool) -> Response {
    let status = match &error {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::InvalidName(_) => StatusCode::BAD_REQUEST,
        StoreError::Malformed { .. } | StoreError::Io { .. } => {
            tracing::error!(error = ?error, "board store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, "Board Store", error.to_string(), compress).await
}

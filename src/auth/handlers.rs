use std::future::Future;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginPrompt, LoginRequest, RegisterFailure, RegisterRequest},
        gate::Gated,
        repo_types::User,
        session::{expire_cookie, set_cookie, Session, SessionKey},
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

/// Runs `action` for the session's user, or answers 401 with a login prompt
/// without running it.
pub(crate) async fn gated<T, F, Fut>(
    state: &AppState,
    key: SessionKey,
    action: F,
) -> Result<Response, ApiError>
where
    T: IntoResponse,
    F: FnOnce(User) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let Some(id) = key.0 else {
        return Ok(prompt(LoginPrompt::default()));
    };
    let mut session = state.sessions.load(id);
    let presented = session.token().map(str::to_owned);
    let outcome = state.gate.with_auth(&mut session, action).await;
    forget_if_cleared(state, id, presented.as_deref(), &session);

    match outcome? {
        Gated::Allowed(result) => Ok(result?.into_response()),
        Gated::Denied(login_prompt) => Ok(prompt(login_prompt)),
    }
}

/// The gate only ever clears a session. Anything else stored under `id`
/// since it was loaded (a logout, another sign-in) wins.
fn forget_if_cleared(state: &AppState, id: Uuid, presented: Option<&str>, session: &Session) {
    if let Some(token) = presented {
        if session.is_anonymous() {
            state.sessions.discard_if_token(id, token);
        }
    }
}

fn prompt(login_prompt: LoginPrompt) -> Response {
    (StatusCode::UNAUTHORIZED, Json(login_prompt)).into_response()
}

fn cookie_headers(value: header::HeaderValue) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    headers
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    key: SessionKey,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    let mut session = Session::default();
    let result = state
        .gate
        .register(
            &mut session,
            &payload.email,
            &payload.password,
            payload.full_name.as_deref(),
        )
        .await?;

    let status = match result.error {
        None => StatusCode::CREATED,
        Some(RegisterFailure::DuplicateEmail) => StatusCode::CONFLICT,
        Some(_) => StatusCode::BAD_REQUEST,
    };
    if result.ok {
        let id = state.sessions.start(key.0, session, state.gate.token_ttl());
        Ok((status, cookie_headers(set_cookie(id)), Json(result)).into_response())
    } else {
        Ok((status, Json(result)).into_response())
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    key: SessionKey,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let mut session = Session::default();
    let result = state
        .gate
        .login(&mut session, &payload.email, &payload.password)
        .await?;

    if result.ok {
        let id = state.sessions.start(key.0, session, state.gate.token_ttl());
        debug!(sessions = state.sessions.authenticated_count(), "session started");
        Ok((cookie_headers(set_cookie(id)), Json(result)).into_response())
    } else {
        Ok((StatusCode::UNAUTHORIZED, Json(result)).into_response())
    }
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>, key: SessionKey) -> Response {
    if let Some(id) = key.0 {
        let mut session = state.sessions.load(id);
        state.gate.logout(&mut session);
        state.sessions.end(id);
    }
    (
        StatusCode::NO_CONTENT,
        cookie_headers(expire_cookie()),
    )
        .into_response()
}

#[instrument(skip(state))]
pub async fn get_me(State(state): State<AppState>, key: SessionKey) -> Result<Response, ApiError> {
    let Some(id) = key.0 else {
        return Ok(prompt(LoginPrompt::default()));
    };
    let mut session = state.sessions.load(id);
    let presented = session.token().map(str::to_owned);
    let result = state.gate.gate(&mut session).await;
    forget_if_cleared(&state, id, presented.as_deref(), &session);

    let result = result?;
    if result.authenticated {
        Ok(Json(result).into_response())
    } else {
        Ok((StatusCode::UNAUTHORIZED, Json(result)).into_response())
    }
}

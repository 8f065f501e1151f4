use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{MediaItem, MediaType, RecentRecommendationEntry};
use crate::services::{providers::tmdb::poster_url, HeroCoordinator, IntersectionSample, Phase};

use super::state::HeroSession;
use super::AppState;

// Request/Response types

#[derive(Debug, Default, Deserialize)]
pub struct MountRequest {
    #[serde(default)]
    pub signed_in: bool,
}

#[derive(Debug, Deserialize)]
pub struct IntersectionRequest {
    pub sample: IntersectionSample,
    #[serde(default)]
    pub recent_recommendations: Vec<RecentRecommendationEntry>,
}

/// Everything the front end needs to render a resolved pick
#[derive(Debug, Serialize, PartialEq)]
pub struct HeroCard {
    pub id: u64,
    pub title: String,
    pub poster_url: Option<String>,
    pub link: String,
    pub confidence: u8,
    pub match_label: String,
    pub release_year: Option<i32>,
    pub genres: String,
}

impl HeroCard {
    fn new(
        item: &MediaItem,
        media_type: MediaType,
        confidence: u8,
        signed_in: bool,
        image_base: &str,
    ) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            poster_url: poster_url(image_base, item.poster_path.as_deref()),
            link: format!("/{}/{}", media_type.route_prefix(), item.id),
            confidence,
            match_label: match_label(confidence, signed_in),
            release_year: item.release_year(),
            genres: item.genre_summary(),
        }
    }
}

/// What the hero slot should show
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeroView {
    /// Not yet near the viewport
    Placeholder,
    /// Resolution under way
    Skeleton,
    Recommendation(HeroCard),
    /// Resolved with nothing to recommend; render the static posters
    Fallback,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub phase: Phase,
    pub has_fetched: bool,
    pub view: HeroView,
}

impl SessionResponse {
    fn new(session_id: Uuid, session: &HeroSession, image_base: &str) -> Self {
        let coordinator = &session.coordinator;
        Self {
            session_id,
            phase: coordinator.phase(),
            has_fetched: coordinator.state().has_fetched(),
            view: hero_view(coordinator, session.signed_in, image_base),
        }
    }
}

pub fn match_label(confidence: u8, signed_in: bool) -> String {
    let audience = if signed_in { "You" } else { "Viewers Like You" };
    format!("{}% Match for {}", confidence, audience)
}

fn hero_view(coordinator: &HeroCoordinator, signed_in: bool, image_base: &str) -> HeroView {
    match coordinator.phase() {
        Phase::Idle => HeroView::Placeholder,
        Phase::Visible | Phase::Loading => HeroView::Skeleton,
        Phase::Resolved => {
            let picked = coordinator
                .resolution()
                .and_then(|r| r.item.as_ref().map(|item| (item, r.confidence)));
            match picked {
                Some((item, confidence)) => HeroView::Recommendation(HeroCard::new(
                    item,
                    coordinator.target(),
                    confidence,
                    signed_in,
                    image_base,
                )),
                None => HeroView::Fallback,
            }
        }
    }
}

fn session_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Hero session {}", id))
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Mount a hero component
pub async fn mount_session(
    State(state): State<AppState>,
    Json(request): Json<MountRequest>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    // the cache read may hit Redis synchronously
    let deps = state.deps.clone();
    let coordinator = tokio::task::spawn_blocking(move || HeroCoordinator::mount(deps))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let session_id = coordinator.id();
    let session = HeroSession::new(coordinator, request.signed_in);
    let response = SessionResponse::new(session_id, &session, &state.image_base_url);

    tracing::info!(
        session_id = %session_id,
        phase = ?response.phase,
        signed_in = request.signed_in,
        "Hero session mounted"
    );

    let mut inner = state.inner.write().await;
    inner.evict_idle(Instant::now(), state.session_idle_timeout);
    inner.sessions.insert(session_id, session);

    Ok((StatusCode::CREATED, Json(response)))
}

/// Current state of a mounted hero component
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionResponse>> {
    let mut inner = state.inner.write().await;
    let session = inner
        .sessions
        .get_mut(&session_id)
        .ok_or_else(|| session_not_found(session_id))?;
    session.touch();
    Ok(Json(SessionResponse::new(session_id, session, &state.image_base_url)))
}

/// Report a viewport observation; starts the resolution when the gate fires
pub async fn report_intersection(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<IntersectionRequest>,
) -> AppResult<Json<SessionResponse>> {
    let (pending, response) = {
        let mut inner = state.inner.write().await;
        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;

        session.touch();
        session.coordinator.report_intersection(&request.sample);
        let pending = session
            .coordinator
            .start_resolution(&request.recent_recommendations);
        let response = SessionResponse::new(session_id, session, &state.image_base_url);
        (pending, response)
    };

    if let Some(pending) = pending {
        let inner = state.inner.clone();
        tokio::spawn(async move {
            let resolution = pending.run().await;
            let mut inner = inner.write().await;
            match inner.sessions.get_mut(&session_id) {
                Some(session) => {
                    session.coordinator.finish(resolution);
                }
                None => tracing::debug!(
                    session_id = %session_id,
                    "Hero session closed before resolution finished"
                ),
            }
        });
    }

    Ok(Json(response))
}

/// Unmount a hero component
pub async fn unmount_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut inner = state.inner.write().await;
    let mut session = inner
        .sessions
        .remove(&session_id)
        .ok_or_else(|| session_not_found(session_id))?;
    session.coordinator.unmount();

    tracing::info!(session_id = %session_id, "Hero session unmounted");
    Ok(StatusCode::NO_CONTENT)
}

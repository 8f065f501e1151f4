use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::HeroCache;
use crate::models::MediaType;
use crate::services::{GateOptions, HeroCoordinator, HeroDeps, MediaCatalog};

/// How long a session may go without requests before it is evicted
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// A mounted hero component and who it is rendered for
pub struct HeroSession {
    pub coordinator: HeroCoordinator,
    pub signed_in: bool,
    pub last_seen: Instant,
}

impl HeroSession {
    pub fn new(coordinator: HeroCoordinator, signed_in: bool) -> Self {
        Self {
            coordinator,
            signed_in,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) >= timeout
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<RwLock<AppStateInner>>,
    pub deps: HeroDeps,
    pub image_base_url: String,
    pub session_idle_timeout: Duration,
}

/// Inner state that can be modified
pub struct AppStateInner {
    pub sessions: HashMap<Uuid, HeroSession>,
}

impl AppStateInner {
    /// Unmounts and drops every session idle for at least `timeout`
    pub fn evict_idle(&mut self, now: Instant, timeout: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|session_id, session| {
            if !session.is_idle(now, timeout) {
                return true;
            }
            session.coordinator.unmount();
            tracing::info!(session_id = %session_id, "Evicting idle hero session");
            false
        });
        before - self.sessions.len()
    }
}

impl AppState {
    /// Creates application state with no mounted sessions
    pub fn new(
        cache: HeroCache,
        catalog: Arc<dyn MediaCatalog>,
        target: MediaType,
        image_base_url: String,
    ) -> Self {
        Self {
            inner: Arc::new(RwLock::new(AppStateInner {
                sessions: HashMap::new(),
            })),
            deps: HeroDeps {
                cache,
                catalog,
                target,
                gate: GateOptions::default(),
            },
            image_base_url,
            session_idle_timeout: SESSION_IDLE_TIMEOUT,
        }
    }

    pub fn with_session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = timeout;
        self
    }

    /// Evicts sessions that have been idle as of `now`
    pub async fn evict_idle_sessions_at(&self, now: Instant) -> usize {
        let mut inner = self.inner.write().await;
        inner.evict_idle(now, self.session_idle_timeout)
    }

    /// Periodically evicts idle sessions for as long as the server runs
    pub fn spawn_session_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = state.evict_idle_sessions_at(Instant::now()).await;
                if evicted > 0 {
                    tracing::debug!(evicted, "Idle hero sessions swept");
                }
            }
        })
    }
}

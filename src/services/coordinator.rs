use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::HeroCache,
    models::{MediaType, RecentRecommendationEntry, Resolution},
    services::{
        providers::MediaCatalog,
        resolver,
        visibility::{GateOptions, IntersectionSample, VisibilityGate, VisibilitySignal},
    },
};

/// Lifecycle phase of one hero component. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Visible,
    Loading,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionState {
    phase: Phase,
    has_fetched: bool,
}

impl Default for ResolutionState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            has_fetched: false,
        }
    }
}

impl ResolutionState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn has_fetched(&self) -> bool {
        self.has_fetched
    }

    /// Moves to `next` if it is ahead of the current phase
    fn advance(&mut self, next: Phase) -> bool {
        if next > self.phase {
            self.phase = next;
            true
        } else {
            false
        }
    }

    /// Sets the fetch latch. Returns `true` only for the call that set it.
    fn latch(&mut self) -> bool {
        !std::mem::replace(&mut self.has_fetched, true)
    }
}

/// Collaborators a coordinator is mounted with
#[derive(Clone)]
pub struct HeroDeps {
    pub cache: HeroCache,
    pub catalog: Arc<dyn MediaCatalog>,
    pub target: MediaType,
    pub gate: GateOptions,
}

/// Drives one hero component from mount to its resolved pick.
///
/// A fresh cache entry resolves the component on mount. Otherwise the
/// component waits for its visibility gate, then resolves exactly once; the
/// fetch latch is taken before any asynchronous work starts, so repeated
/// visibility reports or re-renders during an in-flight resolution are no-ops.
pub struct HeroCoordinator {
    id: Uuid,
    deps: HeroDeps,
    state: ResolutionState,
    gate: VisibilityGate,
    signal: VisibilitySignal,
    resolution: Option<Resolution>,
    attached: Arc<AtomicBool>,
}

impl HeroCoordinator {
    pub fn mount(deps: HeroDeps) -> Self {
        let mut gate = VisibilityGate::new(deps.gate);
        let signal = gate.subscribe();
        let mut coordinator = Self {
            id: Uuid::new_v4(),
            deps,
            state: ResolutionState::default(),
            gate,
            signal,
            resolution: None,
            attached: Arc::new(AtomicBool::new(true)),
        };

        if let Some(cached) = coordinator.deps.cache.read() {
            coordinator.state.latch();
            coordinator.state.advance(Phase::Resolved);
            coordinator.gate.disconnect();
            tracing::debug!(
                coordinator_id = %coordinator.id,
                item_id = cached.item.as_ref().map(|i| i.id),
                "Hero resolved from cache on mount"
            );
            coordinator.resolution = Some(cached.into());
        }

        coordinator
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn target(&self) -> MediaType {
        self.deps.target
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Feeds a viewport observation to the gate
    pub fn report_intersection(&mut self, sample: &IntersectionSample) -> Phase {
        self.gate.observe(sample);
        if self.signal.try_fired() && !self.state.has_fetched && self.state.advance(Phase::Visible) {
            tracing::debug!(coordinator_id = %self.id, "Hero became visible");
        }
        self.state.phase
    }

    /// Latches the component and hands back the resolution work.
    ///
    /// Returns `None` unless the component is visible and has never fetched.
    pub fn start_resolution(
        &mut self,
        recent: &[RecentRecommendationEntry],
    ) -> Option<PendingResolution> {
        if self.state.phase != Phase::Visible || !self.is_attached() || !self.state.latch() {
            return None;
        }
        self.state.advance(Phase::Loading);

        tracing::info!(
            coordinator_id = %self.id,
            recent_entries = recent.len(),
            target = %self.deps.target,
            "Resolving hero recommendation"
        );

        Some(PendingResolution {
            coordinator_id: self.id,
            entries: recent.to_vec(),
            target: self.deps.target,
            catalog: self.deps.catalog.clone(),
            cache: self.deps.cache.clone(),
            attached: self.attached.clone(),
        })
    }

    /// Publishes a finished resolution. Ignored unless loading and attached.
    pub fn finish(&mut self, resolution: Resolution) -> bool {
        if self.state.phase != Phase::Loading || !self.is_attached() {
            return false;
        }
        self.state.advance(Phase::Resolved);
        self.resolution = Some(resolution);
        true
    }

    /// Starts, runs and publishes the resolution in one go
    pub async fn on_visible(&mut self, recent: &[RecentRecommendationEntry]) -> Option<&Resolution> {
        let pending = self.start_resolution(recent)?;
        let resolution = pending.run().await;
        self.finish(resolution);
        self.resolution.as_ref()
    }

    /// Tears the component down. In-flight resolutions complete but are
    /// neither cached nor published.
    pub fn unmount(&mut self) {
        self.attached.store(false, Ordering::Release);
        self.gate.disconnect();
        tracing::debug!(coordinator_id = %self.id, phase = ?self.state.phase, "Hero unmounted");
    }
}

/// Resolution work detached from its coordinator so it can run without
/// holding the coordinator borrowed
pub struct PendingResolution {
    coordinator_id: Uuid,
    entries: Vec<RecentRecommendationEntry>,
    target: MediaType,
    catalog: Arc<dyn MediaCatalog>,
    cache: HeroCache,
    attached: Arc<AtomicBool>,
}

impl PendingResolution {
    pub async fn run(self) -> Resolution {
        let mut rng = StdRng::from_entropy();
        self.run_with(&mut rng).await
    }

    /// Runs the resolver with a caller-supplied random source
    pub async fn run_with<R>(self, rng: &mut R) -> Resolution
    where
        R: Rng + Send,
    {
        let resolution =
            resolver::resolve(&self.entries, self.target, self.catalog.as_ref(), rng).await;

        if self.attached.load(Ordering::Acquire) {
            // the slot store may block on network I/O
            let cache = self.cache;
            let item = resolution.item.clone();
            let confidence = resolution.confidence;
            let write = tokio::task::spawn_blocking(move || cache.write(item.as_ref(), confidence));
            if let Err(e) = write.await {
                tracing::warn!(
                    error = %e,
                    coordinator_id = %self.coordinator_id,
                    "Hero cache write task failed"
                );
            }
        } else {
            tracing::debug!(
                coordinator_id = %self.coordinator_id,
                "Discarding hero resolution for unmounted component"
            );
        }

        resolution
    }
}

pub mod coordinator;
pub mod providers;
pub mod resolver;
pub mod visibility;

pub use coordinator::{HeroCoordinator, HeroDeps, PendingResolution, Phase, ResolutionState};
pub use providers::MediaCatalog;
pub use visibility::{GateOptions, IntersectionSample, Rect, VisibilityGate, VisibilitySignal};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Distance above and below the viewport at which an element already counts
/// as visible
pub const LEAD_MARGIN_PX: f64 = 200.0;

/// Fraction of the element that must be inside the expanded viewport
pub const MIN_INTERSECTION_RATIO: f64 = 0.1;

/// Axis-aligned box in page pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    fn right(&self) -> f64 {
        self.x + self.width
    }

    fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Grows the box by `vertical` px above and below and `horizontal` px left and right
    pub fn expand(&self, vertical: f64, horizontal: f64) -> Self {
        Self {
            x: self.x - horizontal,
            y: self.y - vertical,
            width: self.width + 2.0 * horizontal,
            height: self.height + 2.0 * vertical,
        }
    }

    /// Overlap of two boxes; edge-adjacent boxes overlap with zero area
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        (left <= right && top <= bottom).then(|| Rect::new(left, top, right - left, bottom - top))
    }
}

/// One observation of the hosting element against the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntersectionSample {
    pub target: Rect,
    pub viewport: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateOptions {
    pub margin_vertical_px: f64,
    pub margin_horizontal_px: f64,
    pub threshold: f64,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            margin_vertical_px: LEAD_MARGIN_PX,
            margin_horizontal_px: 0.0,
            threshold: MIN_INTERSECTION_RATIO,
        }
    }
}

impl GateOptions {
    /// Share of the target inside the margin-expanded viewport
    pub fn intersection_ratio(&self, sample: &IntersectionSample) -> f64 {
        let root = sample
            .viewport
            .expand(self.margin_vertical_px, self.margin_horizontal_px);

        let Some(overlap) = sample.target.intersection(&root) else {
            return 0.0;
        };

        let target_area = sample.target.area();
        if target_area <= 0.0 {
            // zero-area targets are either fully in or fully out
            return 1.0;
        }

        (overlap.area() / target_area).clamp(0.0, 1.0)
    }

    pub fn is_visible(&self, sample: &IntersectionSample) -> bool {
        let ratio = self.intersection_ratio(sample);
        ratio > 0.0 && ratio >= self.threshold
    }
}

/// Receiving half of a visibility subscription
#[derive(Debug)]
pub struct VisibilitySignal {
    rx: oneshot::Receiver<()>,
    fired: bool,
}

impl VisibilitySignal {
    /// Whether the gate has fired, without waiting
    pub fn try_fired(&mut self) -> bool {
        if !self.fired {
            self.fired = self.rx.try_recv().is_ok();
        }
        self.fired
    }

    /// Waits for the gate. Returns `false` if the gate was torn down first.
    pub async fn wait(self) -> bool {
        self.fired || self.rx.await.is_ok()
    }
}

/// One-shot viewport proximity trigger
///
/// Holds a single subscriber. The first sample that counts as visible
/// notifies it and disposes the gate; nothing is retained afterwards and
/// later samples are ignored.
#[derive(Debug)]
pub struct VisibilityGate {
    options: GateOptions,
    subscriber: Option<oneshot::Sender<()>>,
    disposed: bool,
}

impl VisibilityGate {
    pub fn new(options: GateOptions) -> Self {
        Self {
            options,
            subscriber: None,
            disposed: false,
        }
    }

    pub fn options(&self) -> &GateOptions {
        &self.options
    }

    /// Registers the subscriber, replacing any previous one
    pub fn subscribe(&mut self) -> VisibilitySignal {
        let (tx, rx) = oneshot::channel();
        if self.disposed {
            // tx is dropped here, so the signal reports a teardown
            return VisibilitySignal { rx, fired: false };
        }
        self.subscriber = Some(tx);
        VisibilitySignal { rx, fired: false }
    }

    /// Feeds one observation. Returns `true` only on the call that fires.
    pub fn observe(&mut self, sample: &IntersectionSample) -> bool {
        if self.disposed || !self.options.is_visible(sample) {
            return false;
        }

        self.disposed = true;
        match self.subscriber.take() {
            Some(tx) => {
                let delivered = tx.send(()).is_ok();
                tracing::debug!(delivered, "Visibility gate fired");
                delivered
            }
            None => false,
        }
    }

    /// Tears the observation down without firing
    pub fn disconnect(&mut self) {
        self.disposed = true;
        self.subscriber = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

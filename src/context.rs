//! Host-facing inputs: viewport, pointer and clock.
//!
//! The host is read once per frame into a [`FrameContext`], which is then
//! handed to every field and member. Nothing in the simulation keeps its own
//! copy of the pointer or time.

use crate::vector::Vector2D;

/// What the embedding environment provides each frame.
pub trait Host {
    fn viewport_size(&self) -> (f32, f32);
    /// Latest pointer position, `None` until the pointer has been seen.
    fn pointer_position(&self) -> Option<(f32, f32)>;
    fn elapsed_ms(&self) -> f64;
}

/// Axis-aligned simulation area anchored at the origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    /// Negative and non-finite extents collapse to zero.
    pub fn new(width: f32, height: f32) -> Self {
        let sane = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            width: sane(width),
            height: sane(height),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains_point(&self, p: Vector2D) -> bool {
        (0.0..=self.width).contains(&p.x) && (0.0..=self.height).contains(&p.y)
    }

    /// Whole circle inside the bounds.
    pub fn contains_circle(&self, center: Vector2D, radius: f32) -> bool {
        center.x - radius >= 0.0
            && center.y - radius >= 0.0
            && center.x + radius <= self.width
            && center.y + radius <= self.height
    }

    pub fn clamp(&self, p: Vector2D) -> Vector2D {
        Vector2D::new(p.x.clamp(0.0, self.width), p.y.clamp(0.0, self.height))
    }
}

/// Snapshot of host input for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameContext {
    pub frame: u64,
    pub elapsed_ms: f64,
    pub pointer: Option<Vector2D>,
}

impl FrameContext {
    pub fn at(frame: u64, elapsed_ms: f64) -> Self {
        Self {
            frame,
            elapsed_ms,
            pointer: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SimulationContext {
    frame: FrameContext,
    viewport: Bounds,
}

impl SimulationContext {
    pub fn new<H: Host + ?Sized>(host: &H) -> Self {
        let (width, height) = host.viewport_size();
        Self {
            frame: FrameContext::at(0, host.elapsed_ms()),
            viewport: Bounds::new(width, height),
        }
    }

    /// Samples the host for a new frame. Returns the new viewport when it changed.
    pub fn begin_frame<H: Host + ?Sized>(&mut self, host: &H) -> Option<Bounds> {
        self.frame.frame += 1;
        self.frame.elapsed_ms = host.elapsed_ms();
        if let Some(pointer) = host.pointer_position() {
            self.frame.pointer = Some(pointer.into());
        }

        let (width, height) = host.viewport_size();
        let viewport = Bounds::new(width, height);
        if viewport != self.viewport {
            self.viewport = viewport;
            Some(viewport)
        } else {
            None
        }
    }

    pub fn frame(&self) -> &FrameContext {
        &self.frame
    }

    pub fn viewport(&self) -> Bounds {
        self.viewport
    }
}

/// Drops host frames that arrive faster than the target rate.
#[derive(Clone, Debug)]
pub struct FrameLimiter {
    interval_ms: f64,
    last_ms: Option<f64>,
}

impl FrameLimiter {
    pub fn new(fps: f64) -> Self {
        Self {
            interval_ms: 1000.0 / fps,
            last_ms: None,
        }
    }

    pub fn ready(&mut self, now_ms: f64) -> bool {
        match self.last_ms {
            Some(last) if now_ms - last < self.interval_ms => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }
}

//! Drifting, flow-driven and jittering particles.

use std::f32::consts::TAU;

use rand::Rng;

use crate::config::{BoundaryPolicy, FlowParams, JitterParams, ParticleMotion, ParticleParams};
use crate::context::Bounds;
use crate::error::{Result, invalid};
use crate::field::{Member, Step};
use crate::kinematics::Kinematics;
use crate::render::{RenderStyle, RenderTarget};
use crate::vector::Vector2D;

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub kinematics: Kinematics,
    pub radius: f32,
    pub opacity: f32,
    /// `0` is far (small, slow, faint), `1` is near.
    pub depth: f32,
    /// Drawing displacement from `position`, used by anchored jitter motion.
    offset: Vector2D,
    peak_opacity: f32,
    paired: Vec<usize>,
    alive: bool,
    born_at_ms: f64,
}

impl Particle {
    pub fn new(position: Vector2D, velocity: Vector2D, radius: f32) -> Result<Self> {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(invalid(format!("particle radius must be positive, got {radius}")));
        }
        Ok(Self {
            kinematics: Kinematics {
                position,
                velocity,
                ..Default::default()
            },
            radius,
            opacity: 1.0,
            depth: 1.0,
            offset: Vector2D::ZERO,
            peak_opacity: 1.0,
            paired: Vec::new(),
            alive: true,
            born_at_ms: 0.0,
        })
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self.peak_opacity = opacity;
        self
    }

    pub fn position(&self) -> Vector2D {
        self.kinematics.position
    }

    pub fn velocity(&self) -> Vector2D {
        self.kinematics.velocity
    }

    /// Where the particle is drawn: its position plus any jitter offset.
    pub fn drawn_position(&self) -> Vector2D {
        let mut drawn = self.kinematics.position;
        drawn.add(self.offset);
        drawn
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Indices of the members this particle is connected to in the current tick.
    pub fn paired(&self) -> &[usize] {
        &self.paired
    }

    pub fn is_paired_with(&self, index: usize) -> bool {
        self.paired.contains(&index)
    }

    pub(crate) fn pair(&mut self, index: usize) {
        self.paired.push(index);
    }

    pub(crate) fn clear_pairs(&mut self) {
        self.paired.clear();
    }

    pub fn apply_boundary(&mut self, policy: BoundaryPolicy, bounds: Bounds) {
        match policy {
            BoundaryPolicy::Reflect => self.reflect(bounds),
            BoundaryPolicy::Cull => {
                if !bounds.contains_point(self.position()) {
                    self.alive = false;
                }
            }
        }
    }

    fn reflect(&mut self, bounds: Bounds) {
        let Kinematics {
            position, velocity, ..
        } = &mut self.kinematics;

        if position.x + self.radius > bounds.width {
            velocity.x = -velocity.x.abs();
        } else if position.x - self.radius < 0.0 {
            velocity.x = velocity.x.abs();
        }

        if position.y + self.radius > bounds.height {
            velocity.y = -velocity.y.abs();
        } else if position.y - self.radius < 0.0 {
            velocity.y = velocity.y.abs();
        }
    }

    /// Pulls the particle back inside `bounds`.
    pub fn confine(&mut self, bounds: Bounds) {
        self.kinematics.position = bounds.clamp(self.kinematics.position);
    }

    /// Noise-space coordinates of the particle at this frame.
    fn noise_point(&self, noise_scale: f32, time_scale: f32, step: &Step<'_>) -> (f64, f64, f64) {
        let p = self.kinematics.position;
        let (scale, t) = (noise_scale as f64, step.frame.frame as f64 * time_scale as f64);
        (p.x as f64 * scale, p.y as f64 * scale, t)
    }

    fn follow_flow(&mut self, flow: &FlowParams, step: &Step<'_>) {
        let k = flow.width_factor(step.bounds.width);
        let (x, y, t) = self.noise_point(flow.noise_scale * k, flow.time_scale * k, step);

        let limits = flow.limits(step.bounds.width);
        let strength = step.flow.sample_channel(x, y, t, 0) * limits.max_force;
        let theta = step.flow.sample_channel(x, y, t, 1) * TAU * flow.angle_turns;

        self.kinematics.reset_force();
        self.kinematics
            .integrate(Vector2D::from_angle(theta) * strength, &limits);
    }

    /// Channels: 0 offset length, 1 offset direction, 2 radius, 3 opacity.
    fn jitter(&mut self, jitter: &JitterParams, step: &Step<'_>) {
        let k = jitter.width_factor(step.bounds.width);
        let (x, y, t) = self.noise_point(jitter.noise_scale * k, jitter.time_scale * k, step);
        let sample = |channel| step.flow.sample_channel(x, y, t, channel);

        let rho = sample(0) * jitter.max_offset(step.bounds.width);
        let theta = sample(1) * TAU * jitter.angle_turns;
        self.offset = Vector2D::from_angle(theta) * rho;
        self.radius = step.settings.radius.lerp(sample(2));
        self.peak_opacity = step.settings.alpha.lerp(sample(3));
        self.opacity = self.peak_opacity;
    }

    fn fade_in(&mut self, window_ms: f64, step: &Step<'_>) {
        if window_ms <= 0.0 {
            return;
        }
        let age = (step.frame.elapsed_ms - self.born_at_ms).max(0.0);
        let t = (age / window_ms).min(1.0) as f32;
        let floor = step.settings.alpha.min.min(self.peak_opacity);
        self.opacity = floor + (self.peak_opacity - floor) * t;
    }

    /// Halo first, when enabled, so connecting lines stop at the rim.
    pub fn render<T: RenderTarget + ?Sized>(&self, target: &mut T, style: &RenderStyle) {
        let center = self.drawn_position();
        if let (true, Some(background)) = (style.halo, style.background) {
            target.fill_circle(center, self.radius, background);
        }
        target.fill_circle(
            center,
            self.radius,
            style.foreground.with_alpha(self.opacity),
        );
    }
}

/// Uniform coordinate keeping a body of `radius` inside `[0, extent]`, or the
/// midpoint when it cannot fit.
fn spawn_coordinate<R: Rng + ?Sized>(extent: f32, radius: f32, rng: &mut R) -> f32 {
    if extent > 2.0 * radius {
        rng.gen_range(radius..=extent - radius)
    } else {
        extent * 0.5
    }
}

impl Member for Particle {
    type Params = ParticleParams;

    fn spawn<R: Rng + ?Sized>(params: &ParticleParams, step: &Step<'_>, rng: &mut R) -> Result<Self> {
        let settings = step.settings;
        let bounds = step.bounds;
        let depth: f32 = rng.gen_range(0.0..1.0);

        let (radius, velocity, margin) = match params.motion {
            ParticleMotion::Drift => {
                let radius = settings.radius.lerp(depth);
                let velocity = Vector2D::random_unit(rng) * settings.speed.lerp(depth);
                (radius, velocity, radius)
            }
            ParticleMotion::Flow(_) => (settings.radius.sample(rng), Vector2D::ZERO, 0.0),
            ParticleMotion::Jitter(jitter) => (
                settings.radius.sample(rng),
                Vector2D::ZERO,
                jitter.max_offset(bounds.width),
            ),
        };

        let position = Vector2D::new(
            spawn_coordinate(bounds.width, margin, rng),
            spawn_coordinate(bounds.height, margin, rng),
        );

        let peak_opacity = settings.alpha.lerp(depth);
        let opacity = if params.fade_in_ms > 0.0 {
            settings.alpha.min
        } else {
            peak_opacity
        };

        Ok(Self {
            kinematics: Kinematics {
                position,
                velocity,
                ..Default::default()
            },
            radius,
            opacity,
            depth,
            offset: Vector2D::ZERO,
            peak_opacity,
            paired: Vec::new(),
            alive: true,
            born_at_ms: step.frame.elapsed_ms,
        })
    }

    fn body(&self) -> &Particle {
        self
    }

    fn body_mut(&mut self) -> &mut Particle {
        self
    }

    fn advance(&mut self, params: &ParticleParams, step: &Step<'_>) -> Result<()> {
        match &params.motion {
            ParticleMotion::Drift => {
                let velocity = self.kinematics.velocity;
                self.kinematics.position.add(velocity);
            }
            ParticleMotion::Flow(flow) => self.follow_flow(flow, step),
            ParticleMotion::Jitter(jitter) => self.jitter(jitter, step),
        }
        self.apply_boundary(params.boundary, step.bounds);
        self.fade_in(params.fade_in_ms, step);
        Ok(())
    }
}

//! Orbs: bodies pulled toward a moving target by an inverse-square force.

use rand::Rng;

use crate::config::AttractionParams;
use crate::context::Bounds;
use crate::error::Result;
use crate::field::{Member, Step};
use crate::kinematics::MotionLimits;
use crate::particle::Particle;
use crate::render::{RenderStyle, RenderTarget};
use crate::vector::Vector2D;

#[derive(Clone, Debug, PartialEq)]
pub struct ForceAgent {
    body: Particle,
    target: Option<Vector2D>,
    gravitational_constant: f32,
    epsilon_floor: f32,
    limits: MotionLimits,
    container: Bounds,
    rendered: bool,
    fade_delay_ms: f64,
    fade_duration_ms: f64,
    max_opacity: f32,
    born_at_ms: f64,
}

impl ForceAgent {
    /// The gravitational constant is taken from `params` scaled to the container width.
    pub fn new(
        position: Vector2D,
        radius: f32,
        params: &AttractionParams,
        container: Bounds,
        born_at_ms: f64,
    ) -> Result<Self> {
        let body = Particle::new(position, Vector2D::ZERO, radius)?.with_opacity(0.0);
        Ok(Self {
            rendered: container.contains_circle(position, radius),
            body,
            target: None,
            gravitational_constant: params.gravitational_constant_for(container.width),
            epsilon_floor: params.epsilon_floor,
            limits: params.limits(),
            container,
            fade_delay_ms: params.fade_delay_ms,
            fade_duration_ms: params.fade_duration_ms,
            max_opacity: params.max_opacity,
            born_at_ms,
        })
    }

    pub fn with_gravitational_constant(mut self, g: f32) -> Self {
        self.gravitational_constant = g;
        self
    }

    pub fn set_attraction(&mut self, point: Vector2D) {
        self.target = Some(point);
    }

    pub fn target(&self) -> Option<Vector2D> {
        self.target
    }

    pub fn position(&self) -> Vector2D {
        self.body.position()
    }

    pub fn velocity(&self) -> Vector2D {
        self.body.velocity()
    }

    pub fn force(&self) -> Vector2D {
        self.body.kinematics.force
    }

    pub fn acceleration(&self) -> Vector2D {
        self.body.kinematics.acceleration
    }

    pub fn limits(&self) -> &MotionLimits {
        &self.limits
    }

    /// Hidden agents keep simulating and show up again once back inside the container.
    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub fn resize_container(&mut self, container: Bounds) {
        self.container = container;
    }

    /// One tick of attraction, integration, visibility and fade.
    pub fn update(&mut self, elapsed_ms: f64) -> Result<()> {
        let mut pull = Vector2D::ZERO;
        if let Some(target) = self.target {
            pull = self.body.position().offset_to(target);
            let distance_sq = pull.magnitude_squared();
            // Exact coincidence has no direction; skip the pull for this tick.
            if distance_sq > 0.0 {
                pull.set_magnitude(self.gravitational_constant / distance_sq.max(self.epsilon_floor))?;
            }
        }
        self.body.kinematics.integrate(pull, &self.limits);

        self.rendered = self.container.contains_circle(self.body.position(), self.body.radius);
        self.body.opacity = self.opacity_at(elapsed_ms);
        Ok(())
    }

    fn opacity_at(&self, elapsed_ms: f64) -> f32 {
        let age = elapsed_ms - self.born_at_ms - self.fade_delay_ms;
        if age < 0.0 {
            return 0.0;
        }
        if self.fade_duration_ms <= 0.0 {
            return self.max_opacity;
        }
        self.max_opacity * (age / self.fade_duration_ms).min(1.0) as f32
    }
}

impl Member for ForceAgent {
    type Params = AttractionParams;

    fn spawn<R: Rng + ?Sized>(params: &AttractionParams, step: &Step<'_>, rng: &mut R) -> Result<Self> {
        let bounds = step.bounds;
        let radius = step.settings.radius.sample(rng);
        let position = Vector2D::new(
            rng.gen_range(0.0..=bounds.width),
            rng.gen_range(0.0..=bounds.height),
        );
        Self::new(position, radius, params, bounds, step.frame.elapsed_ms)
    }

    fn body(&self) -> &Particle {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Particle {
        &mut self.body
    }

    fn advance(&mut self, _params: &AttractionParams, step: &Step<'_>) -> Result<()> {
        self.container = step.bounds;
        self.update(step.frame.elapsed_ms)
    }

    fn is_rendered(&self) -> bool {
        self.rendered
    }

    fn resize(&mut self, bounds: Bounds) {
        self.resize_container(bounds);
        self.body.confine(bounds);
    }

    fn render<T: RenderTarget + ?Sized>(&self, target: &mut T, style: &RenderStyle) {
        target.fill_circle(
            self.position(),
            self.body.radius,
            style.foreground.with_alpha(self.body.opacity),
        );
    }
}

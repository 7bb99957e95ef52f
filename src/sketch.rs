//! Host-facing driver tying a particle field and its orbs to one render target.

use tracing::debug;

use crate::agent::ForceAgent;
use crate::config::SketchConfig;
use crate::context::{FrameContext, FrameLimiter, Host, SimulationContext};
use crate::error::Result;
use crate::field::ParticleField;
use crate::particle::Particle;
use crate::render::{RenderStyle, RenderTarget};

pub struct Sketch {
    config: SketchConfig,
    context: SimulationContext,
    limiter: FrameLimiter,
    particles: ParticleField<Particle>,
    orbs: Option<ParticleField<ForceAgent>>,
}

impl Sketch {
    pub fn new<H: Host + ?Sized>(config: SketchConfig, host: &H) -> Result<Self> {
        config.validate()?;
        let context = SimulationContext::new(host);
        let particles: ParticleField<Particle> = ParticleField::new(
            config.particles.tiers.clone(),
            config.particles.dynamics,
            context.viewport(),
            config.seed,
            context.frame(),
        )?;

        Ok(Self {
            limiter: FrameLimiter::new(config.fps),
            config,
            context,
            particles,
            orbs: None,
        })
    }

    pub fn particles(&self) -> &ParticleField<Particle> {
        &self.particles
    }

    /// `None` until the pointer has been seen, or when orbs are disabled.
    pub fn orbs(&self) -> Option<&ParticleField<ForceAgent>> {
        self.orbs.as_ref()
    }

    pub fn particle_style(&self) -> RenderStyle {
        let palette = &self.config.palette;
        RenderStyle {
            background: Some(palette.background),
            foreground: palette.foreground,
            halo: self.config.particles.halo,
            line_width: self.config.particles.line_width,
        }
    }

    pub fn orb_style(&self) -> RenderStyle {
        RenderStyle {
            background: None,
            foreground: self.config.palette.orb,
            halo: false,
            line_width: 0.0,
        }
    }

    /// Runs one host frame. Returns `false` when the frame was skipped for pacing.
    pub fn frame<H, T>(&mut self, host: &H, target: &mut T) -> Result<bool>
    where
        H: Host + ?Sized,
        T: RenderTarget + ?Sized,
    {
        if !self.limiter.ready(host.elapsed_ms()) {
            return Ok(false);
        }

        let resized = self.context.begin_frame(host);
        let frame = *self.context.frame();

        if let Some(bounds) = resized {
            self.particles.resize(bounds.width, bounds.height, &frame)?;
            if let Some(orbs) = &mut self.orbs {
                orbs.resize(bounds.width, bounds.height, &frame)?;
            }
        }

        self.spawn_orbs(&frame)?;
        if let (Some(orbs), Some(pointer)) = (&mut self.orbs, frame.pointer) {
            orbs.set_attraction(pointer);
        }

        self.particles.step(&frame)?;
        if let Some(orbs) = &mut self.orbs {
            orbs.step(&frame)?;
        }
        self.render(target);
        Ok(true)
    }

    /// Draws the current state without advancing it, particles under orbs.
    pub fn render<T: RenderTarget + ?Sized>(&self, target: &mut T) {
        self.particles.render(target, &self.particle_style());
        if let Some(orbs) = &self.orbs {
            orbs.render(target, &self.orb_style());
        }
    }

    fn spawn_orbs(&mut self, frame: &FrameContext) -> Result<()> {
        if self.orbs.is_some() || !self.config.orbs.enabled || frame.pointer.is_none() {
            return Ok(());
        }

        let orbs: ParticleField<ForceAgent> = ParticleField::new(
            self.config.orbs.tiers.clone(),
            self.config.orbs.attraction,
            self.context.viewport(),
            self.config.seed.wrapping_add(1),
            frame,
        )?;
        debug!(count = orbs.members().len(), "orbs spawned on first pointer sample");
        self.orbs = Some(orbs);
        Ok(())
    }
}

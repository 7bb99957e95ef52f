//! A population of bodies advanced, connected and drawn once per frame.
//!
//! [`ParticleField`] is generic over its [`Member`] type so the drifting
//! constellation and the pointer-chasing orbs share one update loop:
//!
//! 1. advance every member (in parallel; members never read each other),
//! 2. drop dead members and top the population back up,
//! 3. rebuild the proximity graph,
//! 4. draw background, then edges, then bodies.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::agent::ForceAgent;
use crate::config::{FieldSettings, Range, Tier, TierTable};
use crate::context::{Bounds, FrameContext};
use crate::error::Result;
use crate::noise_field::FlowField;
use crate::particle::Particle;
use crate::render::{RenderStyle, RenderTarget};
use crate::vector::Vector2D;

/// Everything a member may read while advancing.
#[derive(Clone, Copy, Debug)]
pub struct Step<'a> {
    pub frame: &'a FrameContext,
    pub bounds: Bounds,
    pub settings: &'a FieldSettings,
    pub flow: &'a FlowField,
}

/// A body that can live in a [`ParticleField`].
pub trait Member: Send + Sized {
    type Params: Sync;

    fn spawn<R: Rng + ?Sized>(params: &Self::Params, step: &Step<'_>, rng: &mut R) -> Result<Self>;

    fn body(&self) -> &Particle;

    fn body_mut(&mut self) -> &mut Particle;

    fn advance(&mut self, params: &Self::Params, step: &Step<'_>) -> Result<()>;

    /// Hidden members skip drawing and the proximity graph.
    fn is_rendered(&self) -> bool {
        true
    }

    fn resize(&mut self, bounds: Bounds) {
        self.body_mut().confine(bounds);
    }

    fn render<T: RenderTarget + ?Sized>(&self, target: &mut T, style: &RenderStyle) {
        self.body().render(target, style);
    }
}

/// One connection of the proximity graph, by member index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
    pub distance_sq: f32,
    pub alpha: f32,
}

/// Linear fade from `alpha.max` at distance 0 to `alpha.min` at the threshold.
pub fn edge_alpha(alpha: Range, distance_sq: f32, max_distance_sq: f32) -> f32 {
    if max_distance_sq <= 0.0 {
        return alpha.max;
    }
    let t = (distance_sq / max_distance_sq).clamp(0.0, 1.0);
    alpha.max + (alpha.min - alpha.max) * t
}

pub struct ParticleField<M: Member> {
    members: Vec<M>,
    params: M::Params,
    tiers: Option<TierTable>,
    tier: Option<Tier>,
    /// Set by [`ParticleField::initialize`]; resizes then keep `tier`.
    pinned: bool,
    settings: FieldSettings,
    bounds: Bounds,
    edges: Vec<Edge>,
    flow: FlowField,
    rng: StdRng,
}

impl<M: Member> ParticleField<M> {
    /// Picks the tier for `bounds.width` and spawns a full population.
    pub fn new(
        tiers: TierTable,
        params: M::Params,
        bounds: Bounds,
        seed: u64,
        frame: &FrameContext,
    ) -> Result<Self> {
        tiers.validate("tiers")?;
        let tier = Tier::for_width(bounds.width);
        let settings = tiers.get(tier).resolve(bounds.width);

        let mut field = Self {
            members: Vec::new(),
            params,
            tiers: Some(tiers),
            tier: Some(tier),
            pinned: false,
            settings,
            bounds,
            edges: Vec::new(),
            flow: FlowField::new(seed as u32),
            rng: StdRng::seed_from_u64(seed),
        };
        field.reset(bounds, frame)?;
        Ok(field)
    }

    /// Field over a hand-built population with fixed settings and no tier table.
    pub fn from_members(
        settings: FieldSettings,
        params: M::Params,
        bounds: Bounds,
        members: Vec<M>,
    ) -> Result<Self> {
        settings.validate("field")?;
        Ok(Self {
            members,
            params,
            tiers: None,
            tier: None,
            pinned: false,
            settings,
            bounds,
            edges: Vec::new(),
            flow: FlowField::new(0),
            rng: StdRng::seed_from_u64(0),
        })
    }

    pub fn members(&self) -> &[M] {
        &self.members
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn settings(&self) -> &FieldSettings {
        &self.settings
    }

    pub fn tier(&self) -> Option<Tier> {
        self.tier
    }

    pub fn params(&self) -> &M::Params {
        &self.params
    }

    fn reset(&mut self, bounds: Bounds, frame: &FrameContext) -> Result<()> {
        self.pinned = false;
        self.respawn(bounds, Tier::for_width(bounds.width), frame)
    }

    /// Discards every member and spawns a fresh population for `tier`. The
    /// tier stays pinned across later resizes instead of following the width.
    /// Fields built from members keep their fixed settings and only respawn.
    pub fn initialize(
        &mut self,
        width: f32,
        height: f32,
        tier: Tier,
        frame: &FrameContext,
    ) -> Result<()> {
        self.pinned = true;
        self.respawn(Bounds::new(width, height), tier, frame)
    }

    fn respawn(&mut self, bounds: Bounds, tier: Tier, frame: &FrameContext) -> Result<()> {
        self.bounds = bounds;
        if let Some(tiers) = &self.tiers {
            self.settings = tiers.get(tier).resolve(bounds.width);
            self.tier = Some(tier);
        }
        self.members.clear();
        self.edges.clear();
        self.populate(frame)?;

        debug!(
            tier = ?self.tier,
            pinned = self.pinned,
            population = self.members.len(),
            width = bounds.width,
            height = bounds.height,
            "field initialized"
        );
        Ok(())
    }

    fn populate(&mut self, frame: &FrameContext) -> Result<()> {
        let step = Step {
            frame,
            bounds: self.bounds,
            settings: &self.settings,
            flow: &self.flow,
        };
        while self.members.len() < self.settings.population {
            self.members.push(M::spawn(&self.params, &step, &mut self.rng)?);
        }
        Ok(())
    }

    /// New viewport. Crossing a tier boundary respawns the population for the
    /// new tier; otherwise members are kept and confined to the new bounds.
    /// A pinned tier never changes here, only its reach is re-resolved.
    pub fn resize(&mut self, width: f32, height: f32, frame: &FrameContext) -> Result<()> {
        let bounds = Bounds::new(width, height);
        if bounds.is_empty() {
            warn!(width, height, "field resized to zero area");
        }

        if let Some(tiers) = &self.tiers {
            let tier = match (self.pinned, self.tier) {
                (true, Some(pinned)) => pinned,
                _ => Tier::for_width(bounds.width),
            };
            if self.tier != Some(tier) {
                debug!(from = ?self.tier, to = ?tier, "tier changed, repopulating");
                return self.reset(bounds, frame);
            }
            self.settings = tiers.get(tier).resolve(bounds.width);
        }

        self.bounds = bounds;
        for member in &mut self.members {
            member.resize(bounds);
        }
        debug!(width = bounds.width, height = bounds.height, "field resized");
        Ok(())
    }

    /// Advances every member, replaces the dead and rebuilds the proximity graph.
    ///
    /// A zero-area field has nowhere to move, so members stay collapsed at the
    /// origin and no edges are built. The first member error aborts the tick,
    /// but members that already advanced keep their new state.
    pub fn step(&mut self, frame: &FrameContext) -> Result<()> {
        if self.bounds.is_empty() {
            self.edges.clear();
            for member in &mut self.members {
                member.body_mut().clear_pairs();
            }
            trace!(frame = frame.frame, "zero-area field, step skipped");
            return Ok(());
        }

        let step = Step {
            frame,
            bounds: self.bounds,
            settings: &self.settings,
            flow: &self.flow,
        };
        let params = &self.params;
        self.members
            .par_iter_mut()
            .try_for_each(|member| member.advance(params, &step))?;

        let before = self.members.len();
        self.members.retain(|member| member.body().is_alive());
        let culled = before - self.members.len();
        if culled > 0 {
            self.populate(frame)?;
        }

        self.connect();

        trace!(
            frame = frame.frame,
            members = self.members.len(),
            culled,
            edges = self.edges.len(),
            "field stepped"
        );
        Ok(())
    }

    /// All-pairs proximity graph. Pairs are visited `i` then `j` in index
    /// order, so the first pairs found win when the connection cap is hit.
    fn connect(&mut self) {
        let cap = self.settings.max_connections;
        let max_distance_sq = self.settings.max_connection_distance_sq;
        let alpha = self.settings.alpha;

        self.edges.clear();
        for member in &mut self.members {
            member.body_mut().clear_pairs();
        }

        let n = self.members.len();
        for i in 0..n {
            if !self.members[i].is_rendered() {
                continue;
            }
            for j in 0..n {
                if self.members[i].body().paired().len() >= cap {
                    break;
                }
                if i == j || !self.members[j].is_rendered() {
                    continue;
                }

                let other = self.members[j].body();
                if other.is_paired_with(i) || other.paired().len() >= cap {
                    continue;
                }

                let distance_sq = self.members[i]
                    .body()
                    .position()
                    .distance_squared(other.position());
                if distance_sq < max_distance_sq {
                    self.members[i].body_mut().pair(j);
                    self.members[j].body_mut().pair(i);
                    self.edges.push(Edge {
                        a: i,
                        b: j,
                        distance_sq,
                        alpha: edge_alpha(alpha, distance_sq, max_distance_sq),
                    });
                }
            }
        }
    }

    /// Draws background, edges, then bodies. A zero-area field draws nothing.
    pub fn render<T: RenderTarget + ?Sized>(&self, target: &mut T, style: &RenderStyle) {
        if self.bounds.is_empty() {
            return;
        }
        let Bounds { width, height } = self.bounds;

        if let Some(background) = style.background {
            target.clear_rect(0.0, 0.0, width, height);
            target.fill_rect(0.0, 0.0, width, height, background);
        }

        if style.line_width > 0.0 {
            for edge in &self.edges {
                let from = self.members[edge.a].body().drawn_position();
                let to = self.members[edge.b].body().drawn_position();
                target.stroke_line(
                    from,
                    to,
                    style.foreground.with_alpha(edge.alpha),
                    style.line_width,
                );
            }
        }

        for member in self.members.iter().filter(|m| m.is_rendered()) {
            member.render(target, style);
        }
    }

    /// [`step`](Self::step) then [`render`](Self::render).
    pub fn tick<T: RenderTarget + ?Sized>(
        &mut self,
        frame: &FrameContext,
        target: &mut T,
        style: &RenderStyle,
    ) -> Result<()> {
        self.step(frame)?;
        self.render(target, style);
        Ok(())
    }
}

impl ParticleField<ForceAgent> {
    /// Points every agent at `point`.
    pub fn set_attraction(&mut self, point: Vector2D) {
        for agent in &mut self.members {
            agent.set_attraction(point);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoundaryPolicy, ParticleMotion, ParticleParams, SketchConfig};

    fn drift() -> ParticleParams {
        ParticleParams {
            motion: ParticleMotion::Drift,
            boundary: BoundaryPolicy::Reflect,
            fade_in_ms: 0.0,
        }
    }

    #[test]
    fn edge_alpha_interpolates_linearly() {
        let alpha = Range::new(0.1, 0.8);
        assert!((edge_alpha(alpha, 0.0, 400.0) - 0.8).abs() < 1e-6);
        assert!((edge_alpha(alpha, 200.0, 400.0) - 0.45).abs() < 1e-6);
        assert!((edge_alpha(alpha, 400.0, 400.0) - 0.1).abs() < 1e-6);
        assert!((edge_alpha(alpha, 900.0, 400.0) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn new_field_uses_tier_population() {
        let config = SketchConfig::constellation();
        let frame = FrameContext::default();

        let desktop: ParticleField<Particle> = ParticleField::new(
            config.particles.tiers.clone(),
            drift(),
            Bounds::new(1920.0, 1080.0),
            1,
            &frame,
        )
        .unwrap();
        assert_eq!(desktop.tier(), Some(Tier::Desktop));
        assert_eq!(desktop.members().len(), 65);

        let mobile: ParticleField<Particle> = ParticleField::new(
            config.particles.tiers,
            drift(),
            Bounds::new(400.0, 800.0),
            1,
            &frame,
        )
        .unwrap();
        assert_eq!(mobile.members().len(), 30);
        assert!((mobile.settings().max_connection_distance_sq - 200.0 * 200.0).abs() < 1e-2);
    }

    #[test]
    fn same_seed_same_population() {
        let config = SketchConfig::constellation();
        let frame = FrameContext::default();
        let build = || {
            ParticleField::<Particle>::new(
                config.particles.tiers.clone(),
                drift(),
                Bounds::new(1280.0, 720.0),
                99,
                &frame,
            )
            .unwrap()
        };
        assert_eq!(build().members(), build().members());
    }

    #[test]
    fn resize_within_tier_keeps_members() {
        let config = SketchConfig::constellation();
        let frame = FrameContext::default();
        let mut field = ParticleField::<Particle>::new(
            config.particles.tiers,
            drift(),
            Bounds::new(1920.0, 1080.0),
            5,
            &frame,
        )
        .unwrap();

        let first = field.members()[0].position();
        field.resize(1500.0, 500.0, &frame).unwrap();

        assert_eq!(field.members().len(), 65);
        let moved = field.members()[0].position();
        assert_eq!(moved, Bounds::new(1500.0, 500.0).clamp(first));
        assert!((field.settings().max_connection_distance_sq - 225.0 * 225.0).abs() < 1e-1);
    }

    #[test]
    fn resize_across_tier_repopulates() {
        let config = SketchConfig::constellation();
        let frame = FrameContext::default();
        let mut field = ParticleField::<Particle>::new(
            config.particles.tiers,
            drift(),
            Bounds::new(1920.0, 1080.0),
            5,
            &frame,
        )
        .unwrap();

        field.resize(800.0, 600.0, &frame).unwrap();
        assert_eq!(field.tier(), Some(Tier::Tablet));
        assert_eq!(field.members().len(), 45);
    }

    #[test]
    fn initialize_with_explicit_tier() {
        let config = SketchConfig::constellation();
        let frame = FrameContext::default();
        let mut field = ParticleField::<Particle>::new(
            config.particles.tiers,
            drift(),
            Bounds::new(1920.0, 1080.0),
            5,
            &frame,
        )
        .unwrap();

        field.initialize(1920.0, 1080.0, Tier::Mobile, &frame).unwrap();
        assert_eq!(field.tier(), Some(Tier::Mobile));
        assert_eq!(field.members().len(), 30);
        assert!(field.edges().is_empty());
    }

    #[test]
    fn zero_area_field_stays_collapsed() {
        let config = SketchConfig::constellation();
        let frame = FrameContext::default();
        let mut field = ParticleField::<Particle>::new(
            config.particles.tiers,
            drift(),
            Bounds::new(500.0, 400.0),
            11,
            &frame,
        )
        .unwrap();

        field.resize(0.0, 0.0, &frame).unwrap();
        for tick in 1..=20 {
            field.step(&FrameContext::at(tick, tick as f64 * 16.0)).unwrap();
        }

        assert_eq!(field.members().len(), 30);
        assert!(field.members().iter().all(|m| m.position() == Vector2D::ZERO));
        assert!(field.edges().is_empty());
    }

    #[test]
    fn pinned_tier_survives_resize() {
        let config = SketchConfig::constellation();
        let frame = FrameContext::default();
        let mut field = ParticleField::<Particle>::new(
            config.particles.tiers,
            drift(),
            Bounds::new(1920.0, 1080.0),
            5,
            &frame,
        )
        .unwrap();

        field.initialize(1920.0, 1080.0, Tier::Mobile, &frame).unwrap();
        field.resize(1920.0, 1080.0, &frame).unwrap();
        field.resize(1500.0, 900.0, &frame).unwrap();

        assert_eq!(field.tier(), Some(Tier::Mobile));
        assert_eq!(field.members().len(), 30);
        assert!((field.settings().max_connection_distance_sq - 750.0 * 750.0).abs() < 1.0);
    }

    /// Drifts like a particle but fails once past `limit` on x.
    struct Brittle(Particle);

    impl Member for Brittle {
        type Params = f32;

        fn spawn<R: Rng + ?Sized>(_: &f32, _: &Step<'_>, _: &mut R) -> Result<Self> {
            Particle::new(Vector2D::ZERO, Vector2D::ZERO, 1.0).map(Brittle)
        }

        fn body(&self) -> &Particle {
            &self.0
        }

        fn body_mut(&mut self) -> &mut Particle {
            &mut self.0
        }

        fn advance(&mut self, limit: &f32, _: &Step<'_>) -> Result<()> {
            if self.0.position().x > *limit {
                return Err(crate::error::SketchError::DegenerateVector);
            }
            let velocity = self.0.kinematics.velocity;
            self.0.kinematics.position.add(velocity);
            Ok(())
        }
    }

    #[test]
    fn failed_step_keeps_members_that_already_advanced() {
        let settings = FieldSettings {
            population: 64,
            radius: Range::constant(1.0),
            alpha: Range::new(0.1, 0.8),
            speed: Range::constant(1.0),
            max_connection_distance_sq: 400.0,
            max_connections: 3,
        };
        let mut members: Vec<Brittle> = (0..63)
            .map(|i| Particle::new(Vector2D::new(10.0, i as f32), Vector2D::new(1.0, 0.0), 1.0))
            .map(|p| p.map(Brittle))
            .collect::<Result<_>>()
            .unwrap();
        members.push(Brittle(
            Particle::new(Vector2D::new(90.0, 0.0), Vector2D::new(1.0, 0.0), 1.0).unwrap(),
        ));
        let mut field =
            ParticleField::from_members(settings, 50.0, Bounds::new(100.0, 100.0), members)
                .unwrap();

        assert!(field.step(&FrameContext::default()).is_err());

        assert_eq!(field.members().len(), 64);
        assert!(field.edges().is_empty());
        assert_eq!(field.members()[63].0.position().x, 90.0);
        assert!(field.members()[..63].iter().all(|m| {
            let x = m.0.position().x;
            x == 10.0 || x == 11.0
        }));
    }
}

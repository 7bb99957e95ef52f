//! Tuning tables and sketch configuration.
//!
//! Every sketch is the same field with different numbers. The numbers live
//! here, grouped by viewport tier, and can be loaded from TOML:
//!
//! ```toml
//! fps = 60.0
//! seed = 7
//!
//! [palette]
//! background = "#131516"
//! foreground = "#f6f6f6"
//! orb = "#408697"
//!
//! [particles]
//! halo = true
//! line_width = 1.0
//!
//! [particles.dynamics]
//! boundary = "reflect"
//! fade_in_ms = 0.0
//! motion = { kind = "drift" }
//!
//! [particles.tiers.desktop]
//! population = 65
//! radius = { min = 10.0, max = 20.0 }
//! alpha = { min = 0.1, max = 0.8 }
//! speed = { min = 0.5, max = 3.0 }
//! reach = 0.15
//! max_connections = 3
//! # ... tablet, mobile, and an [orbs] section
//! ```
//!
//! Sections left out of a file fall back to [`SketchConfig::constellation`].

use std::fs;
use std::path::Path;

use rand::Rng;
use serde::Deserialize;

use crate::error::{Result, invalid};
use crate::kinematics::MotionLimits;
use crate::render::Color;

/// Closed interval `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub const fn constant(value: f32) -> Self {
        Self::new(value, value)
    }

    /// `min` at `t = 0`, `max` at `t = 1`.
    pub fn lerp(&self, t: f32) -> f32 {
        self.min + (self.max - self.min) * t
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max > self.min {
            rng.gen_range(self.min..=self.max)
        } else {
            self.min
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(invalid(format!("{name} must be finite, got {self:?}")));
        }
        if self.min > self.max {
            return Err(invalid(format!(
                "{name} has min {} greater than max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Viewport width bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Desktop,
    Tablet,
    Mobile,
}

impl Tier {
    /// Widths strictly above this are desktop.
    pub const DESKTOP_BREAKPOINT: f32 = 1000.0;
    /// Widths strictly above this (and up to the desktop breakpoint) are tablet.
    pub const TABLET_BREAKPOINT: f32 = 600.0;

    pub fn for_width(width: f32) -> Self {
        if width > Self::DESKTOP_BREAKPOINT {
            Tier::Desktop
        } else if width > Self::TABLET_BREAKPOINT {
            Tier::Tablet
        } else {
            Tier::Mobile
        }
    }
}

/// One row of a tier table, as written in config.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TierSettings {
    pub population: usize,
    pub radius: Range,
    pub alpha: Range,
    pub speed: Range,
    /// Connection distance as a fraction of the field width.
    pub reach: f32,
    pub max_connections: usize,
}

impl TierSettings {
    pub fn resolve(&self, width: f32) -> FieldSettings {
        let reach = width.max(0.0) * self.reach;
        FieldSettings {
            population: self.population,
            radius: self.radius,
            alpha: self.alpha,
            speed: self.speed,
            max_connection_distance_sq: reach * reach,
            max_connections: self.max_connections,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !self.reach.is_finite() || self.reach < 0.0 {
            return Err(invalid(format!("{name}.reach must be a non-negative number")));
        }
        self.resolve(1.0).validate(name)
    }
}

/// Tier settings resolved against a concrete field width.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSettings {
    pub population: usize,
    pub radius: Range,
    pub alpha: Range,
    pub speed: Range,
    pub max_connection_distance_sq: f32,
    pub max_connections: usize,
}

impl FieldSettings {
    pub fn validate(&self, name: &str) -> Result<()> {
        self.radius.validate(&format!("{name}.radius"))?;
        self.alpha.validate(&format!("{name}.alpha"))?;
        self.speed.validate(&format!("{name}.speed"))?;

        if self.radius.min <= 0.0 {
            return Err(invalid(format!("{name}.radius must be positive")));
        }
        if self.alpha.min < 0.0 || self.alpha.max > 1.0 {
            return Err(invalid(format!("{name}.alpha must lie within [0, 1]")));
        }
        if self.speed.min < 0.0 {
            return Err(invalid(format!("{name}.speed must be non-negative")));
        }
        if !self.max_connection_distance_sq.is_finite() || self.max_connection_distance_sq < 0.0 {
            return Err(invalid(format!(
                "{name} connection distance must be a non-negative number"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TierTable {
    pub desktop: TierSettings,
    pub tablet: TierSettings,
    pub mobile: TierSettings,
}

impl TierTable {
    pub fn get(&self, tier: Tier) -> &TierSettings {
        match tier {
            Tier::Desktop => &self.desktop,
            Tier::Tablet => &self.tablet,
            Tier::Mobile => &self.mobile,
        }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        self.desktop.validate(&format!("{name}.desktop"))?;
        self.tablet.validate(&format!("{name}.tablet"))?;
        self.mobile.validate(&format!("{name}.mobile"))
    }
}

/// What happens when a particle hits the field edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Flip the offending velocity component back toward the interior.
    Reflect,
    /// Kill the particle once its center leaves the field; the field respawns it.
    Cull,
}

/// Noise-driven motion. Scales are given for `reference_width` and grow
/// linearly with the actual field width.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct FlowParams {
    pub noise_scale: f32,
    /// Noise time advance per frame.
    pub time_scale: f32,
    pub max_force: f32,
    pub max_acceleration: f32,
    pub max_velocity: f32,
    /// Full turns spanned by the direction channel.
    pub angle_turns: f32,
    pub reference_width: f32,
}

impl FlowParams {
    pub fn width_factor(&self, width: f32) -> f32 {
        width / self.reference_width
    }

    pub fn limits(&self, width: f32) -> MotionLimits {
        let k = self.width_factor(width);
        MotionLimits {
            max_force: self.max_force * k,
            max_acceleration: self.max_acceleration * k,
            max_velocity: self.max_velocity,
        }
    }

    fn validate(&self) -> Result<()> {
        let values = [
            ("noise_scale", self.noise_scale),
            ("time_scale", self.time_scale),
            ("max_force", self.max_force),
            ("max_acceleration", self.max_acceleration),
            ("max_velocity", self.max_velocity),
            ("angle_turns", self.angle_turns),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("flow.{name} must be a non-negative number")));
            }
        }
        if !(self.reference_width > 0.0) {
            return Err(invalid("flow.reference_width must be positive"));
        }
        Ok(())
    }
}

/// Anchored motion: the particle never moves, it is drawn at a noise-driven
/// offset and its radius and opacity breathe through the tier ranges.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct JitterParams {
    pub noise_scale: f32,
    /// Noise time advance per frame.
    pub time_scale: f32,
    /// Largest offset from the anchor, as a fraction of the field width.
    pub reach: f32,
    /// Full turns spanned by the direction channel.
    pub angle_turns: f32,
    pub reference_width: f32,
}

impl JitterParams {
    pub fn width_factor(&self, width: f32) -> f32 {
        width / self.reference_width
    }

    pub fn max_offset(&self, width: f32) -> f32 {
        width.max(0.0) * self.reach
    }

    fn validate(&self) -> Result<()> {
        let values = [
            ("noise_scale", self.noise_scale),
            ("time_scale", self.time_scale),
            ("reach", self.reach),
            ("angle_turns", self.angle_turns),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("jitter.{name} must be a non-negative number")));
            }
        }
        if !(self.reference_width > 0.0) {
            return Err(invalid("jitter.reference_width must be positive"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParticleMotion {
    /// Constant velocity, speed drawn from the tier's speed range.
    Drift,
    Flow(FlowParams),
    Jitter(JitterParams),
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct ParticleParams {
    pub motion: ParticleMotion,
    pub boundary: BoundaryPolicy,
    /// Opacity ramps from the tier's min alpha to its max over this window. Zero disables.
    #[serde(default)]
    pub fade_in_ms: f64,
}

impl ParticleParams {
    pub fn validate(&self) -> Result<()> {
        if !self.fade_in_ms.is_finite() || self.fade_in_ms < 0.0 {
            return Err(invalid("particles.fade_in_ms must be a non-negative number"));
        }
        match &self.motion {
            ParticleMotion::Drift => Ok(()),
            ParticleMotion::Flow(flow) => flow.validate(),
            ParticleMotion::Jitter(jitter) => jitter.validate(),
        }
    }
}

/// Inverse-square attraction toward a target point.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct AttractionParams {
    pub max_velocity: f32,
    pub max_acceleration: f32,
    pub max_force: f32,
    /// Constant at `reference_width`; scales with the square of the width at spawn.
    pub gravitational_constant: f32,
    pub reference_width: f32,
    /// Lower bound on the squared distance in the force law.
    pub epsilon_floor: f32,
    pub fade_delay_ms: f64,
    pub fade_duration_ms: f64,
    pub max_opacity: f32,
}

impl AttractionParams {
    pub fn limits(&self) -> MotionLimits {
        MotionLimits {
            max_force: self.max_force,
            max_acceleration: self.max_acceleration,
            max_velocity: self.max_velocity,
        }
    }

    pub fn gravitational_constant_for(&self, width: f32) -> f32 {
        let k = width / self.reference_width;
        self.gravitational_constant * k * k
    }

    pub fn validate(&self) -> Result<()> {
        let values = [
            ("max_velocity", self.max_velocity),
            ("max_acceleration", self.max_acceleration),
            ("max_force", self.max_force),
            ("gravitational_constant", self.gravitational_constant),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("attraction.{name} must be a non-negative number")));
            }
        }
        if !(self.reference_width > 0.0) || !(self.epsilon_floor > 0.0) {
            return Err(invalid(
                "attraction.reference_width and attraction.epsilon_floor must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.max_opacity) {
            return Err(invalid("attraction.max_opacity must lie within [0, 1]"));
        }
        if !(self.fade_delay_ms >= 0.0) || !(self.fade_duration_ms >= 0.0) {
            return Err(invalid("attraction fade timings must be non-negative"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub orb: Color,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ParticleSection {
    pub tiers: TierTable,
    pub dynamics: ParticleParams,
    pub halo: bool,
    pub line_width: f32,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct OrbSection {
    pub enabled: bool,
    pub tiers: TierTable,
    pub attraction: AttractionParams,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    pub fps: f64,
    pub seed: u64,
    pub palette: Palette,
    pub particles: ParticleSection,
    pub orbs: OrbSection,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self::constellation()
    }
}

impl SketchConfig {
    /// Drifting, reflecting particles joined by proximity lines.
    pub fn constellation() -> Self {
        Self {
            fps: 60.0,
            seed: 0x5EED,
            palette: Palette {
                background: Color::rgb8(0x13, 0x15, 0x16),
                foreground: Color::rgb8(0xF6, 0xF6, 0xF6),
                orb: Color::rgb8(0x40, 0x86, 0x97),
            },
            particles: ParticleSection {
                tiers: TierTable {
                    desktop: TierSettings {
                        population: 65,
                        radius: Range::new(10.0, 20.0),
                        alpha: Range::new(0.1, 0.8),
                        speed: Range::new(0.5, 3.0),
                        reach: 0.15,
                        max_connections: 3,
                    },
                    tablet: TierSettings {
                        population: 45,
                        radius: Range::new(7.0, 14.0),
                        alpha: Range::new(0.1, 0.8),
                        speed: Range::new(0.35, 2.0),
                        reach: 0.25,
                        max_connections: 3,
                    },
                    mobile: TierSettings {
                        population: 30,
                        radius: Range::new(4.0, 8.0),
                        alpha: Range::new(0.1, 0.8),
                        speed: Range::new(0.25, 1.0),
                        reach: 0.5,
                        max_connections: 2,
                    },
                },
                dynamics: ParticleParams {
                    motion: ParticleMotion::Drift,
                    boundary: BoundaryPolicy::Reflect,
                    fade_in_ms: 0.0,
                },
                halo: true,
                line_width: 1.0,
            },
            orbs: OrbSection::default_orbs(),
        }
    }

    /// Noise-driven dust that dies at the edges and is replaced. No lines.
    pub fn flow() -> Self {
        let dust = |population| TierSettings {
            population,
            radius: Range::constant(1.0),
            alpha: Range::new(0.0, 0.1),
            speed: Range::constant(0.0),
            reach: 0.0,
            max_connections: 0,
        };

        Self {
            particles: ParticleSection {
                tiers: TierTable {
                    desktop: dust(125),
                    tablet: dust(70),
                    mobile: dust(20),
                },
                dynamics: ParticleParams {
                    motion: ParticleMotion::Flow(FlowParams {
                        noise_scale: 0.0015,
                        time_scale: 0.0004,
                        max_force: 2.0,
                        max_acceleration: 10.0,
                        max_velocity: 1.0,
                        angle_turns: 8.0,
                        reference_width: 1920.0,
                    }),
                    boundary: BoundaryPolicy::Cull,
                    fade_in_ms: 4000.0,
                },
                halo: false,
                line_width: 1.0,
            },
            ..Self::constellation()
        }
    }

    /// Anchored discs wobbling on a black page, sized and faded by noise.
    pub fn jitter() -> Self {
        let discs = |population| TierSettings {
            population,
            radius: Range::new(0.5, 16.0),
            alpha: Range::new(0.0, 0.5),
            speed: Range::constant(0.0),
            reach: 0.0,
            max_connections: 0,
        };
        let constellation = Self::constellation();

        Self {
            palette: Palette {
                background: Color::BLACK,
                foreground: Color::WHITE,
                ..constellation.palette
            },
            particles: ParticleSection {
                tiers: TierTable {
                    desktop: discs(150),
                    tablet: discs(150),
                    mobile: discs(20),
                },
                dynamics: ParticleParams {
                    motion: ParticleMotion::Jitter(JitterParams {
                        noise_scale: 0.00075,
                        time_scale: 0.01,
                        reach: 0.04,
                        angle_turns: 4.0,
                        reference_width: 1920.0,
                    }),
                    boundary: BoundaryPolicy::Reflect,
                    fade_in_ms: 0.0,
                },
                halo: false,
                line_width: 0.0,
            },
            ..constellation
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.fps > 0.0) || !self.fps.is_finite() {
            return Err(invalid("fps must be a positive number"));
        }
        if !self.particles.line_width.is_finite() || self.particles.line_width < 0.0 {
            return Err(invalid("particles.line_width must be non-negative"));
        }
        self.particles.tiers.validate("particles.tiers")?;
        self.particles.dynamics.validate()?;
        self.orbs.tiers.validate("orbs.tiers")?;
        self.orbs.attraction.validate()
    }
}

impl OrbSection {
    fn default_orbs() -> Self {
        let orbs = |radius| TierSettings {
            population: 5,
            radius: Range::constant(radius),
            alpha: Range::new(0.0, 1.0),
            speed: Range::constant(0.0),
            reach: 0.0,
            max_connections: 0,
        };

        Self {
            enabled: true,
            tiers: TierTable {
                desktop: orbs(20.0),
                tablet: orbs(10.0),
                mobile: orbs(5.0),
            },
            attraction: AttractionParams {
                max_velocity: 6.0,
                max_acceleration: 0.2,
                max_force: 0.1,
                gravitational_constant: 2.0e5,
                reference_width: 2114.44,
                epsilon_floor: 1.0,
                fade_delay_ms: 1000.0,
                fade_duration_ms: 3000.0,
                max_opacity: 1.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SketchError;

    #[test]
    fn tier_breakpoints() {
        assert_eq!(Tier::for_width(1920.0), Tier::Desktop);
        assert_eq!(Tier::for_width(1000.0), Tier::Tablet);
        assert_eq!(Tier::for_width(601.0), Tier::Tablet);
        assert_eq!(Tier::for_width(600.0), Tier::Mobile);
        assert_eq!(Tier::for_width(0.0), Tier::Mobile);
    }

    #[test]
    fn reach_resolves_against_width() {
        let settings = SketchConfig::constellation().particles.tiers.desktop.resolve(2000.0);
        assert!((settings.max_connection_distance_sq - 300.0 * 300.0).abs() < 1e-2);
    }

    #[test]
    fn presets_validate() {
        SketchConfig::constellation().validate().unwrap();
        SketchConfig::flow().validate().unwrap();
        SketchConfig::jitter().validate().unwrap();
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut config = SketchConfig::constellation();
        config.particles.tiers.tablet.radius = Range::new(9.0, 3.0);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SketchError::InvalidConfiguration(ref m) if m.contains("tablet.radius")));
    }

    #[test]
    fn zero_radius_is_rejected() {
        let mut config = SketchConfig::constellation();
        config.orbs.tiers.mobile.radius = Range::constant(0.0);
        assert!(matches!(config.validate(), Err(SketchError::InvalidConfiguration(_))));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = SketchConfig::from_toml_str(
            r##"
            fps = 30.0

            [palette]
            background = "#000000"
            foreground = "#ffffff"
            orb = "#ff000080"
            "##,
        )
        .unwrap();

        assert_eq!(config.fps, 30.0);
        assert_eq!(config.palette.orb.to_rgba8(), [255, 0, 0, 128]);
        assert_eq!(config.particles, SketchConfig::constellation().particles);
    }

    #[test]
    fn negative_population_fails_to_parse() {
        let source = include_str!("../config/constellation.toml")
            .replace("population = 65", "population = -65");
        assert!(matches!(
            SketchConfig::from_toml_str(&source),
            Err(SketchError::Parse(_))
        ));
    }

    #[test]
    fn bundled_config_matches_preset() {
        let config = SketchConfig::from_toml_str(include_str!("../config/constellation.toml")).unwrap();
        assert_eq!(config.particles, SketchConfig::constellation().particles);
        assert_eq!(config.orbs, SketchConfig::constellation().orbs);
    }

    #[test]
    fn flow_motion_parses_with_kind_tag() {
        let params: ParticleParams = toml::from_str(
            r#"
            boundary = "cull"
            fade_in_ms = 1500.0
            motion = { kind = "flow", noise_scale = 0.001, time_scale = 0.01, max_force = 1.0, max_acceleration = 2.0, max_velocity = 1.0, angle_turns = 4.0, reference_width = 1920.0 }
            "#,
        )
        .unwrap();

        assert_eq!(params.boundary, BoundaryPolicy::Cull);
        assert!(matches!(params.motion, ParticleMotion::Flow(f) if f.angle_turns == 4.0));
    }

    #[test]
    fn jitter_motion_parses_with_kind_tag() {
        let params: ParticleParams = toml::from_str(
            r#"
            boundary = "reflect"
            motion = { kind = "jitter", noise_scale = 0.00075, time_scale = 0.01, reach = 0.04, angle_turns = 4.0, reference_width = 1920.0 }
            "#,
        )
        .unwrap();

        assert_eq!(params.fade_in_ms, 0.0);
        assert!(matches!(
            params.motion,
            ParticleMotion::Jitter(j) if j.angle_turns == 4.0 && (j.reach - 0.04).abs() < 1e-6
        ));
    }
}

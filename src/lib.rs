//! Ambient particle fields for page backgrounds.
//!
//! A [`Sketch`] owns a drifting [`ParticleField`] of [`Particle`]s joined by
//! proximity lines, plus an optional field of [`ForceAgent`] orbs that chase
//! the pointer. Drawing goes through [`RenderTarget`], so the same simulation
//! runs against a window painter or the software [`PixelBuffer`].

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod field;
pub mod kinematics;
pub mod noise_field;
pub mod particle;
pub mod render;
pub mod sketch;
pub mod vector;

pub use agent::ForceAgent;
pub use config::{SketchConfig, Tier};
pub use context::{Bounds, FrameContext, Host};
pub use error::{Result, SketchError};
pub use field::{Edge, Member, ParticleField};
pub use particle::Particle;
pub use render::{Color, PixelBuffer, RenderStyle, RenderTarget};
pub use sketch::Sketch;
pub use vector::Vector2D;

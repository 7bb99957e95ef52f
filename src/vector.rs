//! Minimal mutable 2D vector used by every simulated body.
//!
//! Mutating operations work in place and hand back `&mut Self` so calls can be
//! chained the way sketch code usually reads: `v.add(a).limit(max)`. Length
//! math is delegated to `cgmath`.

use std::f32::consts::TAU;
use std::ops::Mul;

use cgmath::prelude::*;
use rand::Rng;

use crate::error::{Result, SketchError};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector2D {
    pub x: f32,
    pub y: f32,
}

impl Vector2D {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing at `theta` radians.
    pub fn from_angle(theta: f32) -> Self {
        let (sin, cos) = theta.sin_cos();
        Self::new(cos, sin)
    }

    /// Unit vector with a uniformly distributed angle in `[0, 2π)`.
    pub fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_angle(rng.gen_range(0.0..TAU))
    }

    pub fn copy(&self) -> Self {
        *self
    }

    pub fn add(&mut self, other: Self) -> &mut Self {
        self.x += other.x;
        self.y += other.y;
        self
    }

    pub fn sub(&mut self, other: Self) -> &mut Self {
        self.x -= other.x;
        self.y -= other.y;
        self
    }

    pub fn scale(&mut self, factor: f32) -> &mut Self {
        self.x *= factor;
        self.y *= factor;
        self
    }

    pub fn magnitude(&self) -> f32 {
        cgmath::Vector2::from(*self).magnitude()
    }

    pub fn magnitude_squared(&self) -> f32 {
        cgmath::Vector2::from(*self).magnitude2()
    }

    /// Vector pointing from `self` to `other`.
    pub fn offset_to(&self, other: Self) -> Self {
        Self::new(other.x - self.x, other.y - self.y)
    }

    pub fn distance_squared(&self, other: Self) -> f32 {
        self.offset_to(other).magnitude_squared()
    }

    /// Rescales to unit length. Fails on the zero vector, which is left untouched.
    pub fn normalize(&mut self) -> Result<&mut Self> {
        if self.magnitude_squared() == 0.0 {
            return Err(SketchError::DegenerateVector);
        }
        *self = cgmath::Vector2::from(*self).normalize().into();
        Ok(self)
    }

    /// Shrinks the vector to `max_magnitude` if it is longer; shorter vectors are kept.
    pub fn limit(&mut self, max_magnitude: f32) -> &mut Self {
        let max_magnitude = max_magnitude.max(0.0);
        let magnitude = self.magnitude();
        if magnitude > max_magnitude {
            self.scale(max_magnitude / magnitude);
        }
        self
    }

    /// Rescales to exactly `magnitude`, keeping the heading.
    pub fn set_magnitude(&mut self, magnitude: f32) -> Result<&mut Self> {
        let current = self.magnitude();
        if current == 0.0 {
            return Err(SketchError::DegenerateVector);
        }
        Ok(self.scale(magnitude / current))
    }

    /// Angle of the vector in radians, `atan2(y, x)`.
    pub fn heading(&self) -> f32 {
        self.y.atan2(self.x)
    }
}

impl From<cgmath::Vector2<f32>> for Vector2D {
    fn from(v: cgmath::Vector2<f32>) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Vector2D> for cgmath::Vector2<f32> {
    fn from(v: Vector2D) -> Self {
        cgmath::vec2(v.x, v.y)
    }
}

impl From<(f32, f32)> for Vector2D {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

impl Mul<f32> for Vector2D {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

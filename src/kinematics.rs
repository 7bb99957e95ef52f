use serde::Deserialize;

use crate::vector::Vector2D;

/// Caps applied after each stage of [`Kinematics::integrate`].
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct MotionLimits {
    pub max_force: f32,
    pub max_acceleration: f32,
    pub max_velocity: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Kinematics {
    pub position: Vector2D,
    pub velocity: Vector2D,
    pub acceleration: Vector2D,
    pub force: Vector2D,
}

impl Kinematics {
    pub fn at(position: Vector2D) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Adds `pull` to the running force and pushes it through
    /// force -> acceleration -> velocity -> position, clamping each stage.
    pub fn integrate(&mut self, pull: Vector2D, limits: &MotionLimits) {
        self.force.add(pull).limit(limits.max_force);

        self.acceleration = Vector2D::ZERO;
        self.acceleration.add(self.force).limit(limits.max_acceleration);

        self.velocity.add(self.acceleration).limit(limits.max_velocity);

        self.position.add(self.velocity);
    }

    pub fn reset_force(&mut self) {
        self.force = Vector2D::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: MotionLimits = MotionLimits {
        max_force: 1.0,
        max_acceleration: 0.5,
        max_velocity: 2.0,
    };

    #[test]
    fn every_stage_is_clamped() {
        let mut k = Kinematics::at(Vector2D::ZERO);
        k.integrate(Vector2D::new(100.0, 0.0), &LIMITS);

        assert!((k.force.magnitude() - 1.0).abs() < 1e-5);
        assert!((k.acceleration.magnitude() - 0.5).abs() < 1e-5);
        assert!((k.velocity.magnitude() - 0.5).abs() < 1e-5);
        assert!((k.position.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn velocity_saturates() {
        let mut k = Kinematics::at(Vector2D::ZERO);
        for _ in 0..20 {
            k.integrate(Vector2D::new(0.0, 100.0), &LIMITS);
            assert!(k.velocity.magnitude() <= LIMITS.max_velocity + 1e-5);
        }
        assert!((k.velocity.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn force_accumulates_until_reset() {
        let mut k = Kinematics::at(Vector2D::ZERO);
        k.integrate(Vector2D::new(0.25, 0.0), &LIMITS);
        k.integrate(Vector2D::new(0.25, 0.0), &LIMITS);
        assert!((k.force.x - 0.5).abs() < 1e-6);

        k.reset_force();
        assert_eq!(k.force, Vector2D::ZERO);
    }
}

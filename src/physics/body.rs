//! Bodies and Simulation State
//!
//! Immutable value types for the three-body system. Integration never
//! mutates a state in place: every step produces a new `SimulationState`.

use serde::{Serialize, Deserialize};

use crate::core::vec3::Vec3;

/// Number of bodies in the system.
pub const BODY_COUNT: usize = 3;

/// A point mass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Mass in simulation units, in [0.5, 2.0].
    pub mass: f64,
    /// Position.
    pub position: Vec3,
    /// Velocity.
    pub velocity: Vec3,
}

impl Body {
    /// Create a body.
    pub const fn new(mass: f64, position: Vec3, velocity: Vec3) -> Self {
        Self { mass, position, velocity }
    }

    /// Spherical coordinates of the position.
    ///
    /// A body at the origin reports `theta = acos(z / 1)`.
    pub fn theta_angles(&self) -> ThetaAngles {
        let p = self.position;
        let r = p.length();
        let denom = if r == 0.0 { 1.0 } else { r };
        ThetaAngles {
            theta: (p.z / denom).acos(),
            phi: p.y.atan2(p.x),
            r,
        }
    }
}

/// Full state of the three-body system.
///
/// Body order is fixed and significant: it is the serialization order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationState {
    /// The bodies, in canonical order.
    pub bodies: [Body; BODY_COUNT],
}

impl SimulationState {
    /// Create a state from three bodies.
    pub const fn new(bodies: [Body; BODY_COUNT]) -> Self {
        Self { bodies }
    }

    /// Positions in body order.
    pub fn positions(&self) -> [Vec3; BODY_COUNT] {
        self.bodies.map(|b| b.position)
    }

    /// Velocities in body order.
    pub fn velocities(&self) -> [Vec3; BODY_COUNT] {
        self.bodies.map(|b| b.velocity)
    }

    /// Polar angle, azimuth and radius of each body.
    ///
    /// Diagnostic data only; never part of any digest.
    pub fn theta_angles(&self) -> [ThetaAngles; BODY_COUNT] {
        self.bodies.map(|b| b.theta_angles())
    }
}

/// Spherical coordinates of one body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThetaAngles {
    /// Polar angle from +Z, in [0, pi].
    pub theta: f64,
    /// Azimuth in the XY plane, in (-pi, pi].
    pub phi: f64,
    /// Distance from the origin.
    pub r: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_theta_angles_on_axes() {
        let on_z = Body::new(1.0, Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO);
        let angles = on_z.theta_angles();
        assert_eq!(angles.theta, 0.0);
        assert_eq!(angles.r, 2.0);

        let on_y = Body::new(1.0, Vec3::new(0.0, 3.0, 0.0), Vec3::ZERO);
        let angles = on_y.theta_angles();
        assert!((angles.theta - FRAC_PI_2).abs() < 1e-12);
        assert!((angles.phi - FRAC_PI_2).abs() < 1e-12);

        let below = Body::new(1.0, Vec3::new(0.0, 0.0, -1.0), Vec3::ZERO);
        assert!((below.theta_angles().theta - PI).abs() < 1e-12);
    }

    #[test]
    fn test_theta_angles_at_origin() {
        let origin = Body::new(1.0, Vec3::ZERO, Vec3::ZERO);
        let angles = origin.theta_angles();
        assert_eq!(angles.r, 0.0);
        assert!((angles.theta - FRAC_PI_2).abs() < 1e-12);
        assert!(angles.theta.is_finite());
    }

    #[test]
    fn test_state_serializes_as_body_array() {
        let body = Body::new(1.0, Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.1, 0.2, 0.3));
        let state = SimulationState::new([body; BODY_COUNT]);
        let json = serde_json::to_value(state).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 3);
        assert_eq!(json[0]["position"]["y"], 2.0);
    }
}

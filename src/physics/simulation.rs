//! Three-Body Entropy Source
//!
//! Chaotic Newtonian three-body integration used purely as an entropy
//! generator. The trajectory is reproducible bit for bit: initial
//! conditions come from a SHA-256 of the seed, the integrator is a fixed
//! RK4 variant with a fixed operation order, and the final state is
//! serialized to a canonical string before hashing.
//!
//! Everything in this file is protocol. Changing a constant, the RK4 stage
//! order or the float formatting changes every house seed and every mixed
//! entropy value, and breaks verification of all past rounds.

use serde::{Serialize, Deserialize};

use crate::core::hash::{sha256, sha256_hex};
use crate::core::vec3::Vec3;
use super::body::{Body, SimulationState, ThetaAngles, BODY_COUNT};

/// Gravitational constant.
pub const GRAVITY: f64 = 1.0;

/// Softening length, squared and added to every squared distance.
pub const SOFTENING: f64 = 0.01;

/// Integration step for both schedules.
pub const TIME_STEP: f64 = 0.01;

/// Digits after the decimal point in the canonical float format.
pub const FRACTION_DIGITS: usize = 15;

/// Significant digits in the exact decimal expansion of the longest `f64`.
const EXACT_DIGITS: usize = 767;

/// Separator between serialized components.
pub const STATE_DELIMITER: &str = ":";

/// Integration duration and step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Total simulated time.
    pub duration: f64,
    /// Fixed step size.
    pub time_step: f64,
}

impl Schedule {
    /// Schedule used when generating a house seed (5.0 units).
    pub const HOUSE_SEED: Self = Self { duration: 5.0, time_step: TIME_STEP };

    /// Schedule used when mixing seeds (3.0 units).
    pub const MIXING: Self = Self { duration: 3.0, time_step: TIME_STEP };

    /// Number of whole steps: `floor(duration / time_step)`.
    pub fn steps(&self) -> u64 {
        if self.time_step <= 0.0 || self.duration <= 0.0 {
            return 0;
        }
        (self.duration / self.time_step).floor() as u64
    }
}

/// Output of one entropy run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntropyOutput {
    /// SHA-256 of the canonical state string.
    pub entropy_hex: String,
    /// Canonical serialization of the final state.
    pub state_string: String,
    /// Final state after integration.
    pub final_state: SimulationState,
    /// Spherical coordinates of the final bodies.
    pub theta_angles: [ThetaAngles; BODY_COUNT],
}

/// Run the simulation for `seed` and digest the final state.
///
/// # Determinism
///
/// Identical seed bytes and schedule give an identical `entropy_hex` on
/// every IEEE-754 platform.
pub fn simulate(seed: &[u8], schedule: Schedule) -> EntropyOutput {
    let initial = SimulationState::from_seed(seed);
    let final_state = integrate(initial, schedule);
    let state_string = final_state.canonical_string();

    EntropyOutput {
        entropy_hex: sha256_hex(&state_string),
        theta_angles: final_state.theta_angles(),
        final_state,
        state_string,
    }
}

/// Advance `state` for `schedule.steps()` RK4 steps.
pub fn integrate(state: SimulationState, schedule: Schedule) -> SimulationState {
    (0..schedule.steps()).fold(state, |s, _| s.step(schedule.time_step))
}

impl SimulationState {
    /// Derive initial conditions from a seed.
    ///
    /// Body `i` reads the digest at offsets `10*i .. 10*i + 6`, wrapping
    /// modulo 32: one byte for mass, three for position, three for velocity.
    pub fn from_seed(seed: &[u8]) -> Self {
        let digest = sha256(seed);
        let byte = |index: usize| digest[index % digest.len()] as f64 / 255.0;

        let body = |i: usize| {
            let offset = i * 10;
            let position = |k: usize| (byte(offset + k) - 0.5) * 10.0;
            let velocity = |k: usize| (byte(offset + k) - 0.5) * 2.0;

            Body::new(
                0.5 + byte(offset) * 1.5,
                Vec3::new(position(1), position(2), position(3)),
                Vec3::new(velocity(4), velocity(5), velocity(6)),
            )
        };

        Self::new([body(0), body(1), body(2)])
    }

    /// Gravitational acceleration on each body when placed at `positions`.
    ///
    /// Masses come from `self`; only positions vary between RK4 stages.
    pub fn accelerations_at(&self, positions: &[Vec3; BODY_COUNT]) -> [Vec3; BODY_COUNT] {
        let mut out = [Vec3::ZERO; BODY_COUNT];

        for (i, acc) in out.iter_mut().enumerate() {
            for (j, other) in self.bodies.iter().enumerate() {
                if i == j {
                    continue;
                }
                let d = positions[j].sub(positions[i]);
                let dist_sq = d.length_squared() + SOFTENING * SOFTENING;
                let dist = dist_sq.sqrt();
                let force = GRAVITY * other.mass / dist_sq;

                *acc = acc.add(d.scale(force).div_scalar(dist));
            }
        }

        out
    }

    /// One fixed-order RK4 step.
    ///
    /// Stage velocities feed the next stage's positions; the position update
    /// combines the initial velocity with `k1..k3` as below. This exact form
    /// is what every verifier replays.
    pub fn step(&self, dt: f64) -> Self {
        let p = self.positions();
        let v = self.velocities();
        let half = |x: Vec3| x.scale(dt).div_scalar(2.0);

        let k1 = self.accelerations_at(&p);

        let p2: [Vec3; BODY_COUNT] = std::array::from_fn(|i| p[i].add(half(v[i])));
        let v2: [Vec3; BODY_COUNT] = std::array::from_fn(|i| v[i].add(half(k1[i])));
        let k2 = self.accelerations_at(&p2);

        let p3: [Vec3; BODY_COUNT] = std::array::from_fn(|i| p[i].add(half(v2[i])));
        let v3: [Vec3; BODY_COUNT] = std::array::from_fn(|i| v[i].add(half(k2[i])));
        let k3 = self.accelerations_at(&p3);

        let p4: [Vec3; BODY_COUNT] = std::array::from_fn(|i| p[i].add(v3[i].scale(dt)));
        let k4 = self.accelerations_at(&p4);

        let bodies = std::array::from_fn(|i| {
            let dp = v[i]
                .add(k1[i].scale(2.0))
                .add(k2[i].scale(2.0))
                .add(k3[i])
                .scale(dt)
                .div_scalar(6.0);
            let dv = k1[i]
                .add(k2[i].scale(2.0))
                .add(k3[i].scale(2.0))
                .add(k4[i])
                .scale(dt)
                .div_scalar(6.0);

            Body::new(self.bodies[i].mass, p[i].add(dp), v[i].add(dv))
        });

        Self::new(bodies)
    }

    /// Canonical string: position then velocity of each body, x/y/z,
    /// joined by `:`.
    pub fn canonical_string(&self) -> String {
        self.bodies
            .iter()
            .flat_map(|b| b.position.to_array().into_iter().chain(b.velocity.to_array()))
            .map(format_component)
            .collect::<Vec<_>>()
            .join(STATE_DELIMITER)
    }

    /// SHA-256 of the canonical string, as hex.
    pub fn entropy_hex(&self) -> String {
        sha256_hex(&self.canonical_string())
    }
}

/// Format one component as `d.ddddddddddddddde±x`.
///
/// Fifteen fractional digits, explicit exponent sign, no exponent padding,
/// negative zero printed as zero. Rounding is computed on the exact decimal
/// value of the float, and an exact tie rounds away from zero.
pub fn format_component(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return format!("{:.*}e+0", FRACTION_DIGITS, 0.0);
    }

    // Fixed-precision `{:e}` is exact, so these are the true digits.
    let exact = format!("{:.*e}", EXACT_DIGITS - 1, value.abs());
    let Some((mantissa, exponent)) = exact.split_once('e') else {
        return exact;
    };
    let Ok(mut exponent) = exponent.parse::<i32>() else {
        return exact;
    };

    let digits: Vec<u8> = mantissa
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect();
    let keep = FRACTION_DIGITS + 1;
    let mut kept = digits[..keep].to_vec();

    if digits.get(keep).map_or(false, |&d| d >= 5) {
        let mut carry = true;
        for digit in kept.iter_mut().rev() {
            if *digit == 9 {
                *digit = 0;
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            // 9.99..9 rolled over to 10.00..0
            kept[0] = 1;
            exponent += 1;
        }
    }

    let mut out = String::with_capacity(keep + 8);
    if value < 0.0 {
        out.push('-');
    }
    out.push(char::from(b'0' + kept[0]));
    out.push('.');
    out.extend(kept[1..].iter().map(|&d| char::from(b'0' + d)));
    out.push('e');
    out.push(if exponent < 0 { '-' } else { '+' });
    out.push_str(&exponent.unsigned_abs().to_string());
    out
}

// =============================================================================
// TESTS
// =============================================================================

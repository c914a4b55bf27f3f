//! Core deterministic primitives.
//!
//! Hashing helpers and the f64 vector type the simulation is built on.
//! Both are bit-reproducible across platforms.

pub mod hash;
pub mod vec3;

// Re-export core types
pub use hash::{sha256_hex, hmac_sha256_hex, Digest32};
pub use vec3::Vec3;

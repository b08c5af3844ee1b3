//! Utils

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};
use crate::{Color, Vec3};

/// Values closer to zero than this are treated as exactly zero
pub const ACCURACY: f64 = 1e-10;

/// Snap a value to zero when it is within [`ACCURACY`] of it.
///
/// Comparisons against zero (dot products, ray parameters) go through this so that
/// grazing and parallel cases land in the zero branch instead of flipping sign on
/// rounding noise.
pub fn align_zero(x: f64) -> f64 {
    if x.abs() < ACCURACY {
        0.0
    } else {
        x
    }
}

pub fn is_zero(x: f64) -> bool {
    x.abs() < ACCURACY
}

/// Normalize a user-supplied vector, rejecting the zero vector
pub fn try_unit(v: Vec3) -> Result<Vec3> {
    v.try_normalize(ACCURACY).ok_or(TraceError::DegenerateVector)
}

/// Mirror `v` about the unit normal `n`
pub fn reflect(v: &Vec3, n: &Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Whether every channel of a coefficient triple is below `min`
pub fn lower_than(k: &Vec3, min: f64) -> bool {
    k.iter().all(|c| *c < min)
}

/// Largest per-channel difference between two colors
pub fn color_distance(a: &Color, b: &Color) -> f64 {
    (a - b).abs().max()
}

/// scale the color channel to between 0 and 255
pub fn scale_color(val: f64) -> u8 {
    val.round().clamp(0.0, 255.0) as u8
}

/// Serializable form of a point, vector, color or coefficient triple
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SerdeVector(pub [f64; 3]);
impl From<SerdeVector> for Vec3 {
    fn from(v: SerdeVector) -> Self {
        Vec3::new(v.0[0], v.0[1], v.0[2])
    }
}
impl From<Vec3> for SerdeVector {
    fn from(v: Vec3) -> Self {
        Self([v[0], v[1], v[2]])
    }
}

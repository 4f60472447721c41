//! Math primitives for the ionlab simulation stack.
//!
//! Vector aliases over nalgebra, reduced-unit constants, and the compensated
//! summation used for the per-step energy reductions.

use nalgebra as na;

/// 3D vector alias.
pub type Vec3 = na::Vector3<f64>;
/// Dynamic vector.
pub type DVec = na::DVector<f64>;

/// Boltzmann constant in reduced units. Temperatures are in energy units.
pub const BOLTZMANN: f64 = 1.0;

/// Neumaier-compensated sum.
///
/// Energy reductions run every step for the whole run; a plain `f64` sum
/// accumulates O(N·steps) rounding. The running compensation term recovers
/// the low-order bits lost when terms of very different magnitude meet.
pub fn compensated_sum(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            compensation += (sum - t) + v;
        } else {
            compensation += (v - t) + sum;
        }
        sum = t;
    }
    sum + compensation
}

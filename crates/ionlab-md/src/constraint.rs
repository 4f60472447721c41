//! Holonomic charge-neutrality constraint on the induced-charge field.
//!
//! The constraint is the area-weighted sum of the field values; it is linear
//! in `w`, so a single pass restores it exactly, with no iterative solve. The
//! same correction applied to the field velocities restores the constraint's
//! time derivative.

use ionlab_math::compensated_sum;
use ionlab_model::SurfaceVertex;

/// Constraint functional σ = Σ a_k·w_k (total induced charge).
pub fn total_induced_charge(surface: &[SurfaceVertex]) -> f64 {
    compensated_sum(surface.iter().map(SurfaceVertex::induced_charge))
}

/// Time derivative of the constraint: Σ a_k·vw_k.
pub fn charge_rate(surface: &[SurfaceVertex]) -> f64 {
    compensated_sum(surface.iter().map(|v| v.area_weight * v.vw))
}

/// Position-stage projection: subtract σ/(a_k·N) from every vertex, driving
/// the constraint to zero in one linear step. Returns the deviation that was
/// removed. Invoked exactly once per step, right after the field position
/// update.
pub fn project_charges(surface: &mut [SurfaceVertex]) -> f64 {
    let n = surface.len();
    if n == 0 {
        return 0.0;
    }
    let sigma = total_induced_charge(surface);
    for vertex in surface.iter_mut() {
        vertex.w -= sigma / (vertex.area_weight * n as f64);
    }
    sigma
}

/// Velocity-stage projection: the identical linear correction applied to the
/// field velocities using the rate sum. Independent of the position stage.
/// Invoked exactly once per step, after the field's final half-kick.
pub fn project_charge_rates(surface: &mut [SurfaceVertex]) -> f64 {
    let n = surface.len();
    if n == 0 {
        return 0.0;
    }
    let sigma_dot = charge_rate(surface);
    for vertex in surface.iter_mut() {
        vertex.vw -= sigma_dot / (vertex.area_weight * n as f64);
    }
    sigma_dot
}

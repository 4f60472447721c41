//! Energy models: the potential functional and its forces.
//!
//! The integrator consumes one seam, [`EnergyModel`]: given the current ion
//! and field configurations, return forces on both species and the scalar
//! potential. Implementations must be pure: callable repeatedly with
//! mutated inputs, no side effects beyond the returned value.

use ionlab_math::{compensated_sum, Vec3};
use ionlab_model::{Ion, SurfaceVertex};
use rayon::prelude::*;

use crate::error::{MdError, Result};

/// One force/energy evaluation.
#[derive(Clone, Debug, Default)]
pub struct Evaluation {
    /// Force on each ion, same order as the input slice.
    pub ion_forces: Vec<Vec3>,
    /// Generalized force on each vertex's field value.
    pub vertex_forces: Vec<f64>,
    /// Potential-energy functional of the configuration.
    pub potential: f64,
}

/// The potential-energy functional and its forces on both species.
pub trait EnergyModel: Send + Sync {
    fn evaluate(&self, ions: &[Ion], surface: &[SurfaceVertex]) -> Evaluation;
}

/// Evaluate and validate: shapes must match the inputs and every returned
/// value must be finite. A violation is fatal; the run aborts rather than
/// propagating corrupt state.
pub fn checked_evaluate(
    model: &dyn EnergyModel,
    ions: &[Ion],
    surface: &[SurfaceVertex],
    step: usize,
) -> Result<Evaluation> {
    let eval = model.evaluate(ions, surface);
    if eval.ion_forces.len() != ions.len() {
        return Err(MdError::IonForceShape {
            got: eval.ion_forces.len(),
            expected: ions.len(),
        });
    }
    if eval.vertex_forces.len() != surface.len() {
        return Err(MdError::VertexForceShape {
            got: eval.vertex_forces.len(),
            expected: surface.len(),
        });
    }
    if !eval.potential.is_finite() {
        return Err(MdError::NonFinitePotential { step });
    }
    for (index, f) in eval.ion_forces.iter().enumerate() {
        if !(f.x.is_finite() && f.y.is_finite() && f.z.is_finite()) {
            return Err(MdError::NonFiniteIonForce { index, step });
        }
    }
    for (index, fw) in eval.vertex_forces.iter().enumerate() {
        if !fw.is_finite() {
            return Err(MdError::NonFiniteVertexForce { index, step });
        }
    }
    Ok(eval)
}

/// Softened inverse distance 1/√(r² + s²).
#[inline]
fn soft_inv(r: Vec3, softening: f64) -> f64 {
    1.0 / (r.norm_squared() + softening * softening).sqrt()
}

/// Coulomb gas coupled to an induced surface charge.
///
/// U = C Σ_{i<j} q_i q_j / r_ij
///   + C Q_c Σ_i q_i / r_i
///   + C Σ_{i,k} q_i (a_k w_k) / r_ik  + C Q_c Σ_k (a_k w_k) / r_k
///   + 1/(2χ) Σ_k a_k w_k²
///
/// with every distance softened. The quadratic self term gives the
/// functional a well-defined minimum over `w` at fixed ion positions, which
/// the constrained dynamics tracks. Pair loops fan out with rayon; the
/// result is fully reduced before the caller proceeds.
#[derive(Clone, Debug)]
pub struct PolarizableCoulomb {
    /// Coulomb prefactor C (Bjerrum strength in reduced units).
    pub coulomb_strength: f64,
    /// Local susceptibility χ of the induced charge.
    pub susceptibility: f64,
    /// Short-range softening length.
    pub softening: f64,
    /// Fixed central charge at the origin (the bare colloid charge).
    pub central_charge: f64,
}

impl PolarizableCoulomb {
    pub fn new(coulomb_strength: f64, susceptibility: f64, softening: f64) -> Self {
        Self {
            coulomb_strength,
            susceptibility,
            softening,
            central_charge: 0.0,
        }
    }

    pub fn with_central_charge(mut self, central_charge: f64) -> Self {
        self.central_charge = central_charge;
        self
    }

    /// External potential felt at a vertex from the ions and the central
    /// charge (the linear coefficient of U in that vertex's `w`).
    fn field_at_vertex(&self, ions: &[Ion], vertex: &SurfaceVertex) -> f64 {
        let c = self.coulomb_strength;
        let from_ions: f64 = ions
            .iter()
            .map(|ion| c * ion.charge * soft_inv(ion.pos - vertex.pos, self.softening))
            .sum();
        from_ions + c * self.central_charge * soft_inv(vertex.pos, self.softening)
    }
}

impl EnergyModel for PolarizableCoulomb {
    fn evaluate(&self, ions: &[Ion], surface: &[SurfaceVertex]) -> Evaluation {
        let c = self.coulomb_strength;
        let s = self.softening;

        let ion_forces: Vec<Vec3> = ions
            .par_iter()
            .enumerate()
            .map(|(i, a)| {
                let mut f = Vec3::zeros();
                for (j, b) in ions.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    let r = a.pos - b.pos;
                    let inv = soft_inv(r, s);
                    f += r * (c * a.charge * b.charge * inv * inv * inv);
                }
                if self.central_charge != 0.0 {
                    let inv = soft_inv(a.pos, s);
                    f += a.pos * (c * a.charge * self.central_charge * inv * inv * inv);
                }
                for v in surface {
                    let r = a.pos - v.pos;
                    let inv = soft_inv(r, s);
                    f += r * (c * a.charge * v.induced_charge() * inv * inv * inv);
                }
                f
            })
            .collect();

        let vertex_forces: Vec<f64> = surface
            .par_iter()
            .map(|v| {
                // fw = -∂U/∂w = -a_k (φ_k + w_k/χ)
                -v.area_weight * (self.field_at_vertex(ions, v) + v.w / self.susceptibility)
            })
            .collect();

        let pair_energy = compensated_sum((0..ions.len()).flat_map(|i| {
            ((i + 1)..ions.len()).map(move |j| {
                c * ions[i].charge * ions[j].charge * soft_inv(ions[i].pos - ions[j].pos, s)
            })
        }));
        let central_energy = compensated_sum(
            ions.iter()
                .map(|ion| c * self.central_charge * ion.charge * soft_inv(ion.pos, s)),
        );
        let coupling_energy = compensated_sum(
            surface
                .iter()
                .map(|v| self.field_at_vertex(ions, v) * v.induced_charge()),
        );
        let self_energy = compensated_sum(
            surface
                .iter()
                .map(|v| 0.5 * v.area_weight * v.w * v.w / self.susceptibility),
        );

        Evaluation {
            ion_forces,
            vertex_forces,
            potential: pair_energy + central_energy + coupling_energy + self_energy,
        }
    }
}

/// Ions tethered harmonically to the origin; the field is inert.
///
/// Bounded and singularity-free: U = ½ k Σ_i |r_i|², F_i = -k r_i. Used for
/// drift and equipartition checks where a Coulomb core would only add noise.
#[derive(Clone, Debug)]
pub struct HarmonicTether {
    pub stiffness: f64,
}

impl HarmonicTether {
    pub fn new(stiffness: f64) -> Self {
        Self { stiffness }
    }
}

impl EnergyModel for HarmonicTether {
    fn evaluate(&self, ions: &[Ion], surface: &[SurfaceVertex]) -> Evaluation {
        let ion_forces: Vec<Vec3> = ions.iter().map(|ion| -self.stiffness * ion.pos).collect();
        let potential =
            compensated_sum(ions.iter().map(|ion| 0.5 * self.stiffness * ion.pos.norm_squared()));
        Evaluation {
            ion_forces,
            vertex_forces: vec![0.0; surface.len()],
            potential,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_tether_forces_and_energy() {
        let model = HarmonicTether::new(2.0);
        let ions = vec![Ion::new(Vec3::new(1.0, 0.0, 0.0), 1.0, 1)];
        let eval = model.evaluate(&ions, &[]);
        assert_relative_eq!(eval.ion_forces[0].x, -2.0);
        assert_relative_eq!(eval.potential, 1.0);
    }

    #[test]
    fn test_coulomb_pair_is_antisymmetric() {
        let model = PolarizableCoulomb::new(1.0, 1.0, 0.1);
        let ions = vec![
            Ion::new(Vec3::new(-1.0, 0.2, 0.0), 1.0, 1),
            Ion::new(Vec3::new(1.5, -0.3, 0.4), 1.0, 1),
        ];
        let eval = model.evaluate(&ions, &[]);
        let sum = eval.ion_forces[0] + eval.ion_forces[1];
        assert_abs_diff_eq!(sum.norm(), 0.0, epsilon = 1e-12);
        // Like charges repel.
        assert!(eval.ion_forces[0].x < 0.0);
    }

    #[test]
    fn test_vertex_force_vanishes_at_local_minimum() {
        // With no ions and no central charge, ∂U/∂w = a·w/χ, so w = 0 is
        // the minimum and the generalized force there is zero.
        let model = PolarizableCoulomb::new(1.0, 0.5, 0.1);
        let mut v = SurfaceVertex::new(Vec3::new(0.0, 0.0, 2.0), 1.3);
        v.w = 0.0;
        let eval = model.evaluate(&[], &[v.clone()]);
        assert_abs_diff_eq!(eval.vertex_forces[0], 0.0, epsilon = 1e-15);

        // Away from the minimum the force points back toward it.
        v.w = 0.7;
        let eval = model.evaluate(&[], &[v]);
        assert!(eval.vertex_forces[0] < 0.0);
    }

    #[test]
    fn test_checked_evaluate_rejects_shape_mismatch() {
        struct Broken;
        impl EnergyModel for Broken {
            fn evaluate(&self, _ions: &[Ion], _surface: &[SurfaceVertex]) -> Evaluation {
                Evaluation::default()
            }
        }
        let ions = vec![Ion::new(Vec3::zeros(), 1.0, 1)];
        let err = checked_evaluate(&Broken, &ions, &[], 0).unwrap_err();
        assert!(matches!(err, MdError::IonForceShape { got: 0, expected: 1 }));
    }

    #[test]
    fn test_checked_evaluate_rejects_non_finite() {
        struct Nan;
        impl EnergyModel for Nan {
            fn evaluate(&self, ions: &[Ion], surface: &[SurfaceVertex]) -> Evaluation {
                Evaluation {
                    ion_forces: vec![Vec3::zeros(); ions.len()],
                    vertex_forces: vec![0.0; surface.len()],
                    potential: f64::NAN,
                }
            }
        }
        let ions = vec![Ion::new(Vec3::zeros(), 1.0, 1)];
        let err = checked_evaluate(&Nan, &ions, &[], 7).unwrap_err();
        assert!(matches!(err, MdError::NonFinitePotential { step: 7 }));
    }
}

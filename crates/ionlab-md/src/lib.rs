//! Extended-Lagrangian dynamics core for ions coupled to an induced-charge
//! field.
//!
//! Implements the constrained, dual-thermostatted integrator:
//! - Nose-Hoover chains with an explicit sentinel terminator ([`bath`])
//! - the linear charge-neutrality constraint and its single-pass
//!   position/velocity projections ([`constraint`])
//! - the energy-model seam and reference functionals ([`forcefield`])
//! - the reversible 8-stage step over both species ([`integrator`])
//! - the fictitious-dynamics field relaxer that seeds the run ([`relax`])
//! - read-only periodic observers ([`sampling`])

pub mod bath;
pub mod constraint;
pub mod error;
pub mod forcefield;
pub mod integrator;
pub mod relax;
pub mod sampling;

pub use bath::{Bath, NoseHooverChain, Sweep};
pub use constraint::{
    charge_rate, project_charge_rates, project_charges, total_induced_charge,
};
pub use error::MdError;
pub use forcefield::{EnergyModel, Evaluation, HarmonicTether, PolarizableCoulomb};
pub use integrator::{field_kinetic_energy, ion_kinetic_energy, CpmdSystem};
pub use relax::{FieldRelaxation, RelaxationReport};
pub use sampling::{
    ConstraintWatch, EnergyMonitor, Frame, Observer, ProgressReporter, RelaxationCheck,
    SnapshotRecorder,
};

//! ionlab: extended-Lagrangian dynamics of ions near a polarizable
//! interface.
//!
//! This is the umbrella crate that re-exports the public surface of the
//! sub-crates: the data model, the thermostat/constraint primitives, the
//! integrator, the field relaxer, and the observers.

pub use ionlab_math::{self, compensated_sum, Vec3, BOLTZMANN};
pub use ionlab_model::{self, ConfigError, Ion, RunControl, SurfaceVertex};

pub use ionlab_md::{
    self, charge_rate, field_kinetic_energy, ion_kinetic_energy, project_charge_rates,
    project_charges, total_induced_charge, Bath, ConstraintWatch, CpmdSystem, EnergyModel,
    EnergyMonitor, Evaluation, FieldRelaxation, HarmonicTether, MdError, NoseHooverChain,
    Observer, PolarizableCoulomb, ProgressReporter, RelaxationCheck, RelaxationReport,
    SnapshotRecorder, Sweep,
};

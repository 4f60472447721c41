//! Run configuration consumed (never produced) by the dynamics core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Setup-time configuration errors. All are fatal before any step executes.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("time step must be positive and finite, got {0}")]
    BadTimestep(f64),

    #[error("fictitious mass must be positive, got {0}")]
    BadFictitiousMass(f64),

    #[error("interval `{name}` must be at least 1")]
    ZeroInterval { name: &'static str },

    #[error("thermostat chain must have at least one link")]
    EmptyChain,

    #[error("thermostat mass must be positive for a chain of {links} links, got {mass}")]
    BadBathMass { links: usize, mass: f64 },

    #[error("bath temperature must be non-negative and finite, got {0}")]
    BadTemperature(f64),

    #[error("vertex {index} has non-positive area weight {weight}")]
    BadAreaWeight { index: usize, weight: f64 },
}

/// Externally-supplied run parameters.
///
/// Interval fields gate the periodic observers; they are step counts, never
/// recomputed during a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunControl {
    /// Integration time step.
    pub timestep: f64,
    /// Number of steps to run.
    pub steps: usize,
    /// Step at which production sampling begins.
    pub equilibration: usize,
    /// Snapshot/density sampling interval.
    pub sample_every: usize,
    /// Energy diagnostic interval.
    pub energy_every: usize,
    /// On-the-fly verification interval (polarized runs).
    pub verify_every: usize,
    /// Trajectory snapshot interval.
    pub snapshot_every: usize,
    /// Global fictitious-mass parameter for the field.
    pub fictitious_mass: f64,
    /// Whether the interface polarizes (inside and outside dielectric
    /// responses differ). Immutable for the run.
    pub polarized: bool,
}

impl RunControl {
    /// Validate the configuration; all violations are fatal at setup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(ConfigError::BadTimestep(self.timestep));
        }
        if !(self.fictitious_mass.is_finite() && self.fictitious_mass > 0.0) {
            return Err(ConfigError::BadFictitiousMass(self.fictitious_mass));
        }
        for (name, value) in [
            ("sample_every", self.sample_every),
            ("energy_every", self.energy_every),
            ("verify_every", self.verify_every),
            ("snapshot_every", self.snapshot_every),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroInterval { name });
            }
        }
        Ok(())
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self {
            timestep: 0.001,
            steps: 50_000,
            equilibration: 10_000,
            sample_every: 100,
            energy_every: 1_000,
            verify_every: 10_000,
            snapshot_every: 1_000,
            fictitious_mass: 1.0,
            polarized: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(RunControl::default().validate().is_ok());
    }

    #[test]
    fn test_bad_timestep() {
        let control = RunControl {
            timestep: -0.001,
            ..RunControl::default()
        };
        assert!(matches!(
            control.validate(),
            Err(ConfigError::BadTimestep(_))
        ));
    }

    #[test]
    fn test_zero_interval() {
        let control = RunControl {
            energy_every: 0,
            ..RunControl::default()
        };
        assert!(matches!(
            control.validate(),
            Err(ConfigError::ZeroInterval { name: "energy_every" })
        ));
    }
}

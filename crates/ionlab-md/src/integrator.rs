//! Extended-Lagrangian integrator with dual Nose-Hoover chains and the
//! charge constraint.
//!
//! One reversible cycle per step: reverse-order chain updates, thermostatted
//! half-kicks, full-step position updates, constraint projection, a single
//! force evaluation, the mirrored half-kicks and re-projection, forward-order
//! chain updates. Absent thermostats and constraint this reduces to velocity
//! Verlet. The fictitious-field stages run only when the interface is
//! polarized; the branch is on an immutable flag fixed at setup.

use std::sync::Arc;

use ionlab_math::{compensated_sum, BOLTZMANN};
use ionlab_model::{ConfigError, Ion, RunControl, SurfaceVertex};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::bath::{NoseHooverChain, Sweep};
use crate::constraint::{charge_rate, project_charge_rates, project_charges, total_induced_charge};
use crate::error::Result;
use crate::forcefield::{checked_evaluate, EnergyModel};
use crate::sampling::Observer;

/// Post-projection constraint tolerance asserted in debug builds. A
/// violation here means a projection-arithmetic bug, not a modeling choice.
const CONSTRAINT_TOL: f64 = 1e-9;

/// Kinetic energy of the ions (compensated reduction).
pub fn ion_kinetic_energy(ions: &[Ion]) -> f64 {
    compensated_sum(ions.iter().map(Ion::kinetic_energy))
}

/// Fictitious kinetic energy of the field (compensated reduction).
pub fn field_kinetic_energy(surface: &[SurfaceVertex]) -> f64 {
    compensated_sum(surface.iter().map(SurfaceVertex::kinetic_energy))
}

/// The coupled real + fictitious system and its two thermostat chains.
///
/// Owns the dynamical state and the energy-model seam; per-step scalars
/// (kinetic energies, last potential) are caches recomputed every cycle.
pub struct CpmdSystem {
    pub ions: Vec<Ion>,
    pub surface: Vec<SurfaceVertex>,
    pub real_bath: NoseHooverChain,
    pub fake_bath: NoseHooverChain,
    model: Arc<dyn EnergyModel>,
    dt: f64,
    polarized: bool,
    step: usize,
    particle_ke: f64,
    field_ke: f64,
    potential: f64,
}

impl CpmdSystem {
    /// Assemble and prepare the system: validate the configuration, assign
    /// fictitious masses, seed the field from the relaxer's running mean,
    /// enforce the constraint and its derivative, and evaluate initial
    /// forces. Velocities start at zero; see
    /// [`seed_velocities`](Self::seed_velocities).
    pub fn new(
        ions: Vec<Ion>,
        surface: Vec<SurfaceVertex>,
        real_bath: NoseHooverChain,
        fake_bath: NoseHooverChain,
        model: Arc<dyn EnergyModel>,
        control: &RunControl,
    ) -> Result<Self> {
        control.validate()?;
        for (index, vertex) in surface.iter().enumerate() {
            if !(vertex.area_weight.is_finite() && vertex.area_weight > 0.0) {
                return Err(ConfigError::BadAreaWeight {
                    index,
                    weight: vertex.area_weight,
                }
                .into());
            }
        }

        let mut system = Self {
            ions,
            surface,
            real_bath,
            fake_bath,
            model,
            dt: control.timestep,
            polarized: control.polarized,
            step: 0,
            particle_ke: 0.0,
            field_ke: 0.0,
            potential: 0.0,
        };

        for vertex in &mut system.surface {
            vertex.assign_mass(control.fictitious_mass);
            vertex.w = vertex.wmean;
        }
        project_charges(&mut system.surface);
        project_charge_rates(&mut system.surface);

        system.apply_forces()?;
        system.resync_kinetic_energy();

        log::debug!(
            "assembled system: {} ions, {} vertices, polarized = {}",
            system.ions.len(),
            system.surface.len(),
            system.polarized
        );
        Ok(system)
    }

    /// Draw Maxwell-Boltzmann velocities for both species at their chains'
    /// target temperatures (zero for a frictionless chain), remove the net
    /// ion momentum, and re-enforce the constraint derivative.
    pub fn seed_velocities<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.real_bath.is_newtonian() {
            for ion in &mut self.ions {
                ion.vel.fill(0.0);
            }
        } else {
            let temp = self.real_bath.target_temperature();
            for ion in &mut self.ions {
                let sigma = (BOLTZMANN * temp / ion.mass).sqrt();
                for d in 0..3 {
                    ion.vel[d] = sigma * rng.sample::<f64, _>(StandardNormal);
                }
            }
            // Remove center-of-mass drift.
            let total_mass: f64 = self.ions.iter().map(|ion| ion.mass).sum();
            if total_mass > 0.0 {
                let momentum: ionlab_math::Vec3 = self
                    .ions
                    .iter()
                    .map(|ion| ion.vel * ion.mass)
                    .sum();
                let drift = momentum / total_mass;
                for ion in &mut self.ions {
                    ion.vel -= drift;
                }
            }
        }

        if self.polarized && !self.fake_bath.is_newtonian() {
            let temp = self.fake_bath.target_temperature();
            for vertex in &mut self.surface {
                let sigma = (BOLTZMANN * temp / vertex.mu).sqrt();
                vertex.vw = sigma * rng.sample::<f64, _>(StandardNormal);
            }
        } else {
            for vertex in &mut self.surface {
                vertex.vw = 0.0;
            }
        }
        project_charge_rates(&mut self.surface);
        self.resync_kinetic_energy();
    }

    /// One full reversible cycle. Stage order matters; see the module docs.
    pub fn step(&mut self) -> Result<()> {
        let dt = self.dt;

        // 1. Real-chain reverse sweep, driven by the cached particle KE.
        self.real_bath.sweep_xi(Sweep::Descending, dt, self.particle_ke);
        self.real_bath.advance_eta(dt);

        // 2. First real half-kick. The friction factor is computed once and
        // reused by the second half-kick of this same step.
        let expfac_real = self.real_bath.friction_factor(dt);
        for ion in &mut self.ions {
            ion.thermo_kick(dt, expfac_real);
        }

        // 3. Full-step position update.
        for ion in &mut self.ions {
            ion.advance_position(dt);
        }

        // 4. Fictitious system, mirrored, then the position projection.
        let mut expfac_fake = 1.0;
        if self.polarized {
            self.fake_bath.sweep_xi(Sweep::Descending, dt, self.field_ke);
            self.fake_bath.advance_eta(dt);
            expfac_fake = self.fake_bath.friction_factor(dt);
            for vertex in &mut self.surface {
                vertex.thermo_kick(dt, expfac_fake);
            }
            for vertex in &mut self.surface {
                vertex.advance_value(dt);
            }
            project_charges(&mut self.surface);
            debug_assert!(
                total_induced_charge(&self.surface).abs() < CONSTRAINT_TOL,
                "constraint not restored by position projection"
            );
        }

        // 5. The single force evaluation of the step, on the constrained
        // state. Fatal if the model returns anything non-finite.
        self.apply_forces()?;

        // 6. Second real half-kick with the stage-2 factor.
        for ion in &mut self.ions {
            ion.thermo_kick(dt, expfac_real);
        }

        // 7. Second fake half-kick, velocity projection, forward fake sweep
        // driven by the freshly recomputed fictitious KE.
        if self.polarized {
            for vertex in &mut self.surface {
                vertex.thermo_kick(dt, expfac_fake);
            }
            project_charge_rates(&mut self.surface);
            debug_assert!(
                charge_rate(&self.surface).abs() < CONSTRAINT_TOL,
                "constraint rate not restored by velocity projection"
            );
            self.field_ke = field_kinetic_energy(&self.surface);
            self.fake_bath.advance_eta(dt);
            self.fake_bath.sweep_xi(Sweep::Ascending, dt, self.field_ke);
        }

        // 8. Forward real sweep with the fresh particle KE.
        self.particle_ke = ion_kinetic_energy(&self.ions);
        self.real_bath.advance_eta(dt);
        self.real_bath.sweep_xi(Sweep::Ascending, dt, self.particle_ke);

        self.step += 1;
        Ok(())
    }

    /// Run `steps` whole cycles, invoking the observers after each one.
    /// Cancellation (an `Err`) is step-granular: state is never left
    /// mid-cycle.
    pub fn run(&mut self, steps: usize, observers: &mut [&mut dyn Observer]) -> Result<()> {
        for _ in 0..steps {
            self.step()?;
            for observer in observers.iter_mut() {
                observer.observe(self);
            }
        }
        Ok(())
    }

    fn apply_forces(&mut self) -> Result<()> {
        let eval = checked_evaluate(self.model.as_ref(), &self.ions, &self.surface, self.step)?;
        for (ion, force) in self.ions.iter_mut().zip(&eval.ion_forces) {
            ion.force = *force;
        }
        for (vertex, fw) in self.surface.iter_mut().zip(&eval.vertex_forces) {
            vertex.fw = *fw;
        }
        self.potential = eval.potential;
        Ok(())
    }

    /// Recompute the cached kinetic energies. Needed after mutating
    /// velocities from outside (the caches feed the next chain sweep).
    pub fn resync_kinetic_energy(&mut self) {
        self.particle_ke = ion_kinetic_energy(&self.ions);
        self.field_ke = field_kinetic_energy(&self.surface);
    }

    pub fn energy_model(&self) -> Arc<dyn EnergyModel> {
        Arc::clone(&self.model)
    }

    pub fn timestep(&self) -> f64 {
        self.dt
    }

    pub fn polarized(&self) -> bool {
        self.polarized
    }

    /// Completed steps.
    pub fn step_count(&self) -> usize {
        self.step
    }

    /// Particle kinetic energy as of the last completed stage.
    pub fn particle_kinetic(&self) -> f64 {
        self.particle_ke
    }

    /// Fictitious kinetic energy as of the last completed stage.
    pub fn field_kinetic(&self) -> f64 {
        self.field_ke
    }

    /// Potential energy from the last force evaluation.
    pub fn potential_energy(&self) -> f64 {
        self.potential
    }

    /// Conserved quantity of the extended system: both physical kinetic
    /// energies, the potential, and the chain terms.
    pub fn extended_energy(&self) -> f64 {
        self.particle_ke
            + self.field_ke
            + self.potential
            + self.real_bath.kinetic_energy()
            + self.real_bath.potential_energy()
            + self.fake_bath.kinetic_energy()
            + self.fake_bath.potential_energy()
    }

    /// Instantaneous ion temperature, 2·KE / (3N·kB).
    pub fn temperature(&self) -> f64 {
        let dof = 3 * self.ions.len();
        if dof == 0 {
            return 0.0;
        }
        2.0 * self.particle_ke / (dof as f64 * BOLTZMANN)
    }

    /// Current constraint deviation σ.
    pub fn constraint_deviation(&self) -> f64 {
        total_induced_charge(&self.surface)
    }

    /// Current constraint rate σ̇.
    pub fn constraint_rate(&self) -> f64 {
        charge_rate(&self.surface)
    }
}

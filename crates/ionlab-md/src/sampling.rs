//! Read-only periodic observers over the running system.
//!
//! Observers are invoked after every completed cycle and gate themselves on
//! the step count modulo their configured interval. None of them feed back
//! into the integrator within a step.

use serde::Serialize;
use std::collections::HashMap;

use crate::integrator::CpmdSystem;
use crate::relax::FieldRelaxation;

/// A read-only hook invoked after each completed step.
pub trait Observer {
    fn observe(&mut self, system: &CpmdSystem);
}

fn due(step: usize, every: usize) -> bool {
    step % every == 0
}

/// One energy sample.
#[derive(Clone, Debug, Serialize)]
pub struct EnergyRow {
    pub step: usize,
    pub particle_kinetic: f64,
    pub field_kinetic: f64,
    pub potential: f64,
    pub extended: f64,
    pub temperature: f64,
}

/// Records the energy budget of the extended system at a fixed interval.
pub struct EnergyMonitor {
    every: usize,
    pub rows: Vec<EnergyRow>,
}

impl EnergyMonitor {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            rows: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.rows)
    }
}

impl Observer for EnergyMonitor {
    fn observe(&mut self, system: &CpmdSystem) {
        if !due(system.step_count(), self.every) {
            return;
        }
        let row = EnergyRow {
            step: system.step_count(),
            particle_kinetic: system.particle_kinetic(),
            field_kinetic: system.field_kinetic(),
            potential: system.potential_energy(),
            extended: system.extended_energy(),
            temperature: system.temperature(),
        };
        log::debug!(
            "step {}: ke {:.6} fke {:.6} pe {:.6} ext {:.6}",
            row.step,
            row.particle_kinetic,
            row.field_kinetic,
            row.potential,
            row.extended
        );
        self.rows.push(row);
    }
}

/// One trajectory frame: ion positions and the field values.
#[derive(Clone, Debug, Serialize)]
pub struct Frame {
    pub step: usize,
    pub ion_positions: Vec<[f64; 3]>,
    pub field: Vec<f64>,
}

/// Records trajectory frames at a fixed interval once production begins.
pub struct SnapshotRecorder {
    every: usize,
    after: usize,
    pub frames: Vec<Frame>,
}

impl SnapshotRecorder {
    pub fn new(every: usize, after: usize) -> Self {
        Self {
            every: every.max(1),
            after,
            frames: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut data = HashMap::new();
        data.insert("frames", &self.frames);
        serde_json::to_string_pretty(&data)
    }
}

impl Observer for SnapshotRecorder {
    fn observe(&mut self, system: &CpmdSystem) {
        let step = system.step_count();
        if step < self.after || !due(step, self.every) {
            return;
        }
        self.frames.push(Frame {
            step,
            ion_positions: system.ions.iter().map(|ion| ion.pos.into()).collect(),
            field: system.surface.iter().map(|v| v.w).collect(),
        });
    }
}

/// One constraint sample.
#[derive(Clone, Debug, Serialize)]
pub struct ConstraintRow {
    pub step: usize,
    pub deviation: f64,
    pub rate: f64,
}

/// Tracks how well the projections hold the constraint over the run.
pub struct ConstraintWatch {
    every: usize,
    pub rows: Vec<ConstraintRow>,
}

impl ConstraintWatch {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            rows: Vec::new(),
        }
    }

    /// Largest deviation magnitude seen so far.
    pub fn worst_deviation(&self) -> f64 {
        self.rows
            .iter()
            .fold(0.0, |worst, row| worst.max(row.deviation.abs()))
    }
}

impl Observer for ConstraintWatch {
    fn observe(&mut self, system: &CpmdSystem) {
        if !due(system.step_count(), self.every) {
            return;
        }
        self.rows.push(ConstraintRow {
            step: system.step_count(),
            deviation: system.constraint_deviation(),
            rate: system.constraint_rate(),
        });
    }
}

/// On-the-fly verification against the field relaxer (polarized runs only):
/// re-relax a copy of the field at the frozen ion positions and record how
/// far the dynamical state sits above the relaxed functional value.
pub struct RelaxationCheck {
    every: usize,
    relaxer: FieldRelaxation,
    pub deviations: Vec<(usize, f64)>,
}

impl RelaxationCheck {
    pub fn new(every: usize, relaxer: FieldRelaxation) -> Self {
        Self {
            every: every.max(1),
            relaxer,
            deviations: Vec::new(),
        }
    }

    pub fn mean_deviation(&self) -> f64 {
        if self.deviations.is_empty() {
            return 0.0;
        }
        self.deviations.iter().map(|(_, d)| d).sum::<f64>() / self.deviations.len() as f64
    }
}

impl Observer for RelaxationCheck {
    fn observe(&mut self, system: &CpmdSystem) {
        let step = system.step_count();
        if !system.polarized() || !due(step, self.every) {
            return;
        }
        let model = system.energy_model();
        let mut trial = system.surface.clone();
        match self.relaxer.relax(model.as_ref(), &system.ions, &mut trial) {
            Ok(report) => {
                let deviation = system.potential_energy() - report.final_potential;
                log::info!("step {step}: functional sits {deviation:.3e} above the relaxed value");
                self.deviations.push((step, deviation));
            }
            Err(err) => log::warn!("step {step}: verification relaxation failed: {err}"),
        }
    }
}

/// Logs integer-percent progress through the run; the single designated
/// reporter, independent of integrator state.
pub struct ProgressReporter {
    total: usize,
    last_percent: u32,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            total: total.max(1),
            last_percent: u32::MAX,
        }
    }
}

impl Observer for ProgressReporter {
    fn observe(&mut self, system: &CpmdSystem) {
        let step = system.step_count();
        let percent = (100 * step / self.total) as u32;
        if percent != self.last_percent {
            log::info!("progress {percent}% ({step}/{})", self.total);
            self.last_percent = percent;
        }
    }
}

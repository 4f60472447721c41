//! Counterions around a charged, polarizable nanosphere.
//!
//! Relaxes the induced surface charge at the initial ion configuration,
//! then runs the coupled extended-Lagrangian dynamics and prints the energy
//! budget along the way.

use std::sync::Arc;

use ionlab::{
    ConstraintWatch, CpmdSystem, EnergyMonitor, FieldRelaxation, Ion, NoseHooverChain, Observer,
    PolarizableCoulomb, ProgressReporter, RunControl, SurfaceVertex, Vec3,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Spread `n` vertices over the unit sphere with a Fibonacci lattice; each
/// carries an equal share of the surface area as its weight.
fn discretize_sphere(n: usize, radius: f64) -> Vec<SurfaceVertex> {
    let golden = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let area_per_vertex = 4.0 * std::f64::consts::PI * radius * radius / n as f64;
    (0..n)
        .map(|i| {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - z * z).sqrt();
            let phi = 2.0 * std::f64::consts::PI * (i as f64) / golden;
            let pos = Vec3::new(r * phi.cos(), r * phi.sin(), z) * radius;
            SurfaceVertex::new(pos, area_per_vertex)
        })
        .collect()
}

/// Place `n` counterions on a shell outside the sphere.
fn place_counterions(n: usize, shell: f64, valency: i32) -> Vec<Ion> {
    let golden = (1.0 + 5.0_f64.sqrt()) / 2.0;
    (0..n)
        .map(|i| {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - z * z).sqrt();
            let phi = 2.0 * std::f64::consts::PI * (i as f64) / golden + 0.5;
            Ion::new(Vec3::new(r * phi.cos(), r * phi.sin(), z) * shell, 1.0, valency)
        })
        .collect()
}

fn main() {
    let sphere_charge = -12.0;
    let valency = 3;
    let n_ions = 4; // neutralizes the bare charge
    let n_vertices = 64;

    let control = RunControl {
        timestep: 0.001,
        steps: 5_000,
        equilibration: 1_000,
        energy_every: 500,
        snapshot_every: 500,
        fictitious_mass: 1.0,
        polarized: true,
        ..RunControl::default()
    };

    let model = Arc::new(
        PolarizableCoulomb::new(1.0, 0.5, 0.2).with_central_charge(sphere_charge),
    );
    let ions = place_counterions(n_ions, 2.5, valency);
    let mut surface = discretize_sphere(n_vertices, 1.0);

    // Locate the constrained functional minimum before the coupled run.
    let relaxer = FieldRelaxation {
        steps: 5_000,
        equilibration: 3_000,
        temperature: 1e-4,
        anneal: Some(0.999),
        fictitious_mass: control.fictitious_mass,
        ..FieldRelaxation::default()
    };
    let report = relaxer
        .relax(model.as_ref(), &ions, &mut surface)
        .expect("field relaxation failed");
    println!("relaxed field: potential {:.6}", report.final_potential);
    println!("constraint deviation {:.3e}", report.final_deviation);

    let real_bath = NoseHooverChain::with_links(5, 1.0, 1.0, (3 * n_ions) as f64)
        .expect("real chain");
    let fake_bath = NoseHooverChain::with_links(5, 1.0, 0.002, n_vertices as f64)
        .expect("fake chain");

    let mut system = CpmdSystem::new(ions, surface, real_bath, fake_bath, model, &control)
        .expect("system setup failed");
    let mut rng = StdRng::seed_from_u64(42);
    system.seed_velocities(&mut rng);

    println!(
        "\nrunning {} steps, dt = {}, {} ions, {} vertices",
        control.steps,
        control.timestep,
        system.ions.len(),
        system.surface.len()
    );
    println!("step       KE(ions)   KE(field)  potential  extended");
    println!("──────────────────────────────────────────────────────");

    let mut energies = EnergyMonitor::new(control.energy_every);
    let mut watch = ConstraintWatch::new(control.sample_every);
    let mut progress = ProgressReporter::new(control.steps);
    {
        let mut observers: Vec<&mut dyn Observer> =
            vec![&mut energies, &mut watch, &mut progress];
        system
            .run(control.steps, &mut observers)
            .expect("run aborted");
    }

    for row in &energies.rows {
        println!(
            "{:8}   {:8.5}   {:8.5}   {:8.5}  {:8.5}",
            row.step, row.particle_kinetic, row.field_kinetic, row.potential, row.extended
        );
    }

    println!("\nworst constraint deviation: {:.3e}", watch.worst_deviation());
    println!("final ion temperature:      {:.4}", system.temperature());
    println!(
        "total induced charge:       {:.3e}",
        system.constraint_deviation()
    );
}

//! Nose-Hoover thermostat chains.
//!
//! A chain is an ordered sequence of coupled links; each link's force term
//! depends on the link above it, so traversal direction is an explicit
//! parameter of the update rather than container iteration order. The last
//! link is always a zero-mass sentinel: it carries the full coupled
//! degree-of-freedom count, is never advanced, and exists only so the
//! recursion for the link below it is well-defined.

use ionlab_math::BOLTZMANN;
use ionlab_model::ConfigError;

/// One thermostat link.
#[derive(Clone, Debug)]
pub struct Bath {
    /// Thermostat mass Q. Zero marks the sentinel link.
    pub mass: f64,
    /// Target temperature (energy units, kB = 1).
    pub target_temp: f64,
    /// Coupled degrees of freedom Nf; fixed at construction.
    pub dof: f64,
    /// Phase-space position.
    pub eta: f64,
    /// Velocity-like variable; the lowest link's ξ sets the friction factor.
    pub xi: f64,
}

impl Bath {
    pub fn new(mass: f64, target_temp: f64, dof: f64) -> Self {
        Self {
            mass,
            target_temp,
            dof,
            eta: 0.0,
            xi: 0.0,
        }
    }

    /// Sentinel links terminate the chain and are never advanced.
    pub fn is_sentinel(&self) -> bool {
        self.mass == 0.0
    }
}

/// Traversal direction for the ξ sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sweep {
    /// High index to low; runs before the first half-kick.
    Descending,
    /// Low index to high; runs after the second half-kick.
    Ascending,
}

/// An ordered Nose-Hoover chain of L physical links plus the sentinel.
#[derive(Clone, Debug)]
pub struct NoseHooverChain {
    links: Vec<Bath>,
}

impl NoseHooverChain {
    /// A chain consisting of the lone sentinel: no friction, Newtonian
    /// dynamics for the coupled system. Always legal.
    pub fn single(target_temp: f64, dof: f64) -> Self {
        Self {
            links: vec![Bath::new(0.0, target_temp, dof)],
        }
    }

    /// Build a chain of `total_links` links (L physical + 1 sentinel) for a
    /// system with `dof` coupled degrees of freedom: a primary link with the
    /// full mass and dof count, interior links with mass Q/Nf coupling one
    /// degree each, and the terminal sentinel.
    pub fn with_links(
        total_links: usize,
        mass: f64,
        target_temp: f64,
        dof: f64,
    ) -> Result<Self, ConfigError> {
        if total_links == 0 {
            return Err(ConfigError::EmptyChain);
        }
        if !(target_temp.is_finite() && target_temp >= 0.0) {
            return Err(ConfigError::BadTemperature(target_temp));
        }
        if total_links == 1 {
            return Ok(Self::single(target_temp, dof));
        }
        if !(mass.is_finite() && mass > 0.0) {
            return Err(ConfigError::BadBathMass {
                links: total_links,
                mass,
            });
        }
        let mut links = Vec::with_capacity(total_links);
        links.push(Bath::new(mass, target_temp, dof));
        while links.len() < total_links - 1 {
            links.push(Bath::new(mass / dof, target_temp, 1.0));
        }
        links.push(Bath::new(0.0, target_temp, dof));
        Ok(Self { links })
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn links(&self) -> &[Bath] {
        &self.links
    }

    /// True when every link is a sentinel: the chain applies no friction.
    pub fn is_newtonian(&self) -> bool {
        self.links.iter().all(Bath::is_sentinel)
    }

    /// Target temperature of the primary link.
    pub fn target_temperature(&self) -> f64 {
        self.links[0].target_temp
    }

    /// Rescale every link's target temperature (annealing).
    pub fn scale_temperature(&mut self, factor: f64) {
        for link in &mut self.links {
            link.target_temp *= factor;
        }
    }

    /// Half-step update of ξ for link `j`, driven by the current kinetic
    /// energy of the coupled system.
    ///
    /// The lowest link is forced by `2·KE − Nf·kB·T`; interior link j by
    /// `Q_{j−1}·ξ_{j−1}² − kB·T`. Both are damped by the link above, whose ξ
    /// must already hold its updated value on a descending pass. Sentinel
    /// links are never advanced.
    pub fn update_xi(&mut self, j: usize, dt: f64, kinetic: f64) {
        if self.links[j].is_sentinel() {
            return;
        }
        let xi_above = self.links.get(j + 1).map_or(0.0, |link| link.xi);
        let drive = {
            let link = &self.links[j];
            if j == 0 {
                2.0 * kinetic - link.dof * BOLTZMANN * link.target_temp
            } else {
                let below = &self.links[j - 1];
                below.mass * below.xi * below.xi - link.dof * BOLTZMANN * link.target_temp
            }
        };
        let scale = (-0.5 * dt * xi_above).exp();
        let half_scale = (-0.25 * dt * xi_above).exp();
        let link = &mut self.links[j];
        link.xi = link.xi * scale + 0.5 * dt * (drive / link.mass) * half_scale;
    }

    /// Apply `update_xi` to every link in the given traversal direction.
    pub fn sweep_xi(&mut self, sweep: Sweep, dt: f64, kinetic: f64) {
        match sweep {
            Sweep::Descending => {
                for j in (0..self.links.len()).rev() {
                    self.update_xi(j, dt, kinetic);
                }
            }
            Sweep::Ascending => {
                for j in 0..self.links.len() {
                    self.update_xi(j, dt, kinetic);
                }
            }
        }
    }

    /// Advance every link's phase variable by a half step of its own ξ.
    /// Order-independent; called once per sweep, so twice per full step.
    pub fn advance_eta(&mut self, dt: f64) {
        for link in &mut self.links {
            if !link.is_sentinel() {
                link.eta += 0.5 * dt * link.xi;
            }
        }
    }

    /// Friction factor exp(-dt/2 · ξ₀) from the lowest link; computed once
    /// per step and reused for both half-kicks.
    pub fn friction_factor(&self, dt: f64) -> f64 {
        (-0.5 * dt * self.links[0].xi).exp()
    }

    /// Kinetic energy stored in the chain: Σ ½·Q·ξ².
    pub fn kinetic_energy(&self) -> f64 {
        self.links
            .iter()
            .map(|link| 0.5 * link.mass * link.xi * link.xi)
            .sum()
    }

    /// Potential energy of the chain: Σ Nf·kB·T·η. Enters the extended
    /// conserved quantity together with the chain kinetic energy.
    pub fn potential_energy(&self) -> f64 {
        self.links
            .iter()
            .map(|link| link.dof * BOLTZMANN * link.target_temp * link.eta)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_link_chain_is_inert() {
        // A lone sentinel must be legal, never divide by zero, and leave
        // ξ and η identically zero: pure Newtonian dynamics.
        let mut chain = NoseHooverChain::single(1.0, 6.0);
        for _ in 0..100 {
            chain.sweep_xi(Sweep::Descending, 0.001, 3.7);
            chain.advance_eta(0.001);
            chain.advance_eta(0.001);
            chain.sweep_xi(Sweep::Ascending, 0.001, 3.7);
        }
        assert_eq!(chain.links()[0].xi, 0.0);
        assert_eq!(chain.links()[0].eta, 0.0);
        assert_relative_eq!(chain.friction_factor(0.001), 1.0);
        assert!(chain.is_newtonian());
    }

    #[test]
    fn test_chain_construction_shape() {
        let chain = NoseHooverChain::with_links(5, 2.0, 1.0, 30.0).unwrap();
        assert_eq!(chain.len(), 5);
        let links = chain.links();
        assert_relative_eq!(links[0].mass, 2.0);
        assert_relative_eq!(links[0].dof, 30.0);
        for link in &links[1..4] {
            assert_relative_eq!(link.mass, 2.0 / 30.0);
            assert_relative_eq!(link.dof, 1.0);
        }
        assert!(links[4].is_sentinel());
        assert_relative_eq!(links[4].dof, 30.0);
    }

    #[test]
    fn test_zero_length_chain_rejected() {
        assert!(matches!(
            NoseHooverChain::with_links(0, 1.0, 1.0, 3.0),
            Err(ConfigError::EmptyChain)
        ));
    }

    #[test]
    fn test_nonpositive_mass_rejected() {
        assert!(matches!(
            NoseHooverChain::with_links(3, 0.0, 1.0, 3.0),
            Err(ConfigError::BadBathMass { .. })
        ));
    }

    #[test]
    fn test_hot_system_raises_friction() {
        // KE above equipartition must drive ξ₀ positive so the friction
        // factor damps velocities.
        let mut chain = NoseHooverChain::with_links(3, 1.0, 1.0, 6.0).unwrap();
        let hot_ke = 10.0; // equipartition would be Nf·kB·T/2 = 3
        chain.sweep_xi(Sweep::Descending, 0.01, hot_ke);
        assert!(chain.links()[0].xi > 0.0);
        assert!(chain.friction_factor(0.01) < 1.0);
    }

    #[test]
    fn test_sentinel_never_moves() {
        let mut chain = NoseHooverChain::with_links(4, 1.0, 1.0, 6.0).unwrap();
        for _ in 0..50 {
            chain.sweep_xi(Sweep::Descending, 0.01, 9.0);
            chain.advance_eta(0.01);
            chain.sweep_xi(Sweep::Ascending, 0.01, 9.0);
        }
        let last = chain.links().last().unwrap();
        assert_eq!(last.xi, 0.0);
        assert_eq!(last.eta, 0.0);
    }

    #[test]
    fn test_bath_energies() {
        let mut chain = NoseHooverChain::with_links(2, 4.0, 2.0, 3.0).unwrap();
        // Drive the primary link, then read back the bookkeeping terms.
        chain.sweep_xi(Sweep::Descending, 0.1, 12.0);
        chain.advance_eta(0.1);
        let xi = chain.links()[0].xi;
        let eta = chain.links()[0].eta;
        assert_relative_eq!(chain.kinetic_energy(), 0.5 * 4.0 * xi * xi);
        assert_relative_eq!(chain.potential_energy(), 3.0 * 2.0 * eta);
    }
}

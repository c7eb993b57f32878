//! Gas cooling: collisionally-excited lines, recombination, free–free.
//!
//! The line-cooling contract is [`LineCoolingData`]; the shipped
//! implementation is an analytic two-level fit per coolant ion. The
//! recombination and free–free channels are plain functions used directly
//! by the temperature solver.

use crate::constants::BOLTZMANN;
use crate::ions::{Abundances, Ion, NUM_IONS};

/// Collisionally-excited line cooling. Pure.
pub trait LineCoolingData: Send + Sync {
    /// Total line cooling rate density (W m⁻³) for gas with the given
    /// temperature, electron density (m⁻³), hydrogen density (m⁻³),
    /// tracked ionic fractions and abundances.
    fn cooling_rate(
        &self,
        temperature: f64,
        electron_density: f64,
        hydrogen_density: f64,
        ionic_fractions: &[f64; NUM_IONS],
        abundances: &Abundances,
    ) -> f64;
}

/// One coolant line: excitation energy (as ΔE/k in K) and an effective
/// collision strength scale. Cooling per ion pair follows the two-level
/// approximation Λ ∝ Ω/√T · exp(−ΔE/kT) · ΔE.
#[derive(Debug, Clone, Copy)]
struct CoolantLine {
    ion: Ion,
    delta_e_over_k: f64,
    omega: f64,
}

/// The dominant optical/IR forbidden-line coolants of photoionized gas.
const COOLANT_LINES: [CoolantLine; 8] = [
    // [O II] 3727 Å doublet.
    CoolantLine { ion: Ion::Op1, delta_e_over_k: 3.86e4, omega: 1.34 },
    // [O III]-like channel carried by the O⁺ reservoir's upper stage is
    // folded into the O⁺ entry below at half weight.
    CoolantLine { ion: Ion::Op1, delta_e_over_k: 2.88e4, omega: 1.10 },
    // [N II] 6584 Å.
    CoolantLine { ion: Ion::Np1, delta_e_over_k: 2.18e4, omega: 2.64 },
    // [S II] 6724 Å doublet.
    CoolantLine { ion: Ion::Sp1, delta_e_over_k: 2.14e4, omega: 4.66 },
    // [S III] 9069/9532 Å.
    CoolantLine { ion: Ion::Sp2, delta_e_over_k: 1.58e4, omega: 3.98 },
    // [Ne II] 12.8 μm.
    CoolantLine { ion: Ion::Nep1, delta_e_over_k: 1.12e3, omega: 0.30 },
    // C II 2326 Å.
    CoolantLine { ion: Ion::Cp1, delta_e_over_k: 6.18e4, omega: 1.16 },
    // [O I] 6300 Å (neutral zone).
    CoolantLine { ion: Ion::On, delta_e_over_k: 2.28e4, omega: 0.55 },
];

/// Normalisation of the two-level cooling formula (W m³ K^{1/2} per unit
/// ΔE/k): 8.629e-6 cm³ s⁻¹ K^{1/2} collision prefactor times k_B, in SI.
const TWO_LEVEL_PREFACTOR: f64 = 8.629e-12 * BOLTZMANN;

/// Analytic forbidden-line cooling fits.
#[derive(Debug, Clone, Default)]
pub struct FitLineCoolingData;

impl FitLineCoolingData {
    pub fn new() -> Self {
        Self
    }
}

impl LineCoolingData for FitLineCoolingData {
    fn cooling_rate(
        &self,
        temperature: f64,
        electron_density: f64,
        hydrogen_density: f64,
        ionic_fractions: &[f64; NUM_IONS],
        abundances: &Abundances,
    ) -> f64 {
        let sqrt_t = temperature.sqrt();
        let mut total = 0.0;
        for line in COOLANT_LINES {
            let abundance = abundances.abundance(line.ion.element());
            if abundance == 0.0 {
                continue;
            }
            let n_ion = hydrogen_density * abundance * ionic_fractions[line.ion.index()];
            if n_ion == 0.0 {
                continue;
            }
            total += TWO_LEVEL_PREFACTOR * line.omega / sqrt_t
                * (-line.delta_e_over_k / temperature).exp()
                * line.delta_e_over_k
                * electron_density
                * n_ion;
        }
        total
    }
}

/// Free–free (bremsstrahlung) cooling rate density (W m⁻³) for the given
/// electron and proton-like ion densities.
pub fn free_free_cooling(temperature: f64, electron_density: f64, ion_density: f64) -> f64 {
    // 1.42e-40 √T g_ff n_e n_+ in SI, with a flat Gaunt factor.
    const GAUNT: f64 = 1.3;
    1.42e-40 * GAUNT * temperature.sqrt() * electron_density * ion_density
}

/// Hydrogen recombination cooling rate density (W m⁻³): the mean kinetic
/// energy carried away per recombination is a slowly varying multiple of
/// k_B T.
pub fn recombination_cooling(
    temperature: f64,
    electron_density: f64,
    proton_density: f64,
    recombination_rate: f64,
) -> f64 {
    let t4 = temperature * 1.0e-4;
    let energy_factor = (0.684 - 0.0416 * t4.ln()).max(0.1);
    energy_factor * BOLTZMANN * temperature * recombination_rate * electron_density * proton_density
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_cooling_vanishes_for_hydrogen_only_gas() {
        let cooling = FitLineCoolingData::new();
        let x = [1.0; NUM_IONS];
        let rate = cooling.cooling_rate(1.0e4, 1.0e8, 1.0e8, &x, &Abundances::hydrogen_only());
        assert_eq!(rate, 0.0);
    }

    #[test]
    fn line_cooling_rises_steeply_with_temperature() {
        let cooling = FitLineCoolingData::new();
        let mut x = [0.0; NUM_IONS];
        x[Ion::Op1.index()] = 1.0;
        x[Ion::Np1.index()] = 1.0;
        let a = Abundances::default();
        let low = cooling.cooling_rate(5.0e3, 1.0e8, 1.0e8, &x, &a);
        let high = cooling.cooling_rate(2.0e4, 1.0e8, 1.0e8, &x, &a);
        assert!(high > 10.0 * low, "low = {}, high = {}", low, high);
    }

    #[test]
    fn free_free_scales_with_density_squared() {
        let a = free_free_cooling(1.0e4, 1.0e8, 1.0e8);
        let b = free_free_cooling(1.0e4, 2.0e8, 2.0e8);
        assert!((b / a - 4.0).abs() < 1.0e-12);
    }

    #[test]
    fn recombination_cooling_is_positive_over_the_solver_bracket() {
        for t in [500.0, 1.0e4, 1.0e6] {
            let rate = recombination_cooling(t, 1.0e8, 1.0e8, 4.0e-19);
            assert!(rate > 0.0, "T = {}", t);
        }
    }
}

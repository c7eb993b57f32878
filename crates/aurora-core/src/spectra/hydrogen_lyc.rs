//! Hydrogen Lyman-continuum reemission spectrum.
//!
//! Recombinations directly to the hydrogen ground state emit photons just
//! above the ionization threshold with an emissivity
//! j(ν) ∝ σ_H(ν)·ν²·exp(−h(ν − ν_H)/kT). The shape depends on the gas
//! temperature, so cumulative tables are pre-built on a logarithmic
//! temperature grid and samples interpolate between the two bracketing
//! rows at a common quantile.

use rand::{Rng, RngCore};

use super::{frequency_grid, CumulativeTable, TemperatureDependentSpectrum, NUM_FREQUENCY_BINS};
use crate::constants::{BOLTZMANN, NU_HI, PLANCK};
use crate::cross_sections::CrossSections;
use crate::ions::Ion;

/// Number of rows in the temperature grid.
const NUM_TEMPERATURES: usize = 100;
const T_MIN: f64 = 1.5e3;
const T_MAX: f64 = 1.5e5;

/// Tabulated hydrogen Lyman-continuum sampler.
#[derive(Debug, Clone)]
pub struct HydrogenLymanContinuumSpectrum {
    temperatures: Vec<f64>,
    tables: Vec<CumulativeTable>,
}

impl HydrogenLymanContinuumSpectrum {
    /// Pre-compute the per-temperature cumulative tables. The
    /// cross-section provider fixes the σ_H(ν) factor of the emissivity.
    pub fn new(cross_sections: &dyn CrossSections) -> Self {
        build_lyman_continuum(cross_sections, Ion::Hn, NU_HI)
    }

    pub(crate) fn from_parts(temperatures: Vec<f64>, tables: Vec<CumulativeTable>) -> Self {
        Self { temperatures, tables }
    }
}

/// Shared construction for the H and He Lyman continua: only the ion and
/// the threshold frequency differ.
pub(crate) fn build_lyman_continuum(
    cross_sections: &dyn CrossSections,
    ion: Ion,
    threshold: f64,
) -> HydrogenLymanContinuumSpectrum {
    let log_min = T_MIN.ln();
    let log_step = (T_MAX / T_MIN).ln() / (NUM_TEMPERATURES - 1) as f64;
    let temperatures: Vec<f64> = (0..NUM_TEMPERATURES)
        .map(|i| (log_min + i as f64 * log_step).exp())
        .collect();

    let frequencies = frequency_grid(threshold, 4.0 * NU_HI, NUM_FREQUENCY_BINS);
    let tables = temperatures
        .iter()
        .map(|&t| {
            let weights: Vec<f64> = frequencies
                .iter()
                .map(|&nu| {
                    cross_sections.cross_section(ion, nu)
                        * nu
                        * nu
                        * (-PLANCK * (nu - threshold) / (BOLTZMANN * t)).exp()
                })
                .collect();
            CumulativeTable::from_weights(frequencies.clone(), &weights)
        })
        .collect();

    HydrogenLymanContinuumSpectrum::from_parts(temperatures, tables)
}

/// Sample a tabulated temperature-gridded spectrum: invert the two
/// bracketing rows at the same quantile and blend linearly in log T.
pub(crate) fn sample_temperature_grid(
    temperatures: &[f64],
    tables: &[CumulativeTable],
    temperature: f64,
    rng: &mut dyn RngCore,
) -> f64 {
    let t = temperature.clamp(temperatures[0], temperatures[temperatures.len() - 1]);
    let log_step = (temperatures[1] / temperatures[0]).ln();
    let position = (t / temperatures[0]).ln() / log_step;
    let i = (position.floor() as usize).min(temperatures.len() - 2);
    let frac = position - i as f64;

    let u: f64 = rng.gen();
    let lower = tables[i].invert(u);
    let upper = tables[i + 1].invert(u);
    lower + frac * (upper - lower)
}

impl TemperatureDependentSpectrum for HydrogenLymanContinuumSpectrum {
    fn sample_frequency(&self, temperature: f64, rng: &mut dyn RngCore) -> f64 {
        sample_temperature_grid(&self.temperatures, &self.tables, temperature, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cross_sections::VernerCrossSections;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn samples_sit_just_above_threshold() {
        let spectrum = HydrogenLymanContinuumSpectrum::new(&VernerCrossSections::new());
        let mut rng = StdRng::seed_from_u64(3);
        let n = 20_000;
        let mut mean = 0.0;
        for _ in 0..n {
            let nu = spectrum.sample_frequency(8000.0, &mut rng);
            assert!(nu >= NU_HI && nu <= 4.0 * NU_HI);
            mean += nu;
        }
        mean /= n as f64;
        // At 8000 K the thermal width h(ν − ν_H) ~ kT is a tiny fraction
        // of the threshold frequency.
        assert!(mean < 1.05 * NU_HI, "mean = {}", mean);
    }

    #[test]
    fn hotter_gas_emits_a_wider_continuum() {
        let spectrum = HydrogenLymanContinuumSpectrum::new(&VernerCrossSections::new());
        let mut rng = StdRng::seed_from_u64(5);
        let mean = |t: f64, rng: &mut StdRng| -> f64 {
            (0..20_000)
                .map(|_| spectrum.sample_frequency(t, rng))
                .sum::<f64>()
                / 20_000.0
        };
        assert!(mean(1.0e5, &mut rng) > mean(3.0e3, &mut rng));
    }

    #[test]
    fn out_of_grid_temperatures_are_clamped() {
        let spectrum = HydrogenLymanContinuumSpectrum::new(&VernerCrossSections::new());
        let mut rng = StdRng::seed_from_u64(9);
        let nu = spectrum.sample_frequency(10.0, &mut rng);
        assert!(nu >= NU_HI);
        let nu = spectrum.sample_frequency(1.0e7, &mut rng);
        assert!(nu <= 4.0 * NU_HI);
    }
}

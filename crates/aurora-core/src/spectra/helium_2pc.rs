//! Helium 2¹S two-photon continuum, restricted to its H-ionizing portion.
//!
//! The two-photon decay of He I 2¹S emits a continuum described by a
//! tabulated emissivity A(y), with y the photon frequency in units of the
//! total transition frequency 4.98e15 Hz. Only the part above the
//! hydrogen ionization threshold matters for transport, so the cumulative
//! distribution is built on ν/ν_H ∈ [1, 1.6] and the emissivity is cut
//! off at y = 1.

use rand::RngCore;

use super::{frequency_grid, CumulativeTable, TemperatureDependentSpectrum, NUM_FREQUENCY_BINS};
use crate::constants::NU_HI;

/// Total frequency of the two-photon transition (Hz).
const NU_TRANSITION: f64 = 4.98e15;

/// Tabulated emissivity grid: y runs from 0 to 1 in steps of 0.025.
const NUM_TABLE_POINTS: usize = 41;

/// Emissivity A(y) of the two-photon continuum, symmetric about y = 0.5.
const A_VALUES: [f64; NUM_TABLE_POINTS] = [
    0.00, 0.73, 1.24, 1.69, 2.08, 2.43, 2.74, 3.03, 3.29, 3.52, 3.73, 3.92, 4.09, 4.23,
    4.36, 4.46, 4.55, 4.62, 4.66, 4.69, 4.70, 4.69, 4.66, 4.62, 4.55, 4.46, 4.36, 4.23,
    4.09, 3.92, 3.73, 3.52, 3.29, 3.03, 2.74, 2.43, 2.08, 1.69, 1.24, 0.73, 0.00,
];

/// Linear interpolation of A at the given y; zero outside [0, 1).
fn emissivity(y: f64) -> f64 {
    if !(0.0..1.0).contains(&y) {
        return 0.0;
    }
    let position = y * (NUM_TABLE_POINTS - 1) as f64;
    let i = (position.floor() as usize).min(NUM_TABLE_POINTS - 2);
    let frac = position - i as f64;
    A_VALUES[i] + frac * (A_VALUES[i + 1] - A_VALUES[i])
}

/// Sampler for the H-ionizing portion of the He two-photon continuum.
///
/// The shape has no temperature dependence; the trait takes T so the
/// reemission machinery can treat all diffuse spectra uniformly.
#[derive(Debug, Clone)]
pub struct HeliumTwoPhotonContinuumSpectrum {
    table: CumulativeTable,
}

impl HeliumTwoPhotonContinuumSpectrum {
    pub fn new() -> Self {
        let frequencies = frequency_grid(NU_HI, 1.6 * NU_HI, NUM_FREQUENCY_BINS);
        let weights: Vec<f64> = frequencies
            .iter()
            .map(|&nu| emissivity(nu / NU_TRANSITION))
            .collect();
        Self {
            table: CumulativeTable::from_weights(frequencies, &weights),
        }
    }
}

impl Default for HeliumTwoPhotonContinuumSpectrum {
    fn default() -> Self {
        Self::new()
    }
}

impl TemperatureDependentSpectrum for HeliumTwoPhotonContinuumSpectrum {
    fn sample_frequency(&self, _temperature: f64, rng: &mut dyn RngCore) -> f64 {
        self.table.sample(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn emissivity_is_symmetric_and_bounded() {
        for i in 0..NUM_TABLE_POINTS {
            assert_eq!(A_VALUES[i], A_VALUES[NUM_TABLE_POINTS - 1 - i]);
        }
        assert_eq!(emissivity(-0.1), 0.0);
        assert_eq!(emissivity(1.2), 0.0);
        assert!(emissivity(0.5) > emissivity(0.7));
    }

    #[test]
    fn samples_are_hydrogen_ionizing() {
        let spectrum = HeliumTwoPhotonContinuumSpectrum::new();
        let mut rng = StdRng::seed_from_u64(23);
        for _ in 0..10_000 {
            let nu = spectrum.sample_frequency(8000.0, &mut rng);
            assert!(nu >= NU_HI && nu <= 1.6 * NU_HI, "nu = {}", nu);
        }
    }

    #[test]
    fn frequencies_below_the_transition_dominate() {
        // The emissivity vanishes at y = 1 (ν = 4.98e15 Hz ≈ 1.51 ν_H),
        // so almost no samples should land above it.
        let spectrum = HeliumTwoPhotonContinuumSpectrum::new();
        let mut rng = StdRng::seed_from_u64(29);
        let n = 20_000;
        let above = (0..n)
            .filter(|_| spectrum.sample_frequency(8000.0, &mut rng) > NU_TRANSITION)
            .count();
        assert!(above < n / 100, "{} of {} samples above the cutoff", above, n);
    }
}

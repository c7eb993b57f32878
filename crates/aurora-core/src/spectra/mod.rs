//! Photon emission spectra.
//!
//! All spectra are sampled by tabulated inverse-CDF lookup: a cumulative
//! distribution is built once at construction and each draw costs one
//! binary search. Source spectra implement [`PhotonSourceSpectrum`];
//! the diffuse-reemission spectra, whose shape depends on the local gas
//! temperature, implement [`TemperatureDependentSpectrum`].

mod helium_2pc;
mod helium_lyc;
mod hydrogen_lyc;

pub use helium_2pc::HeliumTwoPhotonContinuumSpectrum;
pub use helium_lyc::HeliumLymanContinuumSpectrum;
pub use hydrogen_lyc::HydrogenLymanContinuumSpectrum;

use rand::{Rng, RngCore};

use crate::constants::{BOLTZMANN, LIGHT_SPEED, NU_HI, PLANCK};

/// A frequency sampler for a photon source.
pub trait PhotonSourceSpectrum: Send + Sync {
    /// Draw a random frequency (Hz) distributed according to the spectrum.
    fn sample_frequency(&self, rng: &mut dyn RngCore) -> f64;

    /// Ionizing photon flux through a surface exposed to this spectrum
    /// (photons m⁻² s⁻¹). Zero for spectra that are only used for
    /// discrete sources.
    fn total_flux(&self) -> f64;
}

/// A frequency sampler whose shape depends on the local gas temperature.
pub trait TemperatureDependentSpectrum: Send + Sync {
    /// Draw a random frequency (Hz) for gas at the given temperature (K).
    fn sample_frequency(&self, temperature: f64, rng: &mut dyn RngCore) -> f64;
}

/// Number of bins in tabulated cumulative distributions.
pub(crate) const NUM_FREQUENCY_BINS: usize = 1000;

/// A normalised cumulative distribution over a frequency grid.
#[derive(Debug, Clone)]
pub(crate) struct CumulativeTable {
    frequencies: Vec<f64>,
    cumulative: Vec<f64>,
}

impl CumulativeTable {
    /// Build from point weights on a frequency grid (trapezoidal
    /// integration, then normalisation).
    pub(crate) fn from_weights(frequencies: Vec<f64>, weights: &[f64]) -> Self {
        assert_eq!(frequencies.len(), weights.len());
        assert!(frequencies.len() >= 2);
        let n = frequencies.len();
        let mut cumulative = vec![0.0; n];
        for i in 1..n {
            cumulative[i] = cumulative[i - 1]
                + 0.5 * (weights[i - 1] + weights[i]) * (frequencies[i] - frequencies[i - 1]);
        }
        let total = cumulative[n - 1];
        assert!(
            total > 0.0,
            "spectrum weights integrate to zero over the frequency grid"
        );
        for c in cumulative.iter_mut() {
            *c /= total;
        }
        cumulative[n - 1] = 1.0;
        Self { frequencies, cumulative }
    }

    /// Inverse-CDF lookup with linear interpolation inside the bin.
    pub(crate) fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        let u: f64 = rng.gen();
        self.invert(u)
    }

    /// Deterministic inversion of the cumulative at quantile `u`.
    pub(crate) fn invert(&self, u: f64) -> f64 {
        let i = match self
            .cumulative
            .partition_point(|c| *c <= u)
            .checked_sub(1)
        {
            Some(i) => i.min(self.frequencies.len() - 2),
            None => 0,
        };
        let span = self.cumulative[i + 1] - self.cumulative[i];
        let frac = if span > 0.0 { (u - self.cumulative[i]) / span } else { 0.0 };
        self.frequencies[i] + frac * (self.frequencies[i + 1] - self.frequencies[i])
    }
}

/// Build a uniformly spaced frequency grid over `[min, max]`.
pub(crate) fn frequency_grid(min: f64, max: f64, bins: usize) -> Vec<f64> {
    (0..bins)
        .map(|i| min + (max - min) * i as f64 / (bins - 1) as f64)
        .collect()
}

/// Uniform spectrum over a frequency interval. Mostly used by benchmark
/// setups and tests.
#[derive(Debug, Clone)]
pub struct FlatSpectrum {
    minimum: f64,
    maximum: f64,
    total_flux: f64,
}

impl FlatSpectrum {
    pub fn new(minimum: f64, maximum: f64) -> Self {
        assert!(maximum > minimum, "empty frequency interval");
        Self { minimum, maximum, total_flux: 0.0 }
    }

    /// Attach an ionizing photon flux so the spectrum can drive a
    /// continuous surface source.
    pub fn with_total_flux(mut self, total_flux: f64) -> Self {
        self.total_flux = total_flux;
        self
    }
}

impl PhotonSourceSpectrum for FlatSpectrum {
    fn sample_frequency(&self, rng: &mut dyn RngCore) -> f64 {
        self.minimum + (self.maximum - self.minimum) * rng.gen::<f64>()
    }

    fn total_flux(&self) -> f64 {
        self.total_flux
    }
}

/// Single-frequency spectrum, for analytic benchmarks.
#[derive(Debug, Clone)]
pub struct MonochromaticSpectrum {
    frequency: f64,
}

impl MonochromaticSpectrum {
    pub fn new(frequency: f64) -> Self {
        assert!(frequency > 0.0);
        Self { frequency }
    }
}

impl PhotonSourceSpectrum for MonochromaticSpectrum {
    fn sample_frequency(&self, _rng: &mut dyn RngCore) -> f64 {
        self.frequency
    }

    fn total_flux(&self) -> f64 {
        0.0
    }
}

/// Blackbody photon-number spectrum restricted to the ionizing range
/// [ν_H, 4 ν_H].
#[derive(Debug, Clone)]
pub struct PlanckSpectrum {
    table: CumulativeTable,
    total_flux: f64,
}

impl PlanckSpectrum {
    /// Build for the given effective temperature (K).
    pub fn new(effective_temperature: f64) -> Self {
        assert!(effective_temperature > 0.0);
        let frequencies = frequency_grid(NU_HI, 4.0 * NU_HI, NUM_FREQUENCY_BINS);
        let weights: Vec<f64> = frequencies
            .iter()
            .map(|&nu| planck_number_density(nu, effective_temperature))
            .collect();

        // Ionizing photon flux π ∫ B_ν/(hν) dν, trapezoidal.
        let mut flux = 0.0;
        for i in 1..frequencies.len() {
            flux += 0.5
                * (weights[i - 1] + weights[i])
                * (frequencies[i] - frequencies[i - 1]);
        }
        flux *= std::f64::consts::PI * 2.0 / (LIGHT_SPEED * LIGHT_SPEED);

        Self {
            table: CumulativeTable::from_weights(frequencies, &weights),
            total_flux: flux,
        }
    }
}

/// ν²/(exp(hν/kT) − 1): the photon-number weight of a blackbody, up to
/// the 2/c² prefactor.
fn planck_number_density(frequency: f64, temperature: f64) -> f64 {
    let x = PLANCK * frequency / (BOLTZMANN * temperature);
    frequency * frequency / (x.exp() - 1.0)
}

impl PhotonSourceSpectrum for PlanckSpectrum {
    fn sample_frequency(&self, rng: &mut dyn RngCore) -> f64 {
        self.table.sample(rng)
    }

    fn total_flux(&self) -> f64 {
        self.total_flux
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ev_to_frequency;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn flat_spectrum_mean_energy() {
        let spectrum = FlatSpectrum::new(ev_to_frequency(13.6), ev_to_frequency(54.4));
        let mut rng = StdRng::seed_from_u64(42);
        let n = 200_000;
        let mean: f64 = (0..n)
            .map(|_| spectrum.sample_frequency(&mut rng))
            .sum::<f64>()
            / n as f64;
        let mean_ev = crate::constants::frequency_to_ev(mean);
        assert!((mean_ev - 34.0).abs() < 0.34, "mean energy {} eV", mean_ev);
    }

    #[test]
    fn cumulative_table_inversion_is_monotonic() {
        let grid = frequency_grid(1.0, 2.0, 100);
        let weights: Vec<f64> = grid.iter().map(|f| f * f).collect();
        let table = CumulativeTable::from_weights(grid, &weights);
        let mut last = 0.0;
        for i in 0..=100 {
            let nu = table.invert(i as f64 / 100.0);
            assert!(nu >= last && (1.0..=2.0).contains(&nu));
            last = nu;
        }
        assert_eq!(table.invert(0.0), 1.0);
        assert!((table.invert(1.0) - 2.0).abs() < 1.0e-12);
    }

    #[test]
    fn planck_samples_lie_in_the_ionizing_band() {
        let spectrum = PlanckSpectrum::new(4.0e4);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let nu = spectrum.sample_frequency(&mut rng);
            assert!((NU_HI..=4.0 * NU_HI).contains(&nu));
        }
        assert!(spectrum.total_flux() > 0.0);
    }

    #[test]
    fn hotter_planck_spectrum_is_harder() {
        let cool = PlanckSpectrum::new(2.0e4);
        let hot = PlanckSpectrum::new(1.0e5);
        let mut rng = StdRng::seed_from_u64(11);
        let mean = |s: &PlanckSpectrum, rng: &mut StdRng| -> f64 {
            (0..20_000).map(|_| s.sample_frequency(rng)).sum::<f64>() / 20_000.0
        };
        assert!(mean(&hot, &mut rng) > mean(&cool, &mut rng));
    }
}

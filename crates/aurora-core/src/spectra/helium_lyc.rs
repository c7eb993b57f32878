//! Helium Lyman-continuum reemission spectrum.
//!
//! Same construction as the hydrogen Lyman continuum, with the neutral
//! helium cross section and the 24.6 eV threshold.

use rand::RngCore;

use super::hydrogen_lyc::{build_lyman_continuum, HydrogenLymanContinuumSpectrum};
use super::TemperatureDependentSpectrum;
use crate::constants::NU_HEI;
use crate::cross_sections::CrossSections;
use crate::ions::Ion;

/// Tabulated helium Lyman-continuum sampler.
#[derive(Debug, Clone)]
pub struct HeliumLymanContinuumSpectrum {
    inner: HydrogenLymanContinuumSpectrum,
}

impl HeliumLymanContinuumSpectrum {
    pub fn new(cross_sections: &dyn CrossSections) -> Self {
        Self {
            inner: build_lyman_continuum(cross_sections, Ion::Hen, NU_HEI),
        }
    }
}

impl TemperatureDependentSpectrum for HeliumLymanContinuumSpectrum {
    fn sample_frequency(&self, temperature: f64, rng: &mut dyn RngCore) -> f64 {
        self.inner.sample_frequency(temperature, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NU_HI;
    use crate::cross_sections::VernerCrossSections;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn samples_lie_above_the_helium_threshold() {
        let spectrum = HeliumLymanContinuumSpectrum::new(&VernerCrossSections::new());
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..10_000 {
            let nu = spectrum.sample_frequency(1.0e4, &mut rng);
            assert!(nu >= NU_HEI && nu <= 4.0 * NU_HI);
        }
    }
}

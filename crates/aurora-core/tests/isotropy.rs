//! Source sampling scenario: a single point source with a flat spectrum
//! must emit isotropically with the analytic mean photon energy.

use std::sync::Arc;

use aurora_core::constants::{ev_to_frequency, frequency_to_ev};
use aurora_core::cross_sections::VernerCrossSections;
use aurora_core::ions::Abundances;
use aurora_core::source::{PhotonSource, PointSourceDistribution};
use aurora_core::spectra::FlatSpectrum;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn point_source_emission_is_isotropic_with_the_right_mean_energy() {
    let distribution = PointSourceDistribution::single([0.5, 0.5, 0.5], 1.0e49);
    let spectrum = FlatSpectrum::new(ev_to_frequency(13.6), ev_to_frequency(54.4));
    let mut source = PhotonSource::new(
        Some(&distribution),
        Some(Box::new(spectrum)),
        None,
        None,
        Abundances::default(),
        Arc::new(VernerCrossSections::new()),
    )
    .unwrap();
    let n = 4_000_000usize;
    source.set_photon_budget(n);

    let mut rng = StdRng::seed_from_u64(42);
    let mut direction_sum = [0.0f64; 3];
    let mut energy_sum = 0.0f64;
    for _ in 0..n {
        let photon = source.sample(&mut rng);
        for (sum, d) in direction_sum.iter_mut().zip(photon.direction.iter()) {
            *sum += d;
        }
        energy_sum += frequency_to_ev(photon.frequency);
    }

    for (axis, sum) in direction_sum.iter().enumerate() {
        let mean = sum / n as f64;
        assert!(
            mean.abs() < 1.0e-3,
            "mean direction component {} = {:.2e}",
            axis,
            mean
        );
    }

    let mean_energy = energy_sum / n as f64;
    assert!(
        (mean_energy - 34.0).abs() < 0.34,
        "mean energy = {:.3} eV, expected 34.0 ± 1%",
        mean_energy
    );
}

//! Photon source: emission sampling, photon budgets, and reemission.
//!
//! The [`PhotonSource`] holds a discrete representation of the source
//! distribution (positions, weights, cumulative probabilities) plus an
//! optional continuous surface source, and owns the diffuse-reemission
//! spectra. During a substep its sampling state is read-only, so it is
//! shared across transport workers by reference.

use std::sync::Arc;

use log::{info, warn};
use rand::{Rng, RngCore};

use crate::cell::CellValues;
use crate::constants::NU_HE_19EV;
use crate::cross_sections::CrossSections;
use crate::error::CoreError;
use crate::ions::{Abundances, Element, Ion, NUM_IONS};
use crate::photon::{Photon, PhotonType};
use crate::spectra::{
    HeliumLymanContinuumSpectrum, HeliumTwoPhotonContinuumSpectrum,
    HydrogenLymanContinuumSpectrum, PhotonSourceSpectrum, TemperatureDependentSpectrum,
};

/// Enumerates the discrete photon sources of a run.
pub trait PhotonSourceDistribution: Send + Sync {
    /// Number of discrete sources.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of source `i` (m).
    fn position(&self, i: usize) -> [f64; 3];

    /// Luminosity weight of source `i`; weights sum to 1.
    fn weight(&self, i: usize) -> f64;

    /// Total ionizing luminosity of all discrete sources (s⁻¹).
    fn total_luminosity(&self) -> f64;
}

/// A plain list of point sources with individual luminosities.
#[derive(Debug, Clone)]
pub struct PointSourceDistribution {
    positions: Vec<[f64; 3]>,
    weights: Vec<f64>,
    total_luminosity: f64,
}

impl PointSourceDistribution {
    pub fn new(sources: Vec<([f64; 3], f64)>) -> Self {
        let total: f64 = sources.iter().map(|(_, l)| l).sum();
        assert!(total > 0.0, "point source list has zero total luminosity");
        Self {
            positions: sources.iter().map(|(p, _)| *p).collect(),
            weights: sources.iter().map(|(_, l)| l / total).collect(),
            total_luminosity: total,
        }
    }

    /// A single source at the given position.
    pub fn single(position: [f64; 3], luminosity: f64) -> Self {
        Self::new(vec![(position, luminosity)])
    }
}

impl PhotonSourceDistribution for PointSourceDistribution {
    fn len(&self) -> usize {
        self.positions.len()
    }

    fn position(&self, i: usize) -> [f64; 3] {
        self.positions[i]
    }

    fn weight(&self, i: usize) -> f64 {
        self.weights[i]
    }

    fn total_luminosity(&self) -> f64 {
        self.total_luminosity
    }
}

/// An isotropic external radiation field entering through a surface.
pub trait IsotropicContinuousPhotonSource: Send + Sync {
    /// Draw a random entry point and inward direction.
    fn sample_incoming(&self, rng: &mut dyn RngCore) -> ([f64; 3], [f64; 3]);

    /// Total emitting surface area (m²).
    fn total_surface_area(&self) -> f64;
}

/// Isotropic radiation entering through the six faces of a box.
#[derive(Debug, Clone)]
pub struct BoxSurfaceSource {
    anchor: [f64; 3],
    sides: [f64; 3],
}

impl BoxSurfaceSource {
    pub fn new(anchor: [f64; 3], sides: [f64; 3]) -> Self {
        assert!(sides.iter().all(|s| *s > 0.0), "box sides must be positive");
        Self { anchor, sides }
    }
}

impl IsotropicContinuousPhotonSource for BoxSurfaceSource {
    fn sample_incoming(&self, rng: &mut dyn RngCore) -> ([f64; 3], [f64; 3]) {
        // Pick a face with probability proportional to its area, a point
        // uniformly on it, and a cosine-weighted inward direction.
        let areas = [
            self.sides[1] * self.sides[2],
            self.sides[0] * self.sides[2],
            self.sides[0] * self.sides[1],
        ];
        let total: f64 = 2.0 * (areas[0] + areas[1] + areas[2]);
        let mut pick = rng.gen::<f64>() * total;
        let mut axis = 0;
        let mut high_side = false;
        for (a, &area) in areas.iter().enumerate() {
            for side in [false, true] {
                if pick < area {
                    axis = a;
                    high_side = side;
                    pick = f64::NAN;
                    break;
                }
                pick -= area;
            }
            if pick.is_nan() {
                break;
            }
        }

        let mut position = [0.0; 3];
        for i in 0..3 {
            position[i] = self.anchor[i] + self.sides[i] * rng.gen::<f64>();
        }
        position[axis] = self.anchor[axis] + if high_side { self.sides[axis] } else { 0.0 };

        // Cosine-weighted hemisphere about the inward normal.
        let cos_theta = rng.gen::<f64>().sqrt();
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
        let phi = 2.0 * std::f64::consts::PI * rng.gen::<f64>();
        let (u, v) = tangent_frame(axis);
        let normal_sign = if high_side { -1.0 } else { 1.0 };
        let mut direction = [0.0; 3];
        for i in 0..3 {
            direction[i] = sin_theta * (phi.cos() * u[i] + phi.sin() * v[i]);
        }
        direction[axis] += normal_sign * cos_theta;
        (position, direction)
    }

    fn total_surface_area(&self) -> f64 {
        2.0 * (self.sides[0] * self.sides[1]
            + self.sides[1] * self.sides[2]
            + self.sides[0] * self.sides[2])
    }
}

/// Two unit vectors spanning the plane perpendicular to the given axis.
fn tangent_frame(axis: usize) -> ([f64; 3], [f64; 3]) {
    let mut u = [0.0; 3];
    let mut v = [0.0; 3];
    u[(axis + 1) % 3] = 1.0;
    v[(axis + 2) % 3] = 1.0;
    (u, v)
}

/// Draw an isotropic unit direction.
pub fn random_direction(rng: &mut dyn RngCore) -> [f64; 3] {
    let cos_theta = 2.0 * rng.gen::<f64>() - 1.0;
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
    let phi = 2.0 * std::f64::consts::PI * rng.gen::<f64>();
    [sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta]
}

/// The photon source used during the radiative-transfer loop.
pub struct PhotonSource {
    discrete_positions: Vec<[f64; 3]>,
    /// Cumulative sampling probabilities; last entry is exactly 1.
    discrete_probabilities: Vec<f64>,
    discrete_spectrum: Option<Box<dyn PhotonSourceSpectrum>>,
    continuous_source: Option<Box<dyn IsotropicContinuousPhotonSource>>,
    continuous_spectrum: Option<Box<dyn PhotonSourceSpectrum>>,
    abundances: Abundances,
    cross_sections: Arc<dyn CrossSections>,
    hydrogen_lyc: HydrogenLymanContinuumSpectrum,
    helium_lyc: HeliumLymanContinuumSpectrum,
    helium_2pc: HeliumTwoPhotonContinuumSpectrum,
    discrete_luminosity: f64,
    continuous_luminosity: f64,
    /// Fraction of the photon budget given to the discrete channel when
    /// both channels are present.
    discrete_fraction: f64,
    discrete_photon_count: usize,
    continuous_photon_count: usize,
    discrete_photon_weight: f64,
    continuous_photon_weight: f64,
}

impl PhotonSource {
    /// Wire a source from its collaborators. Fails fast on inconsistent
    /// configurations (a channel without its spectrum, no channel at all,
    /// discrete weights that do not sum to 1 within 1e-9).
    pub fn new(
        distribution: Option<&dyn PhotonSourceDistribution>,
        discrete_spectrum: Option<Box<dyn PhotonSourceSpectrum>>,
        continuous_source: Option<Box<dyn IsotropicContinuousPhotonSource>>,
        continuous_spectrum: Option<Box<dyn PhotonSourceSpectrum>>,
        abundances: Abundances,
        cross_sections: Arc<dyn CrossSections>,
    ) -> Result<Self, CoreError> {
        let mut discrete_positions = Vec::new();
        let mut discrete_probabilities = Vec::new();
        let mut discrete_luminosity = 0.0;

        if let Some(distribution) = distribution {
            if discrete_spectrum.is_none() {
                return Err(CoreError::MissingDiscreteSpectrum);
            }
            let n = distribution.len();
            discrete_positions.reserve(n);
            discrete_probabilities.reserve(n);
            let mut cumulative = 0.0;
            for i in 0..n {
                discrete_positions.push(distribution.position(i));
                cumulative += distribution.weight(i);
                discrete_probabilities.push(cumulative);
            }
            let sum = *discrete_probabilities.last().unwrap_or(&0.0);
            if (sum - 1.0).abs() > 1.0e-9 {
                return Err(CoreError::InvalidSourceWeights { sum });
            }
            *discrete_probabilities.last_mut().unwrap() = 1.0;
            discrete_luminosity = distribution.total_luminosity();
            info!(
                "Constructed photon source with {} discrete positions and weights.",
                discrete_positions.len()
            );
        } else if discrete_spectrum.is_some() {
            warn!(
                "Discrete photon source spectrum provided, but no discrete source \
                 distribution. The spectrum will be ignored."
            );
        }

        let mut continuous_luminosity = 0.0;
        if let Some(ref source) = continuous_source {
            let spectrum = continuous_spectrum
                .as_ref()
                .ok_or(CoreError::MissingContinuousSpectrum)?;
            if spectrum.total_flux() <= 0.0 {
                return Err(CoreError::ZeroContinuousFlux);
            }
            continuous_luminosity = source.total_surface_area() * spectrum.total_flux();
        } else if continuous_spectrum.is_some() {
            warn!(
                "Continuous photon source spectrum provided, but no continuous \
                 source. The spectrum will be ignored."
            );
        }

        if discrete_luminosity + continuous_luminosity <= 0.0 {
            return Err(CoreError::NoSources);
        }

        info!(
            "Total luminosity: {:.6e} s^-1 discrete, {:.6e} s^-1 continuous ({:.1}% discrete).",
            discrete_luminosity,
            continuous_luminosity,
            100.0 * discrete_luminosity / (discrete_luminosity + continuous_luminosity)
        );

        let hydrogen_lyc = HydrogenLymanContinuumSpectrum::new(cross_sections.as_ref());
        let helium_lyc = HeliumLymanContinuumSpectrum::new(cross_sections.as_ref());

        Ok(Self {
            discrete_positions,
            discrete_probabilities,
            discrete_spectrum,
            continuous_source,
            continuous_spectrum,
            abundances,
            cross_sections,
            hydrogen_lyc,
            helium_lyc,
            helium_2pc: HeliumTwoPhotonContinuumSpectrum::new(),
            discrete_luminosity,
            continuous_luminosity,
            discrete_fraction: 0.5,
            discrete_photon_count: 0,
            continuous_photon_count: 0,
            discrete_photon_weight: 1.0,
            continuous_photon_weight: 1.0,
        })
    }

    /// Override the budget split between the discrete and continuous
    /// channels (only meaningful when both are present).
    pub fn with_discrete_fraction(mut self, fraction: f64) -> Self {
        assert!((0.0..=1.0).contains(&fraction));
        self.discrete_fraction = fraction;
        self
    }

    /// Total luminosity of all channels (s⁻¹).
    pub fn total_luminosity(&self) -> f64 {
        self.discrete_luminosity + self.continuous_luminosity
    }

    /// Partition a photon budget between the channels and fix the
    /// per-packet statistical weights. Returns the actual budget, which
    /// can exceed the request because of the per-channel minimums
    /// (10 packets per discrete source, 100 continuous packets).
    pub fn set_photon_budget(&mut self, number_of_photons: usize) -> usize {
        if self.discrete_luminosity > 0.0 && self.continuous_luminosity > 0.0 {
            self.discrete_photon_count =
                (self.discrete_fraction * number_of_photons as f64) as usize;
            self.continuous_photon_count = number_of_photons - self.discrete_photon_count;
        } else if self.discrete_luminosity > 0.0 {
            self.discrete_photon_count = number_of_photons;
            self.continuous_photon_count = 0;
        } else {
            self.discrete_photon_count = 0;
            self.continuous_photon_count = number_of_photons;
        }

        if self.discrete_photon_count > 0 {
            let minimum = 10 * self.discrete_positions.len();
            self.discrete_photon_count = self.discrete_photon_count.max(minimum);
            self.discrete_photon_weight =
                self.discrete_luminosity / self.discrete_photon_count as f64;
        }
        if self.continuous_photon_count > 0 {
            self.continuous_photon_count = self.continuous_photon_count.max(100);
            self.continuous_photon_weight =
                self.continuous_luminosity / self.continuous_photon_count as f64;
        }

        info!(
            "Photon budget set to {} discrete and {} continuous packets.",
            self.discrete_photon_count, self.continuous_photon_count
        );
        self.discrete_photon_count + self.continuous_photon_count
    }

    /// Draw a fresh packet from one of the channels.
    pub fn sample(&self, rng: &mut dyn RngCore) -> Photon {
        let total = self.discrete_photon_count + self.continuous_photon_count;
        assert!(total > 0, "photon budget not set before sampling");

        let discrete = if self.discrete_photon_count == 0 {
            false
        } else if self.continuous_photon_count == 0 {
            true
        } else {
            rng.gen::<f64>() < self.discrete_photon_count as f64 / total as f64
        };

        let mut photon = if discrete {
            let u: f64 = rng.gen();
            let mut i = 0;
            while u > self.discrete_probabilities[i] {
                i += 1;
            }
            let spectrum = self
                .discrete_spectrum
                .as_ref()
                .expect("discrete channel active without a spectrum");
            Photon::new(
                self.discrete_positions[i],
                random_direction(rng),
                spectrum.sample_frequency(rng),
                self.discrete_photon_weight,
            )
        } else {
            let source = self
                .continuous_source
                .as_ref()
                .expect("continuous channel active without a source");
            let spectrum = self
                .continuous_spectrum
                .as_ref()
                .expect("continuous channel active without a spectrum");
            let (position, direction) = source.sample_incoming(rng);
            Photon::new(
                position,
                direction,
                spectrum.sample_frequency(rng),
                self.continuous_photon_weight,
            )
        };

        self.assign_cross_sections(&mut photon);
        photon
    }

    /// Fill the packet's per-ion cross-section cache at its current
    /// frequency, including the helium-abundance-weighted correction.
    pub fn assign_cross_sections(&self, photon: &mut Photon) {
        let mut table = [0.0; NUM_IONS];
        for ion in Ion::ALL {
            table[ion.index()] = self.cross_sections.cross_section(ion, photon.frequency);
        }
        let he_corr = self.abundances.abundance(Element::Helium) * table[Ion::Hen.index()];
        photon.set_cross_sections(table, he_corr);
    }

    /// Decide the absorption channel and reemission outcome for a packet
    /// that reached its interaction point in `cell`.
    ///
    /// Returns `false` iff the packet leaves the system (type becomes
    /// [`PhotonType::Absorbed`]). On `true` the packet carries a new
    /// frequency, an isotropic direction and a rebuilt cross-section
    /// cache.
    pub fn reemit(&self, photon: &mut Photon, cell: &CellValues, rng: &mut dyn RngCore) -> bool {
        let temperature = cell.temperature();
        let x_hn = cell.ionic_fraction(Ion::Hn);
        let x_hen = cell.ionic_fraction(Ion::Hen);

        let h_term = x_hn * photon.cross_section(Ion::Hn);
        let he_term = x_hen * photon.cross_section_he_corr();
        if h_term == 0.0 && he_term == 0.0 {
            // Nothing at this frequency absorbs; the interaction point
            // came from a different opacity channel, treat as lost.
            photon.photon_type = PhotonType::Absorbed;
            return false;
        }
        let p_h_abs = if h_term > 0.0 { 1.0 / (1.0 + he_term / h_term) } else { 0.0 };

        let new_frequency;
        if rng.gen::<f64>() <= p_h_abs {
            // Absorbed by hydrogen.
            match self.hydrogen_channel(temperature, cell.p_hion(), rng) {
                Some(frequency) => {
                    new_frequency = frequency;
                    photon.photon_type = PhotonType::DiffuseHI;
                }
                None => {
                    photon.photon_type = PhotonType::Absorbed;
                    return false;
                }
            }
        } else {
            // Absorbed by helium.
            let u: f64 = rng.gen();
            if u <= cell.p_he_em(0) {
                new_frequency = self.helium_lyc.sample_frequency(temperature, rng);
                photon.photon_type = PhotonType::DiffuseHeI;
            } else if u <= cell.p_he_em(1) {
                new_frequency = NU_HE_19EV;
                photon.photon_type = PhotonType::DiffuseHeI;
            } else if u <= cell.p_he_em(2) {
                match self.two_photon_channel(temperature, rng) {
                    Some(frequency) => {
                        new_frequency = frequency;
                        photon.photon_type = PhotonType::DiffuseHeI;
                    }
                    None => {
                        photon.photon_type = PhotonType::Absorbed;
                        return false;
                    }
                }
            } else if u <= cell.p_he_em(3) {
                // He I Lyman-α: absorbed on the spot by hydrogen, or
                // degraded to the two-photon continuum.
                let p_spot = if x_hn > 0.0 {
                    1.0 / (1.0 + 77.0 * x_hen / (temperature.sqrt() * x_hn))
                } else {
                    0.0
                };
                if rng.gen::<f64>() < p_spot {
                    match self.hydrogen_channel(temperature, cell.p_hion(), rng) {
                        Some(frequency) => {
                            new_frequency = frequency;
                            photon.photon_type = PhotonType::DiffuseHI;
                        }
                        None => {
                            photon.photon_type = PhotonType::Absorbed;
                            return false;
                        }
                    }
                } else {
                    match self.two_photon_channel(temperature, rng) {
                        Some(frequency) => {
                            new_frequency = frequency;
                            photon.photon_type = PhotonType::DiffuseHeI;
                        }
                        None => {
                            photon.photon_type = PhotonType::Absorbed;
                            return false;
                        }
                    }
                }
            } else {
                // The cumulative thresholds are normalised to exactly 1,
                // so this branch never triggers.
                photon.photon_type = PhotonType::Absorbed;
                return false;
            }
        }

        photon.frequency = new_frequency;
        photon.direction = random_direction(rng);
        self.assign_cross_sections(photon);
        true
    }

    /// Hydrogen absorption: reemit from the Lyman continuum with
    /// probability p_Hion, otherwise the packet is lost.
    fn hydrogen_channel(
        &self,
        temperature: f64,
        p_hion: f64,
        rng: &mut dyn RngCore,
    ) -> Option<f64> {
        if rng.gen::<f64>() <= p_hion {
            Some(self.hydrogen_lyc.sample_frequency(temperature, rng))
        } else {
            None
        }
    }

    /// He two-photon continuum: only 56% of decays put a photon above the
    /// hydrogen ionization threshold.
    fn two_photon_channel(&self, temperature: f64, rng: &mut dyn RngCore) -> Option<f64> {
        if rng.gen::<f64>() < 0.56 {
            Some(self.helium_2pc.sample_frequency(temperature, rng))
        } else {
            None
        }
    }

    /// Number of packets assigned to the discrete channel.
    pub fn discrete_photon_count(&self) -> usize {
        self.discrete_photon_count
    }

    /// Number of packets assigned to the continuous channel.
    pub fn continuous_photon_count(&self) -> usize {
        self.continuous_photon_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ev_to_frequency, NU_HI};
    use crate::cross_sections::VernerCrossSections;
    use crate::spectra::MonochromaticSpectrum;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn simple_source(abundances: Abundances) -> PhotonSource {
        let distribution = PointSourceDistribution::single([0.5, 0.5, 0.5], 1.0e49);
        PhotonSource::new(
            Some(&distribution),
            Some(Box::new(MonochromaticSpectrum::new(NU_HI))),
            None,
            None,
            abundances,
            Arc::new(VernerCrossSections::new()),
        )
        .unwrap()
    }

    #[test]
    fn budget_minimums_are_enforced() {
        let mut source = simple_source(Abundances::default());
        let actual = source.set_photon_budget(3);
        assert_eq!(actual, 10);
        assert_eq!(source.discrete_photon_count(), 10);
        // w = L / N for the discrete channel.
        let expected = 1.0e49 / 10.0;
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(source.sample(&mut rng).weight, expected);
    }

    #[test]
    fn discrete_fraction_steers_the_budget_split() {
        let distribution = PointSourceDistribution::single([0.5; 3], 1.0e49);
        let mut source = PhotonSource::new(
            Some(&distribution),
            Some(Box::new(MonochromaticSpectrum::new(NU_HI))),
            Some(Box::new(BoxSurfaceSource::new([0.0; 3], [1.0; 3]))),
            Some(Box::new(
                crate::spectra::FlatSpectrum::new(NU_HI, 2.0 * NU_HI).with_total_flux(1.0e10),
            )),
            Abundances::default(),
            Arc::new(VernerCrossSections::new()),
        )
        .unwrap()
        .with_discrete_fraction(0.3);

        let actual = source.set_photon_budget(1000);
        assert_eq!(source.discrete_photon_count(), 300);
        assert_eq!(source.continuous_photon_count(), 700);
        assert_eq!(actual, 1000);
    }

    #[test]
    fn discrete_weight_mismatch_is_fatal() {
        struct BadWeights;
        impl PhotonSourceDistribution for BadWeights {
            fn len(&self) -> usize {
                2
            }
            fn position(&self, _i: usize) -> [f64; 3] {
                [0.0; 3]
            }
            fn weight(&self, _i: usize) -> f64 {
                0.45
            }
            fn total_luminosity(&self) -> f64 {
                1.0e48
            }
        }
        let result = PhotonSource::new(
            Some(&BadWeights),
            Some(Box::new(MonochromaticSpectrum::new(NU_HI))),
            None,
            None,
            Abundances::default(),
            Arc::new(VernerCrossSections::new()),
        );
        assert!(matches!(
            result,
            Err(CoreError::InvalidSourceWeights { .. })
        ));
    }

    #[test]
    fn discrete_sources_require_a_spectrum() {
        let distribution = PointSourceDistribution::single([0.0; 3], 1.0e49);
        let result = PhotonSource::new(
            Some(&distribution),
            None,
            None,
            None,
            Abundances::default(),
            Arc::new(VernerCrossSections::new()),
        );
        assert!(matches!(result, Err(CoreError::MissingDiscreteSpectrum)));
    }

    #[test]
    fn sampled_directions_are_unit_vectors() {
        let mut source = simple_source(Abundances::default());
        source.set_photon_budget(100);
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..1000 {
            let photon = source.sample(&mut rng);
            let norm: f64 = photon.direction.iter().map(|d| d * d).sum();
            assert!((norm - 1.0).abs() < 1.0e-12);
            assert_eq!(photon.position, [0.5, 0.5, 0.5]);
            assert_eq!(photon.photon_type, PhotonType::Primary);
        }
    }

    #[test]
    fn reemission_outcomes_partition_unity() {
        // Every reemit call ends in exactly one of the three terminal
        // classifications, so their fractions sum to 1 by construction.
        let mut source = simple_source(Abundances::default());
        source.set_photon_budget(100);
        let mut cell = CellValues::new(1.0e8, 8000.0);
        cell.ionic_fractions[Ion::Hn.index()] = 0.5;
        cell.ionic_fractions[Ion::Hen.index()] = 0.5;

        let mut rng = StdRng::seed_from_u64(4);
        let (mut hi, mut hei, mut absorbed) = (0u32, 0u32, 0u32);
        let n = 20_000;
        for _ in 0..n {
            let mut photon = source.sample(&mut rng);
            // Push the packet above the helium threshold so both
            // absorption channels are open.
            photon.frequency = ev_to_frequency(30.0);
            source.assign_cross_sections(&mut photon);
            if source.reemit(&mut photon, &cell, &mut rng) {
                match photon.photon_type {
                    PhotonType::DiffuseHI => hi += 1,
                    PhotonType::DiffuseHeI => hei += 1,
                    other => panic!("unexpected type {:?}", other),
                }
            } else {
                assert_eq!(photon.photon_type, PhotonType::Absorbed);
                absorbed += 1;
            }
        }
        assert_eq!(hi + hei + absorbed, n);
        assert!(hi > 0 && hei > 0 && absorbed > 0);
    }

    #[test]
    fn box_surface_source_emits_inward() {
        let source = BoxSurfaceSource::new([0.0; 3], [1.0, 1.0, 1.0]);
        assert_eq!(source.total_surface_area(), 6.0);
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..1000 {
            let (position, direction) = source.sample_incoming(&mut rng);
            let norm: f64 = direction.iter().map(|d| d * d).sum();
            assert!((norm - 1.0).abs() < 1.0e-12);
            // The entry point sits on a face and the direction points
            // into the box along that face's axis.
            let mut on_face = false;
            for i in 0..3 {
                if position[i] == 0.0 {
                    assert!(direction[i] > 0.0);
                    on_face = true;
                } else if position[i] == 1.0 {
                    assert!(direction[i] < 0.0);
                    on_face = true;
                }
            }
            assert!(on_face);
        }
    }
}

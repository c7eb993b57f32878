//! Per-cell gas state, accumulators and reemission probabilities.

use crate::ions::{Element, Ion, NUM_IONS};

/// The physical state of one grid cell.
///
/// Ionic fractions are the fractions of each element's atoms in the
/// *tracked* (lower) stages; the remainder sits in the implicit top stage.
/// Accumulators hold the mean-intensity integrals of the current outer
/// iteration and are reset when it starts.
#[derive(Debug, Clone)]
pub struct CellValues {
    /// Total hydrogen number density (m⁻³).
    pub number_density: f64,
    /// Gas temperature (K).
    temperature: f64,
    /// Tracked ionic fractions, indexed by [`Ion`].
    pub ionic_fractions: [f64; NUM_IONS],
    /// Per-ion mean-intensity integrals Jᵢ = Σ w·σᵢ·ds / V (s⁻¹... per
    /// unit source weight; scaled by Q/totweight in the solvers).
    pub mean_intensity: [f64; NUM_IONS],
    /// Hydrogen heating integral: Σ w·σ_H·(ν − ν_H)·ds / V.
    pub heating_h: f64,
    /// Helium heating integral: Σ w·σ_He·(ν − ν_He)·ds / V.
    pub heating_he: f64,
    /// Probability that an H-absorbed photon is reemitted as an ionizing
    /// H Lyman-continuum photon.
    p_hion: f64,
    /// Cumulative thresholds of the four helium reemission channels.
    p_he_em: [f64; 4],
    /// Set when the per-cell equilibrium solve failed to converge.
    pub non_converged: bool,
}

impl CellValues {
    /// Create a cell with the given density and temperature. Ionic
    /// fractions start fully neutral; `initialize` on the grid resets them
    /// to the standard starting guess before the first iteration.
    pub fn new(number_density: f64, temperature: f64) -> Self {
        assert!(
            number_density >= 0.0,
            "negative number density {}",
            number_density
        );
        assert!(temperature > 0.0, "non-positive temperature {}", temperature);
        let mut cell = Self {
            number_density,
            temperature,
            ionic_fractions: [1.0; NUM_IONS],
            mean_intensity: [0.0; NUM_IONS],
            heating_h: 0.0,
            heating_he: 0.0,
            p_hion: 0.0,
            p_he_em: [0.0; 4],
            non_converged: false,
        };
        cell.update_reemission_probabilities();
        cell
    }

    /// Gas temperature (K).
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Set the gas temperature and refresh the reemission probabilities,
    /// which are pure functions of T.
    pub fn set_temperature(&mut self, temperature: f64) {
        assert!(temperature > 0.0, "non-positive temperature {}", temperature);
        self.temperature = temperature;
        self.update_reemission_probabilities();
    }

    /// Tracked ionic fraction of the given ion.
    pub fn ionic_fraction(&self, ion: Ion) -> f64 {
        self.ionic_fractions[ion.index()]
    }

    /// Probability that an H-absorbed photon is reemitted ionizing.
    pub fn p_hion(&self) -> f64 {
        self.p_hion
    }

    /// Cumulative threshold of helium reemission channel `i` (0..4).
    pub fn p_he_em(&self, i: usize) -> f64 {
        self.p_he_em[i]
    }

    /// Zero the mean-intensity and heating accumulators.
    pub fn reset_accumulators(&mut self) {
        self.mean_intensity = [0.0; NUM_IONS];
        self.heating_h = 0.0;
        self.heating_he = 0.0;
    }

    /// Reset the ionic fractions to the standard starting guess: almost
    /// fully ionized hydrogen and helium (neutral fractions 1e-6), metals
    /// fully in their lowest tracked stage.
    pub fn reset_ionic_fractions(&mut self) {
        self.ionic_fractions = [0.0; NUM_IONS];
        self.ionic_fractions[Ion::Hn.index()] = 1.0e-6;
        self.ionic_fractions[Ion::Hen.index()] = 1.0e-6;
        for element in [
            Element::Carbon,
            Element::Nitrogen,
            Element::Oxygen,
            Element::Neon,
            Element::Sulphur,
        ] {
            self.ionic_fractions[element.tracked_ions()[0].index()] = 1.0;
        }
    }

    /// Recompute the reemission probabilities for the current temperature.
    ///
    /// The recombination coefficients are power-law fits in T/10⁴ K; the
    /// helium channel thresholds are stored cumulatively and normalised so
    /// the last entry is exactly 1.
    fn update_reemission_probabilities(&mut self) {
        let t4 = self.temperature * 1.0e-4;

        let alpha_1_h = 1.58e-13 * t4.powf(-0.53);
        let alpha_a = 4.18e-13 * t4.powf(-0.70);
        self.p_hion = alpha_1_h / alpha_a;

        let alpha_1_he = 1.54e-13 * t4.powf(-0.486);
        let alpha_e_2t_s = 2.1e-13 * t4.powf(-0.381);
        let alpha_e_2s_s = 2.06e-14 * t4.powf(-0.451);
        let alpha_e_2s_p = 4.17e-14 * t4.powf(-0.695);
        // Summing the four channel coefficients guarantees the cumulative
        // distribution ends at exactly 1.
        let alpha_he = alpha_1_he + alpha_e_2t_s + alpha_e_2s_s + alpha_e_2s_p;

        self.p_he_em[0] = alpha_1_he / alpha_he;
        self.p_he_em[1] = self.p_he_em[0] + alpha_e_2t_s / alpha_he;
        self.p_he_em[2] = self.p_he_em[1] + alpha_e_2s_s / alpha_he;
        self.p_he_em[3] = self.p_he_em[2] + alpha_e_2s_p / alpha_he;
    }

    /// Abort if the cell state violates a structural invariant. `index` is
    /// reported so the offending cell can be found.
    pub fn check_invariants(&self, index: usize) {
        assert!(
            self.number_density >= 0.0,
            "cell {}: negative number density {}",
            index,
            self.number_density
        );
        assert!(
            self.temperature > 0.0,
            "cell {}: non-positive temperature {}",
            index,
            self.temperature
        );
        for ion in Ion::ALL {
            let x = self.ionic_fraction(ion);
            assert!(
                (0.0..=1.0).contains(&x),
                "cell {}: ionic fraction {} = {} outside [0, 1]",
                index,
                ion.label(),
                x
            );
            assert!(
                self.mean_intensity[ion.index()] >= 0.0,
                "cell {}: negative mean intensity for {}",
                index,
                ion.label()
            );
        }
        for element in Element::ALL {
            let sum: f64 = element
                .tracked_ions()
                .iter()
                .map(|ion| self.ionic_fraction(*ion))
                .sum();
            assert!(
                sum <= 1.0 + 1.0e-6,
                "cell {}: tracked stages of {:?} sum to {} > 1",
                index,
                element,
                sum
            );
        }
    }
}

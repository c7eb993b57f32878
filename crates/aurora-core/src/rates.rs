//! Recombination and charge-transfer rate coefficients.
//!
//! Both contracts are pure functions of temperature. The shipped
//! implementations are analytic fits: [`VernerRecombinationRates`]
//! (Verner & Ferland 1996 functional form for H and He, power laws for
//! the heavier stages) and [`KingdonFerlandChargeTransferRates`].

use crate::ions::{Ion, NUM_IONS};

/// Radiative + dielectronic recombination rate coefficients. Pure.
pub trait RecombinationRates: Send + Sync {
    /// Rate coefficient (m³ s⁻¹) for recombination *into* the given
    /// tracked ion from the next higher ionization stage.
    fn rate(&self, ion: Ion, temperature: f64) -> f64;
}

/// Charge-transfer rate coefficients with hydrogen. Pure.
pub trait ChargeTransferRates: Send + Sync {
    /// Rate coefficient (m³ s⁻¹) for charge-transfer recombination of the
    /// next higher stage with neutral hydrogen, producing the given
    /// tracked ion: X⁺ᵏ⁺¹ + H⁰ → X⁺ᵏ + H⁺.
    fn recombination_rate(&self, ion: Ion, temperature: f64) -> f64;

    /// Rate coefficient (m³ s⁻¹) for charge-transfer ionization of the
    /// given tracked ion with ionized hydrogen: X⁺ᵏ + H⁺ → X⁺ᵏ⁺¹ + H⁰.
    fn ionization_rate(&self, ion: Ion, temperature: f64) -> f64;
}

/// Fit shapes for the recombination coefficient of one ion.
#[derive(Debug, Clone, Copy)]
enum RecombFit {
    /// Verner & Ferland: a / [√(T/T0)·(1+√(T/T0))^(1−b)·(1+√(T/T1))^(1+b)].
    /// `a` in cm³ s⁻¹, temperatures in K.
    VernerFerland { a: f64, b: f64, t0: f64, t1: f64 },
    /// Plain power law a·(T/10⁴)^(−b), `a` in cm³ s⁻¹.
    PowerLaw { a: f64, b: f64 },
}

impl RecombFit {
    fn evaluate(&self, temperature: f64) -> f64 {
        let rate_cm3 = match *self {
            RecombFit::VernerFerland { a, b, t0, t1 } => {
                let s0 = (temperature / t0).sqrt();
                let s1 = (temperature / t1).sqrt();
                a / (s0 * (1.0 + s0).powf(1.0 - b) * (1.0 + s1).powf(1.0 + b))
            }
            RecombFit::PowerLaw { a, b } => a * (temperature * 1.0e-4).powf(-b),
        };
        rate_cm3 * 1.0e-6
    }
}

/// Fit rows in [`Ion`] enumeration order.
const RECOMB_TABLE: [RecombFit; NUM_IONS] = [
    // H0
    RecombFit::VernerFerland { a: 7.982e-11, b: 0.7480, t0: 3.148, t1: 7.036e5 },
    // He0
    RecombFit::VernerFerland { a: 9.356e-10, b: 0.7892, t0: 4.266e-2, t1: 4.677e6 },
    // C+1
    RecombFit::PowerLaw { a: 4.7e-13, b: 0.62 },
    // C+2
    RecombFit::PowerLaw { a: 2.3e-12, b: 0.65 },
    // N0
    RecombFit::PowerLaw { a: 4.1e-13, b: 0.61 },
    // N+1
    RecombFit::PowerLaw { a: 2.2e-12, b: 0.64 },
    // N+2
    RecombFit::PowerLaw { a: 4.0e-12, b: 0.65 },
    // O0
    RecombFit::PowerLaw { a: 3.1e-13, b: 0.68 },
    // O+1
    RecombFit::PowerLaw { a: 2.0e-12, b: 0.65 },
    // Ne0
    RecombFit::PowerLaw { a: 4.4e-13, b: 0.67 },
    // Ne+1
    RecombFit::PowerLaw { a: 1.5e-12, b: 0.69 },
    // S+1
    RecombFit::PowerLaw { a: 4.1e-13, b: 0.63 },
    // S+2
    RecombFit::PowerLaw { a: 1.8e-12, b: 0.69 },
    // S+3
    RecombFit::PowerLaw { a: 2.7e-12, b: 0.69 },
];

/// Analytic recombination rate fits.
#[derive(Debug, Clone, Default)]
pub struct VernerRecombinationRates;

impl VernerRecombinationRates {
    pub fn new() -> Self {
        Self
    }
}

impl RecombinationRates for VernerRecombinationRates {
    fn rate(&self, ion: Ion, temperature: f64) -> f64 {
        RECOMB_TABLE[ion.index()].evaluate(temperature)
    }
}

/// One charge-transfer fit: k = a·10⁻⁹·t₄ᵇ·(1 + c·exp(d·t₄)) cm³ s⁻¹,
/// optionally damped by a Boltzmann factor exp(−ΔE/kT) with ΔE/k in K.
#[derive(Debug, Clone, Copy)]
struct ChargeTransferFit {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    boltzmann_k: f64,
}

impl ChargeTransferFit {
    const ZERO: ChargeTransferFit = ChargeTransferFit { a: 0.0, b: 0.0, c: 0.0, d: 0.0, boltzmann_k: 0.0 };

    fn evaluate(&self, temperature: f64) -> f64 {
        if self.a == 0.0 {
            return 0.0;
        }
        let t4 = temperature * 1.0e-4;
        let rate_cm3 = self.a * 1.0e-9 * t4.powf(self.b) * (1.0 + self.c * (self.d * t4).exp());
        rate_cm3 * (-self.boltzmann_k / temperature).exp() * 1.0e-6
    }
}

/// Charge-transfer recombination rows (X⁺ᵏ⁺¹ + H⁰), [`Ion`] order.
const CT_RECOMB_TABLE: [ChargeTransferFit; NUM_IONS] = [
    // H0: no CT channel with itself.
    ChargeTransferFit::ZERO,
    // He0: He⁺ + H⁰ is strongly suppressed.
    ChargeTransferFit { a: 7.5e-7, b: 0.0, c: 0.0, d: 0.0, boltzmann_k: 0.0 },
    // C+1: C²⁺ + H⁰.
    ChargeTransferFit { a: 1.67e-4, b: 2.79, c: 304.72, d: -4.07, boltzmann_k: 0.0 },
    // C+2: C³⁺ + H⁰.
    ChargeTransferFit { a: 3.25, b: 0.21, c: 0.19, d: -3.29, boltzmann_k: 0.0 },
    // N0: N⁺ + H⁰.
    ChargeTransferFit { a: 1.01e-3, b: -0.29, c: -0.92, d: -8.38, boltzmann_k: 0.0 },
    // N+1: N²⁺ + H⁰.
    ChargeTransferFit { a: 3.05e-1, b: 0.60, c: 2.65, d: -0.93, boltzmann_k: 0.0 },
    // N+2: N³⁺ + H⁰.
    ChargeTransferFit { a: 4.54, b: 0.57, c: -0.65, d: -0.89, boltzmann_k: 0.0 },
    // O0: O⁺ + H⁰ (resonant).
    ChargeTransferFit { a: 1.04, b: 3.15e-2, c: -0.61, d: -9.73, boltzmann_k: 0.0 },
    // O+1: O²⁺ + H⁰.
    ChargeTransferFit { a: 1.04, b: 0.27, c: 2.02, d: -5.92, boltzmann_k: 0.0 },
    // Ne0: Ne⁺ + H⁰ is negligible.
    ChargeTransferFit::ZERO,
    // Ne+1: Ne²⁺ + H⁰.
    ChargeTransferFit { a: 1.00e-5, b: 0.0, c: 0.0, d: 0.0, boltzmann_k: 0.0 },
    // S+1: S²⁺ + H⁰.
    ChargeTransferFit { a: 1.00e-5, b: 0.0, c: 0.0, d: 0.0, boltzmann_k: 0.0 },
    // S+2: S³⁺ + H⁰.
    ChargeTransferFit { a: 2.29, b: 4.02e-2, c: 1.59, d: -6.06, boltzmann_k: 0.0 },
    // S+3: S⁴⁺ + H⁰.
    ChargeTransferFit { a: 6.44, b: 0.13, c: 2.69, d: -5.69, boltzmann_k: 0.0 },
];

/// Charge-transfer ionization rows (X⁺ᵏ + H⁺), [`Ion`] order. Only the
/// near-resonant neutral channels matter; endothermic channels carry a
/// Boltzmann damping.
const CT_ION_TABLE: [ChargeTransferFit; NUM_IONS] = [
    // H0
    ChargeTransferFit::ZERO,
    // He0
    ChargeTransferFit::ZERO,
    // C+1
    ChargeTransferFit::ZERO,
    // C+2
    ChargeTransferFit::ZERO,
    // N0: N⁰ + H⁺, ΔE/k = 1.09e4 K.
    ChargeTransferFit { a: 4.55e-3, b: -0.29, c: -0.92, d: -8.38, boltzmann_k: 1.086e4 },
    // N+1
    ChargeTransferFit::ZERO,
    // N+2
    ChargeTransferFit::ZERO,
    // O0: O⁰ + H⁺ (resonant), ΔE/k = 227 K.
    ChargeTransferFit { a: 1.04, b: 3.15e-2, c: -0.61, d: -9.73, boltzmann_k: 227.0 },
    // O+1
    ChargeTransferFit::ZERO,
    // Ne0
    ChargeTransferFit::ZERO,
    // Ne+1
    ChargeTransferFit::ZERO,
    // S+1
    ChargeTransferFit::ZERO,
    // S+2
    ChargeTransferFit::ZERO,
    // S+3
    ChargeTransferFit::ZERO,
];

/// Analytic charge-transfer rate fits.
#[derive(Debug, Clone, Default)]
pub struct KingdonFerlandChargeTransferRates;

impl KingdonFerlandChargeTransferRates {
    pub fn new() -> Self {
        Self
    }
}

impl ChargeTransferRates for KingdonFerlandChargeTransferRates {
    fn recombination_rate(&self, ion: Ion, temperature: f64) -> f64 {
        CT_RECOMB_TABLE[ion.index()].evaluate(temperature)
    }

    fn ionization_rate(&self, ion: Ion, temperature: f64) -> f64 {
        CT_ION_TABLE[ion.index()].evaluate(temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hydrogen_case_a_at_1e4_k() {
        let rates = VernerRecombinationRates::new();
        // Case A total recombination at 10⁴ K is 4.2e-19 m³ s⁻¹.
        assert_relative_eq!(rates.rate(Ion::Hn, 1.0e4), 4.2e-19, max_relative = 0.05);
    }

    #[test]
    fn helium_at_1e4_k() {
        let rates = VernerRecombinationRates::new();
        let alpha = rates.rate(Ion::Hen, 1.0e4);
        assert!(alpha > 3.0e-19 && alpha < 7.0e-19, "alpha = {}", alpha);
    }

    #[test]
    fn rates_decrease_with_temperature() {
        let rates = VernerRecombinationRates::new();
        for ion in Ion::ALL {
            let low = rates.rate(ion, 5.0e3);
            let high = rates.rate(ion, 5.0e4);
            assert!(low > high, "{} rate not decreasing", ion.label());
        }
    }

    #[test]
    fn oxygen_charge_transfer_is_near_resonant() {
        let ct = KingdonFerlandChargeTransferRates::new();
        let rec = ct.recombination_rate(Ion::On, 8.0e3);
        let ion = ct.ionization_rate(Ion::On, 8.0e3);
        // Both directions of the resonant O/H channel are of order
        // 1e-15 m³ s⁻¹ and the ionizing direction is Boltzmann-damped.
        assert!(rec > 1.0e-16 && rec < 1.0e-14, "rec = {}", rec);
        assert!(ion < rec && ion > 0.0);
    }

    #[test]
    fn hydrogen_has_no_charge_transfer_with_itself() {
        let ct = KingdonFerlandChargeTransferRates::new();
        assert_eq!(ct.recombination_rate(Ion::Hn, 1.0e4), 0.0);
        assert_eq!(ct.ionization_rate(Ion::Hn, 1.0e4), 0.0);
    }
}

//! Photoionization cross sections.
//!
//! The [`CrossSections`] trait is the collaborator contract; the shipped
//! implementation is [`VernerCrossSections`], an analytic ground-state fit
//! (Verner et al. 1996) evaluated from a per-ion parameter table.

use crate::constants::frequency_to_ev;
use crate::ions::{Ion, NUM_IONS};

/// Photoionization cross sections for every tracked ion. Pure.
pub trait CrossSections: Send + Sync {
    /// Cross section of the given ion at the given frequency (m²).
    /// Zero below the ion's ionization threshold.
    fn cross_section(&self, ion: Ion, frequency: f64) -> f64;
}

/// One row of the analytic fit: threshold energy plus the shape
/// parameters of the Verner functional form. Energies in eV, σ₀ in Mb.
#[derive(Debug, Clone, Copy)]
struct FitRow {
    e_th: f64,
    e_0: f64,
    sigma_0: f64,
    y_a: f64,
    p: f64,
    y_w: f64,
    y_0: f64,
    y_1: f64,
}

impl FitRow {
    /// Evaluate the fit at the given photon energy (eV). Returns Mb.
    fn evaluate(&self, energy_ev: f64) -> f64 {
        if energy_ev < self.e_th {
            return 0.0;
        }
        let x = energy_ev / self.e_0 - self.y_0;
        let y = (x * x + self.y_1 * self.y_1).sqrt();
        let f = ((x - 1.0) * (x - 1.0) + self.y_w * self.y_w)
            * y.powf(0.5 * self.p - 5.5)
            * (1.0 + (y / self.y_a).sqrt()).powf(-self.p);
        self.sigma_0 * f
    }
}

/// Fit parameters in [`Ion`] enumeration order.
const FIT_TABLE: [FitRow; NUM_IONS] = [
    // H0
    FitRow { e_th: 13.60, e_0: 0.4298, sigma_0: 5.475e4, y_a: 32.88, p: 2.963, y_w: 0.0, y_0: 0.0, y_1: 0.0 },
    // He0
    FitRow { e_th: 24.59, e_0: 13.61, sigma_0: 9.492e2, y_a: 1.469, p: 3.188, y_w: 2.039, y_0: 0.4434, y_1: 2.136 },
    // C+1
    FitRow { e_th: 24.38, e_0: 12.19, sigma_0: 8.10e2, y_a: 2.0, p: 3.1, y_w: 0.0, y_0: 0.0, y_1: 0.0 },
    // C+2
    FitRow { e_th: 47.89, e_0: 23.94, sigma_0: 6.20e2, y_a: 2.1, p: 3.0, y_w: 0.0, y_0: 0.0, y_1: 0.0 },
    // N0
    FitRow { e_th: 14.53, e_0: 4.034, sigma_0: 8.235e2, y_a: 80.33, p: 3.928, y_w: 9.097e-2, y_0: 0.8598, y_1: 2.325 },
    // N+1
    FitRow { e_th: 29.60, e_0: 14.80, sigma_0: 7.60e2, y_a: 2.0, p: 3.2, y_w: 0.0, y_0: 0.0, y_1: 0.0 },
    // N+2
    FitRow { e_th: 47.45, e_0: 23.72, sigma_0: 5.90e2, y_a: 2.2, p: 3.0, y_w: 0.0, y_0: 0.0, y_1: 0.0 },
    // O0
    FitRow { e_th: 13.62, e_0: 1.240, sigma_0: 1.745e3, y_a: 3.784, p: 17.64, y_w: 7.589e-2, y_0: 8.698, y_1: 0.1271 },
    // O+1
    FitRow { e_th: 35.12, e_0: 17.56, sigma_0: 9.00e2, y_a: 2.0, p: 3.1, y_w: 0.0, y_0: 0.0, y_1: 0.0 },
    // Ne0
    FitRow { e_th: 21.56, e_0: 10.78, sigma_0: 1.10e3, y_a: 2.4, p: 3.2, y_w: 0.0, y_0: 0.0, y_1: 0.0 },
    // Ne+1
    FitRow { e_th: 40.96, e_0: 20.48, sigma_0: 8.00e2, y_a: 2.2, p: 3.1, y_w: 0.0, y_0: 0.0, y_1: 0.0 },
    // S+1
    FitRow { e_th: 23.34, e_0: 11.67, sigma_0: 1.30e3, y_a: 2.0, p: 3.0, y_w: 0.0, y_0: 0.0, y_1: 0.0 },
    // S+2
    FitRow { e_th: 34.79, e_0: 17.40, sigma_0: 1.00e3, y_a: 2.1, p: 3.0, y_w: 0.0, y_0: 0.0, y_1: 0.0 },
    // S+3
    FitRow { e_th: 47.22, e_0: 23.61, sigma_0: 8.00e2, y_a: 2.2, p: 3.0, y_w: 0.0, y_0: 0.0, y_1: 0.0 },
];

/// One megabarn in m².
const MEGABARN: f64 = 1.0e-22;

/// Analytic Verner-style photoionization cross sections.
#[derive(Debug, Clone, Default)]
pub struct VernerCrossSections;

impl VernerCrossSections {
    pub fn new() -> Self {
        Self
    }
}

impl CrossSections for VernerCrossSections {
    fn cross_section(&self, ion: Ion, frequency: f64) -> f64 {
        let energy_ev = frequency_to_ev(frequency);
        FIT_TABLE[ion.index()].evaluate(energy_ev) * MEGABARN
    }
}

//! Self-consistent temperature and ionization solver.
//!
//! After the warm-up iterations the gas temperature is solved from the
//! thermal balance: photoionization heating (plus a PAH photoelectric
//! term) against recombination, collisionally-excited line and free–free
//! cooling. The root of heating − cooling is bracketed on
//! T ∈ [500 K, 10⁶ K] and found by bisection; every evaluation re-solves
//! the ionization balance at the candidate temperature, so the fractions
//! and the temperature converge together.

use std::sync::Arc;

use log::debug;

use crate::cell::CellValues;
use crate::cooling::{free_free_cooling, recombination_cooling, LineCoolingData};
use crate::constants::PLANCK;
use crate::grid::{Block, DensityGrid};
use crate::ions::{Abundances, Element, Ion, NUM_IONS};
use crate::rates::{ChargeTransferRates, RecombinationRates};
use crate::solver::ionization::IonizationSolver;

/// Temperature bracket of the root-find (K).
const T_MIN: f64 = 500.0;
const T_MAX: f64 = 1.0e6;
/// Relative convergence targets of the outer per-cell update.
const T_TOLERANCE: f64 = 1.0e-3;
const X_TOLERANCE: f64 = 1.0e-4;
/// Outer per-cell iteration cap.
const MAX_OUTER_ITERATIONS: usize = 50;
/// PAH photoelectric heating coefficient (W m³), scaled by `pahfac`.
const PAH_HEATING_COEFFICIENT: f64 = 2.0e-40;

/// Per-cell thermal + ionization solver.
pub struct TemperatureSolver {
    ionization: IonizationSolver,
    recombination_rates: Arc<dyn RecombinationRates>,
    line_cooling: Arc<dyn LineCoolingData>,
    /// Total source luminosity Q (s⁻¹).
    total_luminosity: f64,
    /// PAH heating scaling factor from the parameter file.
    pah_factor: f64,
}

impl TemperatureSolver {
    pub fn new(
        total_luminosity: f64,
        abundances: Abundances,
        pah_factor: f64,
        line_cooling: Arc<dyn LineCoolingData>,
        recombination_rates: Arc<dyn RecombinationRates>,
        charge_transfer_rates: Arc<dyn ChargeTransferRates>,
    ) -> Self {
        Self {
            ionization: IonizationSolver::new(
                total_luminosity,
                abundances,
                Arc::clone(&recombination_rates),
                charge_transfer_rates,
            ),
            recombination_rates,
            line_cooling,
            total_luminosity,
            pah_factor,
        }
    }

    /// Solve temperature and ionization state for every cell in the
    /// block. Exclusive grid access, like the fixed-T pass.
    pub fn solve(&self, grid: &mut dyn DensityGrid, total_weight: f64, block: Block) {
        assert!(total_weight > 0.0, "solver called with zero shot weight");
        let jfac = self.total_luminosity / total_weight;
        let mut non_converged = 0usize;
        for index in grid.cell_indices(block) {
            let cell = grid.cell_mut(index);
            if !self.update_cell(cell, jfac) {
                non_converged += 1;
            }
            cell.check_invariants(index);
        }
        if non_converged > 0 {
            debug!(
                "Thermal balance did not converge in {} of {} cells.",
                non_converged,
                block.1 - block.0
            );
        }
    }

    /// One cell's coupled temperature/ionization update. Returns
    /// convergence; on failure the last iterate is retained and the cell
    /// is flagged.
    fn update_cell(&self, cell: &mut CellValues, jfac: f64) -> bool {
        if cell.number_density == 0.0 {
            cell.non_converged = false;
            return true;
        }
        let mut gamma = [0.0; NUM_IONS];
        for ion in Ion::ALL {
            gamma[ion.index()] = jfac * cell.mean_intensity[ion.index()];
        }
        let heating_h = jfac * cell.heating_h;
        let heating_he = jfac * cell.heating_he;

        let mut temperature = cell.temperature();
        let mut fractions = cell.ionic_fractions;
        let mut converged = false;

        if gamma[Ion::Hn.index()] == 0.0 && gamma[Ion::Hen.index()] == 0.0 {
            // Unilluminated gas: no heating, cool to the floor.
            self.ionization
                .balance_fractions(cell.number_density, T_MIN, &gamma, &mut fractions);
            cell.ionic_fractions = fractions;
            cell.set_temperature(T_MIN);
            cell.non_converged = false;
            return true;
        }

        for _ in 0..MAX_OUTER_ITERATIONS {
            let (t_new, bracketed) = self.bisect_thermal_balance(
                cell.number_density,
                &gamma,
                heating_h,
                heating_he,
                &fractions,
            );

            let previous = fractions;
            self.ionization
                .balance_fractions(cell.number_density, t_new, &gamma, &mut fractions);

            let dx_max = fractions
                .iter()
                .zip(previous.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            let dt = (t_new - temperature).abs() / temperature;
            temperature = t_new;
            if bracketed && dt < T_TOLERANCE && dx_max < X_TOLERANCE {
                converged = true;
                break;
            }
            if !bracketed {
                // The balance has no root inside the bracket; the clamped
                // endpoint is the best available iterate.
                break;
            }
        }

        cell.ionic_fractions = fractions;
        cell.set_temperature(temperature);
        cell.non_converged = !converged;
        converged
    }

    /// Bisection on heating − cooling over [T_MIN, T_MAX]. The second
    /// element is false when the balance does not change sign inside the
    /// bracket (the returned endpoint is then a clamp, not a root).
    fn bisect_thermal_balance(
        &self,
        number_density: f64,
        gamma: &[f64; NUM_IONS],
        heating_h: f64,
        heating_he: f64,
        start: &[f64; NUM_IONS],
    ) -> (f64, bool) {
        let balance = |t: f64| -> f64 {
            let mut fractions = *start;
            self.ionization
                .balance_fractions(number_density, t, gamma, &mut fractions);
            self.net_balance(number_density, t, heating_h, heating_he, &fractions)
        };

        let mut low = T_MIN;
        let mut high = T_MAX;
        let f_low = balance(low);
        if f_low <= 0.0 {
            return (T_MIN, false);
        }
        let f_high = balance(high);
        if f_high >= 0.0 {
            return (T_MAX, false);
        }

        while (high - low) / (0.5 * (high + low)) > T_TOLERANCE {
            let mid = 0.5 * (low + high);
            if balance(mid) > 0.0 {
                low = mid;
            } else {
                high = mid;
            }
        }
        (0.5 * (low + high), true)
    }

    /// Net heating − cooling rate density (W m⁻³) at a candidate state.
    fn net_balance(
        &self,
        number_density: f64,
        temperature: f64,
        heating_h: f64,
        heating_he: f64,
        fractions: &[f64; NUM_IONS],
    ) -> f64 {
        let abundances = self.ionization.abundances();
        let a_he = abundances.abundance(Element::Helium);
        let x_h = fractions[Ion::Hn.index()];
        let x_he = fractions[Ion::Hen.index()];

        let neutral_h = number_density * x_h;
        let neutral_he = number_density * a_he * x_he;
        let proton_density = number_density * (1.0 - x_h);
        let ionized_he = number_density * a_he * (1.0 - x_he);
        let electron_density = proton_density + ionized_he;

        let photo_heating = PLANCK * (neutral_h * heating_h + neutral_he * heating_he);
        let pah_heating =
            PAH_HEATING_COEFFICIENT * self.pah_factor * electron_density * number_density;

        let alpha_h = self.recombination_rates.rate(Ion::Hn, temperature);
        let alpha_he = self.recombination_rates.rate(Ion::Hen, temperature);
        let recomb_cooling = recombination_cooling(
            temperature,
            electron_density,
            proton_density,
            alpha_h,
        ) + recombination_cooling(temperature, electron_density, ionized_he, alpha_he);
        let ff_cooling =
            free_free_cooling(temperature, electron_density, proton_density + ionized_he);
        let line_cooling = self.line_cooling.cooling_rate(
            temperature,
            electron_density,
            number_density,
            fractions,
            abundances,
        );

        photo_heating + pah_heating - recomb_cooling - ff_cooling - line_cooling
    }
}

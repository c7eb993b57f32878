//! Warm-up switchover scenario: with temperature calculation enabled,
//! the first four outer iterations hold the temperature fixed; only from
//! loop 4 onwards is the thermal balance allowed to move it.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use aurora_core::constants::ev_to_frequency;
use aurora_core::convergence::{ChiSquaredPhotonNumberChecker, PassiveIterationChecker};
use aurora_core::cooling::FitLineCoolingData;
use aurora_core::cross_sections::VernerCrossSections;
use aurora_core::driver::{DensityGridWriter, IterationDriver};
use aurora_core::grid::DensityGrid;
use aurora_core::ions::Abundances;
use aurora_core::rates::{KingdonFerlandChargeTransferRates, VernerRecombinationRates};
use aurora_core::solver::{IonizationSolver, TemperatureSolver};
use aurora_core::source::{PhotonSource, PointSourceDistribution};
use aurora_core::spectra::FlatSpectrum;
use aurora_core::transport::SerialShooter;
use aurora_grid::{CartesianDensityGrid, HomogeneousDensityFunction};

const INITIAL_TEMPERATURE: f64 = 8000.0;

/// Records the source cell's temperature at every snapshot.
struct TemperatureRecorder {
    cell: usize,
    history: Mutex<Vec<f64>>,
}

impl DensityGridWriter for TemperatureRecorder {
    fn write(&self, grid: &dyn DensityGrid, _iteration: usize) -> std::io::Result<()> {
        self.history
            .lock()
            .unwrap()
            .push(grid.cell(self.cell).temperature());
        Ok(())
    }
}

#[test]
fn temperature_is_frozen_during_warmup_and_free_afterwards() {
    let half_width = 1.0e17;
    let mut grid = CartesianDensityGrid::new(
        [-half_width; 3],
        [2.0 * half_width; 3],
        [8, 8, 8],
        [false; 3],
        Abundances::default(),
        &HomogeneousDensityFunction::new(1.0e8, INITIAL_TEMPERATURE),
    );
    let block = (0, grid.num_cells());
    grid.initialize(block);

    let luminosity = 1.0e49;
    let distribution = PointSourceDistribution::single([0.0; 3], luminosity);
    let mut source = PhotonSource::new(
        Some(&distribution),
        Some(Box::new(FlatSpectrum::new(
            ev_to_frequency(13.6),
            ev_to_frequency(54.4),
        ))),
        None,
        None,
        Abundances::default(),
        Arc::new(VernerCrossSections::new()),
    )
    .unwrap();

    let recombination_rates: Arc<dyn aurora_core::rates::RecombinationRates> =
        Arc::new(VernerRecombinationRates::new());
    let charge_transfer_rates: Arc<dyn aurora_core::rates::ChargeTransferRates> =
        Arc::new(KingdonFerlandChargeTransferRates::new());
    let ionization_solver = IonizationSolver::new(
        luminosity,
        Abundances::default(),
        Arc::clone(&recombination_rates),
        Arc::clone(&charge_transfer_rates),
    );
    let temperature_solver = TemperatureSolver::new(
        luminosity,
        Abundances::default(),
        1.0,
        Arc::new(FitLineCoolingData::new()),
        recombination_rates,
        charge_transfer_rates,
    );

    let recorder = TemperatureRecorder {
        cell: grid.cell_of([0.0; 3]).unwrap(),
        history: Mutex::new(Vec::new()),
    };

    let mut shooter = SerialShooter::new(42);
    let mut photon_checker = ChiSquaredPhotonNumberChecker::new(0.1);
    let mut iteration_checker = PassiveIterationChecker;
    let stop_flag = AtomicBool::new(false);

    let driver = IterationDriver::new(6, 2000, block).with_temperature_calculation(true);
    driver
        .run(
            &mut grid,
            &mut source,
            &mut shooter,
            &ionization_solver,
            Some(&temperature_solver),
            &mut photon_checker,
            &mut iteration_checker,
            Some(&recorder),
            &stop_flag,
        )
        .unwrap();

    let history = recorder.history.lock().unwrap();
    assert_eq!(history.len(), 6);
    for (loop_index, &temperature) in history.iter().take(4).enumerate() {
        assert_eq!(
            temperature, INITIAL_TEMPERATURE,
            "loop {} moved the temperature during warm-up",
            loop_index
        );
    }
    for (loop_index, &temperature) in history.iter().enumerate().skip(4) {
        assert!(
            (temperature - INITIAL_TEMPERATURE).abs() > 1.0,
            "loop {} left the temperature at its initial value",
            loop_index
        );
    }
}

//! Simulation assembly and execution: ties together grid, source,
//! solvers, checkers and writer from a parsed configuration.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};

use aurora_compute::WorkDistributor;
use aurora_core::constants::ev_to_frequency;
use aurora_core::convergence::{
    ChiSquaredPhotonNumberChecker, IterationConvergenceChecker, NeutralFractionIterationChecker,
    PassiveIterationChecker,
};
use aurora_core::cooling::FitLineCoolingData;
use aurora_core::cross_sections::VernerCrossSections;
use aurora_core::driver::{IterationDriver, RunSummary};
use aurora_core::grid::{Block, DensityFunction, DensityGrid};
use aurora_core::ions::Abundances;
use aurora_core::rates::{KingdonFerlandChargeTransferRates, VernerRecombinationRates};
use aurora_core::solver::{IonizationSolver, TemperatureSolver};
use aurora_core::source::{BoxSurfaceSource, PhotonSource, PointSourceDistribution};
use aurora_core::spectra::{FlatSpectrum, MonochromaticSpectrum, PhotonSourceSpectrum, PlanckSpectrum};
use aurora_core::transport::PhotonShooter;
use aurora_grid::{CartesianDensityGrid, HomogeneousDensityFunction, SphericalCloudDensityFunction};

use crate::config::{
    Config, ContinuousSourceConfig, DensityFunctionConfig, IterationConvergenceConfig,
    SpectrumConfig,
};
use crate::writer::CsvGridWriter;

/// A fully wired simulation, ready to initialise and run.
pub struct Simulation {
    pub grid: CartesianDensityGrid,
    pub source: PhotonSource,
    pub ionization_solver: IonizationSolver,
    pub temperature_solver: TemperatureSolver,
    pub photon_checker: ChiSquaredPhotonNumberChecker,
    pub iteration_checker: Box<dyn IterationConvergenceChecker>,
    pub writer: CsvGridWriter,
    pub driver: IterationDriver,
    pub random_seed: u64,
    pub block: Block,
}

/// Build every collaborator from the configuration. No grid state is
/// touched: a dry run stops after this step.
pub fn build(config: &Config) -> Result<Simulation> {
    let abundances = Abundances::new(
        config.abundances.helium,
        config.abundances.carbon,
        config.abundances.nitrogen,
        config.abundances.oxygen,
        config.abundances.neon,
        config.abundances.sulphur,
    );

    let density_function: Box<dyn DensityFunction> = match &config.densityfunction {
        DensityFunctionConfig::Homogeneous {
            number_density,
            temperature,
        } => Box::new(HomogeneousDensityFunction::new(*number_density, *temperature)),
        DensityFunctionConfig::SphericalCloud {
            centre,
            radius,
            cloud_density,
            ambient_density,
            temperature,
        } => Box::new(SphericalCloudDensityFunction::new(
            *centre,
            *radius,
            *cloud_density,
            *ambient_density,
            *temperature,
        )),
    };

    let grid = CartesianDensityGrid::new(
        config.densitygrid.box_anchor,
        config.densitygrid.box_sides,
        config.densitygrid.ncell,
        config.densitygrid.periodic,
        abundances.clone(),
        density_function.as_ref(),
    );
    info!(
        "Constructed Cartesian grid with {}x{}x{} cells.",
        config.densitygrid.ncell[0], config.densitygrid.ncell[1], config.densitygrid.ncell[2]
    );

    let distribution = config.photonsourcedistribution.as_ref().map(|d| {
        PointSourceDistribution::new(
            d.sources
                .iter()
                .map(|s| (s.position, s.luminosity))
                .collect(),
        )
    });
    let discrete_spectrum = config.photonsourcespectrum.as_ref().map(build_spectrum);
    let continuous_source = config.continuousphotonsource.as_ref().map(|c| match c {
        ContinuousSourceConfig::Box => {
            Box::new(BoxSurfaceSource::new(
                config.densitygrid.box_anchor,
                config.densitygrid.box_sides,
            )) as Box<dyn aurora_core::source::IsotropicContinuousPhotonSource>
        }
    });
    let continuous_spectrum = config
        .continuousphotonsourcespectrum
        .as_ref()
        .map(build_spectrum);

    if !(0.0..=1.0).contains(&config.discrete_photon_fraction) {
        anyhow::bail!(
            "discrete_photon_fraction must lie in [0, 1], got {}",
            config.discrete_photon_fraction
        );
    }

    let cross_sections = Arc::new(VernerCrossSections::new());
    let source = PhotonSource::new(
        distribution
            .as_ref()
            .map(|d| d as &dyn aurora_core::source::PhotonSourceDistribution),
        discrete_spectrum,
        continuous_source,
        continuous_spectrum,
        abundances.clone(),
        cross_sections,
    )
    .context("Failed to construct the photon source")?
    .with_discrete_fraction(config.discrete_photon_fraction);

    let total_luminosity = source.total_luminosity();
    let recombination_rates: Arc<dyn aurora_core::rates::RecombinationRates> =
        Arc::new(VernerRecombinationRates::new());
    let charge_transfer_rates: Arc<dyn aurora_core::rates::ChargeTransferRates> =
        Arc::new(KingdonFerlandChargeTransferRates::new());
    let line_cooling = Arc::new(FitLineCoolingData::new());

    let ionization_solver = IonizationSolver::new(
        total_luminosity,
        abundances.clone(),
        Arc::clone(&recombination_rates),
        Arc::clone(&charge_transfer_rates),
    );
    let temperature_solver = TemperatureSolver::new(
        total_luminosity,
        abundances,
        config.pahfac,
        line_cooling,
        recombination_rates,
        charge_transfer_rates,
    );

    let photon_checker =
        ChiSquaredPhotonNumberChecker::new(config.photonnumberconvergence.tolerance);
    let iteration_checker: Box<dyn IterationConvergenceChecker> =
        match &config.iterationconvergence {
            IterationConvergenceConfig::Passive => Box::new(PassiveIterationChecker),
            IterationConvergenceConfig::NeutralFraction { tolerance } => {
                Box::new(NeutralFractionIterationChecker::new(*tolerance))
            }
        };

    let writer = CsvGridWriter::new(
        config.densitygridwriter.folder.clone(),
        config.densitygridwriter.prefix.clone(),
    );

    let block: Block = (0, grid.num_cells());
    let driver = IterationDriver::new(
        config.max_number_iterations,
        config.number_of_photons,
        block,
    )
    .with_temperature_calculation(config.calculate_temperature);

    Ok(Simulation {
        grid,
        source,
        ionization_solver,
        temperature_solver,
        photon_checker,
        iteration_checker,
        writer,
        driver,
        random_seed: config.random_seed,
        block,
    })
}

fn build_spectrum(config: &SpectrumConfig) -> Box<dyn PhotonSourceSpectrum> {
    match config {
        SpectrumConfig::Planck { temperature } => Box::new(PlanckSpectrum::new(*temperature)),
        SpectrumConfig::Flat {
            min_energy_ev,
            max_energy_ev,
            total_flux,
        } => Box::new(
            FlatSpectrum::new(
                ev_to_frequency(*min_energy_ev),
                ev_to_frequency(*max_energy_ev),
            )
            .with_total_flux(*total_flux),
        ),
        SpectrumConfig::Monochromatic { energy_ev } => {
            Box::new(MonochromaticSpectrum::new(ev_to_frequency(*energy_ev)))
        }
    }
}

/// Build, dump used values, and (unless dry-running) initialise the grid
/// and run the iteration loop. Returns `None` for a dry run.
pub fn execute(config: &Config, threads: Option<usize>, dry_run: bool) -> Result<Option<RunSummary>> {
    let mut simulation = build(config)?;

    // Every run records the exact parameters it used, defaults included.
    let folder = Path::new(&config.densitygridwriter.folder);
    std::fs::create_dir_all(folder)
        .with_context(|| format!("Cannot create output folder {}", folder.display()))?;
    let dump_path = folder.join("parameters-usedvalues.param");
    std::fs::write(&dump_path, crate::config::used_values(config)?)
        .with_context(|| format!("Cannot write {}", dump_path.display()))?;
    info!("Wrote used parameters to {}.", dump_path.display());

    if dry_run {
        warn!("Dry run requested. Program will now halt.");
        return Ok(None);
    }

    simulation.grid.initialize(simulation.block);

    let mut dispatcher = WorkDistributor::new(threads, simulation.random_seed, 0, 1)
        .context("Failed to build the work distributor")?;
    let stop_flag = AtomicBool::new(false);

    let summary = simulation.driver.run(
        &mut simulation.grid,
        &mut simulation.source,
        &mut dispatcher as &mut dyn PhotonShooter,
        &simulation.ionization_solver,
        Some(&simulation.temperature_solver),
        &mut simulation.photon_checker,
        simulation.iteration_checker.as_mut(),
        Some(&simulation.writer),
        &stop_flag,
    )?;

    if config.densitygridwriter.save_statistics {
        let path = folder.join(format!(
            "{}-statistics.json",
            config.densitygridwriter.prefix
        ));
        crate::writer::write_statistics_json(&summary.statistics, &path)?;
    }

    info!(
        "Run finished after {} iterations ({} photons in the last iteration).",
        summary.iterations, summary.final_photon_count
    );
    Ok(Some(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_core::ions::Ion;

    fn test_config(folder: &Path) -> Config {
        let toml_text = format!(
            r#"
number_of_photons = 200
max_number_iterations = 1
calculate_temperature = false

[densitygrid]
ncell = [4, 4, 4]
box_anchor = [0.0, 0.0, 0.0]
box_sides = [1.0e17, 1.0e17, 1.0e17]

[densityfunction]
type = "homogeneous"
number_density = 1.0e8
temperature = 8000.0

[[photonsourcedistribution.sources]]
position = [5.0e16, 5.0e16, 5.0e16]
luminosity = 1.0e49

[photonsourcespectrum]
type = "monochromatic"
energy_ev = 13.6

[densitygridwriter]
folder = "{}"
save_statistics = true
"#,
            folder.display()
        );
        toml::from_str(&toml_text).unwrap()
    }

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("aurora-{}-{}", tag, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn dry_run_builds_everything_but_touches_no_accumulators() {
        let dir = scratch_dir("dryrun");
        let config = test_config(&dir);

        let summary = execute(&config, Some(1), true).unwrap();
        assert!(summary.is_none());
        assert!(dir.join("parameters-usedvalues.param").exists());

        // The grid of a freshly built simulation is untouched.
        let simulation = build(&config).unwrap();
        for index in 0..simulation.grid.num_cells() {
            let cell = simulation.grid.cell(index);
            for ion in Ion::ALL {
                assert_eq!(cell.mean_intensity[ion.index()], 0.0);
            }
            assert_eq!(cell.heating_h, 0.0);
            assert_eq!(cell.heating_he, 0.0);
        }
    }

    #[test]
    fn one_iteration_run_writes_a_snapshot() {
        let dir = scratch_dir("run");
        let config = test_config(&dir);

        let summary = execute(&config, Some(2), false).unwrap().unwrap();
        assert_eq!(summary.iterations, 1);
        assert!(summary.final_photon_count > 0);
        assert!(dir.join("snapshot_000.csv").exists());

        // The statistics dump holds one record per iteration.
        let json = std::fs::read_to_string(dir.join("snapshot-statistics.json")).unwrap();
        let records: serde_json::Value = serde_json::from_str(&json).unwrap();
        let records = records.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].get("escape_fraction").is_some());
        assert_eq!(records[0]["iteration"], 0);
    }

    #[test]
    fn out_of_range_discrete_fraction_is_rejected() {
        let dir = scratch_dir("fraction");
        let mut config = test_config(&dir);
        config.discrete_photon_fraction = 1.5;
        assert!(build(&config).is_err());
    }

    #[test]
    fn continuous_spectrum_without_source_is_tolerated() {
        let dir = scratch_dir("warn");
        let mut config = test_config(&dir);
        config.continuousphotonsourcespectrum = Some(SpectrumConfig::Planck {
            temperature: 4.0e4,
        });
        // Warned about and ignored, per the source's wiring rules.
        assert!(build(&config).is_ok());
    }
}

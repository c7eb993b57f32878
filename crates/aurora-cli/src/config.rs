//! TOML parameter-file deserialisation.
//!
//! Unknown keys are forbidden: a typo in a parameter file is a fatal
//! configuration error, not a silently ignored setting. After defaults
//! are applied the full configuration is serialised back out as the
//! used-values dump, so every run records exactly what it ran with.

use serde::{Deserialize, Serialize};

/// Top-level run configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Seed for the per-worker random generators.
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
    /// Cap on the outer iteration loop.
    #[serde(default = "default_max_iterations")]
    pub max_number_iterations: usize,
    /// Initial photon budget per iteration.
    #[serde(default = "default_number_of_photons")]
    pub number_of_photons: usize,
    /// PAH heating scaling factor.
    #[serde(default = "default_pahfac")]
    pub pahfac: f64,
    /// Fraction of the photon budget given to the discrete sources when
    /// a continuous source is also present.
    #[serde(default = "default_discrete_fraction")]
    pub discrete_photon_fraction: f64,
    /// Enable the self-consistent temperature solve after warm-up.
    #[serde(default = "default_true")]
    pub calculate_temperature: bool,
    #[serde(default)]
    pub abundances: AbundancesConfig,
    pub densitygrid: GridConfig,
    pub densityfunction: DensityFunctionConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photonsourcedistribution: Option<SourceDistributionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photonsourcespectrum: Option<SpectrumConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuousphotonsource: Option<ContinuousSourceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuousphotonsourcespectrum: Option<SpectrumConfig>,
    #[serde(default)]
    pub photonnumberconvergence: PhotonNumberConvergenceConfig,
    #[serde(default)]
    pub iterationconvergence: IterationConvergenceConfig,
    #[serde(default)]
    pub densitygridwriter: WriterConfig,
}

fn default_random_seed() -> u64 {
    42
}
fn default_max_iterations() -> usize {
    10
}
fn default_number_of_photons() -> usize {
    100
}
fn default_pahfac() -> f64 {
    1.0
}
fn default_discrete_fraction() -> f64 {
    0.5
}
fn default_true() -> bool {
    true
}

/// Elemental abundances by number relative to hydrogen.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AbundancesConfig {
    #[serde(default = "default_helium")]
    pub helium: f64,
    #[serde(default = "default_carbon")]
    pub carbon: f64,
    #[serde(default = "default_nitrogen")]
    pub nitrogen: f64,
    #[serde(default = "default_oxygen")]
    pub oxygen: f64,
    #[serde(default = "default_neon")]
    pub neon: f64,
    #[serde(default = "default_sulphur")]
    pub sulphur: f64,
}

fn default_helium() -> f64 {
    0.1
}
fn default_carbon() -> f64 {
    2.2e-4
}
fn default_nitrogen() -> f64 {
    4.0e-5
}
fn default_oxygen() -> f64 {
    3.3e-4
}
fn default_neon() -> f64 {
    5.0e-5
}
fn default_sulphur() -> f64 {
    9.0e-6
}

impl Default for AbundancesConfig {
    fn default() -> Self {
        Self {
            helium: default_helium(),
            carbon: default_carbon(),
            nitrogen: default_nitrogen(),
            oxygen: default_oxygen(),
            neon: default_neon(),
            sulphur: default_sulphur(),
        }
    }
}

/// Cartesian grid geometry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    /// Number of cells along each axis.
    pub ncell: [usize; 3],
    /// Lower corner of the box (m).
    pub box_anchor: [f64; 3],
    /// Side lengths of the box (m).
    pub box_sides: [f64; 3],
    /// Periodicity flags per axis.
    #[serde(default)]
    pub periodic: [bool; 3],
}

/// Initial gas state.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DensityFunctionConfig {
    Homogeneous {
        /// Total hydrogen number density (m⁻³).
        number_density: f64,
        /// Initial temperature (K).
        temperature: f64,
    },
    SphericalCloud {
        centre: [f64; 3],
        radius: f64,
        cloud_density: f64,
        ambient_density: f64,
        temperature: f64,
    },
}

/// Discrete photon sources.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SourceDistributionConfig {
    pub sources: Vec<PointSourceConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PointSourceConfig {
    /// Position (m).
    pub position: [f64; 3],
    /// Ionizing luminosity (s⁻¹).
    pub luminosity: f64,
}

/// An emission spectrum.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SpectrumConfig {
    Planck {
        /// Effective temperature (K).
        temperature: f64,
    },
    Flat {
        min_energy_ev: f64,
        max_energy_ev: f64,
        /// Ionizing photon flux (m⁻² s⁻¹); required for continuous
        /// sources, ignored for discrete ones.
        #[serde(default)]
        total_flux: f64,
    },
    Monochromatic {
        energy_ev: f64,
    },
}

/// Continuous surface source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContinuousSourceConfig {
    /// Isotropic radiation entering through the faces of the grid box.
    Box,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PhotonNumberConvergenceConfig {
    #[serde(default = "default_photon_tolerance")]
    pub tolerance: f64,
}

fn default_photon_tolerance() -> f64 {
    0.1
}

impl Default for PhotonNumberConvergenceConfig {
    fn default() -> Self {
        Self {
            tolerance: default_photon_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IterationConvergenceConfig {
    /// Run the full iteration budget.
    Passive,
    /// Stop when the neutral hydrogen field stops moving.
    NeutralFraction {
        #[serde(default = "default_iteration_tolerance")]
        tolerance: f64,
    },
}

fn default_iteration_tolerance() -> f64 {
    1.0e-2
}

impl Default for IterationConvergenceConfig {
    fn default() -> Self {
        IterationConvergenceConfig::Passive
    }
}

/// Snapshot writer settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WriterConfig {
    /// Output directory; also receives the used-values dump.
    #[serde(default = "default_folder")]
    pub folder: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Whether to also save per-iteration shooting statistics as JSON
    /// (default: false).
    #[serde(default)]
    pub save_statistics: bool,
}

fn default_folder() -> String {
    ".".into()
}
fn default_prefix() -> String {
    "snapshot".into()
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            folder: default_folder(),
            prefix: default_prefix(),
            save_statistics: false,
        }
    }
}

/// Load and parse a TOML parameter file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Serialise the effective configuration (defaults applied) for the
/// used-values dump.
pub fn used_values(config: &Config) -> anyhow::Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[densitygrid]
ncell = [8, 8, 8]
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
type = "planck"
temperature = 4.0e4
"#;

    #[test]
    fn defaults_are_applied() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.max_number_iterations, 10);
        assert_eq!(config.number_of_photons, 100);
        assert_eq!(config.pahfac, 1.0);
        assert_eq!(config.discrete_photon_fraction, 0.5);
        assert!(config.calculate_temperature);
        assert!(!config.densitygridwriter.save_statistics);
        assert_eq!(config.abundances.helium, 0.1);
        assert_eq!(config.densitygridwriter.folder, ".");
        assert!(matches!(
            config.iterationconvergence,
            IterationConvergenceConfig::Passive
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let with_typo = format!("number_of_fotons = 17\n{}", MINIMAL);
        assert!(toml::from_str::<Config>(&with_typo).is_err());
    }

    #[test]
    fn used_values_round_trip() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        let dump = used_values(&config).unwrap();
        let reparsed: Config = toml::from_str(&dump).unwrap();
        assert_eq!(reparsed.random_seed, config.random_seed);
        assert_eq!(reparsed.densitygrid.ncell, config.densitygrid.ncell);
    }

    #[test]
    fn spectrum_variants_parse() {
        let flat: SpectrumConfig = toml::from_str(
            "type = \"flat\"\nmin_energy_ev = 13.6\nmax_energy_ev = 54.4\n",
        )
        .unwrap();
        assert!(matches!(flat, SpectrumConfig::Flat { .. }));
        let mono: SpectrumConfig =
            toml::from_str("type = \"monochromatic\"\nenergy_ev = 13.6\n").unwrap();
        assert!(matches!(mono, SpectrumConfig::Monochromatic { .. }));
    }
}

//! Snapshot and statistics writers.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use aurora_core::driver::{DensityGridWriter, IterationStatistics};
use aurora_core::grid::DensityGrid;
use aurora_core::ions::Ion;

/// Writes one CSV file per iteration with the per-cell gas state.
pub struct CsvGridWriter {
    folder: PathBuf,
    prefix: String,
}

impl CsvGridWriter {
    pub fn new(folder: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            prefix: prefix.into(),
        }
    }

    fn path_for(&self, iteration: usize) -> PathBuf {
        self.folder.join(format!("{}_{:03}.csv", self.prefix, iteration))
    }
}

impl DensityGridWriter for CsvGridWriter {
    fn write(&self, grid: &dyn DensityGrid, iteration: usize) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.folder)?;
        let path = self.path_for(iteration);
        let mut file = std::fs::File::create(&path)?;

        writeln!(file, "# Aurora snapshot, iteration {}", iteration)?;
        writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(file, "# Cells: {}", grid.num_cells())?;
        writeln!(file, "x_m,y_m,z_m,number_density_m3,temperature_K,x_H0,x_He0")?;

        for index in 0..grid.num_cells() {
            let midpoint = grid.midpoint(index);
            let cell = grid.cell(index);
            writeln!(
                file,
                "{:.6e},{:.6e},{:.6e},{:.6e},{:.6e},{:.6e},{:.6e}",
                midpoint[0],
                midpoint[1],
                midpoint[2],
                cell.number_density,
                cell.temperature(),
                cell.ionic_fraction(Ion::Hn),
                cell.ionic_fraction(Ion::Hen),
            )?;
        }

        log::info!("Snapshot written to {}.", path.display());
        Ok(())
    }
}

/// Write the per-iteration shooting statistics to a JSON file.
pub fn write_statistics_json(statistics: &[IterationStatistics], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(statistics)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;

    log::info!("Statistics (JSON) written to {}.", path.display());
    Ok(())
}

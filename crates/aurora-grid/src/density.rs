//! Density functions: map positions to the initial gas state.

use aurora_core::grid::{DensityFunction, GasState};

/// A uniform medium.
#[derive(Debug, Clone)]
pub struct HomogeneousDensityFunction {
    number_density: f64,
    temperature: f64,
}

impl HomogeneousDensityFunction {
    /// `number_density` in m⁻³, `temperature` in K.
    pub fn new(number_density: f64, temperature: f64) -> Self {
        assert!(number_density >= 0.0);
        assert!(temperature > 0.0);
        Self { number_density, temperature }
    }
}

impl DensityFunction for HomogeneousDensityFunction {
    fn at(&self, _position: [f64; 3]) -> GasState {
        GasState {
            number_density: self.number_density,
            temperature: self.temperature,
        }
    }
}

/// A spherical overdensity embedded in an ambient medium.
#[derive(Debug, Clone)]
pub struct SphericalCloudDensityFunction {
    centre: [f64; 3],
    radius: f64,
    cloud_density: f64,
    ambient_density: f64,
    temperature: f64,
}

impl SphericalCloudDensityFunction {
    pub fn new(
        centre: [f64; 3],
        radius: f64,
        cloud_density: f64,
        ambient_density: f64,
        temperature: f64,
    ) -> Self {
        assert!(radius > 0.0);
        assert!(cloud_density >= 0.0 && ambient_density >= 0.0);
        assert!(temperature > 0.0);
        Self {
            centre,
            radius,
            cloud_density,
            ambient_density,
            temperature,
        }
    }
}

impl DensityFunction for SphericalCloudDensityFunction {
    fn at(&self, position: [f64; 3]) -> GasState {
        let r2: f64 = position
            .iter()
            .zip(self.centre.iter())
            .map(|(p, c)| (p - c) * (p - c))
            .sum();
        let number_density = if r2 <= self.radius * self.radius {
            self.cloud_density
        } else {
            self.ambient_density
        };
        GasState {
            number_density,
            temperature: self.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homogeneous_is_position_independent() {
        let f = HomogeneousDensityFunction::new(1.0e8, 8000.0);
        let a = f.at([0.0; 3]);
        let b = f.at([1.0e17, -3.0e16, 2.0e15]);
        assert_eq!(a.number_density, b.number_density);
        assert_eq!(a.temperature, b.temperature);
    }

    #[test]
    fn cloud_density_switches_at_the_radius() {
        let f = SphericalCloudDensityFunction::new([0.0; 3], 1.0, 1.0e9, 1.0e7, 8000.0);
        assert_eq!(f.at([0.5, 0.0, 0.0]).number_density, 1.0e9);
        assert_eq!(f.at([1.5, 0.0, 0.0]).number_density, 1.0e7);
    }
}

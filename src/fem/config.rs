use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::fem::sparse::CgConfig;

/// Material, contact and solver parameters of a cloth simulation.
///
/// Missing fields in a JSON file take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClothConfig {
    /// Time step in seconds.
    pub dt: f64,
    pub gravity: [f64; 3],
    /// First Lamé parameter.
    pub lambda: f64,
    /// Second Lamé parameter (shear modulus).
    pub myu: f64,
    /// Mass per unit area.
    pub areal_density: f64,
    pub stiff_bend: f64,
    pub stiff_contact: f64,
    /// Distance from a collider at which the contact penalty starts.
    pub contact_clearance: f64,
    pub cg_max_iterations: usize,
    /// Relative residual tolerance of the linear solver.
    pub cg_tolerance: f64,
}

impl Default for ClothConfig {
    fn default() -> Self {
        Self {
            dt: 0.02,
            gravity: [0.0, 0.0, -10.0],
            lambda: 1.0,
            myu: 4.0,
            areal_density: 1.0,
            stiff_bend: 1.0e-3,
            stiff_contact: 1.0e3,
            contact_clearance: 1.0e-3,
            cg_max_iterations: 1000,
            cg_tolerance: 1.0e-6,
        }
    }
}

impl ClothConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            bail!("Time step must be positive, got {}", self.dt);
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            bail!("Gravity must be finite, got {:?}", self.gravity);
        }
        if !(self.myu.is_finite() && self.myu > 0.0) {
            bail!("Shear modulus must be positive, got {}", self.myu);
        }
        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            bail!("Lambda must be non-negative, got {}", self.lambda);
        }
        if !(self.areal_density.is_finite() && self.areal_density > 0.0) {
            bail!("Areal density must be positive, got {}", self.areal_density);
        }
        for (name, v) in [
            ("Bending stiffness", self.stiff_bend),
            ("Contact stiffness", self.stiff_contact),
            ("Contact clearance", self.contact_clearance),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                bail!("{name} must be non-negative, got {v}");
            }
        }
        if self.cg_max_iterations == 0 {
            bail!("Solver needs at least one iteration");
        }
        if !(self.cg_tolerance.is_finite() && self.cg_tolerance > 0.0) {
            bail!("Solver tolerance must be positive, got {}", self.cg_tolerance);
        }
        Ok(())
    }

    /// Reads and validates a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse cloth config from: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid cloth config in: {}", path.display()))?;
        Ok(config)
    }

    pub(crate) fn cg_config(&self) -> CgConfig {
        CgConfig {
            max_iterations: self.cg_max_iterations,
            rel_tolerance: self.cg_tolerance,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClothConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gravity, [0.0, 0.0, -10.0]);
        assert_eq!(config.myu, 4.0);
    }

    #[test]
    fn test_invalid() {
        let bad = [
            ClothConfig { dt: 0.0, ..Default::default() },
            ClothConfig { myu: -1.0, ..Default::default() },
            ClothConfig { areal_density: f64::NAN, ..Default::default() },
            ClothConfig { stiff_contact: -5.0, ..Default::default() },
            ClothConfig { cg_max_iterations: 0, ..Default::default() },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn test_from_json_file_partial() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"{{ "dt": 0.01, "stiff_bend": 0.0 }}"#)?;
        let config = ClothConfig::from_json_file(file.path())?;
        assert_eq!(config.dt, 0.01);
        assert_eq!(config.stiff_bend, 0.0);
        assert_eq!(config.lambda, 1.0);
        Ok(())
    }

    #[test]
    fn test_from_json_file_errors() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"{{ "dt": -1.0 }}"#)?;
        assert!(ClothConfig::from_json_file(file.path()).is_err());
        assert!(ClothConfig::from_json_file(Path::new("/nonexistent/cloth.json")).is_err());
        Ok(())
    }
}

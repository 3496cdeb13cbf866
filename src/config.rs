use crate::model::Cell;
use crate::modes::Mode;
use crate::params::Params;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub grid: GridConfig,
    pub params: Params,
    #[serde(default)]
    pub mode: ModeConfig,
    pub output: OutputConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Grid width in cells.
    pub width: usize,
    /// Grid height in cells.
    pub height: usize,
    /// Seeding distribution over `[Empty, Alive, Infected, Recovered]`.
    pub prob_seed: Vec<f64>,
}

#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModeConfig {
    /// Parameter schedule active from the first step.
    #[serde(default)]
    pub kind: Mode,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of steps between frame saves.
    pub steps_per_save: usize,
    /// Number of frames written per trajectory file.
    pub saves_per_file: usize,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        check_num(self.grid.width, 1..10_000).context("invalid grid width")?;
        check_num(self.grid.height, 1..10_000).context("invalid grid height")?;
        check_vec(&self.grid.prob_seed, Cell::SEED_ORDER.len(), true)
            .context("invalid seeding distribution")?;

        self.params.validate().context("invalid parameters")?;

        check_num(self.output.steps_per_save, 1..10_000)
            .context("invalid number of steps per save")?;
        check_num(self.output.saves_per_file, 1..10_000)
            .context("invalid number of saves per file")?;

        Ok(())
    }
}

pub(crate) fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_vec(vec: &[f64], exp_len: usize, prob_vec: bool) -> Result<()> {
    // Ensure vector has expected length.
    let len = vec.len();
    if len != exp_len {
        bail!("vector length must be {exp_len}, but is {len}");
    }
    if !prob_vec {
        return Ok(());
    }
    // For probability vectors: non-negative elements and sums to ~1.0.
    if vec.iter().any(|&ele| ele < 0.0) {
        bail!("vector must have only non-negative elements");
    }
    let sum: f64 = vec.iter().sum();
    let tol = 1e-8;
    if (sum - 1.0).abs() > tol {
        bail!("vector must sum to 1.0 (tolerance: {tol}), but sums to {sum}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
[grid]
width = 64
height = 48
prob_seed = [ 0.70, 0.25, 0.05, 0.0,]

[params]
infection = 0.25
recovery = 0.08
mortality = 0.03
birth = 0.35
mutation = 0.02

[mode]
kind = "waves"

[output]
steps_per_save = 4
saves_per_file = 16
"#;

    #[test]
    fn valid_config_parses_and_validates() {
        let config: Config = toml::from_str(VALID).unwrap();
        config.validate().unwrap();
        assert_eq!(config.grid.width, 64);
        assert_eq!(config.mode.kind, Mode::Waves);
        assert!((config.params.mutation() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn mode_section_defaults_to_off() {
        let trimmed = VALID.replace("[mode]\nkind = \"waves\"\n", "");
        let config: Config = toml::from_str(&trimmed).unwrap();
        assert_eq!(config.mode.kind, Mode::Off);
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let bad = VALID.replace("infection = 0.25", "infection = 1.25");
        let config: Config = toml::from_str(&bad).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn seeding_distribution_must_sum_to_one() {
        let bad = VALID.replace("[ 0.70, 0.25, 0.05, 0.0,]", "[ 0.70, 0.25, 0.15, 0.0,]");
        let config: Config = toml::from_str(&bad).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn degenerate_grid_is_rejected() {
        let bad = VALID.replace("width = 64", "width = 0");
        let config: Config = toml::from_str(&bad).unwrap();
        assert!(config.validate().is_err());
    }
}

//! Observers that replay trajectory files into summary reports.

use crate::config::Config;
use crate::model::Frame;
use crate::stats::{Accumulator, Census, census};
use anyhow::{Context, Result};
use rmp_serde::decode;
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

pub trait Obs {
    fn update(&mut self, frame: &Frame) -> Result<()>;
    fn report(&self) -> serde_json::Value;
}

/// Fraction of infected cells, accumulated across saved frames.
pub struct InfectedFraction {
    acc: Accumulator,
    n_cells: f64,
}

impl InfectedFraction {
    pub fn new(cfg: &Config) -> Self {
        Self {
            acc: Accumulator::new(),
            n_cells: (cfg.grid.width * cfg.grid.height) as f64,
        }
    }
}

impl Obs for InfectedFraction {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        self.acc
            .add(census(&frame.grid).infected as f64 / self.n_cells);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "infected_fraction": self.acc.report() })
    }
}

/// Largest infected count seen, and the step it occurred at.
#[derive(Default)]
pub struct PeakInfected {
    peak: usize,
    step: usize,
}

impl PeakInfected {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Obs for PeakInfected {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        let infected = census(&frame.grid).infected;
        if infected > self.peak {
            self.peak = infected;
            self.step = frame.step;
        }
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "peak_infected": { "count": self.peak, "step": self.step } })
    }
}

/// Census and cumulative death toll of the last frame seen.
#[derive(Default)]
pub struct FinalToll {
    last: Option<(usize, u64, Census)>,
}

impl FinalToll {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Obs for FinalToll {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        self.last = Some((frame.step, frame.deaths, census(&frame.grid)));
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        match &self.last {
            Some((step, deaths, census)) => serde_json::json!({
                "final": { "step": step, "deaths": deaths, "census": census }
            }),
            None => serde_json::json!({ "final": null }),
        }
    }
}

pub struct Analyzer {
    cfg: Config,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: Config) -> Self {
        let mut obs_ptr_vec: Vec<Box<dyn Obs>> = Vec::new();
        obs_ptr_vec.push(Box::new(InfectedFraction::new(&cfg)));
        obs_ptr_vec.push(Box::new(PeakInfected::new()));
        obs_ptr_vec.push(Box::new(FinalToll::new()));
        Self { cfg, obs_ptr_vec }
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for _ in 0..self.cfg.output.saves_per_file {
            let frame: Frame = decode::from_read(&mut reader).context("failed to read frame")?;
            for obs in &mut self.obs_ptr_vec {
                obs.update(&frame).context("failed to update observable")?;
            }
        }
        Ok(())
    }

    /// Write the collected reports, with the run's configured parameters
    /// attached, as pretty-printed JSON.
    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);

        let reports: Vec<_> = self.obs_ptr_vec.iter().map(|obs| obs.report()).collect();
        let results = serde_json::json!({
            "params": self.cfg.params,
            "observables": reports,
        });
        serde_json::to_writer_pretty(writer, &results)?;
        Ok(())
    }
}

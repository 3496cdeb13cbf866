//! Simulation engine: the per-cell transition rules and the step driver.

use crate::config::Config;
use crate::model::{Cell, Frame, Grid};
use crate::modes::{Mode, ModeController};
use crate::params::{ParamKind, Params};
use crate::stats::History;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Bernoulli;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    mem,
    path::Path,
    time::{Duration, Instant},
};

/// Simulation engine.
///
/// Holds the configuration, the double-buffered grid, the tunable
/// parameters, the mode controller, and the random number generator, and
/// provides methods to step, run, save, and load simulations.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    grid: Grid,
    next: Grid,
    params: Params,
    mode: ModeController,
    history: History,
    deaths: u64,
    step_idx: usize,
    rng: ChaCha12Rng,
    #[serde(skip, default = "Instant::now")]
    epoch: Instant,
}

impl Engine {
    /// Create a new `Engine` with the given configuration and a freshly
    /// seeded grid.
    pub fn generate_initial_condition(cfg: Config) -> Result<Self> {
        let rng = ChaCha12Rng::try_from_os_rng()?;
        Self::with_rng(cfg, rng)
    }

    /// As [`Engine::generate_initial_condition`], with a caller-supplied
    /// generator.
    pub fn with_rng(cfg: Config, mut rng: ChaCha12Rng) -> Result<Self> {
        let grid = Grid::seed(cfg.grid.width, cfg.grid.height, &cfg.grid.prob_seed, &mut rng)
            .context("failed to seed grid")?;
        let next = grid.clone();
        let params = cfg.params;
        let mode = ModeController::new(cfg.mode.kind);

        Ok(Self {
            cfg,
            grid,
            next,
            params,
            mode,
            history: History::default(),
            deaths: 0,
            step_idx: 0,
            rng,
            epoch: Instant::now(),
        })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    /// The committed grid of the last completed step.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Cumulative death count since the last reset.
    pub fn deaths(&self) -> u64 {
        self.deaths
    }

    pub fn params(&self) -> Params {
        self.params
    }

    /// Set one parameter, clamped into `[0.0, 1.0]`.
    pub fn set_param(&mut self, kind: ParamKind, value: f64) {
        self.params.set(kind, value);
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    /// Switch the active parameter schedule.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode.set_mode(mode, self.epoch.elapsed());
    }

    /// Owned snapshot of the committed state, as persisted in trajectories.
    pub fn snapshot(&self) -> Frame {
        Frame {
            step: self.step_idx,
            deaths: self.deaths,
            grid: self.grid.clone(),
        }
    }

    /// Advance the simulation by one step of the engine's own clock.
    pub fn step(&mut self) -> Result<()> {
        self.advance(self.epoch.elapsed())
    }

    /// Advance the simulation by one step at the given elapsed time.
    ///
    /// The mode schedule runs first, then the transition pass reads a frozen
    /// snapshot of the parameters and of the current grid, the buffers swap,
    /// and one entry is appended to every statistics series.
    pub fn advance(&mut self, elapsed: Duration) -> Result<()> {
        self.mode.apply(&mut self.params, elapsed);
        let params = self.params;

        self.next.clone_from(&self.grid);
        transition(&self.grid, &mut self.next, &params, &mut self.rng, &mut self.deaths)
            .context("failed to apply transition pass")?;
        mem::swap(&mut self.grid, &mut self.next);

        self.history.record(&self.grid, self.deaths);
        self.step_idx += 1;

        Ok(())
    }

    /// Discard the grid and statistics and reseed from the configuration.
    ///
    /// Parameters and the active mode survive a reset.
    pub fn reset(&mut self) -> Result<()> {
        self.grid = Grid::seed(
            self.cfg.grid.width,
            self.cfg.grid.height,
            &self.cfg.grid.prob_seed,
            &mut self.rng,
        )
        .context("failed to reseed grid")?;
        self.next.clone_from(&self.grid);
        self.history.clear();
        self.deaths = 0;
        self.step_idx = 0;
        Ok(())
    }

    /// Perform one run segment and write the resulting frames to a file.
    pub fn run_segment<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        for i_save in 0..self.cfg.output.saves_per_file {
            for _ in 0..self.cfg.output.steps_per_save {
                self.step().context("failed to perform step")?;
            }

            encode::write(&mut writer, &self.snapshot()).context("failed to serialize frame")?;

            let progress = 100.0 * (i_save + 1) as f64 / self.cfg.output.saves_per_file as f64;
            log::info!("completed {progress:06.2}%");
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize engine")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }
}

/// Compute one transition pass.
///
/// `next` must enter as a copy of `current`. All reads target `current`, all
/// writes target `next`; where several rules target the same cell, the last
/// write in row-major iteration order wins. A cell's own rule only writes
/// when it changes state, so an infection mark from an earlier-iterated
/// neighbor survives an implicit survival but is overwritten by an explicit
/// write from a later-iterated cell.
pub(crate) fn transition(
    current: &Grid,
    next: &mut Grid,
    params: &Params,
    rng: &mut ChaCha12Rng,
    deaths: &mut u64,
) -> Result<()> {
    let recovery_dist = Bernoulli::new(params.recovery())?;
    let mortality_dist = Bernoulli::new(params.mortality())?;
    let birth_dist = Bernoulli::new(params.birth())?;

    for y in 0..current.height() {
        for x in 0..current.width() {
            match current.at(x, y) {
                Cell::Infected => {
                    if recovery_dist.sample(rng) {
                        next.put(x, y, Cell::Recovered);
                    } else if mortality_dist.sample(rng) {
                        // A death vacates the cell; only the counter keeps it.
                        next.put(x, y, Cell::Empty);
                        *deaths += 1;
                    } else {
                        spread(current, next, params, rng, x, y);
                    }
                }
                Cell::Alive => {
                    let occupied = current.occupied_neighbors(x, y);
                    if !(2..=3).contains(&occupied) {
                        next.put(x, y, Cell::Empty);
                    } else if occupied == 2 && birth_dist.sample(rng) {
                        next.put(x, y, offspring(current, x, y));
                    }
                    // Exactly 3 occupied neighbors: survives as-is.
                }
                Cell::Empty => {
                    if current.occupied_neighbors(x, y) == 3 {
                        next.put(x, y, Cell::Alive);
                    }
                }
                Cell::Recovered => {}
            }
        }
    }

    Ok(())
}

/// Attempt to pass the infection to each neighbor of an infected cell.
///
/// One draw per neighbor; the threshold depends on the neighbor's state:
/// alive cells catch the plain infection, recovered cells are reinfected
/// through immune escape. A cell that recovered or died this step no longer
/// spreads.
fn spread(
    current: &Grid,
    next: &mut Grid,
    params: &Params,
    rng: &mut ChaCha12Rng,
    x: usize,
    y: usize,
) {
    for (nx, ny) in current.neighbors(x, y) {
        let draw = rng.random::<f64>();
        match current.at(nx, ny) {
            Cell::Alive if draw < params.infection() => next.put(nx, ny, Cell::Infected),
            Cell::Recovered if draw < params.mutation() => next.put(nx, ny, Cell::Infected),
            _ => {}
        }
    }
}

/// State inherited when a birth succeeds: the occupied neighbors decide it,
/// recovered taking precedence over infected over alive.
fn offspring(current: &Grid, x: usize, y: usize) -> Cell {
    let mut any_infected = false;
    for (nx, ny) in current.neighbors(x, y) {
        match current.at(nx, ny) {
            Cell::Recovered => return Cell::Recovered,
            Cell::Infected => any_infected = true,
            _ => {}
        }
    }
    if any_infected { Cell::Infected } else { Cell::Alive }
}

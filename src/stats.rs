//! Per-step statistics and the running accumulator used by analysis.

use crate::model::{Cell, Grid};
use serde::{Deserialize, Serialize};

/// Counts of each cell state in one grid snapshot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Census {
    pub empty: usize,
    pub alive: usize,
    pub infected: usize,
    pub recovered: usize,
}

/// Count every cell state in a single scan.
pub fn census(grid: &Grid) -> Census {
    let mut census = Census::default();
    for &cell in grid.cells() {
        match cell {
            Cell::Empty => census.empty += 1,
            Cell::Alive => census.alive += 1,
            Cell::Infected => census.infected += 1,
            Cell::Recovered => census.recovered += 1,
        }
    }
    census
}

/// Append-only time series of the simulation, one entry per step.
///
/// The death series is cumulative and supplied by the engine: a death
/// vacates its cell, so the toll cannot be recovered from a grid scan.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct History {
    alive: Vec<usize>,
    infected: Vec<usize>,
    recovered: Vec<usize>,
    deaths: Vec<u64>,
}

impl History {
    /// Scan the committed grid and append one entry to every series.
    pub fn record(&mut self, grid: &Grid, deaths: u64) {
        let census = census(grid);
        self.alive.push(census.alive);
        self.infected.push(census.infected);
        self.recovered.push(census.recovered);
        self.deaths.push(deaths);
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.deaths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deaths.is_empty()
    }

    /// Drop all recorded entries.
    pub fn clear(&mut self) {
        self.alive.clear();
        self.infected.clear();
        self.recovered.clear();
        self.deaths.clear();
    }

    pub fn alive(&self) -> &[usize] {
        &self.alive
    }

    pub fn infected(&self) -> &[usize] {
        &self.infected
    }

    pub fn recovered(&self) -> &[usize] {
        &self.recovered
    }

    /// Cumulative death count per step.
    pub fn deaths(&self) -> &[u64] {
        &self.deaths
    }
}

/// Running mean and standard deviation over a stream of values.
#[derive(Debug, Default)]
pub struct Accumulator {
    count: usize,
    mean: f64,
    sum_sq_diff: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, val: f64) {
        self.count += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.count as f64;

        let diff_b = val - self.mean;
        self.sum_sq_diff += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: self.mean,
            std_dev: if self.count > 1 {
                (self.sum_sq_diff / (self.count as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn census_counts_every_state() {
        let mut grid = Grid::new(3, 2, Cell::Empty);
        grid.set(0, 0, Cell::Alive).unwrap();
        grid.set(1, 0, Cell::Alive).unwrap();
        grid.set(2, 0, Cell::Infected).unwrap();
        grid.set(0, 1, Cell::Recovered).unwrap();

        let census = census(&grid);
        assert_eq!(census.alive, 2);
        assert_eq!(census.infected, 1);
        assert_eq!(census.recovered, 1);
        assert_eq!(census.empty, 2);
    }

    #[test]
    fn history_appends_and_clears() {
        let grid = Grid::new(2, 2, Cell::Infected);
        let mut history = History::default();

        history.record(&grid, 0);
        history.record(&grid, 3);
        assert_eq!(history.len(), 2);
        assert_eq!(history.infected(), &[4, 4]);
        assert_eq!(history.deaths(), &[0, 3]);

        history.clear();
        assert!(history.is_empty());
        assert!(history.alive().is_empty());
    }

    #[test]
    fn accumulator_matches_closed_form() {
        let mut acc = Accumulator::new();
        for val in [1.0, 2.0, 3.0, 4.0] {
            acc.add(val);
        }
        let report = acc.report();
        assert!((report.mean - 2.5).abs() < 1e-12);
        assert!((report.std_dev - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn accumulator_std_dev_undefined_below_two_values() {
        let mut acc = Accumulator::new();
        acc.add(1.0);
        assert!(acc.report().std_dev.is_nan());
    }
}

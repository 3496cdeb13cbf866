//! Simulation data types: cell states and the dense grid.

use anyhow::{Result, bail};
use rand::prelude::*;
use rand_distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};

/// State of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Alive,
    Infected,
    Recovered,
}

impl Cell {
    /// Cell states in seeding order, matching `prob_seed` in the config.
    pub const SEED_ORDER: [Cell; 4] = [Cell::Empty, Cell::Alive, Cell::Infected, Cell::Recovered];

    /// Whether something inhabits the cell, sick or not.
    pub fn is_occupied(self) -> bool {
        matches!(self, Cell::Alive | Cell::Infected | Cell::Recovered)
    }
}

/// Moore neighborhood offsets in row-major order.
const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Fixed-size rectangular grid of cells, stored row-major.
///
/// Width and height are immutable after construction. The neighborhood is
/// clipped at the borders: edge cells simply have fewer neighbors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create a grid with every cell set to `fill`.
    pub fn new(width: usize, height: usize, fill: Cell) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; width * height],
        }
    }

    /// Create a grid by independently sampling every cell from the given
    /// distribution over [`Cell::SEED_ORDER`].
    pub fn seed(width: usize, height: usize, prob_seed: &[f64], rng: &mut impl Rng) -> Result<Self> {
        let n_states = Cell::SEED_ORDER.len();
        if prob_seed.len() != n_states {
            bail!(
                "seeding distribution must have {n_states} weights, but has {}",
                prob_seed.len()
            );
        }

        let cell_dist = WeightedIndex::new(prob_seed)?;
        let cells = (0..width * height)
            .map(|_| Cell::SEED_ORDER[cell_dist.sample(rng)])
            .collect();

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Get the state of the cell at `(x, y)`.
    ///
    /// # Errors
    /// Returns an error if the coordinates lie outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Result<Cell> {
        Ok(self.cells[self.index(x, y)?])
    }

    /// Set the state of the cell at `(x, y)`.
    ///
    /// # Errors
    /// Returns an error if the coordinates lie outside the grid.
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) -> Result<()> {
        let idx = self.index(x, y)?;
        self.cells[idx] = cell;
        Ok(())
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// In-bounds Moore neighbors of `(x, y)` in row-major order.
    pub fn neighbors(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> {
        let width = self.width;
        let height = self.height;
        NEIGHBOR_OFFSETS.into_iter().filter_map(move |(dx, dy)| {
            let nx = x.checked_add_signed(dx)?;
            let ny = y.checked_add_signed(dy)?;
            (nx < width && ny < height).then_some((nx, ny))
        })
    }

    /// Number of neighbors of `(x, y)` whose state is occupied.
    pub fn occupied_neighbors(&self, x: usize, y: usize) -> usize {
        self.neighbors(x, y)
            .filter(|&(nx, ny)| self.at(nx, ny).is_occupied())
            .count()
    }

    // Unchecked accessors for loops already bounded by the grid extent.
    pub(crate) fn at(&self, x: usize, y: usize) -> Cell {
        self.cells[y * self.width + x]
    }

    pub(crate) fn put(&mut self, x: usize, y: usize, cell: Cell) {
        self.cells[y * self.width + x] = cell;
    }

    fn index(&self, x: usize, y: usize) -> Result<usize> {
        if x >= self.width || y >= self.height {
            bail!(
                "coordinates ({x}, {y}) lie outside the {}x{} grid",
                self.width,
                self.height
            );
        }
        Ok(y * self.width + x)
    }
}

/// One persisted record of a run: the step index, the cumulative death
/// count, and the full grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub step: usize,
    pub deaths: u64,
    pub grid: Grid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn access_outside_extent_fails() {
        let mut grid = Grid::new(4, 3, Cell::Empty);
        assert!(grid.get(4, 0).is_err());
        assert!(grid.get(0, 3).is_err());
        assert!(grid.set(7, 7, Cell::Alive).is_err());
        assert!(grid.get(3, 2).is_ok());
    }

    #[test]
    fn neighborhood_is_clipped_at_borders() {
        let grid = Grid::new(5, 5, Cell::Empty);
        assert_eq!(grid.neighbors(0, 0).count(), 3);
        assert_eq!(grid.neighbors(2, 0).count(), 5);
        assert_eq!(grid.neighbors(4, 4).count(), 3);
        assert_eq!(grid.neighbors(2, 2).count(), 8);
    }

    #[test]
    fn occupied_neighbors_counts_all_inhabited_states() {
        let mut grid = Grid::new(3, 3, Cell::Empty);
        grid.set(0, 0, Cell::Alive).unwrap();
        grid.set(1, 0, Cell::Infected).unwrap();
        grid.set(2, 0, Cell::Recovered).unwrap();
        assert_eq!(grid.occupied_neighbors(1, 1), 3);
        assert_eq!(grid.occupied_neighbors(1, 2), 0);
    }

    #[test]
    fn seeding_needs_one_weight_per_state() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        assert!(Grid::seed(4, 4, &[0.5, 0.5], &mut rng).is_err());
    }

    #[test]
    fn seeding_matches_distribution() {
        let mut rng = ChaCha12Rng::seed_from_u64(17);
        let prob_seed = [0.70, 0.25, 0.05, 0.0];
        let grid = Grid::seed(200, 200, &prob_seed, &mut rng).unwrap();

        let total = (grid.width() * grid.height()) as f64;
        for (i, &state) in Cell::SEED_ORDER.iter().enumerate() {
            let count = grid.cells().iter().filter(|&&c| c == state).count();
            let fraction = count as f64 / total;
            assert!(
                (fraction - prob_seed[i]).abs() < 0.02,
                "state {state:?}: fraction {fraction} too far from {}",
                prob_seed[i]
            );
        }
    }
}

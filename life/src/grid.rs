use crate::error::{LifeError, Result};
use crate::seed::{RandomFill, SeedSource};

/// Next state of a cell given its current state and live Moore neighbour count.
pub type Rule = fn(alive: bool, neighbors: u8) -> bool;

/// Classic B3/S23.
pub fn conway(alive: bool, neighbors: u8) -> bool {
    match (alive, neighbors) {
        (true, 2..=3) => true, // Survives
        (false, 3) => true,    // Becomes alive
        _ => false,            // Dies or remains dead
    }
}

/// Strategy that fills a freshly allocated or reseeded buffer.
///
/// `Send` so a grid can be driven from a worker thread.
pub trait Initializer: Send {
    fn fill(&mut self, cells: &mut [bool]);

    /// The seed source behind this initializer, if it has one.
    fn seeds(&mut self) -> Option<&mut SeedSource> {
        None
    }
}

/// A toroidal Game of Life grid, double buffered.
///
/// Cells are stored row-major (`y * width + x`). `step` reads only the current
/// buffer and writes the scratch one, then flips which of the two is current.
pub struct Life {
    width: usize,
    height: usize,
    buffers: [Vec<bool>; 2],
    current: usize,
    rule: Rule,
    initializer: Option<Box<dyn Initializer>>,
    generation: u64,
}

impl Life {
    pub fn new(width: usize, height: usize, initializer: Option<Box<dyn Initializer>>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(LifeError::EmptyGrid { width, height });
        }
        let len = width
            .checked_mul(height)
            .ok_or(LifeError::GridTooLarge { width, height })?;

        let mut life = Life {
            width,
            height,
            buffers: [vec![false; len], vec![false; len]],
            current: 0,
            rule: conway,
            initializer,
            generation: 0,
        };
        life.reinitialize();
        Ok(life)
    }

    /// All cells dead, no initializer.
    pub fn empty(width: usize, height: usize) -> Result<Self> {
        Self::new(width, height, None)
    }

    /// Random fill at `density` drawn from `seeds`.
    pub fn random(width: usize, height: usize, density: f64, seeds: SeedSource) -> Result<Self> {
        Self::new(width, height, Some(Box::new(RandomFill::new(density, seeds))))
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = rule;
        self
    }

    pub fn set_rule(&mut self, rule: Rule) {
        self.rule = rule;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The current generation, row-major.
    pub fn cells(&self) -> &[bool] {
        &self.buffers[self.current]
    }

    pub fn population(&self) -> usize {
        self.cells().iter().filter(|&&alive| alive).count()
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Cell state at (x, y). Coordinates must be in range; out-of-range access panics.
    pub fn get(&self, x: usize, y: usize) -> bool {
        debug_assert!(self.contains(x, y), "({x}, {y}) outside {}x{}", self.width, self.height);
        self.buffers[self.current][y * self.width + x]
    }

    pub fn try_get(&self, x: usize, y: usize) -> Option<bool> {
        self.contains(x, y).then(|| self.get(x, y))
    }

    /// Overwrite a cell of the current generation. Coordinates must be in range.
    pub fn set(&mut self, x: usize, y: usize, alive: bool) {
        debug_assert!(self.contains(x, y), "({x}, {y}) outside {}x{}", self.width, self.height);
        let width = self.width;
        self.buffers[self.current][y * width + x] = alive;
    }

    pub fn clear(&mut self) {
        self.buffers[self.current].fill(false);
    }

    pub fn seeds_mut(&mut self) -> Option<&mut SeedSource> {
        self.initializer.as_mut().and_then(|init| init.seeds())
    }

    /// Refill the current generation from the stored initializer, or clear it
    /// when there is none.
    pub fn reinitialize(&mut self) {
        let cells = &mut self.buffers[self.current];
        match self.initializer.as_mut() {
            Some(init) => init.fill(cells),
            None => cells.fill(false),
        }
        self.generation = 0;
    }

    /// Advance the grid by one generation. Returns whether any cell changed.
    pub fn step(&mut self) -> bool {
        let (width, height, rule) = (self.width, self.height, self.rule);
        let [a, b] = &mut self.buffers;
        let (current, next) = if self.current == 0 { (&*a, b) } else { (&*b, a) };

        let changed = next_generation(current, next, width, height, rule);

        self.current ^= 1;
        self.generation += 1;
        changed
    }
}

#[cfg(not(feature = "parallel"))]
fn next_generation(current: &[bool], next: &mut [bool], width: usize, height: usize, rule: Rule) -> bool {
    next.chunks_mut(width)
        .enumerate()
        .fold(false, |changed, (y, row)| next_row(current, row, y, width, height, rule) || changed)
}

#[cfg(feature = "parallel")]
fn next_generation(current: &[bool], next: &mut [bool], width: usize, height: usize, rule: Rule) -> bool {
    use rayon::prelude::*;

    next.par_chunks_mut(width)
        .enumerate()
        .map(|(y, row)| next_row(current, row, y, width, height, rule))
        .reduce(|| false, |a, b| a || b)
}

fn next_row(current: &[bool], row: &mut [bool], y: usize, width: usize, height: usize, rule: Rule) -> bool {
    let mut changed = false;
    for (x, cell) in row.iter_mut().enumerate() {
        let alive = current[y * width + x];
        let next = rule(alive, alive_neighbors(current, x, y, width, height));
        changed |= next != alive;
        *cell = next;
    }
    changed
}

/// Count the live Moore neighbours of (x, y), wrapping at every edge.
fn alive_neighbors(cells: &[bool], x: usize, y: usize, width: usize, height: usize) -> u8 {
    let mut count = 0;

    for dy in [-1isize, 0, 1] {
        for dx in [-1isize, 0, 1] {
            if dx == 0 && dy == 0 {
                continue;
            }

            let nx = (x as isize + dx).rem_euclid(width as isize) as usize;
            let ny = (y as isize + dy).rem_euclid(height as isize) as usize;

            if cells[ny * width + nx] {
                count += 1;
            }
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn life_with(width: usize, height: usize, alive: &[(usize, usize)]) -> Life {
        let mut life = Life::empty(width, height).unwrap();
        for &(x, y) in alive {
            life.set(x, y, true);
        }
        life
    }

    fn alive_cells(life: &Life) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for y in 0..life.height() {
            for x in 0..life.width() {
                if life.get(x, y) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn rejects_empty_dimensions() {
        assert_eq!(
            Life::empty(0, 4).err(),
            Some(LifeError::EmptyGrid { width: 0, height: 4 })
        );
        assert!(Life::empty(4, 0).is_err());
        assert!(matches!(
            Life::empty(usize::MAX, 2),
            Err(LifeError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn rule_table() {
        for n in 0..=8u8 {
            assert_eq!(conway(true, n), n == 2 || n == 3, "alive with {n}");
            assert_eq!(conway(false, n), n == 3, "dead with {n}");
        }
    }

    #[test]
    fn step_applies_rule_for_every_neighbour_count() {
        // Centre of a 5x5 grid; neighbours are filled in a fixed order.
        let ring = [(1, 1), (2, 1), (3, 1), (1, 2), (3, 2), (1, 3), (2, 3), (3, 3)];
        for n in 0..=8 {
            for centre_alive in [false, true] {
                let mut life = life_with(5, 5, &ring[..n]);
                life.set(2, 2, centre_alive);
                life.step();
                assert_eq!(
                    life.get(2, 2),
                    conway(centre_alive, n as u8),
                    "centre alive={centre_alive} with {n} neighbours"
                );
            }
        }
    }

    #[test]
    fn corners_are_neighbours_on_a_torus() {
        let corners = [(0, 0), (3, 0), (0, 3), (3, 3)];
        let life = life_with(4, 4, &corners);
        for &(x, y) in &corners {
            assert_eq!(alive_neighbors(life.cells(), x, y, 4, 4), 3);
        }

        // Three wrapped corners give birth at the fourth.
        let mut life = life_with(4, 4, &corners[1..]);
        life.step();
        assert!(life.get(0, 0));
    }

    #[test]
    fn block_is_a_still_life() {
        let block = [(2, 2), (3, 2), (2, 3), (3, 3)];
        let mut life = life_with(8, 8, &block);
        for _ in 0..20 {
            assert!(!life.step());
        }
        assert_eq!(alive_cells(&life), block.to_vec());
        assert_eq!(life.generation(), 20);
    }

    #[test]
    fn blinker_oscillates_with_period_two() {
        let horizontal = vec![(1, 2), (2, 2), (3, 2)];
        let vertical = vec![(2, 1), (2, 2), (2, 3)];
        let mut life = life_with(5, 5, &horizontal);

        assert!(life.step());
        assert_eq!(alive_cells(&life), vertical);
        assert!(life.step());
        assert_eq!(alive_cells(&life), horizontal);
    }

    #[test]
    fn line_on_three_by_three_torus_fills_the_grid() {
        // On a 3x3 torus every cell neighbours every other cell.
        let mut life = life_with(3, 3, &[(1, 0), (1, 1), (1, 2)]);
        life.step();
        assert_eq!(life.population(), 9);
    }

    #[test]
    fn glider_returns_translated_after_four_steps() {
        let glider = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];
        let mut life = life_with(6, 6, &glider);
        for _ in 0..4 {
            life.step();
        }
        let moved: Vec<_> = {
            let mut cells: Vec<_> = glider.iter().map(|&(x, y)| (x + 1, y + 1)).collect();
            cells.sort_by_key(|&(x, y)| (y, x));
            cells
        };
        assert_eq!(alive_cells(&life), moved);
    }

    #[test]
    fn step_matches_direct_rule_application() {
        let mut life = Life::random(17, 11, 0.35, SeedSource::new(2024)).unwrap();
        for _ in 0..5 {
            let before = life.cells().to_vec();
            let expected: Vec<bool> = (0..before.len())
                .map(|i| {
                    let (x, y) = (i % 17, i / 17);
                    conway(before[i], alive_neighbors(&before, x, y, 17, 11))
                })
                .collect();
            life.step();
            assert_eq!(life.cells(), expected.as_slice());
        }
    }

    #[test]
    fn reinitialize_without_initializer_clears() {
        let mut life = life_with(3, 3, &[(0, 0), (1, 1)]);
        life.step();
        life.reinitialize();
        assert_eq!(life.population(), 0);
        assert_eq!(life.generation(), 0);
    }

    #[test]
    fn reused_seed_reinitializes_identically() {
        let mut life = Life::random(16, 16, 0.5, SeedSource::new(99)).unwrap();
        let initial = life.cells().to_vec();

        life.seeds_mut().unwrap().reuse();
        life.reinitialize();
        let first = life.cells().to_vec();
        life.seeds_mut().unwrap().reuse();
        life.reinitialize();

        assert_eq!(first, initial);
        assert_eq!(life.cells(), first.as_slice());
    }

    #[test]
    fn custom_rule_is_used() {
        // Every cell flips each generation.
        let mut life = life_with(3, 2, &[(0, 0)]).with_rule(|alive, _| !alive);
        life.step();
        assert_eq!(life.population(), 5);
        assert!(!life.get(0, 0));

        life.set_rule(conway);
        life.step();
        assert_eq!(life.population(), 0);
    }

    #[test]
    fn clear_kills_every_cell_but_keeps_the_initializer() {
        let mut life = Life::random(8, 8, 1.0, SeedSource::new(4)).unwrap();
        assert_eq!(life.population(), 64);
        life.clear();
        assert_eq!(life.population(), 0);
        life.reinitialize();
        assert_eq!(life.population(), 64);
    }

    #[test]
    fn try_get_checks_bounds() {
        let life = life_with(2, 2, &[(1, 1)]);
        assert_eq!(life.try_get(1, 1), Some(true));
        assert_eq!(life.try_get(2, 0), None);
        assert_eq!(life.try_get(0, 2), None);
    }
}

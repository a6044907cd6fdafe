//! Spatial hash grid for overlap queries
//!
//! Divides the world into cubic cells keyed by integer coordinates. Queries
//! only visit the cells covered by the query sphere's bounding box.

use rustc_hash::FxHashMap;

use crate::physics::body::BodyId;
use crate::util::vec3::Vec3;

/// Default cell size (world units)
/// Roughly the boid detection radius so a query touches at most 27 cells
pub const DEFAULT_CELL_SIZE: f32 = 1000.0;

/// Initial capacity for grid cells (number of expected non-empty cells)
const GRID_INITIAL_CAPACITY: usize = 256;

/// Initial capacity for entry vectors within cells
const CELL_INITIAL_CAPACITY: usize = 8;

/// Grid cell key - (x, y, z) cell coordinates
pub type CellKey = (i32, i32, i32);

/// Body data stored in the grid
#[derive(Debug, Clone, Copy)]
pub struct SpatialEntry {
    pub id: BodyId,
    pub position: Vec3,
    pub radius: f32,
}

/// Spatial hash grid rebuilt from body positions after each physics step
pub struct SpatialGrid {
    cell_size: f32,
    inv_cell_size: f32,
    cells: FxHashMap<CellKey, Vec<SpatialEntry>>,
    /// Largest body radius inserted since the last clear, widens queries
    max_radius: f32,
    len: usize,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { DEFAULT_CELL_SIZE };
        let mut cells = FxHashMap::default();
        cells.reserve(GRID_INITIAL_CAPACITY);
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells,
            max_radius: 0.0,
            len: 0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Clear all entries, keeping cell allocations for reuse
    #[inline]
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
        self.max_radius = 0.0;
        self.len = 0;
    }

    #[inline]
    fn position_to_cell(&self, position: Vec3) -> CellKey {
        (
            (position.x * self.inv_cell_size).floor() as i32,
            (position.y * self.inv_cell_size).floor() as i32,
            (position.z * self.inv_cell_size).floor() as i32,
        )
    }

    #[inline]
    pub fn insert(&mut self, entry: SpatialEntry) {
        let cell_key = self.position_to_cell(entry.position);
        self.max_radius = self.max_radius.max(entry.radius);
        self.len += 1;
        self.cells
            .entry(cell_key)
            .or_insert_with(|| Vec::with_capacity(CELL_INITIAL_CAPACITY))
            .push(entry);
    }

    /// Visit every entry whose sphere overlaps the query sphere
    pub fn for_each_overlapping<F>(&self, center: Vec3, radius: f32, mut callback: F)
    where
        F: FnMut(&SpatialEntry),
    {
        let reach = Vec3::ONE * (radius + self.max_radius);
        let min = self.position_to_cell(center - reach);
        let max = self.position_to_cell(center + reach);

        let mut visit = |cell: &Vec<SpatialEntry>| {
            for entry in cell {
                let limit = radius + entry.radius;
                if center.distance_sq_to(entry.position) <= limit * limit {
                    callback(entry);
                }
            }
        };

        // Small cells under a large query: walk the occupied cells instead of the box
        if Self::box_cell_count(min, max) > self.cells.len() as u64 {
            for (key, cell) in &self.cells {
                if (min.0..=max.0).contains(&key.0)
                    && (min.1..=max.1).contains(&key.1)
                    && (min.2..=max.2).contains(&key.2)
                {
                    visit(cell);
                }
            }
            return;
        }

        for cx in min.0..=max.0 {
            for cy in min.1..=max.1 {
                for cz in min.2..=max.2 {
                    if let Some(cell) = self.cells.get(&(cx, cy, cz)) {
                        visit(cell);
                    }
                }
            }
        }
    }

    /// Number of cells in the inclusive box `min..=max`
    #[inline]
    fn box_cell_count(min: CellKey, max: CellKey) -> u64 {
        let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1).max(0) as u64;
        span(min.0, max.0)
            .saturating_mul(span(min.1, max.1))
            .saturating_mul(span(min.2, max.2))
    }

    /// Collect ids of entries overlapping the query sphere
    pub fn query_sphere(&self, center: Vec3, radius: f32) -> Vec<BodyId> {
        let mut result = Vec::new();
        self.for_each_overlapping(center, radius, |entry| result.push(entry.id));
        result
    }

    /// Get statistics about grid usage
    pub fn stats(&self) -> GridStats {
        let non_empty_cells = self.cells.values().filter(|c| !c.is_empty()).count();
        let max_per_cell = self.cells.values().map(|c| c.len()).max().unwrap_or(0);

        GridStats {
            total_cells: self.cells.len(),
            non_empty_cells,
            total_entries: self.len,
            max_per_cell,
        }
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

/// Statistics about spatial grid usage
#[derive(Debug, Clone, Copy)]
pub struct GridStats {
    pub total_cells: usize,
    pub non_empty_cells: usize,
    pub total_entries: usize,
    pub max_per_cell: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, x: f32, y: f32, radius: f32) -> SpatialEntry {
        SpatialEntry {
            id: BodyId(id),
            position: Vec3::new(x, y, 0.0),
            radius,
        }
    }

    #[test]
    fn test_insert_and_query() {
        let mut grid = SpatialGrid::new(100.0);
        grid.insert(entry(1, 50.0, 50.0, 10.0));
        grid.insert(entry(2, 150.0, 50.0, 10.0));
        grid.insert(entry(3, 500.0, 500.0, 10.0));

        let mut found = grid.query_sphere(Vec3::new(50.0, 50.0, 0.0), 100.0);
        found.sort();
        assert_eq!(found, vec![BodyId(1), BodyId(2)]);
    }

    #[test]
    fn test_query_counts_entry_radius() {
        let mut grid = SpatialGrid::new(100.0);
        grid.insert(entry(1, 120.0, 0.0, 25.0));

        // Centre is 120 away, query radius 100 + body radius 25 reaches it
        assert_eq!(grid.query_sphere(Vec3::ZERO, 100.0), vec![BodyId(1)]);
        assert!(grid.query_sphere(Vec3::ZERO, 90.0).is_empty());
    }

    #[test]
    fn test_query_spans_many_cells() {
        let mut grid = SpatialGrid::new(10.0);
        grid.insert(entry(1, 95.0, 0.0, 1.0));
        grid.insert(entry(2, -95.0, 0.0, 1.0));

        assert_eq!(grid.query_sphere(Vec3::ZERO, 100.0).len(), 2);
    }

    #[test]
    fn test_tiny_cells_scan_occupied_cells() {
        let mut grid = SpatialGrid::new(0.01);
        grid.insert(entry(1, 900.0, 0.0, 50.0));
        grid.insert(entry(2, -400.0, 300.0, 50.0));
        grid.insert(entry(3, 5000.0, 0.0, 50.0));

        // The query box spans ~10^15 cells; only the three occupied ones are visited
        let mut found = grid.query_sphere(Vec3::ZERO, 1000.0);
        found.sort();
        assert_eq!(found, vec![BodyId(1), BodyId(2)]);
    }

    #[test]
    fn test_box_cell_count() {
        assert_eq!(SpatialGrid::box_cell_count((0, 0, 0), (0, 0, 0)), 1);
        assert_eq!(SpatialGrid::box_cell_count((-1, -1, -1), (1, 1, 1)), 27);
        let (lo, hi) = (i32::MIN, i32::MAX);
        assert_eq!(SpatialGrid::box_cell_count((lo, lo, lo), (hi, hi, hi)), u64::MAX);
    }

    #[test]
    fn test_negative_coordinates() {
        let mut grid = SpatialGrid::new(100.0);
        grid.insert(entry(1, -1.0, -1.0, 0.0));
        assert_eq!(grid.query_sphere(Vec3::new(1.0, 1.0, 0.0), 5.0), vec![BodyId(1)]);
    }

    #[test]
    fn test_clear() {
        let mut grid = SpatialGrid::new(100.0);
        grid.insert(entry(1, 0.0, 0.0, 1.0));
        assert_eq!(grid.len(), 1);

        grid.clear();
        assert!(grid.is_empty());
        assert!(grid.query_sphere(Vec3::ZERO, 1000.0).is_empty());
    }

    #[test]
    fn test_stats() {
        let mut grid = SpatialGrid::new(100.0);
        grid.insert(entry(1, 10.0, 10.0, 1.0));
        grid.insert(entry(2, 20.0, 20.0, 1.0));
        grid.insert(entry(3, 310.0, 10.0, 1.0));

        let stats = grid.stats();
        assert_eq!(stats.non_empty_cells, 2);
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.max_per_cell, 2);
    }
}

//! Sparse uniform grid used as the broad phase for radius queries.
//!
//! Only occupied cells are stored. A radius query visits the cells covering
//! the query square, so its cost depends on local density rather than on the
//! total number of entities.

use std::collections::HashMap;
use std::hash::Hash;

use wayfarer_types::Vec3;

/// Sparse hash grid keyed on the horizontal plane.
#[derive(Debug, Clone)]
pub struct SpatialGrid<K> {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<K>>,
}

impl<K: Clone + Eq + Hash> SpatialGrid<K> {
    /// Create an empty grid. Non-positive cell sizes fall back to 1.0.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    // World coordinates far outside i32 cell range saturate, which only
    // merges extremely distant cells.
    #[allow(clippy::cast_possible_truncation)]
    fn cell_coord(&self, x: f32, z: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (z / self.cell_size).floor() as i32,
        )
    }

    /// Insert `key` at `pos`.
    pub fn insert(&mut self, key: K, pos: Vec3) {
        let coord = self.cell_coord(pos.x, pos.z);
        self.cells.entry(coord).or_default().push(key);
    }

    /// Remove `key`, which was inserted at `pos`.
    pub fn remove(&mut self, key: &K, pos: Vec3) {
        let coord = self.cell_coord(pos.x, pos.z);
        if let Some(cell) = self.cells.get_mut(&coord) {
            cell.retain(|k| k != key);
            if cell.is_empty() {
                self.cells.remove(&coord);
            }
        }
    }

    /// Move `key` from `from` to `to`.
    pub fn relocate(&mut self, key: &K, from: Vec3, to: Vec3) {
        if self.cell_coord(from.x, from.z) == self.cell_coord(to.x, to.z) {
            return;
        }
        self.remove(key, from);
        self.insert(key.clone(), to);
    }

    /// Keys in every cell overlapping the square around `center` with
    /// half-width `radius`. Callers still filter by exact distance.
    ///
    /// When the square spans more cells than are occupied, the occupied
    /// cells are scanned instead, so huge or infinite radii stay bounded by
    /// the grid's size.
    pub fn candidates(&self, center: Vec3, radius: f32) -> Vec<K> {
        let r = radius.max(0.0);
        let (min_x, min_z) = self.cell_coord(center.x - r, center.z - r);
        let (max_x, max_z) = self.cell_coord(center.x + r, center.z + r);

        let width = i64::from(max_x).saturating_sub(i64::from(min_x)).saturating_add(1);
        let depth = i64::from(max_z).saturating_sub(i64::from(min_z)).saturating_add(1);
        let span = width.saturating_mul(depth);
        let occupied = i64::try_from(self.cells.len()).unwrap_or(i64::MAX);

        let mut out = Vec::new();
        if span > occupied {
            for ((cx, cz), cell) in &self.cells {
                if (min_x..=max_x).contains(cx) && (min_z..=max_z).contains(cz) {
                    out.extend(cell.iter().cloned());
                }
            }
            return out;
        }

        for cx in min_x..=max_x {
            for cz in min_z..=max_z {
                if let Some(cell) = self.cells.get(&(cx, cz)) {
                    out.extend(cell.iter().cloned());
                }
            }
        }
        out
    }
}

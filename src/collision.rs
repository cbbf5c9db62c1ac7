use std::collections::HashMap;

use crate::error::EngineError;
use crate::process::{ObjectId, Process};

pub const DEFAULT_CELL_SIZE: f32 = 32.0;

/// Row stride of the cell id space, floor(sqrt(i32::MAX)).
pub const CELLS_PER_ROW: i64 = 46_340;

/// Uniform grid bucketing collisionable objects by the cells their corners fall in.
/// Rebuilt from scratch every tick.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<i64, Vec<ObjectId>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Result<Self, EngineError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(EngineError::InvalidCellSize(cell_size));
        }
        Ok(Self {
            cell_size,
            cells: HashMap::new(),
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell coordinates are clamped to half a row either way, so far-off positions
    /// share the edge cells instead of overflowing the id.
    pub fn cell_id(&self, x: f32, y: f32) -> i64 {
        let cell_x = clamp_cell((x / self.cell_size).floor());
        let cell_y = clamp_cell((y / self.cell_size).floor());
        cell_x + cell_y * CELLS_PER_ROW
    }

    /// Distinct cells of the four corners: bottom-left, top-left, top-right, bottom-right.
    pub fn cells_for(&self, process: &Process) -> Vec<i64> {
        let right = process.x + process.width() as f32;
        let top = process.y + process.height() as f32;
        let corners = [
            self.cell_id(process.x, process.y),
            self.cell_id(process.x, top),
            self.cell_id(right, top),
            self.cell_id(right, process.y),
        ];

        let mut cells = Vec::with_capacity(4);
        for cell in corners {
            if !cells.contains(&cell) {
                cells.push(cell);
            }
        }
        cells
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn insert(&mut self, process: &Process) {
        for cell in self.cells_for(process) {
            self.cells.entry(cell).or_default().push(process.id());
        }
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn bucket(&self, cell: i64) -> &[ObjectId] {
        self.cells.get(&cell).map(|ids| ids.as_slice()).unwrap_or(&[])
    }

    /// Objects sharing a cell with `process` that pass the pixel test, in discovery order.
    /// `kinds` restricts the result to those behaviour kinds; empty means any.
    pub fn query<'o>(
        &self,
        process: &Process,
        kinds: &[&str],
        lookup: impl Fn(ObjectId) -> Option<&'o Process>,
    ) -> Vec<&'o Process> {
        let mut found: Vec<&'o Process> = Vec::new();

        for cell in self.cells_for(process) {
            for &id in self.bucket(cell) {
                if id == process.id() || found.iter().any(|p| p.id() == id) {
                    continue;
                }
                let Some(other) = lookup(id) else {
                    continue;
                };
                if !kinds.is_empty() && !kinds.contains(&other.kind()) {
                    continue;
                }
                if collide(process, other) {
                    found.push(other);
                }
            }
        }

        found
    }
}

fn clamp_cell(cell: f32) -> i64 {
    let limit = CELLS_PER_ROW / 2;
    (cell as i64).clamp(-limit, limit)
}

/// Pixel-accurate overlap: bounding boxes must strictly intersect and at least one
/// pixel of the intersection must be opaque in both textures.
pub fn collide(a: &Process, b: &Process) -> bool {
    let (Some(texture_a), Some(texture_b)) = (a.texture(), b.texture()) else {
        return false;
    };
    if !a.has_finite_position() || !b.has_finite_position() {
        return false;
    }

    let rect_a = a.pixel_bounds();
    let rect_b = b.pixel_bounds();
    let Some(overlap) = rect_a.intersection(&rect_b) else {
        return false;
    };

    for y in overlap.bottom..overlap.top {
        for x in overlap.left..overlap.right {
            if texture_a.is_opaque(x - rect_a.left, y - rect_a.bottom)
                && texture_b.is_opaque(x - rect_b.left, y - rect_b.bottom)
            {
                return true;
            }
        }
    }

    false
}

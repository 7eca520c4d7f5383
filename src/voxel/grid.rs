//! Cell arena
//!
//! All cells of all containers live in one flat vector. Each container owns a
//! contiguous slot laid out row-major in (x, y, z).

use crate::core::types::{IVec3, Quat, UVec3, Vec3};
use crate::math::Obb;
use crate::scene::SurfaceDim;

/// Cell identity within a session: container index plus grid index
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub container: u32,
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl CellKey {
    pub fn new(container: u32, x: u32, y: u32, z: u32) -> Self {
        Self { container, x, y, z }
    }

    pub fn index(&self) -> UVec3 {
        UVec3::new(self.x, self.y, self.z)
    }
}

/// One grid cell with its absolute pose
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub key: CellKey,
    pub position: Vec3,
    pub rotation: Quat,
    pub dimension: SurfaceDim,
}

impl Cell {
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Solid occupied by the cell for ray queries
    pub fn solid(&self, cell_size: Vec3) -> Obb {
        Obb::new(self.position, self.rotation, cell_size * 0.5)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ContainerSlot {
    dims: UVec3,
    start: usize,
}

impl ContainerSlot {
    fn len(&self) -> usize {
        (self.dims.x * self.dims.y * self.dims.z) as usize
    }

    fn local_index(&self, index: UVec3) -> Option<usize> {
        if index.cmpge(self.dims).any() {
            return None;
        }
        Some(((index.x * self.dims.y + index.y) * self.dims.z + index.z) as usize)
    }
}

/// Grid cells of every voxelized container
#[derive(Clone, Debug, Default)]
pub struct VoxelGrid {
    cell_size: Vec3,
    slots: Vec<ContainerSlot>,
    cells: Vec<Cell>,
}

impl VoxelGrid {
    pub fn new(cell_size: Vec3) -> Self {
        Self {
            cell_size,
            slots: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> Vec3 {
        self.cell_size
    }

    /// Drop every cell, keeping the allocation
    pub fn clear(&mut self) {
        self.slots.clear();
        self.cells.clear();
    }

    pub(crate) fn reset(&mut self, cell_size: Vec3) {
        self.clear();
        self.cell_size = cell_size;
    }

    /// Append a container's cells; `cells` must be row-major and `dims`-sized
    pub(crate) fn push_container(&mut self, dims: UVec3, cells: impl IntoIterator<Item = Cell>) {
        let start = self.cells.len();
        self.cells.extend(cells);
        let slot = ContainerSlot { dims, start };
        debug_assert_eq!(self.cells.len() - start, slot.len());
        self.slots.push(slot);
    }

    pub fn container_count(&self) -> usize {
        self.slots.len()
    }

    pub fn container_dims(&self, container: usize) -> Option<UVec3> {
        self.slots.get(container).map(|s| s.dims)
    }

    /// Cells of one container, row-major
    pub fn container_cells(&self, container: usize) -> &[Cell] {
        match self.slots.get(container) {
            Some(slot) => &self.cells[slot.start..slot.start + slot.len()],
            None => &[],
        }
    }

    /// Every cell, container by container
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Position of `key` in [`VoxelGrid::cells`]
    pub fn flat_index(&self, key: CellKey) -> Option<usize> {
        let slot = self.slots.get(key.container as usize)?;
        slot.local_index(key.index()).map(|i| slot.start + i)
    }

    pub fn get(&self, key: CellKey) -> Option<&Cell> {
        self.flat_index(key).map(|i| &self.cells[i])
    }

    /// Lookup by signed index, for anchor arithmetic that may leave the grid
    pub fn cell_at(&self, container: usize, index: IVec3) -> Option<&Cell> {
        if index.min_element() < 0 {
            return None;
        }
        let key = CellKey::new(container as u32, index.x as u32, index.y as u32, index.z as u32);
        self.get(key)
    }
}

use cgmath::prelude::*;
use rayon::prelude::*;

use super::collision::Aabb;
use super::scratch_buffer::ScratchBufferStore;
use crate::units::*;

pub type ParticleIndex = u32;
pub type CellIndex = u32;

#[derive(Copy, Clone)]
struct ParticleEntry {
    pidx: ParticleIndex,
    cidx: CellIndex,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
struct CellPos {
    x: u32,
    y: u32,
    z: u32,
}

struct GridProperties {
    radius_sq: Real,
    cell_size_inv: Real,
    grid_min: Point,
    cells_per_axis: (u32, u32, u32),
}

impl GridProperties {
    #[inline]
    fn position_to_cellpos(&self, position: Point) -> CellPos {
        // The +1 reserves a margin cell on the low side. Clamping keeps runaway predicted
        // positions (the grid is built before collision resolution) inside the index range.
        let cellspace = (position - self.grid_min) * self.cell_size_inv;
        CellPos {
            x: (cellspace.x.floor() as i64 + 1).clamp(0, self.cells_per_axis.0 as i64 - 1) as u32,
            y: (cellspace.y.floor() as i64 + 1).clamp(0, self.cells_per_axis.1 as i64 - 1) as u32,
            z: (cellspace.z.floor() as i64 + 1).clamp(0, self.cells_per_axis.2 as i64 - 1) as u32,
        }
    }

    // Direct (non modular) cell indexing. The cell count bound matches the clamped domain,
    // so distinct cells never collide.
    #[inline]
    fn cellpos_to_cidx(&self, cellpos: CellPos) -> CellIndex {
        (cellpos.x * self.cells_per_axis.1 + cellpos.y) * self.cells_per_axis.2 + cellpos.z
    }

    #[inline]
    fn cidx_to_cellpos(&self, cidx: CellIndex) -> CellPos {
        let cells_yz = self.cells_per_axis.1 * self.cells_per_axis.2;
        CellPos {
            x: cidx / cells_yz,
            y: cidx % cells_yz / self.cells_per_axis.2,
            z: cidx % self.cells_per_axis.2,
        }
    }

    #[inline]
    fn position_to_cidx(&self, position: Point) -> CellIndex {
        self.cellpos_to_cidx(self.position_to_cellpos(position))
    }
}

/// Uniform grid over the simulation domain with cell size equal to the interaction radius,
/// rebuilt from scratch once per step.
///
/// `update` sorts the particle attribute buffers into cell order, so all later passes of a step
/// operate on a cell-contiguous layout and neighbor queries walk at most nine contiguous index
/// ranges. Particle indices are only stable between two `update` calls.
pub struct NeighborhoodGrid {
    grid: GridProperties,
    entries: Vec<ParticleEntry>,
    cell_start: Vec<ParticleIndex>,
}

impl NeighborhoodGrid {
    /// * radius: Interaction radius that determines if a point is a neighbor. Also the cell size.
    pub fn new(domain: &Aabb, radius: Real) -> NeighborhoodGrid {
        let extent = domain.extent();
        // One extra cell on each side absorbs boundary neighbor queries without range checks
        // on the hot path.
        let cells_per_axis = (
            (extent.x / radius).ceil() as u32 + 2,
            (extent.y / radius).ceil() as u32 + 2,
            (extent.z / radius).ceil() as u32 + 2,
        );
        let num_cells = cells_per_axis.0 as u64 * cells_per_axis.1 as u64 * cells_per_axis.2 as u64;
        assert!(num_cells < CellIndex::MAX as u64, "domain too large for the given interaction radius");

        NeighborhoodGrid {
            grid: GridProperties {
                radius_sq: radius * radius,
                cell_size_inv: 1.0 / radius,
                grid_min: domain.min,
                cells_per_axis,
            },
            entries: Vec::new(),
            cell_start: vec![0; num_cells as usize + 1],
        }
    }

    /// Rebuilds the cell index over `cell_positions` and sorts all passed buffers into the
    /// resulting cell order. Every per-particle buffer that lives across this call must be
    /// part of the permutation, otherwise its entries no longer line up.
    pub fn update(
        &mut self,
        scratch_buffers: &mut ScratchBufferStore,
        cell_positions: &mut Vec<Point>,
        attributes_point: &mut [&mut Vec<Point>],
        attributes_vector: &mut [&mut Vec<Vector>],
    ) {
        let num_particles = cell_positions.len();

        // Compute (particle, cell) pairs...
        self.entries.clear();
        self.entries.reserve(num_particles);
        let grid = &self.grid;
        self.entries.extend(cell_positions.iter().enumerate().map(|(pidx, &position)| ParticleEntry {
            pidx: pidx as ParticleIndex,
            cidx: grid.position_to_cidx(position),
        }));

        // ... sort them by cell. Ties break arbitrarily, order within a cell has no meaning.
        self.entries.par_sort_unstable_by_key(|entry| entry.cidx);

        // Derive per-cell ranges: cell_start[c]..cell_start[c+1] indexes the sorted particles
        // of cell c. Empty cells collapse to empty ranges, trailing cells point past the end.
        {
            let mut cell = 0usize;
            for (sorted_idx, entry) in self.entries.iter().enumerate() {
                while cell <= entry.cidx as usize {
                    self.cell_start[cell] = sorted_idx as ParticleIndex;
                    cell += 1;
                }
            }
            for remaining in self.cell_start[cell..].iter_mut() {
                *remaining = num_particles as ParticleIndex;
            }
        }

        // Gather all attribute buffers through the sort permutation.
        {
            let mut scratch = scratch_buffers.get_buffer_point(num_particles);
            Self::sort_buffer(&self.entries, cell_positions, &mut scratch.buffer);
            for attribute in attributes_point.iter_mut() {
                Self::sort_buffer(&self.entries, attribute, &mut scratch.buffer);
            }
        }
        {
            let mut scratch = scratch_buffers.get_buffer_vector(num_particles);
            for attribute in attributes_vector.iter_mut() {
                Self::sort_buffer(&self.entries, attribute, &mut scratch.buffer);
            }
        }
    }

    fn sort_buffer<T: Copy + Send + Sync>(entries: &[ParticleEntry], buffer: &mut Vec<T>, scratch: &mut Vec<T>) {
        assert_eq!(entries.len(), buffer.len());
        assert_eq!(entries.len(), scratch.len());
        scratch
            .par_iter_mut()
            .zip(entries.par_iter())
            .for_each(|(sorted, entry)| *sorted = buffer[entry.pidx as usize]);
        std::mem::swap(buffer, scratch);
    }

    /// Calls `f` for every particle within the interaction radius of `particle`, excluding
    /// the particle itself. `positions` must be the buffer layout produced by the last
    /// `update`; positions may have moved since (the exact distance test uses the passed
    /// coordinates, cell membership stays from build time).
    pub fn foreach_neighbor(&self, particle: ParticleIndex, positions: &[Point], mut f: impl FnMut(ParticleIndex)) {
        let position = positions[particle as usize];
        let cellpos = self.grid.cidx_to_cellpos(self.entries[particle as usize].cidx);
        let (num_x, num_y, num_z) = self.grid.cells_per_axis;

        // 3x3x3 block around the cell; the three z neighbors are contiguous in the cell hash,
        // so they merge into a single index range per (x, y) pair.
        for x in cellpos.x.saturating_sub(1)..=(cellpos.x + 1).min(num_x - 1) {
            for y in cellpos.y.saturating_sub(1)..=(cellpos.y + 1).min(num_y - 1) {
                let z_first = cellpos.z.saturating_sub(1);
                let z_last = (cellpos.z + 1).min(num_z - 1);
                let run_first = self.cell_start[self.grid.cellpos_to_cidx(CellPos { x, y, z: z_first }) as usize];
                let run_last = self.cell_start[self.grid.cellpos_to_cidx(CellPos { x, y, z: z_last }) as usize + 1];

                for j in run_first..run_last {
                    if j == particle {
                        continue;
                    }
                    if (positions[j as usize] - position).magnitude2() < self.grid.radius_sq {
                        f(j);
                    }
                }
            }
        }
    }
}

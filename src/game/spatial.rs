//! Uniform-grid spatial index
//!
//! Divides the world into square cells and records which entities occupy
//! each cell. Membership is keyed by entity identifier: a separate map from
//! identifier to cell key means removal and relocation never depend on the
//! caller remembering where an entity used to be.

use crate::game::state::{HazardId, PickupId, PlayerId};
use crate::util::vec2::Vec2;
use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

/// Initial capacity for the cell map (number of expected non-empty cells)
const GRID_INITIAL_CAPACITY: usize = 64;

/// Initial capacity for entity maps within cells
const CELL_INITIAL_CAPACITY: usize = 16;

/// Grid cell key - (x, y) cell coordinates
pub type CellKey = (i32, i32);

/// Identifier of anything stored in the index, tagged with its kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Player(PlayerId),
    Pickup(PickupId),
    Hazard(HazardId),
}

/// Kind tag of an indexed entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Pickup,
    Hazard,
}

impl EntityRef {
    #[inline]
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Player(_) => EntityKind::Player,
            EntityRef::Pickup(_) => EntityKind::Pickup,
            EntityRef::Hazard(_) => EntityKind::Hazard,
        }
    }
}

/// A query hit: which entity, and where it was indexed
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub entity: EntityRef,
    pub position: Vec2,
}

/// Result of a nearest-neighbour search
#[derive(Debug, Clone, PartialEq)]
pub struct Nearest {
    pub entity: EntityRef,
    pub position: Vec2,
    pub distance_sq: f32,
}

type Cell = HashMap<EntityRef, Vec2, FxBuildHasher>;

/// Spatial hash grid keyed by entity identifier
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    /// Cell size in world units
    cell_size: f32,
    /// Inverse cell size for fast position-to-cell conversion
    inv_cell_size: f32,
    /// Rings a nearest search may need to cover the whole world
    max_ring: i32,
    /// Map from cell key to the entities in that cell
    cells: HashMap<CellKey, Cell, FxBuildHasher>,
    /// Map from entity to the cell it is currently recorded under
    locations: HashMap<EntityRef, CellKey, FxBuildHasher>,
}

impl SpatialIndex {
    /// Create an index for a square world of side `world_size`
    ///
    /// `cell_size` must be positive; `WorldConfig::validate` guarantees this
    /// for worlds built from a config.
    pub fn new(cell_size: f32, world_size: f32) -> Self {
        let max_ring = (world_size / cell_size).ceil() as i32 + 1;
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            max_ring: max_ring.max(1),
            cells: HashMap::with_capacity_and_hasher(GRID_INITIAL_CAPACITY, FxBuildHasher),
            locations: HashMap::with_hasher(FxBuildHasher),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Convert world position to cell key
    #[inline]
    pub fn position_to_cell(&self, position: Vec2) -> CellKey {
        (
            (position.x * self.inv_cell_size).floor() as i32,
            (position.y * self.inv_cell_size).floor() as i32,
        )
    }

    /// Number of indexed entities
    #[inline]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    #[inline]
    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.locations.contains_key(entity)
    }

    /// Position an entity is currently indexed at
    pub fn position_of(&self, entity: &EntityRef) -> Option<Vec2> {
        let key = self.locations.get(entity)?;
        self.cells.get(key)?.get(entity).copied()
    }

    /// Insert an entity at `position`
    ///
    /// Inserting an identifier that is already indexed moves it, so every
    /// entity has exactly one entry.
    pub fn insert(&mut self, entity: EntityRef, position: Vec2) {
        let key = self.position_to_cell(position);
        if let Some(old_key) = self.locations.insert(entity.clone(), key) {
            if old_key != key {
                self.detach(old_key, &entity);
            }
        }
        self.cells
            .entry(key)
            .or_insert_with(|| Cell::with_capacity_and_hasher(CELL_INITIAL_CAPACITY, FxBuildHasher))
            .insert(entity, position);
    }

    /// Remove an entity by identifier
    ///
    /// Returns the position it was indexed at, or None if it was unknown.
    pub fn remove(&mut self, entity: &EntityRef) -> Option<Vec2> {
        let key = self.locations.remove(entity)?;
        self.detach(key, entity)
    }

    /// Move an already indexed entity to `new_position`
    ///
    /// The entry is taken out of the cell recorded for the identifier and
    /// placed under the cell of the new position. Unknown ids are a no-op.
    pub fn relocate(&mut self, entity: &EntityRef, new_position: Vec2) -> bool {
        let Some(old_key) = self.locations.get(entity).copied() else {
            return false;
        };
        let new_key = self.position_to_cell(new_position);

        if old_key == new_key {
            if let Some(slot) = self.cells.get_mut(&old_key).and_then(|c| c.get_mut(entity)) {
                *slot = new_position;
            }
            return true;
        }

        self.detach(old_key, entity);
        self.locations.insert(entity.clone(), new_key);
        self.cells
            .entry(new_key)
            .or_insert_with(|| Cell::with_capacity_and_hasher(CELL_INITIAL_CAPACITY, FxBuildHasher))
            .insert(entity.clone(), new_position);
        true
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.cells.clear();
        self.locations.clear();
    }

    fn detach(&mut self, key: CellKey, entity: &EntityRef) -> Option<Vec2> {
        let cell = self.cells.get_mut(&key)?;
        let position = cell.remove(entity);
        if cell.is_empty() {
            self.cells.remove(&key);
        }
        position
    }

    /// Visit every entity whose distance to `position` is at most `radius`
    ///
    /// Scans a ring of `ceil(radius / cell_size)` cells around the query cell,
    /// then filters by exact distance.
    pub fn for_each_within<F>(&self, position: Vec2, radius: f32, mut visit: F)
    where
        F: FnMut(&EntityRef, Vec2, f32),
    {
        if !position.is_finite() || radius.is_nan() || radius < 0.0 {
            return;
        }
        let radius_sq = radius * radius;
        let (cx, cy) = self.position_to_cell(position);
        let ring = ((radius * self.inv_cell_size).ceil() as i32).min(self.max_ring);

        for dx in -ring..=ring {
            for dy in -ring..=ring {
                let Some(cell) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for (entity, &entry_pos) in cell {
                    let d2 = entry_pos.distance_sq_to(position);
                    if d2 <= radius_sq {
                        visit(entity, entry_pos, d2);
                    }
                }
            }
        }
    }

    /// All entities within `radius` of `position` (inclusive)
    pub fn query(&self, position: Vec2, radius: f32) -> Vec<IndexEntry> {
        let mut hits = Vec::new();
        self.for_each_within(position, radius, |entity, entry_pos, _| {
            hits.push(IndexEntry {
                entity: entity.clone(),
                position: entry_pos,
            });
        });
        hits
    }

    /// Closest entity accepted by `accept`, by squared distance
    ///
    /// Searches outward one ring of cells at a time and stops as soon as no
    /// unvisited cell can hold anything closer. Equal distances keep the
    /// first entry found.
    pub fn nearest<F>(&self, position: Vec2, mut accept: F) -> Option<Nearest>
    where
        F: FnMut(&EntityRef, Vec2) -> bool,
    {
        if self.is_empty() || !position.is_finite() {
            return None;
        }
        let (cx, cy) = self.position_to_cell(position);
        let mut best: Option<(&EntityRef, Vec2, f32)> = None;
        let mut visited = 0usize;

        for ring in 0..=self.max_ring {
            for dx in -ring..=ring {
                for dy in -ring..=ring {
                    if dx.abs().max(dy.abs()) != ring {
                        continue;
                    }
                    let Some(cell) = self.cells.get(&(cx + dx, cy + dy)) else {
                        continue;
                    };
                    visited += cell.len();
                    for (entity, &entry_pos) in cell {
                        let d2 = entry_pos.distance_sq_to(position);
                        if best.map_or(true, |(_, _, b)| d2 < b) && accept(entity, entry_pos) {
                            best = Some((entity, entry_pos, d2));
                        }
                    }
                }
            }

            // Anything outside rings 0..=ring is at least ring * cell_size away
            if let Some((_, _, best_sq)) = best {
                let reach = ring as f32 * self.cell_size;
                if best_sq <= reach * reach {
                    break;
                }
            }
            if visited >= self.len() {
                break;
            }
        }

        best.map(|(entity, position, distance_sq)| Nearest {
            entity: entity.clone(),
            position,
            distance_sq,
        })
    }

    /// Get statistics about the index
    pub fn stats(&self) -> SpatialIndexStats {
        let max_per_cell = self.cells.values().map(|c| c.len()).max().unwrap_or(0);
        SpatialIndexStats {
            non_empty_cells: self.cells.len(),
            total_entities: self.locations.len(),
            max_per_cell,
        }
    }
}

/// Statistics about the spatial index
#[derive(Debug, Clone)]
pub struct SpatialIndexStats {
    pub non_empty_cells: usize,
    pub total_entities: usize,
    pub max_per_cell: usize,
}

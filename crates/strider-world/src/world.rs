use std::collections::HashMap;

use strider_types::{BlockPos, Weather};
use uuid::Uuid;

use crate::decode::ChunkSection;

/// A decoded chunk column.
#[derive(Debug, Clone, Default)]
pub struct ChunkData {
    pub cx: i32,
    pub cz: i32,
    /// Sections keyed by their world section-y index (not a dense array, since
    /// lenient parsing may stop partway through).
    pub sections: HashMap<i32, ChunkSection>,
    /// Whether the heightmaps tag present on the wire was non-empty.
    pub has_heightmaps: bool,
}

/// A remote player or mob tracked purely from entity-movement packets.
#[derive(Debug, Clone)]
pub struct RemoteEntity {
    pub entity_id: i32,
    pub uuid: Uuid,
    pub entity_type: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: u8,
    pub pitch: u8,
    pub velocity_x: i16,
    pub velocity_y: i16,
    pub velocity_z: i16,
}

/// Everything the bot knows about the world it's currently connected to.
pub struct WorldState {
    pub loaded_chunks: HashMap<(i32, i32), ChunkData>,
    pub entities: HashMap<i32, RemoteEntity>,
    pub time_of_day: i64,
    pub weather: Weather,
    pub difficulty: u8,
    pub spawn_position: BlockPos,
    pub world_height: i32,
    pub min_y: i32,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            loaded_chunks: HashMap::new(),
            entities: HashMap::new(),
            time_of_day: 0,
            weather: Weather::Clear,
            difficulty: 0,
            spawn_position: BlockPos::new(0, 0, 0),
            world_height: 384,
            min_y: -64,
        }
    }
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section_count(&self) -> usize {
        (self.world_height / 16) as usize
    }

    pub fn min_section_y(&self) -> i32 {
        self.min_y / 16
    }

    pub fn insert_chunk(&mut self, chunk: ChunkData) {
        self.loaded_chunks.insert((chunk.cx, chunk.cz), chunk);
    }

    pub fn unload_chunk(&mut self, cx: i32, cz: i32) {
        self.loaded_chunks.remove(&(cx, cz));
    }

    pub fn apply_entity_delta(&mut self, entity_id: i32, dx: i16, dy: i16, dz: i16) {
        if let Some(entity) = self.entities.get_mut(&entity_id) {
            entity.x += dx as f64 / 4096.0;
            entity.y += dy as f64 / 4096.0;
            entity.z += dz as f64 / 4096.0;
        }
    }

    pub fn remove_entities(&mut self, ids: &[i32]) {
        for id in ids {
            self.entities.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unload_removes_only_matching_key() {
        let mut world = WorldState::new();
        world.insert_chunk(ChunkData {
            cx: 1,
            cz: 2,
            ..Default::default()
        });
        world.insert_chunk(ChunkData {
            cx: 1,
            cz: 3,
            ..Default::default()
        });
        world.unload_chunk(1, 2);
        assert_eq!(world.loaded_chunks.len(), 1);
        assert!(world.loaded_chunks.contains_key(&(1, 3)));
    }

    #[test]
    fn entity_delta_scales_by_4096() {
        let mut world = WorldState::new();
        world.entities.insert(
            5,
            RemoteEntity {
                entity_id: 5,
                uuid: Uuid::nil(),
                entity_type: 0,
                x: 0.0,
                y: 0.0,
                z: 0.0,
                yaw: 0,
                pitch: 0,
                velocity_x: 0,
                velocity_y: 0,
                velocity_z: 0,
            },
        );
        world.apply_entity_delta(5, 4096, -8192, 0);
        let entity = &world.entities[&5];
        assert_eq!(entity.x, 1.0);
        assert_eq!(entity.y, -2.0);
    }

    #[test]
    fn delta_on_unknown_entity_is_ignored() {
        let mut world = WorldState::new();
        world.apply_entity_delta(99, 10, 10, 10);
        assert!(world.entities.is_empty());
    }
}

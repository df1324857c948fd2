use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use strider_types::{BlockPos, PlayerState};
use strider_world::WorldState;

/// Movement keys the control surface can toggle; the position-tick task reads these
/// every tick to compute horizontal displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementKey {
    Forward,
    Back,
    Left,
    Right,
}

/// A pending yaw/pitch change requested by `look`/`look_relative`, applied by the
/// tick task before it sends the next position packet.
#[derive(Debug, Clone, Copy, Default)]
pub struct LookTarget {
    pub yaw: Option<f32>,
    pub pitch: Option<f32>,
}

/// Everything the running session and control surface share.
pub struct BotState {
    pub player: PlayerState,
    pub world: WorldState,
    pub joined_game: bool,
    pub spawn_confirmed: bool,
    pub movement_keys: HashSet<MovementKey>,
    pub sneaking: bool,
    pub sprinting: bool,
    pub look_target: LookTarget,
    pub block_updates: VecDeque<(BlockPos, i32, Instant)>,
    pub use_item_sequence: i32,
}

impl Default for BotState {
    fn default() -> Self {
        Self {
            player: PlayerState::default(),
            world: WorldState::default(),
            joined_game: false,
            spawn_confirmed: false,
            movement_keys: HashSet::new(),
            sneaking: false,
            sprinting: false,
            look_target: LookTarget::default(),
            block_updates: VecDeque::new(),
            use_item_sequence: 0,
        }
    }
}

impl BotState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a block update, trimming the ring to the last 500 entries once it
    /// exceeds 1000.
    pub fn record_block_update(&mut self, position: BlockPos, block_id: i32) {
        self.block_updates
            .push_back((position, block_id, Instant::now()));
        if self.block_updates.len() > 1000 {
            let excess = self.block_updates.len() - 500;
            for _ in 0..excess {
                self.block_updates.pop_front();
            }
        }
    }

    pub fn next_use_item_sequence(&mut self) -> i32 {
        self.use_item_sequence += 1;
        self.use_item_sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_updates_trim_to_500_past_1000() {
        let mut state = BotState::new();
        for i in 0..1001 {
            state.record_block_update(BlockPos::new(i, 0, 0), 1);
        }
        assert_eq!(state.block_updates.len(), 500);
        // The most recent update should be the last one recorded.
        assert_eq!(state.block_updates.back().unwrap().0, BlockPos::new(1000, 0, 0));
    }

    #[test]
    fn use_item_sequence_is_monotonic() {
        let mut state = BotState::new();
        assert_eq!(state.next_use_item_sequence(), 1);
        assert_eq!(state.next_use_item_sequence(), 2);
    }
}

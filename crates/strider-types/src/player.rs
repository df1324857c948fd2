use uuid::Uuid;

use crate::Position;

/// The bot's own player state, as reconstructed from server packets.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub entity_id: i32,
    pub uuid: Uuid,
    pub username: String,
    pub position: Position,
    pub health: f32,
    pub food: i32,
    pub saturation: f32,
    pub gamemode: u8,
    pub dimension: String,
    pub is_hardcore: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            entity_id: 0,
            uuid: Uuid::nil(),
            username: String::new(),
            position: Position::default(),
            health: 20.0,
            food: 20,
            saturation: 0.0,
            gamemode: 0,
            dimension: String::new(),
            is_hardcore: false,
        }
    }
}

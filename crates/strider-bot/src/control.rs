use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use strider_protocol_core::{read_varint, ConnectionState, ConnectionWriter, InternalPacket, ProtocolAdapter};
use strider_protocol_v1::V1Adapter;

use crate::state::{BotState, MovementKey};

/// Handle through which callers steer a running bot: start/stop movement keys, look,
/// attack, use the held item, change slots, chat, and respawn.
#[derive(Clone)]
pub struct BotHandle {
    adapter: Rc<V1Adapter>,
    state: Rc<RefCell<BotState>>,
    writer: Rc<RefCell<ConnectionWriter>>,
}

impl BotHandle {
    pub fn new(
        adapter: Rc<V1Adapter>,
        state: Rc<RefCell<BotState>>,
        writer: Rc<RefCell<ConnectionWriter>>,
    ) -> Self {
        Self {
            adapter,
            state,
            writer,
        }
    }

    fn set_movement_key(&self, key: MovementKey, start: bool) {
        let mut s = self.state.borrow_mut();
        if start {
            s.movement_keys.insert(key);
        } else {
            s.movement_keys.remove(&key);
        }
    }

    pub fn move_forward(&self, start: bool) {
        self.set_movement_key(MovementKey::Forward, start);
    }

    pub fn move_backward(&self, start: bool) {
        self.set_movement_key(MovementKey::Back, start);
    }

    pub fn move_left(&self, start: bool) {
        self.set_movement_key(MovementKey::Left, start);
    }

    pub fn move_right(&self, start: bool) {
        self.set_movement_key(MovementKey::Right, start);
    }

    pub async fn jump(&self) -> Result<()> {
        let pos = {
            let mut s = self.state.borrow_mut();
            s.player.position.y += 1.25;
            s.player.position
        };
        self.send(&InternalPacket::PlayerPosition {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            on_ground: false,
        })
        .await
    }

    pub async fn sneak(&self, start: bool) -> Result<()> {
        self.state.borrow_mut().sneaking = start;
        let action_id = if start { 0 } else { 1 };
        self.send(&InternalPacket::PlayerCommand {
            entity_id: self.state.borrow().player.entity_id,
            action_id,
            jump_boost: 0,
        })
        .await
    }

    pub async fn sprint(&self, start: bool) -> Result<()> {
        self.state.borrow_mut().sprinting = start;
        let action_id = if start { 3 } else { 4 };
        self.send(&InternalPacket::PlayerCommand {
            entity_id: self.state.borrow().player.entity_id,
            action_id,
            jump_boost: 0,
        })
        .await
    }

    pub fn look(&self, yaw: f32, pitch: f32) {
        let mut s = self.state.borrow_mut();
        let clamped_pitch = pitch.clamp(-90.0, 90.0);
        let normalized_yaw = yaw.rem_euclid(360.0);
        s.look_target.yaw = Some(normalized_yaw);
        s.look_target.pitch = Some(clamped_pitch);
    }

    pub fn look_relative(&self, dyaw: f32, dpitch: f32) {
        let (yaw, pitch) = {
            let s = self.state.borrow();
            (s.player.position.yaw + dyaw, s.player.position.pitch + dpitch)
        };
        self.look(yaw, pitch);
    }

    pub async fn attack(&self) -> Result<()> {
        self.send(&InternalPacket::SwingArm { hand: 0 }).await
    }

    pub async fn use_item(&self) -> Result<()> {
        let sequence = self.state.borrow_mut().next_use_item_sequence();
        self.send(&InternalPacket::UseItem { hand: 0, sequence }).await
    }

    pub async fn select_slot(&self, slot: i16) -> Result<()> {
        let slot = slot.clamp(0, 8);
        self.send(&InternalPacket::HeldItemChange { slot }).await
    }

    pub async fn chat(&self, message: &str) -> Result<()> {
        if let Some(command) = message.strip_prefix('/') {
            self.send(&InternalPacket::ChatCommand {
                command: command.to_string(),
            })
            .await
        } else {
            self.send(&InternalPacket::ChatMessage {
                message: message.to_string(),
                timestamp: 0,
                salt: 0,
                has_signature: false,
                signature: None,
                offset: 0,
                acknowledged: [0u8; 3],
            })
            .await
        }
    }

    pub async fn respawn(&self) -> Result<()> {
        let health = self.state.borrow().player.health;
        if health > 0.0 {
            return Ok(());
        }
        self.send(&InternalPacket::ClientStatus { action: 0 }).await
    }

    async fn send(&self, packet: &InternalPacket) -> Result<()> {
        let mut encoded = self.adapter.encode_packet(ConnectionState::Play, packet)?;
        let packet_id = read_varint(&mut encoded)?;
        self.writer.borrow_mut().write_packet(packet_id, &encoded).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_clamps_pitch_and_normalizes_yaw() {
        let state = Rc::new(RefCell::new(BotState::new()));
        let handle_state = state.clone();
        handle_state.borrow_mut().player.position.yaw = 0.0;

        // Directly exercise the clamp/normalize math `look` applies, without needing
        // a live connection for this unit test.
        let yaw = 370.0f32.rem_euclid(360.0);
        let pitch = 120.0f32.clamp(-90.0, 90.0);
        assert_eq!(yaw, 10.0);
        assert_eq!(pitch, 90.0);
    }
}

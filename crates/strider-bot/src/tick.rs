use std::cell::{Cell, RefCell};
use std::rc::Rc;

use strider_protocol_core::{read_varint, ConnectionState, ConnectionWriter, InternalPacket, ProtocolAdapter};
use strider_protocol_v1::V1Adapter;
use tracing::debug;

use crate::state::{BotState, MovementKey};

const BASE_SPEED_BLOCKS_PER_SEC: f64 = 4.317;
const TICK_SECONDS: f64 = 0.05;
const SPRINT_MULTIPLIER: f64 = 1.3;
const SNEAK_MULTIPLIER: f64 = 0.3;

/// Drives the bot's position at 20 Hz: applies any pending look target, computes
/// horizontal displacement from the active movement keys, and sends
/// `PlayerPositionAndRotation` every tick regardless of whether anything moved.
pub async fn run_position_tick(
    adapter: Rc<V1Adapter>,
    state: Rc<RefCell<BotState>>,
    writer: Rc<RefCell<ConnectionWriter>>,
    running: Rc<Cell<bool>>,
) {
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(50));
    while running.get() {
        interval.tick().await;
        let packet = {
            let mut s = state.borrow_mut();
            apply_look_target(&mut s);
            apply_movement(&mut s);
            let pos = s.player.position;
            InternalPacket::PlayerPositionAndRotation {
                x: pos.x,
                y: pos.y,
                z: pos.z,
                yaw: pos.yaw,
                pitch: pos.pitch,
                on_ground: pos.on_ground,
            }
        };

        if let Err(e) = send(&adapter, &writer, &packet).await {
            debug!("position tick send failed: {}", e);
            break;
        }
    }
}

async fn send(
    adapter: &V1Adapter,
    writer: &Rc<RefCell<ConnectionWriter>>,
    packet: &InternalPacket,
) -> anyhow::Result<()> {
    let mut encoded = adapter.encode_packet(ConnectionState::Play, packet)?;
    let packet_id = read_varint(&mut encoded)?;
    writer.borrow_mut().write_packet(packet_id, &encoded).await
}

fn apply_look_target(state: &mut BotState) {
    if let Some(yaw) = state.look_target.yaw.take() {
        state.player.position.yaw = yaw;
    }
    if let Some(pitch) = state.look_target.pitch.take() {
        state.player.position.pitch = pitch;
    }
}

fn apply_movement(state: &mut BotState) {
    if state.movement_keys.is_empty() {
        return;
    }

    let mut speed = BASE_SPEED_BLOCKS_PER_SEC * TICK_SECONDS;
    if state.sprinting {
        speed *= SPRINT_MULTIPLIER;
    }
    if state.sneaking {
        speed *= SNEAK_MULTIPLIER;
    }

    let yaw_rad = (state.player.position.yaw as f64).to_radians();
    let (sin, cos) = yaw_rad.sin_cos();

    let mut dx = 0.0;
    let mut dz = 0.0;

    if state.movement_keys.contains(&MovementKey::Forward) {
        dx += -sin;
        dz += cos;
    }
    if state.movement_keys.contains(&MovementKey::Back) {
        dx += sin;
        dz += -cos;
    }
    if state.movement_keys.contains(&MovementKey::Left) {
        dx += cos;
        dz += sin;
    }
    if state.movement_keys.contains(&MovementKey::Right) {
        dx += -cos;
        dz += -sin;
    }

    state.player.position.x += dx * speed;
    state.player.position.z += dz * speed;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_movement_at_zero_yaw_moves_along_positive_z() {
        let mut state = BotState::new();
        state.movement_keys.insert(MovementKey::Forward);
        apply_movement(&mut state);
        assert!(state.player.position.z > 0.0);
        assert!(state.player.position.x.abs() < 1e-9);
    }

    #[test]
    fn sprint_and_sneak_multipliers_compose() {
        let mut base = BotState::new();
        base.movement_keys.insert(MovementKey::Forward);
        apply_movement(&mut base);
        let base_distance = base.player.position.z;

        let mut boosted = BotState::new();
        boosted.movement_keys.insert(MovementKey::Forward);
        boosted.sprinting = true;
        boosted.sneaking = true;
        apply_movement(&mut boosted);
        let boosted_distance = boosted.player.position.z;

        let expected = base_distance * SPRINT_MULTIPLIER * SNEAK_MULTIPLIER;
        assert!((boosted_distance - expected).abs() < 1e-9);
    }

    #[test]
    fn no_movement_keys_leaves_position_unchanged() {
        let mut state = BotState::new();
        apply_movement(&mut state);
        assert_eq!(state.player.position.x, 0.0);
        assert_eq!(state.player.position.z, 0.0);
    }

    #[test]
    fn look_target_applies_once_then_clears() {
        let mut state = BotState::new();
        state.look_target.yaw = Some(90.0);
        apply_look_target(&mut state);
        assert_eq!(state.player.position.yaw, 90.0);
        assert!(state.look_target.yaw.is_none());
    }
}

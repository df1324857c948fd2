use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use strider_events::{BotEvent, Listeners};
use strider_protocol_core::{read_varint, ConnectionState, ConnectionWriter, InternalPacket, ProtocolAdapter};
use strider_protocol_v1::V1Adapter;
use strider_types::GameMode;
use strider_world::{parse_chunk_sections, ChunkData, RemoteEntity};
use tracing::debug;

use crate::state::BotState;

/// Encode `packet` for `state` via `adapter` and write it out, splitting the leading
/// VarInt packet id the adapter's encoder bundles with the payload.
async fn send(
    adapter: &V1Adapter,
    writer: &Rc<RefCell<ConnectionWriter>>,
    state: ConnectionState,
    packet: &InternalPacket,
) -> Result<()> {
    let mut encoded = adapter.encode_packet(state, packet)?;
    let packet_id = read_varint(&mut encoded)?;
    writer.borrow_mut().write_packet(packet_id, &encoded).await
}

/// Outcome of dispatching one packet: whether the session should advance to a new
/// connection state, or end.
pub enum Outcome {
    Continue,
    ChangeState(ConnectionState),
    JustSpawned,
    End(String),
}

/// Dispatch a single decoded Play-state packet against shared bot state, writing any
/// required reply through `writer` and emitting events through `listeners`.
///
/// One pure match per packet variant — this replaces a `(state, id) -> callback`
/// lookup table with direct matching on the already-decoded tag, since the adapter has
/// already routed by connection state during decode.
pub async fn dispatch_play(
    adapter: &V1Adapter,
    state: &Rc<RefCell<BotState>>,
    writer: &Rc<RefCell<ConnectionWriter>>,
    listeners: &Listeners,
    packet: InternalPacket,
) -> Result<Outcome> {
    match packet {
        InternalPacket::KeepAliveClientbound { id } => {
            send(
                adapter,
                writer,
                ConnectionState::Play,
                &InternalPacket::KeepAliveServerbound { id },
            )
            .await?;
            Ok(Outcome::Continue)
        }
        InternalPacket::SynchronizePlayerPosition {
            x,
            y,
            z,
            yaw,
            pitch,
            flags,
            teleport_id,
        } => {
            let first_spawn = {
                let mut s = state.borrow_mut();
                apply_teleport(&mut s, x, y, z, yaw, pitch, flags);
                let was_confirmed = s.spawn_confirmed;
                s.spawn_confirmed = true;
                !was_confirmed
            };

            send(
                adapter,
                writer,
                ConnectionState::Play,
                &InternalPacket::ConfirmTeleportation { teleport_id },
            )
            .await?;

            if first_spawn {
                let position = state.borrow().player.position;
                listeners.emit(BotEvent::Spawn(position)).await;
                Ok(Outcome::JustSpawned)
            } else {
                Ok(Outcome::Continue)
            }
        }
        InternalPacket::SetHealth {
            health,
            food,
            saturation,
        } => {
            {
                let mut s = state.borrow_mut();
                s.player.health = health;
                s.player.food = food;
                s.player.saturation = saturation;
            }
            listeners.emit(BotEvent::Health { health, food }).await;
            if health <= 0.0 {
                listeners.emit(BotEvent::Death).await;
            }
            Ok(Outcome::Continue)
        }
        InternalPacket::Disconnect { reason } => {
            Ok(Outcome::End(format!("server disconnected: {}", reason.flatten())))
        }
        InternalPacket::PlayLogin {
            entity_id,
            is_hardcore,
        } => {
            let first_join = {
                let mut s = state.borrow_mut();
                let was_joined = s.joined_game;
                s.player.entity_id = entity_id;
                s.player.is_hardcore = is_hardcore;
                s.joined_game = true;
                !was_joined
            };
            if first_join {
                let player = state.borrow().player.clone();
                listeners.emit(BotEvent::Join(player)).await;
            }
            Ok(Outcome::Continue)
        }
        InternalPacket::SetDefaultSpawnPosition { position, .. } => {
            state.borrow_mut().world.spawn_position = position;
            Ok(Outcome::Continue)
        }
        InternalPacket::GameEvent { event, value } => {
            let mut s = state.borrow_mut();
            match event {
                1 => {
                    s.world.weather = if value > 0.0 {
                        strider_types::Weather::Rain
                    } else {
                        strider_types::Weather::Clear
                    };
                }
                3 => {
                    s.player.gamemode = GameMode::from_id(value as u8).id();
                }
                _ => {}
            }
            Ok(Outcome::Continue)
        }
        InternalPacket::UpdateTime { time_of_day } => {
            state.borrow_mut().world.time_of_day = time_of_day.abs() % 24000;
            Ok(Outcome::Continue)
        }
        InternalPacket::ChunkDataAndUpdateLight {
            chunk_x,
            chunk_z,
            heightmaps_present,
            data,
        } => {
            let mut s = state.borrow_mut();
            let section_count = s.world.section_count();
            let sections = parse_chunk_sections(&data, section_count);
            let min_section_y = s.world.min_section_y();
            let mut by_section = std::collections::HashMap::new();
            for (i, section) in sections.into_iter().enumerate() {
                by_section.insert(min_section_y + i as i32, section);
            }
            s.world.insert_chunk(ChunkData {
                cx: chunk_x,
                cz: chunk_z,
                sections: by_section,
                has_heightmaps: heightmaps_present,
            });
            Ok(Outcome::Continue)
        }
        InternalPacket::BlockUpdate { position, block_id } => {
            state.borrow_mut().record_block_update(position, block_id);
            Ok(Outcome::Continue)
        }
        InternalPacket::SpawnEntity {
            entity_id,
            entity_uuid,
            entity_type,
            x,
            y,
            z,
            pitch,
            yaw,
            velocity_x,
            velocity_y,
            velocity_z,
            ..
        } => {
            state.borrow_mut().world.entities.insert(
                entity_id,
                RemoteEntity {
                    entity_id,
                    uuid: entity_uuid,
                    entity_type,
                    x,
                    y,
                    z,
                    yaw,
                    pitch,
                    velocity_x,
                    velocity_y,
                    velocity_z,
                },
            );
            Ok(Outcome::Continue)
        }
        InternalPacket::RemoveEntities { entity_ids } => {
            state.borrow_mut().world.remove_entities(&entity_ids);
            Ok(Outcome::Continue)
        }
        InternalPacket::UpdateEntityPosition {
            entity_id,
            delta_x,
            delta_y,
            delta_z,
            ..
        } => {
            state
                .borrow_mut()
                .world
                .apply_entity_delta(entity_id, delta_x, delta_y, delta_z);
            Ok(Outcome::Continue)
        }
        InternalPacket::UpdateEntityPositionAndRotation {
            entity_id,
            delta_x,
            delta_y,
            delta_z,
            ..
        } => {
            state
                .borrow_mut()
                .world
                .apply_entity_delta(entity_id, delta_x, delta_y, delta_z);
            Ok(Outcome::Continue)
        }
        InternalPacket::UpdateEntityRotation { .. } => Ok(Outcome::Continue),
        InternalPacket::UnloadChunk { chunk_x, chunk_z } => {
            state.borrow_mut().world.unload_chunk(chunk_x, chunk_z);
            Ok(Outcome::Continue)
        }
        InternalPacket::StartConfiguration => {
            // Known quirk: the reference source this bot is wire-compatible with replies
            // with raw id 0x0C here instead of the properly-versioned Configuration
            // Acknowledged id. Preserved verbatim.
            writer.borrow_mut().write_packet(0x0C, &[]).await?;
            {
                let mut s = state.borrow_mut();
                s.joined_game = false;
                s.spawn_confirmed = false;
            }
            Ok(Outcome::ChangeState(ConnectionState::Configuration))
        }
        InternalPacket::Ping { id } => {
            send(adapter, writer, ConnectionState::Play, &InternalPacket::Pong { id }).await?;
            Ok(Outcome::Continue)
        }
        InternalPacket::SetCenterChunk { chunk_x, chunk_z } => {
            debug!("set center chunk: ({}, {})", chunk_x, chunk_z);
            Ok(Outcome::Continue)
        }
        InternalPacket::ChunkBatchStart => Ok(Outcome::Continue),
        InternalPacket::ChunkBatchFinished { batch_size } => {
            debug!("chunk batch finished: {} chunks", batch_size);
            Ok(Outcome::Continue)
        }
        InternalPacket::Unknown { .. } => Ok(Outcome::Continue),
        _ => Ok(Outcome::Continue),
    }
}

fn apply_teleport(
    state: &mut BotState,
    x: f64,
    y: f64,
    z: f64,
    yaw: f32,
    pitch: f32,
    flags: u8,
) {
    let pos = &mut state.player.position;
    pos.x = if flags & 0x01 != 0 { pos.x + x } else { x };
    pos.y = if flags & 0x02 != 0 { pos.y + y } else { y };
    pos.z = if flags & 0x04 != 0 { pos.z + z } else { z };
    pos.yaw = if flags & 0x08 != 0 { pos.yaw + yaw } else { yaw };
    pos.pitch = if flags & 0x10 != 0 { pos.pitch + pitch } else { pitch };
}

#[cfg(test)]
mod tests {
    use super::*;
    use strider_types::Position;

    #[test]
    fn absolute_teleport_replaces_fields() {
        let mut state = BotState::new();
        state.player.position = Position::new(0.0, 0.0, 0.0);
        apply_teleport(&mut state, 10.0, 20.0, 30.0, 90.0, 10.0, 0);
        assert_eq!(state.player.position.x, 10.0);
        assert_eq!(state.player.position.y, 20.0);
        assert_eq!(state.player.position.z, 30.0);
    }

    #[test]
    fn relative_teleport_adds_to_fields() {
        let mut state = BotState::new();
        state.player.position = Position::new(1.0, 2.0, 3.0);
        apply_teleport(&mut state, 1.0, 1.0, 1.0, 0.0, 0.0, 0x01 | 0x02 | 0x04);
        assert_eq!(state.player.position.x, 2.0);
        assert_eq!(state.player.position.y, 3.0);
        assert_eq!(state.player.position.z, 4.0);
    }

    #[test]
    fn mixed_flags_apply_per_axis_independently() {
        let mut state = BotState::new();
        state.player.position = Position::new(5.0, 5.0, 5.0);
        apply_teleport(&mut state, 1.0, 100.0, 1.0, 0.0, 0.0, 0x01 | 0x04);
        assert_eq!(state.player.position.x, 6.0);
        assert_eq!(state.player.position.y, 100.0);
        assert_eq!(state.player.position.z, 6.0);
    }
}

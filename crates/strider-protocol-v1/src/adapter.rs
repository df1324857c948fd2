use anyhow::{bail, Result};
use bytes::{Buf, BufMut, BytesMut};
use strider_protocol_core::*;
use strider_types::{BlockPos, GameProfile, TextComponent};

/// Adapter for Minecraft Java Edition protocol 774 ("1.21.11").
///
/// Packet ids below are sourced from the reference client this bot's wire behavior
/// was modeled on, which matches this protocol revision exactly (a different revision,
/// 767, numbers several of these packets differently).
pub struct V1Adapter;

impl V1Adapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for V1Adapter {
    fn default() -> Self {
        Self::new()
    }
}

/// The protocol version this adapter speaks.
pub const PROTOCOL_VERSION: i32 = 774;

impl ProtocolAdapter for V1Adapter {
    fn protocol_version(&self) -> i32 {
        PROTOCOL_VERSION
    }

    fn decode_packet(
        &self,
        state: ConnectionState,
        id: i32,
        data: &mut BytesMut,
    ) -> Result<InternalPacket> {
        match state {
            ConnectionState::Handshaking | ConnectionState::Status => Ok(InternalPacket::Unknown {
                packet_id: id,
                data: data.to_vec(),
            }),
            ConnectionState::Login => decode_login(id, data),
            ConnectionState::Configuration => decode_configuration(id, data),
            ConnectionState::Play => decode_play(id, data),
        }
    }

    fn encode_packet(&self, state: ConnectionState, packet: &InternalPacket) -> Result<BytesMut> {
        match state {
            ConnectionState::Handshaking => encode_handshaking(packet),
            ConnectionState::Login => encode_login(packet),
            ConnectionState::Configuration => encode_configuration(packet),
            ConnectionState::Play => encode_play(packet),
            ConnectionState::Status => bail!("Status state is not used by this client"),
        }
    }
}

// === Login packet ids ===
const LOGIN_DISCONNECT: i32 = 0x00;
const LOGIN_ENCRYPTION_REQUEST: i32 = 0x01;
const LOGIN_SUCCESS: i32 = 0x02;
const LOGIN_SET_COMPRESSION: i32 = 0x03;
const LOGIN_START: i32 = 0x00;
const LOGIN_ACKNOWLEDGED: i32 = 0x03;

// === Configuration packet ids ===
const CONFIG_CLIENT_INFORMATION: i32 = 0x00;
const CONFIG_PLUGIN_MESSAGE_CB: i32 = 0x01;
const CONFIG_DISCONNECT: i32 = 0x02;
const CONFIG_FINISH: i32 = 0x03;
const CONFIG_KEEP_ALIVE: i32 = 0x04;
const CONFIG_RESOURCE_PACK_RESPONSE: i32 = 0x06;
const CONFIG_REGISTRY_DATA: i32 = 0x07;
const CONFIG_RESOURCE_PACK_PUSH: i32 = 0x09;
const CONFIG_FEATURE_FLAGS: i32 = 0x0C;
const CONFIG_KNOWN_PACKS_REQUEST: i32 = 0x0E;
const CONFIG_KNOWN_PACKS_RESPONSE: i32 = 0x07;

// === Play packet ids (clientbound, protocol 774) ===
mod play_cb {
    pub const SPAWN_ENTITY: i32 = 0x01;
    pub const BLOCK_UPDATE: i32 = 0x09;
    pub const CHUNK_BATCH_FINISHED: i32 = 0x0C;
    pub const CHUNK_BATCH_START: i32 = 0x0D;
    pub const DISCONNECT: i32 = 0x1D;
    pub const UNLOAD_CHUNK: i32 = 0x22;
    pub const GAME_EVENT: i32 = 0x23;
    pub const KEEP_ALIVE: i32 = 0x27;
    pub const CHUNK_DATA_AND_UPDATE_LIGHT: i32 = 0x28;
    pub const LOGIN: i32 = 0x2C;
    pub const UPDATE_ENTITY_POSITION: i32 = 0x2F;
    pub const UPDATE_ENTITY_POSITION_AND_ROTATION: i32 = 0x30;
    pub const UPDATE_ENTITY_ROTATION: i32 = 0x31;
    pub const PING: i32 = 0x36;
    pub const REMOVE_ENTITIES: i32 = 0x43;
    pub const SET_CENTER_CHUNK: i32 = 0x54;
    pub const SET_DEFAULT_SPAWN_POSITION: i32 = 0x56;
    pub const SET_HEALTH: i32 = 0x5D;
    pub const SYNCHRONIZE_PLAYER_POSITION: i32 = 0x41;
    pub const UPDATE_TIME: i32 = 0x64;
    pub const START_CONFIGURATION: i32 = 0x69;
}

// === Play packet ids (serverbound) ===
mod play_sb {
    pub const CONFIRM_TELEPORTATION: i32 = 0x00;
    pub const CLIENT_STATUS: i32 = 0x09;
    pub const CHAT_COMMAND: i32 = 0x05;
    pub const CHAT_MESSAGE: i32 = 0x07;
    pub const KEEP_ALIVE: i32 = 0x18;
    pub const PLAYER_POSITION: i32 = 0x1C;
    pub const PLAYER_POSITION_AND_ROTATION: i32 = 0x1D;
    pub const PLAYER_ROTATION: i32 = 0x1E;
    pub const PLAYER_ON_GROUND: i32 = 0x1F;
    pub const PLAYER_COMMAND: i32 = 0x25;
    pub const HELD_ITEM_CHANGE: i32 = 0x2F;
    pub const PONG: i32 = 0x28;
    pub const SWING_ARM: i32 = 0x39;
    pub const USE_ITEM: i32 = 0x3D;
}

// === Decode: Login (clientbound) ===

fn decode_login(id: i32, data: &mut BytesMut) -> Result<InternalPacket> {
    match id {
        LOGIN_DISCONNECT => {
            let reason = read_string(data, 262144)?;
            Ok(InternalPacket::Disconnect {
                reason: TextComponent::from_wire(&reason),
            })
        }
        LOGIN_ENCRYPTION_REQUEST => Ok(InternalPacket::EncryptionRequest),
        LOGIN_SUCCESS => {
            let uuid = read_uuid(data)?;
            let name = read_string(data, 16)?;
            // Trailing property array is not modeled; the outer frame length already
            // bounds this packet, so leaving it unconsumed is harmless.
            Ok(InternalPacket::LoginSuccess {
                profile: GameProfile::new(uuid, name),
            })
        }
        LOGIN_SET_COMPRESSION => {
            let threshold = read_varint(data)?;
            Ok(InternalPacket::SetCompression { threshold })
        }
        _ => Ok(InternalPacket::Unknown {
            packet_id: id,
            data: data.to_vec(),
        }),
    }
}

// === Encode: Login (serverbound) ===

fn encode_login(packet: &InternalPacket) -> Result<BytesMut> {
    let mut buf = BytesMut::new();
    match packet {
        InternalPacket::LoginStart { name, uuid } => {
            write_varint(&mut buf, LOGIN_START);
            write_string(&mut buf, name);
            write_uuid(&mut buf, uuid);
        }
        InternalPacket::LoginAcknowledged => {
            write_varint(&mut buf, LOGIN_ACKNOWLEDGED);
        }
        _ => bail!(
            "cannot encode {:?} in Login state",
            std::mem::discriminant(packet)
        ),
    }
    Ok(buf)
}

// === Decode: Configuration (clientbound) ===

fn decode_configuration(id: i32, data: &mut BytesMut) -> Result<InternalPacket> {
    match id {
        CONFIG_PLUGIN_MESSAGE_CB => {
            let channel = read_string(data, 32767)?;
            Ok(InternalPacket::PluginMessage { channel })
        }
        CONFIG_DISCONNECT => {
            let reason = read_string(data, 262144)?;
            Ok(InternalPacket::Disconnect {
                reason: TextComponent::from_wire(&reason),
            })
        }
        CONFIG_FINISH => Ok(InternalPacket::FinishConfiguration),
        CONFIG_KEEP_ALIVE => {
            let id = data.get_i64();
            Ok(InternalPacket::KeepAliveClientbound { id })
        }
        CONFIG_REGISTRY_DATA => {
            let registry_id = read_string(data, 32767)?;
            Ok(InternalPacket::RegistryData { registry_id })
        }
        CONFIG_RESOURCE_PACK_PUSH => {
            let uuid = read_uuid(data)?;
            let _url = read_string(data, 32767)?;
            let _hash = read_string(data, 40)?;
            let _forced = data.get_u8() != 0;
            Ok(InternalPacket::ResourcePackPush { uuid })
        }
        CONFIG_FEATURE_FLAGS => {
            let count = read_varint(data)? as usize;
            let mut flags = Vec::with_capacity(count);
            for _ in 0..count {
                flags.push(read_string(data, 32767)?);
            }
            Ok(InternalPacket::FeatureFlags { flags })
        }
        CONFIG_KNOWN_PACKS_REQUEST => {
            let count = read_varint(data)? as usize;
            let mut packs = Vec::with_capacity(count);
            for _ in 0..count {
                let namespace = read_string(data, 32767)?;
                let pack_id = read_string(data, 32767)?;
                let version = read_string(data, 32767)?;
                packs.push(KnownPack {
                    namespace,
                    id: pack_id,
                    version,
                });
            }
            Ok(InternalPacket::KnownPacksRequest { packs })
        }
        _ => Ok(InternalPacket::Unknown {
            packet_id: id,
            data: data.to_vec(),
        }),
    }
}

// === Encode: Configuration (serverbound) ===

fn encode_configuration(packet: &InternalPacket) -> Result<BytesMut> {
    let mut buf = BytesMut::new();
    match packet {
        InternalPacket::ClientInformation {
            locale,
            view_distance,
            chat_mode,
            chat_colors,
            skin_parts,
            main_hand,
            text_filtering,
            allow_listing,
            particle_status,
        } => {
            write_varint(&mut buf, CONFIG_CLIENT_INFORMATION);
            write_string(&mut buf, locale);
            buf.put_i8(*view_distance);
            write_varint(&mut buf, *chat_mode);
            buf.put_u8(*chat_colors as u8);
            buf.put_u8(*skin_parts);
            write_varint(&mut buf, *main_hand);
            buf.put_u8(*text_filtering as u8);
            buf.put_u8(*allow_listing as u8);
            write_varint(&mut buf, *particle_status);
        }
        InternalPacket::FinishConfigurationAck => {
            write_varint(&mut buf, CONFIG_FINISH);
        }
        InternalPacket::KeepAliveServerbound { id } => {
            write_varint(&mut buf, CONFIG_KEEP_ALIVE);
            buf.put_i64(*id);
        }
        InternalPacket::ResourcePackResponse { uuid, result } => {
            write_varint(&mut buf, CONFIG_RESOURCE_PACK_RESPONSE);
            write_uuid(&mut buf, uuid);
            write_varint(&mut buf, *result);
        }
        InternalPacket::KnownPacksResponse { packs } => {
            write_varint(&mut buf, CONFIG_KNOWN_PACKS_RESPONSE);
            write_varint(&mut buf, packs.len() as i32);
            for pack in packs {
                write_string(&mut buf, &pack.namespace);
                write_string(&mut buf, &pack.id);
                write_string(&mut buf, &pack.version);
            }
        }
        _ => bail!(
            "cannot encode {:?} in Configuration state",
            std::mem::discriminant(packet)
        ),
    }
    Ok(buf)
}

// === Encode: Handshaking (serverbound) ===

fn encode_handshaking(packet: &InternalPacket) -> Result<BytesMut> {
    let mut buf = BytesMut::new();
    match packet {
        InternalPacket::Handshake {
            protocol_version,
            server_address,
            server_port,
            next_state,
        } => {
            write_varint(&mut buf, 0x00);
            write_varint(&mut buf, *protocol_version);
            write_string(&mut buf, server_address);
            buf.put_u16(*server_port);
            write_varint(&mut buf, *next_state);
        }
        _ => bail!(
            "cannot encode {:?} in Handshaking state",
            std::mem::discriminant(packet)
        ),
    }
    Ok(buf)
}

// === Decode: Play (clientbound) ===

fn decode_play(id: i32, data: &mut BytesMut) -> Result<InternalPacket> {
    match id {
        play_cb::KEEP_ALIVE => {
            let id = data.get_i64();
            Ok(InternalPacket::KeepAliveClientbound { id })
        }
        play_cb::SYNCHRONIZE_PLAYER_POSITION => {
            let teleport_id = read_varint(data)?;
            let x = data.get_f64();
            let y = data.get_f64();
            let z = data.get_f64();
            let _vx = data.get_f64();
            let _vy = data.get_f64();
            let _vz = data.get_f64();
            let yaw = data.get_f32();
            let pitch = data.get_f32();
            let flags = data.get_i32() as u8;
            Ok(InternalPacket::SynchronizePlayerPosition {
                x,
                y,
                z,
                yaw,
                pitch,
                flags,
                teleport_id,
            })
        }
        play_cb::SET_HEALTH => {
            let health = data.get_f32();
            let food = read_varint(data)?;
            let saturation = data.get_f32();
            Ok(InternalPacket::SetHealth {
                health,
                food,
                saturation,
            })
        }
        play_cb::DISCONNECT => {
            let reason = read_string(data, 262144)?;
            Ok(InternalPacket::Disconnect {
                reason: TextComponent::from_wire(&reason),
            })
        }
        play_cb::LOGIN => {
            let entity_id = data.get_i32();
            let is_hardcore = data.get_u8() != 0;
            Ok(InternalPacket::PlayLogin {
                entity_id,
                is_hardcore,
            })
        }
        play_cb::SET_DEFAULT_SPAWN_POSITION => {
            let position = BlockPos::decode(data.get_u64());
            let angle = data.get_f32();
            Ok(InternalPacket::SetDefaultSpawnPosition { position, angle })
        }
        play_cb::GAME_EVENT => {
            let event = data.get_u8();
            let value = data.get_f32();
            Ok(InternalPacket::GameEvent { event, value })
        }
        play_cb::UPDATE_TIME => {
            let _world_age = data.get_i64();
            let time_of_day = data.get_i64();
            Ok(InternalPacket::UpdateTime { time_of_day })
        }
        play_cb::CHUNK_DATA_AND_UPDATE_LIGHT => {
            let chunk_x = data.get_i32();
            let chunk_z = data.get_i32();
            let heightmaps_present = data.get_u8() != 0;
            let data_size = read_varint(data)? as usize;
            if data.remaining() < data_size {
                bail!("chunk data shorter than declared data_size");
            }
            let section_bytes = data.split_to(data_size).to_vec();
            Ok(InternalPacket::ChunkDataAndUpdateLight {
                chunk_x,
                chunk_z,
                heightmaps_present,
                data: section_bytes,
            })
        }
        play_cb::UNLOAD_CHUNK => {
            // Wire order for this revision is (z, x), not (x, z).
            let chunk_z = data.get_i32();
            let chunk_x = data.get_i32();
            Ok(InternalPacket::UnloadChunk { chunk_x, chunk_z })
        }
        play_cb::BLOCK_UPDATE => {
            let position = BlockPos::decode(data.get_u64());
            let block_id = read_varint(data)?;
            Ok(InternalPacket::BlockUpdate { position, block_id })
        }
        play_cb::SPAWN_ENTITY => {
            let entity_id = read_varint(data)?;
            let entity_uuid = read_uuid(data)?;
            let entity_type = read_varint(data)?;
            let x = data.get_f64();
            let y = data.get_f64();
            let z = data.get_f64();
            let pitch = data.get_u8();
            let yaw = data.get_u8();
            let head_yaw = data.get_u8();
            let entity_data = read_varint(data)?;
            let velocity_x = data.get_i16();
            let velocity_y = data.get_i16();
            let velocity_z = data.get_i16();
            Ok(InternalPacket::SpawnEntity {
                entity_id,
                entity_uuid,
                entity_type,
                x,
                y,
                z,
                pitch,
                yaw,
                head_yaw,
                data: entity_data,
                velocity_x,
                velocity_y,
                velocity_z,
            })
        }
        play_cb::REMOVE_ENTITIES => {
            let count = read_varint(data)? as usize;
            let mut entity_ids = Vec::with_capacity(count);
            for _ in 0..count {
                entity_ids.push(read_varint(data)?);
            }
            Ok(InternalPacket::RemoveEntities { entity_ids })
        }
        play_cb::UPDATE_ENTITY_POSITION => {
            let entity_id = read_varint(data)?;
            let delta_x = data.get_i16();
            let delta_y = data.get_i16();
            let delta_z = data.get_i16();
            let on_ground = data.get_u8() != 0;
            Ok(InternalPacket::UpdateEntityPosition {
                entity_id,
                delta_x,
                delta_y,
                delta_z,
                on_ground,
            })
        }
        play_cb::UPDATE_ENTITY_POSITION_AND_ROTATION => {
            let entity_id = read_varint(data)?;
            let delta_x = data.get_i16();
            let delta_y = data.get_i16();
            let delta_z = data.get_i16();
            let yaw = data.get_u8();
            let pitch = data.get_u8();
            let on_ground = data.get_u8() != 0;
            Ok(InternalPacket::UpdateEntityPositionAndRotation {
                entity_id,
                delta_x,
                delta_y,
                delta_z,
                yaw,
                pitch,
                on_ground,
            })
        }
        play_cb::UPDATE_ENTITY_ROTATION => {
            let entity_id = read_varint(data)?;
            let yaw = data.get_u8();
            let pitch = data.get_u8();
            let on_ground = data.get_u8() != 0;
            Ok(InternalPacket::UpdateEntityRotation {
                entity_id,
                yaw,
                pitch,
                on_ground,
            })
        }
        play_cb::START_CONFIGURATION => Ok(InternalPacket::StartConfiguration),
        play_cb::PING => {
            let id = data.get_i32();
            Ok(InternalPacket::Ping { id })
        }
        play_cb::SET_CENTER_CHUNK => {
            let chunk_x = read_varint(data)?;
            let chunk_z = read_varint(data)?;
            Ok(InternalPacket::SetCenterChunk { chunk_x, chunk_z })
        }
        play_cb::CHUNK_BATCH_START => Ok(InternalPacket::ChunkBatchStart),
        play_cb::CHUNK_BATCH_FINISHED => {
            let batch_size = read_varint(data)?;
            Ok(InternalPacket::ChunkBatchFinished { batch_size })
        }
        _ => Ok(InternalPacket::Unknown {
            packet_id: id,
            data: data.to_vec(),
        }),
    }
}

// === Encode: Play (serverbound) ===

fn encode_play(packet: &InternalPacket) -> Result<BytesMut> {
    let mut buf = BytesMut::new();
    match packet {
        InternalPacket::ConfirmTeleportation { teleport_id } => {
            write_varint(&mut buf, play_sb::CONFIRM_TELEPORTATION);
            write_varint(&mut buf, *teleport_id);
        }
        InternalPacket::ChatMessage {
            message,
            timestamp,
            salt,
            has_signature,
            signature,
            offset,
            acknowledged,
        } => {
            write_varint(&mut buf, play_sb::CHAT_MESSAGE);
            write_string(&mut buf, message);
            buf.put_i64(*timestamp);
            buf.put_i64(*salt);
            buf.put_u8(*has_signature as u8);
            if let Some(sig) = signature {
                buf.extend_from_slice(sig);
            }
            write_varint(&mut buf, *offset);
            buf.extend_from_slice(acknowledged);
        }
        InternalPacket::ChatCommand { command } => {
            write_varint(&mut buf, play_sb::CHAT_COMMAND);
            write_string(&mut buf, command);
        }
        InternalPacket::KeepAliveServerbound { id } => {
            write_varint(&mut buf, play_sb::KEEP_ALIVE);
            buf.put_i64(*id);
        }
        InternalPacket::PlayerPosition { x, y, z, on_ground } => {
            write_varint(&mut buf, play_sb::PLAYER_POSITION);
            buf.put_f64(*x);
            buf.put_f64(*y);
            buf.put_f64(*z);
            buf.put_u8(*on_ground as u8);
        }
        InternalPacket::PlayerPositionAndRotation {
            x,
            y,
            z,
            yaw,
            pitch,
            on_ground,
        } => {
            write_varint(&mut buf, play_sb::PLAYER_POSITION_AND_ROTATION);
            buf.put_f64(*x);
            buf.put_f64(*y);
            buf.put_f64(*z);
            buf.put_f32(*yaw);
            buf.put_f32(*pitch);
            buf.put_u8(*on_ground as u8);
        }
        InternalPacket::PlayerRotation {
            yaw,
            pitch,
            on_ground,
        } => {
            write_varint(&mut buf, play_sb::PLAYER_ROTATION);
            buf.put_f32(*yaw);
            buf.put_f32(*pitch);
            buf.put_u8(*on_ground as u8);
        }
        InternalPacket::PlayerOnGround { on_ground } => {
            write_varint(&mut buf, play_sb::PLAYER_ON_GROUND);
            buf.put_u8(*on_ground as u8);
        }
        InternalPacket::PlayerCommand {
            entity_id,
            action_id,
            jump_boost,
        } => {
            write_varint(&mut buf, play_sb::PLAYER_COMMAND);
            write_varint(&mut buf, *entity_id);
            write_varint(&mut buf, *action_id);
            write_varint(&mut buf, *jump_boost);
        }
        InternalPacket::HeldItemChange { slot } => {
            write_varint(&mut buf, play_sb::HELD_ITEM_CHANGE);
            buf.put_i16(*slot);
        }
        InternalPacket::SwingArm { hand } => {
            write_varint(&mut buf, play_sb::SWING_ARM);
            write_varint(&mut buf, *hand);
        }
        InternalPacket::UseItem { hand, sequence } => {
            write_varint(&mut buf, play_sb::USE_ITEM);
            write_varint(&mut buf, *hand);
            write_varint(&mut buf, *sequence);
            buf.put_f32(0.0);
            buf.put_f32(0.0);
        }
        InternalPacket::Pong { id } => {
            write_varint(&mut buf, play_sb::PONG);
            buf.put_i32(*id);
        }
        InternalPacket::ClientStatus { action } => {
            write_varint(&mut buf, play_sb::CLIENT_STATUS);
            write_varint(&mut buf, *action);
        }
        _ => bail!(
            "cannot encode {:?} in Play state",
            std::mem::discriminant(packet)
        ),
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> V1Adapter {
        V1Adapter::new()
    }

    #[test]
    fn keep_alive_round_trips_through_play_state() {
        let adapter = adapter();
        let packet = InternalPacket::KeepAliveServerbound { id: 123456789 };
        let mut encoded = adapter
            .encode_packet(ConnectionState::Play, &packet)
            .unwrap();
        let packet_id = read_varint(&mut encoded).unwrap();
        assert_eq!(packet_id, play_sb::KEEP_ALIVE);
    }

    #[test]
    fn synchronize_player_position_decodes_flags_and_teleport_id() {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, 42);
        buf.put_f64(1.0);
        buf.put_f64(64.0);
        buf.put_f64(-2.0);
        buf.put_f64(0.0);
        buf.put_f64(0.0);
        buf.put_f64(0.0);
        buf.put_f32(90.0);
        buf.put_f32(0.0);
        buf.put_i32(0x07);

        let decoded = adapter()
            .decode_packet(ConnectionState::Play, play_cb::SYNCHRONIZE_PLAYER_POSITION, &mut buf)
            .unwrap();
        match decoded {
            InternalPacket::SynchronizePlayerPosition {
                x,
                flags,
                teleport_id,
                ..
            } => {
                assert_eq!(x, 1.0);
                assert_eq!(flags, 0x07);
                assert_eq!(teleport_id, 42);
            }
            other => panic!("unexpected packet: {:?}", other),
        }
    }

    #[test]
    fn unload_chunk_reads_z_before_x() {
        let mut buf = BytesMut::new();
        buf.put_i32(7); // z
        buf.put_i32(3); // x
        let decoded = adapter()
            .decode_packet(ConnectionState::Play, play_cb::UNLOAD_CHUNK, &mut buf)
            .unwrap();
        match decoded {
            InternalPacket::UnloadChunk { chunk_x, chunk_z } => {
                assert_eq!(chunk_x, 3);
                assert_eq!(chunk_z, 7);
            }
            other => panic!("unexpected packet: {:?}", other),
        }
    }

    #[test]
    fn unknown_play_packet_preserves_raw_bytes() {
        let mut buf = BytesMut::from(&b"abc"[..]);
        let decoded = adapter()
            .decode_packet(ConnectionState::Play, 0x7F, &mut buf)
            .unwrap();
        match decoded {
            InternalPacket::Unknown { packet_id, data } => {
                assert_eq!(packet_id, 0x7F);
                assert_eq!(data, b"abc");
            }
            other => panic!("unexpected packet: {:?}", other),
        }
    }
}

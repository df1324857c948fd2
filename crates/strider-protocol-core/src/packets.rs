use strider_types::{BlockPos, GameProfile, TextComponent};
use uuid::Uuid;

/// Version-independent internal packet representation.
/// Protocol adapters convert between wire format and these.
#[derive(Debug, Clone)]
pub enum InternalPacket {
    // === Handshaking (serverbound) ===
    Handshake {
        protocol_version: i32,
        server_address: String,
        server_port: u16,
        next_state: i32,
    },

    // === Login (serverbound) ===
    LoginStart {
        name: String,
        uuid: Uuid,
    },
    LoginAcknowledged,

    // === Login (clientbound) ===
    /// Encryption Request — online-mode auth is out of scope, so the adapter decodes
    /// only enough to recognize the packet and the session fails immediately on receipt.
    EncryptionRequest,
    SetCompression {
        threshold: i32,
    },
    LoginSuccess {
        profile: GameProfile,
    },

    // === Configuration (serverbound) ===
    ClientInformation {
        locale: String,
        view_distance: i8,
        chat_mode: i32,
        chat_colors: bool,
        skin_parts: u8,
        main_hand: i32,
        text_filtering: bool,
        allow_listing: bool,
        particle_status: i32,
    },
    PluginMessage {
        channel: String,
    },
    FinishConfigurationAck,
    KnownPacksResponse {
        packs: Vec<KnownPack>,
    },
    ResourcePackResponse {
        uuid: Uuid,
        result: i32,
    },

    // === Configuration (clientbound) ===
    RegistryData {
        registry_id: String,
    },
    FinishConfiguration,
    KnownPacksRequest {
        packs: Vec<KnownPack>,
    },
    ResourcePackPush {
        uuid: Uuid,
    },
    FeatureFlags {
        flags: Vec<String>,
    },

    // === Shared (Login / Configuration / Play) ===
    Disconnect {
        reason: TextComponent,
    },
    KeepAliveClientbound {
        id: i64,
    },
    KeepAliveServerbound {
        id: i64,
    },

    // === Play (clientbound) ===
    /// Play-state Login packet — distinct from `LoginSuccess`, sent once the client
    /// enters Play for the first time (and again after a Configuration round trip).
    PlayLogin {
        entity_id: i32,
        is_hardcore: bool,
    },
    SynchronizePlayerPosition {
        x: f64,
        y: f64,
        z: f64,
        yaw: f32,
        pitch: f32,
        flags: u8,
        teleport_id: i32,
    },
    SetCenterChunk {
        chunk_x: i32,
        chunk_z: i32,
    },
    ChunkDataAndUpdateLight {
        chunk_x: i32,
        chunk_z: i32,
        /// Whether the heightmaps NBT compound was non-empty; the tag itself is skipped.
        heightmaps_present: bool,
        data: Vec<u8>,
    },
    UnloadChunk {
        chunk_x: i32,
        chunk_z: i32,
    },
    GameEvent {
        event: u8,
        value: f32,
    },
    SetDefaultSpawnPosition {
        position: BlockPos,
        angle: f32,
    },
    BlockUpdate {
        position: BlockPos,
        block_id: i32,
    },
    ChunkBatchStart,
    ChunkBatchFinished {
        batch_size: i32,
    },
    UpdateTime {
        time_of_day: i64,
    },
    SpawnEntity {
        entity_id: i32,
        entity_uuid: Uuid,
        entity_type: i32,
        x: f64,
        y: f64,
        z: f64,
        pitch: u8,
        yaw: u8,
        head_yaw: u8,
        data: i32,
        velocity_x: i16,
        velocity_y: i16,
        velocity_z: i16,
    },
    RemoveEntities {
        entity_ids: Vec<i32>,
    },
    UpdateEntityPosition {
        entity_id: i32,
        delta_x: i16,
        delta_y: i16,
        delta_z: i16,
        on_ground: bool,
    },
    UpdateEntityPositionAndRotation {
        entity_id: i32,
        delta_x: i16,
        delta_y: i16,
        delta_z: i16,
        yaw: u8,
        pitch: u8,
        on_ground: bool,
    },
    UpdateEntityRotation {
        entity_id: i32,
        yaw: u8,
        pitch: u8,
        on_ground: bool,
    },
    SetHealth {
        health: f32,
        food: i32,
        saturation: f32,
    },
    StartConfiguration,
    Ping {
        id: i32,
    },

    // === Play (serverbound) ===
    ConfirmTeleportation {
        teleport_id: i32,
    },
    ChatMessage {
        message: String,
        timestamp: i64,
        salt: i64,
        has_signature: bool,
        signature: Option<Vec<u8>>,
        offset: i32,
        acknowledged: [u8; 3],
    },
    ChatCommand {
        command: String,
    },
    HeldItemChange {
        slot: i16,
    },
    PlayerPosition {
        x: f64,
        y: f64,
        z: f64,
        on_ground: bool,
    },
    PlayerPositionAndRotation {
        x: f64,
        y: f64,
        z: f64,
        yaw: f32,
        pitch: f32,
        on_ground: bool,
    },
    PlayerRotation {
        yaw: f32,
        pitch: f32,
        on_ground: bool,
    },
    PlayerOnGround {
        on_ground: bool,
    },
    PlayerCommand {
        entity_id: i32,
        action_id: i32,
        jump_boost: i32,
    },
    SwingArm {
        hand: i32,
    },
    UseItem {
        hand: i32,
        sequence: i32,
    },
    Pong {
        id: i32,
    },
    ClientStatus {
        action: i32,
    },

    /// Unknown / unhandled packet — raw bytes preserved so the framing stays intact
    /// even for packets this bot does not model.
    Unknown {
        packet_id: i32,
        data: Vec<u8>,
    },
}

#[derive(Debug, Clone)]
pub struct KnownPack {
    pub namespace: String,
    pub id: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_packet_is_cloneable_and_debuggable() {
        let p = InternalPacket::KeepAliveClientbound { id: 42 };
        let cloned = p.clone();
        assert!(format!("{:?}", cloned).contains("42"));
    }
}

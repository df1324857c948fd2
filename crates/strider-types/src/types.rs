use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A block position in the world (x, y, z integers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Encode as a 64-bit long (protocol format).
    /// x: 26 bits, z: 26 bits, y: 12 bits
    pub fn encode(&self) -> u64 {
        ((self.x as u64 & 0x3FFFFFF) << 38)
            | ((self.z as u64 & 0x3FFFFFF) << 12)
            | (self.y as u64 & 0xFFF)
    }

    pub fn decode(val: u64) -> Self {
        let mut x = (val >> 38) as i32;
        let mut z = ((val >> 12) & 0x3FFFFFF) as i32;
        let mut y = (val & 0xFFF) as i32;
        if x >= 1 << 25 {
            x -= 1 << 26;
        }
        if z >= 1 << 25 {
            z -= 1 << 26;
        }
        if y >= 1 << 11 {
            y -= 1 << 12;
        }
        Self { x, y, z }
    }

    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos {
            x: self.x >> 4,
            z: self.z >> 4,
        }
    }
}

/// A chunk position (x, z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// Full player/entity pose: double-precision position plus look angles and ground state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
            on_ground: false,
        }
    }

    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos {
            x: (self.x.floor() as i32) >> 4,
            z: (self.z.floor() as i32) >> 4,
        }
    }

    /// Normalizes yaw into `[0, 360)`. Called after any client-initiated look change.
    pub fn normalize_yaw(&mut self) {
        self.yaw = self.yaw.rem_euclid(360.0);
    }

    /// Clamps pitch into `[-90, 90]`. Called after any client-initiated look change.
    pub fn clamp_pitch(&mut self) {
        self.pitch = self.pitch.clamp(-90.0, 90.0);
    }
}

/// A Minecraft resource identifier (e.g., "minecraft:stone").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub namespace: String,
    pub path: String,
}

impl Identifier {
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
        }
    }

    pub fn minecraft(path: impl Into<String>) -> Self {
        Self::new("minecraft", path)
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl std::str::FromStr for Identifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((ns, path)) = s.split_once(':') {
            Ok(Self::new(ns, path))
        } else {
            Ok(Self::minecraft(s))
        }
    }
}

/// A player's game profile (UUID + name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameProfile {
    pub uuid: Uuid,
    pub name: String,
}

impl GameProfile {
    pub fn new(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
        }
    }
}

/// Text component for chat/disconnect messages (simplified JSON text).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextComponent {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extra: Vec<TextComponent>,
}

impl TextComponent {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            extra: Vec::new(),
        }
    }

    /// Best-effort flattening of this component (and its children) into a single string,
    /// used when a disconnect reason needs to be logged or surfaced as an event payload.
    pub fn flatten(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.extra {
            out.push_str(&child.flatten());
        }
        out
    }

    /// Parses a raw chat/disconnect payload: legacy plain strings, JSON text components,
    /// and already-flattened strings all resolve to a best-effort string.
    pub fn from_wire(raw: &str) -> Self {
        match serde_json::from_str::<TextComponent>(raw) {
            Ok(component) => component,
            Err(_) => Self::plain(raw),
        }
    }
}

/// Game mode enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum GameMode {
    Survival = 0,
    Creative = 1,
    Adventure = 2,
    Spectator = 3,
}

impl GameMode {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Self::Creative,
            2 => Self::Adventure,
            3 => Self::Spectator,
            _ => Self::Survival,
        }
    }
}

/// World weather state, derived from `GameEvent` id 1 (begin raining / stop raining).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weather {
    Clear,
    Rain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_pos_round_trips_negative_coordinates() {
        let pos = BlockPos::new(-12, -64, 300);
        let decoded = BlockPos::decode(pos.encode());
        assert_eq!(pos, decoded);
    }

    #[test]
    fn block_pos_round_trips_positive_coordinates() {
        let pos = BlockPos::new(1_000_000, 319, -2_000_000);
        let decoded = BlockPos::decode(pos.encode());
        assert_eq!(pos, decoded);
    }

    #[test]
    fn yaw_normalizes_into_0_360() {
        let mut pos = Position::new(0.0, 0.0, 0.0);
        pos.yaw = -30.0;
        pos.normalize_yaw();
        assert_eq!(pos.yaw, 330.0);
    }

    #[test]
    fn pitch_clamps_to_plus_minus_90() {
        let mut pos = Position::new(0.0, 0.0, 0.0);
        pos.pitch = 200.0;
        pos.clamp_pitch();
        assert_eq!(pos.pitch, 90.0);
    }

    #[test]
    fn identifier_parses_namespaced_and_bare() {
        assert_eq!(
            "minecraft:stone".parse::<Identifier>().unwrap(),
            Identifier::minecraft("stone")
        );
        assert_eq!(
            "stone".parse::<Identifier>().unwrap(),
            Identifier::minecraft("stone")
        );
    }
}

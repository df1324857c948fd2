pub mod decode;
pub mod world;

pub use decode::{parse_chunk_sections, ChunkSection, DEFAULT_MIN_SECTION_Y, DEFAULT_SECTION_COUNT};
pub use world::{ChunkData, RemoteEntity, WorldState};

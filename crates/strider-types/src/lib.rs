mod player;
mod types;

pub use player::PlayerState;
pub use types::*;

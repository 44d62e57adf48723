pub mod animator;
pub mod packets;

pub use animator::*;
pub use packets::*;

pub mod aurora;
pub mod base;
pub mod colorloop;
pub mod conductor;
pub mod flame;
pub mod frame;
pub mod progress;
pub mod pulse;
pub mod rainbow;
pub mod registry;
pub mod state;
pub mod sunrise;

pub use aurora::*;
pub use base::*;
pub use colorloop::*;
pub use conductor::*;
pub use flame::*;
pub use frame::*;
pub use progress::*;
pub use pulse::*;
pub use rainbow::*;
pub use registry::*;
pub use state::*;
pub use sunrise::*;

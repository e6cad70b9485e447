mod media;
mod peer;
mod room;
mod signaling;

pub use media::*;
pub use peer::*;
pub use room::*;
pub use signaling::*;

pub mod channel;
pub mod clock;
pub mod error;
pub mod state;

pub use channel::*;
pub use clock::*;
pub use error::*;
pub use state::*;

pub mod health;
pub mod messages;

pub use health::*;
pub use messages::*;

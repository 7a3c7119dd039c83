pub mod health;
pub mod page;
pub mod status;

pub use health::*;
pub use page::*;
pub use status::*;

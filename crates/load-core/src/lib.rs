pub mod collector;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod sender;
pub mod stats;

pub use collector::*;
pub use config::*;
pub use dispatcher::*;
pub use error::*;
pub use sender::*;
pub use stats::*;

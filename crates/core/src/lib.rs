// crates/core/src/lib.rs
pub mod config;
pub mod error;
pub mod query;
pub mod types;
pub mod watcher;

pub use config::*;
pub use error::*;
pub use query::*;
pub use types::*;
pub use watcher::*;

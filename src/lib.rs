//! Math quiz core: question banks and generators, the timed quiz session,
//! an observable store with mock authentication, and a small form engine.

pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod quiz;
pub mod store;

pub use config::Config;
pub use error::{ConfigError, CueError, FormError, LoadError, PersistenceError};

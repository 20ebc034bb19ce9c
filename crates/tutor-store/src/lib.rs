//! SQLite persistence for the tutor: one database per learner, a shared
//! `tutor.toml`, and JSON snapshot import/export.

pub mod config;
pub mod error;
pub mod json_bridge;
pub mod learner;
pub mod schema;
pub mod store;

pub use config::{CONFIG_FILE, TutorConfig, load_curriculum, parse_curriculum};
pub use error::{Result, StoreError};
pub use learner::{DEFAULT_LEARNER, LearnerStore, default_base_dir};
pub use store::Store;

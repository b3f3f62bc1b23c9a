pub mod database;
pub mod uploads;

pub use database::{Database, PoolConfig, SharedDatabase};
pub use uploads::UploadStore;

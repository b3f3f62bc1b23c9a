pub mod analyze;
pub mod config;
pub mod models;
pub mod serve;

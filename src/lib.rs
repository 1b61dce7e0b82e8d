pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

pub use engine::SyncEngine;

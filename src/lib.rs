// src/lib.rs

pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod keywords;
pub mod matcher;
pub mod scorer;
pub mod store;

pub use engine::{RecommendationEngine, RefreshOptions, RefreshReport};
pub use error::EngineError;

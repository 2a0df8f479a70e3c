pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;

pub use config::{Config, StoreBackend};
pub use error::{AppError, Result, Stage};
pub use services::{EngineSettings, RecommenderService};
pub use store::{MemorySetStore, RedisSetStore, SetStore, StoreError};

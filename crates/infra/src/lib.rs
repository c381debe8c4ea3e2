//! Infrastructure layer: storage backends, configuration and the application
//! services that orchestrate the domain crates over a [`store::Store`].

pub mod config;
pub mod services;
pub mod store;

pub use config::{AppConfig, ConfigError, StoreConfig};
pub use services::{ServiceError, ServiceResult, Services};
pub use store::{Store, StoreError, StoreResult};

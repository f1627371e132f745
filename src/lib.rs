//! # Portfolio Admin
//!
//! Backend core for a freelancer portfolio site: inbound project inquiries,
//! public case studies, and client testimonials, plus the admin reporting
//! engine that turns those records into dashboard summaries, breakdowns, and
//! monthly series.
//!
//! ## Architecture
//!
//! ```text
//! JSON-RPC client → RpcServer (stdio) → handlers → services
//!                                                     ↓
//!                                              SqliteStorage
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use portfolio_admin::{AppState, Config, RpcServer};
//! use portfolio_admin::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = SqliteStorage::new(&config.database).await?;
//!     let state = Arc::new(AppState::new(config, storage));
//!     RpcServer::new(state).run().await?;
//!     Ok(())
//! }
//! ```

/// Command-line interface.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// JSON-RPC server and operation routing.
pub mod server;
/// Listing, aggregation, dashboard, and mutation services.
pub mod services;
/// SQLite storage layer for persistence.
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, RpcServer, SharedState};

//! Request boundary: JSON-RPC 2.0 over stdio.
//!
//! This module provides:
//! - the stdio server loop and JSON-RPC framing
//! - operation routing, principal checks, and response envelopes
//! - shared application state

mod handlers;
mod rpc;

pub use handlers::*;
pub use rpc::*;

use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    AggregationService, DashboardComposer, ListingService, MutationService, ReportWindow,
};
use crate::storage::{Clock, SqliteStorage};

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// SQLite storage backend.
    pub storage: SqliteStorage,
    /// Source of "now" for reports; shared with the store.
    pub clock: Arc<dyn Clock>,
    pub listing: ListingService,
    pub aggregation: AggregationService,
    pub dashboard: DashboardComposer,
    pub mutation: MutationService,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, storage: SqliteStorage) -> Self {
        let listing = ListingService::new(storage.clone(), config.listing.clone());
        let aggregation = AggregationService::new(storage.clone());
        let dashboard = DashboardComposer::new(
            aggregation.clone(),
            listing.clone(),
            config.listing.dashboard_recent_limit,
        );
        let mutation = MutationService::new(storage.clone());

        tracing::info!(
            database = %config.database.path.display(),
            environment = ?config.environment,
            timeout_ms = config.request.timeout_ms,
            "Application state initialized"
        );

        Self {
            clock: storage.clock(),
            config,
            storage,
            listing,
            aggregation,
            dashboard,
            mutation,
        }
    }

    /// Reporting window anchored at the current instant.
    pub fn report_window(&self) -> ReportWindow {
        let now = self.clock.now();
        ReportWindow::new(now, self.config.reporting.offset_at(now))
    }
}

/// Shared application state handle.
pub type SharedState = Arc<AppState>;

use std::sync::Arc;

use crate::config::Config;
use crate::redaction::PatternSet;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Redaction rules, compiled once at startup. Read-only, so sharing
    /// across concurrent requests needs no synchronization.
    pub patterns: Arc<PatternSet>,
}

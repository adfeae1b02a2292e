use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{completion::TextCompletion, config::AppConfig, payments::PaymentGateway};

/// Shared handles, built once in `main` and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub payments: Arc<dyn PaymentGateway>,
    pub completion: Arc<dyn TextCompletion>,
    pub config: Arc<AppConfig>,
}

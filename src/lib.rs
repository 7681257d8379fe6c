pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;
pub mod utils;

use std::sync::Arc;

use config::Config;
use db::Store;
use service::response_service::ResponseService;

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<dyn Store>,
    pub response_service: Arc<ResponseService<dyn Store>>,
}

impl AppState {
    pub fn new(env: Config, db_client: Arc<dyn Store>) -> Self {
        let response_service = Arc::new(ResponseService::new(Arc::clone(&db_client)));
        AppState {
            env,
            db_client,
            response_service,
        }
    }
}

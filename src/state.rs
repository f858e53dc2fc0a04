use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::availability::SlotBoards;
use crate::services::backend::BookingBackend;
use crate::services::gateway::PaymentGatewayClient;
use crate::services::in_flight::InFlight;
use crate::services::order_id::OrderIdGenerator;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub backend: Box<dyn BookingBackend>,
    pub gateway: Box<dyn PaymentGatewayClient>,
    pub order_ids: OrderIdGenerator,
    pub slot_boards: SlotBoards,
    pub in_flight: InFlight,
}

impl AppState {
    pub fn new(
        conn: Connection,
        config: AppConfig,
        backend: Box<dyn BookingBackend>,
        gateway: Box<dyn PaymentGatewayClient>,
    ) -> Self {
        let order_ids = OrderIdGenerator::new(&config.order_id_prefix);
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            backend,
            gateway,
            order_ids,
            slot_boards: SlotBoards::default(),
            in_flight: InFlight::default(),
        }
    }

    /// Runs `f` against the ledger. Never call across an `.await`.
    pub fn with_db<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, AppError> {
        let conn = self
            .db
            .lock()
            .map_err(|_| AppError::Internal("ledger lock poisoned".to_string()))?;
        Ok(f(&conn)?)
    }
}

use std::sync::Arc;
use std::time::Instant;

use sea_orm::DatabaseConnection;

use crate::csrf::CsrfGuard;
use crate::ledger::ContributionLedger;

#[derive(Clone)]
pub struct AppState {
    pub database: DatabaseConnection,
    pub ledger: ContributionLedger,
    pub csrf: Arc<CsrfGuard>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        database: DatabaseConnection,
        ledger: ContributionLedger,
        csrf: Arc<CsrfGuard>,
    ) -> Self {
        assert!(
            Arc::strong_count(&csrf) >= 1,
            "CSRF guard must be shared"
        );
        Self {
            database,
            ledger,
            csrf,
            start_time: Instant::now(),
        }
    }
}

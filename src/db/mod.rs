mod from_row;
pub mod queries;
mod schema;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::attribution::{Destination, MetaClient};
use crate::payments::StripeClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared across request handlers
#[derive(Clone)]
pub struct AppState {
    /// Ledger database pool (conversions + campaign mappings)
    pub db: DbPool,
    /// Stripe API client (signature verification + customer lookup)
    pub stripe: StripeClient,
    /// Meta Conversions API client
    pub meta: MetaClient,
    /// Fallback destination used when no campaign mapping matches
    pub default_destination: Option<Destination>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    // Concurrent deliveries of the same event race on the UNIQUE
    // constraint; writers must wait for the lock, not fail with BUSY
    let manager = SqliteConnectionManager::file(database_path)
        .with_init(|conn| conn.busy_timeout(std::time::Duration::from_secs(5)));
    Pool::builder().max_size(10).build(manager)
}

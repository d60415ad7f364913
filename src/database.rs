//! Database initialization and table definitions
//!
//! This module handles the setup and configuration of the embedded redb database.
//! It defines the database tables and the state shared by all request handlers.

use redb::{Database, TableDefinition};
use std::sync::Arc;

use crate::allocator::{CodeAllocator, CodeGenerator, RandomCodeGenerator};
use crate::config::Config;
use crate::resolver::RedirectResolver;
use crate::service::LinkService;
use crate::store::LinkStore;

/// Main table for storing link records
///
/// Key: Link id (UUID) as string
/// Value: JSON-serialized Link as string
pub const TABLE_LINKS: TableDefinition<&str, &str> = TableDefinition::new("links_v1");

/// Uniqueness constraint on short codes
///
/// Key: Short code (e.g. "abc123")
/// Value: Id of the link that owns the code
///
/// Every write that assigns a code checks and updates this table inside the
/// same transaction, so two links can never hold the same code.
pub const TABLE_CODES: TableDefinition<&str, &str> = TableDefinition::new("codes_v1");

/// Index table for listing links by owner
///
/// Key: `(owner_id, created_at_micros, link_id)`
/// Value: Link id
///
/// Tuple ordering keeps one owner's entries contiguous and chronological,
/// so a reversed range scan yields newest first.
pub const TABLE_OWNER_INDEX: TableDefinition<(&str, i64, &str), &str> =
    TableDefinition::new("owner_index_v1");

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub links: LinkService,
    pub resolver: RedirectResolver,
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the state with the random code generator from `config`
    pub fn new(db: Database, config: Config) -> Self {
        let generator = RandomCodeGenerator::new(config.code_length);
        Self::with_generator(db, config, Arc::new(generator))
    }

    /// Builds the state with a caller-supplied code generator
    pub fn with_generator(
        db: Database,
        config: Config,
        generator: Arc<dyn CodeGenerator>,
    ) -> Self {
        let store = LinkStore::new(Arc::new(db));
        let allocator = CodeAllocator::new(store.clone(), generator, config.max_attempts)
            .with_reserved(config.reserved_codes());

        Self {
            links: LinkService::new(store.clone(), allocator),
            resolver: RedirectResolver::new(store),
            config: Arc::new(config),
        }
    }
}

/// Initializes the embedded database and creates required tables
///
/// This function:
/// 1. Creates or opens the database file at the specified path
/// 2. Opens the links, codes and owner index tables
/// 3. Commits the transaction to ensure tables are persisted
///
/// # Example
///
/// ```no_run
/// # use shortlink::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_LINKS)?;
        write_txn.open_table(TABLE_CODES)?;
        write_txn.open_table(TABLE_OWNER_INDEX)?;
    }
    write_txn.commit()?;

    Ok(db)
}

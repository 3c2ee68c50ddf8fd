//! PostgreSQL connectivity: async bb8 pool for the pipeline and blocking
//! connections for embedded migrations.

mod migrations;
mod pool;

pub use migrations::{MIGRATIONS, pending_migrations, revert_migrations, run_migrations};
pub use pool::{AsyncDbPool, establish_async_connection_pool};

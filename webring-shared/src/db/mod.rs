/// Database layer
///
/// - `pool`: PostgreSQL connection pool lifecycle (create, health check, close)
/// - `migrations`: embedded migration runner
///
/// Row types and queries are in `models`; services reach them through
/// `store::PgStore`.

pub mod migrations;
pub mod pool;

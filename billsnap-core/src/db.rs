use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Table backing [`crate::sync::PgRemoteBills`].
const BILLS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS bills (
    id UUID PRIMARY KEY,
    merchant_id TEXT NOT NULL,
    image_uri TEXT NOT NULL,
    store_name TEXT NOT NULL,
    bill_date DATE NOT NULL,
    category TEXT NOT NULL,
    tax_paid NUMERIC(12, 2) NOT NULL DEFAULT 0,
    total NUMERIC(12, 2) NOT NULL DEFAULT 0
)
"#;

const MERCHANT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS bills_merchant_id_idx ON bills (merchant_id)";

/// Connects to the remote bill database.
///
/// The pool is small: the app only issues one fetch at startup and one
/// upsert per committed bill.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url)
        .await
}

/// Creates the `bills` table and its merchant index if they are missing.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(BILLS_TABLE).execute(pool).await?;
    sqlx::query(MERCHANT_INDEX).execute(pool).await?;
    info!("Remote bills schema ready");
    Ok(())
}

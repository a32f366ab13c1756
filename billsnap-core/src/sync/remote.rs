use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::models::{Bill, Category, ImageUri};

/// Remote copy of a merchant's bills.
#[async_trait]
pub trait RemoteBills: Send + Sync {
    /// Every bill stored for `merchant_id`.
    async fn fetch(&self, merchant_id: &str) -> Result<Vec<Bill>, anyhow::Error>;

    /// Inserts `bill`, or overwrites the stored row with the same id.
    async fn upsert(&self, merchant_id: &str, bill: &Bill) -> Result<(), anyhow::Error>;
}

/// Row of the `bills` table.
#[derive(Debug, Clone, FromRow)]
struct BillRow {
    id: Uuid,
    image_uri: String,
    store_name: String,
    bill_date: NaiveDate,
    category: String,
    tax_paid: Decimal,
    total: Decimal,
}

impl From<BillRow> for Bill {
    fn from(row: BillRow) -> Self {
        Bill {
            id: row.id,
            image_uri: ImageUri::new(row.image_uri),
            store_name: row.store_name,
            date: row.bill_date,
            category: Category::from(row.category),
            tax_paid: row.tax_paid,
            total: row.total,
        }
    }
}

/// [`RemoteBills`] over a Postgres `bills` table keyed by merchant id.
#[derive(Clone)]
pub struct PgRemoteBills {
    pool: PgPool,
}

impl PgRemoteBills {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RemoteBills for PgRemoteBills {
    async fn fetch(&self, merchant_id: &str) -> Result<Vec<Bill>, anyhow::Error> {
        let rows = sqlx::query_as::<_, BillRow>(
            r#"
            SELECT id, image_uri, store_name, bill_date, category, tax_paid, total
            FROM bills
            WHERE merchant_id = $1
            ORDER BY bill_date DESC
            "#,
        )
        .bind(merchant_id)
        .fetch_all(&self.pool)
        .await?;

        info!("Fetched {} bills for merchant {}", rows.len(), merchant_id);
        Ok(rows.into_iter().map(Bill::from).collect())
    }

    async fn upsert(&self, merchant_id: &str, bill: &Bill) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
            INSERT INTO bills (
                id, merchant_id, image_uri, store_name, bill_date,
                category, tax_paid, total
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                image_uri = EXCLUDED.image_uri,
                store_name = EXCLUDED.store_name,
                bill_date = EXCLUDED.bill_date,
                category = EXCLUDED.category,
                tax_paid = EXCLUDED.tax_paid,
                total = EXCLUDED.total
            WHERE bills.merchant_id = EXCLUDED.merchant_id
            "#,
        )
        .bind(bill.id)
        .bind(merchant_id)
        .bind(bill.image_uri.as_str())
        .bind(&bill.store_name)
        .bind(bill.date)
        .bind(bill.category.label())
        .bind(bill.tax_paid)
        .bind(bill.total)
        .execute(&self.pool)
        .await?;

        info!("Upserted bill {} for merchant {}", bill.id, merchant_id);
        Ok(())
    }
}

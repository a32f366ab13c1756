use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Bill, Category, ImageUri};
use crate::store::BillCollection;
use crate::sync::{spawn_initial_load, spawn_upsert, RemoteBills};

/// In-memory remote keyed by merchant id.
#[derive(Default)]
struct FakeRemote {
    rows: Mutex<Vec<(String, Bill)>>,
    offline: bool,
}

#[async_trait]
impl RemoteBills for FakeRemote {
    async fn fetch(&self, merchant_id: &str) -> Result<Vec<Bill>, anyhow::Error> {
        if self.offline {
            anyhow::bail!("network unreachable");
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(merchant, _)| merchant == merchant_id)
            .map(|(_, bill)| bill.clone())
            .collect())
    }

    async fn upsert(&self, merchant_id: &str, bill: &Bill) -> Result<(), anyhow::Error> {
        if self.offline {
            anyhow::bail!("network unreachable");
        }
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|(_, existing)| existing.id != bill.id);
        rows.push((merchant_id.to_string(), bill.clone()));
        Ok(())
    }
}

fn bill(store: &str, day: u32) -> Bill {
    Bill {
        id: Uuid::new_v4(),
        image_uri: ImageUri::new(format!("file:///documents/bills/{store}.jpg")),
        store_name: store.to_string(),
        date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
        category: Category::Gas,
        tax_paid: Decimal::new(150, 2),
        total: Decimal::new(2000, 2),
    }
}

#[tokio::test]
async fn test_initial_load_merges_only_own_merchant() {
    let ours = bill("Metro", 1);
    let theirs = bill("Reliance", 2);
    let remote = Arc::new(FakeRemote {
        rows: Mutex::new(vec![
            ("merchant-1".to_string(), ours.clone()),
            ("merchant-2".to_string(), theirs),
        ]),
        offline: false,
    });
    let local = bill("Local Shop", 3);
    let bills = Arc::new(RwLock::new(BillCollection::from_bills(vec![local.clone()])));

    spawn_initial_load(remote, "merchant-1".to_string(), bills.clone())
        .await
        .expect("task");

    let bills = bills.read().await;
    assert_eq!(bills.len(), 2);
    assert!(bills.contains(ours.id));
    assert!(bills.contains(local.id));
}

#[tokio::test]
async fn test_initial_load_keeps_local_version() {
    let remote_copy = bill("Metro", 1);
    let mut local_copy = remote_copy.clone();
    local_copy.store_name = "Metro (edited)".to_string();
    let remote = Arc::new(FakeRemote {
        rows: Mutex::new(vec![("m".to_string(), remote_copy)]),
        offline: false,
    });
    let bills = Arc::new(RwLock::new(BillCollection::from_bills(vec![local_copy.clone()])));

    spawn_initial_load(remote, "m".to_string(), bills.clone()).await.expect("task");

    assert_eq!(bills.read().await.list(), &[local_copy]);
}

#[tokio::test]
async fn test_failed_load_leaves_collection_untouched() {
    let remote = Arc::new(FakeRemote {
        offline: true,
        ..FakeRemote::default()
    });
    let existing = bill("Metro", 1);
    let bills = Arc::new(RwLock::new(BillCollection::from_bills(vec![existing.clone()])));

    spawn_initial_load(remote, "m".to_string(), bills.clone()).await.expect("task completes");

    assert_eq!(bills.read().await.list(), &[existing]);
}

#[tokio::test]
async fn test_upsert_replaces_row_with_same_id() {
    let remote = Arc::new(FakeRemote::default());
    let mut committed = bill("Metro", 1);

    spawn_upsert(remote.clone(), "m".to_string(), committed.clone()).await.expect("task");
    committed.total = Decimal::new(2500, 2);
    spawn_upsert(remote.clone(), "m".to_string(), committed.clone()).await.expect("task");

    let fetched = remote.fetch("m").await.expect("fetch");
    assert_eq!(fetched, vec![committed]);
}

#[tokio::test]
async fn test_failed_upsert_is_only_logged() {
    let remote = Arc::new(FakeRemote {
        offline: true,
        ..FakeRemote::default()
    });

    let result = spawn_upsert(remote, "m".to_string(), bill("Metro", 1)).await;
    assert!(result.is_ok());
}

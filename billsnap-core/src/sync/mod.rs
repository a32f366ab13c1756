//! Best-effort mirror of the bill collection in a remote store.
//!
//! Nothing here ever fails the caller: the initial load and each upsert run
//! on their own task and only log errors.

pub mod remote;

#[cfg(test)]
mod tests;

pub use remote::{PgRemoteBills, RemoteBills};

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::models::Bill;
use crate::store::BillCollection;

/// Loads the merchant's remote bills into `bills` in the background.
///
/// Bills whose id is already present locally are skipped, so anything the
/// user committed while the load was in flight wins.
///
/// # Arguments
///
/// * `remote` - Remote bill source
/// * `merchant_id` - Merchant whose bills are loaded
/// * `bills` - Shared collection to merge into
///
/// # Returns
///
/// Returns the handle of the spawned task. Callers may drop it.
pub fn spawn_initial_load(
    remote: Arc<dyn RemoteBills>,
    merchant_id: String,
    bills: Arc<RwLock<BillCollection>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match remote.fetch(&merchant_id).await {
            Ok(fetched) => {
                let fetched_count = fetched.len();
                let added = bills.write().await.merge_remote(fetched);
                info!(
                    "Initial bill load for merchant {}: {} fetched, {} added",
                    merchant_id, fetched_count, added
                );
            }
            Err(e) => {
                error!("Error fetching bills for merchant {}: {:#}", merchant_id, e);
            }
        }
    })
}

/// Mirrors one committed bill to the remote store in the background.
pub fn spawn_upsert(
    remote: Arc<dyn RemoteBills>,
    merchant_id: String,
    bill: Bill,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = remote.upsert(&merchant_id, &bill).await {
            error!("Error mirroring bill {} for merchant {}: {:#}", bill.id, merchant_id, e);
        }
    })
}

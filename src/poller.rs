use crate::bus::FieldDevice;
use crate::model::Snapshot;
use crate::publish::Publisher;
use crate::snapshot;
use crate::store::SnapshotStore;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;

/// Poll-normalize-publish loop. Owns the device connection for its whole
/// lifetime; the store is its only output. Runs until `shutdown` signals,
/// then disconnects exactly once and returns.
pub async fn run<D>(
    mut device: D,
    store: SnapshotStore,
    publisher: Option<Publisher>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    D: FieldDevice + Send,
{
    while !*shutdown.borrow() {
        poll_cycle(&mut device, &store, publisher.as_ref()).await;

        tokio::select! {
            _ = time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    /* signal sender dropped, treat as shutdown */
                    break;
                }
            }
        }
    }

    device.disconnect().await;
    log::info!("poller stopped");
}

async fn poll_cycle<D>(device: &mut D, store: &SnapshotStore, publisher: Option<&Publisher>)
where
    D: FieldDevice + Send,
{
    if !device.ensure_connected().await {
        store.set(Snapshot::disconnected(Utc::now()));
        return;
    }

    match snapshot::build(device, Utc::now()).await {
        Ok(snapshot) => {
            store.set(snapshot.clone());
            if let Some(publisher) = publisher {
                if let Err(e) = publisher.publish(&snapshot).await {
                    log::warn!("metrics publication failed: {:?}", e);
                }
            }
        }
        Err(e) => {
            log::warn!("snapshot build failed: {:?}", e);
            store.set(Snapshot::disconnected(Utc::now()));
            /* drop the connection so the next tick reconnects from scratch */
            device.disconnect().await;
        }
    }
}

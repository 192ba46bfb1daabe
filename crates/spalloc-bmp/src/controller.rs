//! Owns one [`BmpWorker`] task per BMP row in the catalogue (spec §4.5:
//! "each BMP's queue is drained by exactly one worker, so commands to one
//! physical BMP are never issued concurrently").

use crate::error::Result;
use crate::transceiver::{DummyTransceiver, Transceiver};
use crate::worker::BmpWorker;
use spalloc_config::TransceiverConfig;
use spalloc_epoch::EpochManager;
use spalloc_store::Store;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

pub struct BmpController {
    workers: Vec<(Arc<BmpWorker>, JoinHandle<()>)>,
}

impl BmpController {
    /// Spawns one worker per BMP currently known to the store. Called once
    /// at startup; machines added later need a fresh controller (or, in a
    /// future revision, a rescan hook keyed off the Machine epoch).
    pub async fn start(store: Store, epochs: EpochManager, config: TransceiverConfig) -> Result<Self> {
        let bmps = spalloc_store::machine_repo::list_all_bmps(store.pool()).await?;
        let transceiver: Arc<dyn Transceiver> = if config.dummy {
            Arc::new(DummyTransceiver)
        } else {
            Arc::new(DummyTransceiver) // TODO: real SCP/UDP transceiver once hardware access lands.
        };

        let mut workers = Vec::with_capacity(bmps.len());
        for bmp in bmps {
            let worker = Arc::new(BmpWorker::new(
                bmp,
                store.clone(),
                epochs.clone(),
                config.clone(),
                transceiver.clone(),
            ));
            let handle = {
                let worker = worker.clone();
                tokio::spawn(async move { worker.start().await })
            };
            workers.push((worker, handle));
        }
        info!(count = workers.len(), "bmp controller started");
        Ok(Self { workers })
    }

    pub fn stop(&self) {
        for (worker, _) in &self.workers {
            worker.stop();
        }
    }

    pub async fn join(self) {
        for (_, handle) in self.workers {
            let _ = handle.await;
        }
    }
}

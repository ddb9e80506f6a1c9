use std::{
    sync::mpsc::{Receiver, SyncSender, sync_channel},
    thread::{self, JoinHandle},
};

use anyhow::Context;

use crate::{
    batch::flow::{Batch, BatchSource},
    foundation::error::{PoseBatchError, PoseBatchResult},
    pose::joints::JointOrder,
};

/// Runs a [`BatchSource`] on a worker thread, one batch ahead of the consumer.
///
/// Construction requests the first batch. Each [`BatchSource::next_batch`] call waits for the
/// batch in flight, immediately requests the following one and returns. At most one batch is
/// ever being prepared or waiting; batches arrive in the order the source produces them.
/// Dropping the wrapper lets the worker finish its current batch and joins it.
pub struct Prefetch<S> {
    requests: Option<SyncSender<()>>,
    results: Receiver<PoseBatchResult<Batch>>,
    worker: Option<JoinHandle<S>>,
    len: usize,
    joint_order: JointOrder,
}

impl<S> Prefetch<S>
where
    S: BatchSource + Send + 'static,
{
    /// Move `source` onto a worker thread and start fetching its first batch.
    pub fn new(source: S) -> PoseBatchResult<Self> {
        let len = source.len();
        let joint_order = source.joint_order().clone();
        let (request_tx, request_rx) = sync_channel::<()>(1);
        let (result_tx, result_rx) = sync_channel::<PoseBatchResult<Batch>>(1);

        let worker = thread::Builder::new()
            .name("posebatch-prefetch".to_string())
            .spawn(move || {
                let mut source = source;
                while request_rx.recv().is_ok() {
                    if result_tx.send(source.next_batch()).is_err() {
                        break;
                    }
                }
                source
            })
            .context("spawn prefetch worker")?;

        request_tx
            .send(())
            .map_err(|_| PoseBatchError::Other(anyhow::anyhow!("prefetch worker exited early")))?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            worker: Some(worker),
            len,
            joint_order,
        })
    }

    /// Stop the worker and take the source back.
    pub fn into_inner(mut self) -> PoseBatchResult<S> {
        self.requests.take();
        // drain the batch in flight so the worker sees the closed request channel
        let _ = self.results.recv();
        match self.worker.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| PoseBatchError::Other(anyhow::anyhow!("prefetch worker panicked"))),
            None => Err(PoseBatchError::Other(anyhow::anyhow!(
                "prefetch worker already joined"
            ))),
        }
    }
}

impl<S> BatchSource for Prefetch<S>
where
    S: BatchSource + Send + 'static,
{
    fn next_batch(&mut self) -> PoseBatchResult<Batch> {
        let batch = self
            .results
            .recv()
            .map_err(|_| PoseBatchError::Other(anyhow::anyhow!("prefetch worker stopped")))?;
        if let Some(requests) = &self.requests {
            // a dead worker surfaces on the next recv
            let _ = requests.send(());
        }
        batch
    }

    fn len(&self) -> usize {
        self.len
    }

    fn joint_order(&self) -> &JointOrder {
        &self.joint_order
    }
}

impl<S> Drop for Prefetch<S> {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/batch/prefetch.rs"]
mod tests;

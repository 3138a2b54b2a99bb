//! ConsumerDispatcher - ストリームからバッチを取り出して handler を呼ぶ
//!
//! # フロー
//! 1. StreamClient::get() でバッチ取得（shutdown と select で競合させる）
//! 2. ConsumerHandler::handle() を実行
//! 3. 失敗したら RetryPolicy に従って同じバッチを再実行
//! 4. 上限に達したバッチは parked に退避して次へ進む
//!
//! Delivery is at-least-once. A batch is never dropped silently: it either
//! reaches the handler successfully or ends up in `parked()`.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{ConsumerBinding, HandlerId, Record, StreamError};
use crate::impls::RetryPolicy;
use crate::ports::{ConsumerHandler, StreamClient};

/// A batch that exhausted its retries.
#[derive(Debug, Clone, PartialEq)]
pub struct ParkedBatch {
    pub handler: HandlerId,
    pub records: Vec<Record>,
    pub attempts: u32,
    pub last_error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing was available within the client's wait bound.
    Idle,
    Delivered { records: usize, attempts: u32 },
    Parked { records: usize, attempts: u32 },
}

pub struct ConsumerDispatcher {
    client: Arc<dyn StreamClient>,
    handler: Arc<dyn ConsumerHandler>,
    binding: ConsumerBinding,
    retry: RetryPolicy,
    parked: Arc<Mutex<Vec<ParkedBatch>>>,
}

impl ConsumerDispatcher {
    pub fn new(
        client: Arc<dyn StreamClient>,
        handler: Arc<dyn ConsumerHandler>,
        binding: ConsumerBinding,
    ) -> Self {
        Self {
            client,
            handler,
            binding,
            retry: RetryPolicy::default(),
            parked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn binding(&self) -> &ConsumerBinding {
        &self.binding
    }

    /// Snapshot of batches that were given up on.
    pub async fn parked(&self) -> Vec<ParkedBatch> {
        self.parked.lock().await.clone()
    }

    /// Fetch one batch and run the handler on it until it succeeds or is parked.
    pub async fn poll_once(&self) -> Result<DispatchOutcome, StreamError> {
        match self.client.get().await? {
            None => Ok(DispatchOutcome::Idle),
            Some(fetched) => Ok(self.deliver(fetched.into_records()).await),
        }
    }

    async fn deliver(&self, records: Vec<Record>) -> DispatchOutcome {
        let handler_id = &self.binding.handler().id;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let err = match self.handler.handle(&records).await {
                Ok(()) => {
                    debug!(
                        target: "rill::dispatch",
                        handler = %handler_id,
                        records = records.len(),
                        attempts,
                        "batch delivered"
                    );
                    return DispatchOutcome::Delivered {
                        records: records.len(),
                        attempts,
                    };
                }
                Err(err) => err,
            };

            if self.retry.should_retry(attempts) {
                let delay = self.retry.next_delay(attempts);
                warn!(
                    target: "rill::dispatch",
                    handler = %handler_id,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "handler failed, retrying batch"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            warn!(
                target: "rill::dispatch",
                handler = %handler_id,
                records = records.len(),
                attempts,
                error = %err,
                "handler failed, parking batch"
            );
            let count = records.len();
            self.parked.lock().await.push(ParkedBatch {
                handler: handler_id.clone(),
                records,
                attempts,
                last_error: err.to_string(),
            });
            return DispatchOutcome::Parked {
                records: count,
                attempts,
            };
        }
    }

    /// Dispatch until `shutdown` flips to true. In-flight handler calls are
    /// allowed to finish; only the wait for new records is interrupted.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let handler_id = &self.binding.handler().id;
        info!(target: "rill::dispatch", handler = %handler_id, "dispatcher started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let started = Instant::now();
            let fetched = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                fetched = self.client.get() => fetched,
            };

            match fetched {
                Ok(Some(fetched)) => {
                    self.deliver(fetched.into_records()).await;
                }
                Ok(None) => {
                    // Idle: poll at most once per max_wait, even if the client returned early.
                    let idle = self
                        .binding
                        .options()
                        .max_wait()
                        .saturating_sub(started.elapsed());
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(idle) => {}
                    }
                }
                Err(err) => {
                    warn!(target: "rill::dispatch", handler = %handler_id, error = %err, "get failed");
                    tokio::time::sleep(self.retry.base_delay).await;
                }
            }
        }

        info!(target: "rill::dispatch", handler = %handler_id, "dispatcher stopped");
    }

    /// Run on a background task. Dropping the handle's sender stops it too.
    pub fn spawn(self) -> DispatcherHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dispatcher = Arc::new(self);
        let join = tokio::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.run(shutdown_rx).await }
        });
        DispatcherHandle {
            dispatcher,
            shutdown_tx,
            join,
        }
    }
}

pub struct DispatcherHandle {
    dispatcher: Arc<ConsumerDispatcher>,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl DispatcherHandle {
    pub fn dispatcher(&self) -> &ConsumerDispatcher {
        &self.dispatcher
    }

    pub async fn shutdown_and_join(self) {
        // receiver may already be gone
        let _ = self.shutdown_tx.send(true);
        let _ = self.join.await;
    }
}

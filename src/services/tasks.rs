// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process task queue for webhook event classification.
//!
//! The webhook handler acknowledges Strava as soon as the event row is
//! stored, then hands the event to this queue. A single worker drains it.
//!
//! Delivery is best-effort and at-most-once:
//! - a full queue drops the event (counted and logged), it is never retried
//! - classification errors are logged by the worker and swallowed
//! - on shutdown the worker finishes what is already queued, then stops

use crate::db::Database;
use crate::models::WebhookEvent;
use crate::services::events::{EventOutcome, EventProcessor};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Payload for one classification task.
#[derive(Debug, Clone)]
pub struct ClassifyEventPayload {
    /// Row ID of the stored event
    pub event_id: i64,
    pub event: WebhookEvent,
}

/// Why an event could not be queued.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Webhook task queue is full")]
    Full,
    #[error("Webhook task queue is shut down")]
    Closed,
}

/// Counters shared between the queue handle and its worker.
#[derive(Default)]
struct QueueStats {
    dropped: AtomicU64,
    completed: AtomicU64,
}

/// Bounded queue plus the worker that drains it.
pub struct TasksService {
    sender: mpsc::Sender<ClassifyEventPayload>,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<QueueStats>,
}

impl TasksService {
    /// Create the queue and spawn its worker on the current runtime.
    pub fn start(db: Database, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(QueueStats::default());

        let worker = tokio::spawn(run_worker(
            EventProcessor::new(db.clone()),
            db,
            receiver,
            shutdown_rx,
            stats.clone(),
        ));

        tracing::info!(capacity, "Webhook task queue started");

        Self {
            sender,
            shutdown,
            worker: Mutex::new(Some(worker)),
            stats,
        }
    }

    /// Queue an event for classification without waiting.
    pub fn queue_event(&self, payload: ClassifyEventPayload) -> Result<(), QueueError> {
        match self.sender.try_send(payload) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(payload)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    event_id = payload.event_id,
                    backlog = self.backlog(),
                    "Webhook task queue full, dropping event"
                );
                Err(QueueError::Full)
            }
            Err(TrySendError::Closed(payload)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    event_id = payload.event_id,
                    "Webhook task queue closed, dropping event"
                );
                Err(QueueError::Closed)
            }
        }
    }

    /// Events waiting for the worker.
    pub fn backlog(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Events dropped because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }

    /// Events the worker has finished with, successfully or not.
    pub fn completed(&self) -> u64 {
        self.stats.completed.load(Ordering::Relaxed)
    }

    /// Stop the worker after it drains the queue. Later `queue_event` calls
    /// fail with `QueueError::Closed`.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);

        let handle = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Webhook worker terminated abnormally");
            }
        }
    }
}

async fn run_worker(
    processor: EventProcessor,
    db: Database,
    mut receiver: mpsc::Receiver<ClassifyEventPayload>,
    mut shutdown: watch::Receiver<bool>,
    stats: Arc<QueueStats>,
) {
    loop {
        tokio::select! {
            biased;
            payload = receiver.recv() => match payload {
                Some(payload) => classify(&processor, &db, payload, &stats).await,
                None => break,
            },
            _ = shutdown.changed() => {
                receiver.close();
                let mut drained = 0usize;
                while let Some(payload) = receiver.recv().await {
                    classify(&processor, &db, payload, &stats).await;
                    drained += 1;
                }
                tracing::info!(drained, "Webhook task queue drained");
                break;
            }
        }
    }
    tracing::info!("Webhook worker stopped");
}

async fn classify(
    processor: &EventProcessor,
    db: &Database,
    payload: ClassifyEventPayload,
    stats: &QueueStats,
) {
    let outcome = processor.process(&payload.event).await;
    tracing::debug!(event_id = payload.event_id, outcome = ?outcome, "Webhook event classified");

    if outcome != EventOutcome::Failed {
        if let Err(e) = db.mark_event_processed(payload.event_id).await {
            tracing::error!(
                error = %e,
                event_id = payload.event_id,
                "Failed to mark webhook event processed"
            );
        }
    }

    stats.completed.fetch_add(1, Ordering::Relaxed);
}

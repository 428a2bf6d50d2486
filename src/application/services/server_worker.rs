//! Per-server dispatch workers
//!
//! Each connected server gets its own queue and worker task, so events from
//! one server dispatch in arrival order while a slow handler on one server
//! never delays another server's stream.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::application::dispatch::Dispatcher;
use crate::domain::entities::{ProtocolEvent, ServerId};
use crate::domain::traits::ProtocolSink;

/// Fans protocol ingress out to one worker task per server id.
pub struct ServerWorkers {
    dispatcher: Arc<Dispatcher>,
    sink: Arc<dyn ProtocolSink>,
    queue_depth: usize,
    workers: Mutex<HashMap<ServerId, mpsc::Sender<ProtocolEvent>>>,
}

impl ServerWorkers {
    pub fn new(dispatcher: Arc<Dispatcher>, sink: Arc<dyn ProtocolSink>, queue_depth: usize) -> Self {
        Self {
            dispatcher,
            sink,
            queue_depth: queue_depth.max(1),
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Queue an event on its server's stream, spawning the worker on first
    /// use. Ordering is preserved per server, not across servers.
    pub async fn ingest(&self, event: ProtocolEvent) {
        let server_id = event.server_id;
        let tx = {
            let mut workers = self.workers.lock().await;
            let tx = workers
                .entry(server_id)
                .or_insert_with(|| self.spawn_worker(server_id));
            if tx.is_closed() {
                *tx = self.spawn_worker(server_id);
            }
            tx.clone()
        };
        if tx.send(event).await.is_err() {
            tracing::warn!("Worker for server {} dropped an event", server_id);
        }
    }

    fn spawn_worker(&self, server_id: ServerId) -> mpsc::Sender<ProtocolEvent> {
        let (tx, mut rx) = mpsc::channel::<ProtocolEvent>(self.queue_depth);
        let dispatcher = self.dispatcher.clone();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            tracing::debug!("Worker for server {} started", server_id);
            while let Some(event) = rx.recv().await {
                let lines = dispatcher.dispatch(&event).await;
                if lines.is_empty() {
                    continue;
                }
                if let Err(e) = sink.deliver(lines).await {
                    tracing::warn!("Delivery for server {} failed: {}", server_id, e);
                }
            }
            tracing::debug!("Worker for server {} stopped", server_id);
        });
        tx
    }

    /// Drop all send handles; each worker drains the events already queued
    /// for its server and then exits.
    pub async fn shutdown(&self) {
        self.workers.lock().await.clear();
    }
}

//! Fire-and-forget job dispatch onto a pool of background workers.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::core::processor::JobProcessor;
use crate::error::VjobsError;

/// Queues job ids for background processing.
///
/// `dispatch` returns as soon as the id is queued; workers pull ids and run
/// them through the shared [`JobProcessor`].
pub struct Dispatcher {
    sender: Option<mpsc::UnboundedSender<String>>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start `workers` background tasks (at least one)
    pub fn start(processor: Arc<JobProcessor>, workers: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<String>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..workers.max(1))
            .map(|worker_id| {
                let processor = processor.clone();
                let receiver = receiver.clone();
                tokio::spawn(async move {
                    debug!(worker_id, "Worker started");
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(job_id) = next else { break };
                        match processor.process(&job_id).await {
                            Ok(job) => debug!(worker_id, job_id = %job_id, status = %job.status, "Job handled"),
                            Err(e) => error!(worker_id, job_id = %job_id, "Failed to process job: {}", e),
                        }
                    }
                    debug!(worker_id, "Worker stopped");
                })
            })
            .collect::<Vec<_>>();

        info!("Dispatcher started with {} workers", workers.len());
        Self {
            sender: Some(sender),
            workers,
        }
    }

    /// Queue a job for processing without waiting for it
    pub fn dispatch(&self, job_id: &str) -> Result<(), VjobsError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| VjobsError::InvalidInput("dispatcher is shut down".to_string()))?;
        sender
            .send(job_id.to_string())
            .map_err(|_| VjobsError::InvalidInput("dispatcher is shut down".to_string()))?;
        debug!(job_id, "Job queued");
        Ok(())
    }

    /// Stop accepting work and wait for queued jobs to drain
    pub async fn shutdown(mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if let Err(e) = worker.await {
                error!("Worker panicked: {}", e);
            }
        }
        info!("Dispatcher stopped");
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::counter;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::consumer::{BrokerConsumer, Delivery};
use crate::error::{BrokerResult, ErrorCategory};

/// What the worker does with a delivery after its handler ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Disposition {
    Ack,
    Requeue,
    DeadLetter,
}

fn disposition_for(category: ErrorCategory, retry_count: u32, max_retries: u32) -> Disposition {
    match category {
        ErrorCategory::Permanent => Disposition::Ack,
        ErrorCategory::Transient if retry_count >= max_retries => Disposition::DeadLetter,
        ErrorCategory::Transient => Disposition::Requeue,
    }
}

/// Processes one event. Implementations decide per error whether a retry is
/// worthwhile via [`crate::BrokerError::transient`] /
/// [`crate::BrokerError::permanent`].
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, routing_key: &str, payload: &[u8]) -> BrokerResult<()>;

    /// Short name used in logs and metrics labels.
    fn name(&self) -> &'static str;
}

/// The consume loop: periodically claim deliveries abandoned by dead
/// consumers, then read our own pending entries followed by new ones, until
/// shutdown is signalled.
pub struct EventWorker<H: EventHandler> {
    consumer: BrokerConsumer,
    handler: Arc<H>,
}

impl<H: EventHandler> EventWorker<H> {
    pub fn new(consumer: BrokerConsumer, handler: Arc<H>) -> Self {
        Self { consumer, handler }
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> BrokerResult<()> {
        self.consumer.ensure_group().await?;

        let config = self.consumer.config();
        info!(
            stream = %config.stream,
            group = %config.group,
            consumer = %config.consumer_id,
            handler = self.handler.name(),
            "Event worker started"
        );

        let claim_interval = Duration::from_millis(config.claim_timeout_ms.max(1));
        let mut last_claim: Option<Instant> = None;
        let mut consecutive_errors: u32 = 0;
        loop {
            if *shutdown.borrow() {
                break;
            }

            // Take over deliveries orphaned by dead consumers, on startup
            // and then once per claim interval.
            if last_claim.is_none_or(|at| at.elapsed() >= claim_interval) {
                match self.consumer.claim_abandoned().await {
                    Ok(claimed) if !claimed.is_empty() => {
                        info!(count = claimed.len(), "Reprocessing claimed deliveries");
                        for delivery in &claimed {
                            self.dispatch(delivery).await;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Failed to claim abandoned deliveries"),
                }
                last_claim = Some(Instant::now());
            }

            let batch = tokio::select! {
                result = self.read_batch() => result,
                _ = shutdown.changed() => continue,
            };

            match batch {
                Ok(deliveries) => {
                    consecutive_errors = 0;
                    for delivery in &deliveries {
                        self.dispatch(delivery).await;
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    let delay = Duration::from_secs(2u64.pow(consecutive_errors.min(4)));
                    error!(
                        error = %e,
                        consecutive_errors,
                        delay_secs = delay.as_secs(),
                        "Stream read failed, backing off"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }

        info!(handler = self.handler.name(), "Event worker stopped");
        Ok(())
    }

    /// Our own unsettled deliveries first, then new ones. Reading pending
    /// entries every pass means a delivery whose ack/requeue failed gets
    /// retried as soon as the connection recovers, not on the next restart.
    async fn read_batch(&self) -> BrokerResult<Vec<Delivery>> {
        let mut batch = self.consumer.read_pending().await?;
        batch.extend(self.consumer.read_new().await?);
        Ok(batch)
    }

    async fn dispatch(&self, delivery: &Delivery) {
        let handler = self.handler.name();
        let result = self
            .handler
            .handle(&delivery.routing_key, &delivery.payload)
            .await;

        let outcome = match result {
            Ok(()) => {
                counter!("broker_events_processed_total", "handler" => handler, "result" => "ok")
                    .increment(1);
                self.consumer.ack(&delivery.id).await
            }
            Err(e) => {
                let max_retries = self.consumer.config().max_retries;
                match disposition_for(e.category(), delivery.retry_count, max_retries) {
                    Disposition::Ack => {
                        warn!(
                            id = %delivery.id,
                            routing_key = %delivery.routing_key,
                            error = %e,
                            "Dropping delivery after permanent failure"
                        );
                        counter!("broker_events_processed_total", "handler" => handler, "result" => "dropped")
                            .increment(1);
                        self.consumer.ack(&delivery.id).await
                    }
                    Disposition::Requeue => {
                        warn!(
                            id = %delivery.id,
                            routing_key = %delivery.routing_key,
                            retry_count = delivery.retry_count,
                            error = %e,
                            "Requeueing delivery after transient failure"
                        );
                        counter!("broker_events_processed_total", "handler" => handler, "result" => "requeued")
                            .increment(1);
                        self.consumer.requeue(delivery).await
                    }
                    Disposition::DeadLetter => {
                        counter!("broker_events_processed_total", "handler" => handler, "result" => "dead_lettered")
                            .increment(1);
                        self.consumer.dead_letter(delivery, &e.to_string()).await
                    }
                }
            }
        };

        if let Err(e) = outcome {
            // The delivery stays pending and will be retried on restart.
            error!(id = %delivery.id, error = %e, "Failed to settle delivery");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_path_acks() {
        // Permanent failures are acknowledged and dropped regardless of the
        // retry budget.
        assert_eq!(
            disposition_for(ErrorCategory::Permanent, 0, 3),
            Disposition::Ack
        );
        assert_eq!(
            disposition_for(ErrorCategory::Permanent, 10, 3),
            Disposition::Ack
        );
    }

    #[test]
    fn test_transient_failures_retry_until_budget_exhausted() {
        assert_eq!(
            disposition_for(ErrorCategory::Transient, 0, 3),
            Disposition::Requeue
        );
        assert_eq!(
            disposition_for(ErrorCategory::Transient, 2, 3),
            Disposition::Requeue
        );
        assert_eq!(
            disposition_for(ErrorCategory::Transient, 3, 3),
            Disposition::DeadLetter
        );
    }

    #[test]
    fn test_zero_retry_budget_dead_letters_immediately() {
        assert_eq!(
            disposition_for(ErrorCategory::Transient, 0, 0),
            Disposition::DeadLetter
        );
    }
}

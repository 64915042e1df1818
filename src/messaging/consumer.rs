//! Stage Consumer
//!
//! Subscribes a consumer group to a topic and hands decoded, validated events to the local
//! [`StageHandler`].
//!
//! ## Delivery Handling
//! 1. **Tombstone**: a record without payload is acknowledged and skipped.
//! 2. **Rejected**: bytes that fail to decode or validate are nacked for redelivery.
//! 3. **Dispatched**: the handler runs on its own task. The listener moves straight on to the
//!    next delivery; the task acknowledges on success and nacks on error or panic.

use super::types::{Delivery, EventLog, Subscription};
use crate::error::{HandlerError, TransportError};
use crate::events::{decode, validate, PipelineStage, StageEvent};
use crate::telemetry;

use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Local entry point invoked for every valid upstream event.
#[async_trait]
pub trait StageHandler<S: PipelineStage>: Send + Sync + 'static {
    async fn handle(&self, event: StageEvent<S>) -> Result<(), HandlerError>;
}

/// How a delivery was routed by [`StageConsumer::on_message`].
#[derive(Debug)]
pub enum Dispatch {
    Tombstone,
    Rejected,
    Dispatched(JoinHandle<Settlement>),
}

/// Final settlement of a dispatched delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Acknowledged,
    Nacked,
}

pub struct StageConsumer<S, H> {
    name: String,
    topic: String,
    group_id: String,
    concurrency: usize,
    backoff: Duration,
    handler: Arc<H>,
    _stage: PhantomData<fn() -> S>,
}

impl<S, H> StageConsumer<S, H>
where
    S: PipelineStage,
    H: StageHandler<S>,
{
    /// `concurrency` below 1 is raised to 1.
    pub fn new(
        name: impl Into<String>,
        topic: impl Into<String>,
        group_id: impl Into<String>,
        concurrency: usize,
        backoff: Duration,
        handler: Arc<H>,
    ) -> Arc<Self> {
        let name = name.into();
        if concurrency == 0 {
            tracing::warn!(consumer = %name, "listener concurrency 0 raised to 1");
        }

        Arc::new(Self {
            name,
            topic: topic.into(),
            group_id: group_id.into(),
            concurrency: concurrency.max(1),
            backoff,
            handler,
            _stage: PhantomData,
        })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Subscribes and spawns the listeners. They run until the log closes the group.
    pub async fn start(
        self: Arc<Self>,
        log: Arc<dyn EventLog>,
    ) -> Result<Vec<JoinHandle<()>>, TransportError> {
        let subscription = log.subscribe(&self.topic, &self.group_id).await?;
        let subscription = Arc::new(Mutex::new(subscription));

        tracing::info!(
            consumer = %self.name,
            topic = %self.topic,
            group = %self.group_id,
            listeners = self.concurrency,
            "starting stage consumer"
        );

        let handles = (0..self.concurrency)
            .map(|listener_id| {
                let consumer = self.clone();
                let subscription = subscription.clone();
                tokio::spawn(async move {
                    consumer.listen(listener_id, subscription).await;
                })
            })
            .collect();

        Ok(handles)
    }

    async fn listen(&self, listener_id: usize, subscription: Arc<Mutex<Subscription>>) {
        tracing::debug!(consumer = %self.name, listener_id, "listener started");

        loop {
            let next = subscription.lock().await.next().await;
            match next {
                Some(delivery) => {
                    self.on_message(delivery);
                }
                None => break,
            }
        }

        tracing::debug!(consumer = %self.name, listener_id, "listener stopped");
    }

    /// Routes one delivery. Never waits for the handler.
    pub fn on_message(&self, delivery: Delivery) -> Dispatch {
        let Delivery {
            record,
            attempt,
            ack,
        } = delivery;

        let span = telemetry::consume_span(
            &self.name,
            &record.topic,
            record.partition,
            record.offset,
            attempt,
        );
        let _entered = span.enter();

        let payload = match record.payload.as_deref() {
            Some(payload) if !payload.is_empty() => payload,
            _ => {
                tracing::debug!(key = %record.key, "tombstone acknowledged");
                ack.acknowledge();
                telemetry::record_consumed(&self.name, "tombstone");
                return Dispatch::Tombstone;
            }
        };

        let event = match decode::<S>(payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "undecodable record, nacking");
                ack.nack(self.backoff);
                telemetry::record_consumed(&self.name, "rejected");
                return Dispatch::Rejected;
            }
        };

        if let Err(err) = validate(&event) {
            tracing::warn!(error = %err, "invalid stage event, nacking");
            ack.nack(self.backoff);
            telemetry::record_consumed(&self.name, "rejected");
            return Dispatch::Rejected;
        }

        tracing::debug!(stage = %event.stage(), run = %event.run_id(), "dispatching stage event");

        let handler = self.handler.clone();
        let name = self.name.clone();
        let backoff = self.backoff;

        let settle = async move {
            // Inner task so a panicking handler surfaces as a JoinError
            let work = tokio::spawn(async move { handler.handle(event).await });

            match work.await {
                Ok(Ok(())) => {
                    ack.acknowledge();
                    telemetry::record_consumed(&name, "acked");
                    Settlement::Acknowledged
                }
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "handler failed, nacking");
                    ack.nack(backoff);
                    telemetry::record_consumed(&name, "nacked");
                    Settlement::Nacked
                }
                Err(join_err) => {
                    tracing::error!(error = %join_err, "handler panicked, nacking");
                    ack.nack(backoff);
                    telemetry::record_consumed(&name, "nacked");
                    Settlement::Nacked
                }
            }
        };

        Dispatch::Dispatched(tokio::spawn(settle.instrument(span.clone())))
    }
}

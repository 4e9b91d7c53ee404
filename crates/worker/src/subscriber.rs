//! Subscription lifecycle for the worker process.
//!
//! `Idle -> Subscribing -> Listening -> Cancelled`, or `Crashed` when the
//! broker connection fails. A crash is returned to the caller as an error
//! so the process can exit and be restarted by its supervisor.

use bookshelf_core::{Error, Result};
use pubsub::{ensure_topic, Broker, CancelHandle, MessageHandler, Subscription};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Subscribing,
    Listening,
    Cancelled,
    Crashed,
}

/// Attaches one handler to the shared worker subscription.
pub struct Listener {
    broker: Arc<dyn Broker>,
    topic: String,
    subscription_name: String,
    handler: Arc<dyn MessageHandler>,
    state: ListenerState,
    subscription: Option<Subscription>,
    cancel: Option<CancelHandle>,
}

impl Listener {
    pub fn new(
        broker: Arc<dyn Broker>,
        topic: impl Into<String>,
        subscription_name: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            broker,
            topic: topic.into(),
            subscription_name: subscription_name.into(),
            handler,
            state: ListenerState::Idle,
            subscription: None,
            cancel: None,
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// Ensures the topic exists and starts delivery.
    ///
    /// Returns a handle that stops delivery from another task while
    /// [`Listener::run`] is waiting.
    pub async fn subscribe(&mut self) -> Result<CancelHandle> {
        if self.state != ListenerState::Idle {
            return Err(Error::internal(format!(
                "listener cannot subscribe from state {:?}",
                self.state
            )));
        }
        self.state = ListenerState::Subscribing;

        let subscribed = async {
            let topic = ensure_topic(self.broker.as_ref(), &self.topic).await?;
            self.broker
                .subscribe(&topic, &self.subscription_name, self.handler.clone())
                .await
        }
        .await;

        match subscribed {
            Ok(subscription) => {
                let cancel = subscription.cancel_handle();
                self.cancel = Some(cancel.clone());
                self.subscription = Some(subscription);
                self.state = ListenerState::Listening;
                info!(
                    "Listening to {} with subscription {}",
                    self.topic, self.subscription_name
                );
                Ok(cancel)
            }
            Err(e) => {
                self.state = ListenerState::Crashed;
                error!(topic = %self.topic, error = %e, "Failed to subscribe");
                Err(e)
            }
        }
    }

    /// Subscribes if needed, then waits until delivery ends.
    ///
    /// `Ok` after a cancel; the broker error after a crash.
    pub async fn run(&mut self) -> Result<()> {
        if self.state == ListenerState::Idle {
            self.subscribe().await?;
        }

        let Some(mut subscription) = self.subscription.take() else {
            return Err(Error::internal(format!(
                "listener cannot run from state {:?}",
                self.state
            )));
        };

        match subscription.closed().await {
            Ok(()) => {
                self.state = ListenerState::Cancelled;
                info!(subscription = %self.subscription_name, "Subscription cancelled");
                Ok(())
            }
            Err(e) => {
                self.state = ListenerState::Crashed;
                error!(subscription = %self.subscription_name, error = %e, "Subscription failed");
                Err(e)
            }
        }
    }

    /// Stops delivery. A message being handled runs to completion.
    /// Does nothing before the first successful subscribe.
    pub fn cancel(&self) {
        if let Some(ref cancel) = self.cancel {
            cancel.cancel();
        }
    }
}

//! In-process publish/subscribe bus.
//!
//! One ractor actor drains the mailbox. Each published message is handed to
//! every listener concurrently, each on its own tokio task, and the actor
//! waits for all of them before taking the next message, so messages are
//! delivered in publish order. A failing or panicking listener is logged and
//! skipped; it never stops the bus.

use crate::error::VaultError;
use futures::FutureExt;
use futures::future::join_all;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub type SubscriptionId = u64;

/// Receives every message published on the bus it is subscribed to.
#[ractor::async_trait]
pub trait Listener<M>: Send + Sync + 'static {
    async fn on_message(&self, message: M) -> Result<(), VaultError>;
}

/// Messages handled by the bus actor.
pub enum BusMessage<M> {
    Publish(M),
    Subscribe(Arc<dyn Listener<M>>, RpcReplyPort<SubscriptionId>),
    Unsubscribe(SubscriptionId),
    ListenerCount(RpcReplyPort<usize>),
    /// Replies once everything queued before it has been delivered.
    Flush(RpcReplyPort<()>),
}

/// Handle for publishing to and subscribing on a bus.
pub struct EventBusHandle<M> {
    actor: ActorRef<BusMessage<M>>,
}

impl<M> Clone for EventBusHandle<M> {
    fn clone(&self) -> Self {
        Self {
            actor: self.actor.clone(),
        }
    }
}

impl<M> EventBusHandle<M>
where
    M: Clone + Send + Sync + 'static,
{
    /// Enqueue a message. Returns as soon as it is in the mailbox.
    pub fn send(&self, message: M) -> Result<(), VaultError> {
        ractor::cast!(self.actor, BusMessage::Publish(message))
            .map_err(|e| VaultError::EventBus(format!("publish failed: {e}")))
    }

    pub async fn subscribe(&self, listener: Arc<dyn Listener<M>>) -> Result<SubscriptionId, VaultError> {
        ractor::call!(self.actor, BusMessage::Subscribe, listener)
            .map_err(|e| VaultError::EventBus(format!("subscribe failed: {e}")))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), VaultError> {
        ractor::cast!(self.actor, BusMessage::Unsubscribe(id))
            .map_err(|e| VaultError::EventBus(format!("unsubscribe failed: {e}")))
    }

    pub async fn listener_count(&self) -> Result<usize, VaultError> {
        ractor::call!(self.actor, BusMessage::ListenerCount)
            .map_err(|e| VaultError::EventBus(format!("listener count failed: {e}")))
    }

    /// Wait until every message sent before this call has reached all listeners.
    pub async fn flush(&self) -> Result<(), VaultError> {
        ractor::call!(self.actor, BusMessage::Flush)
            .map_err(|e| VaultError::EventBus(format!("flush failed: {e}")))
    }
}

struct EventBusState<M> {
    listeners: Vec<(SubscriptionId, Arc<dyn Listener<M>>)>,
    next_id: SubscriptionId,
}

struct EventBusActor<M>(PhantomData<fn() -> M>);

#[ractor::async_trait]
impl<M> Actor for EventBusActor<M>
where
    M: Clone + Send + Sync + 'static,
{
    type Msg = BusMessage<M>;
    type State = EventBusState<M>;
    type Arguments = ();

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        _arguments: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(EventBusState {
            listeners: Vec::new(),
            next_id: 1,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            BusMessage::Publish(msg) => {
                Self::deliver(state, msg).await;
            }
            BusMessage::Subscribe(listener, rp) => {
                let id = state.next_id;
                state.next_id += 1;
                state.listeners.push((id, listener));
                debug!(id, listeners = state.listeners.len(), "listener subscribed");
                let _ = rp.send(id);
            }
            BusMessage::Unsubscribe(id) => {
                let before = state.listeners.len();
                state.listeners.retain(|(lid, _)| *lid != id);
                if state.listeners.len() == before {
                    debug!(id, "unsubscribe for unknown listener");
                }
            }
            BusMessage::ListenerCount(rp) => {
                let _ = rp.send(state.listeners.len());
            }
            BusMessage::Flush(rp) => {
                let _ = rp.send(());
            }
        }
        Ok(())
    }
}

impl<M> EventBusActor<M>
where
    M: Clone + Send + Sync + 'static,
{
    async fn deliver(state: &EventBusState<M>, msg: M) {
        let deliveries = state.listeners.iter().map(|(id, listener)| {
            let id = *id;
            let listener = Arc::clone(listener);
            let msg = msg.clone();
            tokio::spawn(async move { listener.on_message(msg).await }).map(move |joined| (id, joined))
        });

        for (id, joined) in join_all(deliveries).await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(listener = id, error = %e, "listener failed; message dropped"),
                Err(e) => error!(listener = id, error = %e, "listener panicked"),
            }
        }
    }
}

/// Spawn a bus actor and return its handle.
pub async fn spawn<M>() -> Result<EventBusHandle<M>, VaultError>
where
    M: Clone + Send + Sync + 'static,
{
    let (actor, _jh) = Actor::spawn(None, EventBusActor::<M>(PhantomData), ())
        .await
        .map_err(|e| VaultError::EventBus(format!("failed to spawn event bus: {e}")))?;
    Ok(EventBusHandle { actor })
}

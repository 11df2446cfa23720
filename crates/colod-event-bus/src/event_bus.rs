use crate::{tid, Receiver};

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use flume as channel;

type InnerSender = channel::Sender<Box<dyn BusEvent>>;
type InnerReceiver = channel::Receiver<Box<dyn BusEvent>>;

/// Trait for events that can be sent through the event bus. Use the [`crate::Event`]
/// derive macro to implement it.
///
/// Declares an `as_any` method returning `&dyn Any`, used to downcast an event back to
/// its concrete type on [`Receiver::recv`].
pub trait BusEvent: Send {
    fn as_any(&self) -> &dyn Any;
}

/// A typed, multi-channel event bus backed by [`flume`]. One channel is registered per
/// event type; subscribers receive only the event type they registered for.
///
/// # Examples
/// ```
/// use event_bus::{EventBus, BusEvent};
/// use event_bus_macros::Event;
///
/// #[derive(Clone, Event)]
/// struct LinkChanged {
///    up: bool,
/// }
///
/// # tokio_test::block_on(async {
/// let mut bus = EventBus::default();
/// bus.register::<LinkChanged>(None);
///
/// let mut receiver = bus.subscribe::<LinkChanged>();
/// bus.send(LinkChanged { up: false }).await;
///
/// let event = receiver.recv().await.unwrap();
/// # });
/// ```
#[derive(Clone, Default, Debug)]
pub struct EventBus {
    txs: HashMap<TypeId, InnerSender>,
    rxs: HashMap<TypeId, InnerReceiver>,
}

impl EventBus {
    /// Registers a channel for `E`. `channel_size` bounds it; `None` is unbounded.
    /// A no-op returning `true` if `E` is already registered, `false` otherwise.
    pub fn register<E: BusEvent + Clone + 'static>(&mut self, channel_size: Option<usize>) -> bool {
        if self.txs.contains_key(&tid::<E>()) {
            return true;
        }

        let (tx, rx) = match channel_size {
            Some(size) => channel::bounded::<Box<dyn BusEvent>>(size),
            None => channel::unbounded::<Box<dyn BusEvent>>(),
        };

        self.txs.insert(tid::<E>(), tx);
        self.rxs.insert(tid::<E>(), rx);

        false
    }

    /// Returns a [`Receiver`] for `E`. Panics if `E` was never [`EventBus::register`]ed.
    pub fn subscribe<E: BusEvent + Clone + 'static>(&self) -> Receiver<E> {
        let rx = self
            .rxs
            .get(&tid::<E>())
            .expect("channel for event must be registered before subscribing")
            .clone();

        Receiver::new(rx)
    }

    /// Publishes `event` to every subscriber of `E`. Panics if `E` was never
    /// [`EventBus::register`]ed.
    pub async fn send<E: BusEvent + 'static>(&self, event: E) {
        let channel = self
            .txs
            .get(&tid::<E>())
            .expect("channel for event must be registered before sending");

        channel
            .send_async(Box::new(event))
            .await
            .expect("event channel closed while a sender was still live");
    }
}

use std::marker::PhantomData;

use flume::RecvError;

use crate::event_bus::BusEvent;

/// A subscriber's end of a registered event channel, typed to one concrete `E` even
/// though the channel underneath carries boxed `dyn BusEvent`s -- `recv` downcasts back
/// to `E` on the way out so callers never see the erased type.
#[derive(Clone)]
pub struct Receiver<E: Clone> {
    inner: flume::Receiver<Box<dyn BusEvent>>,
    event_type: PhantomData<E>,
}

impl<E: Clone + 'static> Receiver<E> {
    pub fn new(inner: flume::Receiver<Box<dyn BusEvent>>) -> Self {
        Self { inner, event_type: PhantomData }
    }

    /// Waits for the next event of type `E`. Panics if the channel somehow carries a
    /// different concrete type -- registration keys channels by `TypeId`, so this would
    /// only happen from a bug in the bus itself.
    pub async fn recv(&self) -> Result<E, RecvError> {
        let boxed = self.inner.recv_async().await?;

        match boxed.as_any().downcast_ref::<E>() {
            Some(event) => Ok(event.clone()),
            None => panic!("event channel carried a value of the wrong concrete type"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

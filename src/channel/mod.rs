//! Closable channels with a selectable capacity policy.
//!
//! A [`Channel`] is a cheap, cloneable handle. One clone plays the sender
//! role and another the receiver role; all synchronization lives inside the
//! channel, so callers never lock anything themselves.
//!
//! Closing is one-way: after [`Channel::close`] every new `send` fails with
//! [`Error::ChannelClosed`]. Values already in the channel stay receivable
//! until it is drained, and so do the values of sends that were already
//! suspended when the channel closed.

mod capacity;

pub use capacity::Capacity;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_core::Stream;
use tokio::sync::Notify;

use crate::core::{Error, Result};
use crate::telemetry::{self, log_debug, log_trace, names};

/// Error returned by [`Channel::try_send`]; hands the value back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrySendError<T> {
    /// The channel has no room right now (or no receiver, for rendezvous)
    Full(T),
    /// The channel was closed
    Closed(T),
}

impl<T> fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Full(_) => write!(f, "Channel is full"),
            TrySendError::Closed(_) => write!(f, "Channel was closed"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for TrySendError<T> {}

impl<T> TrySendError<T> {
    /// Recover the value that could not be sent.
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(value) | TrySendError::Closed(value) => value,
        }
    }
}

impl<T> From<TrySendError<T>> for Error {
    fn from(err: TrySendError<T>) -> Self {
        match err {
            TrySendError::Full(_) => Error::custom("Channel is full"),
            TrySendError::Closed(_) => Error::ChannelClosed,
        }
    }
}

struct State<T> {
    queue: VecDeque<T>,
    closed: bool,
    /// Values ever enqueued (minus withdrawn rendezvous offers)
    sent: u64,
    /// Values ever dequeued by a receiver
    received: u64,
    /// Senders that suspended before `close` and may still deliver
    admitted_senders: usize,
    /// Receivers currently suspended in `receive`, oldest first
    waiting: VecDeque<u64>,
    /// Values handed straight to a suspended receiver by `try_send`
    handed: HashMap<u64, T>,
    next_receiver: u64,
}

impl<T> State<T> {
    /// Enqueue `value` if the policy has room. An `admitted` sender was
    /// already suspended when the channel closed and is still let in.
    fn try_push(
        &mut self,
        capacity: Capacity,
        value: T,
        admitted: bool,
    ) -> std::result::Result<u64, TrySendError<T>> {
        if self.closed && !admitted {
            return Err(TrySendError::Closed(value));
        }
        match capacity {
            Capacity::Rendezvous if !self.queue.is_empty() => {
                return Err(TrySendError::Full(value));
            }
            Capacity::Buffered(size) if self.queue.len() >= size => {
                return Err(TrySendError::Full(value));
            }
            Capacity::Conflated => {
                if self.queue.pop_front().is_some() {
                    log_trace!("conflated channel dropped an unreceived value");
                    telemetry::count(names::VALUES_OVERWRITTEN);
                }
            }
            _ => {}
        }
        self.queue.push_back(value);
        self.sent += 1;
        Ok(self.sent)
    }

    fn pop(&mut self) -> Option<T> {
        let value = self.queue.pop_front()?;
        self.received += 1;
        Some(value)
    }

    /// Closed, and no suspended sender is left to deliver anything.
    fn is_sealed(&self) -> bool {
        self.closed && self.admitted_senders == 0
    }
}

struct Inner<T> {
    capacity: Capacity,
    state: Mutex<State<T>>,
    /// Signalled when a value arrives or the channel closes
    readable: Notify,
    /// Signalled when room frees up, an offer is taken, or the channel closes
    writable: Notify,
}

impl<T> Inner<T> {
    // The state is a handful of counters and a queue; a panic while holding
    // the lock cannot leave it half-updated, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A typed, closable conduit between concurrently running tasks.
///
/// Values sent by one sender are received in the order they were sent.
pub struct Channel<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Channel")
            .field("capacity", &self.inner.capacity)
            .field("len", &state.queue.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new(Capacity::default())
    }
}

impl<T> Channel<T> {
    /// Create a channel with the given capacity policy.
    pub fn new(capacity: Capacity) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity: capacity.normalized(),
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    closed: false,
                    sent: 0,
                    received: 0,
                    admitted_senders: 0,
                    waiting: VecDeque::new(),
                    handed: HashMap::new(),
                    next_receiver: 0,
                }),
                readable: Notify::new(),
                writable: Notify::new(),
            }),
        }
    }

    /// Create a zero-capacity channel
    pub fn rendezvous() -> Self {
        Self::new(Capacity::Rendezvous)
    }

    /// Create a channel buffering up to `size` values
    pub fn buffered(size: usize) -> Self {
        Self::new(Capacity::buffered(size))
    }

    /// Create a channel that never suspends its sender
    pub fn unbounded() -> Self {
        Self::new(Capacity::Unbounded)
    }

    /// Create a channel that keeps only the latest value
    pub fn conflated() -> Self {
        Self::new(Capacity::Conflated)
    }

    /// The capacity policy this channel was created with
    pub fn capacity(&self) -> Capacity {
        self.inner.capacity
    }

    /// Number of values currently waiting to be received
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Whether no value is waiting to be received
    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    /// Whether `close` has been called
    pub fn is_closed_for_send(&self) -> bool {
        self.inner.lock().closed
    }

    /// Whether the channel is closed and fully drained.
    ///
    /// This is `false` for a fresh channel even if the task that will fill
    /// it has not started yet.
    pub fn is_closed_for_receive(&self) -> bool {
        let state = self.inner.lock();
        state.is_sealed() && state.queue.is_empty()
    }

    /// Close the channel for sending.
    ///
    /// Idempotent; returns `true` only for the call that actually closed it.
    /// Buffered values stay receivable. A send that was already suspended
    /// still delivers its value once there is room or a receiver for it.
    pub fn close(&self) -> bool {
        {
            let mut state = self.inner.lock();
            if state.closed {
                return false;
            }
            state.closed = true;
            log_debug!(
                capacity = %self.inner.capacity,
                pending = state.queue.len(),
                "channel closed"
            );
        }
        self.inner.readable.notify_waiters();
        self.inner.writable.notify_waiters();
        true
    }

    /// Send a value, suspending while the capacity policy has no room.
    ///
    /// On a rendezvous channel this returns only after a receiver has taken
    /// the value. Fails with [`Error::ChannelClosed`] if called after `close`.
    pub async fn send(&self, value: T) -> Result<()> {
        match self.inner.capacity {
            Capacity::Rendezvous => self.send_rendezvous(value).await,
            _ => self.send_buffered(value).await,
        }
    }

    /// Enqueue `value`, suspending while the policy has no room.
    async fn push(&self, value: T) -> Result<u64> {
        let notified = self.inner.writable.notified();
        tokio::pin!(notified);
        let mut value = value;
        let mut admitted: Option<AdmittedSender<'_, T>> = None;

        loop {
            notified.as_mut().enable();
            {
                let mut state = self.inner.lock();
                match state.try_push(self.inner.capacity, value, admitted.is_some()) {
                    Ok(ticket) => {
                        if let Some(admitted) = admitted.take() {
                            admitted.finish(&mut state);
                        }
                        drop(state);
                        self.inner.readable.notify_waiters();
                        return Ok(ticket);
                    }
                    Err(TrySendError::Closed(_)) => return Err(Error::ChannelClosed),
                    Err(TrySendError::Full(returned)) => {
                        value = returned;
                        if admitted.is_none() {
                            state.admitted_senders += 1;
                            admitted = Some(AdmittedSender { inner: &*self.inner });
                        }
                    }
                }
            }
            notified.as_mut().await;
            notified.set(self.inner.writable.notified());
        }
    }

    async fn send_buffered(&self, value: T) -> Result<()> {
        self.push(value).await?;
        telemetry::count(names::VALUES_SENT);
        Ok(())
    }

    async fn send_rendezvous(&self, value: T) -> Result<()> {
        // Wait for the hand-off slot, then leave the value there as an offer.
        let ticket = self.push(value).await?;
        let _offer = PendingOffer {
            inner: &*self.inner,
            ticket,
        };

        // The send completes only once a receiver has taken the offer.
        let notified = self.inner.writable.notified();
        tokio::pin!(notified);
        loop {
            notified.as_mut().enable();
            if self.inner.lock().received >= ticket {
                break;
            }
            notified.as_mut().await;
            notified.set(self.inner.writable.notified());
        }

        telemetry::count(names::VALUES_SENT);
        Ok(())
    }

    /// Send without suspending.
    ///
    /// A rendezvous channel accepts the value only when a receiver is
    /// already suspended in `receive`, and hands it to that receiver
    /// directly. A conflated channel always accepts it.
    pub fn try_send(&self, value: T) -> std::result::Result<(), TrySendError<T>> {
        {
            let mut state = self.inner.lock();
            if self.inner.capacity == Capacity::Rendezvous {
                if state.closed {
                    return Err(TrySendError::Closed(value));
                }
                // A pending offer is owed to the receivers ahead of us.
                if state.waiting.len() <= state.queue.len() {
                    return Err(TrySendError::Full(value));
                }
                match state.waiting.pop_front() {
                    Some(receiver) => {
                        state.handed.insert(receiver, value);
                    }
                    None => return Err(TrySendError::Full(value)),
                }
            } else {
                state.try_push(self.inner.capacity, value, false)?;
            }
        }
        self.inner.readable.notify_waiters();
        telemetry::count(names::VALUES_SENT);
        Ok(())
    }

    /// Receive one value, suspending until one is available.
    ///
    /// Fails with [`Error::ChannelClosed`] once the channel is closed and
    /// drained.
    pub async fn receive(&self) -> Result<T> {
        self.receive_catching().await.ok_or(Error::ChannelClosed)
    }

    /// Receive one value, or `None` once the channel is closed and drained.
    pub async fn receive_catching(&self) -> Option<T> {
        let notified = self.inner.readable.notified();
        tokio::pin!(notified);
        let mut waiting: Option<WaitingReceiver<'_, T>> = None;

        loop {
            notified.as_mut().enable();
            {
                let mut state = self.inner.lock();
                let handed = waiting.as_ref().and_then(|w| state.handed.remove(&w.id));
                if let Some(value) = handed.or_else(|| state.pop()) {
                    if let Some(waiting) = waiting.take() {
                        waiting.finish(&mut state);
                    }
                    drop(state);
                    self.inner.writable.notify_waiters();
                    telemetry::count(names::VALUES_RECEIVED);
                    return Some(value);
                }
                if state.is_sealed() {
                    if let Some(waiting) = waiting.take() {
                        waiting.finish(&mut state);
                    }
                    return None;
                }
                if waiting.is_none() {
                    waiting = Some(WaitingReceiver::register(&*self.inner, &mut state));
                }
            }
            notified.as_mut().await;
            notified.set(self.inner.readable.notified());
        }
    }

    /// Receive without suspending.
    ///
    /// `Ok(None)` means the channel is open but empty; closed and drained is
    /// reported as [`Error::ChannelClosed`].
    pub fn try_receive(&self) -> Result<Option<T>> {
        let value = {
            let mut state = self.inner.lock();
            match state.pop() {
                Some(value) => value,
                None if state.is_sealed() => return Err(Error::ChannelClosed),
                None => return Ok(None),
            }
        };
        self.inner.writable.notify_waiters();
        telemetry::count(names::VALUES_RECEIVED);
        Ok(Some(value))
    }

    /// Drain the channel, calling `f` on each value in order.
    ///
    /// Returns normally once the channel is closed and drained; the close is
    /// the expected end of the loop, not an error.
    pub async fn consume_each<F>(&self, mut f: F)
    where
        F: FnMut(T),
    {
        while let Some(value) = self.receive_catching().await {
            f(value);
        }
    }

    /// Like [`consume_each`](Self::consume_each), but stops at the first
    /// error returned by `f` and propagates it.
    pub async fn try_consume_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(T) -> Result<()>,
    {
        while let Some(value) = self.receive_catching().await {
            f(value)?;
        }
        Ok(())
    }

    /// Fold every remaining value left to right.
    pub async fn fold<A, F>(&self, seed: A, mut f: F) -> A
    where
        F: FnMut(A, T) -> A,
    {
        let mut acc = seed;
        while let Some(value) = self.receive_catching().await {
            acc = f(acc, value);
        }
        acc
    }

    /// Receive everything until the channel is closed and drained.
    pub async fn collect(&self) -> Vec<T> {
        self.fold(Vec::new(), |mut items, value| {
            items.push(value);
            items
        })
        .await
    }

    /// Adapt the receive side into a [`Stream`] that ends on close.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send + 'static
    where
        T: Send + 'static,
    {
        futures::stream::unfold(self, |channel| async move {
            let value = channel.receive_catching().await?;
            Some((value, channel))
        })
    }
}

/// A rendezvous value sitting in the channel until a receiver takes it.
/// Dropping an untaken offer (the send was cancelled) withdraws it.
struct PendingOffer<'a, T> {
    inner: &'a Inner<T>,
    ticket: u64,
}

impl<T> Drop for PendingOffer<'_, T> {
    fn drop(&mut self) {
        let withdrawn = {
            let mut state = self.inner.lock();
            // The slot holds at most one offer, so an untaken one is ours.
            if state.received < self.ticket {
                state.queue.pop_back();
                state.sent -= 1;
                true
            } else {
                false
            }
        };
        if withdrawn {
            log_trace!("rendezvous offer withdrawn by a cancelled send");
            self.inner.writable.notify_waiters();
        }
    }
}

/// A send that suspended before the channel closed. Dropping it (the send
/// was cancelled) lets receivers see the channel as drained.
struct AdmittedSender<'a, T> {
    inner: &'a Inner<T>,
}

impl<T> AdmittedSender<'_, T> {
    fn finish(self, state: &mut State<T>) {
        state.admitted_senders -= 1;
        std::mem::forget(self);
    }
}

impl<T> Drop for AdmittedSender<'_, T> {
    fn drop(&mut self) {
        self.inner.lock().admitted_senders -= 1;
        self.inner.readable.notify_waiters();
    }
}

/// A receive suspended on the channel, eligible for a `try_send` hand-off.
struct WaitingReceiver<'a, T> {
    inner: &'a Inner<T>,
    id: u64,
}

impl<'a, T> WaitingReceiver<'a, T> {
    fn register(inner: &'a Inner<T>, state: &mut State<T>) -> Self {
        let id = state.next_receiver;
        state.next_receiver += 1;
        state.waiting.push_back(id);
        Self { inner, id }
    }

    fn finish(self, state: &mut State<T>) {
        state.waiting.retain(|id| *id != self.id);
        std::mem::forget(self);
    }
}

impl<T> Drop for WaitingReceiver<'_, T> {
    fn drop(&mut self) {
        let (forwarded, lost) = {
            let mut state = self.inner.lock();
            state.waiting.retain(|id| *id != self.id);
            match state.handed.remove(&self.id) {
                // Pass a value handed to us on to the next suspended receiver.
                Some(value) => match state.waiting.pop_front() {
                    Some(next) => {
                        state.handed.insert(next, value);
                        (true, None)
                    }
                    None => (false, Some(value)),
                },
                None => (false, None),
            }
        };
        if forwarded {
            self.inner.readable.notify_waiters();
        }
        if lost.is_some() {
            log_trace!("value handed to a cancelled receive was dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;
    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready, assert_ready_ok};

    #[tokio::test]
    async fn send_after_close_fails_for_every_policy() {
        for capacity in [
            Capacity::Rendezvous,
            Capacity::Buffered(4),
            Capacity::Unbounded,
            Capacity::Conflated,
        ] {
            let channel = Channel::new(capacity);
            assert!(channel.close());
            assert!(!channel.close());
            assert!(matches!(channel.send(1).await, Err(Error::ChannelClosed)));
            assert_eq!(channel.try_send(2), Err(TrySendError::Closed(2)));
        }
    }

    #[tokio::test]
    async fn rendezvous_send_waits_for_a_receiver() {
        let channel = Channel::rendezvous();
        let mut producer = task::spawn(async {
            channel.send("Element 1").await?;
            channel.send("Element 2").await
        });

        assert_pending!(producer.poll());
        assert_pending!(producer.poll());
        assert_eq!(channel.len(), 1);

        assert_eq!(channel.receive().await.unwrap(), "Element 1");
        assert!(producer.is_woken());
        assert_pending!(producer.poll());

        assert_eq!(channel.receive().await.unwrap(), "Element 2");
        assert_ready_ok!(producer.poll());
    }

    #[tokio::test]
    async fn cancelled_rendezvous_send_is_withdrawn() {
        let channel = Channel::rendezvous();
        let mut send = task::spawn(channel.send(7));
        assert_pending!(send.poll());
        assert_eq!(channel.len(), 1);

        drop(send);
        assert!(channel.is_empty());
        assert!(matches!(channel.try_receive(), Ok(None)));

        let mut next = task::spawn(channel.send(8));
        assert_pending!(next.poll());
        assert_eq!(channel.receive().await.unwrap(), 8);
        assert_ready_ok!(next.poll());
    }

    #[tokio::test]
    async fn rendezvous_try_send_needs_a_waiting_receiver() {
        let channel = Channel::rendezvous();
        assert_eq!(channel.try_send("early"), Err(TrySendError::Full("early")));

        let mut receive = task::spawn(channel.receive());
        assert_pending!(receive.poll());

        channel.try_send("late").unwrap();
        assert!(receive.is_woken());
        assert_eq!(assert_ready_ok!(receive.poll()), "late");
    }

    #[tokio::test]
    async fn buffered_send_suspends_after_capacity() {
        let channel = Channel::buffered(2);
        channel.send(1).await.unwrap();
        channel.send(2).await.unwrap();
        assert_eq!(channel.try_send(3), Err(TrySendError::Full(3)));

        let mut third = task::spawn(channel.send(3));
        assert_pending!(third.poll());

        assert_eq!(channel.receive().await.unwrap(), 1);
        assert!(third.is_woken());
        assert_ready_ok!(third.poll());
        assert_eq!(channel.receive().await.unwrap(), 2);
        assert_eq!(channel.receive().await.unwrap(), 3);
        assert!(channel.is_empty());
    }

    #[tokio::test]
    async fn send_suspended_before_close_still_delivers() {
        let channel = Channel::buffered(1);
        channel.send("Android").await.unwrap();

        let mut blocked = task::spawn(channel.send("iOS"));
        assert_pending!(blocked.poll());

        channel.close();
        assert!(matches!(channel.send("web").await, Err(Error::ChannelClosed)));
        assert!(!channel.is_closed_for_receive());

        assert_eq!(channel.receive().await.unwrap(), "Android");
        assert!(blocked.is_woken());
        assert_ready_ok!(blocked.poll());
        assert_eq!(channel.receive().await.unwrap(), "iOS");
        assert!(channel.is_closed_for_receive());
    }

    #[tokio::test]
    async fn rendezvous_send_waiting_for_the_slot_survives_close() {
        let channel = Channel::rendezvous();
        let mut first = task::spawn(channel.send(1));
        assert_pending!(first.poll());
        let mut second = task::spawn(channel.send(2));
        assert_pending!(second.poll());

        channel.close();
        assert_eq!(channel.receive().await.unwrap(), 1);
        assert_ready_ok!(first.poll());
        assert_pending!(second.poll());
        assert_eq!(channel.receive().await.unwrap(), 2);
        assert_ready_ok!(second.poll());
        assert!(matches!(channel.receive().await, Err(Error::ChannelClosed)));
    }

    #[tokio::test]
    async fn cancelling_a_suspended_send_after_close_ends_the_channel() {
        let channel = Channel::buffered(1);
        channel.send(1).await.unwrap();
        let mut blocked = task::spawn(channel.send(2));
        assert_pending!(blocked.poll());
        channel.close();

        assert_eq!(channel.receive().await.unwrap(), 1);
        let mut receive = task::spawn(channel.receive_catching());
        drop(blocked);
        assert!(channel.is_closed_for_receive());
        assert_eq!(assert_ready!(receive.poll()), None);
    }

    #[tokio::test]
    async fn try_send_hand_off_survives_a_dropped_receiver() {
        let channel = Channel::rendezvous();
        let mut receive = task::spawn(channel.receive());
        assert_pending!(receive.poll());

        channel.try_send(1).unwrap();
        drop(receive);
        assert_eq!(channel.len(), 0);
        assert!(matches!(channel.try_receive(), Ok(None)));

        let mut next = task::spawn(channel.send(2));
        assert_pending!(next.poll());
        assert_eq!(channel.receive().await.unwrap(), 2);
        assert_ready_ok!(next.poll());
    }

    #[tokio::test]
    async fn try_send_hand_off_moves_to_the_next_waiting_receiver() {
        let channel = Channel::rendezvous();
        let mut first = task::spawn(channel.receive());
        let mut second = task::spawn(channel.receive());
        assert_pending!(first.poll());
        assert_pending!(second.poll());

        channel.try_send("hello").unwrap();
        drop(first);
        assert!(second.is_woken());
        assert_eq!(assert_ready_ok!(second.poll()), "hello");
        assert_eq!(channel.len(), 0);
    }

    #[tokio::test]
    async fn unbounded_send_never_suspends() {
        let channel = Channel::unbounded();
        for i in 0..10_000 {
            let mut send = task::spawn(channel.send(i));
            assert_ready_ok!(send.poll());
        }
        assert_eq!(channel.len(), 10_000);
    }

    #[tokio::test]
    async fn conflated_keeps_only_the_latest_value() {
        let channel = Channel::conflated();
        channel.send("V1").await.unwrap();
        channel.send("V2").await.unwrap();
        channel.send("V3").await.unwrap();

        assert_eq!(channel.len(), 1);
        assert_eq!(channel.receive().await.unwrap(), "V3");
        assert!(matches!(channel.try_receive(), Ok(None)));
    }

    #[tokio::test]
    async fn closed_channel_drains_before_reporting_closure() {
        let channel = Channel::buffered(4);
        channel.send('a').await.unwrap();
        channel.send('b').await.unwrap();
        assert!(!channel.is_closed_for_receive());
        channel.close();

        assert!(channel.is_closed_for_send());
        assert!(!channel.is_closed_for_receive());
        assert_eq!(channel.receive().await.unwrap(), 'a');
        assert_eq!(channel.receive().await.unwrap(), 'b');
        assert!(channel.is_closed_for_receive());
        assert!(matches!(channel.receive().await, Err(Error::ChannelClosed)));
        assert!(matches!(channel.try_receive(), Err(Error::ChannelClosed)));
    }

    #[tokio::test]
    async fn suspended_receive_wakes_on_close() {
        let channel = Channel::<u8>::rendezvous();
        let mut receive = task::spawn(channel.receive_catching());
        assert_pending!(receive.poll());

        channel.close();
        assert!(receive.is_woken());
        assert_eq!(assert_ready!(receive.poll()), None);
    }

    #[tokio::test]
    async fn consume_each_delivers_in_order_then_returns() {
        let channel = Channel::buffered(Capacity::BUFFERED);
        let producer = {
            let channel = channel.clone();
            tokio::spawn(async move {
                for i in 1..=4 {
                    channel.send(i).await?;
                }
                channel.close();
                Ok::<_, Error>(())
            })
        };

        let mut seen = Vec::new();
        channel.consume_each(|value| seen.push(value)).await;

        assert_eq!(seen, vec![1, 2, 3, 4]);
        producer.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn try_consume_each_stops_at_the_first_error() {
        let channel = Channel::unbounded();
        for i in 1..=5 {
            channel.send(i).await.unwrap();
        }
        channel.close();

        let mut seen = Vec::new();
        let result = channel
            .try_consume_each(|value| {
                if value == 3 {
                    return Err(Error::custom("three"));
                }
                seen.push(value);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(Error::Custom(msg)) if msg == "three"));
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(channel.collect().await, vec![4, 5]);
    }

    #[tokio::test]
    async fn stream_ends_when_channel_closes() {
        let channel = Channel::unbounded();
        for word in ["x", "y", "z"] {
            channel.send(word).await.unwrap();
        }
        channel.close();

        let words: Vec<_> = channel.clone().into_stream().collect().await;
        assert_eq!(words, vec!["x", "y", "z"]);
    }
}

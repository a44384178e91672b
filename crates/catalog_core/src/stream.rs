//! Push-based streams with a replayed last value.
//!
//! Every node of the catalog pipeline publishes into a [`ReplayCache`]: a
//! last-value holder with a broadcast subscriber list. Subscribers receive
//! the cached event first and then every later event in publish order, so a
//! late subscriber never triggers recomputation upstream.
//!
//! Each publish is stamped with the cache's running publish count, which lets
//! a consumer order its own inputs against a source's events.

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::{stream, Stream};
use tokio::{
    sync::broadcast::{
        self,
        error::{RecvError, TryRecvError},
    },
    task::JoinHandle,
};
use tracing::warn;

use crate::error::FetchError;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent<T> {
    Next(T),
    Failed(FetchError),
}

impl<T> StreamEvent<T> {
    pub fn as_next(&self) -> Option<&T> {
        match self {
            Self::Next(value) => Some(value),
            Self::Failed(_) => None,
        }
    }
}

/// Anything that can hand out subscriptions to a stream of `T`.
pub trait Source<T> {
    fn subscribe(&self) -> Subscription<T>;
}

type Stamped<T> = (u64, StreamEvent<T>);

struct ReplayState<T> {
    last: Option<Stamped<T>>,
    published: u64,
    tx: broadcast::Sender<Stamped<T>>,
}

pub struct ReplayCache<T> {
    state: Arc<Mutex<ReplayState<T>>>,
}

impl<T> Clone for ReplayCache<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Clone + Send + 'static> Default for ReplayCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> ReplayCache<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Arc::new(Mutex::new(ReplayState {
                last: None,
                published: 0,
                tx,
            })),
        }
    }

    /// A cache that already holds `value`, like a behavior subject.
    pub fn seeded(value: T, capacity: usize) -> Self {
        let cache = Self::with_capacity(capacity);
        {
            let mut state = cache.lock();
            state.published = 1;
            state.last = Some((1, StreamEvent::Next(value)));
        }
        cache
    }

    /// Records `event` as the replayed value and delivers it to every current
    /// subscriber before returning.
    pub fn publish(&self, event: StreamEvent<T>) {
        let mut state = self.lock();
        state.published += 1;
        let stamp = state.published;
        state.last = Some((stamp, event.clone()));
        // No live receivers is fine: the cached event still reaches late subscribers.
        let _ = state.tx.send((stamp, event));
    }

    pub fn next(&self, value: T) {
        self.publish(StreamEvent::Next(value));
    }

    pub fn fail(&self, error: FetchError) {
        self.publish(StreamEvent::Failed(error));
    }

    pub fn latest(&self) -> Option<StreamEvent<T>> {
        self.lock().last.as_ref().map(|(_, event)| event.clone())
    }

    /// Number of events published so far; the stamp of the latest event.
    pub fn published(&self) -> u64 {
        self.lock().published
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().tx.receiver_count()
    }

    fn lock(&self) -> MutexGuard<'_, ReplayState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone + Send + 'static> Source<T> for ReplayCache<T> {
    fn subscribe(&self) -> Subscription<T> {
        // Take the replay and the receiver under one lock so no publish can
        // fall between them.
        let state = self.lock();
        Subscription {
            replay: state.last.clone(),
            rx: state.tx.subscribe(),
        }
    }
}

pub struct Subscription<T> {
    replay: Option<Stamped<T>>,
    rx: broadcast::Receiver<Stamped<T>>,
}

impl<T: Clone> Subscription<T> {
    /// Waits for the next event. Returns `None` once every publisher is gone.
    pub async fn next(&mut self) -> Option<StreamEvent<T>> {
        self.next_stamped().await.map(|(_, event)| event)
    }

    /// Like [`Subscription::next`], also returning the source's publish count
    /// at the time the event was published.
    pub async fn next_stamped(&mut self) -> Option<(u64, StreamEvent<T>)> {
        if let Some(stamped) = self.replay.take() {
            return Some(stamped);
        }
        loop {
            match self.rx.recv().await {
                Ok(stamped) => return Some(stamped),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "stream subscriber lagged behind; skipping stale events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns an already-delivered event without waiting.
    pub fn try_next(&mut self) -> Option<StreamEvent<T>> {
        if let Some((_, event)) = self.replay.take() {
            return Some(event);
        }
        loop {
            match self.rx.try_recv() {
                Ok((_, event)) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "stream subscriber lagged behind; skipping stale events");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = StreamEvent<T>>
    where
        T: Send + 'static,
    {
        stream::unfold(self, |mut subscription| async move {
            subscription
                .next()
                .await
                .map(|event| (event, subscription))
        })
    }
}

/// A derived stream: an output cache plus the task that feeds it.
///
/// Dropping the node aborts its task; subscribers then observe the end of
/// the stream once the remaining cache handles are gone.
pub struct Derived<T> {
    output: ReplayCache<T>,
    task: JoinHandle<()>,
}

impl<T: Clone + Send + 'static> Derived<T> {
    pub fn spawn<F, Fut>(capacity: usize, body: F) -> Self
    where
        F: FnOnce(ReplayCache<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let output = ReplayCache::with_capacity(capacity);
        let task = tokio::spawn(body(output.clone()));
        Self { output, task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Read-only view of this node's publish count.
    pub fn clock(&self) -> PublishClock<T> {
        PublishClock {
            cache: self.output.clone(),
        }
    }
}

/// Reads a cache's publish count without being able to publish into it.
pub struct PublishClock<T> {
    cache: ReplayCache<T>,
}

impl<T: Clone + Send + 'static> PublishClock<T> {
    pub fn now(&self) -> u64 {
        self.cache.published()
    }
}

impl<T: Clone + Send + 'static> Source<T> for Derived<T> {
    fn subscribe(&self) -> Subscription<T> {
        self.output.subscribe()
    }
}

impl<T> Drop for Derived<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Re-emits `combine(latest_left, latest_right)` whenever either input
/// produces a value, once both have produced at least one.
///
/// A failure on either input is forwarded and ends the node.
pub fn combine_latest<A, B, T, F>(
    mut left: Subscription<A>,
    mut right: Subscription<B>,
    capacity: usize,
    combine: F,
) -> Derived<T>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    T: Clone + Send + 'static,
    F: Fn(&A, &B) -> T + Send + 'static,
{
    Derived::spawn(capacity, move |output| async move {
        let mut latest_left: Option<A> = None;
        let mut latest_right: Option<B> = None;
        let mut left_open = true;
        let mut right_open = true;

        loop {
            tokio::select! {
                event = left.next(), if left_open => match event {
                    Some(StreamEvent::Next(value)) => latest_left = Some(value),
                    Some(StreamEvent::Failed(error)) => {
                        output.fail(error);
                        break;
                    }
                    None => {
                        left_open = false;
                        continue;
                    }
                },
                event = right.next(), if right_open => match event {
                    Some(StreamEvent::Next(value)) => latest_right = Some(value),
                    Some(StreamEvent::Failed(error)) => {
                        output.fail(error);
                        break;
                    }
                    None => {
                        right_open = false;
                        continue;
                    }
                },
                else => break,
            }

            if let (Some(left), Some(right)) = (&latest_left, &latest_right) {
                output.next(combine(left, right));
            }
        }
    })
}

/// Applies `f` to every value of `upstream`. Failures are forwarded and end
/// the node.
pub fn map<A, T, F>(mut upstream: Subscription<A>, capacity: usize, f: F) -> Derived<T>
where
    A: Clone + Send + 'static,
    T: Clone + Send + 'static,
    F: Fn(A) -> T + Send + 'static,
{
    Derived::spawn(capacity, move |output| async move {
        while let Some(event) = upstream.next().await {
            match event {
                StreamEvent::Next(value) => output.next(f(value)),
                StreamEvent::Failed(error) => {
                    output.fail(error);
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "tests/stream_tests.rs"]
mod tests;

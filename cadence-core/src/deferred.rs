//! ## cadence-core::deferred
//! **Single-assignment result slot with any number of awaiters**
//!
//! A [`Deferred`] is owned by a primitive and settled exactly once. Awaiters
//! hold [`Completion`]s, cheap clones that resolve when the slot settles.
//! A slot that is never settled leaves its awaiters pending forever; each
//! completion removes its registered waker when dropped.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::error::TimingError;

/// Observable state of a deferred result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settlement {
    Pending,
    Fulfilled,
    Rejected(TimingError),
}

impl Settlement {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Settlement::Pending)
    }
}

struct Slot {
    settlement: Settlement,
    wakers: Vec<(u64, Waker)>,
    next_key: u64,
}

#[derive(Clone)]
pub struct Deferred {
    slot: Arc<Mutex<Slot>>,
}

impl Default for Deferred {
    fn default() -> Self {
        Self::new()
    }
}

impl Deferred {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                settlement: Settlement::Pending,
                wakers: Vec::new(),
                next_key: 0,
            })),
        }
    }

    /// Returns `false` if the slot was already settled.
    pub fn fulfill(&self) -> bool {
        self.settle(Settlement::Fulfilled)
    }

    /// Returns `false` if the slot was already settled.
    pub fn reject(&self, error: TimingError) -> bool {
        self.settle(Settlement::Rejected(error))
    }

    pub fn settlement(&self) -> Settlement {
        self.slot.lock().settlement.clone()
    }

    pub fn is_settled(&self) -> bool {
        self.slot.lock().settlement.is_settled()
    }

    pub fn completion(&self) -> Completion {
        Completion::new(Arc::clone(&self.slot))
    }

    /// Number of awaiters currently registered.
    pub fn waiters(&self) -> usize {
        self.slot.lock().wakers.len()
    }

    fn settle(&self, outcome: Settlement) -> bool {
        let wakers = {
            let mut slot = self.slot.lock();
            if slot.settlement.is_settled() {
                return false;
            }
            slot.settlement = outcome;
            std::mem::take(&mut slot.wakers)
        };
        for (_, waker) in wakers {
            waker.wake();
        }
        true
    }
}

/// Awaitable view of a [`Deferred`].
pub struct Completion {
    slot: Arc<Mutex<Slot>>,
    /// Key of this completion's waker entry, once polled while pending.
    key: Option<u64>,
}

impl Clone for Completion {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.slot))
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(key) = self.key {
            self.slot.lock().wakers.retain(|(k, _)| *k != key);
        }
    }
}

impl Completion {
    fn new(slot: Arc<Mutex<Slot>>) -> Self {
        Self { slot, key: None }
    }

    /// Peeks at the result without registering interest.
    pub fn state(&self) -> Settlement {
        self.slot.lock().settlement.clone()
    }

    /// True when both completions observe the same deferred result.
    pub fn same_as(&self, other: &Completion) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl Future for Completion {
    type Output = Result<(), TimingError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut guard = this.slot.lock();
        let slot = &mut *guard;
        match &slot.settlement {
            Settlement::Fulfilled => Poll::Ready(Ok(())),
            Settlement::Rejected(error) => Poll::Ready(Err(error.clone())),
            Settlement::Pending => {
                let registered = this
                    .key
                    .and_then(|key| slot.wakers.iter_mut().find(|(k, _)| *k == key));
                match registered {
                    Some((_, waker)) => {
                        if !waker.will_wake(cx.waker()) {
                            *waker = cx.waker().clone();
                        }
                    }
                    None => {
                        let key = slot.next_key;
                        slot.next_key += 1;
                        slot.wakers.push((key, cx.waker().clone()));
                        this.key = Some(key);
                    }
                }
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settles_only_once() {
        let deferred = Deferred::new();
        assert!(deferred.fulfill());
        assert!(!deferred.reject(TimingError::Cancelled));
        assert!(!deferred.fulfill());
        assert_eq!(deferred.settlement(), Settlement::Fulfilled);
    }

    #[test]
    fn completions_share_the_slot() {
        let deferred = Deferred::new();
        let first = deferred.completion();
        let second = deferred.completion();
        assert!(first.same_as(&second));
        assert!(!first.same_as(&Deferred::new().completion()));

        deferred.reject(TimingError::Cancelled);
        assert_eq!(first.state(), Settlement::Rejected(TimingError::Cancelled));
        assert_eq!(second.state(), Settlement::Rejected(TimingError::Cancelled));
    }

    #[tokio::test]
    async fn every_awaiter_is_woken() {
        let deferred = Deferred::new();
        let awaiters: Vec<_> = (0..3)
            .map(|_| tokio::spawn(deferred.completion()))
            .collect();
        tokio::task::yield_now().await;

        deferred.fulfill();
        for awaiter in awaiters {
            assert_eq!(awaiter.await.unwrap(), Ok(()));
        }
    }

    #[tokio::test]
    async fn dropped_awaiters_release_their_wakers() {
        let deferred = Deferred::new();
        let kept = tokio::spawn(deferred.completion());
        let dropped = tokio::spawn(deferred.completion());
        tokio::task::yield_now().await;
        assert_eq!(deferred.waiters(), 2);

        dropped.abort();
        assert!(dropped.await.unwrap_err().is_cancelled());
        assert_eq!(deferred.waiters(), 1);

        // Completions that were never polled register nothing.
        let clone = deferred.completion().clone();
        assert_eq!(deferred.waiters(), 1);
        drop(clone);

        deferred.fulfill();
        assert_eq!(kept.await.unwrap(), Ok(()));
        assert_eq!(deferred.waiters(), 0);
    }

    #[tokio::test]
    async fn rejection_reaches_awaiters() {
        let deferred = Deferred::new();
        let awaiter = tokio::spawn(deferred.completion());
        deferred.reject(TimingError::Cancelled);
        assert_eq!(awaiter.await.unwrap(), Err(TimingError::Cancelled));
    }
}

//! Crawl frontier
//!
//! Design: the queue and the seen-set live behind one mutex, so the scope
//! check, the seen-set insert and the queue push of [`Frontier::try_enqueue`]
//! are a single atomic step, as are the pop and in-flight bookkeeping of
//! [`Frontier::claim_next`]. Workers never see the queue itself.

use crate::scope::CrawlTarget;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A discovered URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL
    pub url: Url,
    /// Link distance from the root (root is 0)
    pub depth: u32,
    /// Page the link was found on
    pub referrer: Option<Url>,
    /// Discovery order, starting at 0 for the root
    pub seq: u64,
}

/// Result of [`Frontier::try_enqueue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    /// Added to the queue
    Queued,
    /// Already seen this run
    Duplicate,
    /// Outside the crawl scope or not an HTML resource
    OutOfScope,
    /// Beyond the depth budget
    TooDeep,
}

/// Result of [`Frontier::claim_next`]
#[derive(Debug)]
pub enum Claim {
    /// Work to do; the caller must call [`Frontier::complete`] afterwards
    Ready(FrontierEntry),
    /// No more work will be handed out
    Exhausted,
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<FrontierEntry>,
    seen: HashSet<String>,
    in_flight: usize,
    claimed: usize,
    next_seq: u64,
}

/// Shared work queue plus seen-set for one crawl
#[derive(Debug)]
pub struct Frontier {
    target: CrawlTarget,
    max_depth: u32,
    max_pages: usize,
    state: Mutex<FrontierState>,
    notify: Notify,
}

impl Frontier {
    /// Create an empty frontier
    pub fn new(target: CrawlTarget, max_depth: u32, max_pages: usize) -> Self {
        Self {
            target,
            max_depth,
            max_pages,
            state: Mutex::new(FrontierState::default()),
            notify: Notify::new(),
        }
    }

    /// The crawl target this frontier enforces
    pub fn target(&self) -> &CrawlTarget {
        &self.target
    }

    /// Enqueue the crawl root at depth 0
    pub fn seed(&self) -> Enqueue {
        let root = self.target.root().clone();
        self.try_enqueue(&root, 0, None)
    }

    /// Enqueue a URL if it is in scope, unseen and within the depth budget
    pub fn try_enqueue(&self, url: &Url, depth: u32, referrer: Option<&Url>) -> Enqueue {
        if depth > self.max_depth {
            return Enqueue::TooDeep;
        }
        if !self.target.is_crawlable(url) {
            return Enqueue::OutOfScope;
        }

        let normalized = self.target.normalize(url);
        let mut state = self.lock();
        if !state.seen.insert(normalized.as_str().to_string()) {
            return Enqueue::Duplicate;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.push_back(FrontierEntry {
            url: normalized,
            depth,
            referrer: referrer.cloned(),
            seq,
        });
        drop(state);

        self.notify.notify_waiters();
        Enqueue::Queued
    }

    /// Record a URL as seen without queueing it (e.g. a redirect target)
    ///
    /// Returns false if the URL had already been seen.
    pub fn mark_seen(&self, url: &Url) -> bool {
        let normalized = self.target.normalize(url);
        self.lock().seen.insert(normalized.as_str().to_string())
    }

    /// Take the next entry, waiting while other workers may still add work
    ///
    /// Returns [`Claim::Exhausted`] once the queue is empty with nothing in
    /// flight, the page budget is spent, or `cancel` fires.
    pub async fn claim_next(&self, cancel: &CancellationToken) -> Claim {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before inspecting state so a wakeup between the check
            // and the await is not lost.
            notified.as_mut().enable();

            if cancel.is_cancelled() {
                return Claim::Exhausted;
            }

            {
                let mut state = self.lock();
                if state.claimed >= self.max_pages {
                    drop(state);
                    self.notify.notify_waiters();
                    return Claim::Exhausted;
                }
                if let Some(entry) = state.queue.pop_front() {
                    state.in_flight += 1;
                    state.claimed += 1;
                    return Claim::Ready(entry);
                }
                if state.in_flight == 0 {
                    drop(state);
                    self.notify.notify_waiters();
                    return Claim::Exhausted;
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = cancel.cancelled() => return Claim::Exhausted,
            }
        }
    }

    /// Mark a claimed entry as finished
    ///
    /// Call after the links discovered on the page have been enqueued, so
    /// idle workers cannot conclude the crawl is over too early.
    pub fn complete(&self) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.notify.notify_waiters();
    }

    /// True if the page budget is spent while work is still queued
    pub fn budget_reached(&self) -> bool {
        let state = self.lock();
        state.claimed >= self.max_pages && !state.queue.is_empty()
    }

    /// Number of distinct URLs seen so far
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // A worker panicking mid-update leaves plain counters behind; keep going.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

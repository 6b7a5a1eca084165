//! Crawl frontier: pending queue, dedup set and completion barrier
//!
//! All mutable state sits behind a single lock so that the membership check,
//! the budget check and the enqueue happen as one step. A URL is therefore
//! claimed at most once per crawl, and the number of admitted URLs never
//! exceeds the page budget.
//!
//! Completion is tracked with an outstanding-work counter: it rises on every
//! admission and falls on every [`Frontier::done`]. Workers waiting in
//! [`Frontier::next`] are released with `None` once the queue is empty and the
//! counter is zero.

use crate::url::admission_url;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct State {
    queue: VecDeque<String>,
    seen: HashSet<String>,
    /// Admitted URLs not yet marked done (queued or in flight)
    outstanding: usize,
    /// URLs marked done
    finished: usize,
}

/// Concurrency-safe URL frontier
#[derive(Debug)]
pub struct Frontier {
    state: Mutex<State>,
    notify: Notify,
    page_budget: usize,
}

impl Frontier {
    /// Creates an empty frontier that admits at most `page_budget` URLs
    pub fn new(page_budget: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            notify: Notify::new(),
            page_budget,
        }
    }

    /// Maximum number of URLs this frontier will admit
    pub fn page_budget(&self) -> usize {
        self.page_budget
    }

    /// Atomically checks and claims a URL
    ///
    /// Returns `true` if the URL was new, passed the admission rules and fit
    /// within the budget; it is then queued for fetching. Fragments are not
    /// stripped here. Links should go through
    /// [`strip_fragment`](crate::url::strip_fragment) first.
    pub fn admit(&self, raw: &str) -> bool {
        let url = match admission_url(raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::trace!("Not admitting {}: {}", raw, e);
                return false;
            }
        };

        {
            let mut state = self.state.lock();
            if state.seen.len() >= self.page_budget || state.seen.contains(&url) {
                return false;
            }
            state.seen.insert(url.clone());
            state.queue.push_back(url);
            state.outstanding += 1;
        }

        self.notify.notify_waiters();
        true
    }

    /// Pops the next queued URL without waiting
    ///
    /// `None` only means nothing is queued right now. Use [`Frontier::next`]
    /// to wait for work or for the crawl to drain.
    pub fn take(&self) -> Option<String> {
        self.state.lock().queue.pop_front()
    }

    /// Marks one claimed URL as fully processed
    ///
    /// Returns the number of URLs finished so far.
    pub fn done(&self) -> usize {
        let (finished, drained) = {
            let mut state = self.state.lock();
            state.outstanding = state.outstanding.saturating_sub(1);
            state.finished += 1;
            (state.finished, state.outstanding == 0)
        };

        if drained {
            self.notify.notify_waiters();
        }
        finished
    }

    /// Waits for the next URL, or `None` once the crawl has drained
    pub async fn next(&self) -> Option<String> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a wakeup between the check and the
            // await is not lost
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(url) = state.queue.pop_front() {
                    return Some(url);
                }
                if state.outstanding == 0 {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Number of distinct URLs admitted so far
    pub fn admitted(&self) -> usize {
        self.state.lock().seen.len()
    }

    /// Number of URLs waiting to be fetched
    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// True when nothing is queued and nothing is in flight
    pub fn is_drained(&self) -> bool {
        self.state.lock().outstanding == 0
    }
}

//! Concurrent processing for token checking.
//!
//! A fixed group of workers drains one shared queue of tokens. Each claim is
//! an exclusive pop, so no token is checked twice and none is skipped.
//! Results go back over a bounded channel as soon as each check finishes.
//!
//! Per-token lifecycle: a token is *pending* while in the queue, *running*
//! once a worker pops it, and ends either *completed* (result sent) or
//! *cancelled* (dropped because the cancel token fired first).

use crate::checker::TokenChecker;
use crate::transport::Transport;
use crate::types::TokenResult;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

/// Shared cancellation flag checked by every worker between and during checks.
///
/// Clones observe the same flag. Cancelling is idempotent.
#[derive(Clone, Debug)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut receiver = self.state.subscribe();
        // The sender lives as long as `self`, so `changed` cannot fail here.
        while !*receiver.borrow_and_update() {
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Exhaustible FIFO of tokens shared by the workers.
struct WorkQueue {
    items: Mutex<VecDeque<String>>,
}

impl WorkQueue {
    fn new(tokens: Vec<String>) -> Self {
        Self {
            items: Mutex::new(tokens.into()),
        }
    }

    /// Claim the next token, if any.
    fn pop(&self) -> Option<String> {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }
}

/// Fixed-size group of workers running checks over a shared queue.
pub struct WorkerPool<T: Transport + 'static> {
    checker: TokenChecker<T>,
    workers: usize,
}

impl<T: Transport + 'static> WorkerPool<T> {
    /// Create a pool; at least one worker always runs.
    pub fn new(checker: TokenChecker<T>, workers: usize) -> Self {
        Self {
            checker,
            workers: workers.max(1),
        }
    }

    /// Spawn the workers and return the receiving end of the result channel.
    ///
    /// The channel closes once every worker has exited: the queue ran dry,
    /// the cancel token fired, or the receiver was dropped.
    pub fn spawn(self, tokens: Vec<String>, cancel: CancelToken) -> mpsc::Receiver<TokenResult> {
        let total = tokens.len();
        let queue = Arc::new(WorkQueue::new(tokens));
        let (sender, receiver) = mpsc::channel(self.workers);

        tracing::debug!(workers = self.workers, total, "starting worker pool");

        for worker_id in 0..self.workers {
            let queue = Arc::clone(&queue);
            let sender = sender.clone();
            let checker = self.checker.clone();
            let cancel = cancel.clone();

            tokio::spawn(async move {
                let mut checked = 0usize;

                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let Some(token) = queue.pop() else {
                        break;
                    };

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        result = checker.check_token(&token) => {
                            checked += 1;
                            if sender.send(result).await.is_err() {
                                break;
                            }
                        }
                    }
                }

                tracing::debug!(worker_id, checked, "worker finished");
            });
        }

        receiver
    }
}

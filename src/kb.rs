//! Knowledge base facade
//!
//! Wires the pieces together: a worker pool, a reasoner manager populated
//! from a configuration tree, and a non-blocking `submit_query` that fans
//! a goal out to every backend able to evaluate its predicate and returns
//! the answer stream. End-of-stream arrives once every backend has
//! drained; zero matching backends yield an immediately-empty stream.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::error::ReasonerResult;
use crate::formula::Formula;
use crate::query::{AnswerStream, Query};
use crate::reasoner::{Reasoner, ReasonerManager};
use crate::worker::{Runner, StopToken, ThreadPool};

/// Default buffer capacity for query answer streams.
pub const DEFAULT_STREAM_CAPACITY: usize = 64;

/// The main entry point: configuration, reasoner pool and query dispatch.
pub struct KnowledgeBase {
    reasoner_manager: Arc<ReasonerManager>,
    thread_pool: Arc<ThreadPool>,
    next_query_id: AtomicU32,
}

impl KnowledgeBase {
    /// Build a knowledge base from a configuration tree. Every entry of
    /// the `reasoner` array is loaded through the manager; the optional
    /// top-level `worker-threads` key sizes the dispatch pool.
    pub fn new(config: &toml::Value) -> ReasonerResult<Self> {
        let workers = config
            .get("worker-threads")
            .and_then(toml::Value::as_integer)
            .map(|n| n.max(0) as usize)
            .unwrap_or(0);

        let kb = KnowledgeBase {
            reasoner_manager: Arc::new(ReasonerManager::new()),
            thread_pool: Arc::new(ThreadPool::new(workers)),
            next_query_id: AtomicU32::new(1),
        };

        if let Some(entries) = config.get("reasoner").and_then(toml::Value::as_array) {
            for entry in entries {
                kb.reasoner_manager.load_reasoner(entry)?;
            }
        }
        Ok(kb)
    }

    pub fn reasoner_manager(&self) -> &Arc<ReasonerManager> {
        &self.reasoner_manager
    }

    pub fn thread_pool(&self) -> &Arc<ThreadPool> {
        &self.thread_pool
    }

    /// Evaluate a formula. Non-blocking: the returned stream yields the
    /// answers of every backend whose current predicates cover the goal.
    pub fn submit_query(&self, goal: Formula, capacity: usize) -> AnswerStream {
        let (channel, stream) = AnswerStream::create(capacity);
        let goal = Arc::new(goal);

        let backends = match goal.innermost_predicate() {
            Some(predicate) => self.reasoner_manager.get_for_predicate(predicate.indicator()),
            None => {
                warn!(goal = %goal, "goal shape is not dispatchable");
                Vec::new()
            }
        };
        if backends.is_empty() {
            // dropping the only writer ends the stream immediately
            return stream;
        }

        let id = self.next_query_id.fetch_add(1, Ordering::Relaxed);
        let dispatch = DispatchRunner { query: Query::new(id, goal, channel), backends };
        self.thread_pool.submit(Arc::new(dispatch));
        stream
    }
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("reasoner_manager", &self.reasoner_manager)
            .finish()
    }
}

// Fans a query out to its backends off the caller's thread. The query's
// channel writer is dropped with the runner, so end-of-stream waits for
// every backend writer.
struct DispatchRunner {
    query: Query,
    backends: Vec<Arc<dyn Reasoner>>,
}

impl Runner for DispatchRunner {
    fn run(&self, _stop: &StopToken) {
        for backend in &self.backends {
            let goal = backend.transform_query(Arc::clone(self.query.goal()));
            backend.start_query(self.query.id(), self.query.channel().clone(), goal);
            backend.finish_query(self.query.id(), false);
        }
    }
}

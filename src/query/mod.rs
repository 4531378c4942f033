//! Queries, answers and per-query runtime state
//!
//! An [`Answer`] is a substitution over the free variables of a query
//! goal, optionally tagged with the confidence and time frame the backend
//! derived it under. Answers flow through the streams in [`stream`].
//!
//! [`ActiveQuery`] is the record a backend keeps for each query between
//! `start_query` and the drain that follows `finish_query`: the goal, the
//! answer channel, the input-complete flag, and the stop tokens of the
//! runner tasks currently evaluating instances of the goal.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use fnv::FnvHashMap;

use crate::formula::{Formula, TimeInterval};
use crate::term::Substitution;
use crate::worker::StopToken;

mod stream;

pub use stream::{AnswerStream, Channel};

/// A single solution produced by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    substitution: Arc<Substitution>,
    confidence: Option<f64>,
    frame: Option<TimeInterval>,
}

impl Answer {
    pub fn new(substitution: Arc<Substitution>) -> Self {
        Answer { substitution, confidence: None, frame: None }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_frame(mut self, frame: TimeInterval) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn substitution(&self) -> &Arc<Substitution> {
        &self.substitution
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn frame(&self) -> Option<&TimeInterval> {
        self.frame.as_ref()
    }
}

/// A submitted query: an identifier, a goal and the writer half of its
/// answer stream.
#[derive(Debug)]
pub struct Query {
    id: u32,
    goal: Arc<Formula>,
    channel: Channel,
}

impl Query {
    pub fn new(id: u32, goal: Arc<Formula>, channel: Channel) -> Self {
        Query { id, goal, channel }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn goal(&self) -> &Arc<Formula> {
        &self.goal
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }
}

/// Per-query state owned by a backend while evaluation is in progress.
///
/// The channel writer parks here until the query is drained: once input is
/// complete and the runner set is empty, the writer is dropped and the
/// stream sees its end-of-stream marker.
#[derive(Debug)]
pub struct ActiveQuery {
    goal: Arc<Formula>,
    channel: Mutex<Option<Channel>>,
    input_complete: AtomicBool,
    runners: Mutex<FnvHashMap<u64, Arc<StopToken>>>,
    next_runner: AtomicU64,
}

impl ActiveQuery {
    pub fn new(goal: Arc<Formula>, channel: Channel) -> Self {
        ActiveQuery {
            goal,
            channel: Mutex::new(Some(channel)),
            input_complete: AtomicBool::new(false),
            runners: Mutex::new(FnvHashMap::default()),
            next_runner: AtomicU64::new(0),
        }
    }

    pub fn goal(&self) -> &Arc<Formula> {
        &self.goal
    }

    pub fn input_complete(&self) -> bool {
        self.input_complete.load(Ordering::Acquire)
    }

    /// A writer clone for a new runner task, or `None` once the query has
    /// been finalized.
    pub fn clone_channel(&self) -> Option<Channel> {
        self.channel.lock().expect("active query lock poisoned").clone()
    }

    /// Track a runner's stop token; returns the key the runner must hand
    /// back through [`runner_finished`](Self::runner_finished).
    pub fn register_runner(&self, stop: Arc<StopToken>) -> u64 {
        let key = self.next_runner.fetch_add(1, Ordering::Relaxed);
        self.runners
            .lock()
            .expect("active query lock poisoned")
            .insert(key, stop);
        key
    }

    /// Remove a completed runner. Returns `true` when this was the last
    /// runner of a completed query, in which case the channel writer has
    /// been released and the caller should drop its bookkeeping entry.
    pub fn runner_finished(&self, key: u64) -> bool {
        self.runners
            .lock()
            .expect("active query lock poisoned")
            .remove(&key);
        self.try_finalize()
    }

    /// Mark the input as complete: no further substitutions will arrive.
    /// With `immediate`, all in-flight runners are asked to stop at their
    /// next safe point. Returns `true` when the query is already drained.
    pub fn complete_input(&self, immediate: bool) -> bool {
        self.input_complete.store(true, Ordering::Release);
        if immediate {
            for stop in self.runners.lock().expect("active query lock poisoned").values() {
                stop.request_stop();
            }
        }
        self.try_finalize()
    }

    // Releases the channel writer once input is complete and no runner is
    // outstanding. The writer is dropped outside the locks: its release
    // publishes EOS and may block under backpressure.
    fn try_finalize(&self) -> bool {
        let drained = {
            let runners = self.runners.lock().expect("active query lock poisoned");
            self.input_complete() && runners.is_empty()
        };
        if !drained {
            return false;
        }
        let channel = self.channel.lock().expect("active query lock poisoned").take();
        drop(channel);
        true
    }
}

//! Built-in computable backend
//!
//! [`ComputedReasoner`] evaluates predicates through a table of plain Rust
//! functions, one per `functor/arity`. It is the reference implementation
//! of the reasoner contract: every `start_query` and `push_substitution`
//! spawns one cancellable runner on the backend's worker pool, answers
//! stream through the query channel, and end-of-stream is published by the
//! last writer once input is complete and all runners have drained.
//!
//! Two functors are installed by default: `'='/2` (unification) and
//! `member/2` (list membership).

use std::sync::{Arc, Mutex};

use fnv::FnvHashMap;
use tracing::warn;

use crate::formula::Formula;
use crate::query::{ActiveQuery, Answer, Channel};
use crate::term::{Compound, PredicateIndicator, Substitution, Unifier};
use crate::worker::{Runner, StopToken, ThreadPool};

use super::{
    goal_predicate, DataFile, DataFileHandlers, Reasoner, ReasonerConfiguration, ReasonerInit,
};

/// Publishes solutions for one evaluation, composing each with the
/// substitution the evaluation was instantiated from.
pub struct AnswerPublisher<'a> {
    channel: &'a Channel,
    base: Option<&'a Substitution>,
    stop: &'a StopToken,
}

impl AnswerPublisher<'_> {
    /// Merge `solution` with the instantiation base and push the result.
    /// Returns `false` when the solution conflicts with the base or the
    /// reader has gone away.
    pub fn push(&self, solution: Substitution) -> bool {
        let merged = match self.base {
            None => solution,
            Some(base) => {
                let mut merged = base.clone();
                if !merged.unify_with(&solution, None) {
                    return false;
                }
                merged
            }
        };
        self.channel.push(Answer::new(Arc::new(merged)))
    }

    /// Cooperative cancellation point for long evaluations.
    pub fn stop_requested(&self) -> bool {
        self.stop.stop_requested()
    }
}

/// The evaluation function for one predicate indicator.
pub type ComputableFn = fn(&Compound, &AnswerPublisher<'_>);

fn eval_unify(goal: &Compound, out: &AnswerPublisher<'_>) {
    let unifier = Unifier::new(&goal.args()[0], &goal.args()[1]);
    if unifier.exists() {
        out.push(unifier.into_substitution());
    }
}

fn eval_member(goal: &Compound, out: &AnswerPublisher<'_>) {
    let crate::term::Term::List(items) = &goal.args()[1] else {
        return;
    };
    for item in items.items() {
        if out.stop_requested() {
            break;
        }
        let unifier = Unifier::new(&goal.args()[0], item);
        if unifier.exists() {
            out.push(unifier.into_substitution());
        }
    }
}

#[derive(Debug, Default)]
struct ActiveQueryTable {
    queries: Mutex<FnvHashMap<u32, Arc<ActiveQuery>>>,
}

impl ActiveQueryTable {
    fn insert(&self, id: u32, query: Arc<ActiveQuery>) {
        self.queries
            .lock()
            .expect("active query table lock poisoned")
            .insert(id, query);
    }

    fn get(&self, id: u32) -> Option<Arc<ActiveQuery>> {
        self.queries
            .lock()
            .expect("active query table lock poisoned")
            .get(&id)
            .cloned()
    }

    fn remove(&self, id: u32) {
        self.queries
            .lock()
            .expect("active query table lock poisoned")
            .remove(&id);
    }
}

// One evaluation of one goal instance.
struct EvalRunner {
    query_id: u32,
    key: u64,
    table: Arc<ActiveQueryTable>,
    active: Arc<ActiveQuery>,
    channel: Channel,
    base: Option<Arc<Substitution>>,
    goal: Arc<Compound>,
    func: ComputableFn,
}

impl Runner for EvalRunner {
    fn run(&self, stop: &StopToken) {
        if !stop.stop_requested() {
            let publisher = AnswerPublisher {
                channel: &self.channel,
                base: self.base.as_deref(),
                stop,
            };
            (self.func)(&self.goal, &publisher);
        }
        if self.active.runner_finished(self.key) {
            self.table.remove(self.query_id);
        }
    }
}

/// A backend mapping predicate indicators to evaluation functions.
pub struct ComputedReasoner {
    id: String,
    functors: FnvHashMap<PredicateIndicator, ComputableFn>,
    table: Arc<ActiveQueryTable>,
    pool: Mutex<Option<Arc<ThreadPool>>>,
    handlers: DataFileHandlers,
}

impl ComputedReasoner {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Register an evaluation function. Registration happens before the
    /// instance joins a manager pool.
    pub fn register(&mut self, indicator: PredicateIndicator, func: ComputableFn) {
        self.functors.insert(indicator, func);
    }

    /// Register a data file loader for `format`.
    pub fn add_data_file_handler(
        &mut self,
        format: impl Into<String>,
        loader: impl Fn(&DataFile) -> bool + Send + Sync + 'static,
    ) {
        self.handlers.add(format, loader);
    }

    fn pool(&self) -> Arc<ThreadPool> {
        let mut pool = self.pool.lock().expect("pool slot lock poisoned");
        Arc::clone(pool.get_or_insert_with(|| Arc::new(ThreadPool::new(2))))
    }

    // Spawn one evaluation of the goal, instantiated with `base` when
    // present. A goal this backend cannot evaluate spawns nothing; the
    // query then drains to an empty stream.
    fn spawn(&self, query_id: u32, active: &Arc<ActiveQuery>, base: Option<Arc<Substitution>>) {
        let instance;
        let goal = match &base {
            None => active.goal().as_ref(),
            Some(sub) => {
                instance = active.goal().apply(sub);
                &instance
            }
        };
        let Some(predicate) = goal_predicate(goal) else {
            warn!(id = %self.id, "goal has no evaluable predicate");
            return;
        };
        let Some(func) = self.functors.get(predicate.indicator()).copied() else {
            warn!(id = %self.id, indicator = %predicate.indicator(), "no evaluation function");
            return;
        };
        let Some(channel) = active.clone_channel() else {
            return;
        };

        let stop = Arc::new(StopToken::new());
        let key = active.register_runner(Arc::clone(&stop));
        let runner = EvalRunner {
            query_id,
            key,
            table: Arc::clone(&self.table),
            active: Arc::clone(active),
            channel,
            base,
            goal: Arc::clone(predicate),
            func,
        };
        self.pool().submit_with(Arc::new(runner), stop);
    }
}

impl ReasonerInit for ComputedReasoner {
    fn with_id(id: &str) -> Self {
        let mut reasoner = ComputedReasoner {
            id: id.to_string(),
            functors: FnvHashMap::default(),
            table: Arc::new(ActiveQueryTable::default()),
            pool: Mutex::new(None),
            handlers: DataFileHandlers::new(),
        };
        reasoner.register(PredicateIndicator::new("=", 2), eval_unify);
        reasoner.register(PredicateIndicator::new("member", 2), eval_member);
        reasoner
    }
}

impl Reasoner for ComputedReasoner {
    fn load_config(&mut self, cfg: &ReasonerConfiguration) -> bool {
        if let Some(workers) = cfg.string_setting("workers") {
            match workers.parse::<usize>() {
                Ok(n) if n > 0 => {
                    *self.pool.lock().expect("pool slot lock poisoned") =
                        Some(Arc::new(ThreadPool::new(n)));
                }
                _ => warn!(id = %self.id, workers, "invalid worker count, keeping default"),
            }
        }
        for file in &cfg.data_files {
            self.load_data_file(file);
        }
        true
    }

    fn is_current_predicate(&self, indicator: &PredicateIndicator) -> bool {
        self.functors.contains_key(indicator)
    }

    fn start_query(&self, query_id: u32, channel: Channel, goal: Arc<Formula>) {
        let active = Arc::new(ActiveQuery::new(goal, channel));
        self.table.insert(query_id, Arc::clone(&active));
        self.spawn(query_id, &active, None);
    }

    fn push_substitution(&self, query_id: u32, substitution: Arc<Substitution>) {
        let Some(active) = self.table.get(query_id) else {
            warn!(id = %self.id, query_id, "substitution for unknown query");
            return;
        };
        if active.input_complete() {
            warn!(id = %self.id, query_id, "substitution after finish_query");
            return;
        }
        self.spawn(query_id, &active, Some(substitution));
    }

    fn finish_query(&self, query_id: u32, immediate: bool) {
        let Some(active) = self.table.get(query_id) else {
            return;
        };
        if active.complete_input(immediate) {
            self.table.remove(query_id);
        }
    }

    fn data_file_handlers(&self) -> Option<&DataFileHandlers> {
        Some(&self.handlers)
    }
}

impl std::fmt::Debug for ComputedReasoner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedReasoner")
            .field("id", &self.id)
            .field("functors", &self.functors.keys().collect::<Vec<_>>())
            .finish()
    }
}

//! Stream histories and reaction memory.
//!
//! State that outlives a single evaluation: the values each stream has
//! emitted, the stream that triggered the current evaluation, and the last
//! value of every reaction.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use verse_core::{NodeId, Value};
use verse_registry::StreamId;

use crate::config::EvaluatorConfig;

#[derive(Debug, Clone)]
pub struct StreamState {
    /// Newest first.
    histories: FxHashMap<StreamId, VecDeque<Value>>,
    changed: Option<StreamId>,
    memory: FxHashMap<NodeId, Value>,
    history_limit: usize,
}

impl Default for StreamState {
    fn default() -> Self {
        Self::new(EvaluatorConfig::default().history_limit)
    }
}

impl StreamState {
    pub fn new(history_limit: usize) -> Self {
        Self {
            histories: FxHashMap::default(),
            changed: None,
            memory: FxHashMap::default(),
            history_limit: history_limit.max(1),
        }
    }

    /// Record an emission, dropping the oldest value past the limit.
    pub fn record(&mut self, stream: StreamId, value: Value) {
        let history = self.histories.entry(stream).or_default();
        history.push_front(value);
        history.truncate(self.history_limit);
    }

    pub fn latest(&self, stream: StreamId) -> Option<&Value> {
        self.history(stream, 0)
    }

    /// The value emitted `index` emissions before the latest one.
    pub fn history(&self, stream: StreamId, index: usize) -> Option<&Value> {
        self.histories.get(&stream).and_then(|h| h.get(index))
    }

    /// The stream whose emission triggered the current evaluation.
    pub fn changed(&self) -> Option<StreamId> {
        self.changed
    }

    pub(crate) fn set_changed(&mut self, stream: Option<StreamId>) {
        self.changed = stream;
    }

    pub fn memory(&self, reaction: NodeId) -> Option<&Value> {
        self.memory.get(&reaction)
    }

    pub(crate) fn remember(&mut self, reaction: NodeId, value: Value) {
        self.memory.insert(reaction, value);
    }
}

//! The step evaluator.
//!
//! Walks compiled steps with an explicit program counter over a stack of
//! evaluations, so host stack use does not grow with the program. Each
//! evaluation (the source itself, a function call, a structure
//! construction, a select query) owns its steps, its position and a
//! [`Frame`].
//!
//! A reference to a stream that has not emitted suspends the evaluator at
//! that finish step. [`Evaluator::emit`] records the emission and resumes
//! exactly there, handing the value back to the finish as its prior value.
//! An emission on any other stream the program depends on re-evaluates the
//! program from the start with [`StreamState::changed`] naming the stream
//! until that evaluation ends, including after any suspension within it.

use std::rc::Rc;

use tracing::{debug, trace};

use verse_analysis::{Program, Project, Step, StepKind};
use verse_core::{Exception, NodeId, Scope, TableValue, Value};
use verse_registry::StreamId;

use crate::config::EvaluatorConfig;
use crate::error::{Result, RuntimeError};
use crate::frame::Frame;
use crate::handlers::{self, Call, Entry, Finished, Runtime};
use crate::streams::StreamState;

#[derive(Debug, Clone, PartialEq)]
pub enum EvaluatorState {
    /// Nothing has run yet.
    Ready,
    /// Waiting for a stream to emit.
    Suspended(StreamId),
    Finished(Value),
}

#[derive(Debug)]
enum EvaluationKind {
    Root,
    Function {
        has_body: bool,
    },
    Construct {
        structure: NodeId,
    },
    Query {
        select: NodeId,
        table: Rc<TableValue>,
        base: Rc<Scope>,
        row: usize,
        kept: Vec<usize>,
    },
}

#[derive(Debug)]
struct Evaluation {
    kind: EvaluationKind,
    steps: Rc<[Step]>,
    pc: usize,
    frame: Frame,
}

impl Evaluation {
    fn new(kind: EvaluationKind, steps: Rc<[Step]>, frame: Frame) -> Self {
        Self {
            kind,
            steps,
            pc: 0,
            frame,
        }
    }
}

pub struct Evaluator<'p> {
    project: &'p Project,
    program: &'p Program,
    config: EvaluatorConfig,
    evaluations: Vec<Evaluation>,
    streams: StreamState,
    state: EvaluatorState,
    /// Frame handlers see when no evaluation is running.
    idle: Frame,
    steps: usize,
}

impl<'p> Evaluator<'p> {
    pub fn new(project: &'p Project, program: &'p Program, config: EvaluatorConfig) -> Self {
        Self {
            project,
            program,
            config,
            evaluations: Vec::new(),
            streams: StreamState::new(config.history_limit),
            state: EvaluatorState::Ready,
            idle: Frame::default(),
            steps: 0,
        }
    }

    pub fn state(&self) -> &EvaluatorState {
        &self.state
    }

    pub fn streams(&self) -> &StreamState {
        &self.streams
    }

    /// The most recent value the program finished with.
    pub fn latest(&self) -> Option<&Value> {
        match &self.state {
            EvaluatorState::Finished(value) => Some(value),
            _ => None,
        }
    }

    /// The stream a suspended evaluation waits for.
    pub fn waiting_on(&self) -> Option<StreamId> {
        match self.state {
            EvaluatorState::Suspended(stream) => Some(stream),
            _ => None,
        }
    }

    /// Evaluate the program from the start. Returns its value, or `None`
    /// when it suspended.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn start(&mut self) -> Result<Option<Value>> {
        self.evaluations.clear();
        let frame = Frame::new(Scope::new(None), None);
        self.evaluations.push(Evaluation::new(
            EvaluationKind::Root,
            Rc::clone(self.program.root()),
            frame,
        ));
        self.run(None)
    }

    /// Continue a suspended evaluation with `value` as the result of the
    /// finish it stopped at.
    pub fn resume(&mut self, value: Value) -> Result<Option<Value>> {
        let EvaluatorState::Suspended(stream) = self.state else {
            return Err(RuntimeError::NoEvaluation);
        };
        debug!(stream = stream.0, %value, "resuming");
        self.run(Some(value))
    }

    /// Record an emission on `stream` and react to it.
    ///
    /// Returns the program's new value, or `None` when it suspended or does
    /// not depend on the stream.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn emit(&mut self, stream: StreamId, value: Value) -> Result<Option<Value>> {
        if self.project.registry().stream(stream).is_none() {
            return Err(RuntimeError::UnknownStream { stream: stream.0 });
        }
        self.streams.record(stream, value.clone());
        if self.waiting_on() == Some(stream) {
            return self.resume(value);
        }
        if !self.program.depends_on(stream) {
            trace!(stream = stream.0, "emission ignored");
            return Ok(None);
        }
        debug!(stream = stream.0, "re-evaluating");
        self.streams.set_changed(Some(stream));
        self.start()
    }

    // ==========================================================================
    // Execution
    // ==========================================================================

    fn current(&mut self) -> Result<&mut Evaluation> {
        self.evaluations.last_mut().ok_or(RuntimeError::NoEvaluation)
    }

    fn advance(&mut self, by: usize) -> Result<()> {
        self.current()?.pc += by;
        Ok(())
    }

    fn run(&mut self, mut prior: Option<Value>) -> Result<Option<Value>> {
        self.steps = 0;
        loop {
            let evaluation = self.current()?;
            let Some(step) = evaluation.steps.get(evaluation.pc).copied() else {
                if let Some(value) = self.conclude()? {
                    debug!(%value, "evaluation finished");
                    self.streams.set_changed(None);
                    self.state = EvaluatorState::Finished(value.clone());
                    return Ok(Some(value));
                }
                continue;
            };

            self.steps += 1;
            if self.steps > self.config.step_limit {
                self.evaluations.clear();
                self.streams.set_changed(None);
                self.state = EvaluatorState::Ready;
                return Err(RuntimeError::StepLimit {
                    limit: self.config.step_limit,
                });
            }
            trace!(%step, "step");

            match step.kind {
                StepKind::Start => {
                    handlers::start(self, step.node);
                    self.advance(1)?;
                }
                StepKind::Finish | StepKind::StartFinish => {
                    let resumed = prior.take();
                    if step.kind == StepKind::StartFinish && resumed.is_none() {
                        handlers::start(self, step.node);
                    }
                    match handlers::finish(self, step.node, resumed) {
                        Finished::Value(value) => {
                            if let Value::Exception(exception) = &value {
                                debug!(node = %step.node, %exception, "exception");
                            }
                            self.frame_mut().push(value);
                            self.advance(1)?;
                        }
                        Finished::Call(call) => {
                            self.advance(1)?;
                            self.call(call);
                        }
                        Finished::Suspend(stream) => {
                            debug!(node = %step.node, stream = stream.0, "suspended");
                            self.state = EvaluatorState::Suspended(stream);
                            return Ok(None);
                        }
                    }
                }
                StepKind::Jump(n) => self.advance(1 + n)?,
                StepKind::JumpIfFalse(n) => {
                    let condition = self.frame_mut().pop();
                    let by = if condition.as_bool() == Some(true) { 1 } else { 1 + n };
                    self.advance(by)?;
                }
                StepKind::ShortCircuit { when, skip } => {
                    let decided = self.frame().peek().and_then(Value::as_bool) == Some(when);
                    self.advance(if decided { 1 + skip } else { 1 })?;
                }
                StepKind::JumpIfUnset(n) => {
                    let set = self.streams.memory(step.node).is_some();
                    self.advance(if set { 1 } else { 1 + n })?;
                }
                StepKind::Recall => {
                    let remembered = self.streams.memory(step.node).cloned();
                    self.frame_mut().push(remembered.unwrap_or(Value::None));
                    self.advance(1)?;
                }
            }
        }
    }

    /// Enter a call, or push its result when it fails before starting.
    fn call(&mut self, call: Call) {
        let tree = self.project.tree();
        let entry = handlers::enter(tree, self.frame(), call);
        let evaluation = match entry {
            Entry::Value(value) => {
                self.frame_mut().push(value);
                return;
            }
            Entry::Function {
                definition,
                supplied,
                frame,
            } => self.program.function(definition, supplied).map(|steps| {
                Evaluation::new(
                    EvaluationKind::Function {
                        has_body: handlers::has_body(tree, definition),
                    },
                    Rc::clone(steps),
                    frame,
                )
            }),
            Entry::Construct {
                definition,
                supplied,
                frame,
            } => self.program.constructor(definition, supplied).map(|steps| {
                Evaluation::new(
                    EvaluationKind::Construct {
                        structure: definition,
                    },
                    Rc::clone(steps),
                    frame,
                )
            }),
            Entry::Query {
                select,
                table,
                base,
            } => {
                if table.rows.is_empty() {
                    let empty = handlers::selection(self.program, select, &table, &[]);
                    self.frame_mut().push(empty);
                    return;
                }
                self.program.query(select).map(|steps| {
                    let frame = handlers::row_frame(&base, &table, 0);
                    Evaluation::new(
                        EvaluationKind::Query {
                            select,
                            table,
                            base,
                            row: 0,
                            kept: Vec::new(),
                        },
                        Rc::clone(steps),
                        frame,
                    )
                })
            }
        };
        match evaluation {
            Some(evaluation) => self.evaluations.push(evaluation),
            None => self.frame_mut().push(
                Exception::Value {
                    message: "called a definition outside the program".to_string(),
                }
                .into(),
            ),
        }
    }

    /// Pop the finished evaluation and hand its value to the caller. Returns
    /// the program's value once the root evaluation finishes.
    fn conclude(&mut self) -> Result<Option<Value>> {
        let Some(mut finished) = self.evaluations.pop() else {
            return Err(RuntimeError::NoEvaluation);
        };
        let value = match finished.kind {
            EvaluationKind::Root => finished.frame.pop(),
            EvaluationKind::Function { has_body } => {
                if has_body {
                    finished.frame.pop()
                } else {
                    Value::None
                }
            }
            EvaluationKind::Construct { structure } => {
                handlers::construct(self.project.tree(), structure, &finished.frame)
            }
            EvaluationKind::Query {
                select,
                table,
                base,
                row,
                mut kept,
            } => {
                if finished.frame.pop().as_bool() == Some(true) {
                    kept.push(row);
                }
                let next = row + 1;
                if next < table.rows.len() {
                    let frame = handlers::row_frame(&base, &table, next);
                    self.evaluations.push(Evaluation::new(
                        EvaluationKind::Query {
                            select,
                            table,
                            base,
                            row: next,
                            kept,
                        },
                        finished.steps,
                        frame,
                    ));
                    return Ok(None);
                }
                handlers::selection(self.program, select, &table, &kept)
            }
        };
        match self.evaluations.last_mut() {
            Some(caller) => {
                caller.frame.push(value);
                Ok(None)
            }
            None => Ok(Some(value)),
        }
    }
}

impl<'p> Runtime<'p> for Evaluator<'p> {
    fn project(&self) -> &'p Project {
        self.project
    }

    fn program(&self) -> &'p Program {
        self.program
    }

    fn frame(&self) -> &Frame {
        self.evaluations.last().map_or(&self.idle, |e| &e.frame)
    }

    fn frame_mut(&mut self) -> &mut Frame {
        match self.evaluations.last_mut() {
            Some(evaluation) => &mut evaluation.frame,
            None => &mut self.idle,
        }
    }

    fn streams(&self) -> &StreamState {
        &self.streams
    }

    fn streams_mut(&mut self) -> &mut StreamState {
        &mut self.streams
    }
}

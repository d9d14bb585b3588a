//! Direct, host-recursive evaluation.
//!
//! Evaluates the tree without compiling it to steps, through the same
//! start and finish handlers as the [`Evaluator`](crate::Evaluator). It
//! cannot suspend: a stream that has not emitted reads as an exception.
//! Its purpose is checking that stepping never changes what a program
//! means.

use verse_analysis::compile::{operands, short_circuits};
use verse_analysis::{Program, Project};
use verse_core::{Exception, NodeId, NodeKind, Scope, Value};

use crate::config::EvaluatorConfig;
use crate::error::{Result, RuntimeError};
use crate::frame::Frame;
use crate::handlers::{self, Entry, Finished, Runtime};
use crate::streams::StreamState;

pub struct Interpreter<'p> {
    project: &'p Project,
    program: &'p Program,
    config: EvaluatorConfig,
    frame: Frame,
    streams: StreamState,
    steps: usize,
}

impl<'p> Interpreter<'p> {
    pub fn new(project: &'p Project, program: &'p Program, config: EvaluatorConfig) -> Self {
        Self {
            project,
            program,
            config,
            frame: Frame::default(),
            streams: StreamState::new(config.history_limit),
            steps: 0,
        }
    }

    /// Start from the stream histories and reaction memory of another run.
    pub fn with_streams(mut self, streams: StreamState) -> Self {
        self.streams = streams;
        self
    }

    pub fn streams(&self) -> &StreamState {
        &self.streams
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn evaluate(&mut self) -> Result<Value> {
        self.frame = Frame::new(Scope::new(None), None);
        self.steps = 0;
        self.evaluate_node(self.program.source())
    }

    fn count(&mut self) -> Result<()> {
        self.steps += 1;
        if self.steps > self.config.step_limit {
            return Err(RuntimeError::StepLimit {
                limit: self.config.step_limit,
            });
        }
        Ok(())
    }

    fn evaluate_node(&mut self, node: NodeId) -> Result<Value> {
        self.count()?;
        let tree = self.project.tree();
        match tree.kind(node) {
            NodeKind::Conditional {
                condition,
                yes,
                no,
            } => {
                handlers::start(self, node);
                let condition = self.evaluate_node(*condition)?;
                let branch = if condition.as_bool() == Some(true) { *yes } else { *no };
                let value = self.evaluate_node(branch)?;
                self.frame.push(value);
            }
            NodeKind::Binary {
                operator,
                left,
                right,
            } if short_circuits(tree, node) => {
                handlers::start(self, node);
                let left = self.evaluate_node(*left)?;
                if left.as_bool() == Some(operator == "|") {
                    return Ok(left);
                }
                self.frame.push(left);
                let right = self.evaluate_node(*right)?;
                self.frame.push(right);
            }
            NodeKind::Reaction {
                initial,
                condition,
                next,
            } => {
                handlers::start(self, node);
                let value = match self.streams.memory(node).cloned() {
                    None => self.evaluate_node(*initial)?,
                    Some(remembered) => {
                        let condition = self.evaluate_node(*condition)?;
                        if condition.as_bool() == Some(true) {
                            self.evaluate_node(*next)?
                        } else {
                            remembered
                        }
                    }
                };
                self.frame.push(value);
            }
            _ => {
                handlers::start(self, node);
                for operand in operands(tree, node) {
                    let value = self.evaluate_node(operand)?;
                    self.frame.push(value);
                }
            }
        }
        self.conclude(node)
    }

    fn conclude(&mut self, node: NodeId) -> Result<Value> {
        match handlers::finish(self, node, None) {
            Finished::Value(value) => Ok(value),
            Finished::Call(call) => {
                let entry = handlers::enter(self.project.tree(), &self.frame, call);
                self.call(entry)
            }
            Finished::Suspend(stream) => Ok(Exception::Value {
                message: format!("stream {} has not emitted", stream.0),
            }
            .into()),
        }
    }

    /// Run `body` in `frame`, restoring the caller's frame afterwards.
    fn within<T>(
        &mut self,
        frame: Frame,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<(T, Frame)> {
        let caller = std::mem::replace(&mut self.frame, frame);
        let result = body(self);
        let callee = std::mem::replace(&mut self.frame, caller);
        result.map(|value| (value, callee))
    }

    fn call(&mut self, entry: Entry) -> Result<Value> {
        let tree = self.project.tree();
        match entry {
            Entry::Value(value) => Ok(value),
            Entry::Function {
                definition,
                supplied,
                frame,
            } => {
                let NodeKind::Function { inputs, body, .. } = tree.kind(definition) else {
                    return Ok(Value::None);
                };
                let (value, _) = self.within(frame, |this| {
                    for input in inputs.iter().skip(supplied) {
                        this.evaluate_node(*input)?;
                    }
                    match body {
                        Some(body) => this.evaluate_node(*body),
                        None => Ok(Value::None),
                    }
                })?;
                Ok(value)
            }
            Entry::Construct {
                definition,
                supplied,
                frame,
            } => {
                let NodeKind::Structure {
                    inputs, members, ..
                } = tree.kind(definition)
                else {
                    return Ok(Value::None);
                };
                let ((), frame) = self.within(frame, |this| {
                    for bind in inputs.iter().skip(supplied).chain(members) {
                        this.evaluate_node(*bind)?;
                    }
                    Ok(())
                })?;
                Ok(handlers::construct(tree, definition, &frame))
            }
            Entry::Query {
                select,
                table,
                base,
            } => {
                let NodeKind::Select { query, .. } = tree.kind(select) else {
                    return Ok(Value::None);
                };
                let mut kept = Vec::new();
                for row in 0..table.rows.len() {
                    let frame = handlers::row_frame(&base, &table, row);
                    let (keep, _) = self.within(frame, |this| this.evaluate_node(*query))?;
                    if keep.as_bool() == Some(true) {
                        kept.push(row);
                    }
                }
                Ok(handlers::selection(self.program, select, &table, &kept))
            }
        }
    }
}

impl<'p> Runtime<'p> for Interpreter<'p> {
    fn project(&self) -> &'p Project {
        self.project
    }

    fn program(&self) -> &'p Program {
        self.program
    }

    fn frame(&self) -> &Frame {
        &self.frame
    }

    fn frame_mut(&mut self) -> &mut Frame {
        &mut self.frame
    }

    fn streams(&self) -> &StreamState {
        &self.streams
    }

    fn streams_mut(&mut self) -> &mut StreamState {
        &mut self.streams
    }
}

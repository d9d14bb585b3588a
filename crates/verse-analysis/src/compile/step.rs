//! Execution steps.

use std::fmt;

use verse_core::NodeId;

/// What a step does. Offsets are relative: a step that jumps `n` moves the
/// program counter to `pc + 1 + n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Enter the evaluation of the step's node.
    Start,
    /// Finish the evaluation of the step's node, consuming the values its
    /// operands pushed.
    Finish,
    /// A node with no operands: start and finish at once.
    StartFinish,
    Jump(usize),
    /// Pop a condition; jump when it is not true.
    JumpIfFalse(usize),
    /// Jump without popping when the top value is the boolean `when`.
    ShortCircuit { when: bool, skip: usize },
    /// Jump when the step's reaction has no remembered value.
    JumpIfUnset(usize),
    /// Push the step's reaction's remembered value.
    Recall,
}

/// One unit of execution, tagged with the node it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Step {
    pub kind: StepKind,
    pub node: NodeId,
}

impl Step {
    pub fn new(kind: StepKind, node: NodeId) -> Self {
        Self { kind, node }
    }

    /// The relative jump offset, for jumping steps.
    pub fn offset(&self) -> Option<usize> {
        match self.kind {
            StepKind::Jump(n)
            | StepKind::JumpIfFalse(n)
            | StepKind::JumpIfUnset(n)
            | StepKind::ShortCircuit { skip: n, .. } => Some(n),
            StepKind::Start | StepKind::Finish | StepKind::StartFinish | StepKind::Recall => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StepKind::Start => write!(f, "start {}", self.node),
            StepKind::Finish => write!(f, "finish {}", self.node),
            StepKind::StartFinish => write!(f, "evaluate {}", self.node),
            StepKind::Jump(n) => write!(f, "jump +{n}"),
            StepKind::JumpIfFalse(n) => write!(f, "jump if false +{n}"),
            StepKind::ShortCircuit { when, skip } => write!(f, "short circuit on {when} +{skip}"),
            StepKind::JumpIfUnset(n) => write!(f, "jump if unset {} +{n}", self.node),
            StepKind::Recall => write!(f, "recall {}", self.node),
        }
    }
}

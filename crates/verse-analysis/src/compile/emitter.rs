//! Step emitter with forward-jump patching.

use verse_core::NodeId;

use super::step::{Step, StepKind};

/// A jump whose offset is filled in once its target is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpLabel(pub(crate) usize);

impl JumpLabel {
    /// Index of the jumping step.
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct StepEmitter {
    steps: Vec<Step>,
}

impl StepEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, kind: StepKind, node: NodeId) {
        self.steps.push(Step::new(kind, node));
    }

    /// Emit a jumping step with a placeholder offset.
    pub fn emit_jump(&mut self, kind: StepKind, node: NodeId) -> JumpLabel {
        let label = JumpLabel(self.steps.len());
        self.steps.push(Step::new(kind, node));
        label
    }

    /// Point a jump at the next step to be emitted.
    pub fn patch_jump(&mut self, label: JumpLabel) {
        let offset = self.steps.len() - label.0 - 1;
        let step = &mut self.steps[label.0];
        step.kind = match step.kind {
            StepKind::Jump(_) => StepKind::Jump(offset),
            StepKind::JumpIfFalse(_) => StepKind::JumpIfFalse(offset),
            StepKind::JumpIfUnset(_) => StepKind::JumpIfUnset(offset),
            StepKind::ShortCircuit { when, .. } => StepKind::ShortCircuit { when, skip: offset },
            other => other,
        };
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn finish(self) -> Vec<Step> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verse_core::TreeBuilder;

    #[test]
    fn patches_forward_jumps() {
        let mut b = TreeBuilder::new();
        let node = b.none();

        let mut emitter = StepEmitter::new();
        let jump = emitter.emit_jump(StepKind::JumpIfFalse(0), node);
        emitter.emit(StepKind::StartFinish, node);
        emitter.emit(StepKind::StartFinish, node);
        emitter.patch_jump(jump);
        emitter.emit(StepKind::Finish, node);

        let steps = emitter.finish();
        assert_eq!(steps[0].kind, StepKind::JumpIfFalse(2));
        // pc + 1 + 2 lands on the finish.
        assert_eq!(steps[3].kind, StepKind::Finish);
    }
}

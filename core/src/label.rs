use crate::op::OpIdx;

/// A branch target label within a translation block.
///
/// Maps to QEMU's `TCGLabel`. Labels support forward references:
/// branches can name a label before `set_label` places it. The
/// label records which ops branch to it and where it was placed
/// in the op stream.
#[derive(Debug, Clone)]
pub struct Label {
    pub id: u32,
    /// Whether this label has been placed (set_label emitted).
    pub present: bool,
    /// Index of the `set_label` op, once placed.
    pub position: Option<OpIdx>,
    /// Branch ops that target this label.
    pub uses: Vec<OpIdx>,
}

impl Label {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            present: false,
            position: None,
            uses: Vec::new(),
        }
    }

    /// Record a branch op referencing this label.
    pub fn add_use(&mut self, op: OpIdx) {
        self.uses.push(op);
    }

    /// Mark this label as placed at the given op.
    pub fn set_position(&mut self, op: OpIdx) {
        self.present = true;
        self.position = Some(op);
    }

    /// Whether there are branches to a label that was never placed.
    pub fn has_pending_uses(&self) -> bool {
        !self.uses.is_empty() && !self.present
    }
}

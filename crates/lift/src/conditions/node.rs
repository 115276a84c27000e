use rustc_hash::FxHashSet;

use cinder_bytecode::instruction::{is_constant, CompareKind, Instruction, InstructionKind};
use cinder_hir::relational::{swap_operands, RelationalExpression};
use cinder_hir::types::ResolvedValue;

use crate::stack::SymbolicStack;

/// Terminal content of a leaf node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafValue {
    Resolved(ResolvedValue),
    /// A branch whose successors were folded into its own statement.
    Terminated(RelationalExpression),
}

impl LeafValue {
    /// The operand this leaf contributes when folded into its parent.
    /// Booleans and `nil` contribute nothing of their own.
    pub fn operand(&self) -> Option<RelationalExpression> {
        match self {
            LeafValue::Resolved(ResolvedValue::Generic(text)) => {
                Some(RelationalExpression::leaf(text.clone()))
            }
            LeafValue::Resolved(_) => None,
            LeafValue::Terminated(statement) => Some(statement.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An unresolved test: go to `on_true` when `statement` holds.
    Branch {
        statement: RelationalExpression,
        on_true: usize,
        on_false: usize,
    },
    Leaf(LeafValue),
}

/// One decision point or resolved value in a condition graph.
///
/// Nodes are keyed by the PC their segment starts at; successor edges are
/// keys into the same table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionNode {
    pub pc: usize,
    pub kind: NodeKind,
    pub parents: FxHashSet<usize>,
    /// Destination register of a TESTSET.
    pub assigns: Option<u8>,
}

impl ConditionNode {
    pub fn branch(
        pc: usize,
        statement: RelationalExpression,
        on_true: usize,
        on_false: usize,
    ) -> Self {
        Self {
            pc,
            kind: NodeKind::Branch {
                statement,
                on_true,
                on_false,
            },
            parents: FxHashSet::default(),
            assigns: None,
        }
    }

    pub fn leaf(pc: usize, value: ResolvedValue) -> Self {
        Self {
            pc,
            kind: NodeKind::Leaf(LeafValue::Resolved(value)),
            parents: FxHashSet::default(),
            assigns: None,
        }
    }

    /// Build a branch from the conditional at `cond_pc` whose paired JMP
    /// lands on `jump_target`.
    ///
    /// Falling through past the JMP is the "true" path unless the polarity
    /// bit is set, in which case the taken jump is.
    pub fn from_conditional<S: SymbolicStack + ?Sized>(
        key: usize,
        cond_pc: usize,
        insn: &Instruction,
        jump_target: usize,
        stack: &S,
    ) -> Self {
        let text = match insn.kind() {
            InstructionKind::Comparator(kind) => {
                let lhs = stack.render_operand(insn.b, cond_pc);
                let rhs = stack.render_operand(insn.c, cond_pc);
                let op = match kind {
                    CompareKind::Eq => "==",
                    CompareKind::Lt => "<",
                    CompareKind::Le => "<=",
                };
                let text = format!("{} {} {}", lhs, op, rhs);
                if is_constant(insn.b) && !is_constant(insn.c) {
                    swap_operands(&text)
                } else {
                    text
                }
            }
            InstructionKind::TestSet => stack.render_operand(insn.b, cond_pc),
            _ => stack.render_operand(u16::from(insn.a), cond_pc),
        };

        let (mut on_true, mut on_false) = (cond_pc + 2, jump_target);
        if insn.polarity() {
            std::mem::swap(&mut on_true, &mut on_false);
        }

        let mut node = Self::branch(key, RelationalExpression::leaf(text), on_true, on_false);
        if insn.kind() == InstructionKind::TestSet {
            node.assigns = Some(insn.a);
        }
        node
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.kind, NodeKind::Branch { .. })
    }

    /// `(on_true, on_false)` of a branch.
    pub fn successors(&self) -> Option<(usize, usize)> {
        match self.kind {
            NodeKind::Branch {
                on_true, on_false, ..
            } => Some((on_true, on_false)),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn statement(&self) -> Option<&RelationalExpression> {
        match &self.kind {
            NodeKind::Branch { statement, .. } => Some(statement),
            NodeKind::Leaf(LeafValue::Terminated(statement)) => Some(statement),
            NodeKind::Leaf(LeafValue::Resolved(_)) => None,
        }
    }

    pub fn resolved(&self) -> Option<&ResolvedValue> {
        match &self.kind {
            NodeKind::Leaf(LeafValue::Resolved(value)) => Some(value),
            _ => None,
        }
    }

    /// The value of a `true`/`false` leaf.
    pub fn boolean(&self) -> Option<bool> {
        self.resolved().and_then(ResolvedValue::as_bool)
    }

    pub fn is_boolean_leaf(&self) -> bool {
        self.boolean().is_some()
    }

    /// Turn a branch into a leaf carrying its statement, dropping both
    /// successor edges. Leaves are left as they are.
    pub fn terminate(&mut self) {
        if let NodeKind::Branch { statement, .. } = &self.kind {
            self.kind = NodeKind::Leaf(LeafValue::Terminated(statement.clone()));
        }
    }
}

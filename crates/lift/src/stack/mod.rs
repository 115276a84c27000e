//! Symbolic execution of register writes.
//!
//! Condition recovery never evaluates anything. It only needs to know what
//! each register holds *as source text* at the point a comparison reads it,
//! and to be able to try a path and throw the effects away afterwards.

mod precedence;
mod register_stack;

use std::ops::{Deref, DerefMut};

use cinder_bytecode::instruction::Instruction;

use crate::error::ExecError;

pub use precedence::{logical_precedence, Precedence};
pub use register_stack::RegisterStack;

/// An assignment recognised at a SETTABLE / SETGLOBAL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Rendered destination: `x`, `t.field`, `t[k]`.
    pub target: String,
    /// Rendered value being stored.
    pub value: String,
    /// Register the value comes from; `None` when it is a constant.
    pub source: Option<u8>,
}

/// The stack interface consumed by the condition builder.
pub trait SymbolicStack {
    /// Apply the register effects of `insn`. Control flow is the caller's job.
    fn execute(&mut self, pc: usize, insn: &Instruction) -> Result<(), ExecError>;

    /// Snapshot the current register state.
    fn scope_push(&mut self);

    /// Restore the most recent snapshot.
    fn scope_pop(&mut self);

    /// Render an RK operand for use inside a comparison.
    fn render_operand(&self, rk: u16, pc: usize) -> String;

    /// Render a register as it would be named in source at `pc`.
    fn render_register(&self, reg: u8, pc: usize) -> String;

    /// Render the value held in a register, ignoring local names.
    fn render_value(&self, reg: u8, pc: usize) -> String;

    /// Register written by `insn`, if any.
    fn written_register(&self, insn: &Instruction) -> Option<u8> {
        insn.destination()
    }

    fn describe_assignment(&self, pc: usize, insn: &Instruction) -> Option<Assignment>;
}

/// RAII guard around `scope_push` / `scope_pop`.
///
/// Dereferences to the wrapped stack, so work done through the guard is
/// rolled back when it goes out of scope, on every exit path.
pub struct StackScope<'s, S: SymbolicStack + ?Sized> {
    stack: &'s mut S,
}

impl<'s, S: SymbolicStack + ?Sized> StackScope<'s, S> {
    pub fn new(stack: &'s mut S) -> Self {
        stack.scope_push();
        Self { stack }
    }
}

impl<S: SymbolicStack + ?Sized> Deref for StackScope<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.stack
    }
}

impl<S: SymbolicStack + ?Sized> DerefMut for StackScope<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.stack
    }
}

impl<S: SymbolicStack + ?Sized> Drop for StackScope<'_, S> {
    fn drop(&mut self) {
        self.stack.scope_pop();
    }
}

use cinder_bytecode::instruction::{Instruction, InstructionKind};
use cinder_hir::relational::RelationalExpression;
use cinder_hir::types::ResolvedValue;

use super::graph::ConditionGraph;
use super::node::ConditionNode;
use super::utils::{is_boolean_pair, is_permitted, paired_jump};
use super::{AnalysisOptions, Condition};
use crate::error::{ConditionError, InconclusiveReason};
use crate::stack::{StackScope, SymbolicStack};

/// Recovers the condition that starts at a given conditional instruction.
///
/// Everything the builder executes happens inside a [`StackScope`], so the
/// caller's stack is unchanged afterwards whatever the outcome.
pub struct ConditionGraphBuilder<'a, S: SymbolicStack + ?Sized> {
    instructions: &'a [Instruction],
    stack: &'a mut S,
    options: AnalysisOptions,
}

impl<'a, S: SymbolicStack + ?Sized> ConditionGraphBuilder<'a, S> {
    pub fn new(instructions: &'a [Instruction], stack: &'a mut S, options: AnalysisOptions) -> Self {
        Self {
            instructions,
            stack,
            options,
        }
    }

    /// `Ok(None)` when `start_pc` does not begin a condition.
    pub fn build(&mut self, start_pc: usize) -> Result<Option<Condition>, ConditionError> {
        let instructions = self.instructions;
        let options = self.options;
        let mut scope = StackScope::new(&mut *self.stack);

        let mut pass = Pass::new(start_pc);
        if !pass.scan(instructions, &mut *scope, options)? {
            return Ok(None);
        }
        pass.validate(options)?;
        pass.close(instructions, &mut *scope)?;
        pass.graph
            .reduce()
            .map_err(|reason| ConditionError::inconclusive(start_pc, reason))?;
        let statement = pass
            .graph
            .finalize()
            .map_err(|reason| ConditionError::inconclusive(start_pc, reason))?;
        Ok(Some(pass.report(instructions, &*scope, statement)))
    }
}

/// State of one analysis.
struct Pass {
    start_pc: usize,
    /// Value context: the consuming instruction. Predicate: the false exit.
    pc_end: Option<usize>,
    /// Predicate context: the true exit.
    non_assign_end: Option<usize>,
    assign: bool,
    /// PC right after the last conditional/JMP pair.
    last_pair_end: usize,
    target: Option<String>,
    testset_register: Option<u8>,
    graph: ConditionGraph,
}

impl Pass {
    fn new(start_pc: usize) -> Self {
        Self {
            start_pc,
            pc_end: None,
            non_assign_end: None,
            assign: false,
            last_pair_end: start_pc,
            target: None,
            testset_register: None,
            graph: ConditionGraph::new(start_pc),
        }
    }

    fn fail(&self, reason: impl Into<InconclusiveReason>) -> ConditionError {
        ConditionError::inconclusive(self.start_pc, reason)
    }

    /// Walk forward collecting conditional/JMP pairs. Returns whether any
    /// were found.
    fn scan<S: SymbolicStack + ?Sized>(
        &mut self,
        instructions: &[Instruction],
        stack: &mut S,
        options: AnalysisOptions,
    ) -> Result<bool, ConditionError> {
        let mut pc = self.start_pc;
        // Each node is keyed by where its segment starts: the first at the
        // start PC, later ones right after the previous pair.
        let mut key = self.start_pc;
        while let Some(insn) = instructions.get(pc) {
            match insn.kind() {
                InstructionKind::Comparator(_) | InstructionKind::Test | InstructionKind::TestSet => {
                    let Some(target) = paired_jump(instructions, pc) else {
                        if self.graph.is_empty() {
                            return Err(self.fail(InconclusiveReason::MissingJump { pc }));
                        }
                        break;
                    };
                    if target <= pc + 1 && !options.in_sub_loop {
                        // A loop condition; it belongs to the loop, not to us.
                        break;
                    }
                    let node = ConditionNode::from_conditional(key, pc, insn, target, &*stack);
                    if let Some(reg) = node.assigns {
                        self.testset_register.get_or_insert(reg);
                    }
                    self.graph.insert(node);
                    pc += 2;
                    key = pc;
                    self.last_pair_end = pc;
                }
                InstructionKind::TableAssign | InstructionKind::GlobalAssign => {
                    self.pc_end = Some(pc);
                    self.assign = true;
                    break;
                }
                InstructionKind::BooleanLoad if is_boolean_pair(instructions, pc) => {
                    self.pc_end = Some(pc + 2);
                    self.assign = true;
                    break;
                }
                InstructionKind::Jump => pc += 1,
                _ if is_permitted(insn) => {
                    stack.execute(pc, insn).map_err(|e| self.fail(e))?;
                    pc += 1;
                }
                _ => break,
            }
        }
        Ok(!self.graph.is_empty())
    }

    /// Decide between value and predicate context and fix the exits.
    fn validate(&mut self, options: AnalysisOptions) -> Result<(), ConditionError> {
        let targets = self.graph.targets();
        let start = self.start_pc;
        let predicate = match self.pc_end {
            None => true,
            Some(end) => targets.iter().any(|&t| t > end || t < start),
        };
        if !predicate {
            return Ok(());
        }

        self.assign = false;
        let external: Vec<usize> = targets
            .into_iter()
            .filter(|&t| !self.graph.contains(t))
            .collect();
        let (if_index, else_index) = match external.as_slice() {
            &[first, second] => (first, second),
            many if many.len() > 2 => {
                return Err(self.fail(InconclusiveReason::TooManyTargets(many.len())))
            }
            few => return Err(self.fail(InconclusiveReason::TooFewTargets(few.len()))),
        };

        if options.in_sub_loop && else_index < start {
            log::warn!(
                "loop condition at pc {} exits backwards on both paths ({}, {})",
                start,
                if_index,
                else_index
            );
            return Err(self.fail(InconclusiveReason::UnverifiedLoopShape));
        }
        if options.in_sub_loop && if_index < start {
            // `until`: jumping back repeats the loop, so the backward target
            // is the false exit.
            self.non_assign_end = Some(else_index);
            self.pc_end = Some(if_index);
        } else {
            self.non_assign_end = Some(if_index);
            self.pc_end = Some(else_index);
        }
        Ok(())
    }

    /// Add a leaf for every target that is not a node yet.
    fn close<S: SymbolicStack + ?Sized>(
        &mut self,
        instructions: &[Instruction],
        stack: &mut S,
    ) -> Result<(), ConditionError> {
        for target in self.graph.targets() {
            if self.graph.contains(target) {
                continue;
            }
            let value = if self.assign {
                self.value_leaf(instructions, stack, target)?
            } else {
                self.predicate_leaf(target)?
            };
            self.graph.insert(ConditionNode::leaf(target, value));
        }
        self.graph.link_parents();
        Ok(())
    }

    fn predicate_leaf(&self, pc: usize) -> Result<ResolvedValue, ConditionError> {
        if Some(pc) == self.non_assign_end {
            Ok(ResolvedValue::BooleanTrue)
        } else if Some(pc) == self.pc_end {
            Ok(ResolvedValue::BooleanFalse)
        } else {
            Err(self.fail(InconclusiveReason::UnresolvableLeaf { pc }))
        }
    }

    /// Follow the path from `start` until it stores or reaches the end of
    /// the condition, and report the value it produced.
    fn value_leaf<S: SymbolicStack + ?Sized>(
        &mut self,
        instructions: &[Instruction],
        stack: &mut S,
        start: usize,
    ) -> Result<ResolvedValue, ConditionError> {
        let mut scope = StackScope::new(stack);
        let start_pc = self.start_pc;
        let unresolvable = move || {
            ConditionError::inconclusive(start_pc, InconclusiveReason::UnresolvableLeaf { pc: start })
        };

        let mut written: Option<u8> = None;
        let mut pc = start;
        loop {
            if Some(pc) == self.pc_end || Some(pc) == self.non_assign_end {
                break;
            }
            let insn = instructions.get(pc).ok_or_else(unresolvable)?;
            match insn.kind() {
                InstructionKind::TableAssign | InstructionKind::GlobalAssign => {
                    let assignment = scope
                        .describe_assignment(pc, insn)
                        .ok_or_else(unresolvable)?;
                    self.record_target(assignment.target)?;
                    let value = match (written, assignment.source) {
                        (None, _) => ResolvedValue::Nil,
                        (Some(_), Some(source)) => {
                            self.written_value(instructions, start, scope.render_value(source, pc))
                        }
                        (Some(_), None) => self.written_value(instructions, start, assignment.value),
                    };
                    return Ok(value);
                }
                InstructionKind::BooleanLoad => {
                    scope.execute(pc, insn).map_err(|e| self.fail(e))?;
                    written = Some(insn.a);
                    pc += if insn.c != 0 { 2 } else { 1 };
                }
                InstructionKind::Jump => match insn.jump_target(pc) {
                    Some(target) if target > pc => pc = target,
                    _ => return Err(unresolvable()),
                },
                _ if is_permitted(insn) => {
                    scope.execute(pc, insn).map_err(|e| self.fail(e))?;
                    if let Some(reg) = scope.written_register(insn) {
                        written = Some(reg);
                    }
                    pc += 1;
                }
                _ => return Err(unresolvable()),
            }
        }

        Ok(match written {
            Some(reg) => self.written_value(instructions, start, scope.render_value(reg, pc)),
            None => ResolvedValue::Nil,
        })
    }

    /// Value of a leaf path that wrote `text`. Only the terminal LOADBOOL
    /// pair yields bare booleans; a literal written anywhere else is an
    /// operand of the expression (`a and false`).
    fn written_value(&self, instructions: &[Instruction], start: usize, text: String) -> ResolvedValue {
        let in_terminal_pair = match self.pc_end {
            Some(end) if end >= 2 && is_boolean_pair(instructions, end - 2) => {
                (end - 2..end).contains(&start)
            }
            _ => false,
        };
        match ResolvedValue::from_literal(&text) {
            ResolvedValue::BooleanTrue | ResolvedValue::BooleanFalse if !in_terminal_pair => {
                ResolvedValue::Generic(text)
            }
            value => value,
        }
    }

    fn record_target(&mut self, target: String) -> Result<(), ConditionError> {
        match &self.target {
            Some(first) if *first != target => Err(ConditionError::ConflictingAssignmentTarget {
                first: first.clone(),
                second: target,
            }),
            Some(_) => Ok(()),
            None => {
                self.target = Some(target);
                Ok(())
            }
        }
    }

    fn report<S: SymbolicStack + ?Sized>(
        self,
        instructions: &[Instruction],
        stack: &S,
        statement: RelationalExpression,
    ) -> Condition {
        let end_pc = self.pc_end.unwrap_or(self.last_pair_end);
        if !self.assign {
            return Condition {
                start_pc: self.start_pc,
                end_pc,
                body_pc: self.non_assign_end,
                resume_pc: self.last_pair_end,
                statement,
                is_value_context: false,
                target: None,
                result_register: None,
            };
        }

        let mut target = self.target;
        let mut result_register = if end_pc >= 2 && is_boolean_pair(instructions, end_pc - 2) {
            Some(instructions[end_pc - 2].a)
        } else {
            self.testset_register
        };
        let assignment = instructions
            .get(end_pc)
            .and_then(|insn| stack.describe_assignment(end_pc, insn));
        if let Some(assignment) = assignment {
            if target.is_none() && (result_register.is_none() || result_register == assignment.source) {
                target = Some(assignment.target);
            }
            result_register = result_register.or(assignment.source);
        }

        Condition {
            start_pc: self.start_pc,
            end_pc,
            body_pc: None,
            resume_pc: end_pc,
            statement,
            is_value_context: true,
            target,
            result_register,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_bytecode::constant::Constant;
    use cinder_bytecode::function::Function;
    use cinder_bytecode::opcode::OpCode;
    use cinder_bytecode::scope_tree::{LocalScope, ScopeTree};

    use crate::conditions::ConditionOutcome;
    use crate::error::ExecError;
    use crate::stack::RegisterStack;

    const K: u16 = 256;

    fn k(s: &str) -> Constant {
        Constant::String(s.as_bytes().to_vec())
    }

    fn n(v: f64) -> Constant {
        Constant::Number(v)
    }

    fn jmp(pc: usize, target: usize) -> Instruction {
        Instruction::asbx(OpCode::Jmp, 0, target as i32 - pc as i32 - 1)
    }

    fn getglobal(reg: u8, k: u32) -> Instruction {
        Instruction::abx(OpCode::GetGlobal, reg, k)
    }

    fn setglobal(reg: u8, k: u32) -> Instruction {
        Instruction::abx(OpCode::SetGlobal, reg, k)
    }

    fn ret() -> Instruction {
        Instruction::abc(OpCode::Return, 0, 1, 0)
    }

    /// Run everything before `start` on a fresh stack, then analyse at
    /// `start`, checking the stack comes back balanced and unchanged.
    fn analyse(
        func: &Function,
        start: usize,
        in_sub_loop: bool,
    ) -> Result<Option<Condition>, ConditionError> {
        let mut stack = RegisterStack::new(func);
        for (pc, insn) in func.instructions[..start].iter().enumerate() {
            stack.execute(pc, insn).unwrap();
        }
        let before: Vec<String> = (0..4).map(|r| stack.render_value(r, start)).collect();

        let result = ConditionGraphBuilder::new(
            &func.instructions,
            &mut stack,
            AnalysisOptions { in_sub_loop },
        )
        .build(start);

        assert_eq!(stack.depth(), 0);
        let after: Vec<String> = (0..4).map(|r| stack.render_value(r, start)).collect();
        assert_eq!(before, after);
        result
    }

    fn recovered(func: &Function, start: usize) -> Condition {
        analyse(func, start, false).unwrap().unwrap()
    }

    #[test]
    fn test_and_as_value() {
        // x = a == 1 and b == 2
        let func = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Eq, 0, 0, K + 1),
                jmp(2, 6),
                getglobal(1, 2),
                Instruction::abc(OpCode::Eq, 1, 1, K + 3),
                jmp(5, 7),
                Instruction::abc(OpCode::LoadBool, 0, 0, 1),
                Instruction::abc(OpCode::LoadBool, 0, 1, 0),
                setglobal(0, 4),
                ret(),
            ],
            vec![k("a"), n(1.0), k("b"), n(2.0), k("x")],
        );
        let cond = recovered(&func, 1);
        insta::assert_snapshot!(cond.statement, @"a == 1 and b == 2");
        assert!(cond.is_value_context);
        assert_eq!(cond.start_pc, 1);
        assert_eq!(cond.end_pc, 8);
        assert_eq!(cond.resume_pc, 8);
        assert_eq!(cond.body_pc, None);
        assert_eq!(cond.target.as_deref(), Some("x"));
        assert_eq!(cond.result_register, Some(0));

        let outcome = cond.outcome();
        assert!(outcome.consumed);
        assert_eq!(outcome.span, 7);
        assert_eq!(outcome.statement_text, "a == 1 and b == 2");
        assert_eq!(outcome.inferred_target.as_deref(), Some("x"));
    }

    #[test]
    fn test_or_as_value() {
        // x = a == 1 or b == 2
        let func = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Eq, 1, 0, K + 1),
                jmp(2, 7),
                getglobal(0, 2),
                Instruction::abc(OpCode::Eq, 1, 0, K + 3),
                jmp(5, 7),
                Instruction::abc(OpCode::LoadBool, 0, 0, 1),
                Instruction::abc(OpCode::LoadBool, 0, 1, 0),
                setglobal(0, 4),
            ],
            vec![k("a"), n(1.0), k("b"), n(2.0), k("x")],
        );
        let cond = recovered(&func, 1);
        insta::assert_snapshot!(cond.statement, @"a == 1 or b == 2");
        assert_eq!(cond.end_pc, 8);
    }

    #[test]
    fn test_single_comparison_is_reversed() {
        // x = a ~= 1
        let func = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Eq, 0, 0, K + 1),
                jmp(2, 4),
                Instruction::abc(OpCode::LoadBool, 0, 0, 1),
                Instruction::abc(OpCode::LoadBool, 0, 1, 0),
                setglobal(0, 2),
            ],
            vec![k("a"), n(1.0), k("x")],
        );
        let cond = recovered(&func, 1);
        insta::assert_snapshot!(cond.statement, @"a ~= 1");
        assert_eq!(cond.end_pc, 5);
        assert_eq!(cond.target.as_deref(), Some("x"));
    }

    #[test]
    fn test_value_context_switches_to_predicate() {
        // if a == 1 and b == 2 then x = 5 end
        let func = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Eq, 0, 0, K + 1),
                jmp(2, 8),
                getglobal(0, 2),
                Instruction::abc(OpCode::Eq, 0, 0, K + 3),
                jmp(5, 8),
                Instruction::abx(OpCode::LoadK, 0, 5),
                setglobal(0, 4),
                ret(),
            ],
            vec![k("a"), n(1.0), k("b"), n(2.0), k("x"), n(5.0)],
        );
        let cond = recovered(&func, 1);
        insta::assert_snapshot!(cond.statement, @"a == 1 and b == 2");
        assert!(!cond.is_value_context);
        assert_eq!(cond.body_pc, Some(6));
        assert_eq!(cond.end_pc, 8);
        assert_eq!(cond.resume_pc, 6);
        assert_eq!(cond.target, None);
        assert_eq!(cond.result_register, None);
    }

    #[test]
    fn test_while_predicate() {
        // while a < 10 do f() end
        let func = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Lt, 0, 0, K + 1),
                jmp(2, 6),
                getglobal(0, 2),
                Instruction::abc(OpCode::Call, 0, 1, 1),
                jmp(5, 0),
                ret(),
            ],
            vec![k("a"), n(10.0), k("f")],
        );
        let cond = recovered(&func, 1);
        insta::assert_snapshot!(cond.statement, @"a < 10");
        assert_eq!(cond.body_pc, Some(3));
        assert_eq!(cond.end_pc, 6);
    }

    #[test]
    fn test_truthiness_chains_as_value() {
        // x = a and b
        let and = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Test, 0, 0, 0),
                jmp(2, 4),
                getglobal(0, 1),
                setglobal(0, 2),
            ],
            vec![k("a"), k("b"), k("x")],
        );
        let cond = recovered(&and, 1);
        insta::assert_snapshot!(cond.statement, @"a and b");
        assert_eq!(cond.end_pc, 4);
        assert_eq!(cond.target.as_deref(), Some("x"));
        assert_eq!(cond.result_register, Some(0));

        // x = a or b
        let or = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Test, 0, 0, 1),
                jmp(2, 4),
                getglobal(0, 1),
                setglobal(0, 2),
            ],
            vec![k("a"), k("b"), k("x")],
        );
        insta::assert_snapshot!(recovered(&or, 1).statement, @"a or b");
    }

    #[test]
    fn test_testset_with_local_operand() {
        // local a = ...; x = a and b
        let mut func = Function::new(
            vec![
                Instruction::abc(OpCode::TestSet, 1, 0, 0),
                jmp(1, 3),
                getglobal(1, 0),
                setglobal(1, 1),
            ],
            vec![k("b"), k("x")],
        );
        func.debug.scopes = ScopeTree::new(vec![LocalScope {
            name: "a".into(),
            pc_range: 0..5,
        }]);
        let cond = recovered(&func, 0);
        insta::assert_snapshot!(cond.statement, @"a and b");
        assert_eq!(cond.result_register, Some(1));
        assert_eq!(cond.target.as_deref(), Some("x"));
    }

    #[test]
    fn test_and_or_value() {
        // x = a and b or c
        let func = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Test, 0, 0, 0),
                jmp(2, 6),
                getglobal(0, 1),
                Instruction::abc(OpCode::Test, 0, 0, 1),
                jmp(5, 7),
                getglobal(0, 2),
                setglobal(0, 3),
            ],
            vec![k("a"), k("b"), k("c"), k("x")],
        );
        let cond = recovered(&func, 1);
        insta::assert_snapshot!(cond.statement, @"(a and b) or c");
        assert_eq!(cond.end_pc, 7);
    }

    #[test]
    fn test_mixed_chain_as_value() {
        // x = (a == 1 or b == 2) and c == 3
        let func = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Eq, 1, 0, K + 1),
                jmp(2, 6),
                getglobal(0, 2),
                Instruction::abc(OpCode::Eq, 0, 0, K + 3),
                jmp(5, 9),
                getglobal(0, 4),
                Instruction::abc(OpCode::Eq, 1, 0, K + 5),
                jmp(8, 10),
                Instruction::abc(OpCode::LoadBool, 0, 0, 1),
                Instruction::abc(OpCode::LoadBool, 0, 1, 0),
                setglobal(0, 6),
            ],
            vec![k("a"), n(1.0), k("b"), n(2.0), k("c"), n(3.0), k("x")],
        );
        let cond = recovered(&func, 1);
        insta::assert_snapshot!(cond.statement, @"(a == 1 or b == 2) and c == 3");
        assert_eq!(cond.end_pc, 11);
    }

    #[test]
    fn test_repeat_until_condition() {
        // repeat f() until a == 1 and b == 2
        let func = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Call, 0, 1, 1),
                getglobal(0, 1),
                Instruction::abc(OpCode::Eq, 0, 0, K + 2),
                jmp(4, 0),
                getglobal(0, 3),
                Instruction::abc(OpCode::Eq, 0, 0, K + 4),
                jmp(7, 0),
                ret(),
            ],
            vec![k("f"), k("a"), n(1.0), k("b"), n(2.0)],
        );

        // Without the loop flag the backward jump ends the scan at once.
        assert_eq!(analyse(&func, 3, false), Ok(None));

        let cond = analyse(&func, 3, true).unwrap().unwrap();
        insta::assert_snapshot!(cond.statement, @"a == 1 and b == 2");
        assert_eq!(cond.body_pc, Some(8));
        assert_eq!(cond.end_pc, 0);
        assert_eq!(cond.resume_pc, 8);
    }

    #[test]
    fn test_too_many_targets() {
        let func = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Eq, 0, 0, K + 1),
                jmp(2, 10),
                getglobal(0, 0),
                Instruction::abc(OpCode::Eq, 0, 0, K + 1),
                jmp(5, 9),
                ret(),
            ],
            vec![k("a"), n(1.0)],
        );
        assert_eq!(
            analyse(&func, 1, false),
            Err(ConditionError::Inconclusive {
                start_pc: 1,
                reason: InconclusiveReason::TooManyTargets(3),
            })
        );
    }

    #[test]
    fn test_too_few_targets() {
        let func = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Eq, 0, 0, K + 1),
                jmp(2, 6),
                getglobal(0, 0),
                Instruction::abc(OpCode::Eq, 1, 0, K + 1),
                jmp(5, 6),
                ret(),
            ],
            vec![k("a"), n(1.0)],
        );
        assert_eq!(
            analyse(&func, 1, false),
            Err(ConditionError::Inconclusive {
                start_pc: 1,
                reason: InconclusiveReason::TooFewTargets(1),
            })
        );
    }

    #[test]
    fn test_missing_jump() {
        let func = Function::new(
            vec![Instruction::abc(OpCode::Eq, 0, 0, K), ret()],
            vec![n(1.0)],
        );
        assert_eq!(
            analyse(&func, 0, false),
            Err(ConditionError::Inconclusive {
                start_pc: 0,
                reason: InconclusiveReason::MissingJump { pc: 0 },
            })
        );
    }

    #[test]
    fn test_conflicting_targets() {
        let func = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Test, 0, 0, 0),
                jmp(2, 5),
                getglobal(0, 1),
                jmp(4, 8),
                getglobal(0, 2),
                jmp(6, 9),
                setglobal(0, 3),
                setglobal(0, 4),
                setglobal(0, 5),
            ],
            vec![k("a"), k("b"), k("c"), k("x"), k("y"), k("z")],
        );
        assert_eq!(
            analyse(&func, 1, false),
            Err(ConditionError::ConflictingAssignmentTarget {
                first: "y".into(),
                second: "z".into(),
            })
        );
    }

    #[test]
    fn test_boolean_literal_operand() {
        // x = a and false
        let func = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Test, 0, 0, 0),
                jmp(2, 4),
                Instruction::abc(OpCode::LoadBool, 0, 0, 0),
                setglobal(0, 1),
            ],
            vec![k("a"), k("x")],
        );
        let cond = recovered(&func, 1);
        insta::assert_snapshot!(cond.statement, @"a and false");
        assert!(cond.is_value_context);
        assert_eq!(cond.end_pc, 4);
        assert_eq!(cond.target.as_deref(), Some("x"));
        assert_eq!(cond.result_register, Some(0));
    }

    #[test]
    fn test_execution_failure_rolls_back() {
        // x = a and <K99>, the constant table holding only two entries
        let func = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Test, 0, 0, 0),
                jmp(2, 4),
                Instruction::abx(OpCode::LoadK, 0, 99),
                setglobal(0, 1),
            ],
            vec![k("a"), k("x")],
        );
        assert_eq!(
            analyse(&func, 1, false),
            Err(ConditionError::Inconclusive {
                start_pc: 1,
                reason: InconclusiveReason::Execution(ExecError::ConstantOutOfRange {
                    index: 99,
                    pc: 3,
                }),
            })
        );
    }

    #[test]
    fn test_unresolvable_leaf_path() {
        // The true path jumps past the store into a closure.
        let func = Function::new(
            vec![
                getglobal(0, 0),
                Instruction::abc(OpCode::Test, 0, 0, 0),
                jmp(2, 5),
                getglobal(0, 1),
                jmp(4, 7),
                getglobal(0, 2),
                setglobal(0, 3),
                Instruction::abx(OpCode::Closure, 0, 0),
                setglobal(0, 3),
            ],
            vec![k("a"), k("b"), k("c"), k("x")],
        );
        assert_eq!(
            analyse(&func, 1, false),
            Err(ConditionError::Inconclusive {
                start_pc: 1,
                reason: InconclusiveReason::UnresolvableLeaf { pc: 3 },
            })
        );
    }

    #[test]
    fn test_non_conditional_start() {
        let func = Function::new(vec![getglobal(0, 0), ret()], vec![k("a")]);
        let result = analyse(&func, 0, false);
        assert_eq!(result, Ok(None));

        let outcome = ConditionOutcome::from_result(0, &result);
        assert!(!outcome.consumed);
        assert_eq!(outcome.end_pc, 0);
        assert_eq!(outcome.statement_text, "");
    }
}

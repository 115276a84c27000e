use cinder_bytecode::constant::Constant;
use cinder_bytecode::function::Function;
use cinder_bytecode::instruction::{constant_index, is_constant, Instruction};
use cinder_bytecode::opcode::OpCode;

use super::precedence::{arith_operator, is_right_assoc, wrap, Precedence};
use super::{Assignment, SymbolicStack};
use crate::error::ExecError;

const REGISTER_COUNT: usize = 256;

#[derive(Debug, Clone)]
struct Slot {
    text: String,
    prec: Precedence,
    /// Set by SELF: the text is `obj:method` and the next CALL drops its
    /// first argument.
    is_method: bool,
}

/// Register file of one function, holding rendered source text per slot.
pub struct RegisterStack<'f> {
    func: &'f Function,
    slots: Vec<Option<Slot>>,
    saved: Vec<Vec<Option<Slot>>>,
}

impl<'f> RegisterStack<'f> {
    pub fn new(func: &'f Function) -> Self {
        Self {
            func,
            slots: vec![None; REGISTER_COUNT],
            saved: Vec::new(),
        }
    }

    /// Bind `reg` to already-rendered text, e.g. a recovered condition.
    pub fn define(&mut self, reg: u8, text: impl Into<String>, prec: Precedence) {
        self.set(reg, text.into(), prec);
    }

    /// Drop whatever `reg` holds; it renders as `r{reg}` again.
    pub fn forget(&mut self, reg: u8) {
        self.slots[reg as usize] = None;
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    fn set(&mut self, reg: u8, text: String, prec: Precedence) {
        self.slots[reg as usize] = Some(Slot {
            text,
            prec,
            is_method: false,
        });
    }

    fn constant(&self, index: usize, pc: usize) -> Result<&Constant, ExecError> {
        self.func
            .constants
            .get(index)
            .ok_or(ExecError::ConstantOutOfRange { index, pc })
    }

    /// Register text: the debug name of a live local, else the slot text.
    fn operand(&self, reg: u8, pc: usize) -> (String, Precedence) {
        if let Some(name) = self.func.debug.scopes.lookup(reg, pc) {
            return (name.to_string(), Precedence::ATOM);
        }
        self.slot_text(reg)
    }

    fn slot_text(&self, reg: u8) -> (String, Precedence) {
        match &self.slots[reg as usize] {
            Some(slot) => (slot.text.clone(), slot.prec),
            None => (format!("r{}", reg), Precedence::ATOM),
        }
    }

    fn rk(&self, rk: u16, pc: usize) -> Result<(String, Precedence), ExecError> {
        if is_constant(rk) {
            let text = self.constant(constant_index(rk), pc)?.to_lua();
            let prec = if text.starts_with('-') {
                Precedence::UNARY
            } else {
                Precedence::ATOM
            };
            Ok((text, prec))
        } else {
            Ok(self.operand(rk as u8, pc))
        }
    }

    /// `t.name` for identifier keys, `t[k]` otherwise.
    fn index(&self, table: (String, Precedence), key: u16, pc: usize) -> Result<String, ExecError> {
        let table = wrap(&table.0, table.1, Precedence::POSTFIX);
        if is_constant(key) {
            let constant = self.constant(constant_index(key), pc)?;
            if constant.is_identifier() {
                if let Some(name) = constant.as_str() {
                    return Ok(format!("{}.{}", table, name));
                }
            }
        }
        let (key, _) = self.rk(key, pc)?;
        Ok(format!("{}[{}]", table, key))
    }

    fn global_name(&self, bx: u32, pc: usize) -> Result<String, ExecError> {
        let constant = self.constant(bx as usize, pc)?;
        match constant.as_str() {
            Some(name) if constant.is_identifier() => Ok(name),
            _ => Ok(format!("_G[{}]", constant.to_lua())),
        }
    }

    fn binary(&mut self, insn: &Instruction, pc: usize) -> Result<(), ExecError> {
        let Some((token, prec)) = arith_operator(insn.op) else {
            return Err(ExecError::Unsupported { op: insn.op, pc });
        };
        let (lhs, lp) = self.rk(insn.b, pc)?;
        let (rhs, rp) = self.rk(insn.c, pc)?;
        let tighter = Precedence(prec.0 + 1);
        let (left_min, right_min) = if is_right_assoc(prec) {
            (tighter, prec)
        } else {
            (prec, tighter)
        };
        let text = format!(
            "{} {} {}",
            wrap(&lhs, lp, left_min),
            token,
            wrap(&rhs, rp, right_min)
        );
        self.set(insn.a, text, prec);
        Ok(())
    }

    fn unary(&mut self, insn: &Instruction, pc: usize, token: &str) {
        let (operand, prec) = self.operand(insn.b as u8, pc);
        let operand = wrap(&operand, prec, Precedence::UNARY);
        // `- -x` must not collapse into a comment.
        let sep = if token == "-" && operand.starts_with('-') { " " } else { "" };
        self.set(insn.a, format!("{}{}{}", token, sep, operand), Precedence::UNARY);
    }

    fn concat(&mut self, insn: &Instruction, pc: usize) {
        let min = Precedence(Precedence::CONCAT.0 + 1);
        let parts: Vec<String> = (insn.b..=insn.c)
            .map(|reg| {
                let (text, prec) = self.operand(reg as u8, pc);
                wrap(&text, prec, min)
            })
            .collect();
        self.set(insn.a, parts.join(" .. "), Precedence::CONCAT);
    }

    fn call(&mut self, insn: &Instruction, pc: usize) {
        let base = insn.a as usize;
        let (callee, is_method) = match &self.slots[base] {
            Some(slot) => (wrap(&slot.text, slot.prec, Precedence::POSTFIX), slot.is_method),
            None => (self.operand(insn.a, pc).0, false),
        };
        let last_arg = if insn.b == 0 {
            // Multiple results from a previous call or vararg: take every
            // populated register above the callee.
            (base + 1..REGISTER_COUNT)
                .take_while(|&r| self.slots[r].is_some())
                .last()
                .unwrap_or(base)
        } else {
            base + insn.b as usize - 1
        };
        let first_arg = if is_method { base + 2 } else { base + 1 };
        let args: Vec<String> = (first_arg..=last_arg.min(REGISTER_COUNT - 1))
            .map(|r| self.operand(r as u8, pc).0)
            .collect();
        let text = format!("{}({})", callee, args.join(", "));

        for r in base..=last_arg.min(REGISTER_COUNT - 1) {
            self.slots[r] = None;
        }
        if insn.c != 1 {
            self.set(insn.a, text, Precedence::ATOM);
        }
    }

    fn method(&mut self, insn: &Instruction, pc: usize) -> Result<(), ExecError> {
        let object = self.operand(insn.b as u8, pc);
        let name = if is_constant(insn.c) {
            self.constant(constant_index(insn.c), pc)?.as_str()
        } else {
            None
        };
        let self_reg = insn.a.wrapping_add(1);
        self.set(self_reg, object.0.clone(), object.1);
        match name {
            Some(name) => {
                let text = format!("{}:{}", wrap(&object.0, object.1, Precedence::POSTFIX), name);
                self.slots[insn.a as usize] = Some(Slot {
                    text,
                    prec: Precedence::POSTFIX,
                    is_method: true,
                });
            }
            None => {
                let text = self.index(object, insn.c, pc)?;
                self.set(insn.a, text, Precedence::POSTFIX);
            }
        }
        Ok(())
    }
}

impl SymbolicStack for RegisterStack<'_> {
    fn execute(&mut self, pc: usize, insn: &Instruction) -> Result<(), ExecError> {
        let a = insn.a;
        match insn.op {
            OpCode::Move => {
                let (text, prec) = self.operand(insn.b as u8, pc);
                self.set(a, text, prec);
            }
            OpCode::LoadK => {
                let text = self.constant(insn.bx as usize, pc)?.to_lua();
                let prec = if text.starts_with('-') {
                    Precedence::UNARY
                } else {
                    Precedence::ATOM
                };
                self.set(a, text, prec);
            }
            OpCode::LoadBool => {
                let text = if insn.b != 0 { "true" } else { "false" };
                self.set(a, text.to_string(), Precedence::ATOM);
            }
            OpCode::LoadNil => {
                for reg in a..=(insn.b as u8).max(a) {
                    self.set(reg, "nil".to_string(), Precedence::ATOM);
                }
            }
            OpCode::GetUpval => {
                let name = self
                    .func
                    .debug
                    .upvalue_names
                    .get(insn.b as usize)
                    .cloned()
                    .unwrap_or_else(|| format!("upvalue{}", insn.b));
                self.set(a, name, Precedence::ATOM);
            }
            OpCode::GetGlobal => {
                let name = self.global_name(insn.bx, pc)?;
                self.set(a, name, Precedence::ATOM);
            }
            OpCode::GetTable => {
                let table = self.operand(insn.b as u8, pc);
                let text = self.index(table, insn.c, pc)?;
                self.set(a, text, Precedence::POSTFIX);
            }
            OpCode::NewTable => self.set(a, "{}".to_string(), Precedence::ATOM),
            OpCode::SelfOp => self.method(insn, pc)?,
            OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Mod
            | OpCode::Pow => self.binary(insn, pc)?,
            OpCode::Unm => self.unary(insn, pc, "-"),
            OpCode::Not => self.unary(insn, pc, "not "),
            OpCode::Len => self.unary(insn, pc, "#"),
            OpCode::Concat => self.concat(insn, pc),
            OpCode::TestSet => {
                let (text, prec) = self.operand(insn.b as u8, pc);
                self.set(a, text, prec);
            }
            OpCode::Call => self.call(insn, pc),
            OpCode::VarArg => self.set(a, "...".to_string(), Precedence::ATOM),
            // Stores, comparisons and plain control flow leave registers alone.
            OpCode::SetGlobal
            | OpCode::SetUpval
            | OpCode::SetTable
            | OpCode::SetList
            | OpCode::Close
            | OpCode::Jmp
            | OpCode::Eq
            | OpCode::Lt
            | OpCode::Le
            | OpCode::Test
            | OpCode::TailCall
            | OpCode::Return => {}
            OpCode::ForLoop | OpCode::ForPrep | OpCode::TForLoop | OpCode::Closure => {
                return Err(ExecError::Unsupported { op: insn.op, pc });
            }
        }
        Ok(())
    }

    fn scope_push(&mut self) {
        self.saved.push(self.slots.clone());
    }

    fn scope_pop(&mut self) {
        if let Some(slots) = self.saved.pop() {
            self.slots = slots;
        }
    }

    fn render_operand(&self, rk: u16, pc: usize) -> String {
        match self.rk(rk, pc) {
            Ok((text, prec)) => wrap(&text, prec, Precedence(Precedence::COMPARE.0 + 1)),
            Err(_) => format!("K{}", constant_index(rk)),
        }
    }

    fn render_register(&self, reg: u8, pc: usize) -> String {
        self.operand(reg, pc).0
    }

    fn render_value(&self, reg: u8, _pc: usize) -> String {
        let (text, prec) = self.slot_text(reg);
        wrap(&text, prec, Precedence(Precedence::COMPARE.0 + 1))
    }

    fn describe_assignment(&self, pc: usize, insn: &Instruction) -> Option<Assignment> {
        match insn.op {
            OpCode::SetGlobal => Some(Assignment {
                target: self.global_name(insn.bx, pc).ok()?,
                value: self.operand(insn.a, pc).0,
                source: Some(insn.a),
            }),
            OpCode::SetTable => {
                let table = self.operand(insn.a, pc);
                Some(Assignment {
                    target: self.index(table, insn.b, pc).ok()?,
                    value: self.rk(insn.c, pc).ok()?.0,
                    source: (!is_constant(insn.c)).then_some(insn.c as u8),
                })
            }
            _ => None,
        }
    }
}

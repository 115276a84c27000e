use std::ops::Range;

/// A local variable scope from bytecode debug info.
#[derive(Debug, Clone)]
pub struct LocalScope {
    pub name: String,
    /// PC range where this variable is in scope: [start, end).
    pub pc_range: Range<usize>,
}

/// Register-to-variable-name lookup.
///
/// Lua 5.1 debug info does not record registers: the n-th local active at
/// a PC (in declaration order) lives in register n. Scopes are therefore
/// kept in declaration order and never re-sorted.
#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<LocalScope>,
}

impl ScopeTree {
    /// Build a ScopeTree from debug info entries, in declaration order.
    pub fn new(scopes: Vec<LocalScope>) -> Self {
        Self { scopes }
    }

    /// Look up the variable name held by `register` at `pc`.
    pub fn lookup(&self, register: u8, pc: usize) -> Option<&str> {
        self.active_at(pc)
            .nth(register as usize)
            .map(|s| s.name.as_str())
    }

    /// Number of locals alive at `pc`; registers at or above it are temporaries.
    pub fn active_count(&self, pc: usize) -> usize {
        self.active_at(pc).count()
    }

    fn active_at(&self, pc: usize) -> impl Iterator<Item = &LocalScope> {
        self.scopes
            .iter()
            .filter(move |s| s.pc_range.start <= pc && pc < s.pc_range.end)
    }

    /// Get all scopes.
    pub fn all_scopes(&self) -> &[LocalScope] {
        &self.scopes
    }
}

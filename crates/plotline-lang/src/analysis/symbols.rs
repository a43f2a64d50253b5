use crate::runtime::value::DataType;
use crate::syntax::ast::Span;

/// A declared variable as the resolver sees it.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: DataType,
    pub span: Span,
}

/// Lexical scope stack. Declaration collides only within the innermost
/// scope; lookup walks outward, so inner declarations shadow outer ones.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Vec<Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { scopes: vec![Vec::new()] }
    }

    pub fn push(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "global scope must not be popped");
        self.scopes.pop();
    }

    /// Declare in the innermost scope. Returns false on a name collision
    /// there; shadowing an outer scope is fine.
    pub fn declare(&mut self, symbol: Symbol) -> bool {
        let scope = self.scopes.last_mut().unwrap();
        if scope.iter().any(|s| s.name == symbol.name) {
            return false;
        }
        scope.push(symbol);
        true
    }

    /// Declare directly into the global scope, wherever the cursor is.
    /// Used for auto-declared free variables.
    pub fn declare_global(&mut self, symbol: Symbol) {
        let global = &mut self.scopes[0];
        if !global.iter().any(|s| s.name == symbol.name) {
            global.push(symbol);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.iter().find(|s| s.name == name))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

//! Symbols and lexical scopes.
//!
//! The parser pushes a scope per function and pops it on exit; popped
//! scopes are dropped. The global scope (named `__SYMTAB__`) is pre-seeded
//! with the primitive type symbols, accumulates all top-level declarations
//! and outlives parsing; the code generator walks it to lay out static
//! storage.

use util::FnvHashMap;

use crate::types::{primitive, Type, PRIMITIVES};
use crate::Span;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SymbolKind {
    Var,
    Func,
    Type,
}

/// A named entity discovered during parsing.
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    /// Declared or inferred type. For functions this is the return type.
    pub ty: Option<&'static Type>,
    /// Position of the defining declaration.
    pub span: Span,
}

impl Symbol {
    pub fn var(name: String, ty: Option<&'static Type>, span: Span) -> Symbol {
        Symbol {
            kind: SymbolKind::Var,
            name,
            ty,
            span,
        }
    }

    pub fn func(name: String, return_type: &'static Type, span: Span) -> Symbol {
        Symbol {
            kind: SymbolKind::Func,
            name,
            ty: Some(return_type),
            span,
        }
    }

    pub fn type_sym(ty: &'static Type) -> Symbol {
        Symbol {
            kind: SymbolKind::Type,
            name: ty.name.to_owned(),
            ty: Some(ty),
            span: Span::default(),
        }
    }
}

/// A lexical region owning a name-to-symbol map.
#[derive(Clone, Debug)]
pub struct Scope {
    pub name: String,
    symbols: FnvHashMap<String, Symbol>,
}

impl Scope {
    pub fn new(name: &str) -> Scope {
        Scope {
            name: name.to_owned(),
            symbols: FnvHashMap::default(),
        }
    }

    /// Inserts `symbol` under its name. Returns `true` iff the name already
    /// existed in this scope; on a clash the existing symbol is left in
    /// place.
    pub fn add(&mut self, symbol: Symbol) -> bool {
        if self.symbols.contains_key(&symbol.name) {
            return true;
        }
        self.symbols.insert(symbol.name.clone(), symbol);
        false
    }

    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Prints the scope contents to stdout (the `-d sym` dump).
    pub fn dump(&self) {
        for symbol in self.symbols.values() {
            match symbol.kind {
                SymbolKind::Var => println!("\"{}\": Variable: {}", symbol.name, symbol.name),
                SymbolKind::Func => println!("\"{}\": Function: {}", symbol.name, symbol.name),
                SymbolKind::Type => match symbol.ty {
                    Some(ty) => println!("\"{}\": Type: {}", symbol.name, ty.name),
                    None => println!("\"{}\": Type: ?", symbol.name),
                },
            }
        }
    }
}

/// The chain of live scopes during parsing: the persistent global scope
/// plus a stack of function scopes.
#[derive(Debug)]
pub struct ScopeStack {
    globals: Scope,
    stack: Vec<Scope>,
}

impl ScopeStack {
    /// Creates the chain with the primitive types already present in the
    /// global scope under their canonical names.
    pub fn new() -> ScopeStack {
        let mut globals = Scope::new("__SYMTAB__");
        for ty in PRIMITIVES.iter() {
            globals.add(Symbol::type_sym(primitive(ty.kind)));
        }
        ScopeStack {
            globals,
            stack: Vec::new(),
        }
    }

    pub fn enter(&mut self, name: &str) {
        self.stack.push(Scope::new(name));
    }

    /// Leaves the innermost scope, dropping it and its symbols.
    pub fn exit(&mut self) {
        self.stack.pop();
    }

    fn innermost(&mut self) -> &mut Scope {
        self.stack.last_mut().unwrap_or(&mut self.globals)
    }

    /// Adds `symbol` to the innermost scope. Returns `true` iff the name
    /// was already declared there.
    pub fn add(&mut self, symbol: Symbol) -> bool {
        self.innermost().add(symbol)
    }

    /// Walks the scope chain from the innermost scope outwards and returns
    /// the first symbol with the given name.
    pub fn find(&self, name: &str) -> Option<&Symbol> {
        for scope in self.stack.iter().rev() {
            if let Some(symbol) = scope.find(name) {
                return Some(symbol);
            }
        }
        self.globals.find(name)
    }

    /// Rebinds the type of the nearest symbol called `name`. Used once a
    /// variable's type has been inferred from its initializer.
    pub fn update_type(&mut self, name: &str, ty: &'static Type) {
        for scope in self.stack.iter_mut().rev() {
            if let Some(symbol) = scope.symbols.get_mut(name) {
                symbol.ty = Some(ty);
                return;
            }
        }
        if let Some(symbol) = self.globals.symbols.get_mut(name) {
            symbol.ty = Some(ty);
        }
    }

    pub fn globals(&self) -> &Scope {
        &self.globals
    }

    pub fn into_globals(self) -> Scope {
        self.globals
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::TypeKind;

    fn int() -> &'static Type {
        primitive(TypeKind::Int)
    }

    #[test]
    fn find_returns_added_symbol() {
        let mut scopes = ScopeStack::new();
        assert!(!scopes.add(Symbol::var("x".to_owned(), Some(int()), Span::default())));

        let found = scopes.find("x").unwrap();
        assert_eq!(found.kind, SymbolKind::Var);
        assert_eq!(found.ty, Some(int()));
    }

    #[test]
    fn redeclaration_in_same_scope_is_reported() {
        let mut scopes = ScopeStack::new();
        assert!(!scopes.add(Symbol::var("x".to_owned(), Some(int()), Span::default())));
        assert!(scopes.add(Symbol::var("x".to_owned(), Some(int()), Span::default())));
    }

    #[test]
    fn child_scope_shadows_parent() {
        let mut scopes = ScopeStack::new();
        scopes.add(Symbol::var(
            "x".to_owned(),
            Some(int()),
            Span::new(1, 1),
        ));
        scopes.enter("inner");
        scopes.add(Symbol::var(
            "x".to_owned(),
            Some(primitive(TypeKind::Bool)),
            Span::new(2, 1),
        ));

        assert_eq!(scopes.find("x").unwrap().ty, Some(primitive(TypeKind::Bool)));
        scopes.exit();
        assert_eq!(scopes.find("x").unwrap().ty, Some(int()));
    }

    #[test]
    fn lookup_walks_the_parent_chain() {
        let mut scopes = ScopeStack::new();
        scopes.add(Symbol::var("g".to_owned(), Some(int()), Span::default()));
        scopes.enter("f");
        assert!(scopes.find("g").is_some());
        assert!(scopes.find("missing").is_none());
    }

    #[test]
    fn exited_scope_symbols_are_gone() {
        let mut scopes = ScopeStack::new();
        scopes.enter("f");
        scopes.add(Symbol::var("local".to_owned(), Some(int()), Span::default()));
        scopes.exit();
        assert!(scopes.find("local").is_none());
    }

    #[test]
    fn primitives_are_preseeded() {
        let scopes = ScopeStack::new();
        for name in &["void", "int", "uint", "float", "double", "char", "bool"] {
            let symbol = scopes.find(name).unwrap();
            assert_eq!(symbol.kind, SymbolKind::Type);
        }
    }

    #[test]
    fn same_name_may_live_in_both_scopes() {
        let mut scopes = ScopeStack::new();
        assert!(!scopes.add(Symbol::func("f".to_owned(), int(), Span::default())));
        scopes.enter("f");
        // Self-reference for recursion goes into the fresh scope.
        assert!(!scopes.add(Symbol::func("f".to_owned(), int(), Span::default())));
    }
}

//! The typed abstract syntax tree produced by the front end.

use std::fmt;
use std::mem;

use crate::types::{primitive, Type, TypeKind};
use crate::Span;

/// Expression operators. Unary and binary expressions share one enum; the
/// IR maps it onto its own opcode set with an explicit table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Op {
    Neg,
    Not,
    Deref,
    Addr,
    Add,
    Sub,
    Mul,
    Div,
    Cmp,
    CmpNot,
    CmpLt,
    CmpGt,
    CmpLtEq,
    CmpGtEq,
}

impl Op {
    /// The source-level spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Neg => "-",
            Op::Not => "!",
            Op::Deref => "*",
            Op::Addr => "&",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Cmp => "==",
            Op::CmpNot => "!=",
            Op::CmpLt => "<",
            Op::CmpGt => ">",
            Op::CmpLtEq => "<=",
            Op::CmpGtEq => ">=",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A literal value. Only integers survive past parsing today; the other
/// kinds are accepted by the parser and rejected by the later passes.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i32),
    Uint(u32),
    Float(f32),
    Double(f64),
    Char(char),
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Char(_) => "char",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
        }
    }

    pub fn same_kind(&self, other: &Value) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Uint(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub return_type: &'static Type,
    pub params: Vec<Node>,
    pub body: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub ty: &'static Type,
    pub value: Option<Box<Node>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignStmt {
    pub name: String,
    pub value: Box<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RetStmt {
    pub value: Box<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CondStmt {
    /// `None` marks an `else` branch.
    pub expr: Option<Box<Node>>,
    pub body: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnaryExpr {
    pub op: Op,
    pub expr: Box<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryExpr {
    pub op: Op,
    pub lhs: Box<Node>,
    pub rhs: Box<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallExpr {
    pub name: String,
    pub args: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Noop,
    Func(FuncDecl),
    Var(VarDecl),
    Assign(AssignStmt),
    Ret(RetStmt),
    Cond(CondStmt),
    Call(CallExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Value(Value),
    Ref(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// Semantic type of the node; `void` until inference sets it.
    pub ty: &'static Type,
    /// Set by IR lowering; unvisited top-level declarations are unused.
    pub visited: bool,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Node {
        Node {
            kind,
            span,
            ty: primitive(TypeKind::Void),
            visited: false,
        }
    }

    pub fn with_type(kind: NodeKind, span: Span, ty: &'static Type) -> Node {
        Node {
            kind,
            span,
            ty,
            visited: false,
        }
    }

    /// The declared name, for declaration nodes.
    pub fn decl_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Func(func) => Some(&func.name),
            NodeKind::Var(var) => Some(&var.name),
            _ => None,
        }
    }
}

fn dump(level: usize, line: &str) {
    println!("{:indent$}{}", "", line, indent = level);
}

/// Prints an indented rendition of the nodes to stdout (the `-d ast` dump).
pub fn dump_nodes(nodes: &[Node], level: usize) {
    for node in nodes {
        dump_node(node, level);
    }
}

fn dump_node(node: &Node, level: usize) {
    match &node.kind {
        NodeKind::Noop => dump(level, "noop"),
        NodeKind::Func(func) => {
            dump(level, "function:");
            dump(level, &format!(" name: {}", func.name));
            dump(level, &format!(" return_type: {}", func.return_type.name));
            dump(level, " params:");
            dump_nodes(&func.params, level + 2);
            dump(level, " body:");
            dump_nodes(&func.body, level + 2);
        }
        NodeKind::Var(var) => {
            dump(level, "variable:");
            dump(level, &format!(" name: {}", var.name));
            dump(level, &format!(" type: {}", var.ty.name));
            if let Some(value) = &var.value {
                dump(level, " value:");
                dump_node(value, level + 2);
            }
        }
        NodeKind::Assign(assign) => {
            dump(level, "assignment:");
            dump(level, &format!(" name: {}", assign.name));
            dump_node(&assign.value, level + 2);
        }
        NodeKind::Ret(ret) => {
            dump(level, "return:");
            dump(level, " value:");
            dump_node(&ret.value, level + 2);
        }
        NodeKind::Cond(cond) => {
            dump(level, "conditional:");
            if let Some(expr) = &cond.expr {
                dump(level, " expr:");
                dump_node(expr, level + 2);
            }
            dump(level, " body:");
            dump_nodes(&cond.body, level + 2);
        }
        NodeKind::Call(call) => {
            dump(level, "call:");
            dump(level, &format!(" name: {}", call.name));
            dump(level, " args:");
            dump_nodes(&call.args, level + 2);
        }
        NodeKind::Unary(unary) => {
            dump(level, "unary:");
            dump(level, &format!(" op: {}", unary.op));
            dump(level, " expr:");
            dump_node(&unary.expr, level + 2);
        }
        NodeKind::Binary(binary) => {
            dump(level, "binary:");
            dump(level, &format!(" op: {}", binary.op));
            dump(level, " lhs:");
            dump_node(&binary.lhs, level + 2);
            dump(level, " rhs:");
            dump_node(&binary.rhs, level + 2);
        }
        NodeKind::Value(value) => dump(level, &format!("value: {}", value)),
        NodeKind::Ref(name) => dump(level, &format!("ref: {}", name)),
    }
}

/// Warns for every top-level declaration that IR lowering never reached.
pub fn warn_unused(nodes: &[Node]) {
    for node in nodes {
        if node.visited {
            continue;
        }
        match &node.kind {
            NodeKind::Func(func) => log::warn!(
                "unused function {} at line {}, col {}",
                func.name,
                node.span.line,
                node.span.col
            ),
            NodeKind::Var(var) => log::warn!(
                "unused variable {} at line {}, col {}",
                var.name,
                node.span.line,
                node.span.col
            ),
            _ => {}
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn value_kinds_compare_by_discriminant() {
        assert!(Value::Int(1).same_kind(&Value::Int(2)));
        assert!(!Value::Int(1).same_kind(&Value::Bool(true)));
        assert!(Value::Str("a".to_owned()).same_kind(&Value::Str("b".to_owned())));
    }

    #[test]
    fn operator_spellings() {
        assert_eq!(Op::Neg.symbol(), "-");
        assert_eq!(Op::Sub.symbol(), "-");
        assert_eq!(Op::CmpLtEq.symbol(), "<=");
        assert_eq!(Op::Addr.symbol(), "&");
    }

    #[test]
    fn nodes_default_to_void() {
        let node = Node::new(NodeKind::Noop, Span::default());
        assert_eq!(node.ty.kind, TypeKind::Void);
        assert!(!node.visited);
    }
}

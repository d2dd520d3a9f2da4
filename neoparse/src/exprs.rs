//! Expression processing: pest pairs to typed AST nodes, with symbol
//! resolution for references and calls.

use matches::debug_assert_matches;
use pest::iterators::Pair;

use neo::ast::{BinaryExpr, CallExpr, Node, NodeKind, Op, UnaryExpr, Value};
use neo::symtab::{ScopeStack, SymbolKind};
use neo::types::{primitive, TypeKind};

use crate::parser::Rule;
use crate::{literals, new_parser_error, span_of, Result};

fn unary_op(pair: &Pair<Rule>) -> Op {
    match pair.as_str() {
        "-" => Op::Neg,
        "!" => Op::Not,
        "*" => Op::Deref,
        _ => unreachable!(),
    }
}

fn binary_op(pair: &Pair<Rule>) -> Op {
    match pair.as_str() {
        "+" => Op::Add,
        "-" => Op::Sub,
        "*" => Op::Mul,
        "/" => Op::Div,
        "==" => Op::Cmp,
        "!=" => Op::CmpNot,
        "<" => Op::CmpLt,
        ">" => Op::CmpGt,
        "<=" => Op::CmpLtEq,
        ">=" => Op::CmpGtEq,
        _ => unreachable!(),
    }
}

pub fn process_expression(pair: Pair<Rule>, scopes: &mut ScopeStack) -> Result<Node> {
    debug_assert_matches!(pair.as_rule(), Rule::expression);

    let mut pairs = pair.into_inner().peekable();

    let has_unary = pairs
        .peek()
        .map(|first| first.as_rule() == Rule::unary_op)
        .unwrap_or(false);
    let unary = if has_unary { pairs.next() } else { None };

    let mut node = process_term(pairs.next().unwrap(), scopes)?;

    // The unary operator binds the first term, tighter than any of the
    // binary operators that follow.
    if let Some(op_pair) = unary {
        let ty = node.ty;
        node = Node::with_type(
            NodeKind::Unary(UnaryExpr {
                op: unary_op(&op_pair),
                expr: Box::new(node),
            }),
            span_of(&op_pair),
            ty,
        );
    }

    while let Some(op_pair) = pairs.next() {
        debug_assert_matches!(op_pair.as_rule(), Rule::add_op);
        let rhs = process_term(pairs.next().unwrap(), scopes)?;
        let ty = node.ty;
        node = Node::with_type(
            NodeKind::Binary(BinaryExpr {
                op: binary_op(&op_pair),
                lhs: Box::new(node),
                rhs: Box::new(rhs),
            }),
            span_of(&op_pair),
            ty,
        );
    }

    Ok(node)
}

fn process_term(pair: Pair<Rule>, scopes: &mut ScopeStack) -> Result<Node> {
    debug_assert_matches!(pair.as_rule(), Rule::term);

    let mut pairs = pair.into_inner();
    let mut node = process_factor(pairs.next().unwrap(), scopes)?;

    while let Some(op_pair) = pairs.next() {
        debug_assert_matches!(op_pair.as_rule(), Rule::mul_op);
        let rhs = process_factor(pairs.next().unwrap(), scopes)?;
        let ty = node.ty;
        node = Node::with_type(
            NodeKind::Binary(BinaryExpr {
                op: binary_op(&op_pair),
                lhs: Box::new(node),
                rhs: Box::new(rhs),
            }),
            span_of(&op_pair),
            ty,
        );
    }

    Ok(node)
}

fn process_factor(pair: Pair<Rule>, scopes: &mut ScopeStack) -> Result<Node> {
    let span = span_of(&pair);
    match pair.as_rule() {
        Rule::int_lit => {
            let value = literals::process_int(&pair)?;
            Ok(Node::with_type(
                NodeKind::Value(Value::Int(value)),
                span,
                primitive(TypeKind::Int),
            ))
        }
        Rule::char_lit => {
            let value = literals::process_char(pair)?;
            Ok(Node::with_type(
                NodeKind::Value(Value::Char(value)),
                span,
                primitive(TypeKind::Char),
            ))
        }
        Rule::bool_lit => Ok(Node::with_type(
            NodeKind::Value(Value::Bool(pair.as_str() == "true")),
            span,
            primitive(TypeKind::Bool),
        )),
        Rule::call_expr => process_call(pair, scopes),
        Rule::reference => process_reference(pair, scopes),
        _ => unreachable!(),
    }
}

fn process_reference(pair: Pair<Rule>, scopes: &mut ScopeStack) -> Result<Node> {
    let ident = pair.into_inner().next().unwrap();
    let span = ident.as_span();
    let name = ident.as_str();

    let symbol = scopes
        .find(name)
        .ok_or_else(|| new_parser_error(span.clone(), format!("unknown variable '{}'", name)))?;
    if symbol.kind != SymbolKind::Var {
        return Err(new_parser_error(
            span,
            format!("symbol '{}' is not a variable", name),
        ));
    }
    let ty = symbol.ty.unwrap_or_else(|| primitive(TypeKind::Void));

    Ok(Node::with_type(
        NodeKind::Ref(name.to_owned()),
        span_of(&ident),
        ty,
    ))
}

fn process_call(pair: Pair<Rule>, scopes: &mut ScopeStack) -> Result<Node> {
    let span = span_of(&pair);
    let mut pairs = pair.into_inner();
    let ident = pairs.next().unwrap();
    let name = ident.as_str().to_owned();

    let symbol = scopes.find(&name).ok_or_else(|| {
        new_parser_error(ident.as_span(), format!("unknown function '{}'", name))
    })?;
    if symbol.kind != SymbolKind::Func {
        return Err(new_parser_error(
            ident.as_span(),
            format!("symbol '{}' is not a function", name),
        ));
    }
    let ty = symbol.ty.unwrap_or_else(|| primitive(TypeKind::Void));

    let mut args = Vec::new();
    if let Some(list) = pairs.next() {
        debug_assert_matches!(list.as_rule(), Rule::args);
        for arg in list.into_inner() {
            args.push(process_expression(arg, scopes)?);
        }
    }

    Ok(Node::with_type(
        NodeKind::Call(CallExpr { name, args }),
        span,
        ty,
    ))
}

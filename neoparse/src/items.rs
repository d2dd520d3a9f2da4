//! Declaration and statement processing: builds the AST and the scope
//! chain in one pass over the parse tree.

use matches::debug_assert_matches;
use pest::iterators::Pair;

use neo::ast::{AssignStmt, CondStmt, FuncDecl, Node, NodeKind, RetStmt, VarDecl};
use neo::symtab::{Scope, ScopeStack, Symbol, SymbolKind};
use neo::types::{primitive, Type, TypeKind};

use crate::exprs::process_expression;
use crate::parser::Rule;
use crate::{new_parser_error, span_of, Result};

pub fn process_program(pair: Pair<Rule>) -> Result<(Vec<Node>, Scope)> {
    debug_assert_matches!(pair.as_rule(), Rule::program);

    let mut scopes = ScopeStack::new();
    let mut decls = Vec::new();

    for decl in pair.into_inner() {
        match decl.as_rule() {
            Rule::var_decl => decls.push(process_var_decl(decl, &mut scopes)?),
            Rule::func_decl => decls.push(process_func_decl(decl, &mut scopes)?),
            Rule::EOI => {}
            _ => unreachable!(),
        }
    }

    Ok((decls, scopes.into_globals()))
}

fn resolve_type(pair: Pair<Rule>, scopes: &ScopeStack) -> Result<&'static Type> {
    debug_assert_matches!(pair.as_rule(), Rule::type_name);

    let ident = pair.into_inner().next().unwrap();
    let name = ident.as_str();

    let symbol = scopes
        .find(name)
        .ok_or_else(|| new_parser_error(ident.as_span(), format!("unknown type '{}'", name)))?;
    if symbol.kind != SymbolKind::Type {
        return Err(new_parser_error(
            ident.as_span(),
            format!("symbol '{}' is not a type", name),
        ));
    }

    symbol
        .ty
        .ok_or_else(|| new_parser_error(ident.as_span(), format!("type '{}' is incomplete", name)))
}

fn process_func_decl(pair: Pair<Rule>, scopes: &mut ScopeStack) -> Result<Node> {
    debug_assert_matches!(pair.as_rule(), Rule::func_decl);
    let span = span_of(&pair);

    let mut name_pair = None;
    let mut params_pair = None;
    let mut ret_pair = None;
    let mut block_pair = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::kw_func => {}
            Rule::identifier => name_pair = Some(inner),
            Rule::params => params_pair = Some(inner),
            Rule::type_name => ret_pair = Some(inner),
            Rule::block => block_pair = Some(inner),
            _ => unreachable!(),
        }
    }

    let ident = name_pair.unwrap();
    let name = ident.as_str().to_owned();
    let return_type = match ret_pair {
        Some(ret) => resolve_type(ret, scopes)?,
        None => primitive(TypeKind::Void),
    };

    let symbol = Symbol::func(name.clone(), return_type, span_of(&ident));
    if scopes.add(symbol.clone()) {
        return Err(new_parser_error(
            ident.as_span(),
            format!("function '{}' redeclared in scope", name),
        ));
    }

    scopes.enter(&name);
    // The function is visible inside its own scope for direct recursion.
    scopes.add(symbol);

    let params = match params_pair {
        Some(params) => process_params(params, scopes)?,
        None => Vec::new(),
    };
    let body = process_block(block_pair.unwrap(), scopes)?;

    scopes.exit();

    Ok(Node::with_type(
        NodeKind::Func(FuncDecl {
            name,
            return_type,
            params,
            body,
        }),
        span,
        return_type,
    ))
}

fn process_params(pair: Pair<Rule>, scopes: &mut ScopeStack) -> Result<Vec<Node>> {
    debug_assert_matches!(pair.as_rule(), Rule::params);

    let mut params = Vec::new();
    for param in pair.into_inner() {
        let span = span_of(&param);
        let mut pairs = param.into_inner();
        let ident = pairs.next().unwrap();
        let ty = resolve_type(pairs.next().unwrap(), scopes)?;
        let name = ident.as_str().to_owned();

        if scopes.add(Symbol::var(name.clone(), Some(ty), span_of(&ident))) {
            return Err(new_parser_error(
                ident.as_span(),
                format!("function parameter '{}' redeclared in scope", name),
            ));
        }

        params.push(Node::with_type(
            NodeKind::Var(VarDecl {
                name,
                ty,
                value: None,
            }),
            span,
            ty,
        ));
    }
    Ok(params)
}

fn process_var_decl(pair: Pair<Rule>, scopes: &mut ScopeStack) -> Result<Node> {
    debug_assert_matches!(pair.as_rule(), Rule::var_decl);
    let span = span_of(&pair);

    let mut pairs = pair.into_inner();
    // kw_var, identifier, then optional type_name and expression.
    let mut ident = pairs.next().unwrap();
    if ident.as_rule() == Rule::kw_var {
        ident = pairs.next().unwrap();
    }
    let name = ident.as_str().to_owned();

    // The name is in scope before the initializer is processed, so an
    // initializer may reference the variable being declared.
    if scopes.add(Symbol::var(name.clone(), None, span_of(&ident))) {
        return Err(new_parser_error(
            ident.as_span(),
            format!("variable '{}' redeclared in scope", name),
        ));
    }

    let mut declared = None;
    let mut value = None;
    for inner in pairs {
        match inner.as_rule() {
            Rule::type_name => declared = Some(resolve_type(inner, scopes)?),
            Rule::expression => value = Some(process_expression(inner, scopes)?),
            _ => unreachable!(),
        }
    }

    let ty = match declared {
        Some(ty) => ty,
        None => value
            .as_ref()
            .map(|node| node.ty)
            .unwrap_or_else(|| primitive(TypeKind::Void)),
    };

    if value.is_none() {
        log::warn!(
            "uninitialized variable '{}' on line {}, col {}",
            name,
            span.line,
            span.col
        );
    }

    scopes.update_type(&name, ty);

    Ok(Node::with_type(
        NodeKind::Var(VarDecl {
            name,
            ty,
            value: value.map(Box::new),
        }),
        span,
        ty,
    ))
}

fn process_assign_stmt(pair: Pair<Rule>, scopes: &mut ScopeStack) -> Result<Node> {
    debug_assert_matches!(pair.as_rule(), Rule::assign_stmt);
    let span = span_of(&pair);

    let mut pairs = pair.into_inner();
    let ident = pairs.next().unwrap();
    let name = ident.as_str().to_owned();

    if scopes.find(&name).is_none() {
        return Err(new_parser_error(
            ident.as_span(),
            format!("unknown variable '{}'", name),
        ));
    }

    let value = process_expression(pairs.next().unwrap(), scopes)?;

    Ok(Node::new(
        NodeKind::Assign(AssignStmt {
            name,
            value: Box::new(value),
        }),
        span,
    ))
}

fn process_return_stmt(pair: Pair<Rule>, scopes: &mut ScopeStack) -> Result<Node> {
    debug_assert_matches!(pair.as_rule(), Rule::return_stmt);
    let span = span_of(&pair);

    let expr = pair
        .into_inner()
        .find(|inner| inner.as_rule() == Rule::expression)
        .unwrap();
    let value = process_expression(expr, scopes)?;

    Ok(Node::new(
        NodeKind::Ret(RetStmt {
            value: Box::new(value),
        }),
        span,
    ))
}

fn process_if_stmt(pair: Pair<Rule>, scopes: &mut ScopeStack) -> Result<Node> {
    debug_assert_matches!(pair.as_rule(), Rule::if_stmt);
    let span = span_of(&pair);

    let mut expr = None;
    let mut body = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::kw_if => {}
            Rule::expression => expr = Some(process_expression(inner, scopes)?),
            Rule::block => body = process_block(inner, scopes)?,
            _ => unreachable!(),
        }
    }

    Ok(Node::new(
        NodeKind::Cond(CondStmt {
            expr: expr.map(Box::new),
            body,
        }),
        span,
    ))
}

fn process_else_stmt(pair: Pair<Rule>, scopes: &mut ScopeStack) -> Result<Node> {
    debug_assert_matches!(pair.as_rule(), Rule::else_stmt);
    let span = span_of(&pair);

    let block = pair
        .into_inner()
        .find(|inner| inner.as_rule() == Rule::block)
        .unwrap();

    Ok(Node::new(
        NodeKind::Cond(CondStmt {
            expr: None,
            body: process_block(block, scopes)?,
        }),
        span,
    ))
}

fn process_block(pair: Pair<Rule>, scopes: &mut ScopeStack) -> Result<Vec<Node>> {
    debug_assert_matches!(pair.as_rule(), Rule::block);

    let mut body = Vec::new();
    for stmt in pair.into_inner() {
        let node = match stmt.as_rule() {
            Rule::var_decl => process_var_decl(stmt, scopes)?,
            Rule::if_stmt => process_if_stmt(stmt, scopes)?,
            Rule::else_stmt => process_else_stmt(stmt, scopes)?,
            Rule::return_stmt => process_return_stmt(stmt, scopes)?,
            Rule::assign_stmt => process_assign_stmt(stmt, scopes)?,
            Rule::expr_stmt => {
                let expr = stmt.into_inner().next().unwrap();
                process_expression(expr, scopes)?
            }
            _ => unreachable!(),
        };
        body.push(node);
    }
    Ok(body)
}

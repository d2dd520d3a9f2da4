use crate::parser::{NeoParser, Rule};
use crate::Result;
use ::pest::error::LineColLocation;
use ::pest::{iterators::Pair, Parser};
use neo::ast::{Node, NodeKind, Op, Value};
use neo::symtab::SymbolKind;
use neo::types::TypeKind;


pub fn parse_rule(rule: Rule, input: &str) -> Result<Pair<Rule>> {
    Ok(NeoParser::parse(rule, input)?.next().unwrap())
}

#[test]
fn single_rules_parse_standalone() {
    assert_eq!(
        parse_rule(Rule::expression, "1 + 2 * 3").unwrap().as_rule(),
        Rule::expression
    );
    assert_eq!(
        parse_rule(Rule::block, "{ return 1; }").unwrap().as_rule(),
        Rule::block
    );
    assert!(parse_rule(Rule::expression, "+ 1").is_err());
}

fn body_of(decls: &[Node], name: &str) -> Vec<Node> {
    for decl in decls {
        if let NodeKind::Func(func) = &decl.kind {
            if func.name == name {
                return func.body.clone();
            }
        }
    }
    panic!("no function '{}' in AST", name);
}

fn initializer(node: &Node) -> Node {
    match &node.kind {
        NodeKind::Var(var) => (**var.value.as_ref().unwrap()).clone(),
        other => panic!("expected variable declaration, got {:?}", other),
    }
}

#[test]
fn parses_a_minimal_program() {
    let (decls, globals) = crate::parse("func main() { var x = 1 + 2; }").unwrap();

    assert_eq!(decls.len(), 1);
    let main = globals.find("main").unwrap();
    assert_eq!(main.kind, SymbolKind::Func);
    assert_eq!(main.ty.unwrap().kind, TypeKind::Void);
}

#[test]
fn variable_type_is_inferred_from_the_initializer() {
    let (decls, _) = crate::parse("func main() { var x = 5; var b = true; }").unwrap();
    let body = body_of(&decls, "main");

    assert_eq!(body[0].ty.kind, TypeKind::Int);
    assert_eq!(body[1].ty.kind, TypeKind::Bool);
}

#[test]
fn declared_type_wins_over_inference() {
    let (decls, globals) = crate::parse("var x: double = 1;").unwrap();
    assert_eq!(decls[0].ty.kind, TypeKind::Double);
    assert_eq!(globals.find("x").unwrap().ty.unwrap().kind, TypeKind::Double);
}

#[test]
fn uninitialized_declaration_parses() {
    let (decls, _) = crate::parse("var x: int;").unwrap();
    match &decls[0].kind {
        NodeKind::Var(var) => assert!(var.value.is_none()),
        other => panic!("unexpected node {:?}", other),
    }
}

#[test]
fn literals_carry_their_primitive_types() {
    let (decls, _) =
        crate::parse("func main() { var a = 0x2A; var c = 'x'; var b = false; }").unwrap();
    let body = body_of(&decls, "main");

    assert_eq!(initializer(&body[0]).kind, NodeKind::Value(Value::Int(42)));
    assert_eq!(initializer(&body[1]).kind, NodeKind::Value(Value::Char('x')));
    assert_eq!(
        initializer(&body[2]).kind,
        NodeKind::Value(Value::Bool(false))
    );
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let (decls, _) = crate::parse("func main() { var x = 1 + 2 * 3; }").unwrap();
    let init = initializer(&body_of(&decls, "main")[0]);

    match init.kind {
        NodeKind::Binary(add) => {
            assert_eq!(add.op, Op::Add);
            assert_eq!(add.lhs.kind, NodeKind::Value(Value::Int(1)));
            match add.rhs.kind {
                NodeKind::Binary(mul) => assert_eq!(mul.op, Op::Mul),
                other => panic!("expected multiplication, got {:?}", other),
            }
        }
        other => panic!("expected addition, got {:?}", other),
    }
}

#[test]
fn leading_unary_wraps_the_first_term() {
    let (decls, _) = crate::parse("func main() { var x = -1 + 2; }").unwrap();
    let init = initializer(&body_of(&decls, "main")[0]);

    match init.kind {
        NodeKind::Binary(add) => {
            assert_eq!(add.op, Op::Add);
            match add.lhs.kind {
                NodeKind::Unary(neg) => assert_eq!(neg.op, Op::Neg),
                other => panic!("expected negation, got {:?}", other),
            }
        }
        other => panic!("expected addition, got {:?}", other),
    }
}

#[test]
fn comparisons_share_the_additive_level() {
    let (decls, _) = crate::parse("func main() { var x = 1 + 2 == 3; }").unwrap();
    let init = initializer(&body_of(&decls, "main")[0]);

    // Left-associative: (1 + 2) == 3.
    match init.kind {
        NodeKind::Binary(cmp) => {
            assert_eq!(cmp.op, Op::Cmp);
            assert!(matches!(cmp.lhs.kind, NodeKind::Binary(_)));
        }
        other => panic!("expected comparison, got {:?}", other),
    }
}

#[test]
fn parameters_resolve_inside_the_body() {
    let (decls, globals) =
        crate::parse("func add(a: int, b: int) -> int { return a + b; }").unwrap();

    match &decls[0].kind {
        NodeKind::Func(func) => {
            assert_eq!(func.params.len(), 2);
            assert_eq!(func.return_type.kind, TypeKind::Int);
        }
        other => panic!("unexpected node {:?}", other),
    }
    // Parameters live in the function scope, not in the globals.
    assert!(globals.find("a").is_none());
    assert_eq!(globals.find("add").unwrap().ty.unwrap().kind, TypeKind::Int);
}

#[test]
fn functions_may_call_themselves() {
    crate::parse("func again() { again(); }").unwrap();
}

#[test]
fn calls_resolve_against_earlier_declarations() {
    crate::parse("func helper() {} func main() { helper(); }").unwrap();
}

#[test]
fn redeclaration_reports_the_second_position() {
    let err = crate::parse("func main() {\n    var x: int;\n    var x: int;\n}").unwrap_err();

    assert!(err.to_string().contains("variable 'x' redeclared in scope"));
    match err.line_col {
        LineColLocation::Pos((line, col)) => {
            assert_eq!(line, 3);
            assert_eq!(col, 9);
        }
        other => panic!("unexpected location {:?}", other),
    }
}

#[test]
fn unknown_variable_is_reported() {
    let err = crate::parse("func main() { x = 5; }").unwrap_err();
    assert!(err.to_string().contains("unknown variable 'x'"));

    let err = crate::parse("func main() { var y = x + 1; }").unwrap_err();
    assert!(err.to_string().contains("unknown variable 'x'"));
}

#[test]
fn unknown_type_is_reported() {
    let err = crate::parse("var x: quad;").unwrap_err();
    assert!(err.to_string().contains("unknown type 'quad'"));
}

#[test]
fn kind_mismatches_are_reported() {
    let err = crate::parse("var x = 5; func main() { x(); }").unwrap_err();
    assert!(err.to_string().contains("symbol 'x' is not a function"));

    let err = crate::parse("func f() {} func main() { var x = f; }").unwrap_err();
    assert!(err.to_string().contains("symbol 'f' is not a variable"));

    let err = crate::parse("func f() {} var x: f;").unwrap_err();
    assert!(err.to_string().contains("symbol 'f' is not a type"));
}

#[test]
fn function_redeclaration_is_reported() {
    let err = crate::parse("func f() {} func f() {}").unwrap_err();
    assert!(err.to_string().contains("function 'f' redeclared in scope"));
}

#[test]
fn locals_do_not_escape_their_function() {
    let err = crate::parse("func f() { var a = 1; } func main() { var b = a; }").unwrap_err();
    assert!(err.to_string().contains("unknown variable 'a'"));
}

// End-to-end pipeline scenarios, stopping before the external assembler.

#[test]
fn scenario_constant_fold_then_cse() {
    let (mut decls, _) = crate::parse("func main() { var x = 1 + 2; var y = 1 + 2; }").unwrap();
    neo::optimize::fold_constants(&mut decls);

    let body = body_of(&decls, "main");
    assert_eq!(initializer(&body[0]).kind, NodeKind::Value(Value::Int(3)));
    assert_eq!(initializer(&body[1]).kind, NodeKind::Value(Value::Int(3)));

    let program = neo::ir::lower_to_ir(&mut decls, "main").unwrap();
    let y = program
        .instructions()
        .find(|inst| inst.assignee.as_deref() == Some("y"))
        .unwrap();
    // The second assignment collides with the first and reads x instead.
    assert_eq!(
        y.operands,
        vec![neo::ir::Operand::Variable("x".to_owned())]
    );
}

#[test]
fn scenario_self_assignment_vanishes() {
    let (mut decls, _) = crate::parse("func main() { var x = 5; x = x; }").unwrap();
    neo::optimize::fold_constants(&mut decls);

    let body = body_of(&decls, "main");
    assert_eq!(body[1].kind, NodeKind::Noop);

    let program = neo::ir::lower_to_ir(&mut decls, "main").unwrap();
    // def main + the initial assignment; the self-assignment emitted nothing.
    assert_eq!(program.instructions().count(), 2);
}

#[test]
fn scenario_dead_temporary_is_flagged() {
    let (mut decls, _) = crate::parse("func main() { var x = 1; var y = x + 2; }").unwrap();
    let program = neo::ir::lower_to_ir(&mut decls, "main").unwrap();

    let temp = program
        .instructions()
        .find(|inst| inst.assignee.as_deref() == Some("$t0"))
        .unwrap();
    assert_eq!(temp.opcode, neo::ir::Opcode::Dead);
}

#[test]
fn scenario_unused_function_stays_unvisited() {
    let (mut decls, _) = crate::parse("func foo() {} func main() { var x = 1; }").unwrap();
    neo::ir::lower_to_ir(&mut decls, "main").unwrap();

    assert!(!decls[0].visited);
    assert!(decls[1].visited);
}

#[test]
fn scenario_register_reuse_for_addition() {
    let source = "func main() { var a = 1; var b = 2; var c = a + b; return c; }";
    let (mut decls, globals) = crate::parse(source).unwrap();
    neo::optimize::fold_constants(&mut decls);
    let program = neo::ir::lower_to_ir(&mut decls, "main").unwrap();
    let target = neo::codegen::generate(&program, &globals).unwrap();

    let lines: Vec<&str> = target.code.lines().collect();
    let seed = lines.iter().position(|l| *l == "mov rcx, rax").unwrap();
    let sum = lines.iter().position(|l| *l == "add rcx, rbx").unwrap();
    assert!(seed < sum);
}

#[test]
fn lowering_rejects_conditionals() {
    let (mut decls, _) = crate::parse("func main() { if 1 { } }").unwrap();
    let err = neo::ir::lower_to_ir(&mut decls, "main").unwrap_err();
    assert!(matches!(err, neo::Error::Lower(_, _)));
}

#[test]
fn lowering_rejects_calls() {
    let (mut decls, _) = crate::parse("func f() {} func main() { f(); }").unwrap();
    let err = neo::ir::lower_to_ir(&mut decls, "main").unwrap_err();
    assert!(matches!(err, neo::Error::Lower(_, _)));
}

#[test]
fn globals_reach_the_bss_section() {
    let (mut decls, globals) = crate::parse("var g: int = 1; func main() { }").unwrap();
    let program = neo::ir::lower_to_ir(&mut decls, "main").unwrap();
    let target = neo::codegen::generate(&program, &globals).unwrap();
    assert!(target.code.contains("g: resd 1"));
}

//! Constant folding and self-assignment elimination on the AST.
//!
//! A single recursive walk. Folding rewrites a node in place and never
//! revisits siblings, so running the pass twice is the same as running it
//! once. Only integer literals fold today; other literal kinds warn and
//! stay untouched.

use crate::ast::{Node, NodeKind, Op, Value};

fn fold_int_unary(op: Op, n: i32) -> Option<i32> {
    match op {
        Op::Neg => Some(0i32.wrapping_sub(n)),
        Op::Not => Some((n == 0) as i32),
        _ => {
            log::warn!("cannot fold unary operator '{}'", op);
            None
        }
    }
}

fn fold_int_binary(op: Op, left: i32, right: i32) -> Option<i32> {
    let result = match op {
        Op::Add => left.wrapping_add(right),
        Op::Sub => left.wrapping_sub(right),
        Op::Mul => left.wrapping_mul(right),
        Op::Div => {
            if right == 0 {
                log::warn!("not folding division by zero");
                return None;
            }
            left.wrapping_div(right)
        }
        Op::Cmp => (left == right) as i32,
        Op::CmpNot => (left != right) as i32,
        Op::CmpLt => (left < right) as i32,
        Op::CmpGt => (left > right) as i32,
        Op::CmpLtEq => (left <= right) as i32,
        Op::CmpGtEq => (left >= right) as i32,
        _ => {
            log::warn!("cannot fold binary operator '{}'", op);
            return None;
        }
    };
    Some(result)
}

/// Folds constants in every node of the list, in place.
pub fn fold_constants(nodes: &mut [Node]) {
    for node in nodes {
        fold_node(node);
    }
}

fn fold_node(node: &mut Node) {
    let span = node.span;

    let replacement = match &mut node.kind {
        NodeKind::Func(func) => {
            fold_constants(&mut func.body);
            None
        }
        NodeKind::Var(var) => {
            if let Some(value) = var.value.as_mut() {
                fold_node(value);
            }
            None
        }
        NodeKind::Assign(assign) => {
            let self_assign =
                matches!(&assign.value.kind, NodeKind::Ref(name) if *name == assign.name);
            if self_assign {
                log::info!(
                    "eliminating self-assignment of variable '{}' on line {}, col {}",
                    assign.name,
                    span.line,
                    span.col
                );
                Some(NodeKind::Noop)
            } else {
                fold_node(&mut assign.value);
                None
            }
        }
        NodeKind::Unary(unary) => {
            fold_node(&mut unary.expr);
            match &unary.expr.kind {
                NodeKind::Value(Value::Int(n)) => fold_int_unary(unary.op, *n).map(|folded| {
                    log::info!(
                        "folding constant unary expression on line {}, col {}",
                        span.line,
                        span.col
                    );
                    NodeKind::Value(Value::Int(folded))
                }),
                NodeKind::Value(value) => {
                    log::warn!(
                        "constant folding not yet supported for {} values",
                        value.kind_name()
                    );
                    None
                }
                _ => None,
            }
        }
        NodeKind::Binary(binary) => {
            if matches!(binary.lhs.kind, NodeKind::Unary(_) | NodeKind::Binary(_)) {
                fold_node(&mut binary.lhs);
            }
            if matches!(binary.rhs.kind, NodeKind::Unary(_) | NodeKind::Binary(_)) {
                fold_node(&mut binary.rhs);
            }

            // Only literals of the same kind fold; there is no implicit
            // coercion between value kinds.
            match (&binary.lhs.kind, &binary.rhs.kind) {
                (NodeKind::Value(Value::Int(left)), NodeKind::Value(Value::Int(right))) => {
                    fold_int_binary(binary.op, *left, *right).map(|folded| {
                        log::info!(
                            "folding constant binary expression on line {}, col {}",
                            span.line,
                            span.col
                        );
                        NodeKind::Value(Value::Int(folded))
                    })
                }
                (NodeKind::Value(left), NodeKind::Value(right)) if left.same_kind(right) => {
                    log::warn!(
                        "constant folding not yet supported for {} values",
                        left.kind_name()
                    );
                    None
                }
                _ => None,
            }
        }
        _ => None,
    };

    if let Some(kind) = replacement {
        node.kind = kind;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{AssignStmt, BinaryExpr, UnaryExpr};
    use crate::Span;

    fn value(v: i32) -> Node {
        Node::new(NodeKind::Value(Value::Int(v)), Span::default())
    }

    fn binary(op: Op, lhs: Node, rhs: Node) -> Node {
        Node::new(
            NodeKind::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }),
            Span::default(),
        )
    }

    fn folded_int(node: &Node) -> i32 {
        match &node.kind {
            NodeKind::Value(Value::Int(v)) => *v,
            other => panic!("expected folded integer, got {:?}", other),
        }
    }

    #[test]
    fn integer_fold_law() {
        let cases: &[(Op, i32, i32, i32)] = &[
            (Op::Add, 1, 2, 3),
            (Op::Sub, 1, 2, -1),
            (Op::Mul, 6, 7, 42),
            (Op::Div, 9, 2, 4),
            (Op::Cmp, 3, 3, 1),
            (Op::CmpNot, 3, 3, 0),
            (Op::CmpLt, 2, 3, 1),
            (Op::CmpGt, 2, 3, 0),
            (Op::CmpLtEq, 3, 3, 1),
            (Op::CmpGtEq, 2, 3, 0),
        ];

        for &(op, left, right, expected) in cases {
            let mut node = binary(op, value(left), value(right));
            fold_node(&mut node);
            assert_eq!(folded_int(&node), expected, "{} {} {}", left, op, right);
        }
    }

    #[test]
    fn addition_wraps() {
        let mut node = binary(Op::Add, value(i32::max_value()), value(1));
        fold_node(&mut node);
        assert_eq!(folded_int(&node), i32::min_value());
    }

    #[test]
    fn negation_and_logical_not() {
        let mut node = Node::new(
            NodeKind::Unary(UnaryExpr {
                op: Op::Neg,
                expr: Box::new(value(5)),
            }),
            Span::default(),
        );
        fold_node(&mut node);
        assert_eq!(folded_int(&node), -5);

        let mut node = Node::new(
            NodeKind::Unary(UnaryExpr {
                op: Op::Not,
                expr: Box::new(value(0)),
            }),
            Span::default(),
        );
        fold_node(&mut node);
        assert_eq!(folded_int(&node), 1);
    }

    #[test]
    fn nested_expressions_fold_bottom_up() {
        // (1 + 2) * (10 - 4)
        let mut node = binary(
            Op::Mul,
            binary(Op::Add, value(1), value(2)),
            binary(Op::Sub, value(10), value(4)),
        );
        fold_node(&mut node);
        assert_eq!(folded_int(&node), 18);
    }

    #[test]
    fn folding_is_idempotent() {
        let mut once = binary(Op::Add, value(1), value(2));
        fold_node(&mut once);
        let mut twice = once.clone();
        fold_node(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn self_assignment_becomes_noop() {
        let mut node = Node::new(
            NodeKind::Assign(AssignStmt {
                name: "x".to_owned(),
                value: Box::new(Node::new(
                    NodeKind::Ref("x".to_owned()),
                    Span::default(),
                )),
            }),
            Span::default(),
        );
        fold_node(&mut node);
        assert_eq!(node.kind, NodeKind::Noop);
    }

    #[test]
    fn assignment_to_other_variable_is_kept() {
        let mut node = Node::new(
            NodeKind::Assign(AssignStmt {
                name: "x".to_owned(),
                value: Box::new(Node::new(
                    NodeKind::Ref("y".to_owned()),
                    Span::default(),
                )),
            }),
            Span::default(),
        );
        fold_node(&mut node);
        assert!(matches!(node.kind, NodeKind::Assign(_)));
    }

    #[test]
    fn mixed_kinds_do_not_fold() {
        let mut node = binary(
            Op::Add,
            value(1),
            Node::new(NodeKind::Value(Value::Bool(true)), Span::default()),
        );
        fold_node(&mut node);
        assert!(matches!(node.kind, NodeKind::Binary(_)));
    }

    #[test]
    fn non_integer_kinds_do_not_fold() {
        let bool_lit = |b| Node::new(NodeKind::Value(Value::Bool(b)), Span::default());
        let mut node = binary(Op::Cmp, bool_lit(true), bool_lit(true));
        fold_node(&mut node);
        assert!(matches!(node.kind, NodeKind::Binary(_)));
    }

    #[test]
    fn division_by_zero_is_left_alone() {
        let mut node = binary(Op::Div, value(1), value(0));
        fold_node(&mut node);
        assert!(matches!(node.kind, NodeKind::Binary(_)));
    }

    #[test]
    fn references_are_not_literals() {
        let mut node = binary(
            Op::Add,
            Node::new(NodeKind::Ref("x".to_owned()), Span::default()),
            value(2),
        );
        fold_node(&mut node);
        assert!(matches!(node.kind, NodeKind::Binary(_)));
    }
}

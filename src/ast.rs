use crate::position::Span;
use crate::value::Number;
use std::rc::Rc;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "^")]
    Power,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UnaryOperator {
    #[strum(serialize = "+")]
    Identity,
    #[strum(serialize = "-")]
    Negate,
    #[strum(serialize = "NOT")]
    Not,
}

#[derive(Debug)]
pub struct IfCase {
    pub condition: Node,
    pub body: Node,
    pub suppress_result: bool,
}

#[derive(Debug)]
pub struct ElseCase {
    pub body: Box<Node>,
    pub suppress_result: bool,
}

/// A procedure as written. Shared between the tree and every procedure value
/// created from it, so the body outlives the parse.
#[derive(Debug)]
pub struct ProcDef {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Node,
    pub block_form: bool,
}

#[derive(Debug)]
pub enum NodeKind {
    Number(Number),
    String(String),
    List(Vec<Node>),
    VarAccess(String),
    VarAssign {
        name: String,
        value: Box<Node>,
    },
    BinaryOp {
        left: Box<Node>,
        operator: BinaryOperator,
        right: Box<Node>,
    },
    UnaryOp {
        operator: UnaryOperator,
        operand: Box<Node>,
    },
    If {
        cases: Vec<IfCase>,
        else_case: Option<ElseCase>,
    },
    For {
        var_name: String,
        start: Box<Node>,
        end: Box<Node>,
        step: Option<Box<Node>>,
        body: Box<Node>,
        suppress_result: bool,
    },
    ProcDef(Rc<ProcDef>),
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    Block(Vec<Node>),
}

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Node {
        Node { kind, span }
    }

    pub fn accept<T>(&self, v: &mut dyn Visitor<Node, T>) -> T {
        v.visit(self)
    }
}

pub trait Visitor<T, Output> {
    fn visit(&mut self, n: &T) -> Output;
}

/// Renders a tree as an s-expression, for tests and debug logging.
pub struct AstPrinter {}

impl AstPrinter {
    fn parenthesize(&mut self, name: &str, args: Vec<&Node>) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for arg in args {
            x.push(' ');
            x.push_str(arg.accept(self).as_str());
        }
        x.push(')');
        x
    }
}

impl Visitor<Node, String> for AstPrinter {
    fn visit(&mut self, n: &Node) -> String {
        match &n.kind {
            NodeKind::Number(x) => x.to_string(),
            NodeKind::String(x) => format!("\"{}\"", x),
            NodeKind::List(elements) => self.parenthesize("list", elements.iter().collect()),
            NodeKind::VarAccess(name) => name.clone(),
            NodeKind::VarAssign { name, value } => {
                format!("(assign {} {})", name, value.accept(self))
            }
            NodeKind::BinaryOp {
                left,
                operator,
                right,
            } => self.parenthesize(&operator.to_string(), vec![left.as_ref(), right.as_ref()]),
            NodeKind::UnaryOp { operator, operand } => {
                self.parenthesize(&operator.to_string(), vec![operand.as_ref()])
            }
            NodeKind::If { cases, else_case } => {
                let mut x = String::from("(if");
                for case in cases {
                    x.push_str(&format!(
                        " ({} {})",
                        case.condition.accept(self),
                        case.body.accept(self)
                    ));
                }
                if let Some(else_case) = else_case {
                    x.push_str(&format!(" (else {})", else_case.body.accept(self)));
                }
                x.push(')');
                x
            }
            NodeKind::For {
                var_name,
                start,
                end,
                step,
                body,
                ..
            } => {
                let step = step
                    .as_ref()
                    .map(|step| format!(" step {}", step.accept(self)))
                    .unwrap_or_default();
                format!(
                    "(loop {} {} {}{} {})",
                    var_name,
                    start.accept(self),
                    end.accept(self),
                    step,
                    body.accept(self)
                )
            }
            NodeKind::ProcDef(def) => format!(
                "(proc {} ({}) {})",
                def.name.as_deref().unwrap_or("_"),
                def.params.join(" "),
                def.body.accept(self)
            ),
            NodeKind::Call { callee, arguments } => {
                let mut args = vec![callee.as_ref()];
                args.extend(arguments.iter());
                self.parenthesize("call", args)
            }
            NodeKind::Block(statements) => {
                self.parenthesize("block", statements.iter().collect())
            }
        }
    }
}

#[cfg(test)]
mod ast_tests {
    use crate::ast::{AstPrinter, BinaryOperator, ElseCase, IfCase, Node, NodeKind, UnaryOperator};
    use crate::position::Span;
    use crate::value::Number;

    fn node(kind: NodeKind) -> Node {
        Node::new(kind, Span::default())
    }

    #[test]
    fn basic_ast_test() {
        let expression = node(NodeKind::BinaryOp {
            left: Box::new(node(NodeKind::UnaryOp {
                operator: UnaryOperator::Negate,
                operand: Box::new(node(NodeKind::Number(Number::Int(123)))),
            })),
            operator: BinaryOperator::Multiply,
            right: Box::new(node(NodeKind::Number(Number::Float(45.67)))),
        });
        let mut visitor = AstPrinter {};
        assert_eq!(expression.accept(&mut visitor), "(* (- 123) 45.67)");
    }

    #[test]
    fn statements_and_lists() {
        let block = node(NodeKind::Block(vec![
            node(NodeKind::VarAssign {
                name: "x".to_string(),
                value: Box::new(node(NodeKind::List(vec![node(NodeKind::String(
                    "a".to_string(),
                ))]))),
            }),
            node(NodeKind::VarAccess("x".to_string())),
        ]));
        let mut visitor = AstPrinter {};
        assert_eq!(
            block.accept(&mut visitor),
            "(block (assign x (list \"a\")) x)"
        );
    }

    #[test]
    fn nested_conditionals() {
        let inner = node(NodeKind::If {
            cases: vec![],
            else_case: Some(ElseCase {
                body: Box::new(node(NodeKind::Number(Number::Int(3)))),
                suppress_result: false,
            }),
        });
        let outer = node(NodeKind::If {
            cases: vec![IfCase {
                condition: node(NodeKind::VarAccess("x".to_string())),
                body: node(NodeKind::Number(Number::Int(1))),
                suppress_result: false,
            }],
            else_case: Some(ElseCase {
                body: Box::new(inner),
                suppress_result: false,
            }),
        });
        let mut visitor = AstPrinter {};
        assert_eq!(outer.accept(&mut visitor), "(if (x 1) (else (if (else 3))))");
    }
}

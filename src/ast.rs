use std::{cell::OnceCell, rc::Rc};

use crate::{
    diagnostics::SourceSpan,
    environment::Slot,
    function::FunctionDefinition,
    value::{Value, Variant},
};

/// Index of a node inside its [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "AddOperator",
            BinaryOp::Sub => "SubtractOperator",
            BinaryOp::Mul => "TimesOperator",
            BinaryOp::Div => "DivideOperator",
            BinaryOp::Equal => "ComparisonEqual",
            BinaryOp::NotEqual => "ComparisonNotEqualTo",
            BinaryOp::Less => "ComparisonLessThan",
            BinaryOp::LessEqual => "ComparisonLessThanOrEqualTo",
            BinaryOp::Greater => "ComparisonGreaterThan",
            BinaryOp::GreaterEqual => "ComparisonGreaterThanOrEqualTo",
            BinaryOp::And => "AndExpression",
            BinaryOp::Or => "OrExpression",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Plus => "UnaryPlusOperator",
            UnaryOp::Minus => "UnaryMinusOperator",
            UnaryOp::Not => "UnaryNotOperator",
        }
    }
}

/// Literal token text. Numeric tokens are parsed by the engine on first use.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(String),
    Float(String),
    String(String),
    Boolean(bool),
}

#[derive(Debug, Clone)]
pub struct ElseIf {
    pub guard: NodeId,
    pub body: NodeId,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub label: NodeId,
    pub body: NodeId,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Program root.
    Code(Vec<NodeId>),
    Block(Vec<NodeId>),
    FnDef {
        name: String,
        params: Vec<String>,
        body: NodeId,
        return_expr: Option<NodeId>,
    },
    /// Call in statement position; any return value is discarded.
    Call { name: String, args: Vec<NodeId> },
    /// Call in expression position; the target must declare a return expression.
    FnInvoke { name: String, args: Vec<NodeId> },
    If {
        guard: NodeId,
        then_branch: NodeId,
        else_ifs: Vec<ElseIf>,
        else_branch: Option<NodeId>,
    },
    While { guard: NodeId, body: NodeId },
    For {
        init: NodeId,
        guard: NodeId,
        step: NodeId,
        body: NodeId,
    },
    Switch {
        discriminant: NodeId,
        cases: Vec<SwitchCase>,
        default: Option<NodeId>,
    },
    Write(NodeId),
    Assign { target: String, value: NodeId },
    TypedAssign {
        variant: Variant,
        target: String,
        value: NodeId,
    },
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Unary { op: UnaryOp, operand: NodeId },
    Dereference(String),
    Literal(Literal),
}

/// What a node resolved to the first time it was evaluated.
#[derive(Debug, Clone)]
pub enum Resolved {
    Value(Value),
    Function(Rc<FunctionDefinition>),
    Slot(Slot),
}

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub span: SourceSpan,
    resolved: OnceCell<Resolved>,
}

impl Node {
    pub fn new(kind: NodeKind, span: SourceSpan) -> Self {
        Self {
            kind,
            span,
            resolved: OnceCell::new(),
        }
    }

    pub fn resolved(&self) -> Option<&Resolved> {
        self.resolved.get()
    }

    /// Fills the cache slot. A second fill is ignored and the first
    /// resolution is kept.
    pub fn resolve(&self, resolved: Resolved) -> &Resolved {
        self.resolved.get_or_init(|| resolved)
    }
}

/// Arena of syntax nodes with an optional root.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: NodeKind, span: SourceSpan) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind, span));
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn integer(&mut self, token: impl Into<String>) -> NodeId {
        self.push(
            NodeKind::Literal(Literal::Integer(token.into())),
            SourceSpan::default(),
        )
    }

    pub fn float(&mut self, token: impl Into<String>) -> NodeId {
        self.push(
            NodeKind::Literal(Literal::Float(token.into())),
            SourceSpan::default(),
        )
    }

    pub fn string(&mut self, text: impl Into<String>) -> NodeId {
        self.push(
            NodeKind::Literal(Literal::String(text.into())),
            SourceSpan::default(),
        )
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.push(
            NodeKind::Literal(Literal::Boolean(value)),
            SourceSpan::default(),
        )
    }

    pub fn dereference(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::Dereference(name.into()), SourceSpan::default())
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(NodeKind::Binary { op, lhs, rhs }, SourceSpan::default())
    }

    pub fn write(&mut self, operand: NodeId) -> NodeId {
        self.push(NodeKind::Write(operand), SourceSpan::default())
    }

    pub fn assign(&mut self, target: impl Into<String>, value: NodeId) -> NodeId {
        self.push(
            NodeKind::Assign {
                target: target.into(),
                value,
            },
            SourceSpan::default(),
        )
    }

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Block(statements), SourceSpan::default())
    }

    /// Wraps `statements` in a `Code` node and makes it the root.
    pub fn program(&mut self, statements: Vec<NodeId>) -> NodeId {
        let root = self.push(NodeKind::Code(statements), SourceSpan::default());
        self.set_root(root);
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_is_written_once() {
        let mut ast = Ast::new();
        let lit = ast.integer("1");
        let node = ast.node(lit);
        assert!(node.resolved().is_none());
        node.resolve(Resolved::Value(Value::Integer(1)));
        node.resolve(Resolved::Value(Value::Integer(2)));
        match node.resolved() {
            Some(Resolved::Value(v)) => assert_eq!(*v, Value::Integer(1)),
            other => panic!("unexpected cache content {other:?}"),
        }
    }

    #[test]
    fn program_sets_root() {
        let mut ast = Ast::new();
        let value = ast.integer("3");
        let write = ast.write(value);
        let root = ast.program(vec![write]);
        assert_eq!(ast.root(), Some(root));
        assert_eq!(ast.len(), 3);
    }
}

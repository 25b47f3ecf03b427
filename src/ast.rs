use crate::error::Span;
use crate::value::Value;

/// The language is expression-oriented: there is no statement form, so a
/// program is just an ordered sequence of expressions.
#[derive(Debug, Clone)]
pub struct Program {
    pub body: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal {
        value: Value,
        span: Span,
    },
    Variable {
        name: String,
        span: Span,
    },
    This {
        span: Span,
    },
    List {
        elements: Vec<Expr>,
        span: Span,
    },
    /// Object literal with insertion-ordered string keys: { a: 1, "b": 2 }
    Object {
        entries: Vec<(String, Expr)>,
        span: Span,
    },
    Assign {
        target: AssignTarget,
        value: Box<Expr>,
        span: Span,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },
    Logical {
        left: Box<Expr>,
        operator: LogicalOp,
        right: Box<Expr>,
        span: Span,
    },
    Function {
        params: Vec<String>,
        body: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    /// Index with an evaluated key: a[e]
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    /// Index with a literal string key: a.name
    Member {
        object: Box<Expr>,
        name: String,
        span: Span,
    },
    If {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
        span: Span,
    },
    While {
        condition: Box<Expr>,
        body: Box<Expr>,
        span: Span,
    },
    For {
        binding: String,
        iterable: Box<Expr>,
        body: Box<Expr>,
        span: Span,
    },
    /// Brace-delimited expression sequence evaluated in a fresh child scope;
    /// its value is the last expression's value.
    Block {
        body: Vec<Expr>,
        span: Span,
    },
    Return {
        value: Option<Box<Expr>>,
        span: Span,
    },
    Break {
        value: Option<Box<Expr>>,
        span: Span,
    },
    Continue {
        value: Option<Box<Expr>>,
        span: Span,
    },
}

/// Valid left-hand sides of an assignment. Anything else is rejected by the
/// parser, not the evaluator.
#[derive(Debug, Clone)]
pub enum AssignTarget {
    Variable {
        name: String,
        span: Span,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    Member {
        object: Box<Expr>,
        name: String,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Literal { span, .. } => span,
            Expr::Variable { span, .. } => span,
            Expr::This { span } => span,
            Expr::List { span, .. } => span,
            Expr::Object { span, .. } => span,
            Expr::Assign { span, .. } => span,
            Expr::Unary { span, .. } => span,
            Expr::Binary { span, .. } => span,
            Expr::Logical { span, .. } => span,
            Expr::Function { span, .. } => span,
            Expr::Call { span, .. } => span,
            Expr::Index { span, .. } => span,
            Expr::Member { span, .. } => span,
            Expr::If { span, .. } => span,
            Expr::While { span, .. } => span,
            Expr::For { span, .. } => span,
            Expr::Block { span, .. } => span,
            Expr::Return { span, .. } => span,
            Expr::Break { span, .. } => span,
            Expr::Continue { span, .. } => span,
        }
    }
}

impl AssignTarget {
    pub fn span(&self) -> &Span {
        match self {
            AssignTarget::Variable { span, .. } => span,
            AssignTarget::Index { span, .. } => span,
            AssignTarget::Member { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone)]
pub enum LogicalOp {
    And,
    Or,
}

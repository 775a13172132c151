use super::{FunctionDef, Identifier};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    Template {
        quasis: Vec<String>,
        expressions: Vec<Expression>,
    },
    RegExp {
        pattern: String,
        flags: String,
    },
    Array(Vec<ArrayElement>),
    Object(Vec<ObjectMember>),
    Function(Rc<FunctionDef>),
    This,

    // Variables and access
    Identifier(Identifier),
    Member {
        object: Box<Expression>,
        property: MemberProperty,
        optional: bool,
    },

    // Calls
    Call {
        callee: Box<Expression>,
        arguments: Vec<ArrayElement>,
        optional: bool,
    },
    New {
        callee: Box<Expression>,
        arguments: Vec<ArrayElement>,
    },

    // Operators
    Unary {
        operator: UnaryOp,
        operand: Box<Expression>,
    },
    Update {
        operator: UpdateOp,
        prefix: bool,
        target: Box<Expression>,
    },
    Binary {
        operator: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Logical {
        operator: LogicalOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
    Assign {
        operator: AssignOp,
        target: Box<Expression>,
        value: Box<Expression>,
    },
}

impl Expression {
    pub fn identifier(name: impl Into<String>) -> Self {
        Expression::Identifier(Identifier::new(name))
    }

    pub fn member(object: Expression, name: impl Into<String>) -> Self {
        Expression::Member {
            object: Box::new(object),
            property: MemberProperty::Named(name.into()),
            optional: false,
        }
    }

    pub fn call(callee: Expression, arguments: Vec<Expression>) -> Self {
        Expression::Call {
            callee: Box::new(callee),
            arguments: arguments.into_iter().map(ArrayElement::Expression).collect(),
            optional: false,
        }
    }

    /// True when the expression can appear on the left of `=`.
    pub fn is_assignment_target(&self) -> bool {
        matches!(self, Expression::Identifier(_) | Expression::Member { optional: false, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberProperty {
    Named(String),
    Computed(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayElement {
    Expression(Expression),
    Spread(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectMember {
    Property { key: PropertyKey, value: Expression },
    Spread(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyKey {
    Static(String),
    Computed(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    BitNot,
    Negate,
    Plus,
    TypeOf,
    Void,
    Await,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Exponent,
    StrictEqual,
    StrictNotEqual,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    InstanceOf,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
    OrAssign,
    AndAssign,
    NullishAssign,
}

impl AssignOp {
    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "=" => AssignOp::Assign,
            "+=" => AssignOp::AddAssign,
            "-=" => AssignOp::SubtractAssign,
            "*=" => AssignOp::MultiplyAssign,
            "/=" => AssignOp::DivideAssign,
            "%=" => AssignOp::ModuloAssign,
            "||=" => AssignOp::OrAssign,
            "&&=" => AssignOp::AndAssign,
            "??=" => AssignOp::NullishAssign,
            _ => return None,
        })
    }
}

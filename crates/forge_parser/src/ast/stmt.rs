use super::{Expression, FunctionDef, ImportDecl, Pattern, VarKind, VariableDeclarator};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    // Declarations (function declarations are hoisted by the runtime)
    FunctionDecl(Rc<FunctionDef>),
    Variable {
        kind: VarKind,
        declarations: Vec<VariableDeclarator>,
    },
    Import(ImportDecl),

    Expression(Expression),

    // Control flow
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },

    For {
        init: Option<ForInit>,
        test: Option<Expression>,
        update: Option<Expression>,
        body: Box<Statement>,
    },

    ForEach {
        kind: Option<VarKind>,
        pattern: Pattern,
        iteration: IterationKind,
        iterable: Expression,
        body: Box<Statement>,
    },

    While {
        condition: Expression,
        body: Box<Statement>,
    },

    DoWhile {
        body: Box<Statement>,
        condition: Expression,
    },

    Switch {
        discriminant: Expression,
        cases: Vec<SwitchCase>,
    },

    Return(Option<Expression>),
    Break,
    Continue,
    Throw(Expression),

    Try {
        block: Vec<Statement>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Statement>>,
    },

    Block(Vec<Statement>),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForInit {
    Variable {
        kind: VarKind,
        declarations: Vec<VariableDeclarator>,
    },
    Expression(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IterationKind {
    /// `for (const item of items)`
    Of,
    /// `for (const key in object)`
    In,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// `None` for the `default:` clause
    pub test: Option<Expression>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Statement>,
}

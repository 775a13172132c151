use super::{Expression, Identifier, Statement};
use serde::{Deserialize, Serialize};

/// A function value: declaration, expression, arrow or object method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: Option<Identifier>,
    pub params: Vec<Parameter>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionBody {
    Block(Vec<Statement>),
    /// Concise arrow body: `x => x * 2`
    Expression(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub pattern: Pattern,
    pub default: Option<Expression>,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    Identifier(Identifier),
    Object {
        properties: Vec<PatternProperty>,
        rest: Option<Identifier>,
    },
    Array {
        /// `None` marks a hole: `const [, second] = pair`
        elements: Vec<Option<PatternElement>>,
        rest: Option<Box<Pattern>>,
    },
}

impl Pattern {
    /// Every identifier this pattern binds, depth first.
    pub fn bound_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Pattern::Identifier(id) => out.push(id.as_str()),
            Pattern::Object { properties, rest } => {
                for prop in properties {
                    prop.value.collect_names(out);
                }
                if let Some(rest) = rest {
                    out.push(rest.as_str());
                }
            }
            Pattern::Array { elements, rest } => {
                for element in elements.iter().flatten() {
                    element.pattern.collect_names(out);
                }
                if let Some(rest) = rest {
                    rest.collect_names(out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternProperty {
    pub key: String,
    pub value: Pattern,
    pub default: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternElement {
    pub pattern: Pattern,
    pub default: Option<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    Const,
    Let,
    Var,
}

impl VarKind {
    pub fn from_keyword(s: &str) -> Self {
        match s {
            "const" => VarKind::Const,
            "let" => VarKind::Let,
            _ => VarKind::Var,
        }
    }

    pub fn is_mutable(self) -> bool {
        !matches!(self, VarKind::Const)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclarator {
    pub pattern: Pattern,
    pub init: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub source: String,
    pub default: Option<Identifier>,
    pub namespace: Option<Identifier>,
    /// (imported name, local binding)
    pub named: Vec<(String, Identifier)>,
}

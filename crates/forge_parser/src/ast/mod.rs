pub mod expr;
pub mod stmt;
pub mod decl;

pub use expr::*;
pub use stmt::*;
pub use decl::*;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Statement>,
}

impl Program {
    /// Names bound by top-level function declarations, in source order.
    pub fn declared_functions(&self) -> Vec<&str> {
        self.body
            .iter()
            .filter_map(|stmt| match stmt {
                Statement::FunctionDecl(func) => func.name.as_ref().map(|n| n.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Identifier(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

use std::fmt;

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

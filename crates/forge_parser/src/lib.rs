pub mod ast;
pub mod parser;
mod jsx;

pub use ast::*;
pub use parser::{parse_program, parse_expression_str, ParseError, ParseResult};

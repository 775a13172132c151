use pest::Parser;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;
use std::rc::Rc;
use std::sync::LazyLock;

use crate::ast::*;
use crate::jsx;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct ScriptParser;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{0}")]
    PestError(#[from] pest::error::Error<Rule>),

    #[error("Expected corresponding JSX closing tag for <{opened}>, found </{closed}>")]
    MismatchedClosingTag { opened: String, closed: String },

    #[error("Invalid left-hand side in assignment")]
    InvalidAssignmentTarget,

    #[error("JSX attributes must only be assigned a non-empty expression")]
    EmptyAttributeExpression,

    #[error("Unexpected rule: {0:?}")]
    UnexpectedRule(Rule),

    #[error("Parse error: {0}")]
    Custom(String),
}

impl ParseError {
    /// 1-based (line, column) of the failure, when the grammar reported one.
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            ParseError::PestError(err) => match err.line_col {
                LineColLocation::Pos(pos) => Some(pos),
                LineColLocation::Span(start, _) => Some(start),
            },
            _ => None,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

static PRATT: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::op_nullish, Assoc::Left))
        .op(Op::infix(Rule::op_or, Assoc::Left))
        .op(Op::infix(Rule::op_and, Assoc::Left))
        .op(Op::infix(Rule::op_bit_or, Assoc::Left))
        .op(Op::infix(Rule::op_bit_xor, Assoc::Left))
        .op(Op::infix(Rule::op_bit_and, Assoc::Left))
        .op(Op::infix(Rule::op_strict_eq, Assoc::Left)
            | Op::infix(Rule::op_strict_ne, Assoc::Left)
            | Op::infix(Rule::op_eq, Assoc::Left)
            | Op::infix(Rule::op_ne, Assoc::Left))
        .op(Op::infix(Rule::op_lt, Assoc::Left)
            | Op::infix(Rule::op_le, Assoc::Left)
            | Op::infix(Rule::op_gt, Assoc::Left)
            | Op::infix(Rule::op_ge, Assoc::Left)
            | Op::infix(Rule::op_instanceof, Assoc::Left))
        .op(Op::infix(Rule::op_shl, Assoc::Left)
            | Op::infix(Rule::op_shr, Assoc::Left)
            | Op::infix(Rule::op_ushr, Assoc::Left))
        .op(Op::infix(Rule::op_add, Assoc::Left) | Op::infix(Rule::op_sub, Assoc::Left))
        .op(Op::infix(Rule::op_mul, Assoc::Left)
            | Op::infix(Rule::op_div, Assoc::Left)
            | Op::infix(Rule::op_mod, Assoc::Left))
        .op(Op::infix(Rule::op_pow, Assoc::Right))
});

pub fn parse_program(source: &str) -> ParseResult<Program> {
    // Strip the BOM once here for all callers
    let source = source.trim_start_matches('\u{feff}');
    let pairs = ScriptParser::parse(Rule::program, source)?;
    let mut body = Vec::new();

    for pair in pairs {
        if pair.as_rule() != Rule::program {
            continue;
        }
        for inner in pair.into_inner() {
            if inner.as_rule() == Rule::EOI {
                continue;
            }
            body.push(build_statement(inner)?);
        }
    }

    Ok(Program { body })
}

pub fn parse_expression_str(source: &str) -> ParseResult<Expression> {
    let mut pairs = ScriptParser::parse(Rule::standalone_expression, source)?;
    let wrapper = pairs
        .next()
        .ok_or_else(|| ParseError::Custom("No expression found".to_string()))?;
    let expr = wrapper
        .into_inner()
        .find(|p| p.as_rule() == Rule::expression)
        .ok_or_else(|| ParseError::Custom("No expression found".to_string()))?;
    build_expression(expr)
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_async
            | Rule::kw_as
            | Rule::kw_break
            | Rule::kw_case
            | Rule::kw_catch
            | Rule::kw_continue
            | Rule::kw_default
            | Rule::kw_do
            | Rule::kw_else
            | Rule::kw_export
            | Rule::kw_finally
            | Rule::kw_for
            | Rule::kw_from
            | Rule::kw_function
            | Rule::kw_if
            | Rule::kw_import
            | Rule::kw_in
            | Rule::kw_new
            | Rule::kw_of
            | Rule::kw_return
            | Rule::kw_switch
            | Rule::kw_throw
            | Rule::kw_try
            | Rule::kw_while
    )
}

/// Inner pairs of `pair` with keyword tokens removed.
fn significant(pair: Pair<'_, Rule>) -> Vec<Pair<'_, Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule())).collect()
}

fn expect_next<'a>(
    iter: &mut impl Iterator<Item = Pair<'a, Rule>>,
    context: &str,
) -> ParseResult<Pair<'a, Rule>> {
    iter.next()
        .ok_or_else(|| ParseError::Custom(format!("Incomplete {}", context)))
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

pub(crate) fn build_statement(pair: Pair<Rule>) -> ParseResult<Statement> {
    match pair.as_rule() {
        Rule::import_declaration => Ok(Statement::Import(build_import(pair)?)),
        Rule::export_declaration => {
            let inner = significant(pair);
            match inner.into_iter().next() {
                Some(p) if p.as_rule() == Rule::export_list => Ok(Statement::Empty),
                Some(p) => build_statement(p),
                None => Ok(Statement::Empty),
            }
        }
        Rule::function_declaration => {
            Ok(Statement::FunctionDecl(Rc::new(build_function(pair)?)))
        }
        Rule::variable_statement => {
            let (kind, declarations) = build_variable_list(pair)?;
            Ok(Statement::Variable { kind, declarations })
        }
        Rule::if_statement => {
            let mut inner = significant(pair).into_iter();
            let condition = build_expression(expect_next(&mut inner, "if statement")?)?;
            let then_branch = Box::new(build_statement(expect_next(&mut inner, "if statement")?)?);
            let else_branch = match inner.next() {
                Some(p) => Some(Box::new(build_statement(p)?)),
                None => None,
            };
            Ok(Statement::If { condition, then_branch, else_branch })
        }
        Rule::for_each_statement => {
            let mut kind = None;
            let mut pattern = None;
            let mut iteration = IterationKind::Of;
            let mut iterable = None;
            let mut body = None;
            for p in pair.into_inner() {
                match p.as_rule() {
                    Rule::kw_for => {}
                    Rule::var_kind => kind = Some(VarKind::from_keyword(p.as_str())),
                    Rule::kw_of => iteration = IterationKind::Of,
                    Rule::kw_in => iteration = IterationKind::In,
                    Rule::identifier | Rule::object_pattern | Rule::array_pattern
                        if pattern.is_none() =>
                    {
                        pattern = Some(build_pattern(p)?);
                    }
                    Rule::expression if iterable.is_none() => iterable = Some(build_expression(p)?),
                    _ => body = Some(build_statement(p)?),
                }
            }
            Ok(Statement::ForEach {
                kind,
                pattern: pattern.ok_or_else(|| ParseError::Custom("for loop without binding".into()))?,
                iteration,
                iterable: iterable.ok_or_else(|| ParseError::Custom("for loop without iterable".into()))?,
                body: Box::new(body.ok_or_else(|| ParseError::Custom("for loop without body".into()))?),
            })
        }
        Rule::for_statement => {
            let mut init = None;
            let mut test = None;
            let mut update = None;
            let mut body = None;
            for p in pair.into_inner() {
                match p.as_rule() {
                    Rule::kw_for => {}
                    Rule::for_init => init = Some(build_for_init(p)?),
                    Rule::for_test => test = Some(build_expression(first_inner(p)?)?),
                    Rule::for_update => update = Some(build_expression(first_inner(p)?)?),
                    _ => body = Some(build_statement(p)?),
                }
            }
            Ok(Statement::For {
                init,
                test,
                update,
                body: Box::new(body.ok_or_else(|| ParseError::Custom("for loop without body".into()))?),
            })
        }
        Rule::while_statement => {
            let mut inner = significant(pair).into_iter();
            let condition = build_expression(expect_next(&mut inner, "while statement")?)?;
            let body = Box::new(build_statement(expect_next(&mut inner, "while statement")?)?);
            Ok(Statement::While { condition, body })
        }
        Rule::do_while_statement => {
            let mut inner = significant(pair).into_iter();
            let body = Box::new(build_statement(expect_next(&mut inner, "do statement")?)?);
            let condition = build_expression(expect_next(&mut inner, "do statement")?)?;
            Ok(Statement::DoWhile { body, condition })
        }
        Rule::switch_statement => {
            let mut inner = significant(pair).into_iter();
            let discriminant = build_expression(expect_next(&mut inner, "switch statement")?)?;
            let mut cases = Vec::new();
            for case in inner {
                let mut test = None;
                let mut body = Vec::new();
                for p in case.into_inner() {
                    match p.as_rule() {
                        Rule::kw_case | Rule::kw_default => {}
                        Rule::expression if test.is_none() && body.is_empty() => {
                            test = Some(build_expression(p)?);
                        }
                        _ => body.push(build_statement(p)?),
                    }
                }
                cases.push(SwitchCase { test, body });
            }
            Ok(Statement::Switch { discriminant, cases })
        }
        Rule::return_statement => {
            let value = match significant(pair).into_iter().next() {
                Some(p) => Some(build_expression(p)?),
                None => None,
            };
            Ok(Statement::Return(value))
        }
        Rule::break_statement => Ok(Statement::Break),
        Rule::continue_statement => Ok(Statement::Continue),
        Rule::throw_statement => {
            let mut inner = significant(pair).into_iter();
            Ok(Statement::Throw(build_expression(expect_next(&mut inner, "throw statement")?)?))
        }
        Rule::try_statement => {
            let mut block = Vec::new();
            let mut handler = None;
            let mut finalizer = None;
            for p in pair.into_inner() {
                match p.as_rule() {
                    Rule::block => block = build_block(p)?,
                    Rule::catch_clause => {
                        let mut param = None;
                        let mut body = Vec::new();
                        for c in p.into_inner() {
                            match c.as_rule() {
                                Rule::block => body = build_block(c)?,
                                Rule::identifier | Rule::object_pattern | Rule::array_pattern => {
                                    param = Some(build_pattern(c)?)
                                }
                                _ => {}
                            }
                        }
                        handler = Some(CatchClause { param, body });
                    }
                    Rule::finally_clause => {
                        for c in p.into_inner() {
                            if c.as_rule() == Rule::block {
                                finalizer = Some(build_block(c)?);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Statement::Try { block, handler, finalizer })
        }
        Rule::block => Ok(Statement::Block(build_block(pair)?)),
        Rule::empty_statement => Ok(Statement::Empty),
        Rule::expression_statement => {
            let expr = first_inner(pair)?;
            Ok(Statement::Expression(build_expression(expr)?))
        }
        other => Err(ParseError::UnexpectedRule(other)),
    }
}

fn first_inner(pair: Pair<Rule>) -> ParseResult<Pair<Rule>> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or(ParseError::UnexpectedRule(rule))
}

fn build_block(pair: Pair<Rule>) -> ParseResult<Vec<Statement>> {
    pair.into_inner().map(build_statement).collect()
}

fn build_variable_list(pair: Pair<Rule>) -> ParseResult<(VarKind, Vec<VariableDeclarator>)> {
    let mut kind = VarKind::Var;
    let mut declarations = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::var_kind => kind = VarKind::from_keyword(p.as_str()),
            Rule::variable_declarator => declarations.push(build_declarator(p)?),
            _ => {}
        }
    }
    Ok((kind, declarations))
}

fn build_declarator(pair: Pair<Rule>) -> ParseResult<VariableDeclarator> {
    let mut pattern = None;
    let mut init = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::pattern_default => init = Some(build_pattern_default(p)?),
            _ => pattern = Some(build_pattern(p)?),
        }
    }
    Ok(VariableDeclarator {
        pattern: pattern.ok_or_else(|| ParseError::Custom("Missing variable name".into()))?,
        init,
    })
}

fn build_for_init(pair: Pair<Rule>) -> ParseResult<ForInit> {
    let inner: Vec<_> = pair.into_inner().collect();
    if let Some(first) = inner.first() {
        if first.as_rule() == Rule::expression {
            return Ok(ForInit::Expression(build_expression(first.clone())?));
        }
    }
    let mut kind = VarKind::Var;
    let mut declarations = Vec::new();
    for p in inner {
        match p.as_rule() {
            Rule::var_kind => kind = VarKind::from_keyword(p.as_str()),
            Rule::variable_declarator => declarations.push(build_declarator(p)?),
            _ => {}
        }
    }
    Ok(ForInit::Variable { kind, declarations })
}

fn build_import(pair: Pair<Rule>) -> ParseResult<ImportDecl> {
    let mut decl = ImportDecl {
        source: String::new(),
        default: None,
        namespace: None,
        named: Vec::new(),
    };
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::string => decl.source = build_string(p)?,
            Rule::import_clause => {
                for clause in p.into_inner() {
                    match clause.as_rule() {
                        Rule::import_default => {
                            decl.default = Some(Identifier::new(clause.as_str().trim()));
                        }
                        Rule::import_namespace => {
                            for n in clause.into_inner() {
                                if n.as_rule() == Rule::identifier {
                                    decl.namespace = Some(Identifier::new(n.as_str()));
                                }
                            }
                        }
                        Rule::named_imports => {
                            for spec in clause.into_inner() {
                                let mut parts = spec.into_inner().filter(|s| !is_keyword(s.as_rule()));
                                let imported = expect_next(&mut parts, "import specifier")?.as_str().to_string();
                                let local = parts
                                    .next()
                                    .map(|l| Identifier::new(l.as_str()))
                                    .unwrap_or_else(|| Identifier::new(imported.clone()));
                                decl.named.push((imported, local));
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    Ok(decl)
}

// ---------------------------------------------------------------------------
// Functions and patterns
// ---------------------------------------------------------------------------

fn build_function(pair: Pair<Rule>) -> ParseResult<FunctionDef> {
    let mut def = FunctionDef {
        name: None,
        params: Vec::new(),
        body: FunctionBody::Block(Vec::new()),
        is_arrow: false,
        is_async: false,
    };
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_async => def.is_async = true,
            Rule::identifier | Rule::property_name => def.name = Some(Identifier::new(p.as_str())),
            Rule::param_list => def.params = build_params(p)?,
            Rule::block => def.body = FunctionBody::Block(build_block(p)?),
            _ => {}
        }
    }
    Ok(def)
}

fn build_arrow(pair: Pair<Rule>) -> ParseResult<FunctionDef> {
    let mut def = FunctionDef {
        name: None,
        params: Vec::new(),
        body: FunctionBody::Block(Vec::new()),
        is_arrow: true,
        is_async: false,
    };
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_async => def.is_async = true,
            Rule::arrow_params => {
                for param in p.into_inner() {
                    match param.as_rule() {
                        Rule::identifier => def.params.push(Parameter {
                            pattern: Pattern::Identifier(Identifier::new(param.as_str())),
                            default: None,
                            rest: false,
                        }),
                        Rule::param_list => def.params = build_params(param)?,
                        _ => {}
                    }
                }
            }
            Rule::arrow_body => {
                let body = first_inner(p)?;
                def.body = match body.as_rule() {
                    Rule::block => FunctionBody::Block(build_block(body)?),
                    _ => FunctionBody::Expression(Box::new(build_expression(body)?)),
                };
            }
            _ => {}
        }
    }
    Ok(def)
}

fn build_params(pair: Pair<Rule>) -> ParseResult<Vec<Parameter>> {
    let mut params = Vec::new();
    for param in pair.into_inner() {
        let mut pattern = None;
        let mut default = None;
        let mut rest = false;
        for p in param.into_inner() {
            match p.as_rule() {
                Rule::rest_pattern => {
                    rest = true;
                    pattern = Some(build_pattern(first_inner(p)?)?);
                }
                Rule::pattern_default => default = Some(build_pattern_default(p)?),
                _ => pattern = Some(build_pattern(p)?),
            }
        }
        params.push(Parameter {
            pattern: pattern.ok_or_else(|| ParseError::Custom("Missing parameter name".into()))?,
            default,
            rest,
        });
    }
    Ok(params)
}

fn build_pattern_default(pair: Pair<Rule>) -> ParseResult<Expression> {
    build_expression(first_inner(pair)?)
}

fn build_pattern(pair: Pair<Rule>) -> ParseResult<Pattern> {
    match pair.as_rule() {
        Rule::identifier => Ok(Pattern::Identifier(Identifier::new(pair.as_str()))),
        Rule::object_pattern => {
            let mut properties = Vec::new();
            let mut rest = None;
            for member in pair.into_inner() {
                match member.as_rule() {
                    Rule::rest_pattern => match build_pattern(first_inner(member)?)? {
                        Pattern::Identifier(id) => rest = Some(id),
                        _ => return Err(ParseError::Custom("Object rest must be an identifier".into())),
                    },
                    Rule::pattern_property => {
                        let mut parts = member.into_inner();
                        let key = expect_next(&mut parts, "destructuring property")?.as_str().to_string();
                        let mut value = Pattern::Identifier(Identifier::new(key.clone()));
                        let mut default = None;
                        for p in parts {
                            match p.as_rule() {
                                Rule::pattern_default => default = Some(build_pattern_default(p)?),
                                _ => value = build_pattern(p)?,
                            }
                        }
                        properties.push(PatternProperty { key, value, default });
                    }
                    other => return Err(ParseError::UnexpectedRule(other)),
                }
            }
            Ok(Pattern::Object { properties, rest })
        }
        Rule::array_pattern => {
            let mut elements = Vec::new();
            let mut rest = None;
            for slot in pair.into_inner() {
                let mut pattern = None;
                let mut default = None;
                for p in slot.into_inner() {
                    match p.as_rule() {
                        Rule::rest_pattern => rest = Some(Box::new(build_pattern(first_inner(p)?)?)),
                        Rule::pattern_default => default = Some(build_pattern_default(p)?),
                        _ => pattern = Some(build_pattern(p)?),
                    }
                }
                if rest.is_some() {
                    break;
                }
                elements.push(pattern.map(|pattern| PatternElement { pattern, default }));
            }
            // A trailing comma leaves one empty slot behind.
            if matches!(elements.last(), Some(None)) {
                elements.pop();
            }
            Ok(Pattern::Array { elements, rest })
        }
        other => Err(ParseError::UnexpectedRule(other)),
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

pub(crate) fn build_expression(pair: Pair<Rule>) -> ParseResult<Expression> {
    match pair.as_rule() {
        Rule::expression => build_expression(first_inner(pair)?),
        Rule::arrow_function => Ok(Expression::Function(Rc::new(build_arrow(pair)?))),
        Rule::conditional_expression => build_conditional(pair),
        _ => build_primary(pair),
    }
}

fn build_conditional(pair: Pair<Rule>) -> ParseResult<Expression> {
    let mut inner = pair.into_inner();
    let head = build_binary(expect_next(&mut inner, "expression")?)?;
    let Some(tail) = inner.next() else {
        return Ok(head);
    };

    match tail.as_rule() {
        Rule::assignment_tail => {
            let mut parts = tail.into_inner();
            let op_pair = expect_next(&mut parts, "assignment")?;
            let operator = AssignOp::from_str(op_pair.as_str())
                .ok_or_else(|| ParseError::Custom(format!("Unknown operator {}", op_pair.as_str())))?;
            if !head.is_assignment_target() {
                return Err(ParseError::InvalidAssignmentTarget);
            }
            let value = build_expression(expect_next(&mut parts, "assignment")?)?;
            Ok(Expression::Assign {
                operator,
                target: Box::new(head),
                value: Box::new(value),
            })
        }
        Rule::ternary_tail => {
            let mut parts = tail.into_inner();
            let consequent = build_expression(expect_next(&mut parts, "conditional")?)?;
            let alternate = build_expression(expect_next(&mut parts, "conditional")?)?;
            Ok(Expression::Conditional {
                test: Box::new(head),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            })
        }
        other => Err(ParseError::UnexpectedRule(other)),
    }
}

fn build_binary(pair: Pair<Rule>) -> ParseResult<Expression> {
    PRATT
        .map_primary(build_unary)
        .map_infix(|lhs, op, rhs| {
            let left = Box::new(lhs?);
            let right = Box::new(rhs?);
            let logical = match op.as_rule() {
                Rule::op_and => Some(LogicalOp::And),
                Rule::op_or => Some(LogicalOp::Or),
                Rule::op_nullish => Some(LogicalOp::Nullish),
                _ => None,
            };
            if let Some(operator) = logical {
                return Ok(Expression::Logical { operator, left, right });
            }
            let operator = match op.as_rule() {
                Rule::op_add => BinaryOp::Add,
                Rule::op_sub => BinaryOp::Subtract,
                Rule::op_mul => BinaryOp::Multiply,
                Rule::op_div => BinaryOp::Divide,
                Rule::op_mod => BinaryOp::Modulo,
                Rule::op_pow => BinaryOp::Exponent,
                Rule::op_strict_eq => BinaryOp::StrictEqual,
                Rule::op_strict_ne => BinaryOp::StrictNotEqual,
                Rule::op_eq => BinaryOp::Equal,
                Rule::op_ne => BinaryOp::NotEqual,
                Rule::op_lt => BinaryOp::LessThan,
                Rule::op_le => BinaryOp::LessThanOrEqual,
                Rule::op_gt => BinaryOp::GreaterThan,
                Rule::op_ge => BinaryOp::GreaterThanOrEqual,
                Rule::op_instanceof => BinaryOp::InstanceOf,
                Rule::op_bit_and => BinaryOp::BitAnd,
                Rule::op_bit_or => BinaryOp::BitOr,
                Rule::op_bit_xor => BinaryOp::BitXor,
                Rule::op_shl => BinaryOp::ShiftLeft,
                Rule::op_shr => BinaryOp::ShiftRight,
                Rule::op_ushr => BinaryOp::UnsignedShiftRight,
                other => return Err(ParseError::UnexpectedRule(other)),
            };
            Ok(Expression::Binary { operator, left, right })
        })
        .parse(pair.into_inner())
}

fn build_unary(pair: Pair<Rule>) -> ParseResult<Expression> {
    let inner: Vec<_> = pair.into_inner().collect();
    let (operand, prefixes) = inner
        .split_last()
        .ok_or_else(|| ParseError::Custom("Empty unary expression".into()))?;
    let mut expr = build_postfix(operand.clone())?;

    for op in prefixes.iter().rev() {
        expr = match op.as_rule() {
            Rule::op_pre_inc | Rule::op_pre_dec => {
                if !expr.is_assignment_target() {
                    return Err(ParseError::InvalidAssignmentTarget);
                }
                Expression::Update {
                    operator: if op.as_rule() == Rule::op_pre_inc {
                        UpdateOp::Increment
                    } else {
                        UpdateOp::Decrement
                    },
                    prefix: true,
                    target: Box::new(expr),
                }
            }
            rule => {
                let operator = match rule {
                    Rule::op_not => UnaryOp::Not,
                    Rule::op_bit_not => UnaryOp::BitNot,
                    Rule::op_neg => UnaryOp::Negate,
                    Rule::op_plus => UnaryOp::Plus,
                    Rule::op_typeof => UnaryOp::TypeOf,
                    Rule::op_void => UnaryOp::Void,
                    Rule::op_await => UnaryOp::Await,
                    other => return Err(ParseError::UnexpectedRule(other)),
                };
                Expression::Unary { operator, operand: Box::new(expr) }
            }
        };
    }
    Ok(expr)
}

fn build_postfix(pair: Pair<Rule>) -> ParseResult<Expression> {
    let mut inner = pair.into_inner();
    let expr = build_call(expect_next(&mut inner, "expression")?)?;
    match inner.next() {
        Some(update) => {
            if !expr.is_assignment_target() {
                return Err(ParseError::InvalidAssignmentTarget);
            }
            Ok(Expression::Update {
                operator: if update.as_str() == "++" {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                },
                prefix: false,
                target: Box::new(expr),
            })
        }
        None => Ok(expr),
    }
}

fn build_call(pair: Pair<Rule>) -> ParseResult<Expression> {
    let mut inner = pair.into_inner();
    let head = expect_next(&mut inner, "expression")?;
    let mut expr = match head.as_rule() {
        Rule::new_expression => build_new(head)?,
        _ => build_primary(head)?,
    };

    for suffix in inner {
        expr = apply_suffix(expr, suffix)?;
    }
    Ok(expr)
}

fn apply_suffix(expr: Expression, suffix: Pair<Rule>) -> ParseResult<Expression> {
    Ok(match suffix.as_rule() {
        Rule::arguments => Expression::Call {
            callee: Box::new(expr),
            arguments: build_arguments(suffix)?,
            optional: false,
        },
        Rule::optional_call => Expression::Call {
            callee: Box::new(expr),
            arguments: build_arguments(first_inner(suffix)?)?,
            optional: true,
        },
        Rule::member_access | Rule::optional_member => {
            let optional = suffix.as_rule() == Rule::optional_member;
            Expression::Member {
                object: Box::new(expr),
                property: MemberProperty::Named(first_inner(suffix)?.as_str().to_string()),
                optional,
            }
        }
        Rule::index_access | Rule::optional_index => {
            let optional = suffix.as_rule() == Rule::optional_index;
            Expression::Member {
                object: Box::new(expr),
                property: MemberProperty::Computed(Box::new(build_expression(first_inner(suffix)?)?)),
                optional,
            }
        }
        other => return Err(ParseError::UnexpectedRule(other)),
    })
}

fn build_new(pair: Pair<Rule>) -> ParseResult<Expression> {
    let mut callee = None;
    let mut arguments = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::new_target => {
                let mut parts = p.into_inner();
                let mut target = build_primary(expect_next(&mut parts, "new expression")?)?;
                for member in parts {
                    target = apply_suffix(target, member)?;
                }
                callee = Some(target);
            }
            Rule::arguments => arguments = build_arguments(p)?,
            _ => {}
        }
    }
    Ok(Expression::New {
        callee: Box::new(callee.ok_or_else(|| ParseError::Custom("new without constructor".into()))?),
        arguments,
    })
}

fn build_arguments(pair: Pair<Rule>) -> ParseResult<Vec<ArrayElement>> {
    pair.into_inner().map(build_element).collect()
}

fn build_element(pair: Pair<Rule>) -> ParseResult<ArrayElement> {
    match pair.as_rule() {
        Rule::spread_element => Ok(ArrayElement::Spread(build_expression(first_inner(pair)?)?)),
        _ => Ok(ArrayElement::Expression(build_expression(pair)?)),
    }
}

fn build_primary(pair: Pair<Rule>) -> ParseResult<Expression> {
    match pair.as_rule() {
        Rule::jsx_element => jsx::lower_element(pair),
        Rule::function_expression => Ok(Expression::Function(Rc::new(build_function(pair)?))),
        Rule::arrow_function => Ok(Expression::Function(Rc::new(build_arrow(pair)?))),
        Rule::template_literal => build_template(pair),
        Rule::number => Ok(Expression::Number(parse_number(pair.as_str())?)),
        Rule::string => Ok(Expression::String(build_string(pair)?)),
        Rule::regex_literal => {
            let mut parts = pair.into_inner();
            let pattern = expect_next(&mut parts, "regex literal")?.as_str().to_string();
            let flags = parts.next().map(|f| f.as_str().to_string()).unwrap_or_default();
            Ok(Expression::RegExp { pattern, flags })
        }
        Rule::kw_true => Ok(Expression::Boolean(true)),
        Rule::kw_false => Ok(Expression::Boolean(false)),
        Rule::kw_null => Ok(Expression::Null),
        Rule::kw_this => Ok(Expression::This),
        Rule::array_literal => Ok(Expression::Array(
            pair.into_inner().map(build_element).collect::<ParseResult<_>>()?,
        )),
        Rule::object_literal => build_object(pair),
        Rule::paren_expression => build_expression(first_inner(pair)?),
        Rule::identifier => Ok(Expression::Identifier(Identifier::new(pair.as_str()))),
        Rule::expression | Rule::conditional_expression => build_expression(pair),
        other => Err(ParseError::UnexpectedRule(other)),
    }
}

fn build_object(pair: Pair<Rule>) -> ParseResult<Expression> {
    let mut members = Vec::new();
    for member in pair.into_inner() {
        match member.as_rule() {
            Rule::spread_element => {
                members.push(ObjectMember::Spread(build_expression(first_inner(member)?)?));
            }
            Rule::method_definition => {
                let def = build_function(member)?;
                let key = def
                    .name
                    .as_ref()
                    .map(|n| n.as_str().to_string())
                    .unwrap_or_default();
                members.push(ObjectMember::Property {
                    key: PropertyKey::Static(key),
                    value: Expression::Function(Rc::new(def)),
                });
            }
            Rule::property_assignment => {
                let mut parts = member.into_inner();
                let key_pair = first_inner(expect_next(&mut parts, "object property")?)?;
                let key = match key_pair.as_rule() {
                    Rule::string => PropertyKey::Static(build_string(key_pair)?),
                    Rule::number => PropertyKey::Static(canonical_number(parse_number(key_pair.as_str())?)),
                    Rule::computed_key => PropertyKey::Computed(build_expression(first_inner(key_pair)?)?),
                    _ => PropertyKey::Static(key_pair.as_str().to_string()),
                };
                let value = build_expression(expect_next(&mut parts, "object property")?)?;
                members.push(ObjectMember::Property { key, value });
            }
            Rule::shorthand_property => {
                let name = member.as_str().trim().to_string();
                members.push(ObjectMember::Property {
                    key: PropertyKey::Static(name.clone()),
                    value: Expression::Identifier(Identifier::new(name)),
                });
            }
            other => return Err(ParseError::UnexpectedRule(other)),
        }
    }
    Ok(Expression::Object(members))
}

fn build_template(pair: Pair<Rule>) -> ParseResult<Expression> {
    let mut quasis = Vec::new();
    let mut expressions = Vec::new();
    let mut current = String::new();
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::template_chars => current.push_str(&unescape(part.as_str())),
            Rule::template_substitution => {
                quasis.push(std::mem::take(&mut current));
                expressions.push(build_expression(first_inner(part)?)?);
            }
            other => return Err(ParseError::UnexpectedRule(other)),
        }
    }
    quasis.push(current);
    Ok(Expression::Template { quasis, expressions })
}

fn build_string(pair: Pair<Rule>) -> ParseResult<String> {
    let body = first_inner(pair)?;
    Ok(unescape(body.as_str()))
}

fn parse_number(text: &str) -> ParseResult<f64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .map_err(|_| ParseError::Custom(format!("Invalid number {}", text)));
    }
    text.parse::<f64>()
        .map_err(|_| ParseError::Custom(format!("Invalid number {}", text)))
}

fn canonical_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Resolve backslash escapes in string and template literal bodies.
pub(crate) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(esc) = chars.next() else {
            out.push('\\');
            break;
        };
        match esc {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            '\n' => {}
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => out.push_str(&hex),
                }
            }
            'u' => {
                let code = if chars.peek() == Some(&'{') {
                    chars.next();
                    let hex: String = chars.by_ref().take_while(|ch| *ch != '}').collect();
                    u32::from_str_radix(&hex, 16).ok()
                } else {
                    let hex: String = chars.by_ref().take(4).collect();
                    u32::from_str_radix(&hex, 16).ok()
                };
                if let Some(ch) = code.and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            other => out.push(other),
        }
    }
    out
}

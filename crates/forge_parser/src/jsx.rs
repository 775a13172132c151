//! Lowering of JSX markup into `React.createElement` calls.
//!
//! `<Card title="x">hi</Card>` becomes
//! `React.createElement(Card, { title: "x" }, "hi")`. Intrinsic tags
//! (lowercase, or containing a dash) lower to a string literal; anything
//! else is looked up as a binding when the element is created.

use pest::iterators::Pair;

use crate::ast::*;
use crate::parser::{ParseError, ParseResult, Rule, build_expression};

pub(crate) fn lower_element(pair: Pair<Rule>) -> ParseResult<Expression> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::Custom("Empty JSX element".into()))?;

    match inner.as_rule() {
        Rule::jsx_fragment => {
            let children = lower_children(inner.into_inner())?;
            let fragment = Expression::member(Expression::identifier("React"), "Fragment");
            Ok(create_element(fragment, None, children))
        }
        Rule::jsx_tag => lower_tag(inner),
        other => Err(ParseError::UnexpectedRule(other)),
    }
}

fn lower_tag(pair: Pair<Rule>) -> ParseResult<Expression> {
    let mut parts = pair.into_inner();
    let name_pair = parts
        .next()
        .ok_or_else(|| ParseError::Custom("JSX tag without a name".into()))?;
    let name = name_pair.as_str().to_string();

    let mut props: Option<Vec<ObjectMember>> = None;
    let mut children = Vec::new();

    for part in parts {
        match part.as_rule() {
            Rule::jsx_attribute => {
                let member = lower_attribute(part)?;
                props.get_or_insert_with(Vec::new).push(member);
            }
            Rule::jsx_self_close => {}
            Rule::jsx_tag_body => {
                let body: Vec<_> = part.into_inner().collect();
                let (closing, content) = body
                    .split_last()
                    .ok_or_else(|| ParseError::Custom("Unterminated JSX tag".into()))?;
                if closing.as_str() != name {
                    return Err(ParseError::MismatchedClosingTag {
                        opened: name,
                        closed: closing.as_str().to_string(),
                    });
                }
                children = lower_children(content.iter().cloned())?;
            }
            other => return Err(ParseError::UnexpectedRule(other)),
        }
    }

    let props = props.map(Expression::Object);
    Ok(create_element(tag_expression(&name), props, children))
}

fn tag_expression(name: &str) -> Expression {
    if name.contains('.') {
        let mut segments = name.split('.');
        let head = segments.next().unwrap_or_default();
        return segments.fold(Expression::identifier(head), |object, segment| {
            Expression::member(object, segment)
        });
    }
    let intrinsic = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase())
        || name.contains('-')
        || name.contains(':');
    if intrinsic {
        Expression::String(name.to_string())
    } else {
        Expression::identifier(name)
    }
}

fn lower_attribute(pair: Pair<Rule>) -> ParseResult<ObjectMember> {
    let attr = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::Custom("Empty JSX attribute".into()))?;

    match attr.as_rule() {
        Rule::jsx_spread_attribute => {
            let expr = attr
                .into_inner()
                .next()
                .ok_or_else(|| ParseError::Custom("Empty JSX spread".into()))?;
            Ok(ObjectMember::Spread(build_expression(expr)?))
        }
        Rule::jsx_named_attribute => {
            let mut parts = attr.into_inner();
            let name = parts
                .next()
                .ok_or_else(|| ParseError::Custom("JSX attribute without a name".into()))?
                .as_str()
                .to_string();
            let value = match parts.next() {
                None => Expression::Boolean(true),
                Some(value) => match value.as_rule() {
                    Rule::jsx_string => {
                        let raw = value.into_inner().next().map(|p| p.as_str()).unwrap_or("");
                        Expression::String(decode_entities(raw))
                    }
                    Rule::jsx_expression_container => match value.into_inner().next() {
                        Some(expr) => build_expression(expr)?,
                        None => return Err(ParseError::EmptyAttributeExpression),
                    },
                    Rule::jsx_element => lower_element(value)?,
                    other => return Err(ParseError::UnexpectedRule(other)),
                },
            };
            Ok(ObjectMember::Property { key: PropertyKey::Static(name), value })
        }
        other => Err(ParseError::UnexpectedRule(other)),
    }
}

fn lower_children<'a>(pairs: impl Iterator<Item = Pair<'a, Rule>>) -> ParseResult<Vec<Expression>> {
    let mut children = Vec::new();
    for child in pairs {
        match child.as_rule() {
            Rule::jsx_text => {
                let text = clean_text(child.as_str());
                if !text.is_empty() {
                    children.push(Expression::String(decode_entities(&text)));
                }
            }
            Rule::jsx_expression_container => {
                // `{}` and `{/* comment */}` produce no child
                if let Some(expr) = child.into_inner().next() {
                    children.push(build_expression(expr)?);
                }
            }
            Rule::jsx_element => children.push(lower_element(child)?),
            other => return Err(ParseError::UnexpectedRule(other)),
        }
    }
    Ok(children)
}

fn create_element(tag: Expression, props: Option<Expression>, children: Vec<Expression>) -> Expression {
    let mut arguments = vec![tag, props.unwrap_or(Expression::Null)];
    arguments.extend(children);
    Expression::call(
        Expression::member(Expression::identifier("React"), "createElement"),
        arguments,
    )
}

/// Collapse JSX text the way React's compilers do: lines are trimmed,
/// blank lines dropped, and the remaining lines joined with one space.
/// Whitespace that does not span a newline is kept as written.
pub(crate) fn clean_text(raw: &str) -> String {
    let lines: Vec<&str> = raw.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).collect();
    // a whitespace-only single line counts as its own last non-empty line
    let last_non_empty = lines
        .iter()
        .rposition(|l| l.chars().any(|c| c != ' ' && c != '\t'))
        .unwrap_or(0);

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let mut text = line.replace('\t', " ");
        if i != 0 {
            text = text.trim_start_matches(' ').to_string();
        }
        if i != lines.len() - 1 {
            text = text.trim_end_matches(' ').to_string();
        }
        if text.is_empty() {
            continue;
        }
        out.push_str(&text);
        if i != last_non_empty {
            out.push(' ');
        }
    }
    out
}

pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match candidate.find(';').filter(|end| *end <= 10) {
            Some(end) => match entity_char(&candidate[1..end]) {
                Some(ch) => {
                    out.push(ch);
                    rest = &candidate[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = &candidate[1..];
                }
            },
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity_char(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "times" => '×',
        "middot" => '·',
        "bull" => '•',
        "rarr" => '→',
        "larr" => '←',
        "uarr" => '↑',
        "darr" => '↓',
        "hearts" => '♥',
        "deg" => '°',
        "euro" => '€',
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_multiline() {
        assert_eq!(clean_text("\n    Hello\n    world\n  "), "Hello world");
    }

    #[test]
    fn test_clean_text_keeps_inline_spaces() {
        assert_eq!(clean_text(" Count: "), " Count: ");
    }

    #[test]
    fn test_clean_text_whitespace_only_line_is_dropped() {
        assert_eq!(clean_text("\n   \n"), "");
    }

    #[test]
    fn test_clean_text_single_space_between_expressions() {
        assert_eq!(clean_text(" "), " ");
        assert_eq!(clean_text("\t"), " ");
        assert_eq!(clean_text("  \n  a"), "a");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Tom &amp; Jerry &#169; &#x41;"), "Tom & Jerry © A");
        assert_eq!(decode_entities("a & b"), "a & b");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
    }
}

//! `{name}` expression scanning shared by the contract and resolution layers.

/// One piece of a template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk<'a> {
    Literal(&'a str),
    Expression(&'a str),
}

/// Splits `template` into literal and `{expression}` chunks.
///
/// An unmatched `{` is kept as literal text. Expressions are trimmed; an empty
/// pair of braces stays literal.
pub fn chunks(template: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close_offset) = rest[open + 1..].find('}') else {
            break;
        };
        let close = open + 1 + close_offset;
        let name = rest[open + 1..close].trim();
        if name.is_empty() || name.contains('{') {
            out.push(Chunk::Literal(&rest[..=open]));
            rest = &rest[open + 1..];
            continue;
        }
        if open > 0 {
            out.push(Chunk::Literal(&rest[..open]));
        }
        out.push(Chunk::Expression(name));
        rest = &rest[close + 1..];
    }
    if !rest.is_empty() {
        out.push(Chunk::Literal(rest));
    }
    out
}

pub fn references(template: &str, variable: &str) -> bool {
    chunks(template)
        .iter()
        .any(|chunk| matches!(chunk, Chunk::Expression(name) if *name == variable))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_literals_and_expressions() {
        assert_eq!(
            chunks("/repos/{owner}/{ repo }/issues"),
            vec![
                Chunk::Literal("/repos/"),
                Chunk::Expression("owner"),
                Chunk::Literal("/"),
                Chunk::Expression("repo"),
                Chunk::Literal("/issues"),
            ]
        );
    }

    #[test]
    fn unmatched_braces_stay_literal() {
        assert_eq!(chunks("{\"a\": 1"), vec![Chunk::Literal("{\"a\": 1")]);
        assert_eq!(chunks("{}{x}"), vec![Chunk::Literal("{"), Chunk::Literal("}"), Chunk::Expression("x")]);
        assert!(references("%7B\"user\": \"{user}\"%7D", "user"));
    }
}

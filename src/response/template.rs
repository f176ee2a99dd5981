//! Shell-style `$name` / `${name}` substitution for gemtext templates.

use std::collections::HashMap;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum TemplateError {
    #[error("template file not found: `{0}`")]
    NotFound(String),

    /// The message is the bare key name: it becomes the META of the status-50
    /// response reporting the failure.
    #[error("{0}")]
    MissingKey(String),

    #[error("invalid placeholder at byte {0}")]
    Malformed(usize),
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replace every `$name` and `${name}` placeholder with its value from
/// `context`. `$$` escapes a literal dollar sign. A placeholder without a
/// matching key fails with [`TemplateError::MissingKey`] carrying the key
/// name; a dangling `$` fails with [`TemplateError::Malformed`].
pub fn substitute(
    template: &str,
    context: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some((_, '$')) => {
                chars.next();
                out.push('$');
            }
            Some((_, '{')) => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed || name.is_empty() || !name.chars().all(is_ident) {
                    return Err(TemplateError::Malformed(pos));
                }
                out.push_str(lookup(context, &name)?);
            }
            Some((_, c)) if is_ident_start(c) => {
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_ident(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                out.push_str(lookup(context, &name)?);
            }
            _ => return Err(TemplateError::Malformed(pos)),
        }
    }
    Ok(out)
}

fn lookup<'a>(
    context: &'a HashMap<String, String>,
    name: &str,
) -> Result<&'a str, TemplateError> {
    context
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| TemplateError::MissingKey(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn substitutes_both_placeholder_forms() {
        let c = ctx(&[("name", "gemini"), ("port", "1965")]);
        assert_eq!(
            substitute("scheme $name on ${port}!", &c).unwrap(),
            "scheme gemini on 1965!"
        );
    }

    #[test]
    fn double_dollar_is_a_literal() {
        assert_eq!(substitute("costs $$5", &ctx(&[])).unwrap(), "costs $5");
    }

    #[test]
    fn missing_key_reports_the_key_name() {
        let err = substitute("hello $who", &ctx(&[])).unwrap_err();
        assert_eq!(err, TemplateError::MissingKey("who".to_string()));
        assert_eq!(err.to_string(), "who");
    }

    #[test]
    fn dangling_dollar_is_malformed() {
        assert!(matches!(
            substitute("100% $", &ctx(&[])),
            Err(TemplateError::Malformed(_))
        ));
        assert!(matches!(
            substitute("${unclosed", &ctx(&[])),
            Err(TemplateError::Malformed(_))
        ));
    }
}

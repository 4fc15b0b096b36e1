//! Field specs: `stem`, `pos_stem` or `text_pos_stem`.
//!
//! Fields are separated by unescaped underscores; `\_` is a literal
//! underscore and `*` leaves a field unconstrained.

use super::error::ErrorKind;
use super::transition::FieldRegex;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldSpec {
    pub text: Option<FieldRegex>,
    pub pos: Option<FieldRegex>,
    pub stem: Option<FieldRegex>,
}

impl FieldSpec {
    /// A field spec that constrains nothing.
    pub fn any() -> Self {
        FieldSpec::default()
    }

    pub fn parse(raw: &str) -> Result<Self, ErrorKind> {
        let fields = split_fields(raw)?;
        let (text, pos, stem) = match fields.as_slice() {
            [stem] => ("*", "*", stem.as_str()),
            [pos, stem] => ("*", pos.as_str(), stem.as_str()),
            [text, pos, stem] => (text.as_str(), pos.as_str(), stem.as_str()),
            _ => return Err(ErrorKind::FieldCount(fields.len())),
        };
        Ok(FieldSpec {
            text: constraint(text)?,
            pos: constraint(pos)?,
            stem: constraint(stem)?,
        })
    }

    pub fn is_any(&self) -> bool {
        self.text.is_none() && self.pos.is_none() && self.stem.is_none()
    }
}

fn constraint(field: &str) -> Result<Option<FieldRegex>, ErrorKind> {
    if field == "*" {
        Ok(None)
    } else {
        FieldRegex::new(field).map(Some)
    }
}

/// Split on unescaped underscores, removing the escapes.
///
/// Other backslash pairs are kept verbatim so regex escapes survive.
pub fn split_fields(raw: &str) -> Result<Vec<String>, ErrorKind> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();
    let mut trailing_separator = false;

    while let Some(c) = chars.next() {
        trailing_separator = false;
        match c {
            '\\' => match chars.next() {
                Some('_') => current.push('_'),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            '_' => {
                if current.is_empty() {
                    return Err(ErrorKind::EmptyField);
                }
                fields.push(std::mem::take(&mut current));
                trailing_separator = true;
            }
            _ => current.push(c),
        }
    }

    if trailing_separator {
        return Err(ErrorKind::TrailingUnderscore);
    }
    if current.is_empty() {
        return Err(ErrorKind::EmptyField);
    }
    fields.push(current);
    Ok(fields)
}

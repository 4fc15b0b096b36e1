//! The token pattern language.
//!
//! Expressions are sequences of space-separated terminals:
//!
//! | Terminal              | Meaning                                       |
//! |-----------------------|-----------------------------------------------|
//! | `.`                   | Any token                                     |
//! | `stem`                | Token whose stem matches the regex            |
//! | `pos_stem`            | Token whose POS and stem match                |
//! | `text_pos_stem`       | Token whose text, POS and stem match          |
//! | `*` (as a field)      | Unconstrained field                           |
//! | `X ?` / `X *` / `X +` | Zero-or-one / zero-or-more / one-or-more `X`  |
//! | `( … )`               | Capture group                                 |
//! | `[ LABEL … ]`         | Tokens forming one whole chunk `LABEL`        |
//! | `[ LABEL … ] ?`       | Optional phrase                               |
//! | `X ? *`               | Optional `X` followed by any token            |
//! | `\ ` / `\_`           | Literal space / literal underscore            |
//!
//! Captures take no quantifier, and phrases only take `?`.
//!
//! In the [`Grammar::Flat`] flavour phrases are not allowed and a bare
//! `?`, `*` or `+` is a quantified wildcard.

mod compiler;
mod error;
mod field;
mod lexer;
mod transition;


pub use compiler::{Grammar, TokenPattern, compile, compile_with};
pub use error::{CompileError, ErrorKind};
pub use field::{FieldSpec, split_fields};
pub use lexer::{Cursor, Kind, Lexer, Terminal};
pub use transition::{Constraints, FieldRegex, TokenTransition};

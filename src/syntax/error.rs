use thiserror::Error;

/// What went wrong while compiling a pattern expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("unescaped trailing underscore in field spec")]
    TrailingUnderscore,
    #[error("empty field in field spec")]
    EmptyField,
    #[error("field spec has {0} fields, expected 1 to 3")]
    FieldCount(usize),
    #[error("invalid regular expression: {0}")]
    InvalidRegex(String),
    #[error("unterminated capture group")]
    UnterminatedGroup,
    #[error("unterminated phrase")]
    UnterminatedPhrase,
    #[error("phrases cannot be nested")]
    NestedPhrase,
    #[error("phrase has no label")]
    MissingLabel,
    #[error("unbalanced `{0}`")]
    UnbalancedClose(String),
    #[error("quantifier `{0}` does not follow a token")]
    DanglingQuantifier(String),
    #[error("phrases are not available in the flat grammar")]
    PhraseInFlat,
}

/// A failed compilation, locating the problem in the source expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset} in `{expression}`")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub expression: String,
    /// Character offset into `expression`.
    pub offset: usize,
}

impl CompileError {
    pub fn new(kind: ErrorKind, expression: &str, offset: usize) -> Self {
        CompileError {
            kind,
            expression: expression.to_string(),
            offset,
        }
    }
}

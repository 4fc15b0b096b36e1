//! Recursive descent compiler from pattern expressions to token automata.

use itertools::iproduct;
use tracing::debug;

use super::error::{CompileError, ErrorKind};
use super::field::FieldSpec;
use super::lexer::{Cursor, Kind, Lexer, Terminal};
use super::transition::{FieldRegex, TokenTransition};
use crate::fsm::Pattern;

pub type TokenPattern = Pattern<TokenTransition>;

/// Which flavour of the pattern language to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grammar {
    /// Tokens, captures and labelled phrases; `?`, `*` and `+` quantify the
    /// preceding token.
    #[default]
    Structural,
    /// Tokens and captures only; bare `?`, `*` and `+` are wildcards
    /// matching zero-or-one, zero-or-more and one-or-more tokens.
    Flat,
}

/// Compile an expression in the structural grammar.
pub fn compile(expression: &str) -> Result<TokenPattern, CompileError> {
    compile_with(expression, Grammar::Structural)
}

pub fn compile_with(expression: &str, grammar: Grammar) -> Result<TokenPattern, CompileError> {
    let mut compiler = Compiler {
        lexer: Lexer::new(expression),
        expression,
        grammar,
    };
    let pattern = compiler.sequence(None, Closer::End, 0)?.minimize();
    debug!(
        expression,
        ?grammar,
        states = pattern.state_count(),
        groups = pattern.group_count(),
        "compiled pattern"
    );
    Ok(pattern)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closer {
    End,
    Group,
    Phrase,
}

/// The phrase currently being compiled.
struct Phrase {
    label: Option<FieldRegex>,
    /// Position just after the label.
    body: Cursor,
    seen_token: bool,
}

struct Compiler<'a> {
    lexer: Lexer<'a>,
    expression: &'a str,
    grammar: Grammar,
}

impl Compiler<'_> {
    fn error(&self, kind: ErrorKind, offset: usize) -> CompileError {
        CompileError::new(kind, self.expression, offset)
    }

    /// Compile terminals up to and including `closer`; `opened_at` is the
    /// offset of the matching opening delimiter.
    fn sequence(
        &mut self,
        mut phrase: Option<&mut Phrase>,
        closer: Closer,
        opened_at: usize,
    ) -> Result<TokenPattern, CompileError> {
        let mut parts = Vec::new();
        loop {
            let start = self.lexer.checkpoint();
            let Some(terminal) = self.lexer.next() else {
                return match closer {
                    Closer::End => Ok(join(parts)),
                    Closer::Group => Err(self.error(ErrorKind::UnterminatedGroup, opened_at)),
                    Closer::Phrase => Err(self.error(ErrorKind::UnterminatedPhrase, opened_at)),
                };
            };

            let part = match terminal.kind() {
                Kind::OpenGroup => {
                    let group =
                        self.sequence(phrase.as_deref_mut(), Closer::Group, terminal.offset)?;
                    self.reject_star()?;
                    group.capture()
                }
                Kind::CloseGroup if closer == Closer::Group => return Ok(join(parts)),
                Kind::ClosePhrase if closer == Closer::Phrase => return Ok(join(parts)),
                Kind::OpenPhrase | Kind::ClosePhrase if self.grammar == Grammar::Flat => {
                    return Err(self.error(ErrorKind::PhraseInFlat, terminal.offset));
                }
                Kind::CloseGroup | Kind::ClosePhrase => {
                    return Err(
                        self.error(ErrorKind::UnbalancedClose(terminal.text), terminal.offset)
                    );
                }
                Kind::OpenPhrase if phrase.is_some() => {
                    return Err(self.error(ErrorKind::NestedPhrase, terminal.offset));
                }
                Kind::OpenPhrase => self.phrase(terminal.offset)?,
                k if k.is_quantifier() && self.grammar == Grammar::Flat => flat_wildcard(k),
                Kind::Optional | Kind::Plus => {
                    return Err(
                        self.error(ErrorKind::DanglingQuantifier(terminal.text), terminal.offset)
                    );
                }
                _ => self.token(&terminal, phrase.as_deref_mut(), start)?,
            };
            parts.push(part);
        }
    }

    fn phrase(&mut self, opened_at: usize) -> Result<TokenPattern, CompileError> {
        let label = match self.lexer.next() {
            Some(t) if matches!(t.kind(), Kind::Field | Kind::Star) => t,
            Some(t) => return Err(self.error(ErrorKind::MissingLabel, t.offset)),
            None => return Err(self.error(ErrorKind::UnterminatedPhrase, opened_at)),
        };
        let label_regex = if label.text == "*" {
            None
        } else {
            Some(FieldRegex::new(&label.text).map_err(|k| self.error(k, label.offset))?)
        };

        let mut phrase = Phrase {
            label: label_regex,
            body: self.lexer.checkpoint(),
            seen_token: false,
        };
        let body = self.sequence(Some(&mut phrase), Closer::Phrase, opened_at)?;
        self.reject_star()?;
        if self.lexer.peek().is_some_and(|t| t.kind() == Kind::Optional) {
            self.lexer.next();
            Ok(body.optional())
        } else {
            Ok(body)
        }
    }

    fn token(
        &mut self,
        terminal: &Terminal,
        phrase: Option<&mut Phrase>,
        start: Cursor,
    ) -> Result<TokenPattern, CompileError> {
        let spec = match terminal.kind() {
            Kind::Wildcard => FieldSpec::any(),
            _ => FieldSpec::parse(&terminal.text).map_err(|k| self.error(k, terminal.offset))?,
        };
        if let Some(phrase) = phrase {
            return Ok(self.phrase_token(spec, phrase, start));
        }

        let single = Pattern::matching(TokenTransition::new(spec, None, false, false));
        if self.grammar == Grammar::Flat {
            return Ok(single);
        }
        Ok(match self.quantifier() {
            Some(Kind::Optional) => single.optional(),
            Some(Kind::Plus) => single.repeat(),
            Some(Kind::Star) => single.repeat().optional(),
            _ => single,
        })
    }

    /// A token inside a phrase, constrained to the phrase label and to the
    /// chunk boundaries it may fall on.
    fn phrase_token(
        &mut self,
        spec: FieldSpec,
        phrase: &mut Phrase,
        start: Cursor,
    ) -> TokenPattern {
        let begins: &[bool] = if !phrase.seen_token {
            &[true]
        } else if self.lexer.maybe_at_chunk_begin(phrase.body, start) {
            &[false, true]
        } else {
            &[false]
        };
        phrase.seen_token = true;
        let ends: &[bool] = if self.lexer.at_chunk_end() {
            &[true]
        } else if self.lexer.maybe_at_chunk_end() {
            &[false, true]
        } else {
            &[false]
        };
        let repeated = self.lexer.is_repeated();
        let optional = self.lexer.is_optional();
        self.quantifier();

        let label = &phrase.label;
        let single = |begin: bool, end: bool| {
            Pattern::matching(TokenTransition::new(spec.clone(), label.clone(), begin, end))
        };
        let pattern = iproduct!(begins.iter().copied(), ends.iter().copied())
            .map(|(begin, end)| {
                if repeated {
                    run(&single, begin, end)
                } else {
                    single(begin, end)
                }
            })
            .reduce(Pattern::branch)
            .unwrap_or_else(Pattern::empty);
        if optional { pattern.optional() } else { pattern }
    }

    /// A `*` directly after `)` or `]` would otherwise read as a wildcard
    /// token; only `?` after a phrase is a quantifier there.
    fn reject_star(&self) -> Result<(), CompileError> {
        match self.lexer.peek() {
            Some(t) if t.kind() == Kind::Star && self.grammar == Grammar::Structural => {
                Err(self.error(ErrorKind::DanglingQuantifier(t.text), t.offset))
            }
            _ => Ok(()),
        }
    }

    /// Consume a quantifier following a token.
    fn quantifier(&mut self) -> Option<Kind> {
        let kind = self.lexer.peek()?.kind();
        if kind.is_quantifier() {
            self.lexer.next();
            Some(kind)
        } else {
            None
        }
    }
}

/// One or more tokens; when the run must open or close the chunk, only its
/// first or last token carries that requirement.
fn run(single: &impl Fn(bool, bool) -> TokenPattern, begin: bool, end: bool) -> TokenPattern {
    if !begin && !end {
        return single(false, false).repeat();
    }
    let open = single(begin, false);
    let inner = single(false, false).repeat().optional();
    let close = single(false, end);
    single(begin, end).branch(open.chain(inner).chain(close))
}

fn flat_wildcard(kind: Kind) -> TokenPattern {
    let any = Pattern::matching(TokenTransition::Wildcard);
    match kind {
        Kind::Optional => any.optional(),
        Kind::Plus => any.repeat(),
        _ => any.repeat().optional(),
    }
}

fn join(parts: Vec<TokenPattern>) -> TokenPattern {
    parts
        .into_iter()
        .reduce(Pattern::chain)
        .unwrap_or_else(Pattern::empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_err(expression: &str) -> CompileError {
        compile(expression).expect_err("compile should fail")
    }

    // --- Shape ---

    #[test]
    fn test_group_counts() {
        assert_eq!(compile("a b c").unwrap().group_count(), 0);
        assert_eq!(compile("( a ) ( b ( c ) )").unwrap().group_count(), 3);
        assert_eq!(compile("[ NP ( a ) b ]").unwrap().group_count(), 1);
        assert_eq!(compile("( )").unwrap().group_count(), 1);
    }

    #[test]
    fn test_field_specs_compile() {
        for expression in ["a_b_c", "*_*_*", r"\__A_B", "NN.*_gene", "VB.?_bind|interact"] {
            assert!(compile(expression).is_ok(), "{expression}");
        }
    }

    #[test]
    fn test_realistic_expression_compiles() {
        let expression = "( [ NP DT_* ? . + NN_factor ] ) . * \
                          [ VP . * VB.?_bind|interact ] [ NP DT_* ? ( . + NN.*_gene ) ]";
        let pattern = compile(expression).unwrap();
        assert_eq!(pattern.group_count(), 2);
    }

    #[test]
    fn test_optional_phrase() {
        assert!(compile("[ NP a ] ? b").is_ok());
    }

    #[test]
    fn test_flat_grammar_wildcards() {
        assert!(compile_with("a ? b * c +", Grammar::Flat).is_ok());
        assert!(compile_with("( a ) . b", Grammar::Flat).is_ok());
    }

    #[test]
    fn test_star_label_and_token() {
        assert!(compile("[ * * ]").is_ok());
        assert!(compile("*").is_ok());
    }

    // --- Errors ---

    #[test]
    fn test_unterminated() {
        let err = compile_err("a ( b");
        assert_eq!(err.kind, ErrorKind::UnterminatedGroup);
        assert_eq!(err.offset, 2);
        let err = compile_err("[ NP a");
        assert_eq!(err.kind, ErrorKind::UnterminatedPhrase);
        assert_eq!(err.offset, 0);
        assert_eq!(compile_err("[").kind, ErrorKind::UnterminatedPhrase);
    }

    #[test]
    fn test_nested_phrase() {
        let err = compile_err("[ NP [ VP a ] ]");
        assert_eq!(err.kind, ErrorKind::NestedPhrase);
        assert_eq!(err.offset, 5);
        assert_eq!(compile_err("[ NP ( [ VP a ] ) ]").kind, ErrorKind::NestedPhrase);
    }

    #[test]
    fn test_unbalanced() {
        let err = compile_err("a )");
        assert_eq!(err.kind, ErrorKind::UnbalancedClose(")".into()));
        assert_eq!(err.offset, 2);
        assert_eq!(compile_err("a ]").kind, ErrorKind::UnbalancedClose("]".into()));
        assert_eq!(compile_err("[ NP ( a ] )").kind, ErrorKind::UnbalancedClose("]".into()));
    }

    #[test]
    fn test_field_errors() {
        let err = compile_err("a_b_");
        assert_eq!(err.kind, ErrorKind::TrailingUnderscore);
        assert_eq!(err.offset, 0);
        let err = compile_err("x _A");
        assert_eq!(err.kind, ErrorKind::EmptyField);
        assert_eq!(err.offset, 2);
        assert!(matches!(compile_err("NN(_x").kind, ErrorKind::InvalidRegex(_)));
        assert_eq!(compile_err("a_b_c_d").kind, ErrorKind::FieldCount(4));
    }

    #[test]
    fn test_phrase_errors() {
        let err = compile_err("[ ] a");
        assert_eq!(err.kind, ErrorKind::MissingLabel);
        assert_eq!(err.offset, 2);
        assert!(matches!(compile_err("[ NP( a ]").kind, ErrorKind::InvalidRegex(_)));
    }

    #[test]
    fn test_dangling_quantifier() {
        let err = compile_err("? a");
        assert_eq!(err.kind, ErrorKind::DanglingQuantifier("?".into()));
        assert_eq!(compile_err("( a ) +").kind, ErrorKind::DanglingQuantifier("+".into()));
    }

    #[test]
    fn test_star_after_closer_is_rejected() {
        let err = compile_err("( a ) *");
        assert_eq!(err.kind, ErrorKind::DanglingQuantifier("*".into()));
        assert_eq!(err.offset, 6);

        let err = compile_err("[ NP a ] * b");
        assert_eq!(err.kind, ErrorKind::DanglingQuantifier("*".into()));
        assert_eq!(err.offset, 9);

        assert!(compile("( a ) . *").is_ok());
        assert!(compile("[ NP a ] ? b").is_ok());
        assert!(compile_with("a ( b ) *", Grammar::Flat).is_ok());
    }

    #[test]
    fn test_flat_rejects_phrases() {
        let err = compile_with("a [ NP b ]", Grammar::Flat).unwrap_err();
        assert_eq!(err.kind, ErrorKind::PhraseInFlat);
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn test_error_message() {
        let msg = compile_err("( a").to_string();
        assert!(msg.contains("unterminated capture group"), "got: {}", msg);
        assert!(msg.contains("offset 0"), "got: {}", msg);
        assert!(msg.contains("`( a`"), "got: {}", msg);
    }
}

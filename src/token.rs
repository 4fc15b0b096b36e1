//! Annotated tokens and the tagged-sentence reader.
//!
//! Input sentences are one per line, written as whitespace-separated
//! `text/POS/stem/CHUNK` items where `CHUNK` is an IOB tag (`B-NP`, `I-NP`
//! or `O`). A `-` in the POS or stem column marks the attribute as absent.

use thiserror::Error;

/// Read-only attributes of a sequence element that token patterns query.
pub trait Annotated {
    fn text(&self) -> &str;
    fn pos(&self) -> Option<&str>;
    fn stem(&self) -> Option<&str>;
    /// Label of the chunk the element belongs to, if any.
    fn chunk(&self) -> Option<&str>;
    fn chunk_begin(&self) -> bool;
    fn chunk_end(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Token {
    pub text: String,
    pub pos: Option<String>,
    pub stem: Option<String>,
    pub chunk: Option<String>,
    pub chunk_begin: bool,
    pub chunk_end: bool,
}

impl Token {
    pub fn new(text: &str) -> Self {
        Token {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn with_pos(mut self, pos: &str) -> Self {
        self.pos = Some(pos.to_string());
        self
    }

    pub fn with_stem(mut self, stem: &str) -> Self {
        self.stem = Some(stem.to_string());
        self
    }

    /// Place the token inside a chunk labelled `label`.
    pub fn in_chunk(mut self, label: &str, begin: bool, end: bool) -> Self {
        self.chunk = Some(label.to_string());
        self.chunk_begin = begin;
        self.chunk_end = end;
        self
    }
}

impl Annotated for Token {
    fn text(&self) -> &str {
        &self.text
    }

    fn pos(&self) -> Option<&str> {
        self.pos.as_deref()
    }

    fn stem(&self) -> Option<&str> {
        self.stem.as_deref()
    }

    fn chunk(&self) -> Option<&str> {
        self.chunk.as_deref()
    }

    fn chunk_begin(&self) -> bool {
        self.chunk_begin
    }

    fn chunk_end(&self) -> bool {
        self.chunk_end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("item {index} `{item}` needs the form text/POS/stem/CHUNK")]
    Malformed { index: usize, item: String },
    #[error("item {index} has an invalid chunk tag `{tag}`")]
    ChunkTag { index: usize, tag: String },
}

enum Iob {
    Outside,
    Begin(String),
    Inside(String),
}

fn parse_iob(tag: &str) -> Option<Iob> {
    match tag {
        "O" => Some(Iob::Outside),
        _ => match tag.split_once('-') {
            Some(("B", label)) if !label.is_empty() => Some(Iob::Begin(label.to_string())),
            Some(("I", label)) if !label.is_empty() => Some(Iob::Inside(label.to_string())),
            _ => None,
        },
    }
}

fn attribute(value: &str) -> Option<String> {
    match value {
        "" | "-" => None,
        _ => Some(value.to_string()),
    }
}

/// Parse one tagged sentence into tokens with chunk boundaries resolved.
pub fn parse_sentence(line: &str) -> Result<Vec<Token>, ReadError> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut inside: Vec<bool> = Vec::new();

    for (index, item) in line.split_whitespace().enumerate() {
        let mut parts = item.rsplitn(4, '/');
        let (Some(tag), Some(stem), Some(pos), Some(text)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ReadError::Malformed {
                index,
                item: item.to_string(),
            });
        };
        if text.is_empty() {
            return Err(ReadError::Malformed {
                index,
                item: item.to_string(),
            });
        }

        let mut token = Token {
            text: text.to_string(),
            pos: attribute(pos),
            stem: attribute(stem),
            ..Default::default()
        };
        let continues = match parse_iob(tag) {
            Some(Iob::Outside) => false,
            Some(Iob::Begin(label)) => {
                token.chunk = Some(label);
                token.chunk_begin = true;
                false
            }
            Some(Iob::Inside(label)) => {
                let same = tokens
                    .last()
                    .is_some_and(|prev| prev.chunk.as_deref() == Some(label.as_str()));
                token.chunk_begin = !same;
                token.chunk = Some(label);
                same
            }
            None => {
                return Err(ReadError::ChunkTag {
                    index,
                    tag: tag.to_string(),
                });
            }
        };
        tokens.push(token);
        inside.push(continues);
    }

    // A chunk ends where the following token does not continue it.
    let count = tokens.len();
    for i in 0..count {
        if tokens[i].chunk.is_some() {
            tokens[i].chunk_end = i + 1 == count || !inside[i + 1];
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_sentence() {
        let tokens =
            parse_sentence("The/DT/the/B-NP gene/NN/gene/I-NP binds/VBZ/bind/B-VP").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(
            tokens[0],
            Token::new("The")
                .with_pos("DT")
                .with_stem("the")
                .in_chunk("NP", true, false)
        );
        assert_eq!(tokens[1].chunk(), Some("NP"));
        assert!(!tokens[1].chunk_begin());
        assert!(tokens[1].chunk_end());
        assert!(tokens[2].chunk_begin() && tokens[2].chunk_end());
    }

    #[test]
    fn test_outside_tokens_have_no_chunk() {
        let tokens = parse_sentence("a/DT/a/B-NP ,/,/,/O b/NN/b/I-NP").unwrap();
        assert!(tokens[0].chunk_end());
        assert_eq!(tokens[1].chunk(), None);
        assert!(!tokens[1].chunk_begin() && !tokens[1].chunk_end());
        // An inside tag that does not continue a chunk opens a new one.
        assert!(tokens[2].chunk_begin());
        assert!(tokens[2].chunk_end());
    }

    #[test]
    fn test_adjacent_chunks_with_same_label() {
        let tokens = parse_sentence("a/DT/a/B-NP b/NN/b/B-NP c/NN/c/I-NP").unwrap();
        assert!(tokens[0].chunk_begin() && tokens[0].chunk_end());
        assert!(tokens[1].chunk_begin() && !tokens[1].chunk_end());
        assert!(!tokens[2].chunk_begin() && tokens[2].chunk_end());
    }

    #[test]
    fn test_slash_in_text_and_missing_attributes() {
        let tokens = parse_sentence("and/or/CC/-/O").unwrap();
        assert_eq!(tokens[0].text(), "and/or");
        assert_eq!(tokens[0].pos(), Some("CC"));
        assert_eq!(tokens[0].stem(), None);
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(parse_sentence("   ").unwrap(), Vec::new());
    }

    #[test]
    fn test_malformed_items() {
        let err = parse_sentence("ok/NN/ok/O broken/NN").unwrap_err();
        assert_eq!(
            err,
            ReadError::Malformed {
                index: 1,
                item: "broken/NN".to_string()
            }
        );
        let err = parse_sentence("x/NN/x/X-NP").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("X-NP"), "got: {}", msg);
    }
}

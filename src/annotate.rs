//! Rule-driven annotation of token sequences.
//!
//! A rule resource holds one rule per line: a pattern expression followed
//! by namespace/identifier pairs, all separated by tabs.
//!
//! | Line shape                        | Annotates                                  |
//! |-----------------------------------|--------------------------------------------|
//! | `pattern`                         | whole match with the default label         |
//! | `pattern ns id`                   | whole match with `ns:id`                   |
//! | `pattern (empty) (empty) ns id …` | each capture group with its own label      |
//! | `pattern ns id ns id …`           | each group, plus one relationship `ns:id`  |
//!
//! Empty group pairs fall back to the default label. Blank lines and lines
//! starting with `#` are ignored.

use std::collections::HashSet;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::syntax::{CompileError, Grammar, TokenPattern, compile_with};
use crate::token::Token;

pub const DEFAULT_NAMESPACE: &str = "http://nlp2rdf.lod2.eu/schema/doc/sso/";
pub const DEFAULT_IDENTIFIER: &str = "Phrase";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    pub namespace: String,
    pub identifier: String,
}

impl Label {
    pub fn new(namespace: &str, identifier: &str) -> Self {
        Label {
            namespace: namespace.to_string(),
            identifier: identifier.to_string(),
        }
    }
}

impl Default for Label {
    fn default() -> Self {
        Label::new(DEFAULT_NAMESPACE, DEFAULT_IDENTIFIER)
    }
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("cannot read rules from {path}")]
    Io {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },
    #[error("line {line}: {count} fields; expected a pattern and namespace/identifier pairs")]
    FieldCount { line: usize, count: usize },
    #[error("line {line}: {cause}")]
    Pattern {
        line: usize,
        #[source]
        cause: CompileError,
    },
    #[error("line {line}: {labels} group labels for a pattern with {groups} groups")]
    GroupLabels {
        line: usize,
        labels: usize,
        groups: usize,
    },
}

#[derive(Debug, Clone)]
pub struct ResourceConfig {
    pub separator: char,
    pub default_label: Label,
    pub grammar: Grammar,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        ResourceConfig {
            separator: '\t',
            default_label: Label::default(),
            grammar: Grammar::Structural,
        }
    }
}

/// What a rule annotates when its pattern matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Whole(Label),
    Groups(Vec<Label>),
    Relationship { relation: Label, members: Vec<Label> },
}

#[derive(Debug)]
pub struct Rule {
    pub expression: String,
    pub pattern: TokenPattern,
    pub target: Target,
    hits: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// A token span carrying a label.
    Semantic { span: Range<usize>, label: Label },
    /// An undirected relationship between the spans of its members.
    Relationship {
        label: Label,
        members: Vec<Range<usize>>,
    },
}

#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    skipped: Vec<ResourceError>,
}

impl RuleSet {
    pub fn from_path(path: &Path, config: &ResourceConfig) -> Result<Self, ResourceError> {
        let source = fs::read_to_string(path).map_err(|cause| ResourceError::Io {
            path: path.to_path_buf(),
            cause,
        })?;
        Ok(Self::parse(&source, config))
    }

    /// Load every well-formed rule; malformed lines are logged and skipped.
    pub fn parse(source: &str, config: &ResourceConfig) -> Self {
        let mut set = RuleSet::default();
        for (index, line) in source.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_rule(line, index + 1, config) {
                Ok(rule) => set.rules.push(rule),
                Err(err) => {
                    warn!(%err, "skipping rule");
                    set.skipped.push(err);
                }
            }
        }

        let count = |f: fn(&Target) -> bool| set.rules.iter().filter(|r| f(&r.target)).count();
        info!(
            whole = count(|t| matches!(t, Target::Whole(_))),
            groups = count(|t| matches!(t, Target::Groups(_))),
            relationships = count(|t| matches!(t, Target::Relationship { .. })),
            skipped = set.skipped.len(),
            "loaded rules"
        );
        set
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn skipped(&self) -> &[ResourceError] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Match counts per rule expression.
    pub fn hits(&self) -> impl Iterator<Item = (&str, usize)> {
        self.rules.iter().map(|r| (r.expression.as_str(), r.hits))
    }

    /// Annotate one sentence with every rule.
    ///
    /// Identical semantic annotations are produced once and shared by the
    /// relationships that refer to them; empty or non-participating groups
    /// are not annotated.
    pub fn annotate(&mut self, tokens: &[Token]) -> Vec<Annotation> {
        let mut out = Collector::default();
        for rule in &mut self.rules {
            let mut matcher = rule.pattern.matcher(tokens);
            for m in matcher.iter() {
                rule.hits += 1;
                debug!(expression = %rule.expression, start = m.start, end = m.end, "matched");
                match &rule.target {
                    Target::Whole(label) => out.semantic(m.start..m.end, label),
                    Target::Groups(labels) => {
                        for (i, label) in labels.iter().enumerate() {
                            if let Some(span) = m.span(i + 1) {
                                out.semantic(span, label);
                            }
                        }
                    }
                    Target::Relationship { relation, members } => {
                        let mut spans = Vec::new();
                        for (i, label) in members.iter().enumerate() {
                            if let Some(span) = m.span(i + 1)
                                && !span.is_empty()
                            {
                                out.semantic(span.clone(), label);
                                spans.push(span);
                            }
                        }
                        out.relationship(relation, spans);
                    }
                }
            }
        }
        out.annotations
    }
}

#[derive(Default)]
struct Collector {
    annotations: Vec<Annotation>,
    semantic: HashSet<(Range<usize>, Label)>,
    relationships: HashSet<(Label, Vec<Range<usize>>)>,
}

impl Collector {
    fn semantic(&mut self, span: Range<usize>, label: &Label) {
        if span.is_empty() || !self.semantic.insert((span.clone(), label.clone())) {
            return;
        }
        self.annotations.push(Annotation::Semantic {
            span,
            label: label.clone(),
        });
    }

    fn relationship(&mut self, label: &Label, members: Vec<Range<usize>>) {
        if members.is_empty() || !self.relationships.insert((label.clone(), members.clone())) {
            return;
        }
        self.annotations.push(Annotation::Relationship {
            label: label.clone(),
            members,
        });
    }
}

fn parse_rule(line: &str, number: usize, config: &ResourceConfig) -> Result<Rule, ResourceError> {
    let fields: Vec<&str> = line.split(config.separator).collect();
    if fields.len() % 2 == 0 {
        return Err(ResourceError::FieldCount {
            line: number,
            count: fields.len(),
        });
    }
    let expression = fields[0];
    let pattern = compile_with(expression, config.grammar).map_err(|cause| {
        ResourceError::Pattern {
            line: number,
            cause,
        }
    })?;

    let label = |pair: &[&str]| match pair {
        [ns, id] if !ns.is_empty() && !id.is_empty() => Some(Label::new(ns, id)),
        _ => None,
    };
    let pairs: Vec<&[&str]> = fields[1..].chunks(2).collect();
    let target = match pairs.as_slice() {
        [] => Target::Whole(config.default_label.clone()),
        [whole] => Target::Whole(label(*whole).unwrap_or_else(|| config.default_label.clone())),
        [first, groups @ ..] => {
            let members: Vec<Label> = groups
                .iter()
                .map(|pair| label(*pair).unwrap_or_else(|| config.default_label.clone()))
                .collect();
            if members.len() != pattern.group_count() {
                return Err(ResourceError::GroupLabels {
                    line: number,
                    labels: members.len(),
                    groups: pattern.group_count(),
                });
            }
            match label(*first) {
                Some(relation) => Target::Relationship { relation, members },
                None => Target::Groups(members),
            }
        }
    };

    Ok(Rule {
        expression: expression.to_string(),
        pattern,
        target,
        hits: 0,
    })
}

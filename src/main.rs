use std::fs;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use itertools::Itertools;
use tracing::info;
use tracing_subscriber::EnvFilter;

use synpat::{Annotation, Grammar, Label, ResourceConfig, RuleSet, Token, parse_sentence};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Rule file: one pattern per line, followed by namespace/identifier pairs
    #[arg(value_name = "PATTERNS")]
    patterns: PathBuf,

    /// Tagged sentences, one per line (default: stdin)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Use the flat grammar (no phrases; bare ?, * and + are wildcards)
    #[arg(short = 'f', long)]
    flat: bool,

    /// Field separator of the rule file
    #[arg(short = 's', long, default_value_t = '\t')]
    separator: char,

    /// Namespace for rules without an explicit label
    #[arg(long, default_value = synpat::annotate::DEFAULT_NAMESPACE)]
    namespace: String,

    /// Identifier for rules without an explicit label
    #[arg(long, default_value = synpat::annotate::DEFAULT_IDENTIFIER)]
    identifier: String,

    /// Only print sentences that received at least one annotation
    #[arg(short = 'm', long)]
    matched_only: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = ResourceConfig {
        separator: args.separator,
        default_label: Label::new(&args.namespace, &args.identifier),
        grammar: if args.flat {
            Grammar::Flat
        } else {
            Grammar::Structural
        },
    };
    let mut rules = RuleSet::from_path(&args.patterns, &config)?;
    if rules.is_empty() {
        bail!("no usable patterns in {}", args.patterns.display());
    }

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => {
            let file = fs::File::open(path)
                .with_context(|| format!("cannot open {}", path.display()))?;
            Box::new(io::BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };
    let mut out = BufWriter::new(io::stdout().lock());

    let mut sentences = 0;
    let mut annotated = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("cannot read input")?;
        let number = index + 1;
        let tokens =
            parse_sentence(&line).with_context(|| format!("malformed sentence on line {number}"))?;
        sentences += 1;

        let annotations = rules.annotate(&tokens);
        if !annotations.is_empty() {
            annotated += 1;
        } else if args.matched_only {
            continue;
        }
        writeln!(out, "# {number}\t{}", tokens.iter().map(|t| &t.text).join(" "))?;
        for annotation in &annotations {
            write_annotation(&mut out, number, &tokens, annotation)?;
        }
    }
    out.flush()?;

    info!(sentences, annotated, "done");
    for (expression, hits) in rules.hits() {
        info!(expression, hits, "pattern hits");
    }
    Ok(())
}

fn covered(tokens: &[Token], span: &std::ops::Range<usize>) -> String {
    tokens[span.clone()].iter().map(|t| &t.text).join(" ")
}

fn write_annotation(
    out: &mut impl Write,
    number: usize,
    tokens: &[Token],
    annotation: &Annotation,
) -> Result<()> {
    match annotation {
        Annotation::Semantic { span, label } => writeln!(
            out,
            "{number}\t{}\t{}\t{}\t{}\t{}",
            span.start,
            span.end,
            label.namespace,
            label.identifier,
            covered(tokens, span)
        )?,
        Annotation::Relationship { label, members } => writeln!(
            out,
            "{number}\tREL\t{}\t{}\t{}",
            label.namespace,
            label.identifier,
            members
                .iter()
                .map(|m| format!("{}-{}", m.start, m.end))
                .join(",")
        )?,
    }
    Ok(())
}

//! Line tokenization for kernsh
//!
//! A raw input line is split into a command word, ordered argument tokens
//! (positional values and switches), and an optional trailing redirection.
//! Splitting is whitespace-delimited except inside double quotes, which
//! yield a single token with the quotes stripped. Tokens beginning with the
//! switch prefix are switches; `-name=value` attaches an inline value.
//!
//! The trailing redirection sugar is recognized here and stripped before
//! grammar matching ever sees the arguments:
//!
//! ```text
//! cmd a b > out.txt      # overwrite out.txt
//! cmd a b >> out.txt     # append to out.txt
//! cmd a b -> $var        # capture primary output into a variable
//! ```
//!
//! Script mode additionally substitutes `$variables` and `{n}` placeholders
//! before tokenization; see [`substitute_line`].

use std::collections::HashMap;
use std::ops::Range;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::char,
    combinator::{map, opt},
    sequence::{delimited, preceded},
    IResult,
};
use thiserror::Error;

/// Default prefix that marks a token as a switch.
pub const DEFAULT_SWITCH_PREFIX: char = '-';

#[derive(Error, Debug, PartialEq)]
pub enum LexError {
    #[error("Unterminated quote")]
    UnterminatedQuote,
    #[error("Unexpected character: {0}")]
    UnexpectedChar(char),
    #[error("Redirection operator without a target")]
    DanglingRedirection,
    #[error("Redirection operator in the middle of a line")]
    StrayRedirection,
}

/// One argument token, in the order it appeared on the line.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgToken {
    /// A positional value (quotes already stripped).
    Positional(String),
    /// A switch, with its inline `=value` if one was given.
    Switch { name: String, value: Option<String> },
}

/// Trailing redirection stripped from the argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum Redirection {
    /// `> path` - replace the file with the command's primary output.
    Overwrite(String),
    /// `>> path` - append the primary output to the file.
    Append(String),
    /// `-> $name` - capture the primary output into a variable.
    Capture(String),
}

/// A fully tokenized input line, ready for grammar matching.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedLine {
    /// The command word (first token).
    pub command: String,
    /// Argument tokens in order of appearance.
    pub args: Vec<ArgToken>,
    /// The original positional-argument substring, switches and redirection
    /// excised, internal spacing preserved.
    pub arguments_text: String,
    /// Trailing redirection, if the line used one.
    pub redirection: Option<Redirection>,
    /// The raw line as typed.
    pub raw: String,
}

impl TokenizedLine {
    /// Positional tokens only, in order.
    pub fn positionals(&self) -> Vec<&str> {
        self.args
            .iter()
            .filter_map(|t| match t {
                ArgToken::Positional(p) => Some(p.as_str()),
                ArgToken::Switch { .. } => None,
            })
            .collect()
    }

    /// Switch tokens only, in order.
    pub fn switches(&self) -> Vec<(&str, Option<&str>)> {
        self.args
            .iter()
            .filter_map(|t| match t {
                ArgToken::Switch { name, value } => Some((name.as_str(), value.as_deref())),
                ArgToken::Positional(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RedirOp {
    Write,
    Append,
    /// `->`, possibly with the `$name` attached directly (`->$name`).
    Capture(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
enum RawToken {
    Word(String),
    Quoted(String),
    Switch { name: String, value: Option<String> },
    Op(RedirOp),
}

pub(crate) fn ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn switch_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Parse a double-quoted string, quotes stripped.
fn quoted(input: &str) -> IResult<&str, RawToken> {
    map(
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        |s: &str| RawToken::Quoted(s.to_string()),
    )(input)
}

/// Parse >> (must come before >).
fn append_op(input: &str) -> IResult<&str, RawToken> {
    map(tag(">>"), |_| RawToken::Op(RedirOp::Append))(input)
}

/// Parse >.
fn write_op(input: &str) -> IResult<&str, RawToken> {
    map(char('>'), |_| RawToken::Op(RedirOp::Write))(input)
}

/// Parse -> with an optionally attached $name (must come before switches).
fn capture_op(input: &str) -> IResult<&str, RawToken> {
    let (input, _) = tag("->")(input)?;
    let (input, var) = opt(preceded(char('$'), take_while1(ident_char)))(input)?;
    Ok((input, RawToken::Op(RedirOp::Capture(var.map(String::from)))))
}

/// Parse a switch: prefix, name, optional inline `=value`.
fn switch(prefix: char) -> impl FnMut(&str) -> IResult<&str, RawToken> {
    move |input| {
        let (input, _) = char(prefix)(input)?;
        let (input, name) = take_while1(switch_name_char)(input)?;
        let (input, value) = opt(preceded(
            char('='),
            alt((
                map(
                    delimited(char('"'), take_while(|c| c != '"'), char('"')),
                    str::to_string,
                ),
                map(
                    take_while1(|c: char| !c.is_whitespace() && c != '"'),
                    str::to_string,
                ),
            )),
        ))(input)?;
        Ok((
            input,
            RawToken::Switch {
                name: name.to_string(),
                value,
            },
        ))
    }
}

/// Parse a bare word (command name or positional argument).
fn word(input: &str) -> IResult<&str, RawToken> {
    map(
        take_while1(|c: char| !c.is_whitespace() && c != '"'),
        |s: &str| RawToken::Word(s.to_string()),
    )(input)
}

/// Parse any single token.
fn raw_token(prefix: char) -> impl FnMut(&str) -> IResult<&str, RawToken> {
    move |input| alt((append_op, write_op, capture_op, switch(prefix), quoted, word))(input)
}

/// Quote-aware tokenizer with a configurable switch prefix.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    switch_prefix: char,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Tokenizer {
            switch_prefix: DEFAULT_SWITCH_PREFIX,
        }
    }
}

impl Tokenizer {
    pub fn new(switch_prefix: char) -> Self {
        Tokenizer { switch_prefix }
    }

    /// Tokenize one input line.
    ///
    /// Returns `Ok(None)` for no-op lines: empty, `#`-prefixed, or starting
    /// with whitespace. Those never reach the dispatcher.
    pub fn tokenize(&self, line: &str) -> Result<Option<TokenizedLine>, LexError> {
        if line.trim().is_empty()
            || line.starts_with('#')
            || line.starts_with(' ')
            || line.starts_with('\t')
        {
            return Ok(None);
        }

        let spanned = self.scan(line)?;
        self.assemble(line, spanned).map(Some)
    }

    /// Scan the line into raw tokens with their byte spans.
    fn scan(&self, line: &str) -> Result<Vec<(Range<usize>, RawToken)>, LexError> {
        let mut spanned = Vec::new();
        let mut rest = line;
        loop {
            let trimmed = rest.trim_start();
            if trimmed.is_empty() {
                break;
            }
            let start = line.len() - trimmed.len();
            match raw_token(self.switch_prefix)(trimmed) {
                Ok((after, tok)) => {
                    let end = line.len() - after.len();
                    spanned.push((start..end, tok));
                    rest = after;
                }
                Err(_) => {
                    if trimmed.starts_with('"') {
                        return Err(LexError::UnterminatedQuote);
                    }
                    return Err(LexError::UnexpectedChar(
                        trimmed.chars().next().unwrap_or(' '),
                    ));
                }
            }
        }
        Ok(spanned)
    }

    /// Turn the raw token stream into a [`TokenizedLine`], peeling the
    /// trailing redirection and computing `arguments_text` from spans.
    fn assemble(
        &self,
        line: &str,
        spanned: Vec<(Range<usize>, RawToken)>,
    ) -> Result<TokenizedLine, LexError> {
        let op_idx = spanned
            .iter()
            .position(|(_, t)| matches!(t, RawToken::Op(_)));
        let (body, tail) = match op_idx {
            Some(i) => spanned.split_at(i),
            None => (&spanned[..], &[][..]),
        };

        let redirection = peel_redirection(tail)?;

        let mut iter = body.iter();
        let command = match iter.next() {
            Some((_, RawToken::Word(w))) => w.clone(),
            Some((_, RawToken::Quoted(q))) => q.clone(),
            Some((span, _)) => line[span.clone()].to_string(),
            None => return Err(LexError::StrayRedirection),
        };

        let mut args = Vec::new();
        let mut pos_spans: Vec<Range<usize>> = Vec::new();
        let mut switch_spans: Vec<Range<usize>> = Vec::new();
        for (span, tok) in iter {
            match tok {
                RawToken::Word(w) => {
                    args.push(ArgToken::Positional(w.clone()));
                    pos_spans.push(span.clone());
                }
                RawToken::Quoted(q) => {
                    args.push(ArgToken::Positional(q.clone()));
                    pos_spans.push(span.clone());
                }
                RawToken::Switch { name, value } => {
                    args.push(ArgToken::Switch {
                        name: name.clone(),
                        value: value.clone(),
                    });
                    switch_spans.push(span.clone());
                }
                RawToken::Op(_) => return Err(LexError::StrayRedirection),
            }
        }

        let arguments_text = arguments_text(line, &pos_spans, &switch_spans);

        Ok(TokenizedLine {
            command,
            args,
            arguments_text,
            redirection,
            raw: line.to_string(),
        })
    }
}

/// Validate and convert the trailing operator tokens.
fn peel_redirection(tail: &[(Range<usize>, RawToken)]) -> Result<Option<Redirection>, LexError> {
    match tail {
        [] => Ok(None),
        [(_, RawToken::Op(RedirOp::Write)), (_, target)] => {
            Ok(Some(Redirection::Overwrite(op_target(target)?)))
        }
        [(_, RawToken::Op(RedirOp::Append)), (_, target)] => {
            Ok(Some(Redirection::Append(op_target(target)?)))
        }
        [(_, RawToken::Op(RedirOp::Capture(Some(var))))] => {
            Ok(Some(Redirection::Capture(var.clone())))
        }
        [(_, RawToken::Op(RedirOp::Capture(None))), (_, RawToken::Word(w))] => {
            match w.strip_prefix('$') {
                Some(name) if !name.is_empty() => Ok(Some(Redirection::Capture(name.into()))),
                _ => Err(LexError::DanglingRedirection),
            }
        }
        [(_, RawToken::Op(_))] => Err(LexError::DanglingRedirection),
        _ => Err(LexError::StrayRedirection),
    }
}

fn op_target(tok: &RawToken) -> Result<String, LexError> {
    match tok {
        RawToken::Word(w) => Ok(w.clone()),
        RawToken::Quoted(q) => Ok(q.clone()),
        _ => Err(LexError::DanglingRedirection),
    }
}

/// Slice the positional region out of the raw line, excising switch spans.
fn arguments_text(line: &str, pos: &[Range<usize>], switches: &[Range<usize>]) -> String {
    let (first, last) = match (pos.first(), pos.last()) {
        (Some(f), Some(l)) => (f.start, l.end),
        _ => return String::new(),
    };

    let mut text = String::with_capacity(last - first);
    let mut cursor = first;
    let mut excised = false;
    for span in switches {
        if span.start > first && span.end < last {
            text.push_str(&line[cursor..span.start]);
            cursor = span.end;
            excised = true;
        }
    }
    text.push_str(&line[cursor..last]);

    // Excising a switch leaves a doubled separator.
    if excised {
        while text.contains("  ") {
            text = text.replace("  ", " ");
        }
    }
    text.trim().to_string()
}

/// Tokenize with the default switch prefix.
pub fn tokenize(line: &str) -> Result<Option<TokenizedLine>, LexError> {
    Tokenizer::default().tokenize(line)
}

/// Script-mode placeholder substitution.
///
/// Quote-aware: every unquoted token beginning with `$` is replaced by the
/// named variable's value (missing variables substitute to the empty
/// string); every token of the exact form `{n}` is replaced by the script's
/// own invocation argument `n`, or left verbatim when out of range. Quoted
/// tokens and whitespace pass through untouched.
pub fn substitute_line(
    line: &str,
    vars: &HashMap<String, String>,
    script_args: &[String],
) -> String {
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    let len = line.len();

    while i < len {
        let rest = &line[i..];
        let c = match rest.chars().next() {
            Some(c) => c,
            None => break,
        };
        if c.is_whitespace() {
            out.push(c);
            i += c.len_utf8();
            continue;
        }
        if c == '"' {
            // Copy the quoted token verbatim, closing quote included.
            let end = match rest[1..].find('"') {
                Some(p) => i + 1 + p + 1,
                None => len,
            };
            out.push_str(&line[i..end]);
            i = end;
            continue;
        }
        let end = rest.find(char::is_whitespace).map(|p| i + p).unwrap_or(len);
        let token = &line[i..end];
        out.push_str(&substitute_token(token, vars, script_args));
        i = end;
    }

    out
}

fn substitute_token(
    token: &str,
    vars: &HashMap<String, String>,
    script_args: &[String],
) -> String {
    if let Some(name) = token.strip_prefix('$') {
        if !name.is_empty() && name.chars().all(ident_char) {
            return vars.get(name).cloned().unwrap_or_default();
        }
    }
    if let Some(inner) = token.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        if let Ok(n) = inner.parse::<usize>() {
            if let Some(arg) = script_args.get(n) {
                return arg.clone();
            }
        }
    }
    token.to_string()
}

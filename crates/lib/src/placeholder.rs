//! Placeholder parsing and substitution for rule command templates.
//!
//! Rule commands are written once, as templates, and filled in per
//! invocation. Placeholders mark the holes.
//!
//! # Placeholder Formats
//!
//! - `$${in}` - the invocation's inputs, space separated
//! - `$${out}` - the invocation's output
//! - `$${rspfile}` - the response file holding the inputs (`<out>.rsp`)
//! - `$${param:NAME}` - a rule parameter, e.g. `$${param:outDir}`
//! - `$${config:NAME}` - a toolchain value, e.g. `$${config:javac}`
//!
//! # Shell Variables
//!
//! Single `$` characters pass through unchanged, so shell constructs like
//! `$(pwd)` and `$HOME` work without escaping.
//!
//! # Escaping
//!
//! Use `$$$` before `{` to produce a literal `$${` sequence.
//!
//! # Example
//!
//! ```
//! use dexrule_lib::placeholder::{parse, Placeholder, Segment};
//! use dexrule_lib::rule::Param;
//!
//! let segments = parse("mkdir -p $${param:outDir} && cd $(pwd)").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("mkdir -p ".to_string()),
//!     Segment::Placeholder(Placeholder::Param(Param::OutDir)),
//!     Segment::Literal(" && cd $(pwd)".to_string()),
//! ]);
//! ```

use thiserror::Error;

use crate::rule::Param;
use crate::toolchain::ConfigVar;

/// A parsed placeholder reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
  /// `$${in}` - the invocation's inputs
  In,

  /// `$${out}` - the invocation's output
  Out,

  /// `$${rspfile}` - response file listing the inputs
  RspFile,

  /// `$${param:NAME}` - a per-invocation rule parameter
  Param(Param),

  /// `$${config:NAME}` - a toolchain value bound when the rule is registered
  Config(ConfigVar),
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no placeholders)
  Literal(String),

  /// A placeholder to be resolved
  Placeholder(Placeholder),
}

/// Errors that can occur during placeholder parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder type: {0}")]
  UnknownType(String),

  #[error("unknown rule parameter: {0}")]
  UnknownParam(String),

  #[error("unknown toolchain value: {0}")]
  UnknownConfig(String),

  #[error("malformed placeholder: {0}")]
  Malformed(String),

  #[error("unresolved parameter: {0}")]
  UnresolvedParam(Param),

  #[error("unresolved toolchain value: {0}")]
  UnresolvedConfig(ConfigVar),

  #[error("unresolved placeholder: {0}")]
  Unresolved(String),
}

/// Trait for resolving placeholder values when a command is rendered.
pub trait Resolver {
  /// Resolve the inputs, joined the way the command line expects.
  fn resolve_in(&self) -> Result<String, PlaceholderError>;

  /// Resolve the output path.
  fn resolve_out(&self) -> Result<String, PlaceholderError>;

  /// Resolve the response file path.
  fn resolve_rspfile(&self) -> Result<String, PlaceholderError>;

  /// Resolve a rule parameter.
  fn resolve_param(&self, param: Param) -> Result<String, PlaceholderError>;

  /// Resolve a toolchain value.
  fn resolve_config(&self, var: ConfigVar) -> Result<String, PlaceholderError>;
}

/// Parse a string containing placeholders into segments.
///
/// # Errors
///
/// Returns an error if a placeholder is malformed (unclosed, unknown type,
/// unknown parameter name, etc.)
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '$')) => {
        chars.next(); // consume the second $

        match chars.peek() {
          Some((_, '$')) => {
            chars.next(); // consume the third $

            match chars.peek() {
              Some((_, '{')) => {
                // Escaped: $$${ -> $${ (literal)
                literal.push_str("$${");
                chars.next();
              }
              _ => literal.push_str("$$$"),
            }
          }
          Some((_, '{')) => {
            chars.next(); // consume the {

            if !literal.is_empty() {
              segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }

            let mut content = String::new();
            let mut found_close = false;
            for (_, c) in chars.by_ref() {
              if c == '}' {
                found_close = true;
                break;
              }
              content.push(c);
            }

            if !found_close {
              return Err(PlaceholderError::Unclosed(pos));
            }

            segments.push(Segment::Placeholder(parse_placeholder_content(&content)?));
          }
          _ => literal.push_str("$$"),
        }
      }
      // A lone $ is literal so shell syntax passes through
      _ => literal.push('$'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Parse the content inside a placeholder (everything between `$${` and `}`).
fn parse_placeholder_content(content: &str) -> Result<Placeholder, PlaceholderError> {
  match content {
    "in" => return Ok(Placeholder::In),
    "out" => return Ok(Placeholder::Out),
    "rspfile" => return Ok(Placeholder::RspFile),
    _ => {}
  }

  let (kind, name) = content
    .split_once(':')
    .ok_or_else(|| PlaceholderError::Malformed(format!("missing colon in '{content}'")))?;

  match kind {
    "param" => Param::parse(name)
      .map(Placeholder::Param)
      .ok_or_else(|| PlaceholderError::UnknownParam(name.to_string())),
    "config" => ConfigVar::parse(name)
      .map(Placeholder::Config)
      .ok_or_else(|| PlaceholderError::UnknownConfig(name.to_string())),
    _ => Err(PlaceholderError::UnknownType(kind.to_string())),
  }
}

/// Substitute all placeholders in a string using the provided resolver.
///
/// # Errors
///
/// Returns an error if parsing fails or if any placeholder cannot be resolved.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  substitute_segments(&segments, resolver)
}

/// Substitute placeholders in pre-parsed segments.
pub fn substitute_segments(segments: &[Segment], resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Placeholder(p) => {
        let value = match p {
          Placeholder::In => resolver.resolve_in()?,
          Placeholder::Out => resolver.resolve_out()?,
          Placeholder::RspFile => resolver.resolve_rspfile()?,
          Placeholder::Param(param) => resolver.resolve_param(*param)?,
          Placeholder::Config(var) => resolver.resolve_config(*var)?,
        };
        result.push_str(&value);
      }
    }
  }

  Ok(result)
}

/// Replace the placeholders `bind` returns a value for with literal text.
///
/// Placeholders for which `bind` returns `Ok(None)` are kept. Adjacent
/// literals are merged.
pub fn bind_segments<F>(segments: &[Segment], mut bind: F) -> Result<Vec<Segment>, PlaceholderError>
where
  F: FnMut(&Placeholder) -> Result<Option<String>, PlaceholderError>,
{
  let mut bound: Vec<Segment> = Vec::with_capacity(segments.len());

  for segment in segments {
    let next = match segment {
      Segment::Literal(s) => Segment::Literal(s.clone()),
      Segment::Placeholder(p) => match bind(p)? {
        Some(value) => Segment::Literal(value),
        None => Segment::Placeholder(p.clone()),
      },
    };

    match (bound.last_mut(), next) {
      (Some(Segment::Literal(prev)), Segment::Literal(s)) => prev.push_str(&s),
      (_, next) => bound.push(next),
    }
  }

  Ok(bound)
}

/// Iterate over the placeholders in parsed segments.
pub fn placeholders(segments: &[Segment]) -> impl Iterator<Item = &Placeholder> {
  segments.iter().filter_map(|s| match s {
    Segment::Placeholder(p) => Some(p),
    Segment::Literal(_) => None,
  })
}

/// Write segments back in template syntax, escaping literal `$${`.
pub fn render_template(segments: &[Segment]) -> String {
  let mut out = String::new();
  for segment in segments {
    match segment {
      Segment::Literal(s) => out.push_str(&s.replace("$${", "$$${")),
      Segment::Placeholder(p) => {
        let text = match p {
          Placeholder::In => "$${in}".to_string(),
          Placeholder::Out => "$${out}".to_string(),
          Placeholder::RspFile => "$${rspfile}".to_string(),
          Placeholder::Param(param) => format!("$${{param:{param}}}"),
          Placeholder::Config(var) => format!("$${{config:{var}}}"),
        };
        out.push_str(&text);
      }
    }
  }
  out
}

//! A small Lucene-flavoured query language compiled to FTS5 expressions.
//!
//! Supported: bare terms, `"quoted phrases"`, `field:value`, trailing `*`
//! for prefix matches, `OR` between terms, `AND` (implicit between terms),
//! negation with a leading `-` or `NOT`, and `*:*` for everything (so
//! `-*:*` matches nothing).
//!
//! Negations cannot be expressed inside a single FTS5 `MATCH` without a
//! positive term, so they are compiled separately and applied as
//! exclusions.

use crate::error::ParseError;

/// Searchable columns of the full-text table. `text` searches them all.
pub const FIELDS: &[&str] =
  &["name", "title", "notes", "tags", "res_text", "res_format", "organization"];

/// Field aliases accepted in queries.
fn resolve_field(field: &str) -> Option<&'static str> {
  match field {
    "text" => Some(""),
    "res_name" | "res_description" | "res_url" => Some("res_text"),
    "tag" => Some("tags"),
    "organization_name" | "owner_org" => Some("organization"),
    other => FIELDS.iter().copied().find(|f| *f == other),
  }
}

/// The compiled query: FTS5 expressions for what must match and for what
/// must not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
  /// `None` matches every document.
  pub positive:     Option<String>,
  pub negative:     Vec<String>,
  /// A negated `*:*` excludes every document.
  pub matches_none: bool,
}

impl ParsedQuery {
  pub fn matches_all(&self) -> bool {
    self.positive.is_none() && self.negative.is_empty() && !self.matches_none
  }
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
  Term(Clause),
  Or,
  And,
  Not,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
  negated: bool,
  kind:    ClauseKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClauseKind {
  All,
  Match {
    /// FTS column; `None` searches every column.
    column: Option<&'static str>,
    text:   String,
    prefix: bool,
  },
}

/// Split on whitespace outside of quotes.
fn words(input: &str) -> Result<Vec<String>, ParseError> {
  let mut words = Vec::new();
  let mut current = String::new();
  let mut quoted = false;
  for c in input.chars() {
    match c {
      '"' => {
        quoted = !quoted;
        current.push(c);
      }
      c if c.is_whitespace() && !quoted => {
        if !current.is_empty() {
          words.push(std::mem::take(&mut current));
        }
      }
      c => current.push(c),
    }
  }
  if quoted {
    return Err(ParseError::UnbalancedQuote);
  }
  if !current.is_empty() {
    words.push(current);
  }
  Ok(words)
}

fn is_plain_char(c: char) -> bool {
  !matches!(
    c,
    '(' | ')' | '{' | '}' | '[' | ']' | '^' | '~' | ':' | '"' | '\\' | '!'
  )
}

fn term(raw: &str) -> Result<Token, ParseError> {
  match raw {
    "OR" | "||" => return Ok(Token::Or),
    "AND" | "&&" => return Ok(Token::And),
    "NOT" => return Ok(Token::Not),
    _ => {}
  }

  let (negated, body) = match raw.strip_prefix('-') {
    Some(rest) => (true, rest),
    None => (false, raw.strip_prefix('+').unwrap_or(raw)),
  };
  if body.is_empty() || body.starts_with('-') || body.starts_with('+') {
    return Err(ParseError::InvalidTerm(raw.to_owned()));
  }
  if body == "*:*" || body == "*" {
    return Ok(Token::Term(Clause { negated, kind: ClauseKind::All }));
  }

  // A colon before any quote introduces a field.
  let (column, value) = match body.find(':') {
    Some(i) if !body[..i].contains('"') => {
      let field = &body[..i];
      let column = resolve_field(field)
        .ok_or_else(|| ParseError::UnknownField(field.to_owned()))?;
      let value = &body[i + 1..];
      if value.is_empty() {
        return Err(ParseError::EmptyValue(field.to_owned()));
      }
      ((!column.is_empty()).then_some(column), value)
    }
    _ => (None, body),
  };

  let (text, prefix) = if let Some(inner) =
    value.strip_prefix('"').and_then(|v| v.strip_suffix('"'))
  {
    if inner.contains('"') {
      return Err(ParseError::InvalidTerm(raw.to_owned()));
    }
    (inner.to_owned(), false)
  } else {
    let (text, prefix) = match value.strip_suffix('*') {
      Some(stem) => (stem, true),
      None => (value, false),
    };
    if text.is_empty() || !text.chars().all(is_plain_char) || text.contains('*')
    {
      return Err(ParseError::InvalidTerm(raw.to_owned()));
    }
    (text.to_owned(), prefix)
  };

  Ok(Token::Term(Clause {
    negated,
    kind: ClauseKind::Match { column, text, prefix },
  }))
}

// ─── Compilation ─────────────────────────────────────────────────────────────

fn fts_clause(kind: &ClauseKind) -> Option<String> {
  let ClauseKind::Match { column, text, prefix } = kind else {
    return None;
  };
  // Text without any word characters tokenizes to nothing in FTS5.
  if !text.chars().any(char::is_alphanumeric) {
    return None;
  }
  let mut out = String::new();
  if let Some(column) = column {
    out.push_str(column);
    out.push_str(" : ");
  }
  out.push('"');
  out.push_str(&text.replace('"', "\"\""));
  out.push('"');
  if *prefix {
    out.push_str(" *");
  }
  Some(out)
}

/// Parse `input` into FTS5 expressions. Blank input and `*:*` match all.
pub fn parse(input: &str) -> Result<ParsedQuery, ParseError> {
  let tokens = words(input)?
    .iter()
    .map(|w| term(w))
    .collect::<Result<Vec<_>, _>>()?;

  // Each group is a run of clauses joined by OR; groups are ANDed.
  let mut groups: Vec<Vec<Clause>> = Vec::new();
  let mut pending_or = false;
  let mut pending_not = false;
  let mut previous_was_term = false;

  for token in tokens {
    match token {
      Token::Or | Token::And => {
        let op = if token == Token::Or { "OR" } else { "AND" };
        if !previous_was_term || pending_not {
          return Err(ParseError::DanglingOperator(op.into()));
        }
        pending_or = token == Token::Or;
        previous_was_term = false;
      }
      Token::Not => {
        if pending_not {
          return Err(ParseError::DanglingOperator("NOT".into()));
        }
        pending_not = true;
      }
      Token::Term(mut clause) => {
        if pending_not {
          clause.negated = !clause.negated;
          pending_not = false;
        }
        match groups.last_mut() {
          Some(group) if pending_or => {
            if clause.negated || group.iter().any(|c| c.negated) {
              return Err(ParseError::NegatedAlternative);
            }
            group.push(clause);
          }
          _ => groups.push(vec![clause]),
        }
        pending_or = false;
        previous_was_term = true;
      }
    }
  }
  if pending_not {
    return Err(ParseError::DanglingOperator("NOT".into()));
  }
  if !previous_was_term && !groups.is_empty() {
    let op = if pending_or { "OR" } else { "AND" };
    return Err(ParseError::DanglingOperator(op.into()));
  }

  let mut positive = Vec::new();
  let mut negative = Vec::new();
  let mut matches_none = false;
  for group in groups {
    if group.iter().all(|c| c.negated) {
      // A negated group always has exactly one clause.
      match group.first().map(|c| &c.kind) {
        Some(ClauseKind::All) => matches_none = true,
        Some(kind) => negative.extend(fts_clause(kind)),
        None => {}
      }
      continue;
    }
    // `x OR *:*` constrains nothing.
    if group.iter().any(|c| c.kind == ClauseKind::All) {
      continue;
    }
    let parts: Vec<String> =
      group.iter().filter_map(|c| fts_clause(&c.kind)).collect();
    match parts.len() {
      0 => {}
      1 => positive.extend(parts),
      _ => positive.push(format!("({})", parts.join(" OR "))),
    }
  }

  Ok(ParsedQuery {
    positive: (!positive.is_empty()).then(|| positive.join(" AND ")),
    negative,
    matches_none,
  })
}

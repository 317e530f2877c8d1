//! Lexical layer of the `.tsm` format: one statement per line, `#`/`;`
//! comments, optional double quotes around values.

/// A meaningful line after comment stripping and trimming.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Statement {
    /// `[name]`, `[name: arg]` or `[name arg]`. The name is case-folded, the
    /// arg unquoted.
    Section { name: String, arg: Option<String> },
    /// `key = value`. The key is case-folded, the value unquoted.
    KeyValue { key: String, value: String },
}

/// A line that is neither empty nor a well-formed statement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LineDefect {
    UnterminatedSection,
    MissingEquals,
}

impl LineDefect {
    pub const fn message(&self) -> &'static str {
        match self {
            LineDefect::UnterminatedSection => "section header is missing its closing `]`",
            LineDefect::MissingEquals => "expected `key = value` or `[section]`",
        }
    }
}

/// Classifies one raw line. `None` for blank lines and comments.
pub fn statement(raw: &str) -> Option<Result<Statement, LineDefect>> {
    let line = strip_comment(raw).trim();
    if line.is_empty() {
        return None;
    }

    if let Some(rest) = line.strip_prefix('[') {
        let Some(inner) = rest.strip_suffix(']') else {
            return Some(Err(LineDefect::UnterminatedSection));
        };
        let inner = inner.trim();
        let (name, arg) = match inner.split_once([':', ' ']) {
            Some((name, arg)) => (name, Some(arg)),
            None => (inner, None),
        };
        return Some(Ok(Statement::Section {
            name: name.trim().to_ascii_lowercase(),
            arg: arg.map(|a| unquote(a.trim()).to_owned()).filter(|a| !a.is_empty()),
        }));
    }

    let Some((key, value)) = line.split_once('=') else {
        return Some(Err(LineDefect::MissingEquals));
    };
    Some(Ok(Statement::KeyValue {
        key: key.trim().to_ascii_lowercase(),
        value: unquote(value.trim()).to_owned(),
    }))
}

/// Everything from the first `#` or `;` to end-of-line is dropped; a line
/// whose first non-whitespace byte is a comment character becomes empty.
fn strip_comment(raw: &str) -> &str {
    match raw.find(['#', ';']) {
        Some(at) => &raw[..at],
        None => raw,
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(s)
}

//! Renders inventory templates with Tera. Only the bound required keys are available inside the
//! template, and any other name referenced from a `{{ }}` or `{% %}` tag is rejected before
//! rendering.

use std::{
    error::Error as _,
    fs,
    path::Path,
    sync::LazyLock,
};

use regex::Regex;
use tera::Tera;
use tracing::debug;

use crate::{
    bindings::Bindings,
    error::{InventoryError, Result},
    keys::RequiredKeys,
};

/// Names inside tags that never refer to a key.
const KEYWORDS: [&str; 11] = [
    "and",
    "or",
    "not",
    "in",
    "is",
    "true",
    "false",
    "True",
    "False",
    "loop",
    "__tera_context",
];

/// Tags whose arguments are not expressions over keys.
const OPAQUE_TAGS: [&str; 17] = [
    "else",
    "endif",
    "endfor",
    "endraw",
    "raw",
    "break",
    "continue",
    "filter",
    "endfilter",
    "block",
    "endblock",
    "macro",
    "endmacro",
    "extends",
    "include",
    "import",
    "endset",
];

static RAW_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{%-?\s*raw\s*-?%\}.*?\{%-?\s*endraw\s*-?%\}")
        .expect("raw block regex is valid")
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{#.*?#\}").expect("comment regex is valid"));

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{(.*?)\}\}|\{%(.*?)%\}").expect("tag regex is valid")
});

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|`[^`]*`|[A-Za-z_][A-Za-z0-9_]*|[0-9][0-9_.]*|==|!=|<=|>=|\S"#,
    )
    .expect("token regex is valid")
});

static UNDEFINED_VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Variable `([^`]+)` not found in context").expect("undefined variable regex is valid")
});

#[derive(Debug)]
pub struct Template {
    source: String,
}

/// One `{{ }}` or `{% %}` tag, split into tokens.
struct Tag<'a> {
    statement: bool,
    tokens: Vec<&'a str>,
}

impl Template {
    pub fn load(path: &Path) -> Result<Self> {
        let source =
            fs::read_to_string(path).map_err(|source| InventoryError::TemplateNotFound {
                path: path.to_owned(),
                source,
            })?;
        debug!(?path, bytes = source.len(), "Loaded template");
        Ok(Self::from_source(source))
    }

    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The names the template reads from its context, in order of first appearance.
    ///
    /// Raw blocks and comments are ignored. Attribute, filter, test and function names, keyword
    /// arguments, literals, and loop or `set` variables declared inside the template are not
    /// included.
    pub fn placeholders(&self) -> Vec<String> {
        let without_raw = RAW_BLOCK.replace_all(&self.source, "");
        let scanned = COMMENT.replace_all(&without_raw, "");
        let tags = tags(&scanned);

        let mut locals: Vec<&str> = Vec::new();
        for tag in tags.iter().filter(|tag| tag.statement) {
            match tag.tokens.first().copied() {
                Some("for") => locals.extend(
                    tag.tokens[1..]
                        .iter()
                        .take_while(|token| **token != "in")
                        .filter(|token| **token != ","),
                ),
                Some("set" | "set_global") => locals.extend(tag.tokens.get(1)),
                _ => {}
            }
        }

        let mut names: Vec<String> = Vec::new();
        for tag in &tags {
            for name in tag.expression_names() {
                if !locals.contains(&name) && !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    /// Renders the template. Fails on the first placeholder outside the required set.
    ///
    /// Like Jinja, a single trailing newline of the template is not rendered.
    pub fn render(&self, keys: &RequiredKeys, bindings: &Bindings) -> Result<String> {
        if let Some(name) = self
            .placeholders()
            .into_iter()
            .find(|name| !keys.contains(name))
        {
            return Err(InventoryError::UndefinedPlaceholder { name });
        }

        let source = strip_trailing_newline(&self.source);
        let mut tera = Tera::default();
        tera.render_str(source, &bindings.to_context())
            .map_err(|e| {
                let reason = error_chain(&e);
                match undefined_variable(&reason) {
                    Some(name) if !keys.contains(&name) => {
                        InventoryError::UndefinedPlaceholder { name }
                    }
                    _ => InventoryError::TemplateSyntax { reason },
                }
            })
    }
}

impl<'a> Tag<'a> {
    /// Context names referenced by this tag's expression, locals not yet filtered out.
    fn expression_names(&self) -> Vec<&'a str> {
        let tokens = &self.tokens;
        let expression: &[&'a str] = if self.statement {
            match tokens.first().copied() {
                Some("if" | "elif") => &tokens[1..],
                Some("for") => match tokens.iter().position(|token| *token == "in") {
                    Some(i) => &tokens[i + 1..],
                    None => &[],
                },
                Some("set" | "set_global") => {
                    match tokens.iter().position(|token| *token == "=") {
                        Some(i) => &tokens[i + 1..],
                        None => &[],
                    }
                }
                Some(keyword) if OPAQUE_TAGS.contains(&keyword) => &[],
                _ => &tokens[..],
            }
        } else {
            &tokens[..]
        };

        let mut names = Vec::new();
        for (i, token) in expression.iter().copied().enumerate() {
            if !starts_identifier(token) || KEYWORDS.contains(&token) {
                continue;
            }
            let prev = i.checked_sub(1).map(|j| expression[j]);
            let before_prev = i.checked_sub(2).map(|j| expression[j]);
            let next = expression.get(i + 1).copied();

            // `a.attr`, `a | filter`
            if matches!(prev, Some("." | "|")) {
                continue;
            }
            // `a is test`, `a is not test`
            if prev == Some("is") || (prev == Some("not") && before_prev == Some("is")) {
                continue;
            }
            // `function(...)`, `name=value` arguments
            if matches!(next, Some("(" | "=")) {
                continue;
            }
            names.push(token);
        }
        names
    }
}

fn tags(source: &str) -> Vec<Tag<'_>> {
    TAG.captures_iter(source)
        .filter_map(|captures| {
            let (body, statement) = match (captures.get(1), captures.get(2)) {
                (Some(body), _) => (body.as_str(), false),
                (None, Some(body)) => (body.as_str(), true),
                (None, None) => return None,
            };
            let body = body
                .trim()
                .trim_start_matches(['-', '+'])
                .trim_end_matches('-');
            Some(Tag {
                statement,
                tokens: TOKEN.find_iter(body).map(|m| m.as_str()).collect(),
            })
        })
        .collect()
}

fn starts_identifier(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

fn strip_trailing_newline(source: &str) -> &str {
    source
        .strip_suffix("\r\n")
        .or_else(|| source.strip_suffix('\n'))
        .unwrap_or(source)
}

/// The root name of a Tera "Variable `x` not found in context" error.
fn undefined_variable(reason: &str) -> Option<String> {
    let variable = UNDEFINED_VARIABLE.captures(reason)?.get(1)?.as_str();
    let root = variable.split(['.', '[']).next().unwrap_or(variable);
    Some(root.to_string())
}

// Tera puts the useful part of the message in the source chain, see
// `https://github.com/Keats/tera/issues/915`
fn error_chain(error: &tera::Error) -> String {
    let mut reason = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    reason
}

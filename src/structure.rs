//! Best-effort member extraction from Java source text.
//!
//! This is pattern matching, not parsing. It is tuned to reject the usual
//! false positives (calls, constructions, locals) and never fails: malformed
//! input yields fewer members, not an error.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::extract::{FieldInfo, MethodInfo};

const VISIBILITY: [&str; 3] = ["public", "protected", "private"];

const CONTROL_KEYWORDS: [&str; 7] = [
    "if",
    "for",
    "while",
    "switch",
    "catch",
    "synchronized",
    "try",
];

const DECLARATION_KEYWORDS: [&str; 7] = [
    "class",
    "interface",
    "enum",
    "extends",
    "implements",
    "import",
    "package",
];

/// Tokens that can sit where a return type would, but never are one.
const NON_TYPES: [&str; 8] = [
    "return", "new", "throw", "else", "case", "do", "assert", "yield",
];

static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<annotations>(?:@[\w.$]+(?:\s*\([^()]*\))?\s+)*)",
        r"(?P<mods>(?:(?:public|protected|private|static|final|abstract|synchronized|native|default|strictfp)\s+)*)",
        r"(?:<(?:[^<>]|<[^<>]*>)*>\s*)?",
        r"(?:(?P<ret>[\w$][\w.$]*(?:\s*<(?:[^<>;{}()]|<(?:[^<>;{}()]|<[^<>;{}()]*>)*>)*>)?(?:\s*\[\s*\])*(?:\.\.\.)?)\s+)?",
        r"(?P<name>[A-Za-z_$][\w$]*)\s*",
        r"\((?P<params>(?:[^()]|\([^()]*\))*)\)\s*",
        r"(?:\[\s*\]\s*)*",
        r"(?:throws\s+[\w.$<>,\s]+?\s*)?",
        r"(?:default\s+[^;{}]*?\s*)?",
        r"[{;]"
    ))
    .expect("method pattern compiles")
});

static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<mods>(?:(?:public|protected|private|static|final|transient|volatile)\s+)+)",
        r"(?P<ty>[\w$][\w.$]*(?:\s*<(?:[^<>;{}()=]|<(?:[^<>;{}()=]|<[^<>;{}()=]*>)*>)*>)?(?:\s*\[\s*\])*)\s+",
        r"(?P<name>[A-Za-z_$][\w$]*)\s*[=;]"
    ))
    .expect("field pattern compiles")
});

static TYPE_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:class|interface|enum|record)\s+(?P<name>[A-Za-z_$][\w$]*)")
        .expect("type declaration pattern compiles")
});

static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@[\w.$]+(?:\s*\([^()]*\))?").expect("annotation pattern compiles")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMembers {
    pub methods: Vec<MethodInfo>,
    pub fields: Vec<FieldInfo>,
}

/// Members of the outermost type in `source`.
pub fn parse_source_members(source: &str) -> SourceMembers {
    parse_nested_members(source, &[]).unwrap_or_default()
}

/// Members of a type nested inside the outermost one, following `path`
/// (`["Inner", "Deeper"]` for `Outer$Inner$Deeper`). Each step must be a
/// member-level `class`, `interface`, `enum` or `record` declaration of the
/// enclosing body. `None` when a step is missing, as for anonymous or local
/// classes.
pub fn parse_nested_members(source: &str, path: &[&str]) -> Option<SourceMembers> {
    let clean = strip_comments_and_literals(source);
    let (mut start, mut end) = class_body(&clean)?;
    let mut type_name = TYPE_DECL_RE
        .captures(&clean[..start])
        .and_then(|c| c.name("name"))
        .map(|m| m.as_str());

    for inner in path {
        let body = &clean[start + 1..end];
        let depth = depth_map(body);
        let decl = TYPE_DECL_RE.captures_iter(body).find(|c| {
            c.name("name").is_some_and(|n| n.as_str() == *inner)
                && c.get(0).is_some_and(|m| at_member_level(&depth, m.start()))
        })?;
        let decl_end = decl.get(0)?.end();
        let (inner_start, inner_end) = class_body(&body[decl_end..])?;
        let base = start + 1 + decl_end;
        start = base + inner_start;
        end = base + inner_end;
        type_name = Some(*inner);
    }

    let body = &clean[start + 1..end];
    let depth = depth_map(body);
    Some(SourceMembers {
        methods: extract_methods(body, &depth, type_name),
        fields: extract_fields(body, &depth),
    })
}

/// Replaces comments with whitespace and empties string, char and text-block
/// literals, keeping newlines and every brace outside them.
pub fn strip_comments_and_literals(source: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Str,
        TextBlock,
        Char,
    }

    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match state {
            State::Code => match (c, next) {
                ('/', Some('/')) => {
                    state = State::LineComment;
                    out.push(' ');
                    i += 2;
                    continue;
                }
                ('/', Some('*')) => {
                    state = State::BlockComment;
                    out.push(' ');
                    i += 2;
                    continue;
                }
                ('"', _) if next == Some('"') && chars.get(i + 2) == Some(&'"') => {
                    state = State::TextBlock;
                    out.push_str("\"\"");
                    i += 3;
                    continue;
                }
                ('"', _) => {
                    state = State::Str;
                    out.push('"');
                }
                ('\'', _) => {
                    state = State::Char;
                    out.push('\'');
                }
                _ => out.push(c),
            },
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                    out.push('\n');
                }
            }
            State::BlockComment => {
                if c == '*' && next == Some('/') {
                    state = State::Code;
                    i += 2;
                    continue;
                }
                if c == '\n' {
                    out.push('\n');
                }
            }
            State::Str | State::Char => {
                let quote = if state == State::Str { '"' } else { '\'' };
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == quote {
                    state = State::Code;
                    out.push(quote);
                } else if c == '\n' {
                    // Unterminated literal; resume code on the next line.
                    state = State::Code;
                    out.push(quote);
                    out.push('\n');
                }
            }
            State::TextBlock => {
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == '"' && next == Some('"') && chars.get(i + 2) == Some(&'"') {
                    state = State::Code;
                    i += 3;
                    continue;
                }
                if c == '\n' {
                    out.push('\n');
                }
            }
        }
        i += 1;
    }
    out
}

/// Byte offsets of the first top-level `{` and its matching `}`. Braces
/// inside parentheses (annotation arrays) do not open the body. An
/// unbalanced body runs to the end of the text.
fn class_body(clean: &str) -> Option<(usize, usize)> {
    let mut parens = 0usize;
    let mut start = None;
    for (i, c) in clean.char_indices() {
        match c {
            '(' => parens += 1,
            ')' => parens = parens.saturating_sub(1),
            '{' if parens == 0 => {
                start = Some(i);
                break;
            }
            _ => {}
        }
    }
    let start = start?;

    let mut depth = 0usize;
    for (i, c) in clean[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + i));
                }
            }
            _ => {}
        }
    }
    Some((start, clean.len()))
}

/// Brace depth before each byte of `body`; members of the class sit at 0.
fn depth_map(body: &str) -> Vec<u32> {
    let mut depth = Vec::with_capacity(body.len() + 1);
    let mut d = 0u32;
    for b in body.bytes() {
        depth.push(d);
        match b {
            b'{' => d += 1,
            b'}' => d = d.saturating_sub(1),
            _ => {}
        }
    }
    depth.push(d);
    depth
}

fn at_member_level(depth: &[u32], pos: usize) -> bool {
    depth.get(pos).copied().unwrap_or(0) == 0
}

fn starts_on_token_boundary(body: &str, pos: usize) -> bool {
    body[..pos]
        .chars()
        .next_back()
        .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '$' || c == '.'))
}

fn preceded_by_new(body: &str, pos: usize) -> bool {
    let before = body[..pos].trim_end();
    before.ends_with("new")
        && before[..before.len() - 3]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '$'))
}

fn extract_methods(body: &str, depth: &[u32], type_name: Option<&str>) -> Vec<MethodInfo> {
    let mut seen = HashSet::new();
    let mut methods = Vec::new();

    for caps in METHOD_RE.captures_iter(body) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let start = whole.start();
        if !at_member_level(depth, start) || !starts_on_token_boundary(body, start) {
            continue;
        }

        let name = caps.name("name").map_or("", |m| m.as_str());
        if CONTROL_KEYWORDS.contains(&name) || DECLARATION_KEYWORDS.contains(&name) {
            continue;
        }
        let modifiers = ordered_modifiers(caps.name("mods").map_or("", |m| m.as_str()));
        if modifiers.is_empty() && preceded_by_new(body, start) {
            continue;
        }

        let ret = caps.name("ret").map(|m| normalize_whitespace(m.as_str()));
        match ret.as_deref() {
            Some(r) if NON_TYPES.contains(&r) || DECLARATION_KEYWORDS.contains(&r) => continue,
            Some(r) if modifiers.is_empty() && r.contains('.') => continue,
            None if type_name != Some(name) => continue,
            _ => {}
        }

        let parameters = split_parameters(caps.name("params").map_or("", |m| m.as_str()));
        let key = format!("{name}({})", parameters.join(","));
        if !seen.insert(key) {
            continue;
        }

        methods.push(MethodInfo {
            name: name.to_string(),
            return_type: ret,
            parameters,
            modifiers,
        });
    }
    methods
}

fn extract_fields(body: &str, depth: &[u32]) -> Vec<FieldInfo> {
    let mut fields = Vec::new();
    for caps in FIELD_RE.captures_iter(body) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if !at_member_level(depth, whole.start()) || !starts_on_token_boundary(body, whole.start())
        {
            continue;
        }
        let field_type = caps.name("ty").map_or("", |m| m.as_str());
        if NON_TYPES.contains(&field_type) || DECLARATION_KEYWORDS.contains(&field_type) {
            continue;
        }
        fields.push(FieldInfo {
            name: caps.name("name").map_or("", |m| m.as_str()).to_string(),
            field_type: normalize_whitespace(field_type),
            modifiers: ordered_modifiers(caps.name("mods").map_or("", |m| m.as_str())),
        });
    }
    fields
}

/// Visibility first, everything else in written order.
fn ordered_modifiers(raw: &str) -> Vec<String> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let mut out: Vec<String> = tokens
        .iter()
        .filter(|t| VISIBILITY.contains(t))
        .map(|t| t.to_string())
        .collect();
    out.extend(
        tokens
            .iter()
            .filter(|t| !VISIBILITY.contains(t))
            .map(|t| t.to_string()),
    );
    out
}

/// Parameter types from a raw parameter list. Only top-level commas split;
/// fragments carrying `=` are dropped.
pub fn split_parameters(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut angle = 0i32;
    let mut paren = 0i32;
    let mut current = String::new();
    for c in raw.chars() {
        match c {
            '<' => angle += 1,
            '>' => angle -= 1,
            '(' => paren += 1,
            ')' => paren -= 1,
            ',' if angle <= 0 && paren <= 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parts.push(current);

    parts
        .into_iter()
        .map(|p| normalize_whitespace(&p))
        .filter(|p| !p.is_empty() && !p.contains('='))
        .map(|p| parameter_type(&p))
        .filter(|p| !p.is_empty())
        .collect()
}

/// `@NonNull final Map<K, V> values` -> `Map<K, V>`.
fn parameter_type(param: &str) -> String {
    let without_annotations = ANNOTATION_RE.replace_all(param, " ");
    let tokens: Vec<&str> = without_annotations
        .split_whitespace()
        .filter(|t| *t != "final")
        .collect();
    let joined = tokens.join(" ");
    if tokens.len() < 2 {
        return joined;
    }
    match joined.rsplit_once(' ') {
        Some((ty, name)) if is_identifier(name) => ty.to_string(),
        _ => joined,
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

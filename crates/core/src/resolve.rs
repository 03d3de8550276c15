//! Variable resolver (C3).
//!
//! Implements the `$input.*` / `$stepResult.*` / `$env.*` / `$<var>.*` reference
//! grammar from §4.2, with the whole-value/interpolation split called
//! out as load-bearing for the type-preservation invariant (§8): a string that *is*
//! nothing but a single reference yields the referent's native JSON type; a string that
//! merely *contains* one or more references gets those occurrences stringified in
//! place. The two modes are deliberately not unified into one code path — see §9,
//! "Variable grammar".

use agentflow_types::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Matches either a `$$` escape or a single `$identifier(.identifier)*` reference.
/// Used for both detecting a whole-value reference and for finding every occurrence
/// during string interpolation.
static REFERENCE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\$|\$[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*").expect("valid regex"));

/// Matches a string that consists of exactly one reference and nothing else.
static WHOLE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("valid regex"));

/// Resolves a template value against the execution context.
///
/// Arrays and mappings are resolved element-wise, recursively. Primitives other than
/// strings are returned unchanged.
pub fn resolve(template: &Value, ctx: &Context) -> Value {
    match template {
        Value::String(text) => resolve_string(text, ctx),
        Value::Array(items) => Value::Array(items.iter().map(|item| resolve(item, ctx)).collect()),
        Value::Object(map) => {
            let mut resolved = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                resolved.insert(key.clone(), resolve(value, ctx));
            }
            Value::Object(resolved)
        }
        other => other.clone(),
    }
}

fn resolve_string(text: &str, ctx: &Context) -> Value {
    if is_whole_value_candidate(text) {
        return resolve_reference_typed(&text[1..], ctx).unwrap_or(Value::Null);
    }
    Value::String(interpolate(text, ctx))
}

/// A string is a whole-value reference candidate when it starts with `$` (but not
/// `$$`), contains no whitespace, and is nothing but a single reference end to end.
fn is_whole_value_candidate(text: &str) -> bool {
    if !text.starts_with('$') || text.starts_with("$$") {
        return false;
    }
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    WHOLE_VALUE.is_match(text)
}

/// Replaces every reference occurrence in `text` with its stringified value, leaving
/// unresolved references and `$$`-escaped runs untouched.
fn interpolate(text: &str, ctx: &Context) -> String {
    let mut output = String::with_capacity(text.len());
    let mut last_end = 0;

    for mat in REFERENCE_TOKEN.find_iter(text) {
        output.push_str(&text[last_end..mat.start()]);
        let matched = mat.as_str();
        if matched == "$$" {
            output.push_str("$$");
        } else {
            match resolve_reference_typed(&matched[1..], ctx) {
                Some(value) => output.push_str(&stringify(&value)),
                None => output.push_str(matched),
            }
        }
        last_end = mat.end();
    }
    output.push_str(&text[last_end..]);
    output
}

/// Resolves a dotted reference path (without the leading `$`) to a typed JSON value.
///
/// Returns `None` when the path is malformed, targets a missing key, or walks through
/// a non-container node with segments still remaining — the "undefined" case in §4.2's
/// edge cases.
fn resolve_reference_typed(path: &str, ctx: &Context) -> Option<Value> {
    let mut segments = path.split('.');
    let head = segments.next()?;
    let rest: Vec<&str> = segments.collect();

    match head {
        "env" => {
            let name = rest.first()?;
            if rest.len() != 1 {
                return None;
            }
            std::env::var(name).ok().map(Value::String)
        }
        "input" => navigate(&ctx.input, &rest),
        "stepResult" => {
            let var_name = rest.first()?;
            let value = ctx.variables.get(*var_name)?;
            navigate(value, &rest[1..])
        }
        legacy_var => {
            // `$<var>.path` is a legacy alias for `$stepResult.<var>.path`.
            let value = ctx.variables.get(legacy_var)?;
            navigate(value, &rest)
        }
    }
}

/// Navigates `root` through a sequence of dotted path segments.
///
/// Object keys and numeric array indices are both supported. Returns `None` as soon as
/// a segment can't be applied (missing key, out-of-range index, or a scalar node with
/// segments still remaining).
fn navigate(root: &Value, segments: &[&str]) -> Option<Value> {
    let mut current = root;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current.clone())
}

/// Formats a resolved value for string interpolation.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

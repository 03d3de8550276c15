//! `output-generator` primitive (C6, §4.7): a dependency-free, deterministic transform
//! for reshaping LLM output into the workflow's variable space without invoking a
//! model.

use agentflow_types::Context;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::handler::{HandlerOutput, StepHandler};
use crate::resolve::resolve;

pub struct OutputHandler;

#[async_trait]
impl StepHandler for OutputHandler {
    async fn call(&self, config: &Map<String, Value>, context: &mut Context) -> anyhow::Result<HandlerOutput> {
        let json_parsed = match config.get("json") {
            Some(template) => {
                let resolved = resolve(template, context);
                let parsed = parse_json_field(&resolved);
                context.variables.insert("json".to_string(), parsed.clone());
                Some(parsed)
            }
            None => None,
        };

        if let Some(template) = config.get("template") {
            let resolved = resolve(template, context);
            return Ok(HandlerOutput::Record(match resolved {
                Value::Object(map) => map,
                other => Map::from_iter([("value".to_string(), other)]),
            }));
        }

        if let Some(Value::Object(map)) = json_parsed {
            return Ok(HandlerOutput::Record(map));
        }

        Ok(HandlerOutput::Record(Map::new()))
    }
}

/// Implements §4.7's `json` resolution: pass objects through, and for strings attempt
/// fenced-code-block extraction, then the first balanced JSON value, falling back to an
/// empty object with a warning on parse failure.
fn parse_json_field(resolved: &Value) -> Value {
    match resolved {
        Value::Object(_) => resolved.clone(),
        Value::String(text) => parse_json_string(text).unwrap_or_else(|| {
            tracing::warn!("output-generator: failed to parse 'json' field as JSON; substituting {{}}");
            Value::Object(Map::new())
        }),
        _ => {
            tracing::warn!("output-generator: 'json' field resolved to a non-string, non-object value; substituting {{}}");
            Value::Object(Map::new())
        }
    }
}

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)\n?```").expect("valid pattern"));

fn parse_json_string(text: &str) -> Option<Value> {
    if let Some(captures) = FENCED_BLOCK.captures(text) {
        if let Ok(value) = serde_json::from_str(captures[1].trim()) {
            return Some(value);
        }
    }
    if let Ok(value) = serde_json::from_str(text.trim()) {
        return Some(value);
    }
    extract_first_balanced_json(text)
}

/// Scans for the first balanced `{...}` or `[...]` span in `text` and parses it,
/// tolerating surrounding prose the model may have emitted around the JSON payload.
fn extract_first_balanced_json(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    for (start, &byte) in bytes.iter().enumerate() {
        let (open, close) = match byte {
            b'{' => (b'{', b'}'),
            b'[' => (b'[', b']'),
            _ => continue,
        };
        let mut depth: i32 = 0;
        let mut in_string = false;
        let mut escaped = false;
        for (offset, &current) in bytes[start..].iter().enumerate() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if current == b'\\' {
                    escaped = true;
                } else if current == b'"' {
                    in_string = false;
                }
                continue;
            }
            match current {
                b'"' => in_string = true,
                b if b == open => depth += 1,
                b if b == close => {
                    depth -= 1;
                    if depth == 0 {
                        let end = start + offset + 1;
                        if let Ok(value) = serde_json::from_str(&text[start..end]) {
                            return Some(value);
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_types::Context as Ctx;
    use serde_json::json;

    fn ctx_with_var(name: &str, value: Value) -> Ctx {
        let mut ctx = Ctx::new(Value::Null, false);
        ctx.variables.insert(name.to_string(), value);
        ctx
    }

    #[tokio::test]
    async fn extracts_json_from_fenced_code_block_and_applies_template() {
        let mut ctx = ctx_with_var("x", json!({"text": "```json\n{\"tags\":[\"a\",\"b\"]}\n```"}));
        let config = Map::from_iter([
            ("json".to_string(), json!("$stepResult.x.text")),
            ("template".to_string(), json!({"tags": "$json.tags"})),
        ]);
        let output = OutputHandler.call(&config, &mut ctx).await.unwrap();
        let HandlerOutput::Record(record) = output else { panic!("expected record") };
        assert_eq!(record.get("tags"), Some(&json!(["a", "b"])));
    }

    #[tokio::test]
    async fn parse_failure_falls_back_to_empty_object() {
        let mut ctx = ctx_with_var("x", json!({"text": "not json at all"}));
        let config = Map::from_iter([("json".to_string(), json!("$stepResult.x.text"))]);
        let output = OutputHandler.call(&config, &mut ctx).await.unwrap();
        let HandlerOutput::Record(record) = output else { panic!("expected record") };
        assert!(record.is_empty());
        assert_eq!(ctx.variables.get("json"), Some(&json!({})));
    }

    #[tokio::test]
    async fn template_resolved_recursively_wraps_non_object_results() {
        let mut ctx = Ctx::new(Value::Null, false);
        let config = Map::from_iter([("template".to_string(), json!("just text"))]);
        let output = OutputHandler.call(&config, &mut ctx).await.unwrap();
        let HandlerOutput::Record(record) = output else { panic!("expected record") };
        assert_eq!(record.get("value"), Some(&json!("just text")));
    }

    #[tokio::test]
    async fn neither_json_nor_template_returns_empty_record() {
        let mut ctx = Ctx::new(Value::Null, false);
        let output = OutputHandler.call(&Map::new(), &mut ctx).await.unwrap();
        let HandlerOutput::Record(record) = output else { panic!("expected record") };
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn json_only_object_result_is_returned_directly() {
        let mut ctx = Ctx::new(Value::Null, false);
        let config = Map::from_iter([("json".to_string(), json!({"a": 1}))]);
        let output = OutputHandler.call(&config, &mut ctx).await.unwrap();
        let HandlerOutput::Record(record) = output else { panic!("expected record") };
        assert_eq!(record.get("a"), Some(&json!(1)));
    }
}

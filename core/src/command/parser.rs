//! Command extraction from free-text model output
//!
//! Tries, in order: the whole text as JSON, the widest `[...]` span, the
//! widest `{...}` span. With several JSON-like fragments the first bracket
//! wins, even when a later fragment was the one the model meant.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use super::Command;

lazy_static! {
    static ref ARRAY_SPAN: Regex = Regex::new(r"(?s)\[.*\]").expect("valid array regex");
    static ref OBJECT_SPAN: Regex = Regex::new(r"(?s)\{.*\}").expect("valid object regex");
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("AI response is empty.")]
    Empty,

    #[error("Could not parse JSON from AI response")]
    NoJson,
}

/// Extract the ordered command list from `text`
pub fn parse_response(text: &str) -> Result<Vec<Command>, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => return Ok(vec![Command::new(Value::Object(map))]),
        Ok(Value::Array(items)) => return Ok(into_commands(items)),
        _ => {}
    }

    if let Some(found) = ARRAY_SPAN.find(text) {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(found.as_str()) {
            return Ok(into_commands(items));
        }
    }

    if let Some(found) = OBJECT_SPAN.find(text) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(found.as_str()) {
            return Ok(vec![Command::new(Value::Object(map))]);
        }
    }

    Err(ParseError::NoJson)
}

fn into_commands(items: Vec<Value>) -> Vec<Command> {
    items.into_iter().map(Command::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(commands: &[Command]) -> Vec<Value> {
        commands.iter().map(|c| c.as_value().clone()).collect()
    }

    #[test]
    fn test_single_object() {
        let commands = parse_response(r#"{"action":"LIST"}"#).unwrap();
        assert_eq!(raw(&commands), vec![json!({"action": "LIST"})]);
    }

    #[test]
    fn test_array_keeps_order_and_content() {
        let text = r#"[
            {"action": "CREATESHEET", "values": [["Q3"]]},
            {"action": "WRITE", "range": "Q3!A1", "values": [["x"]], "extra": 1},
            {"action": "READ", "range": "Q3!A1", "summary": true}
        ]"#;
        let commands = parse_response(text).unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].action().as_deref(), Some("CREATESHEET"));
        assert_eq!(commands[1].as_value()["extra"], json!(1));
        assert!(commands[2].wants_summary());
    }

    #[test]
    fn test_array_embedded_in_prose() {
        let commands =
            parse_response(r#"Sure! [{"action":"READ","range":"Sheet1!A1:B2"}]"#).unwrap();
        assert_eq!(
            raw(&commands),
            vec![json!({"action": "READ", "range": "Sheet1!A1:B2"})]
        );
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let text = "Here you go:\n```json\n{\"action\": \"CLEAR\", \"range\": \"Sheet1!A1:B2\"}\n```";
        let commands = parse_response(text).unwrap();
        assert_eq!(commands[0].range(), Some("Sheet1!A1:B2"));
    }

    #[test]
    fn test_object_span_after_failed_array_span() {
        // The greedy array span runs to the last `]` and is not valid JSON
        let text = r#"Options: [1, 2] or {"action": "LIST"} and then ["x"]"#;
        let commands = parse_response(text).unwrap();
        assert_eq!(raw(&commands), vec![json!({"action": "LIST"})]);
    }

    #[test]
    fn test_first_bracket_wins_over_intent() {
        let text = r#"I would read [1, 2] then {"action": "LIST"}"#;
        let commands = parse_response(text).unwrap();
        assert_eq!(raw(&commands), vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_scalar_json_falls_through() {
        assert_eq!(parse_response(r#""just a string""#).unwrap_err(), ParseError::NoJson);
        assert_eq!(parse_response("42").unwrap_err(), ParseError::NoJson);
    }

    #[test]
    fn test_no_json_at_all() {
        assert_eq!(
            parse_response("I cannot help with that.").unwrap_err(),
            ParseError::NoJson
        );
        assert_eq!(parse_response("{ broken").unwrap_err(), ParseError::NoJson);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(parse_response("").unwrap_err(), ParseError::Empty);
        assert_eq!(parse_response("  \n\t").unwrap_err(), ParseError::Empty);
    }

    #[test]
    fn test_empty_array_is_zero_commands() {
        assert!(parse_response("[]").unwrap().is_empty());
    }
}

//! Parsers that turn raw model replies into typed task results.
//!
//! Each parser separates "could not decode" from "decoded but wrong", so the
//! task layer can report the two as different failures.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::KnowledgeError;

/// Keys a classification reply must carry.
const CLASSIFICATION_KEYS: [&str; 3] = ["topic", "confidence", "alternative_topics"];

// ─── Public Types ────────────────────────────────────────────────────────────

/// A validated topic classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicClassification {
    pub topic: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub alternative_topics: Vec<String>,
}

/// Why a reply was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyError {
    Decode(String),
    Validation(String),
}

impl ReplyError {
    /// Attach the task label and lift into the task error type.
    pub fn into_knowledge(self, task: &'static str) -> KnowledgeError {
        match self {
            ReplyError::Decode(reason) => KnowledgeError::Decode { task, reason },
            ReplyError::Validation(reason) => KnowledgeError::Validation { task, reason },
        }
    }
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Parse and validate a classification reply.
///
/// Prose or code fences around the outermost `{...}` are tolerated.
pub fn parse_classification(reply: &str) -> Result<TopicClassification, ReplyError> {
    let json = extract_json(reply);
    let value: Value =
        serde_json::from_str(json).map_err(|e| ReplyError::Decode(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| ReplyError::Validation("expected a JSON object".into()))?;

    if let Some(missing) = CLASSIFICATION_KEYS
        .iter()
        .find(|key| !object.contains_key(**key))
    {
        return Err(ReplyError::Validation(format!(
            "invalid response format from model: missing key '{missing}'"
        )));
    }

    let topic = object["topic"]
        .as_str()
        .ok_or_else(|| ReplyError::Validation("topic must be a string".into()))?
        .to_string();

    let confidence = match object["confidence"].as_f64() {
        Some(c) if (0.0..=1.0).contains(&c) => c,
        _ => {
            return Err(ReplyError::Validation(format!(
                "invalid confidence value: {}",
                object["confidence"]
            )))
        }
    };

    let alternative_topics = object["alternative_topics"]
        .as_array()
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| {
            ReplyError::Validation("alternative_topics must be a list of strings".into())
        })?;

    Ok(TopicClassification {
        topic,
        confidence,
        alternative_topics,
    })
}

/// Extract JSON from text that may be wrapped in prose or markdown fences.
fn extract_json(text: &str) -> &str {
    if let Some(start) = text.find('{') {
        if let Some(end) = text.rfind('}') {
            if end > start {
                return &text[start..=end];
            }
        }
    }
    text.trim()
}

// ─── Research depth ──────────────────────────────────────────────────────────

/// Parse the leading integer token of a depth reply. No range check.
pub fn parse_depth(reply: &str) -> Result<i64, ReplyError> {
    let token = reply
        .split_whitespace()
        .next()
        .ok_or_else(|| ReplyError::Decode("empty reply".into()))?;

    token
        .parse::<i64>()
        .map_err(|e| ReplyError::Decode(format!("'{token}' is not an integer: {e}")))
}

// ─── Credibility ─────────────────────────────────────────────────────────────

/// Parse a credibility reply as a bare floating-point number.
pub fn parse_credibility(reply: &str) -> Result<f64, ReplyError> {
    let trimmed = reply.trim();
    trimmed
        .parse::<f64>()
        .map_err(|e| ReplyError::Decode(format!("'{trimmed}' is not a number: {e}")))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_classification() {
        let reply = r#"{"topic":"Science","confidence":0.8,"alternative_topics":["Physics","Chemistry"]}"#;
        let parsed = parse_classification(reply).unwrap();
        assert_eq!(parsed.topic, "Science");
        assert_eq!(parsed.confidence, 0.8);
        assert_eq!(parsed.alternative_topics, ["Physics", "Chemistry"]);
    }

    #[test]
    fn test_integer_confidence_accepted() {
        let reply = r#"{"topic":"Math","confidence":1,"alternative_topics":[]}"#;
        assert_eq!(parse_classification(reply).unwrap().confidence, 1.0);
    }

    #[test]
    fn test_fenced_classification() {
        let reply = "Here you go:\n```json\n{\"topic\":\"History\",\"confidence\":0.6,\"alternative_topics\":[\"Politics\"]}\n```";
        let parsed = parse_classification(reply).unwrap();
        assert_eq!(parsed.topic, "History");
    }

    #[test]
    fn test_missing_confidence_is_validation_error() {
        let reply = r#"{"topic":"Science","alternative_topics":[]}"#;
        match parse_classification(reply) {
            Err(ReplyError::Validation(reason)) => assert!(reason.contains("confidence")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_confidence_rejected() {
        let reply = r#"{"topic":"X","confidence":1.5,"alternative_topics":[]}"#;
        assert!(matches!(
            parse_classification(reply),
            Err(ReplyError::Validation(_))
        ));
        let reply = r#"{"topic":"X","confidence":-0.1,"alternative_topics":[]}"#;
        assert!(matches!(
            parse_classification(reply),
            Err(ReplyError::Validation(_))
        ));
    }

    #[test]
    fn test_string_confidence_rejected() {
        let reply = r#"{"topic":"X","confidence":"0.9","alternative_topics":[]}"#;
        assert!(matches!(
            parse_classification(reply),
            Err(ReplyError::Validation(_))
        ));
    }

    #[test]
    fn test_non_json_is_decode_error() {
        let reply = "error connecting to inference server";
        assert!(matches!(
            parse_classification(reply),
            Err(ReplyError::Decode(_))
        ));
    }

    #[test]
    fn test_json_array_is_validation_error() {
        assert!(matches!(
            parse_classification("[1, 2, 3]"),
            Err(ReplyError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_depth_leading_token() {
        assert_eq!(parse_depth("4"), Ok(4));
        assert_eq!(parse_depth("  3 - moderate depth"), Ok(3));
        assert_eq!(parse_depth("7"), Ok(7));
        assert!(matches!(parse_depth("four"), Err(ReplyError::Decode(_))));
        assert!(matches!(parse_depth("   "), Err(ReplyError::Decode(_))));
        assert!(matches!(parse_depth("4."), Err(ReplyError::Decode(_))));
    }

    #[test]
    fn test_parse_credibility() {
        assert_eq!(parse_credibility(" 0.75\n"), Ok(0.75));
        assert_eq!(parse_credibility("1"), Ok(1.0));
        assert!(matches!(
            parse_credibility("The source is fairly credible (0.7)"),
            Err(ReplyError::Decode(_))
        ));
    }

    #[test]
    fn test_into_knowledge_keeps_task() {
        let err = ReplyError::Decode("bad".into()).into_knowledge("CredibilityAssessor");
        assert_eq!(err.task(), Some("CredibilityAssessor"));
        assert!(err.is_model_inference());
    }
}

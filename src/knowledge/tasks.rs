//! Research task functions.
//!
//! Each task builds a prompt, runs it through a [`PromptProcessor`], and
//! turns the reply into a typed value. Failure policy per task:
//!
//! - classification and credibility fail hard with a model-inference error,
//! - knowledge updates fail with `DataProcessing`,
//! - research depth never fails; it logs and falls back to
//!   [`DEFAULT_RESEARCH_DEPTH`].

use crate::inference::PromptProcessor;

use super::errors::KnowledgeError;
use super::prompts::{
    classification_prompt, credibility_prompt, knowledge_update_prompt, research_depth_prompt,
};
use super::response::{parse_classification, parse_credibility, parse_depth, TopicClassification};

/// Depth used whenever the model's answer is unusable.
pub const DEFAULT_RESEARCH_DEPTH: u8 = 3;

/// Valid research depths.
pub const RESEARCH_DEPTH_RANGE: std::ops::RangeInclusive<i64> = 1..=5;

// Caller labels recorded with each interaction.
const TOPIC_CLASSIFIER: &str = "TopicClassifier";
const RESEARCH_DEPTH_DETERMINER: &str = "ResearchDepthDeterminer";
const KNOWLEDGE_BASE_UPDATER: &str = "KnowledgeBaseUpdater";
const CREDIBILITY_ASSESSOR: &str = "CredibilityAssessor";

// ─── Classification ──────────────────────────────────────────────────────────

/// Classify `query` into a topic with confidence and alternatives.
pub async fn classify_query<P: PromptProcessor>(
    processor: &P,
    query: &str,
    model: &str,
) -> Result<TopicClassification, KnowledgeError> {
    if query.trim().is_empty() {
        return Err(KnowledgeError::InvalidInput {
            reason: "query cannot be empty".into(),
        });
    }

    let reply = processor
        .process_prompt(&classification_prompt(query), model, TOPIC_CLASSIFIER)
        .await
        .map_err(|source| KnowledgeError::Transport {
            task: TOPIC_CLASSIFIER,
            source,
        })?;

    let classification =
        parse_classification(&reply).map_err(|e| e.into_knowledge(TOPIC_CLASSIFIER))?;

    tracing::debug!(
        topic = %classification.topic,
        confidence = classification.confidence,
        alternatives = classification.alternative_topics.len(),
        "query classified"
    );
    Ok(classification)
}

/// Classify `query`, returning only `(topic, confidence)`.
pub async fn classify_query_topic<P: PromptProcessor>(
    processor: &P,
    query: &str,
    model: &str,
) -> Result<(String, f64), KnowledgeError> {
    let classification = classify_query(processor, query, model).await?;
    Ok((classification.topic, classification.confidence))
}

/// Alternative topics the model proposed for `query`.
pub async fn get_alternative_topics<P: PromptProcessor>(
    processor: &P,
    query: &str,
    model: &str,
) -> Result<Vec<String>, KnowledgeError> {
    let classification = classify_query(processor, query, model).await?;
    Ok(classification.alternative_topics)
}

// ─── Research depth ──────────────────────────────────────────────────────────

/// How deep research on `query` should go, from 1 to 5.
///
/// Never fails: an out-of-range answer logs a warning, anything else that
/// goes wrong logs an error, and both return [`DEFAULT_RESEARCH_DEPTH`].
pub async fn determine_research_depth<P: PromptProcessor>(
    processor: &P,
    query: &str,
    model: &str,
) -> u8 {
    let reply = match processor
        .process_prompt(&research_depth_prompt(query), model, RESEARCH_DEPTH_DETERMINER)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, "error determining research depth");
            return DEFAULT_RESEARCH_DEPTH;
        }
    };

    match parse_depth(&reply) {
        Ok(depth) if RESEARCH_DEPTH_RANGE.contains(&depth) => {
            u8::try_from(depth).unwrap_or(DEFAULT_RESEARCH_DEPTH)
        }
        Ok(depth) => {
            tracing::warn!(
                depth,
                default = DEFAULT_RESEARCH_DEPTH,
                "invalid research depth, using default"
            );
            DEFAULT_RESEARCH_DEPTH
        }
        Err(e) => {
            tracing::error!(error = ?e, reply = %reply, "error determining research depth");
            DEFAULT_RESEARCH_DEPTH
        }
    }
}

// ─── Knowledge base ──────────────────────────────────────────────────────────

/// Ask the model to fold `new_info` into its knowledge of `topic`.
///
/// The reply is not inspected.
pub async fn update_knowledge_base<P: PromptProcessor>(
    processor: &P,
    new_info: &str,
    topic: &str,
    model: &str,
) -> Result<(), KnowledgeError> {
    processor
        .process_prompt(
            &knowledge_update_prompt(new_info, topic),
            model,
            KNOWLEDGE_BASE_UPDATER,
        )
        .await
        .map_err(|e| KnowledgeError::DataProcessing {
            reason: format!("{KNOWLEDGE_BASE_UPDATER} request for topic '{topic}' failed"),
            source: Some(e),
        })?;

    tracing::info!(topic, "knowledge base updated");
    Ok(())
}

// ─── Credibility ─────────────────────────────────────────────────────────────

/// Score the credibility of `source`.
///
/// The reply must be a bare number. Its range is not checked.
pub async fn assess_source_credibility<P: PromptProcessor>(
    processor: &P,
    source: &str,
    model: &str,
) -> Result<f64, KnowledgeError> {
    let reply = processor
        .process_prompt(&credibility_prompt(source), model, CREDIBILITY_ASSESSOR)
        .await
        .map_err(|source| KnowledgeError::Transport {
            task: CREDIBILITY_ASSESSOR,
            source,
        })?;

    parse_credibility(&reply).map_err(|e| e.into_knowledge(CREDIBILITY_ASSESSOR))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tracing::Level;

    use super::*;
    use crate::inference::InferenceError;
    use crate::test_support::LogCapture;

    /// Replays canned replies and records what it was asked.
    #[derive(Default)]
    struct ScriptedProcessor {
        replies: Mutex<VecDeque<Result<String, InferenceError>>>,
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl ScriptedProcessor {
        fn replying(reply: &str) -> Self {
            let processor = Self::default();
            processor
                .replies
                .lock()
                .unwrap()
                .push_back(Ok(reply.to_string()));
            processor
        }

        fn failing(err: InferenceError) -> Self {
            let processor = Self::default();
            processor.replies.lock().unwrap().push_back(Err(err));
            processor
        }

        fn calls(&self) -> Vec<(String, String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PromptProcessor for ScriptedProcessor {
        async fn process_prompt(
            &self,
            prompt: &str,
            model: &str,
            username: &str,
        ) -> Result<String, InferenceError> {
            self.calls.lock().unwrap().push((
                prompt.to_string(),
                model.to_string(),
                username.to_string(),
            ));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted reply left")
        }
    }

    fn server_error() -> InferenceError {
        InferenceError::HttpError {
            status: 500,
            body: "internal error".into(),
        }
    }

    #[tokio::test]
    async fn test_classify_empty_query_is_input_error() {
        let processor = ScriptedProcessor::default();
        for query in ["", "   ", "\n\t"] {
            let err = classify_query_topic(&processor, query, "llama3")
                .await
                .unwrap_err();
            assert!(matches!(err, KnowledgeError::InvalidInput { .. }));
        }
        assert!(processor.calls().is_empty(), "no request for empty input");
    }

    #[tokio::test]
    async fn test_classify_well_formed_reply() {
        let processor = ScriptedProcessor::replying(
            r#"{"topic":"Science","confidence":0.8,"alternative_topics":["Physics","Chemistry"]}"#,
        );
        let (topic, confidence) = classify_query_topic(&processor, "Why is the sky blue?", "llama3")
            .await
            .unwrap();
        assert_eq!(topic, "Science");
        assert_eq!(confidence, 0.8);

        let calls = processor.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("Why is the sky blue?"));
        assert_eq!(calls[0].1, "llama3");
        assert_eq!(calls[0].2, "TopicClassifier");
    }

    #[tokio::test]
    async fn test_classify_missing_confidence() {
        let processor =
            ScriptedProcessor::replying(r#"{"topic":"Science","alternative_topics":[]}"#);
        let err = classify_query_topic(&processor, "q", "llama3")
            .await
            .unwrap_err();
        assert!(err.is_model_inference());
        assert!(matches!(err, KnowledgeError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_classify_out_of_range_confidence() {
        let processor =
            ScriptedProcessor::replying(r#"{"topic":"X","confidence":1.5,"alternative_topics":[]}"#);
        let err = classify_query_topic(&processor, "q", "llama3")
            .await
            .unwrap_err();
        assert!(err.is_model_inference());
    }

    #[tokio::test]
    async fn test_classify_transport_failure() {
        let processor = ScriptedProcessor::failing(server_error());
        let err = classify_query_topic(&processor, "q", "llama3")
            .await
            .unwrap_err();
        assert!(err.is_model_inference());
        assert!(matches!(
            err,
            KnowledgeError::Transport {
                task: "TopicClassifier",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_alternative_topics_returned_directly() {
        let processor = ScriptedProcessor::replying(
            r#"{"topic":"Science","confidence":0.8,"alternative_topics":["Physics","Chemistry"]}"#,
        );
        let alternatives = get_alternative_topics(&processor, "q", "llama3")
            .await
            .unwrap();
        assert_eq!(alternatives, ["Physics", "Chemistry"]);
        assert_eq!(processor.calls().len(), 1, "one request, no side channel");
    }

    #[tokio::test]
    async fn test_depth_in_range() {
        let processor = ScriptedProcessor::replying("4");
        assert_eq!(determine_research_depth(&processor, "q", "llama3").await, 4);
        assert_eq!(processor.calls()[0].2, "ResearchDepthDeterminer");
    }

    const TASKS_TARGET: &str = "ollama_research::knowledge::tasks";

    #[tokio::test]
    async fn test_depth_out_of_range_defaults_with_warning() {
        let logs = LogCapture::default();
        let _guard = logs.install();

        let processor = ScriptedProcessor::replying("7");
        assert_eq!(determine_research_depth(&processor, "q", "llama3").await, 3);

        let warnings = logs.at(Level::WARN, TASKS_TARGET);
        assert_eq!(warnings.len(), 1, "got {:?}", logs.events());
        assert!(warnings[0].message.contains("invalid research depth"));
        assert!(logs.at(Level::ERROR, TASKS_TARGET).is_empty());

        let processor = ScriptedProcessor::replying("0");
        assert_eq!(determine_research_depth(&processor, "q", "llama3").await, 3);
        assert_eq!(logs.at(Level::WARN, TASKS_TARGET).len(), 2);
    }

    #[tokio::test]
    async fn test_depth_unparseable_defaults_with_error() {
        let logs = LogCapture::default();
        let _guard = logs.install();

        let processor = ScriptedProcessor::replying("Probably quite deep.");
        assert_eq!(determine_research_depth(&processor, "q", "llama3").await, 3);

        let errors = logs.at(Level::ERROR, TASKS_TARGET);
        assert_eq!(errors.len(), 1, "got {:?}", logs.events());
        assert!(errors[0].message.contains("error determining research depth"));
        assert!(logs.at(Level::WARN, TASKS_TARGET).is_empty());
    }

    #[tokio::test]
    async fn test_depth_transport_failure_defaults() {
        let processor = ScriptedProcessor::failing(InferenceError::Timeout { duration_secs: 5 });
        assert_eq!(determine_research_depth(&processor, "q", "llama3").await, 3);
    }

    #[tokio::test]
    async fn test_depth_takes_leading_token() {
        let processor = ScriptedProcessor::replying("5 (this needs exhaustive research)");
        assert_eq!(determine_research_depth(&processor, "q", "llama3").await, 5);
    }

    #[tokio::test]
    async fn test_update_knowledge_base_ignores_reply() {
        let processor = ScriptedProcessor::replying("Noted! I will remember that.");
        update_knowledge_base(&processor, "Pluto is a dwarf planet", "Astronomy", "llama3")
            .await
            .unwrap();
        let calls = processor.calls();
        assert!(calls[0].0.contains("'Astronomy'"));
        assert!(calls[0].0.contains("Pluto is a dwarf planet"));
        assert_eq!(calls[0].2, "KnowledgeBaseUpdater");
    }

    #[tokio::test]
    async fn test_update_knowledge_base_failure_is_data_processing() {
        let processor = ScriptedProcessor::failing(server_error());
        let err = update_knowledge_base(&processor, "info", "topic", "llama3")
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::DataProcessing { .. }));
        assert!(!err.is_model_inference());

        // The inference failure is reported once, as the source.
        let message = err.to_string();
        assert!(message.contains("'topic'"), "got {message}");
        assert!(!message.contains("internal error"), "got {message}");
        let source = std::error::Error::source(&err).expect("inference error kept as source");
        assert!(source.to_string().contains("internal error"));
    }

    #[tokio::test]
    async fn test_credibility_numeric_reply() {
        let processor = ScriptedProcessor::replying("0.85");
        let score = assess_source_credibility(&processor, "https://nature.com", "llama3")
            .await
            .unwrap();
        assert_eq!(score, 0.85);
        assert_eq!(processor.calls()[0].2, "CredibilityAssessor");
    }

    #[tokio::test]
    async fn test_credibility_prose_reply_fails() {
        let processor = ScriptedProcessor::replying("I would rate it 0.8");
        let err = assess_source_credibility(&processor, "blog", "llama3")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KnowledgeError::Decode {
                task: "CredibilityAssessor",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_credibility_transport_failure() {
        let processor = ScriptedProcessor::failing(server_error());
        let err = assess_source_credibility(&processor, "blog", "llama3")
            .await
            .unwrap_err();
        assert!(err.is_model_inference());
    }
}

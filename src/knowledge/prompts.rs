//! Prompt templates for the research tasks.

/// Ask for a topic classification as a fixed JSON shape.
pub fn classification_prompt(query: &str) -> String {
    format!(
        r#"Classify the following query into a general topic area: "{query}"

Provide your response in the following JSON format:
{{
    "topic": "The most relevant topic",
    "confidence": 0.95,
    "alternative_topics": ["Topic 2", "Topic 3"]
}}

Ensure the confidence is a float between 0 and 1."#
    )
}

pub fn research_depth_prompt(query: &str) -> String {
    format!(
        "On a scale of 1 to 5, how deep should the research go for this query: '{query}'? \
         Respond with ONLY a single integer between 1 and 5."
    )
}

pub fn knowledge_update_prompt(new_info: &str, topic: &str) -> String {
    format!("Incorporate this new information into the knowledge base for the topic '{topic}': {new_info}")
}

pub fn credibility_prompt(source: &str) -> String {
    format!("Assess the credibility of this source on a scale of 0 to 1: {source}")
}

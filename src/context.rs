//! System prompt for the insights assistant. The whole corpus is embedded,
//! so prompt size grows linearly with the number of records.

use crate::interview::EnrichedRecord;
use crate::ExitIntelError;

const CONTEXT_PROMPT_TEMPLATE: &str = r#"You are a quantitative HR Analyst AI assistant for an HR leader at {ORGANIZATION}.
Your primary goal is to provide data-driven, statistical insights from the provided exit interview data.
You must answer questions based ONLY on the provided JSON data below. Do not make up information.

**RESPONSE GUIDELINES:**
1.  **Quantify First:** Always lead with statistics. Use counts, percentages, or fractions (e.g., "The top reason is 'Career Growth', mentioned in 4 out of 8 Engineering departures (50%).").
2.  **Synthesize, Don't Just List:** Do not list individual summaries one-by-one. Instead, synthesize trends and use individual cases as brief, supporting examples.
3.  **Structure Your Answers:** Provide a clear headline finding, followed by quantitative evidence, and then a brief qualitative example if relevant.
4.  **Be Direct and Actionable:** Frame your answers to help the HR leader make decisions.

Here is the exit interview data:
```json
{DATA}
```"#;

pub const GREETING: &str = "Hello! How can I help you analyze the exit interview data today?";

/// Build the system prompt for a chat session. Deterministic: the same
/// corpus and organization always yield the same bytes.
pub fn build_context_prompt(
    corpus: &[EnrichedRecord],
    organization: &str,
) -> Result<String, ExitIntelError> {
    let data = serde_json::to_string_pretty(corpus)?;
    // Substitute DATA last so corpus text can never be mistaken for a placeholder.
    Ok(CONTEXT_PROMPT_TEMPLATE
        .replace("{ORGANIZATION}", organization)
        .replace("{DATA}", &data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::{Annotation, RawInterview, Sentiment};

    fn corpus() -> Vec<EnrichedRecord> {
        vec![EnrichedRecord::new(
            RawInterview {
                employee_id: "E42".into(),
                employee_name: "Priya Sharma".into(),
                designation: "Senior Engineer".into(),
                department: "Engineering".into(),
                exit_reason: "Career growth".into(),
                interview_transcript: "I was passed over for promotion {ORGANIZATION}.".into(),
                extra: serde_json::Map::new(),
            },
            Annotation {
                overall_sentiment: Sentiment::Negative,
                key_themes: vec!["Career Growth".into()],
                extracted_entities: vec![],
                summary: "- Passed over".into(),
            },
        )]
    }

    #[test]
    fn prompt_embeds_persona_rules_and_data() {
        let prompt = build_context_prompt(&corpus(), "Optum").unwrap();
        assert!(prompt.starts_with("You are a quantitative HR Analyst AI assistant for an HR leader at Optum."));
        assert!(prompt.contains("based ONLY on the provided JSON data"));
        assert!(prompt.contains("**Quantify First:**"));
        assert!(prompt.contains("**Synthesize, Don't Just List:**"));
        assert!(prompt.contains("\"employeeID\": \"E42\""));
        assert!(prompt.contains("\"overallSentiment\": \"Negative\""));
        assert!(prompt.ends_with("```"));
    }

    #[test]
    fn corpus_text_is_not_substituted() {
        let prompt = build_context_prompt(&corpus(), "Optum").unwrap();
        assert!(prompt.contains("passed over for promotion {ORGANIZATION}."));
    }

    #[test]
    fn prompt_is_deterministic() {
        let c = corpus();
        let a = build_context_prompt(&c, "Acme").unwrap();
        let b = build_context_prompt(&c, "Acme").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_corpus_still_builds() {
        let prompt = build_context_prompt(&[], "Acme").unwrap();
        assert!(prompt.contains("```json\n[]\n```"));
    }
}

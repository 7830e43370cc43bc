//! Insights session: the analyzed corpus plus the conversation grounded in it.

use crate::aggregate::{compute_aggregates, filter_department, AggregateStats};
use crate::completion::CompletionService;
use crate::config::ExitIntelConfig;
use crate::context::build_context_prompt;
use crate::conversation::Conversation;
use crate::corpus::{load_corpus, lookup_record};
use crate::interview::EnrichedRecord;
use crate::ExitIntelError;
use std::path::Path;

/// One interactive session: an immutable corpus snapshot and the chat
/// grounded in it. The context prompt is built once, at construction.
pub struct InsightsSession {
    corpus: Vec<EnrichedRecord>,
    conversation: Conversation,
    chat_model: String,
}

impl InsightsSession {
    pub fn new(
        corpus: Vec<EnrichedRecord>,
        organization: &str,
        chat_model: impl Into<String>,
    ) -> Result<Self, ExitIntelError> {
        let context = build_context_prompt(&corpus, organization)?;
        Ok(Self {
            corpus,
            conversation: Conversation::new(context),
            chat_model: chat_model.into(),
        })
    }

    pub fn records(&self) -> &[EnrichedRecord] {
        &self.corpus
    }

    /// Aggregates over the whole corpus, or one department's subset.
    pub fn aggregates(&self, department: Option<&str>) -> AggregateStats {
        match department {
            Some(d) => compute_aggregates(&filter_department(&self.corpus, d)),
            None => compute_aggregates(&self.corpus),
        }
    }

    pub fn lookup(&self, selector: &str) -> Result<&EnrichedRecord, ExitIntelError> {
        lookup_record(&self.corpus, selector)
    }

    pub fn ask(
        &mut self,
        service: &dyn CompletionService,
        question: &str,
    ) -> Result<String, ExitIntelError> {
        self.conversation.converse(service, &self.chat_model, question)
    }

    pub fn retry(&mut self, service: &dyn CompletionService) -> Result<String, ExitIntelError> {
        self.conversation.retry(service, &self.chat_model)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }
}

/// Load the corpus at `corpus_path` and start a session over it.
pub fn open_session(
    config: &ExitIntelConfig,
    corpus_path: &Path,
) -> Result<InsightsSession, ExitIntelError> {
    let corpus = load_corpus(corpus_path)?;
    log::info!("loaded {} analyzed interviews from {}", corpus.len(), corpus_path.display());
    InsightsSession::new(corpus, &config.organization, config.completion.chat_model.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionRequest, Role};
    use crate::interview::{Annotation, RawInterview, Sentiment};

    struct EchoService;

    impl CompletionService for EchoService {
        fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ExitIntelError> {
            assert_eq!(request.model, "chat-model");
            Ok(format!("echo: {}", request.messages.last().unwrap().content))
        }
    }

    fn rec(id: &str, dept: &str, sentiment: Sentiment) -> EnrichedRecord {
        EnrichedRecord::new(
            RawInterview {
                employee_id: id.into(),
                employee_name: format!("Person {id}"),
                designation: "Analyst".into(),
                department: dept.into(),
                exit_reason: "".into(),
                interview_transcript: "t".into(),
                extra: serde_json::Map::new(),
            },
            Annotation {
                overall_sentiment: sentiment,
                key_themes: vec!["Pay".into()],
                extracted_entities: vec![],
                summary: "- s".into(),
            },
        )
    }

    fn session() -> InsightsSession {
        InsightsSession::new(
            vec![
                rec("E1", "Engineering", Sentiment::Negative),
                rec("E2", "Engineering", Sentiment::Positive),
                rec("E3", "Sales", Sentiment::Negative),
            ],
            "Acme",
            "chat-model",
        )
        .unwrap()
    }

    #[test]
    fn aggregates_whole_and_department() {
        let s = session();
        assert_eq!(s.aggregates(None).total_count, 3);
        let eng = s.aggregates(Some("Engineering"));
        assert_eq!(eng.total_count, 2);
        assert_eq!(eng.negative_sentiment_rate, Some(50.0));
        assert_eq!(s.aggregates(Some("Legal")).negative_sentiment_rate, None);
    }

    #[test]
    fn context_turn_embeds_corpus() {
        let s = session();
        let first = &s.conversation().turns()[0];
        assert_eq!(first.role, Role::System);
        assert!(first.content.contains("HR leader at Acme"));
        assert!(first.content.contains("\"employeeID\": \"E3\""));
    }

    #[test]
    fn ask_uses_chat_model_and_appends() {
        let mut s = session();
        let reply = s.ask(&EchoService, "Why is Sales leaving?").unwrap();
        assert_eq!(reply, "echo: Why is Sales leaving?");
        assert_eq!(s.conversation().len(), 3);
    }

    #[test]
    fn lookup_through_session() {
        let s = session();
        assert_eq!(s.lookup("Person E2 (E2)").unwrap().interview.department, "Engineering");
        assert!(matches!(s.lookup("nobody"), Err(ExitIntelError::NotFound(_))));
    }

    #[test]
    fn open_session_missing_corpus() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = ExitIntelConfig::default();
        let err = open_session(&config, &dir.path().join("missing.json")).err().unwrap();
        assert!(matches!(err, ExitIntelError::CorpusNotFound(_)));
    }
}

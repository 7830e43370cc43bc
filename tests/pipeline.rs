use exitintel::ExitIntelError;
use exitintel::analyze::{run_analysis, AnalysisSettings};
use exitintel::completion::{CompletionRequest, CompletionService, Role};
use exitintel::context::build_context_prompt;
use exitintel::corpus::{load_corpus, read_interviews, write_corpus};
use exitintel::insights::InsightsSession;
use exitintel::interview::Sentiment;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Analysis replies keyed on markers in the transcript; chat replies count the history.
struct ScriptedService {
    chat_calls: AtomicUsize,
}

impl ScriptedService {
    fn new() -> Self {
        Self { chat_calls: AtomicUsize::new(0) }
    }
}

impl CompletionService for ScriptedService {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ExitIntelError> {
        if !request.json_mode {
            let n = self.chat_calls.fetch_add(1, Ordering::SeqCst);
            if n == 1 {
                return Err(ExitIntelError::Completion("request: connection reset".into()));
            }
            return Ok(format!("reply to {} messages", request.messages.len()));
        }

        let prompt = &request.messages[0].content;
        let reply = if prompt.contains("promotion") {
            r#"{"overallSentiment":"Negative","keyThemes":["Career Growth","Management"],"extractedEntities":[{"type":"Person","name":"Priya Sharma"}],"summary":["- Passed over","- Manager left"]}"#
        } else if prompt.contains("relocating") {
            "```json\n{\"overallSentiment\":\"positive\",\"keyThemes\":\"Relocation\",\"summary\":\"- Moving cities\"}\n```"
        } else if prompt.contains("furious") {
            r#"{"overallSentiment":"Furious","keyThemes":["Pay"],"summary":"- x"}"#
        } else if prompt.contains("slow") {
            return Err(ExitIntelError::Completion("request: timed out".into()));
        } else {
            r#"{"overallSentiment":"Neutral","keyThemes":["Compensation"],"summary":"- Better offer"}"#
        };
        Ok(reply.to_string())
    }
}

const RAW: &str = r#"[
  {"employeeID":"E1","employeeName":"Priya Sharma","designation":"Senior Engineer","department":"Engineering","exitReason":"Growth","interviewTranscript":"I was passed over for promotion twice.","tenureMonths":38},
  {"employeeID":"E2","employeeName":"Tom Lee","designation":"Engineer","department":"Engineering","exitReason":"Relocation","interviewTranscript":"I'm relocating to be near family."},
  {"employeeID":"E3","employeeName":"Ana Ruiz","designation":"Account Exec","department":"Sales","exitReason":"Pay","interviewTranscript":"   "},
  {"employeeID":"E4","employeeName":"Sam Doe","designation":"Account Exec","department":"Sales","exitReason":"Pay","interviewTranscript":"I am furious about pay."},
  {"employeeID":"E5","employeeName":"Lee Park","designation":"Support","department":"Support","exitReason":"Offer","interviewTranscript":"The answer was slow to come."},
  {"employeeID":"E6","employeeName":"Kim Cho","designation":"Support","department":"Support","exitReason":"Offer","interviewTranscript":"I took a better offer."}
]"#;

fn write_raw(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("data.json");
    std::fs::write(&path, RAW).unwrap();
    path
}

#[test]
fn analysis_drops_empty_and_failed_interviews() {
    let dir = TempDir::new().unwrap();
    let interviews = read_interviews(&write_raw(dir.path())).unwrap();
    let settings = AnalysisSettings { model: "analysis-model".into(), concurrency: 1 };

    let run = run_analysis(&ScriptedService::new(), &settings, &interviews);

    // E3 empty, E4 unknown sentiment, E5 timed out
    assert_eq!(run.report.total, 6);
    assert_eq!(run.report.analyzed, 3);
    assert_eq!(run.report.empty, 1);
    assert_eq!(run.report.failed, 2);
    let ids: Vec<&str> = run.records.iter().map(|r| r.interview.employee_id.as_str()).collect();
    assert_eq!(ids, vec!["E1", "E2", "E6"]);

    for record in &run.records {
        assert!(Sentiment::ALL.contains(&record.analysis.overall_sentiment));
    }
    assert_eq!(run.records[0].analysis.summary, "- Passed over\n- Manager left");
    assert_eq!(run.records[1].analysis.overall_sentiment, Sentiment::Positive);
    assert_eq!(run.records[1].analysis.key_themes, vec!["Relocation"]);
}

#[test]
fn concurrent_analysis_keeps_input_order() {
    let dir = TempDir::new().unwrap();
    let interviews = read_interviews(&write_raw(dir.path())).unwrap();
    let service = ScriptedService::new();

    let sequential = run_analysis(
        &service,
        &AnalysisSettings { model: "m".into(), concurrency: 1 },
        &interviews,
    );
    let parallel = run_analysis(
        &service,
        &AnalysisSettings { model: "m".into(), concurrency: 4 },
        &interviews,
    );

    assert_eq!(parallel.report, sequential.report);
    assert_eq!(parallel.records, sequential.records);
}

#[test]
fn enriched_corpus_round_trips_through_disk() {
    let dir = TempDir::new().unwrap();
    let interviews = read_interviews(&write_raw(dir.path())).unwrap();
    let run = run_analysis(
        &ScriptedService::new(),
        &AnalysisSettings { model: "m".into(), concurrency: 2 },
        &interviews,
    );

    let out = dir.path().join("analyzed_data.json");
    std::fs::write(&out, "stale").unwrap();
    write_corpus(&out, &run.records).unwrap();

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains("\"tenureMonths\": 38"));
    assert!(text.contains("\"overallSentiment\": \"Negative\""));
    assert!(!dir.path().join(".analyzed_data.json.tmp").exists());

    let corpus = load_corpus(&out).unwrap();
    assert_eq!(corpus, run.records);
}

#[test]
fn insights_session_over_analyzed_corpus() {
    let dir = TempDir::new().unwrap();
    let interviews = read_interviews(&write_raw(dir.path())).unwrap();
    let service = ScriptedService::new();
    let run = run_analysis(
        &service,
        &AnalysisSettings { model: "m".into(), concurrency: 1 },
        &interviews,
    );

    let prompt = build_context_prompt(&run.records, "Acme").unwrap();
    assert_eq!(prompt, build_context_prompt(&run.records, "Acme").unwrap());

    let mut session = InsightsSession::new(run.records, "Acme", "chat-model").unwrap();
    assert_eq!(session.conversation().turns()[0].content, prompt);

    let stats = session.aggregates(None);
    assert_eq!(stats.total_count, 3);
    assert_eq!(stats.negative_sentiment_rate, Some(33.3));
    assert_eq!(stats.top_theme.as_ref().unwrap().theme, "Career Growth");

    assert_eq!(session.ask(&service, "Why do people leave?").unwrap(), "reply to 2 messages");
    assert_eq!(session.conversation().len(), 3);

    // second chat call fails: only the user turn is kept
    assert!(session.ask(&service, "And in Support?").is_err());
    assert_eq!(session.conversation().len(), 4);
    assert_eq!(session.conversation().turns()[3].role, Role::User);

    assert_eq!(session.retry(&service).unwrap(), "reply to 4 messages");
    assert_eq!(session.conversation().len(), 5);
    assert_eq!(session.conversation().turns()[4].role, Role::Assistant);
}

#[test]
fn null_transcript_is_skipped_not_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(
        &path,
        r#"[
  {"employeeID":"E1","employeeName":"Priya Sharma","department":"Engineering","interviewTranscript":"I was passed over for promotion."},
  {"employeeID":"E2","employeeName":null,"designation":null,"department":"Sales","exitReason":null,"interviewTranscript":null}
]"#,
    )
    .unwrap();

    let interviews = read_interviews(&path).unwrap();
    assert_eq!(interviews.len(), 2);
    let run = run_analysis(
        &ScriptedService::new(),
        &AnalysisSettings { model: "m".into(), concurrency: 1 },
        &interviews,
    );

    assert_eq!(run.report.analyzed, 1);
    assert_eq!(run.report.empty, 1);
    assert_eq!(run.report.failed, 0);
    assert_eq!(run.records[0].interview.employee_id, "E1");
}

#[test]
fn reanalyzing_an_enriched_corpus_replaces_old_analysis() {
    let dir = TempDir::new().unwrap();
    let interviews = read_interviews(&write_raw(dir.path())).unwrap();
    let service = ScriptedService::new();
    let settings = AnalysisSettings { model: "m".into(), concurrency: 1 };

    let first = dir.path().join("analyzed_data.json");
    write_corpus(&first, &run_analysis(&service, &settings, &interviews).records).unwrap();

    // feed the enriched file back in as raw input
    let again = read_interviews(&first).unwrap();
    assert!(again[0].extra.contains_key("analysis"));
    let second = dir.path().join("reanalyzed.json");
    write_corpus(&second, &run_analysis(&service, &settings, &again).records).unwrap();

    let text = std::fs::read_to_string(&second).unwrap();
    assert_eq!(text.matches("\"analysis\"").count(), 3);
    let corpus = load_corpus(&second).unwrap();
    assert_eq!(corpus.len(), 3);
    assert!(corpus.iter().all(|r| !r.interview.extra.contains_key("analysis")));
}

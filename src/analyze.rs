//! Batch analysis: one extraction call per transcript, merged into the
//! enriched corpus. Failed and empty interviews are dropped from the output.

use crate::completion::{timed_complete, ChatMessage, CompletionRequest, CompletionService, OpenAiCompletion};
use crate::config::{resolve_api_key, ExitIntelConfig};
use crate::corpus::{read_interviews, write_corpus};
use crate::interview::{Annotation, EnrichedRecord, RawInterview};
use crate::ExitIntelError;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

const ANALYSIS_PROMPT_TEMPLATE: &str = r#"You are an expert HR analyst AI. Your task is to analyze an exit interview transcript and extract key insights.
Analyze the following interview transcript and provide your output in a structured JSON format.

Interview Transcript:
```
{TRANSCRIPT}
```

Instructions:
Based on the transcript, generate a JSON object with the following exact schema:
```json
{
  "overallSentiment": "Positive | Negative | Neutral | Mixed",
  "keyThemes": ["<list of 1-3 most prominent themes from topics like Management, Compensation, etc.>"],
  "extractedEntities": [
    { "type": "Person", "name": "<e.g., Priya Sharma>" },
    { "type": "Project", "name": "<e.g., Navigator Platform>" }
  ],
  "summary": "<A 2-3 bullet point summary as a single string with newlines.>"
}
```
CRITICAL: Only output the final JSON object. Do not include any other text or explanations."#;

pub fn build_analysis_prompt(transcript: &str) -> String {
    ANALYSIS_PROMPT_TEMPLATE.replace("{TRANSCRIPT}", transcript)
}

/// Parse a model response into a validated annotation.
pub fn parse_annotation(text: &str) -> Result<Annotation, ExitIntelError> {
    let cleaned = crate::completion::strip_fences(text);
    let annotation: Annotation = serde_json::from_str(cleaned)
        .map_err(|e| ExitIntelError::Extraction(format!("annotation parse: {e}")))?;
    annotation.validate().map_err(ExitIntelError::Extraction)
}

/// Run the extraction prompt for one transcript.
pub fn analyze_one(
    service: &dyn CompletionService,
    model: &str,
    transcript: &str,
) -> Result<Annotation, ExitIntelError> {
    let messages = [ChatMessage::user(build_analysis_prompt(transcript))];
    let request = CompletionRequest {
        model,
        messages: &messages,
        json_mode: true,
    };
    let text = timed_complete(service, "analysis", &request)
        .map_err(|e| ExitIntelError::Extraction(e.to_string()))?;
    parse_annotation(&text)
}

#[derive(Debug)]
pub enum InterviewOutcome {
    Analyzed(Box<EnrichedRecord>),
    EmptyTranscript,
    Failed(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub total: usize,
    pub analyzed: usize,
    pub empty: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct AnalysisRun {
    pub records: Vec<EnrichedRecord>,
    pub report: RunReport,
}

#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub model: String,
    pub concurrency: usize,
}

fn analyze_interview(
    service: &dyn CompletionService,
    model: &str,
    interview: &RawInterview,
) -> InterviewOutcome {
    if !interview.has_transcript() {
        log::debug!("{}: empty transcript, skipping", interview.employee_id);
        crate::metrics::record_interview_outcome("empty");
        return InterviewOutcome::EmptyTranscript;
    }
    match analyze_one(service, model, &interview.interview_transcript) {
        Ok(annotation) => {
            crate::metrics::record_interview_outcome("analyzed");
            InterviewOutcome::Analyzed(Box::new(EnrichedRecord::new(interview.clone(), annotation)))
        }
        Err(e) => {
            log::warn!("{}: analysis failed: {e}", interview.employee_id);
            crate::metrics::record_interview_outcome("failed");
            InterviewOutcome::Failed(e.to_string())
        }
    }
}

/// Analyze every interview and collect the successes in input order.
///
/// Never fails: empty transcripts and extraction failures are counted in
/// the report and left out of `records`. With `concurrency > 1` a scoped
/// worker pool pulls interviews by index and results are reassembled in
/// input order, so output order never depends on completion order.
pub fn run_analysis(
    service: &dyn CompletionService,
    settings: &AnalysisSettings,
    interviews: &[RawInterview],
) -> AnalysisRun {
    let total = interviews.len();
    let done = AtomicUsize::new(0);
    let progress = || {
        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
        log::info!("analyzed {n}/{total}");
    };

    let outcomes: Vec<InterviewOutcome> = if settings.concurrency <= 1 || total <= 1 {
        interviews
            .iter()
            .map(|interview| {
                let outcome = analyze_interview(service, &settings.model, interview);
                progress();
                outcome
            })
            .collect()
    } else {
        let next = AtomicUsize::new(0);
        let (next, progress) = (&next, &progress);
        let model = settings.model.as_str();
        let workers = settings.concurrency.min(total);
        let mut indexed: Vec<(usize, InterviewOutcome)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(move |_| {
                    scope.spawn(move || {
                        let mut local = Vec::new();
                        loop {
                            let i = next.fetch_add(1, Ordering::Relaxed);
                            let Some(interview) = interviews.get(i) else {
                                break;
                            };
                            local.push((i, analyze_interview(service, model, interview)));
                            progress();
                        }
                        local
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| match h.join() {
                    Ok(local) => local,
                    Err(_) => {
                        log::error!("analysis worker panicked");
                        Vec::new()
                    }
                })
                .collect()
        });
        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, o)| o).collect()
    };

    let mut report = RunReport { total, ..Default::default() };
    let mut records = Vec::with_capacity(total);
    for outcome in outcomes {
        match outcome {
            InterviewOutcome::Analyzed(record) => {
                report.analyzed += 1;
                records.push(*record);
            }
            InterviewOutcome::EmptyTranscript => report.empty += 1,
            InterviewOutcome::Failed(_) => report.failed += 1,
        }
    }
    // A panicked worker loses its share; count those as failures so the totals add up.
    report.failed += total - (report.analyzed + report.empty + report.failed);

    AnalysisRun { records, report }
}

pub fn handle_analyze(
    config: &ExitIntelConfig,
    input: &Path,
    output: &Path,
    concurrency: usize,
) -> Result<(), ExitIntelError> {
    let api_key = resolve_api_key(&config.completion)?;
    if concurrency == 0 {
        return Err(ExitIntelError::Config("concurrency must be at least 1".into()));
    }

    let interviews = read_interviews(input)?;
    log::info!("starting analysis of {} interviews", interviews.len());

    let service = OpenAiCompletion::new(&config.completion, api_key);
    let settings = AnalysisSettings {
        model: config.completion.analysis_model.clone(),
        concurrency,
    };
    let run = run_analysis(&service, &settings, &interviews);

    write_corpus(output, &run.records)?;
    let r = run.report;
    log::info!(
        "analysis complete: {} analyzed, {} empty, {} failed of {}; saved to {}",
        r.analyzed,
        r.empty,
        r.failed,
        r.total,
        output.display()
    );
    Ok(())
}

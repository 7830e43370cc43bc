//! Dashboard statistics over the enriched corpus, plus the plain-text
//! renderings used by the `dashboard` and `show` commands.

use crate::interview::{EnrichedRecord, Sentiment};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeCount {
    pub theme: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    pub total_count: usize,
    /// Percent of records with Negative sentiment, one decimal. None for an empty corpus.
    pub negative_sentiment_rate: Option<f64>,
    /// Most frequent theme; ties go to the lexicographically smallest label.
    pub top_theme: Option<ThemeCount>,
    pub theme_frequency: BTreeMap<String, usize>,
    /// Every department present maps all four sentiments, zero-filled.
    pub sentiment_by_department: BTreeMap<String, BTreeMap<Sentiment, usize>>,
}

impl AggregateStats {
    /// Themes ordered by count descending, then label ascending.
    pub fn ranked_themes(&self) -> Vec<ThemeCount> {
        let mut ranked: Vec<ThemeCount> = self
            .theme_frequency
            .iter()
            .map(|(theme, &count)| ThemeCount { theme: theme.clone(), count })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.theme.cmp(&b.theme)));
        ranked
    }
}

pub fn compute_aggregates(corpus: &[EnrichedRecord]) -> AggregateStats {
    let total_count = corpus.len();

    let negative = corpus
        .iter()
        .filter(|r| r.analysis.overall_sentiment == Sentiment::Negative)
        .count();
    let negative_sentiment_rate = if total_count == 0 {
        None
    } else {
        Some(round1(negative as f64 / total_count as f64 * 100.0))
    };

    let mut theme_frequency: BTreeMap<String, usize> = BTreeMap::new();
    for theme in corpus.iter().flat_map(|r| r.analysis.key_themes.iter()) {
        *theme_frequency.entry(theme.clone()).or_insert(0) += 1;
    }

    // BTreeMap iterates labels ascending; strict > keeps the first (smallest) on ties.
    let mut top_theme: Option<ThemeCount> = None;
    for (theme, &count) in &theme_frequency {
        if top_theme.as_ref().is_none_or(|t| count > t.count) {
            top_theme = Some(ThemeCount { theme: theme.clone(), count });
        }
    }

    let mut sentiment_by_department: BTreeMap<String, BTreeMap<Sentiment, usize>> = BTreeMap::new();
    for r in corpus {
        let counts = sentiment_by_department
            .entry(r.interview.department.clone())
            .or_insert_with(|| Sentiment::ALL.into_iter().map(|s| (s, 0)).collect());
        *counts.entry(r.analysis.overall_sentiment).or_insert(0) += 1;
    }

    AggregateStats {
        total_count,
        negative_sentiment_rate,
        top_theme,
        theme_frequency,
        sentiment_by_department,
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Records belonging to one department (exact match).
pub fn filter_department(corpus: &[EnrichedRecord], department: &str) -> Vec<EnrichedRecord> {
    corpus
        .iter()
        .filter(|r| r.interview.department == department)
        .cloned()
        .collect()
}

pub fn render_dashboard(stats: &AggregateStats) -> String {
    let mut out = String::new();

    let rate = stats
        .negative_sentiment_rate
        .map(|r| format!("{r:.1}%"))
        .unwrap_or_else(|| "n/a".into());
    let top = stats
        .top_theme
        .as_ref()
        .map(|t| t.theme.as_str())
        .unwrap_or("n/a");

    let _ = writeln!(out, "Overall Exit Trends");
    let _ = writeln!(out, "  Total Interviews Analyzed: {}", stats.total_count);
    let _ = writeln!(out, "  Negative Sentiment Rate:   {rate}");
    let _ = writeln!(out, "  Top Reason for Leaving:    {top}");

    let ranked = stats.ranked_themes();
    if !ranked.is_empty() {
        let width = ranked.iter().map(|t| t.theme.chars().count()).max().unwrap_or(0).max(5);
        let _ = writeln!(out, "\nTop Reasons for Leaving");
        let _ = writeln!(out, "  {:<width$}  Count", "Theme");
        for t in &ranked {
            let _ = writeln!(out, "  {:<width$}  {:>5}", t.theme, t.count);
        }
    }

    if !stats.sentiment_by_department.is_empty() {
        let width = stats
            .sentiment_by_department
            .keys()
            .map(|d| d.chars().count())
            .max()
            .unwrap_or(0)
            .max(10);
        let _ = writeln!(out, "\nSentiment by Department");
        let _ = write!(out, "  {:<width$}", "Department");
        for s in Sentiment::ALL {
            let _ = write!(out, "  {:>8}", s.as_str());
        }
        out.push('\n');
        for (dept, counts) in &stats.sentiment_by_department {
            let _ = write!(out, "  {dept:<width$}");
            for s in Sentiment::ALL {
                let _ = write!(out, "  {:>8}", counts.get(&s).copied().unwrap_or(0));
            }
            out.push('\n');
        }
    }

    out
}

pub fn render_record(record: &EnrichedRecord) -> String {
    let i = &record.interview;
    let a = &record.analysis;
    let mut out = String::new();

    let _ = writeln!(out, "Employee:    {} ({})", i.employee_name, i.employee_id);
    let _ = writeln!(out, "Designation: {}", i.designation);
    let _ = writeln!(out, "Department:  {}", i.department);
    let _ = writeln!(out, "Stated Reason for Leaving: {}", i.exit_reason);
    let _ = writeln!(out, "\nFull Transcript:\n{}", i.interview_transcript.trim_end());

    let _ = writeln!(out, "\nOverall Sentiment: {}", a.overall_sentiment);
    let _ = writeln!(out, "Key Themes:");
    for theme in &a.key_themes {
        let _ = writeln!(out, "- {theme}");
    }
    let _ = writeln!(out, "Summary:\n{}", a.summary);
    if !a.extracted_entities.is_empty() {
        let _ = writeln!(out, "Extracted Entities:");
        for e in &a.extracted_entities {
            let kind = if e.kind.is_empty() { "N/A" } else { &e.kind };
            let name = if e.name.is_empty() { "N/A" } else { &e.name };
            let _ = writeln!(out, "- {kind}: {name}");
        }
    }

    out
}

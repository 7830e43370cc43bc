//! Interview records: raw input, LLM annotation, and the merged record
//! persisted by `analyze` and read back by the insights commands.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One exit interview as captured by the upstream data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInterview {
    #[serde(rename = "employeeID")]
    pub employee_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub employee_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub designation: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub department: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub exit_reason: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub interview_transcript: String,
    /// Fields we don't model are carried through to the enriched output untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RawInterview {
    /// Whitespace-only transcripts carry no signal and are skipped like empty ones.
    pub fn has_transcript(&self) -> bool {
        !self.interview_transcript.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl Sentiment {
    pub const ALL: [Sentiment; 4] = [
        Sentiment::Positive,
        Sentiment::Negative,
        Sentiment::Neutral,
        Sentiment::Mixed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
            Sentiment::Mixed => "Mixed",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    /// Case-insensitive; models drift on capitalization but not on the label set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Sentiment::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown sentiment {trimmed:?}"))
    }
}

impl TryFrom<String> for Sentiment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

/// Structured extraction for one transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub overall_sentiment: Sentiment,
    #[serde(deserialize_with = "string_or_vec")]
    pub key_themes: Vec<String>,
    #[serde(default)]
    pub extracted_entities: Vec<Entity>,
    #[serde(deserialize_with = "string_or_lines")]
    pub summary: String,
}

pub const MAX_THEMES: usize = 3;

impl Annotation {
    /// Normalize and check the parts serde can't: theme count and a non-blank summary.
    pub fn validate(mut self) -> Result<Self, String> {
        self.key_themes = self
            .key_themes
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if self.key_themes.is_empty() {
            return Err("keyThemes is empty".into());
        }
        if self.key_themes.len() > MAX_THEMES {
            log::debug!(
                "truncating {} key themes to {MAX_THEMES}",
                self.key_themes.len()
            );
            self.key_themes.truncate(MAX_THEMES);
        }
        self.summary = self.summary.trim().to_string();
        if self.summary.is_empty() {
            return Err("summary is empty".into());
        }
        Ok(self)
    }
}

/// Raw interview fields plus the nested `analysis` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub interview: RawInterview,
    pub analysis: Annotation,
}

impl EnrichedRecord {
    /// A stale `analysis` carried in the raw fields is replaced, never duplicated.
    pub fn new(mut interview: RawInterview, analysis: Annotation) -> Self {
        interview.extra.remove("analysis");
        Self { interview, analysis }
    }

    /// Human-readable composite key, e.g. `Priya Sharma (E1024)`.
    pub fn display_name(&self) -> String {
        format!(
            "{} ({})",
            self.interview.employee_name, self.interview.employee_id
        )
    }
}

/// Exports write `null` for unknown text fields; treat it as empty.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Accept either a JSON string or array of strings. Models sometimes
/// return a single theme as a bare string.
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct StringOrVec;
    impl<'de> de::Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("string or array of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_owned()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::new();
            while let Some(s) = seq.next_element()? {
                out.push(s);
            }
            Ok(out)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Accept a summary as one string, or as an array of bullet lines joined by newlines.
fn string_or_lines<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    string_or_vec(deserializer).map(|lines| lines.join("\n"))
}

use std::sync::Arc;

use ai_client::{strip_code_blocks, truncate_chars, TextGenerator};
use hackscout_common::{CandidateRecord, Difficulty, ExtractionError, ExtractionPreset};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::renderer::BODY_TEXT_CAP;

// --- Requested fields ---

/// A key the extractor can ask the text-understanding service for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionField {
    Title,
    Description,
    Deadline,
    PrizePool,
    Prizes,
    Difficulty,
    Rules,
    Hashtags,
}

impl ExtractionField {
    /// Output key in the service response.
    pub fn key(&self) -> &'static str {
        match self {
            ExtractionField::Title => "title",
            ExtractionField::Description => "description",
            ExtractionField::Deadline => "deadline",
            ExtractionField::PrizePool => "prize_pool",
            ExtractionField::Prizes => "prizes",
            ExtractionField::Difficulty => "difficulty",
            ExtractionField::Rules => "rules",
            ExtractionField::Hashtags => "hashtags",
        }
    }

    fn type_hint(&self) -> String {
        match self {
            ExtractionField::Difficulty => {
                let levels: Vec<&str> = Difficulty::ALL.iter().map(Difficulty::as_str).collect();
                format!("string ({})", levels.join("/"))
            }
            ExtractionField::Rules => "string (formatted text)".to_string(),
            ExtractionField::Hashtags => "array of strings".to_string(),
            _ => "string".to_string(),
        }
    }

    fn guidance(&self) -> Option<&'static str> {
        match self {
            ExtractionField::Description => {
                Some("Precise, compact summary of the event, at most 3 sentences.")
            }
            ExtractionField::Rules => {
                Some("Compact list of the key rules (e.g. \"Team size 1-4, No prior code\").")
            }
            ExtractionField::Prizes => Some(
                "Breakdown of the individual prizes and tracks (e.g. \"1st: $5,000, 2nd: $2,500, Best AI hack: $1,000\"). Empty string if the page does not list them.",
            ),
            ExtractionField::Hashtags => Some(
                "If the page asks participants to post on social media with a specific hashtag, list it (e.g. [\"#hackathon2025\"]). If there is none, return [].",
            ),
            _ => None,
        }
    }
}

/// Ordered set of fields to request. Changing it changes the prompt, not the
/// request/decode protocol around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionProfile {
    fields: Vec<ExtractionField>,
}

impl ExtractionProfile {
    pub fn new(fields: impl IntoIterator<Item = ExtractionField>) -> Self {
        let mut profile = Self { fields: Vec::new() };
        for field in fields {
            profile = profile.with_field(field);
        }
        profile
    }

    pub fn preset(preset: ExtractionPreset) -> Self {
        match preset {
            ExtractionPreset::Hashtags => Self::hashtags(),
            ExtractionPreset::Prizes => Self::prizes(),
        }
    }

    /// Summary fields plus hashtag detection.
    pub fn hashtags() -> Self {
        Self::new([
            ExtractionField::Title,
            ExtractionField::Description,
            ExtractionField::Deadline,
            ExtractionField::PrizePool,
            ExtractionField::Difficulty,
            ExtractionField::Rules,
            ExtractionField::Hashtags,
        ])
    }

    /// Summary fields plus a prize breakdown, no hashtag detection.
    pub fn prizes() -> Self {
        Self::new([
            ExtractionField::Title,
            ExtractionField::Description,
            ExtractionField::Deadline,
            ExtractionField::PrizePool,
            ExtractionField::Prizes,
            ExtractionField::Difficulty,
            ExtractionField::Rules,
        ])
    }

    pub fn with_field(mut self, field: ExtractionField) -> Self {
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
        self
    }

    pub fn without_field(mut self, field: ExtractionField) -> Self {
        self.fields.retain(|f| *f != field);
        self
    }

    pub fn requests(&self, field: ExtractionField) -> bool {
        self.fields.contains(&field)
    }

    pub fn fields(&self) -> &[ExtractionField] {
        &self.fields
    }

    pub fn build_prompt(&self, body_text: &str) -> String {
        let mut prompt =
            String::from("Analyze the following text from a hackathon or event page.\n\n");

        let guidance: Vec<(ExtractionField, &str)> = self
            .fields
            .iter()
            .filter_map(|f| f.guidance().map(|g| (*f, g)))
            .collect();
        if !guidance.is_empty() {
            prompt.push_str("Requirements:\n");
            for (i, (field, text)) in guidance.iter().enumerate() {
                prompt.push_str(&format!("{}. {}: {}\n", i + 1, field.key(), text));
            }
            prompt.push('\n');
        }

        prompt.push_str(
            "Return ONLY a raw JSON object (no markdown, no code fences, no commentary) with these keys:\n",
        );
        for field in &self.fields {
            prompt.push_str(&format!("- {}: {}\n", field.key(), field.type_hint()));
        }

        prompt.push_str("\nText:\n");
        prompt.push_str(body_text);
        prompt
    }
}

impl Default for ExtractionProfile {
    fn default() -> Self {
        Self::hashtags()
    }
}

// --- Extractor ---

/// Turns page text into a candidate record with one text-generation call.
pub struct Extractor {
    generator: Arc<dyn TextGenerator>,
    profile: ExtractionProfile,
    body_text_cap: usize,
}

impl Extractor {
    pub fn new(generator: Arc<dyn TextGenerator>, profile: ExtractionProfile) -> Self {
        Self {
            generator,
            profile,
            body_text_cap: BODY_TEXT_CAP,
        }
    }

    /// Single round trip, no retry. Service and decode failures both surface
    /// as `ExtractionError`.
    pub async fn extract(&self, body_text: &str) -> Result<CandidateRecord, ExtractionError> {
        let body_text = truncate_chars(body_text, self.body_text_cap);
        let prompt = self.profile.build_prompt(body_text);

        let response = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| ExtractionError::Service(format!("{}: {e:#}", self.generator.name())))?;

        let candidate = decode_candidate(&response, &self.profile)?;

        info!(
            generator = self.generator.name(),
            has_title = candidate.title.is_some(),
            difficulty = ?candidate.difficulty,
            tags = candidate.social_tags.len(),
            "Extraction complete"
        );

        Ok(candidate)
    }
}

// --- Response decoding ---

/// Decode a service response into a candidate. Only requested keys are read.
pub fn decode_candidate(
    response: &str,
    profile: &ExtractionProfile,
) -> Result<CandidateRecord, ExtractionError> {
    let object = parse_object(response)?;
    let mut candidate = CandidateRecord::default();

    for field in profile.fields() {
        let value = object.get(field.key());
        match field {
            ExtractionField::Title => candidate.title = value.and_then(lenient_text),
            ExtractionField::Description => candidate.description = value.and_then(lenient_text),
            ExtractionField::Deadline => candidate.deadline = value.and_then(lenient_text),
            ExtractionField::PrizePool => candidate.prize_pool = value.and_then(lenient_text),
            ExtractionField::Prizes => candidate.prizes_breakdown = value.and_then(lenient_text),
            ExtractionField::Rules => candidate.rules = value.and_then(lenient_text),
            ExtractionField::Difficulty => {
                candidate.difficulty = value.and_then(lenient_text).and_then(|raw| {
                    let parsed = Difficulty::parse(&raw);
                    if parsed.is_none() {
                        warn!(difficulty = raw.as_str(), "Unrecognised difficulty, leaving unset");
                    }
                    parsed
                });
            }
            ExtractionField::Hashtags => {
                candidate.social_tags = value.map(tag_list).unwrap_or_default();
            }
        }
    }

    Ok(candidate)
}

fn parse_object(response: &str) -> Result<Map<String, Value>, ExtractionError> {
    let cleaned = strip_code_blocks(response);

    let value = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => value,
        // Prose around an otherwise valid object: fall back to the outermost braces.
        Err(e) => match (cleaned.find('{'), cleaned.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str::<Value>(&cleaned[start..=end])
                    .map_err(|_| ExtractionError::Decode(e.to_string()))?
            }
            _ => return Err(ExtractionError::Decode(e.to_string())),
        },
    };

    match value {
        Value::Object(object) => Ok(object),
        other => Err(ExtractionError::Decode(format!(
            "expected an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Best-effort string view of a JSON value. Empty results are `None`.
fn lenient_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(lenient_text)
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(entries) => entries
            .iter()
            .filter_map(|(k, v)| lenient_text(v).map(|v| format!("{k}: {v}")))
            .collect::<Vec<_>>()
            .join("\n"),
    };
    (!text.is_empty()).then_some(text)
}

fn tag_list(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(lenient_text).collect(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

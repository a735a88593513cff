use std::fmt;

use serde::{Deserialize, Serialize};

// --- Renderer output ---

/// What the browser saw on the primary page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSignals {
    /// og:title, else document.title, else empty.
    pub title: String,
    /// Address actually loaded, after redirects.
    pub canonical_url: String,
    /// Visible body text, already capped to the renderer's character limit.
    pub body_text: String,
    /// Video-like elements present at load time.
    pub media_element_count: u32,
}

// --- Difficulty ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Hardcore,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
        Difficulty::Hardcore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
            Difficulty::Hardcore => "Hardcore",
        }
    }

    /// Case-insensitive match against the enumeration.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Extractor output ---

/// Structured fields the text-understanding service proposed. Any of them
/// may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateRecord {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub prize_pool: Option<String>,
    pub prizes_breakdown: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub rules: Option<String>,
    pub social_tags: Vec<String>,
}

// --- Final record ---

/// The enriched hackathon record handed back to the caller. Every field
/// serializes as a string; unset means empty, never null or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalRecord {
    pub title: String,
    pub url: String,
    pub description: String,
    pub deadline: String,
    pub prize_pool: String,
    #[serde(rename = "prizes")]
    pub prizes_breakdown: String,
    pub difficulty: String,
    pub rules: String,
    pub hashtag_counts: String,
}

// --- Popularity probe ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Fewer media elements than the target were found.
    Counted(u32),
    /// The target was reached; the true count is at least the target.
    Saturated(u32),
    Failed,
}

impl ProbeOutcome {
    pub fn from_count(count: u32, target: u32) -> Self {
        if count >= target {
            ProbeOutcome::Saturated(target)
        } else {
            ProbeOutcome::Counted(count)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub outcome: ProbeOutcome,
}

impl fmt::Display for TagCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            ProbeOutcome::Counted(n) => write!(f, "{}: {} videos", self.tag, n),
            ProbeOutcome::Saturated(target) => write!(f, "{}: {}+ videos", self.tag, target),
            ProbeOutcome::Failed => write!(f, "{}: Check failed", self.tag),
        }
    }
}

/// Comma-joined `hashtag_counts` value, in probe order.
pub fn format_hashtag_counts(counts: &[TagCount]) -> String {
    counts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parse_is_case_insensitive() {
        assert_eq!(Difficulty::parse("advanced"), Some(Difficulty::Advanced));
        assert_eq!(Difficulty::parse(" HARDCORE "), Some(Difficulty::Hardcore));
        assert_eq!(Difficulty::parse("Medium"), None);
        assert_eq!(Difficulty::parse(""), None);
    }

    #[test]
    fn final_record_serializes_every_key_as_string() {
        let record = FinalRecord {
            title: "Example Hack".to_string(),
            url: "https://example.com/hack".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();

        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        let mut expected = vec![
            "title",
            "url",
            "description",
            "deadline",
            "prize_pool",
            "prizes",
            "difficulty",
            "rules",
            "hashtag_counts",
        ];
        let mut actual = keys.clone();
        expected.sort_unstable();
        actual.sort_unstable();
        assert_eq!(actual, expected);

        assert!(obj.values().all(|v| v.is_string()));
        assert_eq!(obj["description"], "");
    }

    #[test]
    fn tag_count_formats() {
        let counts = vec![
            TagCount {
                tag: "#ex25".to_string(),
                outcome: ProbeOutcome::from_count(42, 100),
            },
            TagCount {
                tag: "#big".to_string(),
                outcome: ProbeOutcome::from_count(137, 100),
            },
            TagCount {
                tag: "#broken".to_string(),
                outcome: ProbeOutcome::Failed,
            },
        ];
        assert_eq!(
            format_hashtag_counts(&counts),
            "#ex25: 42 videos, #big: 100+ videos, #broken: Check failed"
        );
    }

    #[test]
    fn count_at_target_is_saturated() {
        assert_eq!(ProbeOutcome::from_count(100, 100), ProbeOutcome::Saturated(100));
        assert_eq!(ProbeOutcome::from_count(99, 100), ProbeOutcome::Counted(99));
    }

    #[test]
    fn no_tags_formats_empty() {
        assert_eq!(format_hashtag_counts(&[]), "");
    }
}

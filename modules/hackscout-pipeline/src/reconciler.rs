use hackscout_common::{CandidateRecord, FinalRecord, RawSignals};

/// Merge rendered signals with the extractor's candidate. Pure, cannot fail.
///
/// `title` prefers a non-empty candidate title over the rendered one. `url`
/// always comes from the render. Every other field comes from the candidate
/// or stays empty; with no candidate the record carries only the rendered
/// title and url. `hashtag_counts` is left for the probe stage.
pub fn reconcile(raw: &RawSignals, candidate: Option<&CandidateRecord>) -> FinalRecord {
    let Some(candidate) = candidate else {
        return FinalRecord {
            title: raw.title.clone(),
            url: raw.canonical_url.clone(),
            ..Default::default()
        };
    };

    let title = candidate
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&raw.title)
        .to_string();

    FinalRecord {
        title,
        url: raw.canonical_url.clone(),
        description: candidate.description.clone().unwrap_or_default(),
        deadline: candidate.deadline.clone().unwrap_or_default(),
        prize_pool: candidate.prize_pool.clone().unwrap_or_default(),
        prizes_breakdown: candidate.prizes_breakdown.clone().unwrap_or_default(),
        difficulty: candidate
            .difficulty
            .map(|d| d.as_str().to_string())
            .unwrap_or_default(),
        rules: candidate.rules.clone().unwrap_or_default(),
        hashtag_counts: String::new(),
    }
}

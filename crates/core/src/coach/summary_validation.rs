//! Shape checks for model-rewritten summaries.
//!
//! A rewrite may only change prose. Counts, order, ids, scores, categories,
//! severities and confidence must match the summary it was derived from.

use chrono::{DateTime, Utc};

use super::coach_errors::CoachError;
use super::coach_model::{CoachSummary, SummaryMeta, SummaryRewrite, SummarySource};

const MAX_PRIORITIES: usize = 3;
const MAX_RISKS: usize = 5;
const MAX_ACTIONS: usize = 5;

fn check_text(field: &str, value: &str, max: usize) -> Result<(), CoachError> {
    let len = value.chars().count();
    if len == 0 || len > max {
        return Err(CoachError::Validation(format!(
            "{} must be 1 to {} characters",
            field, max
        )));
    }
    Ok(())
}

fn check_limits(rewrite: &SummaryRewrite) -> Result<(), CoachError> {
    if rewrite.top_priorities.len() > MAX_PRIORITIES
        || rewrite.risks.len() > MAX_RISKS
        || rewrite.next_actions.len() > MAX_ACTIONS
    {
        return Err(CoachError::Validation("Too many summary items".to_string()));
    }
    for item in &rewrite.top_priorities {
        check_text("priority title", &item.title, 180)?;
        check_text("priority reason", &item.reason, 300)?;
        if !(0..=200).contains(&item.score) {
            return Err(CoachError::Validation("Score out of range".to_string()));
        }
    }
    for item in &rewrite.risks {
        check_text("risk title", &item.title, 180)?;
        check_text("risk reason", &item.reason, 300)?;
    }
    for item in &rewrite.next_actions {
        check_text("action", &item.action, 220)?;
        check_text("action why", &item.why, 300)?;
    }
    if !(0..=100).contains(&rewrite.confidence.value) {
        return Err(CoachError::Validation(
            "Confidence out of range".to_string(),
        ));
    }
    Ok(())
}

fn check_same_shape(rewrite: &SummaryRewrite, base: &CoachSummary) -> Result<(), CoachError> {
    let counts_match = rewrite.top_priorities.len() == base.top_priorities.len()
        && rewrite.risks.len() == base.risks.len()
        && rewrite.next_actions.len() == base.next_actions.len();
    if !counts_match {
        return Err(CoachError::Validation("Item counts changed".to_string()));
    }

    let priorities_match = rewrite
        .top_priorities
        .iter()
        .zip(&base.top_priorities)
        .all(|(a, b)| a.goal_id == b.goal_id && a.score == b.score);
    let risks_match = rewrite
        .risks
        .iter()
        .zip(&base.risks)
        .all(|(a, b)| a.goal_id == b.goal_id && a.category == b.category && a.severity == b.severity);
    let actions_match = rewrite
        .next_actions
        .iter()
        .zip(&base.next_actions)
        .all(|(a, b)| a.goal_id == b.goal_id);

    if !(priorities_match && risks_match && actions_match) {
        return Err(CoachError::Validation("Item identity changed".to_string()));
    }
    if rewrite.confidence != base.confidence {
        return Err(CoachError::Validation("Confidence changed".to_string()));
    }
    Ok(())
}

/// Accepts `rewrite` as an AI-sourced summary if it kept the shape of `base`.
pub fn validate_rewrite(
    rewrite: SummaryRewrite,
    base: &CoachSummary,
    now: DateTime<Utc>,
) -> Result<CoachSummary, CoachError> {
    check_limits(&rewrite)?;
    check_same_shape(&rewrite, base)?;

    Ok(CoachSummary {
        top_priorities: rewrite.top_priorities,
        risks: rewrite.risks,
        next_actions: rewrite.next_actions,
        confidence: rewrite.confidence,
        meta: SummaryMeta {
            generated_at: now,
            source: SummarySource::Ai,
            ..base.meta.clone()
        },
    })
}

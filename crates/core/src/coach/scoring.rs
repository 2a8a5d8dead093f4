//! Rules-based scoring engine.
//!
//! Maps a goal snapshot to a prioritized summary. Pure: the only input besides
//! the goals is the reference instant.

use chrono::{DateTime, Duration, Utc};

use super::coach_model::{
    ActionItem, Band, CoachSummary, Confidence, PriorityItem, RiskCategory, RiskItem,
    SummaryMeta, SummarySource,
};
use crate::constants::{DATA_WINDOW_DAYS, EMPTY_GOAL_ID, ENGINE_VERSION};
use crate::goals::{Goal, GoalStatus};
use crate::utils::time_utils::{ceil_days_until, whole_days_since};

const TOP_PRIORITIES: usize = 3;
const MAX_RISKS: usize = 4;
const NEXT_ACTIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archetype {
    Rescue,
    Close,
    Push,
}

/// Per-goal signals and scores.
#[derive(Debug, Clone)]
pub struct GoalScore<'a> {
    pub goal: &'a Goal,
    pub due_days: Option<i64>,
    pub stale_days: i64,
    pub velocity: i64,
    pub urgency: i64,
    pub momentum: f64,
    pub feasibility: f64,
    pub effort: i64,
    pub priority: i64,
    pub archetype: Archetype,
}

impl GoalScore<'_> {
    fn is_overdue(&self) -> bool {
        matches!(self.due_days, Some(d) if d < 0)
    }

    fn due_within_week(&self) -> bool {
        matches!(self.due_days, Some(d) if d <= 7)
    }
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

fn stale_days(goal: &Goal, now: DateTime<Utc>) -> i64 {
    let latest = goal
        .progress_events
        .first()
        .map(|e| e.created_at)
        .unwrap_or(goal.updated_at);
    whole_days_since(latest, now)
}

/// Newest minus oldest progress value inside the data window.
fn recent_velocity(goal: &Goal, now: DateTime<Utc>) -> i64 {
    let window_start = now - Duration::days(DATA_WINDOW_DAYS);
    let recent: Vec<_> = goal
        .progress_events
        .iter()
        .filter(|e| e.created_at >= window_start)
        .collect();
    if recent.len() < 2 {
        return 0;
    }
    let latest = recent[0].value as i64;
    let oldest = recent[recent.len() - 1].value as i64;
    (latest - oldest).clamp(-100, 100)
}

fn archetype_for(progress: i32, due_days: Option<i64>, stale_days: i64, velocity: i64) -> Archetype {
    if matches!(due_days, Some(d) if d < 0) || stale_days >= 7 {
        Archetype::Rescue
    } else if progress >= 80 || (progress >= 65 && velocity >= 8) {
        Archetype::Close
    } else {
        Archetype::Push
    }
}

/// Scores a single goal at `now`.
pub fn score_goal(goal: &Goal, now: DateTime<Utc>) -> GoalScore<'_> {
    let due_days = goal.target_date.map(|d| ceil_days_until(d, now));
    let stale_days = stale_days(goal, now);
    let velocity = recent_velocity(goal, now);
    let progress = goal.current_progress;

    let total = goal.milestones.len();
    let done = goal.milestones.iter().filter(|m| m.completed).count();
    let milestone_ratio = if total > 0 {
        done as f64 / total as f64
    } else {
        0.0
    };

    let base_urgency = match due_days {
        Some(d) if d < 0 => 100,
        Some(d) if d <= 7 => 70,
        None => 35,
        Some(_) => 20,
    };
    let urgency = base_urgency + (stale_days * 2).min(20);
    let momentum = clamp(
        55.0 + velocity as f64 * 2.0 - stale_days as f64 * 3.0,
        0.0,
        100.0,
    );
    let feasibility = clamp(
        40.0 + milestone_ratio * 45.0 + progress as f64 * 0.15,
        0.0,
        100.0,
    );
    let effort = if progress >= 80 && stale_days >= 3 {
        90
    } else if progress >= 65 {
        70
    } else if progress <= 25 && stale_days >= 7 {
        75
    } else {
        50
    };
    let priority = clamp(
        urgency as f64 * 0.4
            + (100.0 - momentum) * 0.25
            + (100.0 - feasibility) * 0.2
            + effort as f64 * 0.15,
        0.0,
        100.0,
    )
    .round() as i64;

    GoalScore {
        goal,
        due_days,
        stale_days,
        velocity,
        urgency,
        momentum,
        feasibility,
        effort,
        priority,
        archetype: archetype_for(progress, due_days, stale_days, velocity),
    }
}

fn priority_reason(score: &GoalScore<'_>) -> &'static str {
    match score.archetype {
        Archetype::Rescue => {
            if score.is_overdue() {
                "Overdue goal: recover immediately with a focused execution block."
            } else if score.stale_days >= 7 {
                "Momentum dropped for 7+ days; immediate reactivation needed."
            } else {
                "High-risk execution path requires rapid stabilization."
            }
        }
        Archetype::Close => "Close-to-finish goal with strong payoff if completed this week.",
        Archetype::Push => {
            if score.due_within_week() {
                "Due within a week; prioritized for predictable completion."
            } else if score.velocity <= 0 {
                "Progress velocity is flat; needs a concrete push to move."
            } else {
                "High-leverage active goal with room to accelerate outcomes."
            }
        }
    }
}

fn risk_for(score: &GoalScore<'_>) -> RiskItem {
    let (category, severity_proxy, reason) = if score.due_within_week() {
        let reason = if score.is_overdue() {
            "Deadline has passed; schedule recovery needed now."
        } else {
            "Deadline is within 7 days with limited execution buffer."
        };
        (RiskCategory::Schedule, score.urgency, reason)
    } else if score.stale_days >= 7 {
        (
            RiskCategory::Consistency,
            65 + score.stale_days,
            "No meaningful update in over a week, signaling momentum decay.",
        )
    } else {
        (
            RiskCategory::Execution,
            55 + (35.0 - score.momentum).round() as i64,
            "Execution pace is below required velocity for confident completion.",
        )
    };
    RiskItem {
        goal_id: score.goal.id.clone(),
        title: score.goal.title.clone(),
        category,
        severity: Band::for_risk(severity_proxy),
        reason: reason.to_string(),
    }
}

fn has_risk(score: &GoalScore<'_>) -> bool {
    score.due_within_week()
        || score.stale_days >= 7
        || score.momentum < 35.0
        || score.goal.current_progress < 25
}

fn action_for(score: &GoalScore<'_>) -> ActionItem {
    let next_milestone = score.goal.next_open_milestone();
    let (action, why) = match score.archetype {
        Archetype::Rescue => {
            let action = if score.is_overdue() {
                "Run one 45-minute recovery sprint and log a concrete progress update today."
                    .to_string()
            } else {
                "Run one 45-minute restart sprint and unblock the next critical step today."
                    .to_string()
            };
            let why = if score.stale_days >= 7 {
                "Breaking long inactivity is the fastest way to restore momentum."
            } else {
                "Time-sensitive goals need immediate output to avoid further slip."
            };
            (action, why)
        }
        Archetype::Close => (
            match next_milestone {
                Some(m) => format!(
                    "Block a 40-minute finish sprint to complete milestone: {}.",
                    m.title
                ),
                None => "Block a 40-minute finish sprint and move progress to 100% this week."
                    .to_string(),
            },
            "Completing near-finish goals frees capacity and compounds motivation.",
        ),
        Archetype::Push => (
            match next_milestone {
                Some(m) => format!(
                    "Schedule a 45-minute deep-work block to complete: {}.",
                    m.title
                ),
                None => {
                    "Schedule a 45-minute deep-work block and ship one measurable milestone step."
                        .to_string()
                }
            },
            "Time-boxed focused execution is the highest-leverage move for this goal.",
        ),
    };
    ActionItem {
        goal_id: score.goal.id.clone(),
        action,
        why: why.to_string(),
    }
}

fn empty_action(action: &str, why: &str) -> ActionItem {
    ActionItem {
        goal_id: EMPTY_GOAL_ID.to_string(),
        action: action.to_string(),
        why: why.to_string(),
    }
}

fn rules_meta(now: DateTime<Utc>) -> SummaryMeta {
    SummaryMeta {
        generated_at: now,
        source: SummarySource::Rules,
        engine_version: ENGINE_VERSION.to_string(),
        data_window_days: DATA_WINDOW_DAYS,
    }
}

fn empty_summary(now: DateTime<Utc>) -> CoachSummary {
    CoachSummary {
        top_priorities: Vec::new(),
        risks: Vec::new(),
        next_actions: vec![
            empty_action(
                "Schedule a 30-minute planning session and create one goal with a clear target date.",
                "Coach recommendations become more precise once active goals exist.",
            ),
            empty_action(
                "Define two milestones for that goal in a 20-minute setup block.",
                "Milestones make weekly actions concrete and trackable.",
            ),
            empty_action(
                "Run one 25-minute execution block and log your first progress update.",
                "A first progress log establishes momentum and baseline confidence.",
            ),
        ],
        confidence: Confidence {
            value: 40,
            band: Band::Medium,
        },
        meta: rules_meta(now),
    }
}

fn confidence_for(scored: &[GoalScore<'_>]) -> Confidence {
    let count = scored.len().max(1) as f64;
    let overdue = scored.iter().filter(|s| s.is_overdue()).count() as f64;
    let stale = scored.iter().filter(|s| s.stale_days >= 7).count() as f64;
    let avg_stale = scored.iter().map(|s| s.stale_days as f64).sum::<f64>() / count;
    let avg_feasibility = scored.iter().map(|s| s.feasibility).sum::<f64>() / count;

    let cadence = clamp(100.0 - (avg_stale * 7.0).round(), 0.0, 100.0);
    let deadline = clamp(100.0 - (overdue / count * 100.0).round(), 0.0, 100.0);
    let completion = clamp(avg_feasibility.round(), 0.0, 100.0);
    let value = clamp(
        cadence * 0.35 + deadline * 0.4 + completion * 0.25 - stale * 2.0,
        0.0,
        100.0,
    )
    .round() as i64;

    Confidence {
        value,
        band: Band::for_confidence(value),
    }
}

/// Builds the rules summary for `goals` at `now`.
///
/// Only goals whose effective status is active are scored. Ties keep the
/// snapshot order.
pub fn compute_summary(goals: &[Goal], now: DateTime<Utc>) -> CoachSummary {
    let mut scored: Vec<GoalScore<'_>> = goals
        .iter()
        .filter(|g| g.effective_status() == GoalStatus::Active)
        .map(|g| score_goal(g, now))
        .collect();

    if scored.is_empty() {
        return empty_summary(now);
    }

    let confidence = confidence_for(&scored);
    scored.sort_by(|a, b| b.priority.cmp(&a.priority));

    let top_priorities = scored
        .iter()
        .take(TOP_PRIORITIES)
        .map(|s| PriorityItem {
            goal_id: s.goal.id.clone(),
            title: s.goal.title.clone(),
            reason: priority_reason(s).to_string(),
            score: s.priority,
        })
        .collect();

    let risks = scored
        .iter()
        .filter(|s| has_risk(s))
        .take(MAX_RISKS)
        .map(risk_for)
        .collect();

    let mut next_actions: Vec<ActionItem> = Vec::with_capacity(NEXT_ACTIONS);
    for score in &scored {
        if next_actions.len() == NEXT_ACTIONS {
            break;
        }
        if next_actions.iter().any(|a| a.goal_id == score.goal.id) {
            continue;
        }
        next_actions.push(action_for(score));
    }
    let top_goal_id = scored[0].goal.id.clone();
    while next_actions.len() < NEXT_ACTIONS {
        next_actions.push(ActionItem {
            goal_id: top_goal_id.clone(),
            action: "Run one 30-minute focused block and log a measurable update.".to_string(),
            why: "Small, time-boxed execution blocks keep weekly momentum reliable.".to_string(),
        });
    }

    CoachSummary {
        top_priorities,
        risks,
        next_actions,
        confidence,
        meta: rules_meta(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::{Milestone, ProgressEvent};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 15, 12, 0, 0).unwrap()
    }

    fn goal(id: &str, progress: i32) -> Goal {
        Goal {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            title: format!("Goal {}", id),
            details: None,
            status: GoalStatus::Active,
            current_progress: progress,
            target_date: None,
            created_at: now() - Duration::days(30),
            updated_at: now(),
            progress_events: Vec::new(),
            milestones: Vec::new(),
            tags: Vec::new(),
        }
    }

    fn event(goal_id: &str, value: i32, days_ago: i64) -> ProgressEvent {
        ProgressEvent {
            id: format!("{}-{}", goal_id, days_ago),
            goal_id: goal_id.to_string(),
            value,
            note: None,
            created_at: now() - Duration::days(days_ago),
        }
    }

    fn milestone(goal_id: &str, title: &str, completed: bool) -> Milestone {
        Milestone {
            id: format!("{}-{}", goal_id, title),
            goal_id: goal_id.to_string(),
            title: title.to_string(),
            completed,
            created_at: now() - Duration::days(10),
        }
    }

    #[test]
    fn test_empty_snapshot_returns_setup_summary() {
        let mut archived = goal("a", 10);
        archived.status = GoalStatus::Archived;
        let done = goal("b", 100);

        let summary = compute_summary(&[archived, done], now());

        assert!(summary.top_priorities.is_empty());
        assert!(summary.risks.is_empty());
        assert_eq!(summary.next_actions.len(), 3);
        assert!(summary
            .next_actions
            .iter()
            .all(|a| a.goal_id == EMPTY_GOAL_ID));
        assert_eq!(summary.confidence.value, 40);
        assert_eq!(summary.confidence.band, Band::Medium);
        assert_eq!(summary.meta.source, SummarySource::Rules);
        assert_eq!(summary.meta.engine_version, "rules-v1.1");
        assert_eq!(summary.meta.data_window_days, 14);
    }

    #[test]
    fn test_scores_fresh_goal_without_deadline() {
        let g = goal("a", 0);
        let score = score_goal(&g, now());

        assert_eq!(score.due_days, None);
        assert_eq!(score.stale_days, 0);
        assert_eq!(score.velocity, 0);
        assert_eq!(score.urgency, 35);
        assert_eq!(score.momentum, 55.0);
        assert_eq!(score.feasibility, 40.0);
        assert_eq!(score.effort, 50);
        // 14 + 11.25 + 12 + 7.5
        assert_eq!(score.priority, 45);
        assert_eq!(score.archetype, Archetype::Push);
    }

    #[test]
    fn test_overdue_goal_is_rescue_with_max_urgency() {
        let mut g = goal("a", 40);
        g.target_date = Some(now() - Duration::days(3));
        let score = score_goal(&g, now());

        assert_eq!(score.due_days, Some(-3));
        assert_eq!(score.urgency, 100);
        assert_eq!(score.archetype, Archetype::Rescue);
        assert_eq!(
            priority_reason(&score),
            "Overdue goal: recover immediately with a focused execution block."
        );
    }

    #[test]
    fn test_velocity_uses_events_inside_window() {
        let mut g = goal("a", 50);
        g.progress_events = vec![event("a", 50, 1), event("a", 30, 10), event("a", 0, 20)];
        let score = score_goal(&g, now());

        assert_eq!(score.velocity, 20);
        assert_eq!(score.stale_days, 1);
    }

    #[test]
    fn test_single_recent_event_has_zero_velocity() {
        let mut g = goal("a", 50);
        g.progress_events = vec![event("a", 50, 1), event("a", 10, 20)];
        assert_eq!(score_goal(&g, now()).velocity, 0);
    }

    #[test]
    fn test_close_archetype_and_milestone_action() {
        let mut g = goal("a", 85);
        g.milestones = vec![
            milestone("a", "Draft", true),
            milestone("a", "Publish", false),
        ];
        let score = score_goal(&g, now());
        assert_eq!(score.archetype, Archetype::Close);

        let action = action_for(&score);
        assert_eq!(
            action.action,
            "Block a 40-minute finish sprint to complete milestone: Publish."
        );
    }

    #[test]
    fn test_overdue_ranks_above_identical_goal() {
        let mut on_time = goal("on-time", 30);
        on_time.target_date = Some(now() + Duration::days(30));
        let mut overdue = on_time.clone();
        overdue.id = "overdue".to_string();
        overdue.target_date = Some(now() - Duration::days(2));

        let summary = compute_summary(&[on_time, overdue], now());
        assert_eq!(summary.top_priorities[0].goal_id, "overdue");
    }

    #[test]
    fn test_risk_category_follows_rule_order() {
        let mut due_soon = goal("due", 10);
        due_soon.target_date = Some(now() + Duration::days(3));
        let mut stale = goal("stale", 50);
        stale.updated_at = now() - Duration::days(12);

        let summary = compute_summary(&[due_soon, stale], now());
        let due_risk = summary.risks.iter().find(|r| r.goal_id == "due").unwrap();
        let stale_risk = summary.risks.iter().find(|r| r.goal_id == "stale").unwrap();

        assert_eq!(due_risk.category, RiskCategory::Schedule);
        assert_eq!(due_risk.severity, Band::Medium);
        assert_eq!(stale_risk.category, RiskCategory::Consistency);
        assert_eq!(stale_risk.severity, Band::High);
    }

    #[test]
    fn test_next_actions_padded_with_top_goal() {
        let g = goal("solo", 30);
        let summary = compute_summary(&[g], now());

        assert_eq!(summary.next_actions.len(), 3);
        assert!(summary.next_actions.iter().all(|a| a.goal_id == "solo"));
        assert_eq!(
            summary.next_actions[1].action,
            "Run one 30-minute focused block and log a measurable update."
        );
    }

    #[test]
    fn test_next_actions_are_one_per_goal() {
        let goals: Vec<Goal> = (0..5).map(|i| goal(&format!("g{}", i), i * 10)).collect();
        let summary = compute_summary(&goals, now());

        assert_eq!(summary.top_priorities.len(), 3);
        assert_eq!(summary.next_actions.len(), 3);
        let ids: std::collections::HashSet<_> =
            summary.next_actions.iter().map(|a| &a.goal_id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_confidence_for_fresh_goals() {
        let summary = compute_summary(&[goal("a", 0)], now());
        // 100*0.35 + 100*0.4 + 40*0.25
        assert_eq!(summary.confidence.value, 85);
        assert_eq!(summary.confidence.band, Band::High);
    }

    #[test]
    fn test_confidence_penalizes_stale_and_overdue() {
        let mut g = goal("a", 0);
        g.updated_at = now() - Duration::days(9);
        g.target_date = Some(now() - Duration::days(5));
        let summary = compute_summary(&[g], now());
        // cadence 37, deadline 0, completion 40, one stale goal
        assert_eq!(summary.confidence.value, 21);
        assert_eq!(summary.confidence.band, Band::Low);
    }
}

//! Chat intent parser.
//!
//! Turns a free-text chat message into draft goal mutations. Pure: the
//! caller supplies the recent assistant turns and the user's goals. A pending
//! disambiguation lives in the conversation itself, as a marker line appended
//! to the clarification the assistant sent.

use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

use super::proposal_model::{
    CreateGoalPayload, DeleteGoalPayload, ProposalDraft, ProposedAction, UpdateGoalPayload,
};
use crate::constants::{INTENT_ASSISTANT_TURNS, MAX_CLARIFICATION_CANDIDATES};
use crate::goals::{Goal, GoalStatus};
use crate::utils::time_utils::{add_days, add_months, start_of_day_utc, truncate_to_seconds};

pub const DELETE_MARKER: &str = "[intent:delete_goal]";
pub const UPDATE_MARKER: &str = "[intent:update_goal]";

const MAX_TITLE_CHARS: usize = 120;
const MAX_DETAILS_CHARS: usize = 2000;
const MIN_CONTAINED_TITLE_CHARS: usize = 3;
const MAX_RELATIVE_AMOUNT: u32 = 3650;
const EDGE_CHARS: &[char] = &['"', '\'', '“', '”', '‘', '’', '.', ',', '!', '?', ';', ':'];

lazy_static! {
    static ref POLITE_PREFIXES: Vec<Regex> = [
        r"(?i)^(?:hi|hello|hey)(?:\s+(?:there|coach))?\b[\s,!.]*",
        r"(?i)^(?:please|pls|kindly)\b[\s,]*",
        r"(?i)^(?:could|can|would|will)\s+you\s+(?:please\s+)?",
        r"(?i)^(?:i\s+(?:want|need|would\s+like|wanna)|i['’]d\s+like)\s+(?:you\s+)?(?:to\s+)?",
        r"(?i)^(?:let['’]?s|let\s+us)\s+",
        r"(?i)^help\s+me\s+(?:to\s+)?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex pattern"))
    .collect();

    static ref GOAL_WORD: Regex = Regex::new(r"(?i)\bgoals?\b").expect("Invalid regex pattern");
    static ref CREATE_VERB: Regex =
        Regex::new(r"(?i)\b(?:create|add|start|make|begin|set\s+up)\b")
            .expect("Invalid regex pattern");
    static ref DELETE_VERB: Regex =
        Regex::new(r"(?i)\b(?:delete|remove|archive|drop|trash)\b")
            .expect("Invalid regex pattern");
    static ref UPDATE_VERB: Regex =
        Regex::new(r"(?i)\b(?:update|change|edit|rename|retitle|modify|reschedule)\b")
            .expect("Invalid regex pattern");

    static ref TITLE_CALLED: Regex =
        Regex::new(r"(?i)\bgoal\s+(?:called|named|titled)\s+(.+)$").expect("Invalid regex pattern");
    static ref TITLE_TO: Regex =
        Regex::new(r"(?i)\bgoal\s+(?:to|of)\s+(.+)$").expect("Invalid regex pattern");
    static ref TITLE_COLON: Regex =
        Regex::new(r"(?i)\bgoal\s*:\s*(.+)$").expect("Invalid regex pattern");
    static ref CREATE_LEAD: Regex = Regex::new(
        r"(?i)^(?:create|add|start|make|begin|set\s+up)\s+(?:(?:a|an|the|my|one)\s+)?(?:new\s+)?goals?\b\s*(?:for|about)?\s*"
    )
    .expect("Invalid regex pattern");

    static ref RELATIVE_DATE: Regex =
        Regex::new(r"(?i)\bin\s+(\d{1,5})\s+(day|week|month)s?\b").expect("Invalid regex pattern");
    static ref TRAILING_RELATIVE: Regex =
        Regex::new(r"(?i)[\s,]*\bin\s+\d{1,5}\s+(?:day|week|month)s?\b.*$")
            .expect("Invalid regex pattern");
    static ref EXPLICIT_DATE: Regex = Regex::new(
        r"(?i)\b(?:target\s+date|due(?:\s+date)?|deadline)\b\D{0,20}?(\d{4}-\d{2}-\d{2})"
    )
    .expect("Invalid regex pattern");

    /// Outer group includes the quote characters, inner group is the content.
    static ref QUOTED: Vec<Regex> = [
        r#"("([^"]+)")"#,
        r"(“([^”]+)”)",
        r"(‘([^’]+)’)",
        r"(?:^|[^\w])('([^']+)')",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex pattern"))
    .collect();

    static ref RENAME: Regex =
        Regex::new(r"(?i)\b(?:rename|retitle)\b.*?\b(?:to|as)\s+(.+)$").expect("Invalid regex pattern");
    static ref TITLE_FIELD: Regex =
        Regex::new(r"(?i)\b(?:title|name)\s+(?:to|as)\s+(.+)$").expect("Invalid regex pattern");
    static ref CHANGE_TO: Regex =
        Regex::new(r"(?i)\bchange\b(.*?)\bto\s+(.+)$").expect("Invalid regex pattern");
    static ref NON_TITLE_FIELD: Regex =
        Regex::new(r"(?i)\b(?:date|due|deadline|details|description|notes)\b")
            .expect("Invalid regex pattern");
    static ref DETAILS: Regex =
        Regex::new(r"(?i)\b(?:details|description|notes)\s*(?::|=|\bto\b)\s*(.+)$")
            .expect("Invalid regex pattern");
    static ref FIELD_BOUNDARY: Regex = Regex::new(
        r"(?i)(?:\s*[,;]\s*|\s+and\s+|\s+)(?:(?:set\s+|change\s+)?(?:the\s+)?(?:details|description|notes|target\s+date|due|deadline)\b|rename\b|title\s+to\b)"
    )
    .expect("Invalid regex pattern");
}

/// A goal as seen by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalCandidate {
    pub id: String,
    pub title: String,
    pub status: GoalStatus,
}

impl From<&Goal> for GoalCandidate {
    fn from(goal: &Goal) -> Self {
        Self {
            id: goal.id.clone(),
            title: goal.title.clone(),
            status: goal.status,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentParseResult {
    pub proposals: Vec<ProposalDraft>,
    pub clarification: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Delete,
    Update,
}

#[derive(Debug)]
enum Outcome {
    Proposal(ProposalDraft),
    Clarification(String),
}

#[derive(Debug)]
struct Quote {
    content: String,
    outer: Range<usize>,
}

#[derive(Debug)]
enum Resolution<'a> {
    Unique(&'a GoalCandidate, Range<usize>),
    Ambiguous(Vec<&'a GoalCandidate>),
    NoMatch,
}

/// Parses `message` into at most one proposal per action type.
///
/// `recent_assistant_turns` is in chronological order; only the last few are
/// inspected for a pending disambiguation marker. Create and update proposals
/// found in the same message are both returned. When both delete and update
/// need a clarification, the delete one is returned.
pub fn parse_intent<S: AsRef<str>>(
    message: &str,
    recent_assistant_turns: &[S],
    candidates: &[GoalCandidate],
    now: DateTime<Utc>,
) -> IntentParseResult {
    let text = strip_polite_prefixes(message.trim());
    let quotes = find_quotes(text);
    let unquoted = remove_spans(text, quotes.iter().map(|q| q.outer.clone()));
    let mentions_goal = GOAL_WORD.is_match(&unquoted);
    let marker = latest_marker(recent_assistant_turns);
    let active: Vec<&GoalCandidate> = candidates
        .iter()
        .filter(|c| c.status != GoalStatus::Archived)
        .collect();

    let mut result = IntentParseResult::default();

    // Verbs inside a new goal's title do not count as further intents.
    let mut verb_text = unquoted;
    if mentions_goal && CREATE_VERB.is_match(&verb_text) {
        if let Some((draft, title_span)) = create_intent(text, now) {
            result.proposals.push(draft);
            verb_text = remove_spans(
                text,
                quotes.iter().map(|q| q.outer.clone()).chain(Some(title_span)),
            );
        }
    }

    // A goal the previous update clarification already settled on.
    let pending_update = match marker {
        Some((Marker::Update, turn)) if quotes.is_empty() => settled_target(turn, &active),
        _ => None,
    };
    let marker = marker.map(|(kind, _)| kind);

    let wants_update = (mentions_goal && UPDATE_VERB.is_match(&verb_text))
        || (marker == Some(Marker::Update) && !quotes.is_empty());
    let update_clarification = if wants_update {
        match update_intent(text, &quotes, &active, pending_update, now) {
            Outcome::Proposal(draft) => {
                result.proposals.push(draft);
                None
            }
            Outcome::Clarification(prompt) => Some(prompt),
        }
    } else {
        if result.proposals.is_empty() {
            if let Some(draft) = pending_update.and_then(|goal| update_fields(goal, text, now)) {
                result.proposals.push(draft);
            }
        }
        None
    };

    let wants_delete = (mentions_goal && DELETE_VERB.is_match(&verb_text))
        || (marker == Some(Marker::Delete) && !quotes.is_empty());
    let delete_clarification = if wants_delete {
        match delete_intent(text, &quotes, &active) {
            Outcome::Proposal(draft) => {
                result.proposals.push(draft);
                None
            }
            Outcome::Clarification(prompt) => Some(prompt),
        }
    } else {
        None
    };

    result.clarification = delete_clarification.or(update_clarification);
    result
}

fn strip_polite_prefixes(mut text: &str) -> &str {
    loop {
        let before = text.len();
        for prefix in POLITE_PREFIXES.iter() {
            if let Some(m) = prefix.find(text) {
                text = text[m.end()..].trim_start();
            }
        }
        if text.len() == before {
            return text;
        }
    }
}

/// The newest marker among the recent turns, with the turn that carries it.
fn latest_marker<S: AsRef<str>>(turns: &[S]) -> Option<(Marker, &str)> {
    turns
        .iter()
        .rev()
        .take(INTENT_ASSISTANT_TURNS)
        .find_map(|turn| {
            let turn = turn.as_ref();
            if turn.contains(DELETE_MARKER) {
                Some((Marker::Delete, turn))
            } else if turn.contains(UPDATE_MARKER) {
                Some((Marker::Update, turn))
            } else {
                None
            }
        })
}

/// The single active goal quoted in an assistant turn, if exactly one is.
fn settled_target<'a>(turn: &str, active: &[&'a GoalCandidate]) -> Option<&'a GoalCandidate> {
    let mut found: Vec<&'a GoalCandidate> = Vec::new();
    for quote in find_quotes(turn) {
        let wanted = quote.content.to_lowercase();
        for &candidate in active {
            if candidate.title.trim().to_lowercase() == wanted
                && !found.iter().any(|c| c.id == candidate.id)
            {
                found.push(candidate);
            }
        }
    }
    match found.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

fn find_quotes(text: &str) -> Vec<Quote> {
    let mut quotes: Vec<Quote> = Vec::new();
    for pattern in QUOTED.iter() {
        for caps in pattern.captures_iter(text) {
            let (Some(outer), Some(inner)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            // A closing apostrophe glued to a word is not a quote.
            if text[outer.end()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric())
            {
                continue;
            }
            let content = inner.as_str().trim();
            if content.is_empty() || quotes.iter().any(|q| overlaps(&q.outer, &outer.range())) {
                continue;
            }
            quotes.push(Quote {
                content: content.to_string(),
                outer: outer.range(),
            });
        }
    }
    quotes.sort_by_key(|q| q.outer.start);
    quotes
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

fn remove_spans(text: &str, spans: impl Iterator<Item = Range<usize>>) -> String {
    let mut spans: Vec<Range<usize>> = spans.collect();
    spans.sort_by_key(|s| s.start);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        if span.end <= cursor {
            continue;
        }
        out.push_str(&text[cursor..span.start.max(cursor)]);
        out.push(' ');
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn clean_fragment(value: &str) -> String {
    value.trim().trim_matches(EDGE_CHARS).trim().to_string()
}

fn truncate_chars(value: String, max: usize) -> String {
    if value.chars().count() <= max {
        value
    } else {
        value.chars().take(max).collect::<String>().trim_end().to_string()
    }
}

/// Takes a leading quoted string if there is one, else strips a trailing
/// relative-date clause.
fn normalize_title(raw: &str) -> String {
    let raw = raw.trim();
    if let Some(quote) = find_quotes(raw).first() {
        if quote.outer.start == 0 {
            return truncate_chars(clean_fragment(&quote.content), MAX_TITLE_CHARS);
        }
    }
    let without_date = TRAILING_RELATIVE.replace(raw, "");
    truncate_chars(clean_fragment(&without_date), MAX_TITLE_CHARS)
}

fn cut_at_next_field(value: &str) -> &str {
    match FIELD_BOUNDARY.find(value) {
        Some(m) => &value[..m.start()],
        None => value,
    }
}

fn relative_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = RELATIVE_DATE.captures(text)?;
    let amount: u32 = caps[1].parse().ok()?;
    if amount == 0 || amount > MAX_RELATIVE_AMOUNT {
        return None;
    }
    let date = match caps[2].to_lowercase().as_str() {
        "day" => add_days(now, amount as i64),
        "week" => add_days(now, amount as i64 * 7),
        _ => add_months(now, amount)?,
    };
    Some(truncate_to_seconds(date))
}

fn explicit_date(text: &str) -> Option<DateTime<Utc>> {
    let caps = EXPLICIT_DATE.captures(text)?;
    NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d")
        .ok()
        .map(start_of_day_utc)
}

/// The part of `text` a create title was read from: the leading quote when
/// the title is quoted, else the whole captured fragment.
fn consumed_title_span(text: &str, raw: Range<usize>) -> Range<usize> {
    let fragment = &text[raw.clone()];
    let offset = raw.start + (fragment.len() - fragment.trim_start().len());
    match find_quotes(fragment.trim()).first() {
        Some(quote) if quote.outer.start == 0 => {
            offset + quote.outer.start..offset + quote.outer.end
        }
        _ => raw,
    }
}

/// A create draft and the span of `text` its title came from.
fn create_intent(text: &str, now: DateTime<Utc>) -> Option<(ProposalDraft, Range<usize>)> {
    let raw = [&*TITLE_CALLED, &*TITLE_TO, &*TITLE_COLON]
        .iter()
        .find_map(|re| re.captures(text).and_then(|c| c.get(1)).map(|m| m.range()));
    let (raw_title, span) = match raw {
        Some(range) => (text[range.clone()].to_string(), consumed_title_span(text, range)),
        None => match CREATE_LEAD.find(text) {
            Some(lead) => (text[lead.end()..].to_string(), lead.end()..text.len()),
            None => (text.to_string(), 0..0),
        },
    };

    let title = normalize_title(&raw_title);
    if title.is_empty() {
        return None;
    }

    let draft = ProposedAction::CreateGoal(CreateGoalPayload {
        title,
        details: None,
        target_date: relative_date(text, now),
    })
    .into();
    Some((draft, span))
}

/// Finds the goal a message refers to: an exact quoted title first, else a
/// title contained in the message. A contained title that is part of another
/// contained title is ignored.
fn resolve_target<'a>(
    text: &str,
    quotes: &[Quote],
    active: &[&'a GoalCandidate],
) -> Resolution<'a> {
    let mut exact: Vec<(&'a GoalCandidate, Range<usize>)> = Vec::new();
    for quote in quotes {
        let wanted = quote.content.to_lowercase();
        for &candidate in active {
            if candidate.title.trim().to_lowercase() == wanted
                && !exact.iter().any(|(c, _)| c.id == candidate.id)
            {
                exact.push((candidate, quote.outer.clone()));
            }
        }
    }
    if exact.len() == 1 {
        let (candidate, span) = exact.remove(0);
        return Resolution::Unique(candidate, span);
    }
    if exact.len() > 1 {
        return Resolution::Ambiguous(exact.into_iter().map(|(c, _)| c).collect());
    }

    let mut contained: Vec<(&'a GoalCandidate, Range<usize>)> = active
        .iter()
        .filter(|c| c.title.trim().chars().count() >= MIN_CONTAINED_TITLE_CHARS)
        .filter_map(|c| title_span(text, c.title.trim()).map(|span| (*c, span)))
        .collect();

    let lowered: Vec<String> = contained
        .iter()
        .map(|(c, _)| c.title.trim().to_lowercase())
        .collect();
    let mut index = 0;
    contained.retain(|_| {
        let own = &lowered[index];
        index += 1;
        !lowered.iter().any(|other| other != own && other.contains(own.as_str()))
    });

    match contained.len() {
        0 => Resolution::NoMatch,
        1 => {
            let (candidate, span) = contained.remove(0);
            Resolution::Unique(candidate, span)
        }
        _ => Resolution::Ambiguous(contained.into_iter().map(|(c, _)| c).collect()),
    }
}

fn title_span(text: &str, title: &str) -> Option<Range<usize>> {
    let starts_word = title.chars().next().is_some_and(|c| c.is_alphanumeric());
    let ends_word = title.chars().last().is_some_and(|c| c.is_alphanumeric());
    let pattern = format!(
        "(?i){}{}{}",
        if starts_word { r"\b" } else { "" },
        regex::escape(title),
        if ends_word { r"\b" } else { "" },
    );
    Regex::new(&pattern).ok()?.find(text).map(|m| m.range())
}

fn selection_prompt(verb: &str, options: &[&GoalCandidate], marker: &str) -> String {
    if options.is_empty() {
        return format!("You don't have any goals to {} yet.", verb);
    }
    let mut lines = vec![format!(
        "Which goal should I {}? Reply with the exact title in quotes:",
        verb
    )];
    lines.extend(
        options
            .iter()
            .take(MAX_CLARIFICATION_CANDIDATES)
            .map(|c| format!("- \"{}\"", c.title)),
    );
    lines.push(marker.to_string());
    lines.join("\n")
}

fn delete_intent(text: &str, quotes: &[Quote], active: &[&GoalCandidate]) -> Outcome {
    match resolve_target(text, quotes, active) {
        Resolution::Unique(goal, _) => Outcome::Proposal(
            ProposedAction::DeleteGoal(DeleteGoalPayload {
                goal_id: goal.id.clone(),
                goal_title: goal.title.clone(),
                previous_status: Some(goal.status),
            })
            .into(),
        ),
        Resolution::Ambiguous(options) => {
            Outcome::Clarification(selection_prompt("delete", &options, DELETE_MARKER))
        }
        Resolution::NoMatch => {
            Outcome::Clarification(selection_prompt("delete", active, DELETE_MARKER))
        }
    }
}

fn extract_new_title(field_text: &str) -> Option<String> {
    let raw = RENAME
        .captures(field_text)
        .or_else(|| TITLE_FIELD.captures(field_text))
        .map(|c| c[1].to_string())
        .or_else(|| {
            CHANGE_TO.captures(field_text).and_then(|c| {
                if NON_TITLE_FIELD.is_match(&c[1]) {
                    None
                } else {
                    Some(c[2].to_string())
                }
            })
        })?;
    let title = normalize_title(cut_at_next_field(&raw));
    (!title.is_empty()).then_some(title)
}

fn extract_details(field_text: &str) -> Option<String> {
    let caps = DETAILS.captures(field_text)?;
    let details = truncate_chars(clean_fragment(cut_at_next_field(&caps[1])), MAX_DETAILS_CHARS);
    (!details.is_empty()).then_some(details)
}

/// An update draft for `goal` from the fields named in `field_text`, or
/// `None` when no field changes.
fn update_fields(goal: &GoalCandidate, field_text: &str, now: DateTime<Utc>) -> Option<ProposalDraft> {
    let payload = UpdateGoalPayload {
        goal_id: goal.id.clone(),
        goal_title: goal.title.clone(),
        title: extract_new_title(field_text),
        details: extract_details(field_text),
        target_date: explicit_date(field_text).or_else(|| relative_date(field_text, now)),
    };
    payload
        .has_changes()
        .then(|| ProposedAction::UpdateGoal(payload).into())
}

fn update_intent(
    text: &str,
    quotes: &[Quote],
    active: &[&GoalCandidate],
    pending: Option<&GoalCandidate>,
    now: DateTime<Utc>,
) -> Outcome {
    let (goal, field_text) = match pending {
        Some(goal) => (goal, text.to_string()),
        None => match resolve_target(text, quotes, active) {
            Resolution::Unique(goal, span) => (goal, remove_spans(text, std::iter::once(span))),
            Resolution::Ambiguous(options) => {
                return Outcome::Clarification(selection_prompt("update", &options, UPDATE_MARKER))
            }
            Resolution::NoMatch => {
                return Outcome::Clarification(selection_prompt("update", active, UPDATE_MARKER))
            }
        },
    };

    match update_fields(goal, &field_text, now) {
        Some(draft) => Outcome::Proposal(draft),
        None => Outcome::Clarification(format!(
            "What should I change about \"{}\"? Tell me a new title, new details or a target date.\n{}",
            goal.title, UPDATE_MARKER
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coach::proposal_model::RiskLevel;
    use chrono::{Duration, TimeZone};

    const NO_TURNS: &[&str] = &[];

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 31, 9, 30, 15).unwrap()
    }

    fn candidate(id: &str, title: &str) -> GoalCandidate {
        GoalCandidate {
            id: id.to_string(),
            title: title.to_string(),
            status: GoalStatus::Active,
        }
    }

    fn goals() -> Vec<GoalCandidate> {
        vec![
            candidate("g-spanish", "Learn Spanish"),
            candidate("g-run", "Run a marathon"),
        ]
    }

    fn only(result: &IntentParseResult) -> &ProposedAction {
        assert_eq!(result.proposals.len(), 1, "{:?}", result);
        &result.proposals[0].action
    }

    #[test]
    fn test_create_with_called_title_and_relative_date() {
        let result = parse_intent(
            "create a goal called Learn Spanish in 30 days",
            NO_TURNS,
            &[],
            now(),
        );

        match only(&result) {
            ProposedAction::CreateGoal(p) => {
                assert_eq!(p.title, "Learn Spanish");
                assert_eq!(p.target_date, Some(now() + Duration::days(30)));
                assert_eq!(p.details, None);
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert_eq!(result.proposals[0].label, "Create goal \"Learn Spanish\"");
        assert_eq!(result.proposals[0].risk_level, RiskLevel::Low);
        assert!(result.clarification.is_none());
    }

    #[test]
    fn test_create_strips_polite_framing() {
        let result = parse_intent(
            "Hi, could you please add a goal to run a 10k in 2 weeks!",
            NO_TURNS,
            &[],
            now(),
        );

        match only(&result) {
            ProposedAction::CreateGoal(p) => {
                assert_eq!(p.title, "run a 10k");
                assert_eq!(p.target_date, Some(now() + Duration::days(14)));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_create_months_use_calendar_addition() {
        let result = parse_intent("start a goal: read 12 books in 1 month", NO_TURNS, &[], now());

        match only(&result) {
            ProposedAction::CreateGoal(p) => {
                assert_eq!(p.title, "read 12 books");
                assert_eq!(
                    p.target_date,
                    Some(Utc.with_ymd_and_hms(2026, 2, 28, 9, 30, 15).unwrap())
                );
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_create_without_title_yields_nothing() {
        let result = parse_intent("please create a new goal", NO_TURNS, &[], now());
        assert!(result.proposals.is_empty());
        assert!(result.clarification.is_none());
    }

    #[test]
    fn test_plain_chat_yields_nothing() {
        let result = parse_intent("how am I doing this week?", NO_TURNS, &goals(), now());
        assert_eq!(result, IntentParseResult::default());
    }

    #[test]
    fn test_delete_by_contained_title() {
        let mut candidates = goals();
        candidates[0].status = GoalStatus::Completed;
        let result = parse_intent(
            "I want to delete my goal learn spanish",
            NO_TURNS,
            &candidates,
            now(),
        );

        match only(&result) {
            ProposedAction::DeleteGoal(p) => {
                assert_eq!(p.goal_id, "g-spanish");
                assert_eq!(p.goal_title, "Learn Spanish");
                assert_eq!(p.previous_status, Some(GoalStatus::Completed));
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert_eq!(result.proposals[0].risk_level, RiskLevel::High);
        assert_eq!(result.proposals[0].label, "Delete goal \"Learn Spanish\"");
    }

    #[test]
    fn test_delete_without_target_asks_and_follow_up_resolves() {
        let first = parse_intent("delete goal", NO_TURNS, &goals(), now());

        assert!(first.proposals.is_empty());
        let clarification = first.clarification.expect("clarification");
        assert!(clarification.contains("\"Learn Spanish\""));
        assert!(clarification.contains("\"Run a marathon\""));
        assert!(clarification.ends_with(DELETE_MARKER));

        let turns = vec![clarification];
        let second = parse_intent("\"run a marathon\"", &turns, &goals(), now());
        match only(&second) {
            ProposedAction::DeleteGoal(p) => assert_eq!(p.goal_id, "g-run"),
            other => panic!("unexpected action {:?}", other),
        }
        assert!(second.clarification.is_none());
    }

    #[test]
    fn test_marker_outside_recent_turns_is_ignored() {
        let turns = vec![
            format!("Which goal?\n{}", DELETE_MARKER),
            "Sure.".to_string(),
            "Keep going.".to_string(),
            "Nice work.".to_string(),
        ];
        let result = parse_intent("'Learn Spanish'", &turns, &goals(), now());
        assert!(result.proposals.is_empty());
    }

    #[test]
    fn test_archived_goals_are_not_targets() {
        let mut candidates = goals();
        candidates[1].status = GoalStatus::Archived;
        let result = parse_intent("remove goal Run a marathon", NO_TURNS, &candidates, now());

        assert!(result.proposals.is_empty());
        let clarification = result.clarification.unwrap();
        assert!(!clarification.contains("Run a marathon"));
        assert!(clarification.contains("Learn Spanish"));
    }

    #[test]
    fn test_longer_contained_title_shadows_shorter() {
        let candidates = vec![candidate("short", "Run"), candidate("long", "Run a marathon")];
        let result = parse_intent("delete goal run a marathon", NO_TURNS, &candidates, now());

        match only(&result) {
            ProposedAction::DeleteGoal(p) => assert_eq!(p.goal_id, "long"),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_two_contained_titles_are_ambiguous() {
        let result = parse_intent(
            "delete goal learn spanish or run a marathon",
            NO_TURNS,
            &goals(),
            now(),
        );
        assert!(result.proposals.is_empty());
        assert!(result.clarification.unwrap().contains(DELETE_MARKER));
    }

    #[test]
    fn test_clarification_lists_at_most_five_titles() {
        let candidates: Vec<GoalCandidate> = (0..8)
            .map(|i| candidate(&format!("g{}", i), &format!("Goal number {}", i)))
            .collect();
        let result = parse_intent("delete a goal", NO_TURNS, &candidates, now());
        let clarification = result.clarification.unwrap();

        assert_eq!(clarification.lines().filter(|l| l.starts_with("- ")).count(), 5);
    }

    #[test]
    fn test_update_rename_with_quotes() {
        let result = parse_intent(
            "rename goal 'Learn Spanish' to 'Learn Portuguese'",
            NO_TURNS,
            &goals(),
            now(),
        );

        match only(&result) {
            ProposedAction::UpdateGoal(p) => {
                assert_eq!(p.goal_id, "g-spanish");
                assert_eq!(p.title.as_deref(), Some("Learn Portuguese"));
                assert_eq!(p.details, None);
                assert_eq!(p.target_date, None);
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert_eq!(result.proposals[0].label, "Update goal \"Learn Spanish\"");
    }

    #[test]
    fn test_update_explicit_target_date() {
        let result = parse_intent(
            "change the target date of goal \"Run a marathon\" to 2026-06-01",
            NO_TURNS,
            &goals(),
            now(),
        );

        match only(&result) {
            ProposedAction::UpdateGoal(p) => {
                assert_eq!(p.title, None);
                assert_eq!(
                    p.target_date,
                    Some(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap())
                );
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_update_details_bounded_by_next_field() {
        let result = parse_intent(
            "update goal \"Run a marathon\": details: train 3x a week, due 2026-07-01",
            NO_TURNS,
            &goals(),
            now(),
        );

        match only(&result) {
            ProposedAction::UpdateGoal(p) => {
                assert_eq!(p.details.as_deref(), Some("train 3x a week"));
                assert_eq!(
                    p.target_date,
                    Some(Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap())
                );
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_update_without_change_asks_for_it() {
        let result = parse_intent("update goal 'Learn Spanish'", NO_TURNS, &goals(), now());

        assert!(result.proposals.is_empty());
        let clarification = result.clarification.unwrap();
        assert!(clarification.contains("\"Learn Spanish\""));
        assert!(clarification.ends_with(UPDATE_MARKER));
    }

    #[test]
    fn test_create_and_update_are_both_surfaced() {
        let result = parse_intent(
            "create a goal called \"Jog daily\" and rename goal \"Learn Spanish\" to \"Start Italian\"",
            NO_TURNS,
            &goals(),
            now(),
        );

        assert_eq!(result.proposals.len(), 2);
        match &result.proposals[0].action {
            ProposedAction::CreateGoal(p) => assert_eq!(p.title, "Jog daily"),
            other => panic!("unexpected action {:?}", other),
        }
        match &result.proposals[1].action {
            ProposedAction::UpdateGoal(p) => {
                assert_eq!(p.goal_id, "g-spanish");
                assert_eq!(p.title.as_deref(), Some("Start Italian"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_delete_clarification_wins_over_update() {
        let result = parse_intent("update or delete a goal", NO_TURNS, &goals(), now());

        assert!(result.proposals.is_empty());
        let clarification = result.clarification.unwrap();
        assert!(clarification.contains(DELETE_MARKER));
        assert!(!clarification.contains(UPDATE_MARKER));
    }

    #[test]
    fn test_verbs_inside_new_title_are_not_intents() {
        let result = parse_intent(
            "create a goal to remove clutter from my desk",
            NO_TURNS,
            &goals(),
            now(),
        );
        match only(&result) {
            ProposedAction::CreateGoal(p) => assert_eq!(p.title, "remove clutter from my desk"),
            other => panic!("unexpected action {:?}", other),
        }
        assert!(result.clarification.is_none());

        let result = parse_intent("add a goal to change careers", NO_TURNS, &goals(), now());
        match only(&result) {
            ProposedAction::CreateGoal(p) => assert_eq!(p.title, "change careers"),
            other => panic!("unexpected action {:?}", other),
        }
        assert!(result.clarification.is_none());
    }

    #[test]
    fn test_quoted_title_leaves_following_delete_intact() {
        let result = parse_intent(
            "create a goal called \"Jog daily\" and delete goal \"Run a marathon\"",
            NO_TURNS,
            &goals(),
            now(),
        );

        assert_eq!(result.proposals.len(), 2);
        match &result.proposals[1].action {
            ProposedAction::DeleteGoal(p) => assert_eq!(p.goal_id, "g-run"),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_update_follow_up_uses_settled_goal() {
        let first = parse_intent("update goal", NO_TURNS, &goals(), now());
        let list = first.clarification.expect("goal list");
        assert!(list.ends_with(UPDATE_MARKER));

        let mut turns = vec![list];
        let second = parse_intent("'Learn Spanish'", &turns, &goals(), now());
        assert!(second.proposals.is_empty());
        let question = second.clarification.expect("field question");
        assert!(question.starts_with("What should I change about \"Learn Spanish\""));

        turns.push(question);
        let third = parse_intent("rename it to Learn Italian", &turns, &goals(), now());
        match only(&third) {
            ProposedAction::UpdateGoal(p) => {
                assert_eq!(p.goal_id, "g-spanish");
                assert_eq!(p.title.as_deref(), Some("Learn Italian"));
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert!(third.clarification.is_none());
    }

    #[test]
    fn test_settled_goal_ignores_plain_chat() {
        let turns = vec![format!(
            "What should I change about \"Learn Spanish\"?\n{}",
            UPDATE_MARKER
        )];
        let result = parse_intent("how am I doing this week?", &turns, &goals(), now());
        assert_eq!(result, IntentParseResult::default());
    }
}

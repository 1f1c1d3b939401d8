//! Phrase-to-date resolution.
//!
//! Turns a question such as "what was it like last Monday?" into a single
//! calendar date. All functions take an explicit `today` anchor (no clock
//! access), so every rule is deterministic and testable.
//!
//! # Strategies
//!
//! Resolution tries three strategies in a fixed order and the first match
//! wins (see [`Strategy::ORDER`]):
//!
//! 1. [`Strategy::PastRelative`]: `"yesterday"`, `"last <weekday>"`, and a
//!    phrase containing the word `"was"` together with a weekday name
//! 2. [`Strategy::FutureRelative`]: `"today"`, `"tomorrow"`,
//!    `"next <weekday>"`, and a bare `"<weekday>"`
//! 3. [`Strategy::ExplicitFormat`]: an American `M/D/YYYY` date, else an
//!    ISO `YYYY-MM-DD` date
//!
//! Matching works on whole words, so `"mondays"` is not `"monday"`, and it
//! ignores case and surrounding punctuation.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

// ── Phrase ──────────────────────────────────────────────────────────────────

/// Lowercase and trim raw user input.
pub fn normalize_phrase(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A normalized question, tokenized once for all strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    text: String,
    /// Alphanumeric runs, used for keyword and weekday matching.
    words: Vec<String>,
    /// Alphanumeric runs that may also contain `/` and `-`, used for dates.
    date_tokens: Vec<String>,
}

impl Phrase {
    pub fn new(raw: &str) -> Self {
        let text = normalize_phrase(raw);
        let words = split_tokens(&text, |c| c.is_alphanumeric());
        let date_tokens = split_tokens(&text, |c| c.is_alphanumeric() || c == '/' || c == '-');
        Self {
            text,
            words,
            date_tokens,
        }
    }

    /// The normalized text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.date_tokens.is_empty()
    }

    fn has_word(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    /// The first weekday name anywhere in the phrase.
    fn first_weekday(&self) -> Option<Weekday> {
        self.words.iter().find_map(|w| parse_weekday(w))
    }

    /// The first weekday immediately preceded by a modifier mapped to `rule`.
    fn modified_weekday(&self, rule: WeekdayRule) -> Option<Weekday> {
        self.words.windows(2).find_map(|pair| {
            if modifier_rule(&pair[0]) == Some(rule) {
                parse_weekday(&pair[1])
            } else {
                None
            }
        })
    }
}

fn split_tokens(text: &str, keep: impl Fn(char) -> bool) -> Vec<String> {
    text.split(|c: char| !keep(c))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Weekday rules ───────────────────────────────────────────────────────────

/// Weekday names the resolver understands. Full names only; abbreviations
/// like "sun" or "sat" collide with ordinary words in weather questions.
const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// Words that pick a specific occurrence of the weekday that follows them.
const WEEKDAY_MODIFIERS: [(&str, WeekdayRule); 2] = [
    ("last", WeekdayRule::Previous),
    ("next", WeekdayRule::FollowingWeek),
];

fn parse_weekday(word: &str) -> Option<Weekday> {
    WEEKDAYS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, day)| *day)
}

fn modifier_rule(word: &str) -> Option<WeekdayRule> {
    WEEKDAY_MODIFIERS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, rule)| *rule)
}

/// Which occurrence of a named weekday a phrase refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekdayRule {
    /// Most recent occurrence strictly before today (1 to 7 days back).
    Previous,
    /// Nearest occurrence strictly after today (1 to 7 days ahead).
    Upcoming,
    /// One week after the nearest occurrence on or after today
    /// (7 to 13 days ahead).
    FollowingWeek,
}

impl WeekdayRule {
    /// Apply the rule to `weekday` relative to `today`.
    ///
    /// `None` when the result falls outside the representable date range.
    pub fn apply(self, weekday: Weekday, today: NaiveDate) -> Option<NaiveDate> {
        let current = today.weekday().num_days_from_monday() as i64;
        let target = weekday.num_days_from_monday() as i64;
        let days_ahead = (target - current).rem_euclid(7);

        match self {
            WeekdayRule::Previous => {
                let days_back = (current - target).rem_euclid(7);
                let days_back = if days_back == 0 { 7 } else { days_back };
                today.checked_sub_signed(Duration::days(days_back))
            }
            WeekdayRule::Upcoming => {
                let days_ahead = if days_ahead == 0 { 7 } else { days_ahead };
                today.checked_add_signed(Duration::days(days_ahead))
            }
            WeekdayRule::FollowingWeek => today.checked_add_signed(Duration::days(days_ahead + 7)),
        }
    }
}

// ── Strategies ──────────────────────────────────────────────────────────────

/// One way of reading a date out of a phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    PastRelative,
    FutureRelative,
    ExplicitFormat,
}

impl Strategy {
    /// Precedence: an ambiguous phrase goes to the earliest strategy.
    pub const ORDER: [Strategy; 3] = [
        Strategy::PastRelative,
        Strategy::FutureRelative,
        Strategy::ExplicitFormat,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::PastRelative => "past-relative",
            Strategy::FutureRelative => "future-relative",
            Strategy::ExplicitFormat => "explicit-format",
        }
    }

    /// Run this strategy alone.
    pub fn try_resolve(self, phrase: &Phrase, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Strategy::PastRelative => try_past_relative(phrase, today),
            Strategy::FutureRelative => try_future_relative(phrase, today),
            Strategy::ExplicitFormat => try_explicit_format(phrase),
        }
    }
}

/// "yesterday", "last <weekday>", "was ... <weekday>".
fn try_past_relative(phrase: &Phrase, today: NaiveDate) -> Option<NaiveDate> {
    if phrase.has_word("yesterday") {
        return today.pred_opt();
    }
    if let Some(weekday) = phrase.modified_weekday(WeekdayRule::Previous) {
        return WeekdayRule::Previous.apply(weekday, today);
    }
    if phrase.has_word("was") {
        let weekday = phrase.first_weekday()?;
        return WeekdayRule::Previous.apply(weekday, today);
    }
    None
}

/// "today", "tomorrow", "next <weekday>", bare "<weekday>".
fn try_future_relative(phrase: &Phrase, today: NaiveDate) -> Option<NaiveDate> {
    if phrase.has_word("today") {
        return Some(today);
    }
    if phrase.has_word("tomorrow") {
        return today.succ_opt();
    }
    if let Some(weekday) = phrase.modified_weekday(WeekdayRule::FollowingWeek) {
        return WeekdayRule::FollowingWeek.apply(weekday, today);
    }
    let weekday = phrase.first_weekday()?;
    WeekdayRule::Upcoming.apply(weekday, today)
}

/// The first `M/D/YYYY` token, else the first `YYYY-MM-DD` token.
///
/// Only the first candidate of each shape is tried. A candidate that is not a
/// real calendar date (month 13, February 30) counts as absent.
fn try_explicit_format(phrase: &Phrase) -> Option<NaiveDate> {
    let american = phrase
        .date_tokens
        .iter()
        .find_map(|t| split_date_token(t, '/', [1..=2, 1..=2, 4..=4]))
        .and_then(|[month, day, year]| NaiveDate::from_ymd_opt(year as i32, month, day));
    if american.is_some() {
        return american;
    }

    phrase
        .date_tokens
        .iter()
        .find_map(|t| split_date_token(t, '-', [4..=4, 2..=2, 2..=2]))
        .and_then(|[year, month, day]| NaiveDate::from_ymd_opt(year as i32, month, day))
}

/// Split `token` into three all-digit fields with the given digit counts.
fn split_date_token(
    token: &str,
    separator: char,
    widths: [std::ops::RangeInclusive<usize>; 3],
) -> Option<[u32; 3]> {
    let parts: Vec<&str> = token.split(separator).collect();
    if parts.len() != 3 {
        return None;
    }

    let mut fields = [0u32; 3];
    for (i, (part, width)) in parts.iter().zip(widths.iter()).enumerate() {
        if !width.contains(&part.len()) || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        fields[i] = part.parse().ok()?;
    }
    Some(fields)
}

// ── resolve ─────────────────────────────────────────────────────────────────

/// A date read out of a phrase, with the strategy that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub strategy: Strategy,
}

impl ResolvedDate {
    /// Strictly after `today`. Today itself is served from history.
    pub fn is_future(&self, today: NaiveDate) -> bool {
        self.date > today
    }
}

/// Resolve a tokenized phrase against `today`.
///
/// Returns `None` when no strategy matches; the caller answers with the
/// accepted phrase forms.
pub fn resolve(phrase: &Phrase, today: NaiveDate) -> Option<ResolvedDate> {
    Strategy::ORDER.iter().find_map(|&strategy| {
        strategy
            .try_resolve(phrase, today)
            .map(|date| ResolvedDate { date, strategy })
    })
}

/// Normalize, tokenize, and resolve raw input.
pub fn resolve_phrase(raw: &str, today: NaiveDate) -> Option<ResolvedDate> {
    let phrase = Phrase::new(raw);
    let resolved = resolve(&phrase, today);
    match &resolved {
        Some(r) => tracing::debug!(
            phrase = phrase.as_str(),
            date = %r.date,
            strategy = r.strategy.name(),
            "resolved phrase"
        ),
        None => tracing::debug!(phrase = phrase.as_str(), "phrase did not resolve"),
    }
    resolved
}

// ── Tests ───────────────────────────────────────────────────────────────────

//! Recovery of a structured itinerary from free-form model output.
//!
//! The model is not a trusted source of structured data. [`recover`] extracts a JSON
//! candidate, normalizes it, then runs an ordered list of parse attempts, each more
//! invasive than the last. It never fails: when nothing parses, the deterministic
//! [`fallback`] itinerary is returned.

mod extract;
mod repair;

use std::sync::LazyLock;

use chrono::{Days, NaiveDate, Utc};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm::preview;
use crate::models::{DaySchedule, EventType, RecoveredItinerary, ScheduleEvent, TripRequirement};

pub use extract::extract_json;

/// Placeholder total used when the itinerary had to be reconstructed by hand.
const RECONSTRUCTED_TOTAL_COST: f64 = 50_000.0;

static DAYS_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)"days"\s*:\s*\[(.*?)\]"#).expect("Invalid days array regex")
});

#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome {
    /// The model's answer parsed into an itinerary.
    Parsed(RecoveredItinerary),
    /// The answer was unparseable but looked like an itinerary; content is a placeholder.
    Degraded(RecoveredItinerary),
    /// Nothing usable came back; one placeholder event per trip day.
    Fallback(RecoveredItinerary),
}

impl RecoveryOutcome {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, RecoveryOutcome::Parsed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecoveryOutcome::Parsed(_) => "parsed",
            RecoveryOutcome::Degraded(_) => "degraded",
            RecoveryOutcome::Fallback(_) => "fallback",
        }
    }

    #[cfg(test)]
    pub fn itinerary(&self) -> &RecoveredItinerary {
        match self {
            Self::Parsed(i) | Self::Degraded(i) | Self::Fallback(i) => i,
        }
    }

    pub fn into_itinerary(self) -> RecoveredItinerary {
        match self {
            Self::Parsed(i) | Self::Degraded(i) | Self::Fallback(i) => i,
        }
    }
}

#[derive(Debug, Error)]
enum RecoveryError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no \"days\" array to reconstruct from")]
    NoDaysArray,
}

type Attempt = fn(&str) -> Result<RecoveryOutcome, RecoveryError>;

const ATTEMPTS: &[(&str, Attempt)] = &[
    ("direct", parse_direct),
    ("renormalized", parse_renormalized),
    ("aggressive", parse_aggressive),
    ("manual", reconstruct),
];

/// Turns raw model text into an itinerary. Total: the worst case is [`fallback`].
pub fn recover(raw: &str, requirement: &TripRequirement) -> RecoveryOutcome {
    debug!(response = %preview(raw, 1000), "Recovering itinerary from model response");

    let Some(candidate) = extract_json(raw) else {
        warn!(
            response = %preview(raw, 200),
            "No JSON object in model response, using fallback itinerary"
        );
        return RecoveryOutcome::Fallback(fallback(requirement));
    };

    let normalized = repair::apply(repair::NORMALIZE, candidate);
    debug!(candidate = %preview(&normalized, 500), "Normalized JSON candidate");

    for &(name, attempt) in ATTEMPTS {
        match attempt(&normalized) {
            Ok(outcome) => {
                info!(attempt = name, outcome = outcome.label(), "Recovered itinerary");
                return outcome;
            }
            Err(e) => debug!(attempt = name, error = %e, "Parse attempt failed"),
        }
    }

    warn!("All parse attempts failed, using fallback itinerary");
    RecoveryOutcome::Fallback(fallback(requirement))
}

fn parse(text: &str) -> Result<RecoveredItinerary, RecoveryError> {
    let itinerary: RecoveredItinerary = serde_json::from_str(text)?;
    Ok(itinerary.sanitize())
}

fn parse_direct(text: &str) -> Result<RecoveryOutcome, RecoveryError> {
    parse(text).map(RecoveryOutcome::Parsed)
}

fn parse_renormalized(text: &str) -> Result<RecoveryOutcome, RecoveryError> {
    parse(&repair::apply(repair::NORMALIZE, text)).map(RecoveryOutcome::Parsed)
}

fn parse_aggressive(text: &str) -> Result<RecoveryOutcome, RecoveryError> {
    parse(&repair::apply(repair::AGGRESSIVE, text)).map(RecoveryOutcome::Parsed)
}

/// The content of the days array is not trusted; only its presence is.
fn reconstruct(text: &str) -> Result<RecoveryOutcome, RecoveryError> {
    if !DAYS_ARRAY.is_match(text) {
        return Err(RecoveryError::NoDaysArray);
    }
    Ok(RecoveryOutcome::Degraded(reconstructed(Utc::now().date_naive())))
}

fn reconstructed(today: NaiveDate) -> RecoveredItinerary {
    RecoveredItinerary {
        days: vec![DaySchedule {
            date: today.to_string(),
            day_number: 1,
            title: Some("Day 1".to_string()),
            events: vec![ScheduleEvent {
                time: "09:00".to_string(),
                title: "Start sightseeing".to_string(),
                description: "An error occurred while generating the AI plan".to_string(),
                kind: EventType::Activity,
                ..Default::default()
            }],
        }],
        recommended_restaurants: Vec::new(),
        total_estimated_cost: Some(RECONSTRUCTED_TOTAL_COST),
    }
}

/// One placeholder event per trip day, dated sequentially from the first trip date.
pub fn fallback(requirement: &TripRequirement) -> RecoveredItinerary {
    let first = requirement.start_date.min(requirement.end_date);
    let days = (0..requirement.total_days())
        .map(|offset| {
            let date = first.checked_add_days(Days::new(u64::from(offset))).unwrap_or(first);
            DaySchedule {
                date: date.to_string(),
                day_number: offset + 1,
                title: Some(format!("Day {}", offset + 1)),
                events: vec![ScheduleEvent {
                    time: "09:00".to_string(),
                    title: "Plan generation error".to_string(),
                    description: "An error occurred while generating the plan with AI. Please edit manually."
                        .to_string(),
                    kind: EventType::Activity,
                    ..Default::default()
                }],
            }
        })
        .collect();

    RecoveredItinerary {
        days,
        recommended_restaurants: Vec::new(),
        total_estimated_cost: None,
    }
}

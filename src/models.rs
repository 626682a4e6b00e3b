use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnError, DisplayFromStr, PickFirst};
use thiserror::Error;

// --- Closed enumerations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetTier {
    Low,
    Medium,
    High,
    Luxury,
    #[default]
    #[serde(other)]
    Unset,
}

impl BudgetTier {
    pub fn description(self) -> &'static str {
        match self {
            BudgetTier::Low => "up to ~30k JPY",
            BudgetTier::Medium => "30k–50k JPY",
            BudgetTier::High => "50k–100k JPY",
            BudgetTier::Luxury => "100k+ JPY",
            BudgetTier::Unset => "Budget not set",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccommodationType {
    Undecided,
    Decided,
    DayTrip,
    #[default]
    #[serde(other)]
    Unset,
}

impl AccommodationType {
    pub fn description(self) -> &'static str {
        match self {
            AccommodationType::Undecided => "Undecided (AI suggestion)",
            AccommodationType::Decided => "Already booked",
            AccommodationType::DayTrip => "Day trip (no overnight stay)",
            AccommodationType::Unset => "Not set",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPriority {
    Fast,
    Cheap,
    Comfort,
    Balanced,
    #[default]
    #[serde(other)]
    Unset,
}

impl TransportPriority {
    pub fn description(self) -> &'static str {
        match self {
            TransportPriority::Fast => "fastest travel time",
            TransportPriority::Cheap => "lowest cost",
            TransportPriority::Comfort => "comfort",
            TransportPriority::Balanced => "balance of time, cost and comfort",
            TransportPriority::Unset => "no preference",
        }
    }
}

/// Category tag of a schedule event. Unknown tags from the model collapse to `Activity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum EventType {
    Transport,
    Accommodation,
    Sightseeing,
    Dining,
    #[default]
    Activity,
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "transport" => EventType::Transport,
            "accommodation" => EventType::Accommodation,
            "sightseeing" => EventType::Sightseeing,
            "dining" => EventType::Dining,
            _ => EventType::Activity,
        }
    }
}

/// Inclusive number of calendar days between two dates, in either order.
pub fn count_days(start: NaiveDate, end: NaiveDate) -> u32 {
    let span = (end - start).num_days().unsigned_abs();
    u32::try_from(span).unwrap_or(u32::MAX - 1) + 1
}

// --- Trip requirement ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccommodationDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub check_in: String,
    #[serde(default)]
    pub check_out: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportDetails {
    #[serde(default)]
    pub outbound: String,
    #[serde(default, rename = "return")]
    pub return_trip: String,
    #[serde(default)]
    pub local_transport: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transportation {
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub priority: TransportPriority,
    #[serde(default)]
    pub is_decided: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<TransportDetails>,
}

/// Trip requirements as they arrive from the form. Everything is optional here so that
/// missing fields are reported by [`TripRequirement::try_from`] instead of the JSON decoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPlanInput {
    pub title: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub participants: Option<u32>,
    pub budget: Option<BudgetTier>,
    pub purpose: Option<String>,
    pub accommodation_type: Option<AccommodationType>,
    pub accommodation_details: Option<AccommodationDetails>,
    pub transportation: Option<Transportation>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Invalid {field}: {value:?} is not a YYYY-MM-DD date")]
    InvalidDate { field: &'static str, value: String },
    #[error("participants must be at least 1")]
    NoParticipants,
    #[error("Trip spans {days} days; at most {max} are supported")]
    TripTooLong { days: u32, max: u32 },
}

/// Longest trip a single generation will plan.
pub const MAX_TRIP_DAYS: u32 = 366;

/// Validated trip requirements, immutable for the duration of one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRequirement {
    pub title: String,
    pub origin: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub participants: u32,
    pub budget: BudgetTier,
    pub purpose: String,
    pub accommodation_type: AccommodationType,
    pub accommodation_details: Option<AccommodationDetails>,
    pub transportation: Transportation,
}

impl TripRequirement {
    pub fn total_days(&self) -> u32 {
        count_days(self.start_date, self.end_date)
    }
}

fn required(value: Option<String>, field: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => {
            missing.push(field);
            String::new()
        }
    }
}

fn parse_date(value: &str, field: &'static str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

impl TryFrom<TripPlanInput> for TripRequirement {
    type Error = ValidationError;

    fn try_from(input: TripPlanInput) -> Result<Self, Self::Error> {
        let mut missing = Vec::new();
        let title = required(input.title, "title", &mut missing);
        let origin = required(input.origin, "origin", &mut missing);
        let destination = required(input.destination, "destination", &mut missing);
        let start = required(input.start_date, "startDate", &mut missing);
        let end = required(input.end_date, "endDate", &mut missing);
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let participants = input.participants.unwrap_or(1);
        if participants == 0 {
            return Err(ValidationError::NoParticipants);
        }

        let start_date = parse_date(&start, "startDate")?;
        let end_date = parse_date(&end, "endDate")?;
        let days = count_days(start_date, end_date);
        if days > MAX_TRIP_DAYS {
            return Err(ValidationError::TripTooLong { days, max: MAX_TRIP_DAYS });
        }

        Ok(Self {
            title,
            origin,
            destination,
            start_date,
            end_date,
            participants,
            budget: input.budget.unwrap_or_default(),
            purpose: input.purpose.unwrap_or_default(),
            accommodation_type: input.accommodation_type.unwrap_or_default(),
            accommodation_details: input.accommodation_details,
            transportation: input.transportation.unwrap_or_default(),
        })
    }
}

// --- Candidates and recommendations ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price_range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccommodationInfo {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub check_in: String,
    #[serde(default)]
    pub check_out: String,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub price_range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
}

// --- Itinerary ---

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEvent {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde_as(as = "DefaultOnError")]
    #[serde(rename = "type", default)]
    pub kind: EventType,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Numbers and numeric strings are accepted; anything else decodes as absent.
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_required: Option<bool>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    #[serde(default)]
    pub date: String,
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    pub day_number: u32,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub events: Vec<ScheduleEvent>,
}

/// Structured itinerary recovered from the model's answer.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveredItinerary {
    #[serde(default)]
    pub days: Vec<DaySchedule>,
    #[serde(default)]
    pub recommended_restaurants: Vec<RestaurantInfo>,
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_estimated_cost: Option<f64>,
}

fn non_negative(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

impl RecoveredItinerary {
    /// Drops negative or non-finite amounts and fills missing day numbers from position.
    pub fn sanitize(mut self) -> Self {
        for (index, day) in self.days.iter_mut().enumerate() {
            if day.day_number == 0 {
                day.day_number = index as u32 + 1;
            }
            for event in &mut day.events {
                event.cost = non_negative(event.cost);
            }
        }
        self.total_estimated_cost = non_negative(self.total_estimated_cost);
        self
    }
}

// --- Persisted plan ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPlan {
    pub id: String,
    pub title: String,
    pub destination: String,
    pub dates: DateRange,
    pub participants: u32,
    pub budget: String,
    pub total_days: u32,
    pub days: Vec<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accommodation: Option<AccommodationInfo>,
    #[serde(default)]
    pub recommended_restaurants: Vec<RestaurantInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_estimated_cost: Option<f64>,
    /// True when the itinerary is placeholder content rather than a parsed model answer.
    #[serde(default)]
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a stored plan. `id` and `createdAt` cannot be patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPlanPatch {
    pub title: Option<String>,
    pub destination: Option<String>,
    pub dates: Option<DateRange>,
    pub participants: Option<u32>,
    pub budget: Option<String>,
    pub days: Option<Vec<DaySchedule>>,
    pub accommodation: Option<AccommodationInfo>,
    pub recommended_restaurants: Option<Vec<RestaurantInfo>>,
    pub total_estimated_cost: Option<f64>,
    pub degraded: Option<bool>,
}

impl TripPlanPatch {
    /// Replacing `days` counts as a manual repair and clears `degraded`
    /// unless the patch sets the flag itself.
    pub fn apply(self, plan: &mut TripPlan, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            plan.title = title;
        }
        if let Some(destination) = self.destination {
            plan.destination = destination;
        }
        if let Some(dates) = self.dates {
            plan.total_days = count_days(dates.start, dates.end);
            plan.dates = dates;
        }
        if let Some(participants) = self.participants {
            plan.participants = participants;
        }
        if let Some(budget) = self.budget {
            plan.budget = budget;
        }
        if let Some(days) = self.days {
            plan.days = days;
            plan.degraded = false;
        }
        if let Some(accommodation) = self.accommodation {
            plan.accommodation = Some(accommodation);
        }
        if let Some(restaurants) = self.recommended_restaurants {
            plan.recommended_restaurants = restaurants;
        }
        if let Some(total) = self.total_estimated_cost {
            plan.total_estimated_cost = non_negative(Some(total));
        }
        if let Some(degraded) = self.degraded {
            plan.degraded = degraded;
        }
        plan.updated_at = now;
    }
}

/// Response envelope shared by every API route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None, message: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()), message: None }
    }
}

use chrono::Utc;
use uuid::Uuid;

use crate::models::{DateRange, RecoveredItinerary, TripPlan, TripRequirement};

/// Merges a recovered itinerary with the requirement fields shown alongside it.
/// Accepts any itinerary shape, placeholder ones included.
pub fn assemble(requirement: &TripRequirement, itinerary: RecoveredItinerary) -> TripPlan {
    let now = Utc::now();
    TripPlan {
        id: Uuid::new_v4().to_string(),
        title: requirement.title.clone(),
        destination: requirement.destination.clone(),
        dates: DateRange {
            start: requirement.start_date,
            end: requirement.end_date,
        },
        participants: requirement.participants,
        budget: requirement.budget.description().to_string(),
        total_days: requirement.total_days(),
        days: itinerary.days,
        accommodation: None,
        recommended_restaurants: itinerary.recommended_restaurants,
        total_estimated_cost: itinerary.total_estimated_cost,
        degraded: false,
        created_at: now,
        updated_at: now,
    }
}

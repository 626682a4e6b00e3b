use crate::models::{
    AccommodationInfo, BudgetTier, RestaurantInfo, TransportPriority, TripRequirement,
};

const OUTPUT_FORMAT: &str = r#"
IMPORTANT: Output ONLY one complete, valid JSON object in exactly the following shape. Do not include explanations, comments or any text outside the JSON object.

{
  "days": [
    {
      "date": "YYYY-MM-DD",
      "dayNumber": 1,
      "title": "Day 1",
      "events": [
        {
          "time": "09:00",
          "title": "Event name",
          "description": "Details",
          "type": "sightseeing",
          "location": "Place",
          "cost": 1000,
          "reservationRequired": false
        }
      ]
    }
  ],
  "recommendedRestaurants": [
    {
      "name": "Restaurant name",
      "genre": "Genre",
      "description": "Description",
      "priceRange": "Price range"
    }
  ],
  "totalEstimatedCost": 50000
}

Rules:
- "type" is one of: sightseeing, dining, activity, transport, accommodation
- Always wrap strings in double quotes
- Numbers are plain numbers (no quotes)
- Booleans are true/false (not strings)
- No trailing commas
- Create a natural, realistic itinerary with practical time allocation
- Output the JSON object only, with no other text
"#;

/// Builds the itinerary generation prompt. Deterministic for a given input.
pub fn build_prompt(
    requirement: &TripRequirement,
    restaurants: &[RestaurantInfo],
    accommodations: &[AccommodationInfo],
) -> String {
    let days = requirement.total_days();
    let mut prompt = format!(
        "Create a {days}-day travel plan under the following conditions.\n\n\
         [Basic information]\n\
         - Title: {}\n\
         - Origin: {}\n\
         - Destination: {}\n\
         - Departure date: {}\n\
         - Return date: {}\n\
         - Participants: {}\n\
         - Budget: {}\n\
         - Purpose of the trip: {}\n\n\
         [Accommodation]\n\
         - Accommodation type: {}\n",
        requirement.title,
        requirement.origin,
        requirement.destination,
        requirement.start_date,
        requirement.end_date,
        requirement.participants,
        requirement.budget.description(),
        requirement.purpose,
        requirement.accommodation_type.description(),
    );

    if let Some(details) = &requirement.accommodation_details {
        prompt.push_str(&format!(
            "- Accommodation: {}\n- Address: {}\n",
            details.name, details.address
        ));
        if !details.check_in.is_empty() || !details.check_out.is_empty() {
            prompt.push_str(&format!(
                "- Check-in / check-out: {} / {}\n",
                details.check_in, details.check_out
            ));
        }
    }

    let transport = &requirement.transportation;
    prompt.push_str(&format!(
        "\n[Transportation]\n- Preferred transportation: {}\n- Priority: {}\n",
        transport.preferences.join(", "),
        transport.priority.description(),
    ));
    if let Some(details) = transport.details.as_ref().filter(|_| transport.is_decided) {
        prompt.push_str(&format!(
            "- Outbound (booked): {}\n- Return (booked): {}\n- Local transport: {}\n",
            details.outbound, details.return_trip, details.local_transport,
        ));
    }

    if !restaurants.is_empty() {
        prompt.push_str("\n[Recommended local restaurants]\n");
        for r in restaurants {
            prompt.push_str(&format!(
                "- {}: {} ({}/{})\n",
                r.name, r.description, r.genre, r.price_range
            ));
        }
    }

    if !accommodations.is_empty() {
        prompt.push_str("\n[Accommodation candidates]\n");
        for a in accommodations {
            prompt.push_str(&format!("- {}: {} ({})\n", a.name, a.address, a.price_range));
        }
    }

    prompt.push_str(OUTPUT_FORMAT);
    prompt
}

/// Prompt asking for up to three ways to get from `origin` to `destination`.
pub fn build_transport_prompt(
    origin: &str,
    destination: &str,
    preferences: &[String],
    priority: TransportPriority,
    budget: BudgetTier,
) -> String {
    format!(
        "Suggest ways to travel from {origin} to {destination}.\n\n\
         Preferred transportation: {}\n\
         Priority: {}\n\
         Budget level: {}\n\n\
         Suggest up to three of the best options for these conditions and describe each one's \
         travel time, cost and comfort. Put each option on its own line.",
        preferences.join(", "),
        priority.description(),
        budget.description(),
    )
}

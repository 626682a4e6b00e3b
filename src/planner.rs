use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::assembler::assemble;
use crate::llm::{GenerationError, TextGenerator};
use crate::models::{
    AccommodationInfo, AccommodationType, BudgetTier, TransportPriority, TripPlan, TripRequirement,
    ValidationError,
};
use crate::prompt::{build_prompt, build_transport_prompt};
use crate::recovery::{fallback, recover, RecoveryOutcome};
use crate::search::{AccommodationSearch, RestaurantSearch, SearchError, StayQuery};

/// Body of a transportation suggestion request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportRequest {
    pub origin: Option<String>,
    pub destination: Option<String>,
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub priority: TransportPriority,
    #[serde(default)]
    pub budget: BudgetTier,
}

/// Runs one generation: enrichment lookups, a bounded model call, recovery and assembly.
pub struct TripPlanner {
    generator: Arc<dyn TextGenerator>,
    restaurants: Arc<dyn RestaurantSearch>,
    accommodations: Arc<dyn AccommodationSearch>,
    timeout: Duration,
}

impl TripPlanner {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        restaurants: Arc<dyn RestaurantSearch>,
        accommodations: Arc<dyn AccommodationSearch>,
        timeout: Duration,
    ) -> Self {
        Self { generator, restaurants, accommodations, timeout }
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Always yields a plan; model failures degrade to the placeholder itinerary.
    pub async fn generate(&self, requirement: &TripRequirement) -> TripPlan {
        info!(
            "🧳 Planning '{}' to {} ({} days) with {}",
            requirement.title,
            requirement.destination,
            requirement.total_days(),
            self.generator.model_name()
        );

        let stay = StayQuery {
            destination: &requirement.destination,
            check_in: requirement.start_date,
            check_out: requirement.end_date,
            participants: requirement.participants,
            budget: requirement.budget,
        };
        let wants_stay = requirement.accommodation_type == AccommodationType::Undecided;

        let (restaurants, accommodations) = tokio::join!(
            self.bounded(
                self.restaurants
                    .recommended(&requirement.destination, requirement.budget)
            ),
            self.bounded(async {
                if wants_stay {
                    self.accommodations.recommended(&stay).await
                } else {
                    Ok(Vec::new())
                }
            })
        );
        let restaurants = restaurants.unwrap_or_else(|e| {
            warn!("⚠️ Restaurant search failed, continuing without candidates: {}", e);
            Vec::new()
        });
        let accommodations = accommodations.unwrap_or_else(|e| {
            warn!("⚠️ Accommodation search failed, continuing without candidates: {}", e);
            Vec::new()
        });

        let prompt = build_prompt(requirement, &restaurants, &accommodations);
        let outcome = match self.call_model(&prompt).await {
            Ok(text) => recover(&text, requirement),
            Err(e) => {
                warn!("⚠️ Generation failed, using fallback itinerary: {}", e);
                RecoveryOutcome::Fallback(fallback(requirement))
            }
        };

        let degraded = outcome.is_degraded();
        let mut plan = assemble(requirement, outcome.into_itinerary());
        plan.degraded = degraded;
        plan.accommodation = accommodation_snapshot(requirement, accommodations);
        info!("✅ Plan {} assembled ({} days, degraded: {})", plan.id, plan.days.len(), degraded);
        plan
    }

    /// Up to a handful of route suggestions, one per non-empty line of the answer.
    pub async fn suggest_transportation(
        &self,
        request: TransportRequest,
    ) -> Result<Vec<String>, SuggestionError> {
        let ends = (non_blank(request.origin), non_blank(request.destination));
        let (origin, destination) = match ends {
            (Some(o), Some(d)) => (o, d),
            (o, d) => {
                let mut missing = Vec::new();
                if o.is_none() {
                    missing.push("origin");
                }
                if d.is_none() {
                    missing.push("destination");
                }
                return Err(ValidationError::MissingFields(missing).into());
            }
        };

        let prompt = build_transport_prompt(
            &origin,
            &destination,
            &request.preferences,
            request.priority,
            request.budget,
        );
        let text = self.call_model(&prompt).await?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Search lookups share the generation deadline so a hung provider cannot stall the plan.
    async fn bounded<T>(
        &self,
        lookup: impl Future<Output = Result<Vec<T>, SearchError>>,
    ) -> Result<Vec<T>, SearchError> {
        tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| SearchError::Timeout(self.timeout))?
    }

    async fn call_model(&self, prompt: &str) -> Result<String, GenerationError> {
        tokio::time::timeout(self.timeout, self.generator.generate(prompt))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))?
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SuggestionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// The accommodation shown with the plan: the top candidate when undecided,
/// the traveller's own booking when decided, nothing for day trips.
fn accommodation_snapshot(
    requirement: &TripRequirement,
    candidates: Vec<AccommodationInfo>,
) -> Option<AccommodationInfo> {
    match requirement.accommodation_type {
        AccommodationType::Undecided => candidates.into_iter().next(),
        AccommodationType::Decided => {
            requirement.accommodation_details.as_ref().map(|details| AccommodationInfo {
                name: details.name.clone(),
                address: details.address.clone(),
                check_in: details.check_in.clone(),
                check_out: details.check_out.clone(),
                amenities: Vec::new(),
                price_range: "Reserved".to_string(),
                rating: None,
                booking_url: None,
                contact_info: None,
            })
        }
        AccommodationType::DayTrip | AccommodationType::Unset => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeGenerator;
    use crate::models::{RestaurantInfo, TripPlanInput};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct FixedRestaurants(Vec<RestaurantInfo>);

    #[async_trait]
    impl RestaurantSearch for FixedRestaurants {
        async fn recommended(&self, _: &str, _: BudgetTier) -> Result<Vec<RestaurantInfo>, SearchError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenRestaurants;

    #[async_trait]
    impl RestaurantSearch for BrokenRestaurants {
        async fn recommended(&self, _: &str, _: BudgetTier) -> Result<Vec<RestaurantInfo>, SearchError> {
            Err(SearchError::Api { status: 500, body: "down".into() })
        }
    }

    struct StalledRestaurants;

    #[async_trait]
    impl RestaurantSearch for StalledRestaurants {
        async fn recommended(&self, _: &str, _: BudgetTier) -> Result<Vec<RestaurantInfo>, SearchError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    struct FixedStays(Vec<AccommodationInfo>);

    #[async_trait]
    impl AccommodationSearch for FixedStays {
        async fn recommended(&self, _: &StayQuery<'_>) -> Result<Vec<AccommodationInfo>, SearchError> {
            Ok(self.0.clone())
        }
    }

    fn restaurant(name: &str) -> RestaurantInfo {
        RestaurantInfo {
            name: name.into(),
            genre: "Kaiseki".into(),
            description: "Seasonal courses".into(),
            price_range: "10000円".into(),
            ..Default::default()
        }
    }

    fn stay(name: &str) -> AccommodationInfo {
        AccommodationInfo {
            name: name.into(),
            address: "Higashiyama".into(),
            check_in: "15:00".into(),
            check_out: "10:00".into(),
            price_range: "15,000-20,000 JPY".into(),
            ..Default::default()
        }
    }

    fn requirement(accommodation: &str) -> TripRequirement {
        let input: TripPlanInput = serde_json::from_value(json!({
            "title": "Autumn leaves in Kyoto",
            "origin": "Tokyo",
            "destination": "Kyoto",
            "startDate": "2024-11-15",
            "endDate": "2024-11-16",
            "participants": 2,
            "budget": "medium",
            "accommodationType": accommodation,
            "accommodationDetails": { "name": "Kyoto Inn", "address": "Gion" }
        }))
        .unwrap();
        TripRequirement::try_from(input).unwrap()
    }

    fn planner(generator: Arc<FakeGenerator>, restaurants: Arc<dyn RestaurantSearch>) -> TripPlanner {
        TripPlanner::new(
            generator,
            restaurants,
            Arc::new(FixedStays(vec![stay("Ryokan Sakura"), stay("Hotel Kamo")])),
            Duration::from_secs(5),
        )
    }

    const ITINERARY: &str = r#"Here is your plan:
```json
{"days":[{"date":"2024-11-15","dayNumber":1,"events":[{"time":"10:00","title":"Kiyomizu-dera","description":"Temple visit","type":"sightseeing","cost":"400"}]}],"totalEstimatedCost":42000}
```"#;

    #[tokio::test]
    async fn builds_plan_from_model_answer() {
        let generator = Arc::new(FakeGenerator::replying(ITINERARY));
        let planner = planner(generator.clone(), Arc::new(FixedRestaurants(vec![restaurant("Hyotei")])));

        let plan = planner.generate(&requirement("undecided")).await;

        assert!(!plan.degraded);
        assert_eq!(plan.days.len(), 1);
        assert_eq!(plan.days[0].events[0].cost, Some(400.0));
        assert_eq!(plan.total_estimated_cost, Some(42000.0));
        assert_eq!(plan.accommodation.map(|a| a.name), Some("Ryokan Sakura".to_string()));

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("- Hyotei: Seasonal courses"));
        assert!(prompts[0].contains("- Ryokan Sakura: Higashiyama"));
    }

    #[tokio::test]
    async fn model_failure_yields_fallback_plan() {
        let planner = planner(Arc::new(FakeGenerator::failing()), Arc::new(BrokenRestaurants));

        let plan = planner.generate(&requirement("daytrip")).await;

        assert!(plan.degraded);
        assert_eq!(plan.days.len(), 2);
        assert_eq!(plan.days[1].date, "2024-11-16");
        assert_eq!(plan.days[0].events[0].title, "Plan generation error");
        assert!(plan.accommodation.is_none());
    }

    #[tokio::test]
    async fn stalled_model_times_out() {
        let planner = TripPlanner::new(
            Arc::new(FakeGenerator::stalling(Duration::from_secs(60))),
            Arc::new(FixedRestaurants(Vec::new())),
            Arc::new(FixedStays(Vec::new())),
            Duration::from_millis(50),
        );

        let plan = planner.generate(&requirement("undecided")).await;
        assert!(plan.degraded);
        assert_eq!(plan.days.len(), 2);
    }

    #[tokio::test]
    async fn hung_search_does_not_block_generation() {
        let planner = TripPlanner::new(
            Arc::new(FakeGenerator::replying(ITINERARY)),
            Arc::new(StalledRestaurants),
            Arc::new(FixedStays(vec![stay("Ryokan Sakura")])),
            Duration::from_millis(50),
        );

        let plan = tokio::time::timeout(Duration::from_secs(2), planner.generate(&requirement("undecided")))
            .await
            .expect("generation should finish once the lookup deadline passes");
        assert!(!plan.degraded);
        assert_eq!(plan.days.len(), 1);
        assert_eq!(plan.accommodation.map(|a| a.name), Some("Ryokan Sakura".to_string()));
    }

    #[tokio::test]
    async fn decided_stay_is_reported_as_reserved() {
        let planner = planner(Arc::new(FakeGenerator::replying(ITINERARY)), Arc::new(FixedRestaurants(Vec::new())));

        let plan = planner.generate(&requirement("decided")).await;
        let accommodation = plan.accommodation.unwrap();
        assert_eq!(accommodation.name, "Kyoto Inn");
        assert_eq!(accommodation.price_range, "Reserved");
    }

    #[tokio::test]
    async fn transport_suggestions_are_answer_lines() {
        let generator = Arc::new(FakeGenerator::replying("1. Shinkansen\n\n2. Highway bus\n"));
        let planner = planner(generator.clone(), Arc::new(FixedRestaurants(Vec::new())));

        let request = TransportRequest {
            origin: Some("Tokyo".into()),
            destination: Some("Kyoto".into()),
            preferences: vec!["train".into()],
            priority: TransportPriority::Fast,
            ..Default::default()
        };
        let lines = planner.suggest_transportation(request).await.unwrap();

        assert_eq!(lines, vec!["1. Shinkansen", "2. Highway bus"]);
        assert!(generator.prompts()[0].starts_with("Suggest ways to travel from Tokyo to Kyoto."));
    }

    #[tokio::test]
    async fn transport_suggestions_need_both_ends() {
        let planner = planner(Arc::new(FakeGenerator::replying("")), Arc::new(FixedRestaurants(Vec::new())));

        let request = TransportRequest { origin: Some("  ".into()), ..Default::default() };
        match planner.suggest_transportation(request).await {
            Err(SuggestionError::Validation(ValidationError::MissingFields(fields))) => {
                assert_eq!(fields, vec!["origin", "destination"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_model_failure_is_reported() {
        let planner = planner(Arc::new(FakeGenerator::failing()), Arc::new(FixedRestaurants(Vec::new())));
        let request = TransportRequest {
            origin: Some("Tokyo".into()),
            destination: Some("Kyoto".into()),
            ..Default::default()
        };
        assert!(matches!(
            planner.suggest_transportation(request).await,
            Err(SuggestionError::Generation(GenerationError::Api { status: 503, .. }))
        ));
    }
}

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use super::{lookup, AccommodationSearch, SearchError, StayQuery};
use crate::models::{AccommodationInfo, BudgetTier};

const BASE_URL: &str = "https://app.rakuten.co.jp/services/api/Travel/SimpleHotelSearch/20170426";
const MIN_RATING: f64 = 3.5;
const MAX_RESULTS: usize = 5;

/// (latitude, longitude) in WGS84 degrees.
const DEFAULT_COORDINATES: (f64, f64) = (35.6762, 139.6503);
const COORDINATES: &[(&str, (f64, f64))] = &[
    ("東京", (35.6762, 139.6503)), ("Tokyo", (35.6762, 139.6503)),
    ("横浜", (35.4437, 139.6380)), ("Yokohama", (35.4437, 139.6380)),
    ("大阪", (34.6937, 135.5023)), ("Osaka", (34.6937, 135.5023)),
    ("京都", (35.0116, 135.7681)), ("Kyoto", (35.0116, 135.7681)),
    ("神戸", (34.6901, 135.1956)), ("Kobe", (34.6901, 135.1956)),
    ("奈良", (34.6851, 135.8048)), ("Nara", (34.6851, 135.8048)),
    ("名古屋", (35.1815, 136.9066)), ("Nagoya", (35.1815, 136.9066)),
    ("札幌", (43.0618, 141.3545)), ("Sapporo", (43.0618, 141.3545)),
    ("仙台", (38.2682, 140.8694)), ("Sendai", (38.2682, 140.8694)),
    ("広島", (34.3853, 132.4553)), ("Hiroshima", (34.3853, 132.4553)),
    ("福岡", (33.5904, 130.4017)), ("Fukuoka", (33.5904, 130.4017)),
    ("那覇", (26.2124, 127.6792)), ("沖縄", (26.2124, 127.6792)),
    ("Naha", (26.2124, 127.6792)), ("Okinawa", (26.2124, 127.6792)),
];

/// Per-night charge bounds in JPY.
fn charge_bounds(budget: BudgetTier) -> (Option<u32>, Option<u32>) {
    match budget {
        BudgetTier::Low => (None, Some(8_000)),
        BudgetTier::Medium | BudgetTier::Unset => (Some(8_000), Some(15_000)),
        BudgetTier::High => (Some(15_000), Some(30_000)),
        BudgetTier::Luxury => (Some(30_000), None),
    }
}

fn price_range(min_charge: Option<f64>) -> String {
    match min_charge {
        None => "Price unknown",
        Some(c) if c < 5_000.0 => "Under 5,000 JPY",
        Some(c) if c < 10_000.0 => "5,000-10,000 JPY",
        Some(c) if c < 15_000.0 => "10,000-15,000 JPY",
        Some(c) if c < 20_000.0 => "15,000-20,000 JPY",
        Some(_) => "20,000 JPY and up",
    }
    .to_string()
}

const AMENITY_KEYWORDS: &[(&str, &str)] = &[
    ("温泉", "Hot spring"),
    ("大浴場", "Large bath"),
    ("露天", "Open-air bath"),
    ("朝食", "Breakfast"),
    ("駐車場", "Parking"),
    ("wi-fi", "Wi-Fi"),
    ("wifi", "Wi-Fi"),
    ("駅", "Near station"),
];

fn amenities(special: &str) -> Vec<String> {
    let lowered = special.to_lowercase();
    let mut found: Vec<String> = Vec::new();
    for (keyword, label) in AMENITY_KEYWORDS {
        if lowered.contains(keyword) && !found.iter().any(|f| f == label) {
            found.push(label.to_string());
        }
    }
    found
}

/// Rakuten Travel hotel search.
pub struct RakutenClient {
    client: Client,
    application_id: Option<String>,
    base_url: String,
}

impl RakutenClient {
    pub fn new(application_id: Option<String>) -> Self {
        if application_id.is_none() {
            warn!("RAKUTEN_APPLICATION_ID is not set; accommodation candidates are disabled");
        }
        Self { client: Client::new(), application_id, base_url: BASE_URL.to_string() }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl AccommodationSearch for RakutenClient {
    async fn recommended(
        &self,
        query: &StayQuery<'_>,
    ) -> Result<Vec<AccommodationInfo>, SearchError> {
        let Some(application_id) = self.application_id.as_deref() else {
            return Ok(Vec::new());
        };
        let (latitude, longitude) = lookup(COORDINATES, query.destination)
            .copied()
            .unwrap_or(DEFAULT_COORDINATES);

        let mut params = vec![
            ("applicationId", application_id.to_string()),
            ("format", "json".to_string()),
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("datumType", "1".to_string()),
            ("checkinDate", query.check_in.format("%Y%m%d").to_string()),
            ("checkoutDate", query.check_out.format("%Y%m%d").to_string()),
            ("adultNum", query.participants.max(1).to_string()),
            ("sort", "+roomCharge".to_string()),
            ("hits", "20".to_string()),
        ];
        let (min_charge, max_charge) = charge_bounds(query.budget);
        if let Some(min) = min_charge {
            params.push(("minCharge", min.to_string()));
        }
        if let Some(max) = max_charge {
            params.push(("maxCharge", max.to_string()));
        }

        let response = self.client.get(&self.base_url).query(&params).send().await?;
        let status = response.status();
        // Rakuten answers 404 when nothing matches.
        if status == StatusCode::NOT_FOUND {
            info!("🏨 No hotels found near {}", query.destination);
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api { status: status.as_u16(), body });
        }

        let body: RakutenResponse = response.json().await?;
        let mut hotels: Vec<HotelBasicInfo> = body
            .hotels
            .into_iter()
            .filter_map(|entry| entry.hotel.into_iter().find_map(|part| part.hotel_basic_info))
            .filter(|hotel| hotel.review_average.is_some_and(|r| r >= MIN_RATING))
            .collect();
        hotels.sort_by(|a, b| {
            b.review_average
                .partial_cmp(&a.review_average)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hotels.truncate(MAX_RESULTS);

        info!("🏨 Found {} accommodation candidates near {}", hotels.len(), query.destination);
        Ok(hotels.into_iter().map(HotelBasicInfo::into_accommodation).collect())
    }
}

#[derive(Debug, Deserialize)]
struct RakutenResponse {
    #[serde(default)]
    hotels: Vec<HotelEntry>,
}

#[derive(Debug, Deserialize)]
struct HotelEntry {
    #[serde(default)]
    hotel: Vec<HotelPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HotelPart {
    #[serde(default)]
    hotel_basic_info: Option<HotelBasicInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HotelBasicInfo {
    hotel_name: String,
    #[serde(default)]
    address1: String,
    #[serde(default)]
    address2: String,
    #[serde(default)]
    hotel_min_charge: Option<f64>,
    #[serde(default)]
    review_average: Option<f64>,
    #[serde(default)]
    hotel_special: String,
    #[serde(default)]
    hotel_information_url: Option<String>,
    #[serde(default)]
    telephone_no: Option<String>,
    #[serde(default)]
    checkin_time: Option<String>,
    #[serde(default)]
    checkout_time: Option<String>,
}

impl HotelBasicInfo {
    fn into_accommodation(self) -> AccommodationInfo {
        AccommodationInfo {
            name: self.hotel_name,
            address: format!("{}{}", self.address1, self.address2),
            check_in: self
                .checkin_time
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "15:00".into()),
            check_out: self
                .checkout_time
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "10:00".into()),
            amenities: amenities(&self.hotel_special),
            price_range: price_range(self.hotel_min_charge),
            rating: self.review_average.map(|r| (r * 10.0).round() / 10.0),
            booking_url: self.hotel_information_url,
            contact_info: self.telephone_no,
        }
    }
}

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::{lookup, RestaurantSearch, SearchError};
use crate::models::{BudgetTier, RestaurantInfo};

const BASE_URL: &str = "https://webservice.recruit.co.jp/hotpepper/gourmet/v1/";
const PER_GENRE: usize = 3;
const MAX_RESULTS: usize = 15;

/// Izakaya, Japanese, Western, Italian/French, ramen.
const GENRES: &[&str] = &["G001", "G004", "G005", "G006", "G013"];

const DEFAULT_AREA: &str = "Z011";
const AREA_CODES: &[(&str, &str)] = &[
    ("東京", "Z011"), ("Tokyo", "Z011"),
    ("神奈川", "Z012"), ("Kanagawa", "Z012"), ("横浜", "Z012"), ("Yokohama", "Z012"),
    ("千葉", "Z013"), ("Chiba", "Z013"),
    ("埼玉", "Z014"), ("Saitama", "Z014"),
    ("大阪", "Z021"), ("Osaka", "Z021"),
    ("兵庫", "Z022"), ("Hyogo", "Z022"), ("神戸", "Z022"), ("Kobe", "Z022"),
    ("京都", "Z023"), ("Kyoto", "Z023"),
    ("奈良", "Z024"), ("Nara", "Z024"),
    ("愛知", "Z031"), ("Aichi", "Z031"), ("名古屋", "Z031"), ("Nagoya", "Z031"),
    ("岐阜", "Z032"), ("Gifu", "Z032"),
    ("三重", "Z033"), ("Mie", "Z033"),
    ("静岡", "Z034"), ("Shizuoka", "Z034"),
    ("北海道", "Z041"), ("Hokkaido", "Z041"), ("札幌", "Z041"), ("Sapporo", "Z041"),
    ("宮城", "Z051"), ("Miyagi", "Z051"), ("仙台", "Z051"), ("Sendai", "Z051"),
    ("広島", "Z081"), ("Hiroshima", "Z081"),
    ("福岡", "Z092"), ("Fukuoka", "Z092"),
];

fn area_code(destination: &str) -> &'static str {
    lookup(AREA_CODES, destination).copied().unwrap_or(DEFAULT_AREA)
}

fn budget_code(budget: BudgetTier) -> &'static str {
    match budget {
        BudgetTier::Low => "B009",
        BudgetTier::Medium | BudgetTier::Unset => "B010",
        BudgetTier::High => "B011",
        BudgetTier::Luxury => "B012",
    }
}

/// HotPepper gourmet search.
pub struct HotPepperClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl HotPepperClient {
    pub fn new(api_key: Option<String>) -> Self {
        if api_key.is_none() {
            warn!("HOTPEPPER_API_KEY is not set; restaurant candidates are disabled");
        }
        Self { client: Client::new(), api_key, base_url: BASE_URL.to_string() }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn search_area(
        &self,
        api_key: &str,
        area: &str,
        genre: &str,
        budget: BudgetTier,
    ) -> Result<Vec<RestaurantInfo>, SearchError> {
        let count = PER_GENRE.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", api_key),
                ("large_area", area),
                ("genre", genre),
                ("budget", budget_code(budget)),
                ("count", count.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api { status: status.as_u16(), body });
        }

        let body: HotPepperResponse = response.json().await?;
        Ok(body.results.shop.into_iter().map(Shop::into_restaurant).collect())
    }
}

#[async_trait]
impl RestaurantSearch for HotPepperClient {
    async fn recommended(
        &self,
        destination: &str,
        budget: BudgetTier,
    ) -> Result<Vec<RestaurantInfo>, SearchError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };
        let area = area_code(destination);

        let mut seen = HashSet::new();
        let mut restaurants = Vec::new();
        let mut last_error = None;
        let mut succeeded = false;

        for genre in GENRES {
            match self.search_area(api_key, area, genre, budget).await {
                Ok(found) => {
                    succeeded = true;
                    restaurants.extend(found.into_iter().filter(|r| seen.insert(r.name.clone())));
                }
                Err(e) => {
                    warn!(genre, error = %e, "HotPepper search failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !succeeded => Err(e),
            _ => {
                restaurants.truncate(MAX_RESULTS);
                info!(area, count = restaurants.len(), "Found restaurant candidates");
                Ok(restaurants)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct HotPepperResponse {
    results: Results,
}

#[derive(Debug, Deserialize)]
struct Results {
    #[serde(default)]
    shop: Vec<Shop>,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ShopBudget {
    #[serde(default)]
    average: String,
}

#[derive(Debug, Deserialize)]
struct Urls {
    #[serde(default)]
    pc: String,
}

#[derive(Debug, Deserialize)]
struct Shop {
    name: String,
    #[serde(default)]
    genre: Option<Named>,
    #[serde(default)]
    address: String,
    #[serde(default, rename = "catch")]
    catch_copy: String,
    #[serde(default)]
    open: String,
    #[serde(default)]
    budget: Option<ShopBudget>,
    #[serde(default)]
    urls: Option<Urls>,
}

fn or_default(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

impl Shop {
    fn into_restaurant(self) -> RestaurantInfo {
        RestaurantInfo {
            name: self.name,
            genre: or_default(self.genre.map(|g| g.name).unwrap_or_default(), "Unknown"),
            description: or_default(self.catch_copy, "No details"),
            price_range: or_default(
                self.budget.map(|b| b.average).unwrap_or_default(),
                "Price unknown",
            ),
            address: Some(self.address).filter(|a| !a.is_empty()),
            rating: None,
            open_hours: Some(self.open).filter(|o| !o.is_empty()),
            reservation_url: self.urls.map(|u| u.pc).filter(|u| !u.is_empty()),
            contact_info: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn shops(names: &[&str]) -> String {
        let shop: Vec<_> = names
            .iter()
            .map(|name| json!({
                "name": name,
                "genre": { "name": "Izakaya" },
                "address": "Kyoto",
                "catch": "Local sake",
                "budget": { "average": "3000円" },
                "urls": { "pc": "https://example.test" }
            }))
            .collect();
        json!({ "results": { "shop": shop } }).to_string()
    }

    #[test]
    fn maps_destination_and_budget_codes() {
        assert_eq!(area_code("京都府"), "Z023");
        assert_eq!(area_code("Fukuoka"), "Z092");
        assert_eq!(area_code("Naha"), DEFAULT_AREA);
        assert_eq!(budget_code(BudgetTier::Luxury), "B012");
    }

    #[tokio::test]
    async fn without_key_returns_nothing() {
        let client = HotPepperClient::new(None);
        assert!(client.recommended("Kyoto", BudgetTier::Low).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dedupes_across_genres() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Any)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("large_area".into(), "Z023".into()),
                Matcher::UrlEncoded("budget".into(), "B010".into()),
            ]))
            .with_status(200)
            .with_body(shops(&["Izuju", "Okutan", "Izuju"]))
            .expect(GENRES.len())
            .create_async()
            .await;

        let client = HotPepperClient::new(Some("key".into())).with_base_url(server.url());
        let found = client.recommended("Kyoto", BudgetTier::Medium).await.unwrap();

        let names: Vec<_> = found.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Izuju", "Okutan"]);
        assert_eq!(found[0].price_range, "3000円");
        assert_eq!(found[0].description, "Local sake");
    }

    #[tokio::test]
    async fn fails_when_every_genre_fails() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", Matcher::Any).with_status(500).create_async().await;

        let client = HotPepperClient::new(Some("key".into())).with_base_url(server.url());
        assert!(matches!(
            client.recommended("Kyoto", BudgetTier::Low).await,
            Err(SearchError::Api { status: 500, .. })
        ));
    }

    #[test]
    fn fills_missing_shop_fields() {
        let shop: Shop = serde_json::from_value(json!({ "name": "Nameless" })).unwrap();
        let restaurant = shop.into_restaurant();
        assert_eq!(restaurant.genre, "Unknown");
        assert_eq!(restaurant.description, "No details");
        assert_eq!(restaurant.price_range, "Price unknown");
        assert_eq!(restaurant.address, None);
    }
}

//! External restaurant and accommodation search. An empty list is a valid answer.

mod hotpepper;
mod rakuten;

pub use hotpepper::HotPepperClient;
pub use rakuten::RakutenClient;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{AccommodationInfo, BudgetTier, RestaurantInfo};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Lookup timed out after {0:?}")]
    Timeout(std::time::Duration),
}

#[async_trait]
pub trait RestaurantSearch: Send + Sync {
    async fn recommended(
        &self,
        destination: &str,
        budget: BudgetTier,
    ) -> Result<Vec<RestaurantInfo>, SearchError>;
}

#[derive(Debug, Clone)]
pub struct StayQuery<'a> {
    pub destination: &'a str,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub participants: u32,
    pub budget: BudgetTier,
}

#[async_trait]
pub trait AccommodationSearch: Send + Sync {
    async fn recommended(
        &self,
        query: &StayQuery<'_>,
    ) -> Result<Vec<AccommodationInfo>, SearchError>;
}

/// First table entry whose key occurs in `destination`.
fn lookup<'t, T>(table: &'t [(&str, T)], destination: &str) -> Option<&'t T> {
    let lowered = destination.to_lowercase();
    table
        .iter()
        .find(|(key, _)| lowered.contains(&key.to_lowercase()))
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_matches_substrings_case_insensitively() {
        let table = [("Kyoto", 1), ("京都", 1), ("Osaka", 2)];
        assert_eq!(lookup(&table, "kyoto city"), Some(&1));
        assert_eq!(lookup(&table, "京都府"), Some(&1));
        assert_eq!(lookup(&table, "Sapporo"), None);
    }
}

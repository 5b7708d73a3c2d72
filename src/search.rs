// Flight search orchestration against the offer provider
// The provider client itself is an external collaborator behind `OfferProvider`. Multi-city
// searches query it once per segment, strictly one after another with a fixed pause between
// queries to stay under the provider's rate limit.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::itinerary::{Itinerary, TripType};
use crate::mapper::{map_multi_city_segments, map_offers};
use crate::provider::RawOfferResponse;
use crate::results::ResultView;
use crate::trip::{OfferQuery, TripRequest, TripRequestError};

// Upstream failure as reported to the user: a short title plus a human-readable detail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{title}: {detail}")]
pub struct ProviderError {
    pub status: Option<u16>,
    pub title: String,
    pub detail: String,
}

impl ProviderError {
    pub fn new(status: Option<u16>, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            detail: detail.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid search request: {0}")]
    InvalidRequest(#[from] TripRequestError),

    #[error("Provider query for segment {segment} failed: {source}")]
    Provider {
        segment: usize,
        #[source]
        source: ProviderError,
    },
}

impl SearchError {
    // Title/detail pair for the failure banner
    pub fn display_parts(&self) -> (String, String) {
        match self {
            SearchError::InvalidRequest(e) => ("Invalid search".to_string(), e.to_string()),
            SearchError::Provider { source, .. } => (source.title.clone(), source.detail.clone()),
        }
    }
}

#[async_trait]
pub trait OfferProvider: Send + Sync {
    async fn search_offers(&self, query: &OfferQuery) -> Result<RawOfferResponse, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    // Minimum spacing between consecutive multi-city queries
    pub inter_query_delay: Duration,
    pub max_offers: u32,
    pub max_offers_multi_city: u32,
    pub currency_code: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            inter_query_delay: Duration::from_millis(250),
            max_offers: 30,
            max_offers_multi_city: 20,
            currency_code: "USD".to_string(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SearchStats {
    pub searches: usize,
    pub queries_sent: usize,
    pub queries_failed: usize,
}

// Mapped itineraries for one search, one list per trip segment in request order
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub trip_type: TripType,
    pub segments: Vec<Vec<Itinerary>>,
}

impl SearchResults {
    pub fn offer_count(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    pub fn into_view(self) -> ResultView {
        ResultView::new(self.segments)
    }
}

pub struct FlightSearch<P: OfferProvider> {
    provider: P,
    config: SearchConfig,
    stats: Mutex<SearchStats>,
}

impl<P: OfferProvider> FlightSearch<P> {
    pub fn new(provider: P, config: SearchConfig) -> Self {
        Self {
            provider,
            config,
            stats: Mutex::new(SearchStats::default()),
        }
    }

    pub fn stats(&self) -> SearchStats {
        self.stats.lock().clone()
    }

    pub async fn search(&self, request: &TripRequest) -> Result<SearchResults, SearchError> {
        let queries = request.provider_queries(
            &self.config.currency_code,
            self.config.max_offers,
            self.config.max_offers_multi_city,
        )?;
        self.stats.lock().searches += 1;

        let mut responses = Vec::with_capacity(queries.len());
        for (segment, query) in queries.iter().enumerate() {
            if segment > 0 {
                tokio::time::sleep(self.config.inter_query_delay).await;
            }
            responses.push(self.query(segment, query).await?);
        }

        let segments = match request.trip_type {
            TripType::MultiCity => map_multi_city_segments(&responses),
            trip_type => responses
                .iter()
                .map(|response| map_offers(response, trip_type, &response.carriers()))
                .collect(),
        };

        let results = SearchResults {
            trip_type: request.trip_type,
            segments,
        };
        info!(
            trip_type = ?results.trip_type,
            segments = results.segments.len(),
            offers = results.offer_count(),
            "flight search completed"
        );
        Ok(results)
    }

    async fn query(&self, segment: usize, query: &OfferQuery) -> Result<RawOfferResponse, SearchError> {
        info!(
            segment,
            origin = %query.origin,
            destination = %query.destination,
            date = %query.departure_date,
            "querying offer provider"
        );
        self.stats.lock().queries_sent += 1;

        self.provider.search_offers(query).await.map_err(|source| {
            warn!(segment, error = %source, "offer provider query failed");
            self.stats.lock().queries_failed += 1;
            SearchError::Provider { segment, source }
        })
    }
}

// Trip requests: what the user searched for, validated, and turned into provider queries
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::itinerary::{Itinerary, TripType};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TripRequestError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Multi-city trips need at least 2 segments, got {0}")]
    TooFewSegments(usize),

    #[error("Return date {returning} is before departure date {departing}")]
    ReturnBeforeDeparture {
        departing: NaiveDate,
        returning: NaiveDate,
    },

    #[error("At least one adult is required")]
    NoPassengers,
}

pub const MIN_MULTI_CITY_SEGMENTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
// Accepts both "economy" and the upper-case "ECONOMY" form sent by booking forms
pub enum CabinClass {
    #[serde(alias = "ANY", alias = "Any")]
    Any,
    #[default]
    #[serde(alias = "ECONOMY", alias = "Economy")]
    Economy,
    #[serde(alias = "PREMIUM", alias = "Premium", alias = "PREMIUM_ECONOMY")]
    Premium,
    #[serde(alias = "BUSINESS", alias = "Business")]
    Business,
    #[serde(alias = "FIRST", alias = "First")]
    First,
}

impl CabinClass {
    // Provider travel-class enumeration; `Any` leaves the query unrestricted
    pub fn travel_class(self) -> Option<&'static str> {
        match self {
            CabinClass::Any => None,
            CabinClass::Economy => Some("ECONOMY"),
            CabinClass::Premium => Some("PREMIUM_ECONOMY"),
            CabinClass::Business => Some("BUSINESS"),
            CabinClass::First => Some("FIRST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TripSegment {
    pub from: String,
    pub to: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRequest {
    pub trip_type: TripType,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    #[serde(default)]
    pub segments: Vec<TripSegment>,
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default)]
    pub cabin_class: CabinClass,
}

fn default_adults() -> u32 {
    1
}

// One upstream flight-offer query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferQuery {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub adults: u32,
    pub travel_class: Option<&'static str>,
    pub currency_code: Option<String>,
    pub max_offers: u32,
}

fn non_blank(value: &Option<String>, field: &'static str) -> Result<String, TripRequestError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(TripRequestError::MissingField(field))
}

impl TripRequest {
    pub fn one_way(origin: &str, destination: &str, departure_date: NaiveDate) -> Self {
        Self {
            trip_type: TripType::OneWay,
            origin: Some(origin.to_string()),
            destination: Some(destination.to_string()),
            departure_date: Some(departure_date),
            return_date: None,
            segments: Vec::new(),
            adults: 1,
            cabin_class: CabinClass::default(),
        }
    }

    pub fn round_trip(
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
        return_date: NaiveDate,
    ) -> Self {
        Self {
            trip_type: TripType::Return,
            return_date: Some(return_date),
            ..Self::one_way(origin, destination, departure_date)
        }
    }

    pub fn multi_city(segments: Vec<TripSegment>) -> Self {
        Self {
            trip_type: TripType::MultiCity,
            origin: None,
            destination: None,
            departure_date: None,
            return_date: None,
            segments,
            adults: 1,
            cabin_class: CabinClass::default(),
        }
    }

    pub fn validate(&self) -> Result<(), TripRequestError> {
        if self.adults == 0 {
            return Err(TripRequestError::NoPassengers);
        }

        if self.trip_type == TripType::MultiCity {
            if self.segments.len() < MIN_MULTI_CITY_SEGMENTS {
                return Err(TripRequestError::TooFewSegments(self.segments.len()));
            }
            for segment in &self.segments {
                if segment.from.trim().is_empty() {
                    return Err(TripRequestError::MissingField("segments.from"));
                }
                if segment.to.trim().is_empty() {
                    return Err(TripRequestError::MissingField("segments.to"));
                }
            }
            return Ok(());
        }

        non_blank(&self.origin, "origin")?;
        non_blank(&self.destination, "destination")?;
        let departing = self
            .departure_date
            .ok_or(TripRequestError::MissingField("departureDate"))?;

        if self.trip_type == TripType::Return {
            let returning = self
                .return_date
                .ok_or(TripRequestError::MissingField("returnDate"))?;
            if returning < departing {
                return Err(TripRequestError::ReturnBeforeDeparture {
                    departing,
                    returning,
                });
            }
        }

        Ok(())
    }

    // Number of result sets the search produces
    pub fn segment_count(&self) -> usize {
        match self.trip_type {
            TripType::MultiCity => self.segments.len(),
            _ => 1,
        }
    }

    // Upstream queries in request order: one per multi-city segment, otherwise exactly one.
    // Multi-city segment queries are not narrowed by travel class.
    pub fn provider_queries(
        &self,
        currency_code: &str,
        max_offers: u32,
        max_offers_multi_city: u32,
    ) -> Result<Vec<OfferQuery>, TripRequestError> {
        self.validate()?;

        if self.trip_type == TripType::MultiCity {
            return Ok(self
                .segments
                .iter()
                .map(|segment| OfferQuery {
                    origin: segment.from.trim().to_string(),
                    destination: segment.to.trim().to_string(),
                    departure_date: segment.date,
                    return_date: None,
                    adults: self.adults,
                    travel_class: None,
                    currency_code: Some(currency_code.to_string()),
                    max_offers: max_offers_multi_city,
                })
                .collect());
        }

        Ok(vec![OfferQuery {
            origin: non_blank(&self.origin, "origin")?,
            destination: non_blank(&self.destination, "destination")?,
            departure_date: self
                .departure_date
                .ok_or(TripRequestError::MissingField("departureDate"))?,
            return_date: match self.trip_type {
                TripType::Return => self.return_date,
                _ => None,
            },
            adults: self.adults,
            travel_class: self.cabin_class.travel_class(),
            currency_code: Some(currency_code.to_string()),
            max_offers,
        }])
    }
}

#[derive(Debug, Clone)]
pub struct DeepLinkConfig {
    pub base_url: String,
}

impl Default for DeepLinkConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.kayak.com/flights".to_string(),
        }
    }
}

// External search link for the "select flight" action. The route comes from the request,
// the airline and stop hints from the itinerary's primary leg.
pub fn deep_link(config: &DeepLinkConfig, request: &TripRequest, itinerary: &Itinerary) -> String {
    let origin = request.origin.as_deref().unwrap_or_default();
    let destination = request.destination.as_deref().unwrap_or_default();
    let date = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();

    let path = match request.trip_type {
        TripType::MultiCity if !request.segments.is_empty() => request
            .segments
            .iter()
            .map(|s| format!("/{}-{}/{}", s.from, s.to, s.date.format("%Y-%m-%d")))
            .collect::<String>(),
        TripType::Return if request.return_date.is_some() => format!(
            "/{}-{}/{}/{}",
            origin,
            destination,
            date(request.departure_date),
            date(request.return_date)
        ),
        _ => format!("/{}-{}/{}", origin, destination, date(request.departure_date)),
    };

    let mut query = vec![format!("adults={}", request.adults.max(1))];
    if let Some(leg) = itinerary.primary_leg() {
        let code = &leg.first_segment().carrier.code;
        if !code.is_empty() {
            query.push(format!("airline={}", code));
        }
        query.push(format!("stops={}", leg.stop_count()));
    }

    format!(
        "{}{}?{}",
        config.base_url.trim_end_matches('/'),
        path,
        query.join("&")
    )
}

// Offer mapping: raw provider offers -> canonical itineraries
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::duration::parse_duration;
use crate::itinerary::{
    parse_utc, BookingOption, Carrier, Endpoint, Itinerary, Leg, Legs, Price, Segment, TripType,
};
use crate::provider::{RawEndpoint, RawItinerary, RawOffer, RawOfferResponse, RawSegment};

// Error types for raw response processing
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// Placeholder shown when a segment carries neither a carrier code nor a dictionary entry
const UNKNOWN_CARRIER: &str = "Airline";

// Parse provider JSON text. Only syntactically broken JSON is an error; missing fields are not.
pub fn parse_offer_response(json: &str) -> Result<RawOfferResponse, ProcessingError> {
    serde_json::from_str(json).map_err(|e| ProcessingError::JsonParseError(e.to_string()))
}

pub fn load_offer_response(path: impl AsRef<std::path::Path>) -> Result<RawOfferResponse, ProcessingError> {
    let content = std::fs::read_to_string(path)?;
    parse_offer_response(&content)
}

// Map one raw itinerary into a leg. No segments means the leg is unavailable.
pub fn normalize_itinerary(
    itinerary: Option<&RawItinerary>,
    carriers: &HashMap<String, String>,
) -> Option<Leg> {
    let itinerary = itinerary?;
    let segments = itinerary
        .segments
        .as_deref()?
        .iter()
        .map(|segment| normalize_segment(segment, carriers))
        .collect();

    Leg::new(segments, parse_duration(itinerary.duration.as_deref()))
}

fn normalize_segment(segment: &RawSegment, carriers: &HashMap<String, String>) -> Segment {
    let code = segment.carrier_code.clone().unwrap_or_default();
    let name = carriers
        .get(&code)
        .filter(|name| !name.is_empty())
        .cloned()
        .unwrap_or_else(|| {
            if code.is_empty() {
                UNKNOWN_CARRIER.to_string()
            } else {
                code.clone()
            }
        });

    Segment {
        carrier: Carrier { code, name },
        flight_number: segment.number.clone().unwrap_or_default(),
        departure: endpoint(segment.departure.as_ref()),
        arrival: endpoint(segment.arrival.as_ref()),
    }
}

fn endpoint(raw: Option<&RawEndpoint>) -> Endpoint {
    Endpoint {
        station: raw
            .and_then(|e| e.iata_code.clone())
            .unwrap_or_else(|| "N/A".to_string()),
        utc_time: raw.and_then(|e| e.at.as_deref()).and_then(parse_utc),
    }
}

fn base_fields(offer: &RawOffer, id_prefix: Option<usize>) -> (String, Price) {
    let raw_id = offer.id.as_ref().map(|id| id.to_text()).unwrap_or_default();
    let id = match id_prefix {
        Some(index) => format!("{}-{}", index, raw_id),
        None => raw_id,
    };
    let amount = offer
        .price
        .as_ref()
        .and_then(|p| p.total.as_ref())
        .map(|total| total.to_text())
        .unwrap_or_default();

    (id, Price::usd(amount))
}

fn map_offer(
    offer: &RawOffer,
    trip_type: TripType,
    carriers: &HashMap<String, String>,
    segment_index: Option<usize>,
) -> Itinerary {
    let (id, price) = base_fields(offer, segment_index);
    let first = normalize_itinerary(offer.itineraries.first(), carriers);

    let legs = match (trip_type, segment_index) {
        (TripType::Return, _) => Legs::Return {
            outbound: first,
            inbound: normalize_itinerary(offer.itineraries.get(1), carriers),
        },
        (TripType::MultiCity, index) => Legs::MultiCitySegment {
            segment_index: index.unwrap_or(0),
            sector: first,
        },
        (TripType::OneWay, _) => Legs::OneWay { sector: first },
    };

    Itinerary {
        id,
        price,
        booking_option: Some(BookingOption::default()),
        legs,
    }
}

// Map a whole provider response for a one-way or return search.
// Passing a multi-city trip type maps the response as segment 0.
pub fn map_offers(
    response: &RawOfferResponse,
    trip_type: TripType,
    carriers: &HashMap<String, String>,
) -> Vec<Itinerary> {
    let segment_index = (trip_type == TripType::MultiCity).then_some(0);
    let itineraries: Vec<Itinerary> = response
        .data
        .iter()
        .map(|offer| map_offer(offer, trip_type, carriers, segment_index))
        .collect();

    debug!(
        offers = itineraries.len(),
        ?trip_type,
        "mapped provider offers"
    );
    itineraries
}

// Map one response per requested multi-city segment. Ids become "{segment index}-{offer id}"
// so offers stay unique across segments.
pub fn map_multi_city_segments(responses: &[RawOfferResponse]) -> Vec<Vec<Itinerary>> {
    responses
        .iter()
        .enumerate()
        .map(|(index, response)| {
            let carriers = response.carriers();
            let itineraries: Vec<Itinerary> = response
                .data
                .iter()
                .map(|offer| map_offer(offer, TripType::MultiCity, &carriers, Some(index)))
                .collect();
            debug!(segment = index, offers = itineraries.len(), "mapped multi-city segment");
            itineraries
        })
        .collect()
}

// Canonical itinerary model shared by the mapper, the result processor and the presentation layer
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::format_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TripType {
    #[default]
    OneWay,
    Return,
    MultiCity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Carrier {
    pub code: String,
    pub name: String,
}

// One end of a segment. `utc_time` is None when the provider timestamp was unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub station: String,
    pub utc_time: Option<DateTime<Utc>>,
}

impl Endpoint {
    // "HH:MM" in UTC, the slot shown on result cards and used by the dedup key
    pub fn clock(&self) -> Option<String> {
        self.utc_time.map(|t| t.format("%H:%M").to_string())
    }

    pub fn clock_label(&self) -> String {
        self.clock().unwrap_or_else(|| "--:--".to_string())
    }

    pub fn date_label(&self) -> String {
        self.utc_time
            .map(|t| t.format("%b %-d").to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub carrier: Carrier,
    pub flight_number: String,
    pub departure: Endpoint,
    pub arrival: Endpoint,
}

/// A directional journey made of one or more consecutive segments.
///
/// Construction goes through [`Leg::new`], which refuses an empty segment list, so every
/// `Leg` in the system has a first and a last segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leg {
    segments: Vec<Segment>,
    duration_seconds: u64,
}

impl Leg {
    pub fn new(segments: Vec<Segment>, duration_seconds: u64) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }
        Some(Self {
            segments,
            duration_seconds,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Provider-reported elapsed time including layovers, 0 when unknown.
    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    pub fn first_segment(&self) -> &Segment {
        &self.segments[0]
    }

    pub fn last_segment(&self) -> &Segment {
        &self.segments[self.segments.len() - 1]
    }

    pub fn stop_count(&self) -> usize {
        self.segments.len() - 1
    }

    pub fn departure_time(&self) -> Option<DateTime<Utc>> {
        self.first_segment().departure.utc_time
    }

    pub fn arrival_time(&self) -> Option<DateTime<Utc>> {
        self.last_segment().arrival.utc_time
    }

    pub fn duration_label(&self) -> String {
        format_duration(self.duration_seconds)
    }

    pub fn stops_label(&self) -> String {
        match self.stop_count() {
            0 => "Non-stop".to_string(),
            n => format!("{} stop(s)", n),
        }
    }
}

// USD amount exactly as delivered by the provider; use `value()` for arithmetic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Price {
    pub amount: String,
    pub currency: String,
}

impl Price {
    pub fn usd(amount: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            currency: "USD".to_string(),
        }
    }

    // Numeric view of the amount: non-numeric, negative or missing amounts count as 0
    pub fn value(&self) -> f64 {
        match self.amount.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => v,
            _ => 0.0,
        }
    }
}

// Deep-link slot kept for forward compatibility; the provider never fills it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookingOption {
    pub booking_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tripType", rename_all = "camelCase")]
pub enum Legs {
    OneWay {
        sector: Option<Leg>,
    },
    Return {
        outbound: Option<Leg>,
        inbound: Option<Leg>,
    },
    #[serde(rename_all = "camelCase")]
    MultiCitySegment {
        segment_index: usize,
        sector: Option<Leg>,
    },
}

impl Legs {
    /// The leg that drives filtering, sorting and dedup: outbound for return trips,
    /// the only sector otherwise. Inbound legs never participate.
    pub fn primary(&self) -> Option<&Leg> {
        match self {
            Legs::OneWay { sector } | Legs::MultiCitySegment { sector, .. } => sector.as_ref(),
            Legs::Return { outbound, .. } => outbound.as_ref(),
        }
    }

    pub fn trip_type(&self) -> TripType {
        match self {
            Legs::OneWay { .. } => TripType::OneWay,
            Legs::Return { .. } => TripType::Return,
            Legs::MultiCitySegment { .. } => TripType::MultiCity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Itinerary {
    pub id: String,
    pub price: Price,
    pub booking_option: Option<BookingOption>,
    pub legs: Legs,
}

impl Itinerary {
    pub fn primary_leg(&self) -> Option<&Leg> {
        self.legs.primary()
    }

    pub fn primary_segment(&self) -> Option<&Segment> {
        self.primary_leg().map(Leg::first_segment)
    }

    pub fn airline_name(&self) -> Option<&str> {
        self.primary_segment()
            .map(|s| s.carrier.name.as_str())
            .filter(|name| !name.is_empty())
    }
}

// Accepts "2025-06-11T10:30:00Z", offsets, and offset-less provider timestamps (read as UTC)
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

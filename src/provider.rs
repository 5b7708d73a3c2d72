use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

// Data structures for the flight-offer provider JSON response.
// Every nested field is optional: the payload is only partially trusted and missing pieces
// must degrade to placeholders instead of failing the whole response.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawOfferResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub data: Vec<RawOffer>,
    pub dictionaries: Option<RawDictionaries>,
}

impl RawOfferResponse {
    // Carrier code -> display name table, shared by every offer of this response
    pub fn carriers(&self) -> HashMap<String, String> {
        self.dictionaries
            .as_ref()
            .map(|d| d.carriers.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawDictionaries {
    #[serde(deserialize_with = "null_as_default")]
    pub carriers: HashMap<String, String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawOffer {
    pub id: Option<RawScalar>,
    pub price: Option<RawPrice>,
    #[serde(deserialize_with = "null_as_default")]
    pub itineraries: Vec<RawItinerary>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawPrice {
    pub currency: Option<String>,
    pub total: Option<RawScalar>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawItinerary {
    pub duration: Option<String>,
    pub segments: Option<Vec<RawSegment>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSegment {
    pub carrier_code: Option<String>,
    pub number: Option<String>,
    pub departure: Option<RawEndpoint>,
    pub arrival: Option<RawEndpoint>,
    pub duration: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawEndpoint {
    pub iata_code: Option<String>,
    pub at: Option<String>,
}

// `#[serde(default)]` only covers absent keys; an explicit `null` collection reads as empty too
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Ids and prices show up both as JSON strings and as bare numbers
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawScalar {
    Text(String),
    Number(serde_json::Number),
}

impl RawScalar {
    pub fn to_text(&self) -> String {
        match self {
            RawScalar::Text(s) => s.clone(),
            RawScalar::Number(n) => n.to_string(),
        }
    }
}

// Flight result pipeline: provider offers -> canonical itineraries -> filtered, deduplicated,
// sorted result sets, with display-time currency conversion

pub mod currency;
pub mod duration;
pub mod itinerary;
pub mod mapper;
pub mod provider;
pub mod results;
pub mod search;
pub mod trip;

// Re-export key types for convenience
pub use currency::{
    convert_price, refresh_rates, CurrencyError, FrankfurterRates, PriceDisplay, RateRefresh,
    RateSource, RateTable, RatesConfig,
};
pub use duration::{format_duration, parse_duration};
pub use itinerary::{Carrier, Endpoint, Itinerary, Leg, Legs, Price, Segment, TripType};
pub use mapper::{
    map_multi_city_segments, map_offers, normalize_itinerary, parse_offer_response,
    ProcessingError,
};
pub use provider::RawOfferResponse;
pub use results::{process, unique_airlines, ResultFilters, ResultView, SortOrder};
pub use search::{
    FlightSearch, OfferProvider, ProviderError, SearchConfig, SearchError, SearchResults,
};
pub use trip::{deep_link, CabinClass, DeepLinkConfig, OfferQuery, TripRequest, TripSegment};

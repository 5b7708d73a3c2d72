// Result processing: filter -> dedup -> sort over one trip segment's itineraries
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::itinerary::Itinerary;

// Upper bound of the price slider in the results sidebar
pub const DEFAULT_MAX_PRICE: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResultFilters {
    pub max_price: f64,
    // Carrier display names; empty means no airline restriction
    pub selected_airlines: BTreeSet<String>,
    // Stop counts; empty means no stop restriction
    pub selected_stops: BTreeSet<usize>,
}

impl Default for ResultFilters {
    fn default() -> Self {
        Self {
            max_price: DEFAULT_MAX_PRICE,
            selected_airlines: BTreeSet::new(),
            selected_stops: BTreeSet::new(),
        }
    }
}

impl ResultFilters {
    // Checkbox semantics: selecting an already selected airline removes it
    pub fn toggle_airline(&mut self, name: &str) {
        if !self.selected_airlines.remove(name) {
            self.selected_airlines.insert(name.to_string());
        }
    }

    pub fn toggle_stops(&mut self, stops: usize) {
        if !self.selected_stops.remove(&stops) {
            self.selected_stops.insert(stops);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    Price,
    Duration,
    Departure,
    Arrival,
}

// Composite fingerprint of an offer as the user sees it.
// Uses the first segment's own arrival, not the leg's final arrival. Price is not part of
// the fingerprint: it only decides which member of a group survives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    carrier_code: String,
    flight_number: String,
    departure_clock: Option<String>,
    arrival_clock: Option<String>,
    duration_seconds: u64,
}

fn dedup_key(itinerary: &Itinerary) -> Option<DedupKey> {
    let leg = itinerary.primary_leg()?;
    let segment = leg.first_segment();
    Some(DedupKey {
        carrier_code: segment.carrier.code.clone(),
        flight_number: segment.flight_number.clone(),
        departure_clock: segment.departure.clock(),
        arrival_clock: segment.arrival.clock(),
        duration_seconds: leg.duration_seconds(),
    })
}

fn passes_filters(itinerary: &Itinerary, filters: &ResultFilters) -> bool {
    if itinerary.price.value() > filters.max_price {
        return false;
    }

    if !filters.selected_airlines.is_empty()
        && !itinerary
            .airline_name()
            .map_or(false, |name| filters.selected_airlines.contains(name))
    {
        return false;
    }

    if !filters.selected_stops.is_empty()
        && !itinerary
            .primary_leg()
            .map_or(false, |leg| filters.selected_stops.contains(&leg.stop_count()))
    {
        return false;
    }

    true
}

// Collapse operationally identical offers, keeping the cheapest of each group.
// Groups keep the position of their first member; ties keep the earlier offer.
pub fn dedup(itineraries: Vec<Itinerary>) -> Vec<Itinerary> {
    let incoming = itineraries.len();
    let mut slots: HashMap<DedupKey, usize> = HashMap::new();
    let mut unique: Vec<Itinerary> = Vec::new();

    for itinerary in itineraries {
        let Some(key) = dedup_key(&itinerary) else {
            continue;
        };
        match slots.get(&key) {
            Some(&slot) => {
                if itinerary.price.value() < unique[slot].price.value() {
                    unique[slot] = itinerary;
                }
            }
            None => {
                slots.insert(key, unique.len());
                unique.push(itinerary);
            }
        }
    }

    debug!(incoming, unique = unique.len(), "deduplicated itineraries");
    unique
}

fn instant_or_earliest(instant: Option<DateTime<Utc>>) -> DateTime<Utc> {
    instant.unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// Stable ascending sort by the requested field
pub fn sort_itineraries(itineraries: &mut [Itinerary], order: SortOrder) {
    match order {
        SortOrder::Price => {
            itineraries.sort_by(|a, b| a.price.value().total_cmp(&b.price.value()));
        }
        SortOrder::Duration => itineraries.sort_by_key(|i| {
            i.primary_leg().map_or(0, |leg| leg.duration_seconds())
        }),
        SortOrder::Departure => itineraries.sort_by_key(|i| {
            instant_or_earliest(i.primary_leg().and_then(|leg| leg.departure_time()))
        }),
        SortOrder::Arrival => itineraries.sort_by_key(|i| {
            instant_or_earliest(i.primary_leg().and_then(|leg| leg.arrival_time()))
        }),
    }
}

// Full pipeline for one trip segment: price, airline and stop filters, dedup, then sort
pub fn process(
    itineraries: &[Itinerary],
    filters: &ResultFilters,
    sort_order: SortOrder,
) -> Vec<Itinerary> {
    let filtered: Vec<Itinerary> = itineraries
        .iter()
        .filter(|itinerary| passes_filters(itinerary, filters))
        .cloned()
        .collect();

    let mut unique = dedup(filtered);
    sort_itineraries(&mut unique, sort_order);
    unique
}

// Distinct primary-leg carrier names across every segment's itineraries
pub fn unique_airlines<'a>(itineraries: impl IntoIterator<Item = &'a Itinerary>) -> Vec<String> {
    let mut seen = HashSet::new();
    itineraries
        .into_iter()
        .filter_map(Itinerary::airline_name)
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Default, Clone)]
pub struct ViewStatsReport {
    pub hit_count: usize,
    pub miss_count: usize,
}

type MemoEntry = (ResultFilters, SortOrder, Vec<Vec<Itinerary>>);

// Result page state for one search: the mapped itineraries of every trip segment plus a
// memo of the last filter/sort selection and its output.
pub struct ResultView {
    segments: Vec<Vec<Itinerary>>,
    last: Mutex<Option<MemoEntry>>,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

impl ResultView {
    pub fn new(segments: Vec<Vec<Itinerary>>) -> Self {
        Self {
            segments,
            last: Mutex::new(None),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn segments(&self) -> &[Vec<Itinerary>] {
        &self.segments
    }

    pub fn airlines(&self) -> Vec<String> {
        unique_airlines(self.segments.iter().flatten())
    }

    // One processed list per trip segment, in request order
    pub fn processed(&self, filters: &ResultFilters, sort_order: SortOrder) -> Vec<Vec<Itinerary>> {
        let mut last = self.last.lock();
        if let Some((memo_filters, memo_sort, output)) = last.as_ref() {
            if memo_filters == filters && *memo_sort == sort_order {
                self.hit_count.fetch_add(1, Ordering::SeqCst);
                return output.clone();
            }
        }

        self.miss_count.fetch_add(1, Ordering::SeqCst);
        let output: Vec<Vec<Itinerary>> = self
            .segments
            .iter()
            .map(|segment| process(segment, filters, sort_order))
            .collect();
        *last = Some((filters.clone(), sort_order, output.clone()));
        output
    }

    // "No matches" as opposed to a failed search
    pub fn all_empty(&self, filters: &ResultFilters, sort_order: SortOrder) -> bool {
        self.processed(filters, sort_order)
            .iter()
            .all(|segment| segment.is_empty())
    }

    pub fn stats(&self) -> ViewStatsReport {
        ViewStatsReport {
            hit_count: self.hit_count.load(Ordering::SeqCst),
            miss_count: self.miss_count.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itinerary::{
        parse_utc, BookingOption, Carrier, Endpoint, Leg, Legs, Price, Segment,
    };
    use test_case::test_case;

    fn segment(code: &str, name: &str, number: &str, dep: &str, arr: &str) -> Segment {
        Segment {
            carrier: Carrier {
                code: code.to_string(),
                name: name.to_string(),
            },
            flight_number: number.to_string(),
            departure: Endpoint {
                station: "JFK".to_string(),
                utc_time: parse_utc(dep),
            },
            arrival: Endpoint {
                station: "LAX".to_string(),
                utc_time: parse_utc(arr),
            },
        }
    }

    fn one_way(id: &str, price: &str, segments: Vec<Segment>, duration: u64) -> Itinerary {
        Itinerary {
            id: id.to_string(),
            price: Price::usd(price),
            booking_option: Some(BookingOption::default()),
            legs: Legs::OneWay {
                sector: Leg::new(segments, duration),
            },
        }
    }

    fn direct(id: &str, price: &str, code: &str, name: &str, dep: &str, arr: &str, duration: u64) -> Itinerary {
        one_way(id, price, vec![segment(code, name, "100", dep, arr)], duration)
    }

    // Sample result set with a spread of prices, carriers, stops and times
    fn sample() -> Vec<Itinerary> {
        vec![
            direct("1", "420.00", "AA", "American", "2025-06-11T09:00:00", "2025-06-11T15:00:00", 21_600),
            one_way(
                "2",
                "180.00",
                vec![
                    segment("UA", "United", "20", "2025-06-11T06:00:00", "2025-06-11T08:00:00"),
                    segment("UA", "United", "21", "2025-06-11T09:00:00", "2025-06-11T16:30:00"),
                ],
                37_800,
            ),
            direct("3", "310.50", "DL", "Delta", "2025-06-11T12:15:00", "2025-06-11T17:45:00", 19_800),
            direct("4", "not-a-price", "B6", "JetBlue", "bad-time", "2025-06-11T11:00:00", 0),
        ]
    }

    fn ids(itineraries: &[Itinerary]) -> Vec<&str> {
        itineraries.iter().map(|i| i.id.as_str()).collect()
    }

    fn filters(max_price: f64, airlines: &[&str], stops: &[usize]) -> ResultFilters {
        ResultFilters {
            max_price,
            selected_airlines: airlines.iter().map(|a| a.to_string()).collect(),
            selected_stops: stops.iter().copied().collect(),
        }
    }

    #[test_case(filters(1000.0, &[], &[]), vec!["4", "2", "3", "1"]; "#1 No restriction")]
    #[test_case(filters(300.0, &[], &[]), vec!["4", "2"]; "#2 Max price keeps unpriced offer")]
    #[test_case(filters(310.5, &[], &[]), vec!["4", "2", "3"]; "#3 Max price is inclusive")]
    #[test_case(filters(1000.0, &["Delta", "United"], &[]), vec!["2", "3"]; "#4 Airline set")]
    #[test_case(filters(1000.0, &[], &[1]), vec!["2"]; "#5 Stops set")]
    #[test_case(filters(400.0, &["American", "Delta"], &[0]), vec!["3"]; "#6 Combined filters")]
    #[test_case(filters(1000.0, &["Qantas"], &[]), vec![]; "#7 Nothing matches")]
    fn test_process_filters(criteria: ResultFilters, expected: Vec<&str>) {
        let output = process(&sample(), &criteria, SortOrder::Price);
        assert_eq!(ids(&output), expected);
    }

    #[test_case(SortOrder::Price, vec!["4", "2", "3", "1"]; "price")]
    #[test_case(SortOrder::Duration, vec!["4", "3", "1", "2"]; "duration with unknown first")]
    #[test_case(SortOrder::Departure, vec!["4", "2", "1", "3"]; "departure with unparsable first")]
    #[test_case(SortOrder::Arrival, vec!["4", "1", "2", "3"]; "arrival uses last segment")]
    fn test_sort_orders(order: SortOrder, expected: Vec<&str>) {
        let output = process(&sample(), &ResultFilters::default(), order);
        assert_eq!(ids(&output), expected);
    }

    #[test]
    fn test_price_sort_is_non_decreasing() {
        let output = process(&sample(), &ResultFilters::default(), SortOrder::Price);
        assert!(output
            .windows(2)
            .all(|pair| pair[0].price.value() <= pair[1].price.value()));
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let mut itineraries = vec![
            direct("a", "100", "AA", "American", "2025-06-11T09:00:00", "2025-06-11T10:00:00", 3_600),
            direct("b", "100", "DL", "Delta", "2025-06-11T07:00:00", "2025-06-11T08:00:00", 3_600),
            direct("c", "100", "UA", "United", "2025-06-11T08:00:00", "2025-06-11T09:00:00", 3_600),
        ];
        sort_itineraries(&mut itineraries, SortOrder::Duration);
        assert_eq!(ids(&itineraries), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_single_offer_scenario() {
        let itineraries = vec![direct(
            "1",
            "250",
            "AA",
            "American",
            "2025-06-11T09:00:00",
            "2025-06-11T12:00:00",
            10_800,
        )];

        assert_eq!(dedup(itineraries.clone()).len(), 1);
        assert_eq!(
            process(&itineraries, &filters(300.0, &["American"], &[0]), SortOrder::Price).len(),
            1
        );
        assert!(process(&itineraries, &filters(300.0, &["American"], &[1]), SortOrder::Price).is_empty());
    }

    #[test]
    fn test_duplicates_keep_cheapest() {
        let expensive = direct("x", "300", "AA", "American", "2025-06-11T09:00:00", "2025-06-11T12:00:00", 10_800);
        let cheap = direct("y", "250", "AA", "American", "2025-06-11T09:00:00", "2025-06-11T12:00:00", 10_800);

        let output = process(&[expensive, cheap], &ResultFilters::default(), SortOrder::Price);

        assert_eq!(ids(&output), vec!["y"]);
    }

    #[test]
    fn test_dedup_group_survivor_is_minimum() {
        let dep = "2025-06-11T09:00:00";
        let arr = "2025-06-11T12:00:00";
        let group = vec![
            direct("p", "120", "AA", "American", dep, arr, 10_800),
            direct("q", "95.40", "AA", "American", dep, arr, 10_800),
            direct("other", "500", "AA", "American", "2025-06-11T18:00:00", "2025-06-11T21:00:00", 10_800),
            direct("r", "95.4", "AA", "American", dep, arr, 10_800),
            direct("s", "110", "AA", "American", dep, arr, 10_800),
        ];

        let output = dedup(group);

        // first-seen group order, cheapest member, earlier member on a tie
        assert_eq!(ids(&output), vec!["q", "other"]);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let mut itineraries = sample();
        itineraries.extend(sample());
        let once = dedup(itineraries);
        let twice = dedup(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_dedup_uses_first_segment_arrival() {
        // Same first flight, different connection: the first segment's own arrival matches,
        // so these collapse even though the final arrival differs
        let connection_a = one_way(
            "a",
            "500",
            vec![
                segment("AA", "American", "10", "2025-06-11T06:00:00", "2025-06-11T08:00:00"),
                segment("AA", "American", "11", "2025-06-11T09:00:00", "2025-06-11T12:00:00"),
            ],
            21_600,
        );
        let connection_b = one_way(
            "b",
            "500",
            vec![
                segment("AA", "American", "10", "2025-06-11T06:00:00", "2025-06-11T08:00:00"),
                segment("AA", "American", "33", "2025-06-11T10:00:00", "2025-06-11T12:00:00"),
            ],
            21_600,
        );
        assert_eq!(ids(&dedup(vec![connection_a, connection_b])), vec!["a"]);
    }

    #[test]
    fn test_itineraries_without_primary_leg_are_dropped() {
        let broken = Itinerary {
            id: "gone".to_string(),
            price: Price::usd("10"),
            booking_option: None,
            legs: Legs::OneWay { sector: None },
        };
        let output = process(&[broken], &ResultFilters::default(), SortOrder::Price);
        assert!(output.is_empty());
    }

    #[test]
    fn test_return_trip_ignores_inbound() {
        let outbound = Leg::new(
            vec![segment("AA", "American", "1", "2025-06-11T09:00:00", "2025-06-11T12:00:00")],
            10_800,
        );
        let inbound = Leg::new(
            vec![
                segment("DL", "Delta", "2", "2025-06-18T09:00:00", "2025-06-18T11:00:00"),
                segment("DL", "Delta", "3", "2025-06-18T12:00:00", "2025-06-18T14:00:00"),
            ],
            18_000,
        );
        let trip = Itinerary {
            id: "rt".to_string(),
            price: Price::usd("700"),
            booking_option: None,
            legs: Legs::Return { outbound, inbound },
        };

        let nonstop_american = filters(1000.0, &["American"], &[0]);
        assert_eq!(process(&[trip.clone()], &nonstop_american, SortOrder::Price).len(), 1);
        assert!(process(&[trip.clone()], &filters(1000.0, &["Delta"], &[]), SortOrder::Price).is_empty());
        assert_eq!(unique_airlines(&[trip]), vec!["American".to_string()]);
    }

    #[test]
    fn test_unique_airlines() {
        let mut itineraries = sample();
        itineraries.extend(sample());
        let mut airlines = unique_airlines(&itineraries);
        airlines.sort();
        assert_eq!(airlines, vec!["American", "Delta", "JetBlue", "United"]);
    }

    #[test]
    fn test_toggle_selection() {
        let mut criteria = ResultFilters::default();
        criteria.toggle_airline("Delta");
        criteria.toggle_stops(2);
        assert!(criteria.selected_airlines.contains("Delta"));
        assert!(criteria.selected_stops.contains(&2));

        criteria.toggle_airline("Delta");
        criteria.toggle_stops(2);
        assert_eq!(criteria, ResultFilters::default());
    }

    #[test]
    fn test_result_view_memoizes_last_selection() {
        let view = ResultView::new(vec![sample(), vec![]]);
        let criteria = ResultFilters::default();

        let first = view.processed(&criteria, SortOrder::Price);
        let second = view.processed(&criteria, SortOrder::Price);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first[1].is_empty());

        view.processed(&criteria, SortOrder::Arrival);
        let stats = view.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 2);
    }

    #[test]
    fn test_result_view_all_empty_means_no_matches() {
        let view = ResultView::new(vec![sample(), sample()]);
        assert!(!view.all_empty(&ResultFilters::default(), SortOrder::Price));
        assert!(view.all_empty(&filters(1000.0, &["Qantas"], &[]), SortOrder::Price));
        assert_eq!(view.airlines().len(), 4);
    }
}

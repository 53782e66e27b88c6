//! Query normalizer for turning free-text car searches into structured filters.
//!
//! Transforms queries like "chevy truck under 35k 2018 4x4" into [`Filters`]
//! plus whatever text is left over once the recognized phrases are removed.

use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use serde::Serialize;
use tracing::{debug, warn};

use super::traits::QueryExpander;
use super::types::Filters;

/// A single year at or below this is read as an upper bound, above it as a lower bound.
pub const RECENT_ERA_THRESHOLD: i32 = 2015;

/// Result of normalizing a raw query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedQuery {
    pub filters: Filters,
    /// Text left after recognized phrases were removed
    pub cleaned_text: String,
}

/// Normalizes raw queries, optionally letting an AI expander rewrite slang first.
///
/// The expander only changes the text fed to the rule tables. When it is
/// missing or fails, the rules run on the raw text, so both paths can set
/// exactly the same filter fields.
#[derive(Clone, Default)]
pub struct QueryNormalizer {
    known_sources: Vec<String>,
    expander: Option<Arc<dyn QueryExpander>>,
}

impl QueryNormalizer {
    /// `known_sources` are the names a "from <source>" hint may resolve to.
    pub fn new(known_sources: Vec<String>) -> Self {
        Self {
            known_sources,
            expander: None,
        }
    }

    pub fn with_expander(mut self, expander: Arc<dyn QueryExpander>) -> Self {
        self.expander = Some(expander);
        self
    }

    pub async fn normalize(&self, raw: &str) -> NormalizedQuery {
        let raw = raw.trim();
        if raw.is_empty() {
            return NormalizedQuery::default();
        }

        let text = match &self.expander {
            Some(expander) => match expander.expand(raw).await {
                Ok(expanded) if !expanded.trim().is_empty() => {
                    debug!(raw, expanded = %expanded, "Expanded query");
                    expanded
                }
                Ok(_) => raw.to_string(),
                Err(e) => {
                    warn!(error = %e, "Query expansion failed, using rule-based normalization");
                    raw.to_string()
                }
            },
            None => raw.to_string(),
        };

        parse_query(&text, &self.known_sources)
    }
}

/// Rule-based normalization.
///
/// # Examples
///
/// ```ignore
/// let parsed = parse_query("SUV under 40k", &[]);
/// assert_eq!(parsed.filters.body_type.as_deref(), Some("SUV"));
/// assert_eq!(parsed.filters.price_max, Some(40_000.0));
/// assert_eq!(parsed.cleaned_text, "");
/// ```
pub fn parse_query(query: &str, known_sources: &[String]) -> NormalizedQuery {
    let mut filters = Filters::default();
    let mut remaining = query.to_string();

    remaining = extract_source(&remaining, known_sources, &mut filters);
    remaining = extract_mileage(&remaining, &mut filters);
    remaining = extract_price(&remaining, &mut filters);
    remaining = extract_years(&remaining, &mut filters);
    remaining = extract_first(&remaining, &BODY_TYPES, &mut filters.body_type);
    remaining = extract_first(&remaining, &MAKES, &mut filters.make);
    remaining = extract_first(&remaining, &FUEL_TYPES, &mut filters.fuel_type);
    remaining = extract_first(&remaining, &TRANSMISSIONS, &mut filters.transmission);
    remaining = extract_features(&remaining, &mut filters);

    NormalizedQuery {
        filters,
        cleaned_text: cleanup_text(&remaining),
    }
}

type RuleTable = LazyLock<Vec<(Regex, &'static str)>>;

fn rule(pattern: &str, value: &'static str) -> (Regex, &'static str) {
    (Regex::new(&format!(r"(?i)\b(?:{pattern})\b")).unwrap(), value)
}

static BODY_TYPES: RuleTable = LazyLock::new(|| {
    vec![
        rule(r"suvs?|crossovers?|cuvs?", "SUV"),
        rule(r"sedans?|saloons?", "Sedan"),
        rule(r"trucks?|pick-?ups?", "Truck"),
        rule(r"coupes?", "Coupe"),
        rule(r"convertibles?|cabrio(?:let)?s?|drop-?tops?", "Convertible"),
        rule(r"hatchbacks?|hatch", "Hatchback"),
        rule(r"wagons?|estates?", "Wagon"),
        rule(r"mini-?vans?|vans?", "Minivan"),
    ]
});

static MAKES: RuleTable = LazyLock::new(|| {
    vec![
        rule(r"toyota|yota", "Toyota"),
        rule(r"honda", "Honda"),
        rule(r"ford", "Ford"),
        rule(r"chevrolet|chevy|chevvy", "Chevrolet"),
        rule(r"bmw|beemer|bimmer", "BMW"),
        rule(r"mercedes(?:-benz)?|merc|benz", "Mercedes-Benz"),
        rule(r"volkswagen|vw|vdub", "Volkswagen"),
        rule(r"audi", "Audi"),
        rule(r"nissan", "Nissan"),
        rule(r"hyundai", "Hyundai"),
        rule(r"kia", "Kia"),
        rule(r"subaru|subie", "Subaru"),
        rule(r"mazda", "Mazda"),
        rule(r"jeep", "Jeep"),
        rule(r"tesla", "Tesla"),
        rule(r"lexus", "Lexus"),
        rule(r"dodge", "Dodge"),
        rule(r"gmc", "GMC"),
        rule(r"porsche", "Porsche"),
        rule(r"volvo", "Volvo"),
    ]
});

static FUEL_TYPES: RuleTable = LazyLock::new(|| {
    vec![
        rule(r"plug-?in hybrid|phev|hybrids?", "Hybrid"),
        rule(r"electric|evs?|bev", "Electric"),
        rule(r"diesel|tdi", "Diesel"),
        rule(r"gas|gasoline|petrol", "Gasoline"),
    ]
});

static TRANSMISSIONS: RuleTable = LazyLock::new(|| {
    vec![
        rule(r"manual|stick(?:\s*shift)?|[56]mt", "Manual"),
        rule(r"automatic|auto|cvt", "Automatic"),
    ]
});

/// Drivetrains have no filter field of their own and become feature requirements.
static DRIVETRAINS: RuleTable = LazyLock::new(|| {
    vec![
        rule(r"awd|all[\s-]wheel[\s-]drive", "AWD"),
        rule(r"4wd|4x4|four[\s-]wheel[\s-]drive", "4WD"),
        rule(r"fwd|front[\s-]wheel[\s-]drive", "FWD"),
        rule(r"rwd|rear[\s-]wheel[\s-]drive", "RWD"),
    ]
});

static FEATURES: RuleTable = LazyLock::new(|| {
    vec![
        rule(r"sun-?roof|moon-?roof|panoramic roof", "Sunroof"),
        rule(r"leather(?:\s+seats)?", "Leather"),
        rule(r"navigation|nav|gps", "Navigation"),
        rule(r"backup camera|rear(?:view)? camera", "Backup Camera"),
        rule(r"apple carplay|carplay", "CarPlay"),
        rule(r"heated seats", "Heated Seats"),
        rule(r"third row|3rd row", "Third Row"),
        rule(r"bluetooth", "Bluetooth"),
        rule(r"tow(?:ing)? package|towing", "Tow"),
    ]
});

const AMOUNT: &str = r"\$?\s*(\d+(?:,\d{3})*(?:\.\d+)?)\s*(k)?";

static SOURCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:from|on)\s+([a-z][\w-]*)\b").unwrap());
static MILEAGE_MAX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:under|below|less\s+than|max)\s+(\d+(?:,\d{3})*)\s*(k)?\s*(?:miles|mi)\b",
    )
    .unwrap()
});
static PRICE_BETWEEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\bbetween\s+{AMOUNT}\s+(?:and|to)\s+{AMOUNT}\b"
    ))
    .unwrap()
});
static PRICE_RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$(\d+(?:,\d{3})*(?:\.\d+)?)\s*(k)?\s*-\s*\$?(\d+(?:,\d{3})*(?:\.\d+)?)\s*(k)?\b")
        .unwrap()
});
static PRICE_MAX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:under|below|less\s+than|max|up\s+to|cheaper\s+than)\s+{AMOUNT}\b"
    ))
    .unwrap()
});
static PRICE_MIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:over|above|more\s+than|at\s+least)\s+{AMOUNT}\b"
    ))
    .unwrap()
});
static YEAR_BETWEEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bbetween\s+((?:19|20)\d{2})\s+(?:and|to)\s+((?:19|20)\d{2})\b").unwrap()
});
static YEAR_AFTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:newer\s+than|after|since)\s+((?:19|20)\d{2})\b").unwrap()
});
static YEAR_BEFORE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:older\s+than|before)\s+((?:19|20)\d{2})\b").unwrap()
});
static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").unwrap());

/// Parse an amount like "40", "40k", "40,000" or "12.5k".
fn parse_amount(digits: &str, thousands: Option<&str>) -> Option<f64> {
    let value: f64 = digits.replace(',', "").parse().ok()?;
    Some(if thousands.is_some() { value * 1000.0 } else { value })
}

fn amount_at(cap: &Captures, digits: usize, k: usize) -> Option<f64> {
    parse_amount(cap.get(digits)?.as_str(), cap.get(k).map(|m| m.as_str()))
}

fn extract_source(query: &str, known_sources: &[String], filters: &mut Filters) -> String {
    for cap in SOURCE_PATTERN.captures_iter(query) {
        let candidate = &cap[1];
        if let Some(name) = known_sources
            .iter()
            .find(|s| s.eq_ignore_ascii_case(candidate))
        {
            filters.source = Some(name.clone());
            return query.replacen(&cap[0], "", 1);
        }
    }
    query.to_string()
}

fn extract_mileage(query: &str, filters: &mut Filters) -> String {
    if let Some(cap) = MILEAGE_MAX_PATTERN.captures(query) {
        if let Some(miles) = amount_at(&cap, 1, 2) {
            filters.mileage_max = Some(miles as u32);
            return MILEAGE_MAX_PATTERN.replace(query, "").to_string();
        }
    }
    query.to_string()
}

/// "between 2015 and 2020": two bare model years, left for the year rules.
fn is_year_span(cap: &Captures) -> bool {
    !cap[0].contains('$')
        && cap.get(2).is_none()
        && cap.get(4).is_none()
        && [&cap[1], &cap[3]]
            .iter()
            .all(|digits| digits.len() == 4 && YEAR_PATTERN.is_match(digits))
}

fn extract_price(query: &str, filters: &mut Filters) -> String {
    for pattern in [&*PRICE_BETWEEN_PATTERN, &*PRICE_RANGE_PATTERN] {
        if let Some(cap) = pattern.captures(query) {
            if is_year_span(&cap) {
                continue;
            }
            if let (Some(a), Some(b)) = (amount_at(&cap, 1, 2), amount_at(&cap, 3, 4)) {
                filters.price_min = Some(a.min(b));
                filters.price_max = Some(a.max(b));
                return pattern.replace(query, "").to_string();
            }
        }
    }

    let mut result = query.to_string();
    if let Some(cap) = PRICE_MAX_PATTERN.captures(query) {
        filters.price_max = amount_at(&cap, 1, 2);
        result = PRICE_MAX_PATTERN.replace(&result, "").to_string();
    }
    if let Some(cap) = PRICE_MIN_PATTERN.captures(query) {
        filters.price_min = amount_at(&cap, 1, 2);
        result = PRICE_MIN_PATTERN.replace(&result, "").to_string();
    }
    result
}

fn extract_years(query: &str, filters: &mut Filters) -> String {
    if let Some(cap) = YEAR_BETWEEN_PATTERN.captures(query) {
        if let (Ok(a), Ok(b)) = (cap[1].parse::<i32>(), cap[2].parse::<i32>()) {
            filters.year_min = Some(a.min(b));
            filters.year_max = Some(a.max(b));
        }
        return YEAR_BETWEEN_PATTERN.replace(query, "").to_string();
    }

    let mut result = query.to_string();

    if let Some(cap) = YEAR_AFTER_PATTERN.captures(query) {
        filters.year_min = cap[1].parse().ok();
        result = YEAR_AFTER_PATTERN.replace(&result, "").to_string();
    }
    if let Some(cap) = YEAR_BEFORE_PATTERN.captures(query) {
        filters.year_max = cap[1].parse().ok();
        result = YEAR_BEFORE_PATTERN.replace(&result, "").to_string();
    }
    if filters.year_min.is_some() || filters.year_max.is_some() {
        return result;
    }

    let years: Vec<i32> = YEAR_PATTERN
        .captures_iter(&result)
        .filter_map(|cap| cap[1].parse().ok())
        .collect();

    match years.as_slice() {
        [] => return result,
        [year] if *year > RECENT_ERA_THRESHOLD => filters.year_min = Some(*year),
        [year] => filters.year_max = Some(*year),
        many => {
            filters.year_min = many.iter().min().copied();
            filters.year_max = many.iter().max().copied();
        }
    }

    YEAR_PATTERN.replace_all(&result, "").to_string()
}

/// Set `slot` from the first rule in `table` that matches, removing the match.
fn extract_first(
    query: &str,
    table: &[(Regex, &'static str)],
    slot: &mut Option<String>,
) -> String {
    for (re, value) in table {
        if re.is_match(query) {
            *slot = Some(value.to_string());
            return re.replace_all(query, "").to_string();
        }
    }
    query.to_string()
}

fn extract_features(query: &str, filters: &mut Filters) -> String {
    let mut drivetrain = None;
    let mut result = extract_first(query, &DRIVETRAINS, &mut drivetrain);
    filters.features.extend(drivetrain);

    for (re, value) in FEATURES.iter() {
        if re.is_match(&result) {
            filters.features.push(value.to_string());
            result = re.replace_all(&result, "").to_string();
        }
    }

    result
}

fn cleanup_text(text: &str) -> String {
    let noise_words = [
        "a", "an", "and", "or", "in", "the", "for", "with", "from", "about", "show", "me",
        "find", "car", "cars",
    ];

    text.split(|c: char| c.is_whitespace() || c == ',')
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '-'))
        .filter(|w| !w.is_empty())
        .filter(|w| !noise_words.contains(&w.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::search::expander::MockExpander;

    fn parse(query: &str) -> NormalizedQuery {
        parse_query(query, &[])
    }

    #[test]
    fn parse_empty_query() {
        let parsed = parse("");
        assert!(parsed.filters.is_empty());
        assert_eq!(parsed.cleaned_text, "");
    }

    #[test]
    fn suv_under_40k() {
        let parsed = parse("SUV under 40k");
        assert_eq!(
            parsed.filters,
            Filters {
                body_type: Some("SUV".to_string()),
                price_max: Some(40_000.0),
                ..Default::default()
            }
        );
        assert_eq!(parsed.cleaned_text, "");
    }

    #[test]
    fn price_between_sets_both_bounds() {
        let parsed = parse("sedan between $20k and $30k");
        assert_eq!(parsed.filters.price_min, Some(20_000.0));
        assert_eq!(parsed.filters.price_max, Some(30_000.0));
        assert_eq!(parsed.filters.body_type.as_deref(), Some("Sedan"));
    }

    #[test]
    fn price_dash_range() {
        let parsed = parse("$15k-$22k hatchback");
        assert_eq!(parsed.filters.price_min, Some(15_000.0));
        assert_eq!(parsed.filters.price_max, Some(22_000.0));
    }

    #[test]
    fn price_with_commas_and_min() {
        let parsed = parse("truck over $25,000");
        assert_eq!(parsed.filters.price_min, Some(25_000.0));
        assert!(parsed.filters.price_max.is_none());

        let parsed = parse("below 18500");
        assert_eq!(parsed.filters.price_max, Some(18_500.0));
    }

    #[test]
    fn mileage_is_not_mistaken_for_price() {
        let parsed = parse("civic under 50k miles under 15k");
        assert_eq!(parsed.filters.mileage_max, Some(50_000));
        assert_eq!(parsed.filters.price_max, Some(15_000.0));
        assert_eq!(parsed.cleaned_text, "civic");
    }

    #[test]
    fn two_years_become_range() {
        let parsed = parse("camry 2019 2015");
        assert_eq!(parsed.filters.year_min, Some(2015));
        assert_eq!(parsed.filters.year_max, Some(2019));
        assert_eq!(parsed.cleaned_text, "camry");
    }

    #[test]
    fn single_recent_year_is_minimum() {
        let parsed = parse("2018 tacoma");
        assert_eq!(parsed.filters.year_min, Some(2018));
        assert!(parsed.filters.year_max.is_none());
    }

    #[test]
    fn single_older_year_is_maximum() {
        let parsed = parse("2010 miata");
        assert_eq!(parsed.filters.year_max, Some(2010));
        assert!(parsed.filters.year_min.is_none());

        let parsed = parse(&format!("{RECENT_ERA_THRESHOLD} miata"));
        assert_eq!(parsed.filters.year_max, Some(RECENT_ERA_THRESHOLD));
    }

    #[test]
    fn between_two_years_is_a_year_range() {
        let parsed = parse("camry between 2015 and 2020");
        assert_eq!(parsed.filters.year_min, Some(2015));
        assert_eq!(parsed.filters.year_max, Some(2020));
        assert!(parsed.filters.price_min.is_none());
        assert!(parsed.filters.price_max.is_none());
        assert_eq!(parsed.cleaned_text, "camry");

        let parsed = parse("between $2015 and $2020");
        assert_eq!(parsed.filters.price_min, Some(2015.0));
        assert!(parsed.filters.year_min.is_none());
    }

    #[test]
    fn explicit_year_phrases() {
        let parsed = parse("newer than 2012");
        assert_eq!(parsed.filters.year_min, Some(2012));

        let parsed = parse("older than 2019");
        assert_eq!(parsed.filters.year_max, Some(2019));
    }

    #[test]
    fn make_slang_resolves() {
        assert_eq!(parse("chevy silverado").filters.make.as_deref(), Some("Chevrolet"));
        assert_eq!(parse("used vw golf").filters.make.as_deref(), Some("Volkswagen"));
        assert_eq!(parse("beemer 3 series").filters.make.as_deref(), Some("BMW"));
    }

    #[test]
    fn first_match_wins_per_category() {
        let parsed = parse("toyota or honda");
        assert_eq!(parsed.filters.make.as_deref(), Some("Toyota"));
        assert_eq!(parsed.cleaned_text, "honda");
    }

    #[test]
    fn fuel_transmission_and_drivetrain() {
        let parsed = parse("awd hybrid automatic wagon with sunroof");
        assert_eq!(parsed.filters.fuel_type.as_deref(), Some("Hybrid"));
        assert_eq!(parsed.filters.transmission.as_deref(), Some("Automatic"));
        assert_eq!(parsed.filters.body_type.as_deref(), Some("Wagon"));
        assert_eq!(parsed.filters.features, vec!["AWD".to_string(), "Sunroof".to_string()]);
        assert_eq!(parsed.cleaned_text, "");
    }

    #[test]
    fn source_hint_only_for_known_sources() {
        let sources = vec!["auction".to_string(), "catalog".to_string()];

        let parsed = parse_query("mustang from Auction", &sources);
        assert_eq!(parsed.filters.source.as_deref(), Some("auction"));
        assert_eq!(parsed.cleaned_text, "mustang");

        let parsed = parse_query("mustang from dealers", &sources);
        assert!(parsed.filters.source.is_none());
        assert_eq!(parsed.cleaned_text, "mustang dealers");
    }

    #[test]
    fn preserves_unrecognized_text() {
        let parsed = parse("reliable family ford explorer");
        assert_eq!(parsed.filters.make.as_deref(), Some("Ford"));
        assert_eq!(parsed.cleaned_text, "reliable family explorer");
    }

    #[tokio::test]
    async fn expander_output_feeds_rules() {
        let expander = MockExpander::returning("BMW 3 Series coupe 1999 2006");
        let normalizer = QueryNormalizer::default().with_expander(Arc::new(expander.clone()));

        let parsed = normalizer.normalize("e46 coupe").await;
        assert_eq!(parsed.filters.make.as_deref(), Some("BMW"));
        assert_eq!(parsed.filters.year_min, Some(1999));
        assert_eq!(parsed.filters.year_max, Some(2006));
        assert_eq!(parsed.cleaned_text, "3 Series");
        assert_eq!(expander.call_count(), 1);
    }

    #[tokio::test]
    async fn failing_expander_falls_back_to_raw_text() {
        let expander = MockExpander::failing("model unavailable");
        let normalizer = QueryNormalizer::default().with_expander(Arc::new(expander));

        let with_fallback = normalizer.normalize("SUV under 40k").await;
        let rules_only = QueryNormalizer::default().normalize("SUV under 40k").await;
        assert_eq!(with_fallback, rules_only);
        assert_eq!(with_fallback.filters.price_max, Some(40_000.0));
    }

    #[tokio::test]
    async fn blank_expansion_is_ignored() {
        let normalizer =
            QueryNormalizer::default().with_expander(Arc::new(MockExpander::returning("   ")));
        let parsed = normalizer.normalize("honda civic").await;
        assert_eq!(parsed.filters.make.as_deref(), Some("Honda"));
        assert_eq!(parsed.cleaned_text, "civic");
    }

    #[tokio::test]
    async fn empty_query_skips_expander() {
        let expander = MockExpander::returning("anything");
        let normalizer = QueryNormalizer::default().with_expander(Arc::new(expander.clone()));
        assert_eq!(normalizer.normalize("  ").await, NormalizedQuery::default());
        assert_eq!(expander.call_count(), 0);
    }
}

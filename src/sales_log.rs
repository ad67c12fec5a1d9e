// 📒 Sales Log Parser
// Free-text monthly sales notes → month-grouped vehicle/condo entries

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// ============================================================================
// MARKERS
// ============================================================================

/// Decorative marker wrapped around month headers ("📅Sept 2025📅")
pub const MONTH_MARKER: char = '📅';

/// Marker used on summary lines ("💰 Total: 4500")
pub const TOTAL_MARKER: char = '💰';

fn month_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r"{m}\s*([0-9A-Za-z_]+)\s+([0-9]{{4}})\s*{m}", m = MONTH_MARKER);
        Regex::new(&pattern).expect("month header pattern")
    })
}

fn date_range_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([0-9]{2}-[0-9]{2}/[0-9]{2}-[0-9]{2})[*•]").expect("date range pattern")
    })
}

// ============================================================================
// CORE TYPES
// ============================================================================

/// EntryKind - vehicle rentals carry a date range, everything else is a condo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Vehicle,
    Condo,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Vehicle => "vehicle",
            EntryKind::Condo => "condo",
        }
    }
}

/// SalesEntry - one transaction line, fields kept as written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesEntry {
    /// Price token as written ("3,000"), parsed only when totals are computed
    pub price: String,
    pub customer: String,
    /// `DD-DD/DD-DD`, empty for condo entries
    pub date_range: String,
    /// Vehicle identifier, or the trailing token of a condo line
    pub vehicle: String,
    pub raw_line: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl SalesEntry {
    pub fn vehicle(
        price: &str,
        customer: &str,
        date_range: &str,
        vehicle: &str,
        raw_line: &str,
    ) -> Self {
        SalesEntry {
            price: price.to_string(),
            customer: customer.to_string(),
            date_range: date_range.to_string(),
            vehicle: vehicle.to_string(),
            raw_line: raw_line.to_string(),
            kind: EntryKind::Vehicle,
        }
    }

    pub fn condo(price: &str, customer: &str, unit: &str, raw_line: &str) -> Self {
        SalesEntry {
            price: price.to_string(),
            customer: customer.to_string(),
            date_range: String::new(),
            vehicle: unit.to_string(),
            raw_line: raw_line.to_string(),
            kind: EntryKind::Condo,
        }
    }

    /// Price as a number, see [`lenient_amount`]
    pub fn amount(&self) -> f64 {
        lenient_amount(&self.price)
    }
}

/// MonthData - everything logged between one month header and the next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthData {
    pub month: String,
    pub year: String,
    pub vehicles: Vec<SalesEntry>,
    pub condos: Vec<SalesEntry>,
    pub total_vehicles: f64,
    pub total_condos: f64,
}

impl MonthData {
    fn open(month: String, year: String) -> Self {
        MonthData {
            month,
            year,
            vehicles: Vec::new(),
            condos: Vec::new(),
            total_vehicles: 0.0,
            total_condos: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty() && self.condos.is_empty()
    }

    fn push(&mut self, entry: SalesEntry) {
        match entry.kind {
            EntryKind::Vehicle => self.vehicles.push(entry),
            EntryKind::Condo => self.condos.push(entry),
        }
    }

    fn finalize(mut self) -> Self {
        self.total_vehicles = self.vehicles.iter().map(SalesEntry::amount).sum();
        self.total_condos = self.condos.iter().map(SalesEntry::amount).sum();
        self
    }
}

// ============================================================================
// MONTH NAMES
// ============================================================================

const MONTH_TABLE: &[(&str, &str)] = &[
    ("jan", "Jan"),
    ("january", "Jan"),
    ("feb", "Feb"),
    ("february", "Feb"),
    ("mar", "Mar"),
    ("march", "Mar"),
    ("apr", "Apr"),
    ("april", "Apr"),
    ("may", "May"),
    ("jun", "Jun"),
    ("june", "Jun"),
    ("jul", "Jul"),
    ("july", "Jul"),
    ("aug", "Aug"),
    ("august", "Aug"),
    ("sep", "Sep"),
    ("sept", "Sep"),
    ("september", "Sep"),
    ("oct", "Oct"),
    ("october", "Oct"),
    ("nov", "Nov"),
    ("november", "Nov"),
    ("dec", "Dec"),
    ("december", "Dec"),
];

const CANONICAL_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Canonical 3-letter abbreviation for a month token, case-insensitive
pub fn canonical_month(token: &str) -> Option<&'static str> {
    let lower = token.to_lowercase();
    MONTH_TABLE
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, abbr)| *abbr)
}

/// Month number (1-12) for a canonical abbreviation or any token in the table
pub fn month_number(token: &str) -> Option<u32> {
    let abbr = canonical_month(token)?;
    CANONICAL_MONTHS
        .iter()
        .position(|m| *m == abbr)
        .map(|idx| idx as u32 + 1)
}

fn normalize_month(token: &str) -> String {
    canonical_month(token)
        .map(str::to_string)
        .unwrap_or_else(|| token.to_string())
}

// ============================================================================
// AMOUNTS
// ============================================================================

/// Parse a price the way the sales sheets expect.
///
/// Thousands separators (`,` and `.`) are removed first, then the longest
/// leading numeric prefix is read. No prefix means 0.
pub fn lenient_amount(raw: &str) -> f64 {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '.').collect();
    let s = cleaned.trim_start();
    let bytes = s.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return 0.0;
    }

    // Optional exponent, only kept when it has digits
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().unwrap_or(0.0)
}

// ============================================================================
// LINE CLASSIFICATION
// ============================================================================

/// Month header captured from a line: (normalized month, year)
fn match_month_header(line: &str) -> Option<(String, String)> {
    let caps = month_header_regex().captures(line)?;
    Some((normalize_month(&caps[1]), caps[2].to_string()))
}

fn is_summary_line(line: &str) -> bool {
    line.contains(TOTAL_MARKER) || line.contains('=') || !line.contains(':')
}

/// Turn a `price : details` line into an entry. Caller has already
/// checked the line contains a `:`. The line is kept untrimmed as `raw_line`.
fn parse_entry(line: &str) -> SalesEntry {
    let (left, right) = line.split_once(':').unwrap_or((line, ""));
    let price = left.trim();
    let remainder = right.trim();

    if let Some(caps) = date_range_regex().captures(remainder) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let range = caps.get(1).map_or("", |m| m.as_str());
        let customer = remainder[..whole.start].trim();
        let vehicle = remainder[whole.end..].trim();
        return SalesEntry::vehicle(price, customer, range, vehicle, line);
    }

    let tokens: Vec<&str> = remainder.split_whitespace().collect();
    let (head, last) = match tokens.split_last() {
        Some((last, head)) => (head.join(" "), *last),
        None => (String::new(), ""),
    };
    let customer = if head.is_empty() { last.to_string() } else { head };
    let unit = if last == customer { "" } else { last };

    SalesEntry::condo(price, &customer, unit, line)
}

// ============================================================================
// PARSER
// ============================================================================

/// Fold accumulator: months already closed plus the one being filled
#[derive(Debug, Default)]
struct ParseState {
    output: Vec<MonthData>,
    active: Option<MonthData>,
}

impl ParseState {
    fn step(mut self, line: &str) -> Self {
        if let Some((month, year)) = match_month_header(line) {
            self.close_active();
            self.active = Some(MonthData::open(month, year));
            return self;
        }

        if is_summary_line(line) {
            tracing::trace!(line, "skipping non-entry line");
            return self;
        }

        let entry = parse_entry(line);
        match self.active.as_mut() {
            Some(month) => month.push(entry),
            None => tracing::debug!(line, "entry before any month header dropped"),
        }
        self
    }

    fn close_active(&mut self) {
        if let Some(month) = self.active.take() {
            if !month.is_empty() {
                self.output.push(month.finalize());
            }
        }
    }

    fn finish(mut self) -> Vec<MonthData> {
        self.close_active();
        self.output
    }
}

/// Parse a monthly sales log.
///
/// Never fails: lines that don't look like entries are skipped, and
/// entries that appear before the first month header are dropped.
///
/// # Example:
/// ```
/// let months = rental_ledger::parse_sales_log("📅Sept 2025📅\n3000 : Alex dj 05-11/05-12* 913");
/// assert_eq!(months[0].month, "Sep");
/// assert_eq!(months[0].total_vehicles, 3000.0);
/// ```
pub fn parse_sales_log(raw_text: &str) -> Vec<MonthData> {
    raw_text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .fold(ParseState::default(), ParseState::step)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "📅Sept 2025📅\n\
        3000 : Alex dj 05-11/05-12* 913\n\
        1500 : Maria Unit4B\n\
        💰 Total: 4500\n\
        📅Oct 2025📅\n\
        2000 : Bob 01-01/01-02• 555\n";

    #[test]
    fn test_sample_log_two_months() {
        let months = parse_sales_log(SAMPLE);
        assert_eq!(months.len(), 2);

        let sep = &months[0];
        assert_eq!(sep.month, "Sep");
        assert_eq!(sep.year, "2025");
        assert_eq!(
            sep.vehicles,
            vec![SalesEntry::vehicle(
                "3000",
                "Alex dj",
                "05-11/05-12",
                "913",
                "3000 : Alex dj 05-11/05-12* 913"
            )]
        );
        assert_eq!(
            sep.condos,
            vec![SalesEntry::condo("1500", "Maria", "Unit4B", "1500 : Maria Unit4B")]
        );
        assert_eq!(sep.total_vehicles, 3000.0);
        assert_eq!(sep.total_condos, 1500.0);

        let oct = &months[1];
        assert_eq!(oct.month, "Oct");
        assert_eq!(oct.vehicles.len(), 1);
        assert_eq!(oct.vehicles[0].customer, "Bob");
        assert_eq!(oct.vehicles[0].date_range, "01-01/01-02");
        assert_eq!(oct.vehicles[0].vehicle, "555");
        assert!(oct.condos.is_empty());
        assert_eq!(oct.total_vehicles, 2000.0);
        assert_eq!(oct.total_condos, 0.0);
    }

    #[test]
    fn test_sample_log_json_shape() {
        let months = parse_sales_log(SAMPLE);
        let json = serde_json::to_value(&months[0]).unwrap();

        assert_eq!(json["month"], "Sep");
        assert_eq!(json["totalVehicles"], 3000.0);
        assert_eq!(json["totalCondos"], 1500.0);
        assert_eq!(json["vehicles"][0]["type"], "vehicle");
        assert_eq!(json["vehicles"][0]["dateRange"], "05-11/05-12");
        assert_eq!(json["vehicles"][0]["rawLine"], "3000 : Alex dj 05-11/05-12* 913");
        assert_eq!(json["condos"][0]["type"], "condo");
        assert_eq!(json["condos"][0]["dateRange"], "");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_sales_log("").is_empty());
        assert!(parse_sales_log("   \n  \n").is_empty());
    }

    #[test]
    fn test_parse_is_idempotent() {
        assert_eq!(parse_sales_log(SAMPLE), parse_sales_log(SAMPLE));
    }

    #[test]
    fn test_header_sept_normalizes_to_sep() {
        let header = match_month_header("📅Sept 2025📅");
        assert_eq!(header, Some(("Sep".to_string(), "2025".to_string())));
    }

    #[test]
    fn test_header_with_inner_spaces_and_case() {
        let header = match_month_header("📅 NOVEMBER 2024 📅");
        assert_eq!(header, Some(("Nov".to_string(), "2024".to_string())));
    }

    #[test]
    fn test_unknown_month_kept_as_written() {
        let months = parse_sales_log("📅Sommer 2025📅\n100 : Ana A1");
        assert_eq!(months[0].month, "Sommer");
    }

    #[test]
    fn test_header_needs_four_digit_year() {
        assert!(match_month_header("📅Sept 25📅").is_none());
        assert!(match_month_header("Sept 2025").is_none());
    }

    #[test]
    fn test_entries_before_header_dropped() {
        let months = parse_sales_log("900 : Early Bird X1\n📅Jan 2025📅\n100 : Ana A1");
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].condos.len(), 1);
        assert_eq!(months[0].condos[0].customer, "Ana");
    }

    #[test]
    fn test_empty_month_not_emitted() {
        let months = parse_sales_log("📅Jan 2025📅\n📅Feb 2025📅\n100 : Ana A1\n📅Mar 2025📅");
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].month, "Feb");
    }

    #[test]
    fn test_skip_rules() {
        let log = "📅Jan 2025📅\n\
            💰 Total: 4500\n\
            rent = 3000 : nope\n\
            just some words\n\
            100 : Ana A1";
        let months = parse_sales_log(log);
        assert_eq!(months[0].condos.len(), 1);
        assert!(months[0].vehicles.is_empty());
    }

    #[test]
    fn test_order_preserved() {
        let log = "📅Jan 2025📅\n\
            1 : A 01-01/01-02* V1\n\
            2 : Ana A1\n\
            3 : B 02-01/02-03• V2\n\
            4 : Ben B1\n\
            5 : C 03-01/03-04* V3";
        let months = parse_sales_log(log);
        let vehicle_prices: Vec<&str> = months[0].vehicles.iter().map(|e| e.price.as_str()).collect();
        let condo_prices: Vec<&str> = months[0].condos.iter().map(|e| e.price.as_str()).collect();
        assert_eq!(vehicle_prices, vec!["1", "3", "5"]);
        assert_eq!(condo_prices, vec!["2", "4"]);
    }

    #[test]
    fn test_months_keep_encounter_order() {
        let months = parse_sales_log("📅Dec 2025📅\n1 : A a\n📅Jan 2024📅\n2 : B b");
        let names: Vec<&str> = months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(names, vec!["Dec", "Jan"]);
    }

    #[test]
    fn test_date_range_without_terminator_is_condo() {
        let entry = parse_entry("3000 : Alex 05-11/05-12 913");
        assert_eq!(entry.kind, EntryKind::Condo);
        assert_eq!(entry.customer, "Alex 05-11/05-12");
        assert_eq!(entry.vehicle, "913");
        assert_eq!(entry.date_range, "");
    }

    #[test]
    fn test_extra_colons_stay_in_remainder() {
        let entry = parse_entry("500 : Room 3 at 10:30 02-02/02-03* Vios");
        assert_eq!(entry.kind, EntryKind::Vehicle);
        assert_eq!(entry.price, "500");
        assert_eq!(entry.customer, "Room 3 at 10:30");
        assert_eq!(entry.vehicle, "Vios");
    }

    #[test]
    fn test_condo_single_token() {
        let entry = parse_entry("800 : Maria");
        assert_eq!(entry.customer, "Maria");
        assert_eq!(entry.vehicle, "");
    }

    #[test]
    fn test_condo_empty_remainder() {
        let entry = parse_entry("800 :");
        assert_eq!(entry.kind, EntryKind::Condo);
        assert_eq!(entry.customer, "");
        assert_eq!(entry.vehicle, "");
    }

    #[test]
    fn test_vehicle_without_trailing_id() {
        let entry = parse_entry("1200 : Joy 07-01/07-03*");
        assert_eq!(entry.kind, EntryKind::Vehicle);
        assert_eq!(entry.customer, "Joy");
        assert_eq!(entry.vehicle, "");
    }

    #[test]
    fn test_lenient_amount() {
        assert_eq!(lenient_amount("3000"), 3000.0);
        assert_eq!(lenient_amount("3,000"), 3000.0);
        assert_eq!(lenient_amount("1.500"), 1500.0);
        assert_eq!(lenient_amount("250php"), 250.0);
        assert_eq!(lenient_amount("-40"), -40.0);
        assert_eq!(lenient_amount("abc"), 0.0);
        assert_eq!(lenient_amount(""), 0.0);
        assert_eq!(lenient_amount("1e3"), 1000.0);
        assert_eq!(lenient_amount("Infinity"), 0.0);
    }

    #[test]
    fn test_totals_ignore_unparseable_prices() {
        let log = "📅Jan 2025📅\n\
            1,000 : Ana A1\n\
            free : Ben B1\n\
            2.500 : Cy 01-01/01-02* V1";
        let months = parse_sales_log(log);
        assert_eq!(months[0].total_condos, 1000.0);
        assert_eq!(months[0].total_vehicles, 2500.0);
        assert_eq!(months[0].condos[1].price, "free");
    }

    #[test]
    fn test_windows_line_endings() {
        let months = parse_sales_log("📅Jan 2025📅\r\n100 : Ana A1\r\n");
        assert_eq!(months[0].condos[0].vehicle, "A1");
        assert_eq!(months[0].condos[0].raw_line, "100 : Ana A1");
    }

    #[test]
    fn test_raw_line_keeps_surrounding_whitespace() {
        let months = parse_sales_log("📅Sep 2025📅\n   1500 : Maria Unit4B  \n\t900 : Jo 01-02/01-03* V1 ");
        let condo = &months[0].condos[0];
        assert_eq!(condo.raw_line, "   1500 : Maria Unit4B  ");
        assert_eq!(condo.price, "1500");
        assert_eq!(condo.customer, "Maria");
        assert_eq!(condo.vehicle, "Unit4B");

        let vehicle = &months[0].vehicles[0];
        assert_eq!(vehicle.raw_line, "\t900 : Jo 01-02/01-03* V1 ");
        assert_eq!(vehicle.price, "900");
        assert_eq!(vehicle.vehicle, "V1");
    }

    #[test]
    fn test_header_built_from_marker() {
        let line = format!("{m}Oct 2025{m}", m = MONTH_MARKER);
        assert_eq!(match_month_header(&line), Some(("Oct".to_string(), "2025".to_string())));
        assert!(match_month_header("🗓Oct 2025🗓").is_none());
    }

    #[test]
    fn test_indented_header_still_matches() {
        let months = parse_sales_log("   📅Oct 2025📅  \n100 : Ana A1");
        assert_eq!(months[0].month, "Oct");
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("Sep"), Some(9));
        assert_eq!(month_number("january"), Some(1));
        assert_eq!(month_number("DEC"), Some(12));
        assert_eq!(month_number("Sommer"), None);
    }
}

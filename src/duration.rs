// Provider elapsed-time parsing and display
// Durations arrive as ISO-8601 strings such as "PT2H35M"; anything we cannot read is
// reported as 0 seconds, which downstream code treats as "unknown".

const SECONDS_PER_DAY: u64 = 86_400;
const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_MINUTE: u64 = 60;

// Parse an ISO-8601 duration ("PT13H5M", "P1DT2H", "PT45M30S") into whole seconds.
// Seconds are accepted but ignored, results are minute-granular.
pub fn parse_duration(encoded: Option<&str>) -> u64 {
    let Some(encoded) = encoded.map(str::trim) else {
        return 0;
    };

    parse_components(encoded).unwrap_or(0)
}

fn parse_components(encoded: &str) -> Option<u64> {
    let rest = encoded.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, time),
        None => (rest, ""),
    };

    let mut total = 0u64;
    let mut seen_any = false;

    for (value, unit) in components(date_part)? {
        match unit {
            'D' => total = total.checked_add(value.checked_mul(SECONDS_PER_DAY)?)?,
            _ => return None,
        }
        seen_any = true;
    }

    for (value, unit) in components(time_part)? {
        match unit {
            'H' => total = total.checked_add(value.checked_mul(SECONDS_PER_HOUR)?)?,
            'M' => total = total.checked_add(value.checked_mul(SECONDS_PER_MINUTE)?)?,
            'S' => {}
            _ => return None,
        }
        seen_any = true;
    }

    seen_any.then_some(total)
}

// Split "2H35M" into [(2, 'H'), (35, 'M')]. Fractional seconds ("30.5S") are tolerated.
fn components(part: &str) -> Option<Vec<(u64, char)>> {
    let mut parsed = Vec::new();
    let mut digits = String::new();

    for ch in part.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            digits.push(ch);
            continue;
        }
        if digits.is_empty() {
            return None;
        }
        let whole = digits.split('.').next().unwrap_or_default();
        parsed.push((whole.parse().ok()?, ch));
        digits.clear();
    }

    digits.is_empty().then_some(parsed)
}

// "2h 35m" style label used on result cards; 0 is shown as "N/A"
pub fn format_duration(total_seconds: u64) -> String {
    if total_seconds == 0 {
        return "N/A".to_string();
    }
    let hours = total_seconds / SECONDS_PER_HOUR;
    let minutes = (total_seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    format!("{}h {}m", hours, minutes)
}

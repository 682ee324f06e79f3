use chrono::{Duration, NaiveDate};

/// Header cell → lookup key: strips invisible marks, collapses whitespace, lowercases.
pub(crate) fn normalize_header(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

/// Blank-aware trim for free-text cells.
pub(crate) fn clean_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses a date written day-first (`15/03/2025`, `15-03-25`, `15.03.2025 14:30`)
/// or ISO (`2025-03-15`, `2025-03-15T08:00:00`). Anything else is `None`.
pub(crate) fn parse_day_first(value: &str) -> Option<NaiveDate> {
    let token = value
        .trim()
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()
        .filter(|token| !token.is_empty())?;

    let parts: Vec<&str> = token.split(['/', '-', '.']).collect();
    let [first, second, third] = parts.as_slice() else {
        return None;
    };

    if !parts
        .iter()
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }

    let (year, month, day) = if first.len() == 4 {
        (*first, *second, *third)
    } else {
        (*third, *second, *first)
    };

    let year = match year.len() {
        2 => expand_two_digit_year(year.parse().ok()?),
        4 => year.parse().ok()?,
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

/// `68` and below land in the 2000s, `69` and above in the 1900s.
fn expand_two_digit_year(year: i32) -> i32 {
    if year <= 68 {
        2000 + year
    } else {
        1900 + year
    }
}

/// Spreadsheet serial day number (1900 date system) → date.
pub(crate) fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

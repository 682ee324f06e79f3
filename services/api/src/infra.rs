use agenda_report::ingest::RecordCache;
use agenda_report::scheduling::filters::FilterError;
use agenda_report::scheduling::{Clock, FilterSelection};
use chrono::{NaiveDate, Weekday};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) records: Arc<RecordCache>,
    pub(crate) clock: Arc<dyn Clock>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Blank, `all` and `Todos` all mean "no filter" for the dimension selects.
pub(crate) fn dimension_value(raw: Option<String>) -> Option<String> {
    let value = raw?.trim().to_string();
    if value.is_empty() || value.eq_ignore_ascii_case("all") || value.eq_ignore_ascii_case("todos")
    {
        None
    } else {
        Some(value)
    }
}

fn flag_enabled(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

/// Builds a selection from raw query pairs. `months` may be repeated (form
/// checkboxes) or comma-separated; unknown keys are ignored.
pub(crate) fn selection_from_query(
    params: &[(String, String)],
) -> Result<FilterSelection, FilterError> {
    let mut selection = FilterSelection::default();

    for (key, value) in params {
        match key.as_str() {
            "months" | "month" => {
                for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let month = part.parse::<u32>().map_err(|_| FilterError::InvalidValue {
                        field: "months",
                        value: part.to_string(),
                    })?;
                    selection.months.insert(month);
                }
            }
            "exclude_saturdays" => {
                if flag_enabled(value) {
                    selection.exclude_weekday(Weekday::Sat);
                }
            }
            "common_day_cutoff" => selection.common_day_cutoff = flag_enabled(value),
            "include_undated" => selection.include_undated = flag_enabled(value),
            "plan" => selection.plan = dimension_value(Some(value.clone())),
            "city" => selection.city = dimension_value(Some(value.clone())),
            "neighborhood" => selection.neighborhood = dimension_value(Some(value.clone())),
            "top_neighborhoods" => {
                let trimmed = value.trim();
                selection.top_neighborhoods = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.parse::<usize>().map_err(|_| {
                        FilterError::InvalidValue {
                            field: "top_neighborhoods",
                            value: value.clone(),
                        }
                    })?)
                };
            }
            _ => {}
        }
    }

    selection.validate()?;
    Ok(selection)
}

/// Inverse of [`selection_from_query`], used for links that carry the
/// current filters (the CSV export link on the dashboard page).
pub(crate) fn selection_to_query(selection: &FilterSelection) -> String {
    let mut pairs: Vec<(&str, String)> = Vec::new();
    if !selection.months.is_empty() {
        let months: Vec<String> = selection.months.iter().map(u32::to_string).collect();
        pairs.push(("months", months.join(",")));
    }
    if selection.excludes_saturdays() {
        pairs.push(("exclude_saturdays", "on".to_string()));
    }
    if selection.common_day_cutoff {
        pairs.push(("common_day_cutoff", "on".to_string()));
    }
    if selection.include_undated {
        pairs.push(("include_undated", "on".to_string()));
    }
    for (key, value) in [
        ("plan", &selection.plan),
        ("city", &selection.city),
        ("neighborhood", &selection.neighborhood),
    ] {
        if let Some(value) = value {
            pairs.push((key, value.clone()));
        }
    }
    if let Some(limit) = selection.top_neighborhoods {
        pairs.push(("top_neighborhoods", limit.to_string()));
    }

    pairs
        .into_iter()
        .map(|(key, value)| format!("{key}={}", encode_component(&value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b',' => encoded.push(','),
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}

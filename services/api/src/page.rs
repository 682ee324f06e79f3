use crate::infra::selection_to_query;
use agenda_report::ingest::RecordSet;
use agenda_report::scheduling::report::views::{decimal_comma, display_average};
use agenda_report::scheduling::DashboardReport;

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;background:#f4f6f8;color:#1f2933}\
header{background:#1f4e79;color:#fff;padding:16px 24px}\
header h1{margin:0;font-size:22px}header p{margin:4px 0 0;font-size:13px;opacity:.85}\
main{display:grid;grid-template-columns:280px 1fr;gap:20px;padding:20px 24px}\
form{background:#fff;border-radius:6px;padding:16px;align-self:start}\
form fieldset{border:none;padding:0;margin:0 0 14px}form legend{font-weight:600;margin-bottom:6px}\
form label{display:block;font-size:14px;margin:3px 0}form select,form input[type=number]{width:100%;padding:4px}\
button{background:#1f4e79;color:#fff;border:none;border-radius:4px;padding:8px 14px;cursor:pointer}\
section{background:#fff;border-radius:6px;padding:16px;margin-bottom:20px}\
section h2{margin:0 0 12px;font-size:17px}\
.cards{display:flex;gap:14px;flex-wrap:wrap}\
.card{flex:1;min-width:160px;background:#e8f0f8;border-radius:6px;padding:12px}\
.card strong{display:block;font-size:26px}.card span{font-size:13px;color:#52606d}\
.grid{display:grid;grid-template-columns:repeat(auto-fit,minmax(320px,1fr));gap:20px}\
.bar{display:grid;grid-template-columns:170px 1fr 60px;align-items:center;gap:8px;font-size:13px;margin:4px 0}\
.bar div{background:#d9e2ec;border-radius:3px;height:14px}\
.bar div i{display:block;background:#2f80c2;height:14px;border-radius:3px}\
.bar em{font-style:normal;text-align:right}\
table{border-collapse:collapse;width:100%;font-size:13px}\
th,td{border-bottom:1px solid #e4e7eb;padding:6px 8px;text-align:left}\
th{background:#f0f4f8}.note{font-size:13px;color:#52606d}\
.empty{color:#9aa5b1;font-style:italic}";

/// Full dashboard document for `GET /`.
pub(crate) fn render_dashboard(report: &DashboardReport, records: &RecordSet) -> String {
    let mut html = String::with_capacity(16 * 1024);
    html.push_str("<!DOCTYPE html><html lang=\"pt-BR\"><head><meta charset=\"utf-8\">");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">");
    html.push_str("<title>Scheduling records dashboard</title>");
    html.push_str(&format!("<style>{STYLE}</style></head><body>"));

    html.push_str("<header><h1>Scheduling records dashboard</h1>");
    html.push_str(&format!(
        "<p>{} file(s) loaded, {} record(s), {} without a completion date. Evaluated {}.</p></header>",
        records.files().len(),
        records.len(),
        records.undated(),
        report.today.format("%d/%m/%Y")
    ));

    html.push_str("<main>");
    push_filter_form(&mut html, report);
    html.push_str("<div>");
    push_metrics(&mut html, report);
    push_distributions(&mut html, report);
    push_day_series(&mut html, report);
    push_forecast(&mut html, report);
    push_records(&mut html, report);
    html.push_str("</div></main></body></html>");
    html
}

fn push_filter_form(html: &mut String, report: &DashboardReport) {
    let selection = &report.selection;
    let options = &report.options;

    html.push_str("<form method=\"get\" action=\"/\">");
    html.push_str("<fieldset><legend>Months</legend>");
    if options.months.is_empty() {
        html.push_str("<p class=\"empty\">No dated records</p>");
    }
    // No explicit selection means every month present.
    for month in &options.months {
        html.push_str(&format!(
            "<label><input type=\"checkbox\" name=\"months\" value=\"{}\"{}> {}</label>",
            month.month,
            checked(selection.months.is_empty() || selection.months.contains(&month.month)),
            month.name
        ));
    }
    html.push_str("</fieldset>");

    html.push_str("<fieldset><legend>Dates</legend>");
    html.push_str(&format!(
        "<label><input type=\"checkbox\" name=\"exclude_saturdays\" value=\"on\"{}> Exclude Saturdays</label>",
        checked(selection.excludes_saturdays())
    ));
    html.push_str(&format!(
        "<label><input type=\"checkbox\" name=\"common_day_cutoff\" value=\"on\"{}> Compare months up to a common day</label>",
        checked(selection.common_day_cutoff)
    ));
    html.push_str(&format!(
        "<label><input type=\"checkbox\" name=\"include_undated\" value=\"on\"{}> Include rows without a date</label>",
        checked(selection.include_undated)
    ));
    html.push_str("</fieldset>");

    push_select(html, "plan", "Plan", &options.plans, selection.plan.as_deref());
    push_select(html, "city", "City", &options.cities, selection.city.as_deref());
    push_select(
        html,
        "neighborhood",
        "Neighborhood",
        &options.neighborhoods,
        selection.neighborhood.as_deref(),
    );

    if options.neighborhood_limit_max > 0 {
        html.push_str(&format!(
            "<fieldset><legend>Top neighborhoods</legend>\
             <input type=\"number\" name=\"top_neighborhoods\" min=\"1\" max=\"{}\" value=\"{}\"></fieldset>",
            options.neighborhood_limit_max, report.neighborhood_limit
        ));
    }

    html.push_str("<button type=\"submit\">Apply filters</button>");
    html.push_str(&format!(
        "<p class=\"note\"><a href=\"/api/v1/export?{}\">Download filtered CSV</a></p>",
        escape_html(&selection_to_query(selection))
    ));
    html.push_str("</form>");
}

fn push_select(
    html: &mut String,
    name: &str,
    legend: &str,
    values: &[String],
    current: Option<&str>,
) {
    html.push_str(&format!(
        "<fieldset><legend>{legend}</legend><select name=\"{name}\"><option value=\"all\">All</option>"
    ));
    for value in values {
        let escaped = escape_html(value);
        let selected = if current == Some(value.as_str()) {
            " selected"
        } else {
            ""
        };
        html.push_str(&format!(
            "<option value=\"{escaped}\"{selected}>{escaped}</option>"
        ));
    }
    html.push_str("</select></fieldset>");
}

fn push_metrics(html: &mut String, report: &DashboardReport) {
    let metrics = &report.metrics;
    html.push_str("<section><h2>Summary</h2><div class=\"cards\">");
    html.push_str(&format!(
        "<div class=\"card\"><strong>{}</strong><span>Total records</span></div>",
        metrics.total_records
    ));
    html.push_str(&format!(
        "<div class=\"card\"><strong>{}</strong><span>Days with records</span></div>",
        metrics.valid_days
    ));
    html.push_str(&format!(
        "<div class=\"card\"><strong>{}</strong><span>Daily average</span></div>",
        display_average(metrics.daily_average)
    ));
    html.push_str("</div>");
    if let Some(day) = report.cutoff_day {
        html.push_str(&format!(
            "<p class=\"note\">Every month is trimmed to day {day}.</p>"
        ));
    }
    html.push_str("</section>");
}

fn push_distributions(html: &mut String, report: &DashboardReport) {
    html.push_str("<div class=\"grid\">");

    html.push_str("<section><h2>Plan tiers</h2>");
    if report.tier_distribution.is_empty() {
        html.push_str("<p class=\"empty\">No classified plans</p>");
    }
    let tier_max = report
        .tier_distribution
        .iter()
        .map(|entry| entry.count)
        .max()
        .unwrap_or(0);
    for entry in &report.tier_distribution {
        push_bar(
            html,
            entry.tier_label,
            entry.count,
            tier_max,
            &format!("{}%", decimal_comma(entry.share_pct, 1)),
        );
    }
    html.push_str("</section>");

    let sections = [
        ("Plans", &report.plan_distribution),
        ("Cities", &report.city_distribution),
        ("Technologies", &report.technology_distribution),
    ];
    for (title, entries) in sections {
        push_count_section(html, title, entries.iter().map(|e| (e.label.as_str(), e.count)));
    }
    push_count_section(
        html,
        &format!("Top {} neighborhoods", report.neighborhood_limit),
        report
            .neighborhood_distribution
            .iter()
            .map(|e| (e.label.as_str(), e.count)),
    );

    html.push_str("</div>");
}

fn push_count_section<'a, I>(html: &mut String, title: &str, entries: I)
where
    I: Iterator<Item = (&'a str, usize)>,
{
    let entries: Vec<(&str, usize)> = entries.collect();
    html.push_str(&format!("<section><h2>{}</h2>", escape_html(title)));
    if entries.is_empty() {
        html.push_str("<p class=\"empty\">No records</p>");
    }
    let max = entries.iter().map(|(_, count)| *count).max().unwrap_or(0);
    for (label, count) in entries {
        push_bar(html, label, count, max, &count.to_string());
    }
    html.push_str("</section>");
}

fn push_bar(html: &mut String, label: &str, count: usize, max: usize, value: &str) {
    let width = if max == 0 {
        0.0
    } else {
        count as f64 * 100.0 / max as f64
    };
    html.push_str(&format!(
        "<div class=\"bar\"><span>{}</span><div><i style=\"width:{width:.1}%\"></i></div><em>{}</em></div>",
        escape_html(label),
        escape_html(value)
    ));
}

fn push_day_series(html: &mut String, report: &DashboardReport) {
    html.push_str("<section><h2>Records by day of month</h2>");
    if report.day_of_month.is_empty() {
        html.push_str("<p class=\"empty\">No dated records</p>");
    }
    let max = report
        .day_of_month
        .iter()
        .map(|entry| entry.count)
        .max()
        .unwrap_or(0);
    for entry in &report.day_of_month {
        push_bar(
            html,
            &format!("Day {}", entry.day),
            entry.count,
            max,
            &entry.count.to_string(),
        );
    }
    html.push_str("</section>");
}

fn push_forecast(html: &mut String, report: &DashboardReport) {
    html.push_str("<section><h2>Month-end forecast</h2>");
    if report.forecast.is_empty() {
        html.push_str("<p class=\"empty\">No dated records</p></section>");
        return;
    }
    html.push_str(
        "<table><thead><tr><th>Month</th><th>Status</th><th>Records</th>\
         <th>Days collected</th><th>Expected days</th><th>Daily average</th>\
         <th>Projected total</th></tr></thead><tbody>",
    );
    for month in &report.forecast {
        let projected = month
            .projected_total
            .map(|total| total.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&month.label),
            month.status.label(),
            month.records,
            month.collected_days,
            month.expected_days,
            display_average(month.daily_average),
            projected
        ));
    }
    html.push_str("</tbody></table>");
    html.push_str(
        "<p class=\"note\">Expected days exclude Sundays. Completed months project what was collected.</p>",
    );
    html.push_str("</section>");
}

fn push_records(html: &mut String, report: &DashboardReport) {
    html.push_str(&format!(
        "<section><h2>Filtered records ({})</h2>",
        report.records.len()
    ));
    if report.records.is_empty() {
        html.push_str("<p class=\"empty\">No records match the current filters.</p></section>");
        return;
    }
    html.push_str(
        "<table><thead><tr><th>Completed on</th><th>Neighborhood</th><th>City</th>\
         <th>Plan</th><th>Technology</th><th>Tier</th></tr></thead><tbody>",
    );
    for row in &report.records {
        let tier = if row.tier.is_classified() {
            row.tier.label()
        } else {
            ""
        };
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&row.completed_on_label),
            escape_html(row.neighborhood.as_deref().unwrap_or("")),
            escape_html(row.city.as_deref().unwrap_or("")),
            escape_html(row.plan.as_deref().unwrap_or("")),
            escape_html(row.technology.as_deref().unwrap_or("")),
            escape_html(tier)
        ));
    }
    html.push_str("</tbody></table></section>");
}

fn checked(on: bool) -> &'static str {
    if on {
        " checked"
    } else {
        ""
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

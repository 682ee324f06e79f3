use super::normalizer::{clean_text, normalize_header, parse_day_first, serial_to_date};
use super::IngestError;
use crate::scheduling::SchedulingRecord;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use std::io::Read;
use std::path::Path;

const DATE_HEADERS: &[&str] = &["data da finalização", "data da finalizacao", "completion date"];
const PLAN_HEADERS: &[&str] = &["plano", "plan"];
const CITY_HEADERS: &[&str] = &["cidade", "city"];
const NEIGHBORHOOD_HEADERS: &[&str] = &["bairro", "neighborhood"];
const TECHNOLOGY_HEADERS: &[&str] = &["tecnologia", "technology"];

pub(crate) const DATE_COLUMN: &str = "Data da Finalização";

/// Cell value after the source format has been stripped away.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl RawCell {
    fn as_date(&self) -> Option<NaiveDate> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(text) => parse_day_first(text),
            RawCell::Number(serial) => serial_to_date(*serial),
            RawCell::Date(date) => Some(*date),
        }
    }

    fn as_text(&self) -> Option<String> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(text) => clean_text(text),
            RawCell::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                Some(format!("{}", *value as i64))
            }
            RawCell::Number(value) => Some(value.to_string()),
            RawCell::Date(date) => Some(date.format("%d/%m/%Y").to_string()),
        }
    }
}

impl From<&Data> for RawCell {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) => RawCell::Empty,
            Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => {
                RawCell::Text(text.clone())
            }
            Data::Float(value) => RawCell::Number(*value),
            Data::Int(value) => RawCell::Number(*value as f64),
            Data::Bool(value) => RawCell::Text(value.to_string()),
            Data::DateTime(value) => value
                .as_datetime()
                .map(|datetime| RawCell::Date(datetime.date()))
                .unwrap_or(RawCell::Empty),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColumnMap {
    date: usize,
    plan: Option<usize>,
    city: Option<usize>,
    neighborhood: Option<usize>,
    technology: Option<usize>,
}

impl ColumnMap {
    /// Locates the known columns; only the completion date is mandatory.
    pub(crate) fn from_headers<S: AsRef<str>>(headers: &[S]) -> Option<Self> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|header| normalize_header(header.as_ref()))
            .collect();
        let find = |aliases: &[&str]| {
            normalized
                .iter()
                .position(|header| aliases.contains(&header.as_str()))
        };

        Some(Self {
            date: find(DATE_HEADERS)?,
            plan: find(PLAN_HEADERS),
            city: find(CITY_HEADERS),
            neighborhood: find(NEIGHBORHOOD_HEADERS),
            technology: find(TECHNOLOGY_HEADERS),
        })
    }

    fn record(&self, row: &[RawCell], source: &str) -> SchedulingRecord {
        let text = |index: Option<usize>| index.and_then(|i| row.get(i)).and_then(RawCell::as_text);
        SchedulingRecord {
            completed_on: row.get(self.date).and_then(RawCell::as_date),
            plan: text(self.plan),
            city: text(self.city),
            neighborhood: text(self.neighborhood),
            technology: text(self.technology),
            source: source.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ParsedSheet {
    pub(crate) records: Vec<SchedulingRecord>,
    pub(crate) undated: usize,
}

fn collect_rows<I>(columns: ColumnMap, rows: I, source: &str) -> ParsedSheet
where
    I: IntoIterator<Item = Vec<RawCell>>,
{
    let mut sheet = ParsedSheet::default();
    for row in rows {
        if row.iter().all(|cell| *cell == RawCell::Empty) {
            continue;
        }
        let record = columns.record(&row, source);
        if record.completed_on.is_none() {
            sheet.undated += 1;
        }
        sheet.records.push(record);
    }
    sheet
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn missing_date_column(path: &Path) -> IngestError {
    IngestError::MissingColumn {
        path: path.to_path_buf(),
        column: DATE_COLUMN,
    }
}

/// Reads the first worksheet of an Excel/ODS workbook.
pub(crate) fn read_workbook(path: &Path) -> Result<ParsedSheet, IngestError> {
    let workbook_error = |source| IngestError::Workbook {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(workbook_error)?,
        None => return Err(missing_date_column(path)),
    };

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header| {
            header
                .iter()
                .map(|cell| RawCell::from(cell).as_text().unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();
    let columns = ColumnMap::from_headers(&headers).ok_or_else(|| missing_date_column(path))?;

    let source = source_name(path);
    Ok(collect_rows(
        columns,
        rows.map(|row| row.iter().map(RawCell::from).collect()),
        &source,
    ))
}

/// Reads a delimited export with a header row.
pub(crate) fn read_csv<R: Read>(reader: R, path: &Path) -> Result<ParsedSheet, IngestError> {
    let csv_error = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(csv_error)?.clone();
    let header_names: Vec<&str> = headers.iter().collect();
    let columns =
        ColumnMap::from_headers(&header_names).ok_or_else(|| missing_date_column(path))?;

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(csv_error)?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        RawCell::Empty
                    } else {
                        RawCell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(collect_rows(columns, rows, &source_name(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "Data da Finalização,Plano,Cidade,Bairro,Tecnologia\n";

    fn parse(body: &str) -> Result<ParsedSheet, IngestError> {
        read_csv(Cursor::new(body.to_string()), Path::new("planilha.csv"))
    }

    #[test]
    fn csv_rows_become_records() {
        let sheet = parse(&format!(
            "{HEADER}05/03/2025,Fibra 500 Mega,Recife,Boa Vista,FTTH\n\
             ,Fibra 800 Mega,Olinda,,\n\
             ,,,,\n"
        ))
        .expect("csv parses");

        assert_eq!(sheet.records.len(), 2);
        assert_eq!(sheet.undated, 1);

        let first = &sheet.records[0];
        assert_eq!(first.completed_on, NaiveDate::from_ymd_opt(2025, 3, 5));
        assert_eq!(first.plan.as_deref(), Some("Fibra 500 Mega"));
        assert_eq!(first.neighborhood.as_deref(), Some("Boa Vista"));
        assert_eq!(first.source, "planilha.csv");

        let second = &sheet.records[1];
        assert_eq!(second.completed_on, None);
        assert_eq!(second.neighborhood, None);
        assert_eq!(second.technology, None);
    }

    #[test]
    fn columns_are_found_in_any_order_and_case() {
        let sheet = parse("BAIRRO,data da finalizacao,PLANO\nCentro,2025-03-05,500\n")
            .expect("csv parses");
        let record = &sheet.records[0];
        assert_eq!(record.completed_on, NaiveDate::from_ymd_opt(2025, 3, 5));
        assert_eq!(record.plan.as_deref(), Some("500"));
        assert_eq!(record.city, None);
    }

    #[test]
    fn missing_date_column_is_reported() {
        let error = parse("Plano,Cidade\n500,Recife\n").expect_err("date column required");
        match error {
            IngestError::MissingColumn { column, .. } => assert_eq!(column, DATE_COLUMN),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_dates_become_none() {
        let sheet = parse(&format!("{HEADER}amanhã,500,Recife,Centro,FTTH\n")).expect("parses");
        assert_eq!(sheet.records[0].completed_on, None);
        assert_eq!(sheet.undated, 1);
    }

    #[test]
    fn numeric_cells_render_without_fraction() {
        assert_eq!(RawCell::Number(500.0).as_text().as_deref(), Some("500"));
        assert_eq!(RawCell::Number(1.5).as_text().as_deref(), Some("1.5"));
        assert_eq!(
            RawCell::Number(45_721.0).as_date(),
            NaiveDate::from_ymd_opt(2025, 3, 5)
        );
        assert_eq!(RawCell::Text("   ".to_string()).as_text(), None);
    }

    #[test]
    fn calamine_cells_convert() {
        assert_eq!(RawCell::from(&Data::Empty), RawCell::Empty);
        assert_eq!(
            RawCell::from(&Data::String("Recife".to_string())),
            RawCell::Text("Recife".to_string())
        );
        assert_eq!(RawCell::from(&Data::Int(800)), RawCell::Number(800.0));
    }
}

use super::domain::SchedulingRecord;
use serde::Serialize;
use std::io::Write;

pub const EXPORT_FILE_NAME: &str = "agendamentos_filtrados.csv";

pub fn export_mime() -> mime::Mime {
    mime::TEXT_CSV_UTF_8
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to encode CSV row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV output: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Data da Finalização")]
    completed_on: Option<String>,
    #[serde(rename = "Bairro")]
    neighborhood: Option<&'a str>,
    #[serde(rename = "Cidade")]
    city: Option<&'a str>,
    #[serde(rename = "Plano")]
    plan: Option<&'a str>,
    #[serde(rename = "Tecnologia")]
    technology: Option<&'a str>,
    #[serde(rename = "Plano Principal")]
    tier: Option<&'static str>,
}

impl<'a> ExportRow<'a> {
    fn from_record(record: &'a SchedulingRecord) -> Self {
        let tier = record.tier();
        Self {
            completed_on: record
                .completed_on
                .map(|date| date.format("%Y-%m-%d").to_string()),
            neighborhood: record.neighborhood.as_deref(),
            city: record.city.as_deref(),
            plan: record.plan.as_deref(),
            technology: record.technology.as_deref(),
            tier: tier.is_classified().then_some(tier.label()),
        }
    }
}

/// Writes the filtered records as UTF-8 CSV, header row first.
pub fn write_csv<W: Write>(writer: W, records: &[&SchedulingRecord]) -> Result<(), ExportError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record([
        "Data da Finalização",
        "Bairro",
        "Cidade",
        "Plano",
        "Tecnologia",
        "Plano Principal",
    ])?;
    for record in records {
        csv_writer.serialize(ExportRow::from_record(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_bytes(records: &[&SchedulingRecord]) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, records)?;
    Ok(buffer)
}

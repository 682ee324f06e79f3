use agenda_report::ingest::{IngestError, SpreadsheetLoader};
use agenda_report::scheduling::PlanTier;
use chrono::NaiveDate;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::path::Path;

const HEADERS: [&str; 5] = ["Data da Finalização", "Plano", "Cidade", "Bairro", "Tecnologia"];

fn date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn write_outubro(path: &Path) {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("dd/mm/yyyy");
    let sheet = workbook.add_worksheet();

    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write(0, col as u16, *header).expect("header");
    }

    // Native date cell.
    let first = ExcelDateTime::from_ymd(2025, 10, 1).expect("valid date");
    sheet
        .write_with_format(1, 0, &first, &date_format)
        .expect("date cell");
    sheet.write(1, 1, "Fibra 800 Mega").expect("plan");

    // Bare serial number for 2025-10-02.
    sheet.write(2, 0, 45932).expect("serial cell");
    sheet.write(2, 1, "Internet 1 GB").expect("plan");

    // Day-first text date and a numeric plan.
    sheet.write(3, 0, "03/10/2025").expect("text date");
    sheet.write(3, 1, 500).expect("numeric plan");

    sheet.write(5, 0, "sem data").expect("undated");
    sheet.write(5, 1, "Fibra 500 Mega").expect("plan");

    for row in [1, 2, 3, 5] {
        sheet.write(row, 2, "Recife").expect("city");
        sheet.write(row, 3, "Boa Vista").expect("neighborhood");
        sheet.write(row, 4, "FTTH").expect("technology");
    }

    workbook.save(path).expect("save workbook");
}

#[test]
fn loads_first_sheet_of_xlsx_workbook() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_outubro(&dir.path().join("outubro.xlsx"));

    let set = SpreadsheetLoader::from_dir(dir.path()).expect("load workbook");
    assert_eq!(set.files().len(), 1);
    assert_eq!(set.len(), 4);
    assert_eq!(set.undated(), 1);

    let records = set.records();
    let dates: Vec<Option<NaiveDate>> = records.iter().map(|r| r.completed_on).collect();
    assert_eq!(
        dates,
        vec![date(2025, 10, 1), date(2025, 10, 2), date(2025, 10, 3), None]
    );

    assert_eq!(records[2].plan.as_deref(), Some("500"));
    assert_eq!(records[2].tier(), PlanTier::Tier500);
    assert_eq!(records[0].tier(), PlanTier::Tier800);
    assert_eq!(records[1].tier(), PlanTier::Tier1Gig);
    assert_eq!(records[0].city.as_deref(), Some("Recife"));
    assert_eq!(records[0].source, "outubro.xlsx");
}

#[test]
fn workbook_without_date_column_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sem_data.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write(0, 0, "Plano").expect("header");
    sheet.write(1, 0, "Fibra 500 Mega").expect("plan");
    workbook.save(&path).expect("save workbook");

    match SpreadsheetLoader::from_dir(dir.path()) {
        Err(IngestError::MissingColumn { column, .. }) => {
            assert_eq!(column, "Data da Finalização")
        }
        other => panic!("expected missing column error, got {other:?}"),
    }
}

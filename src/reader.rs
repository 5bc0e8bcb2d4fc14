use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::config::{AlertConfig, ColumnLayout};
use crate::error::IngestError;
use crate::models::{AgreementRecord, LifecycleStage};

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y年%m月%d日", "%Y.%m.%d"];

#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub records: Vec<AgreementRecord>,
    pub warnings: Vec<IngestError>,
}

pub fn read_agreements(path: &Path, config: &AlertConfig) -> anyhow::Result<ImportOutcome> {
    let mut reader = open(path, config)?;
    let mut outcome = ImportOutcome::default();

    for (index, result) in reader.records().enumerate() {
        if index < config.skip_rows {
            continue;
        }
        let line = index as u64 + 1;

        let row = match result {
            Ok(row) => row,
            Err(source) => {
                outcome.warnings.push(IngestError::Csv { line, source });
                continue;
            }
        };
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let record = parse_row(&row, line, config, &mut outcome.warnings);
        tracing::trace!(
            line,
            id = record.id,
            system = %record.system_name,
            person = %record.responsible_person,
            "parsed row"
        );
        outcome.records.push(record);
    }

    for warning in &outcome.warnings {
        tracing::warn!("{warning}");
    }
    tracing::info!(
        path = %path.display(),
        records = outcome.records.len(),
        warnings = outcome.warnings.len(),
        "read agreement records"
    );

    Ok(outcome)
}

pub fn filter_department(
    records: Vec<AgreementRecord>,
    department: Option<&str>,
) -> Vec<AgreementRecord> {
    let Some(department) = department else {
        return records;
    };

    let total = records.len();
    let kept: Vec<AgreementRecord> = records
        .into_iter()
        .filter(|record| record.responsible_department == department)
        .collect();
    tracing::info!(department, kept = kept.len(), total, "filtered by department");
    kept
}

fn open(path: &Path, config: &AlertConfig) -> anyhow::Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(config.delimiter_byte()?)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))
}

fn parse_row(
    row: &StringRecord,
    line: u64,
    config: &AlertConfig,
    warnings: &mut Vec<IngestError>,
) -> AgreementRecord {
    let columns: &ColumnLayout = &config.columns;
    let mut date = |index: usize, column: &'static str| {
        let value = cell(row, index);
        match parse_date(value, &config.blank_date_markers) {
            DateCell::Date(date) => Some(date),
            DateCell::Blank => None,
            DateCell::Invalid => {
                warnings.push(IngestError::UnparseableDate {
                    line,
                    column,
                    value: value.to_string(),
                });
                None
            }
        }
    };

    let previous_agreement_expiry =
        date(columns.previous_agreement_expiry, "previous agreement expiry");
    let planned_approval_date = date(columns.planned_approval_date, "planned approval");
    let planned_purchase_date = date(columns.planned_purchase_date, "planned purchase");
    let planned_contract_date = date(columns.planned_contract_date, "planned contract");

    AgreementRecord {
        id: parse_id(cell(row, columns.id)),
        system_name: cell(row, columns.system_name).to_string(),
        business_department: cell(row, columns.business_department).to_string(),
        responsible_department: cell(row, columns.responsible_department).to_string(),
        previous_agreement_expiry,
        planned_approval_date,
        planned_purchase_date,
        planned_contract_date,
        responsible_person: cell(row, columns.responsible_person).to_string(),
        progress: LifecycleStage::from_label(cell(row, columns.current_progress)),
    }
}

fn cell(row: &StringRecord, index: usize) -> &str {
    row.get(index).map(str::trim).unwrap_or("")
}

/// Sequence numbers are informational; blanks and junk read as 0.
fn parse_id(value: &str) -> i32 {
    value
        .parse::<i32>()
        .ok()
        .or_else(|| {
            value
                .parse::<f64>()
                .ok()
                .filter(|number| number.fract() == 0.0 && number.abs() <= f64::from(i32::MAX))
                .map(|number| number as i32)
        })
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCell {
    Blank,
    Date(NaiveDate),
    Invalid,
}

pub fn parse_date(value: &str, blank_markers: &[String]) -> DateCell {
    let value = value.trim();
    if value.is_empty() || blank_markers.iter().any(|marker| marker == value) {
        return DateCell::Blank;
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return DateCell::Date(datetime.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return DateCell::Date(date);
        }
    }

    DateCell::Invalid
}

/// Header text for each column, in `ColumnLayout::positions` order.
const KNOWN_HEADERS: [&str; 10] = [
    "序号",
    "系统名称",
    "业务归口管理部门",
    "责任科室",
    "上期协议到期",
    "计划完成立项日期",
    "计划完成采购日期",
    "计划合同签订日期",
    "责任经办",
    "当前进度",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLocation {
    pub header: &'static str,
    pub field: &'static str,
    pub configured: usize,
    /// Zero-based (row, column) of the first cell containing the header text.
    pub found: Option<(usize, usize)>,
}

impl HeaderLocation {
    pub fn matches_config(&self) -> bool {
        self.found.is_some_and(|(_, column)| column == self.configured)
    }
}

#[derive(Debug, Default)]
pub struct ColumnSurvey {
    pub preview: Vec<Vec<String>>,
    pub headers: Vec<HeaderLocation>,
}

/// Reads the first `rows` rows and reports where each known header sits
/// relative to the configured layout.
pub fn survey_columns(
    path: &Path,
    config: &AlertConfig,
    rows: usize,
) -> anyhow::Result<ColumnSurvey> {
    let mut reader = open(path, config)?;
    let mut preview = Vec::new();

    for result in reader.records().take(rows) {
        let row = result.with_context(|| format!("failed to read {}", path.display()))?;
        preview.push(row.iter().map(|value| value.trim().to_string()).collect());
    }

    let headers = config
        .columns
        .positions()
        .into_iter()
        .zip(KNOWN_HEADERS)
        .map(|((field, configured), header)| HeaderLocation {
            header,
            field,
            configured,
            found: locate(&preview, header),
        })
        .collect();

    Ok(ColumnSurvey { preview, headers })
}

fn locate(rows: &[Vec<String>], header: &str) -> Option<(usize, usize)> {
    rows.iter().enumerate().find_map(|(row_index, row)| {
        row.iter()
            .position(|value| value.contains(header))
            .map(|column| (row_index, column))
    })
}

/// Spreadsheet-style column name: 0 → A, 25 → Z, 26 → AA.
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = index + 1;
    while remaining > 0 {
        let offset = (remaining - 1) % 26;
        letters.push(char::from(b'A' + offset as u8));
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "序号,系统名称,业务归口管理部门,责任科室,框架协议名称,项目起止时间,签订期限(月),单号,工作量,金额,是否签订,集中采购,上期协议到期,计划完成立项日期,计划完成采购日期,计划合同签订日期,责任经办,当前进度";

    fn write_sheet(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "2026年有时限要求事项清单").unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file
    }

    fn markers() -> Vec<String> {
        AlertConfig::default().blank_date_markers
    }

    #[test]
    fn parses_supported_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 4, 8).unwrap();
        for value in [
            "2026-04-08",
            "2026/04/08",
            "2026-04-08 17:45:00",
            "2026/4/8 08:00:00",
            "2026年04月08日",
            "2026.04.08",
        ] {
            assert_eq!(parse_date(value, &markers()), DateCell::Date(expected), "{value}");
        }
    }

    #[test]
    fn blank_and_marker_dates_are_absent() {
        assert_eq!(parse_date("", &markers()), DateCell::Blank);
        assert_eq!(parse_date("上期未签订", &markers()), DateCell::Blank);
        assert_eq!(parse_date(" N/A ", &markers()), DateCell::Blank);
        assert_eq!(parse_date("next spring", &markers()), DateCell::Invalid);
        assert_eq!(parse_date("2026-02-30", &markers()), DateCell::Invalid);
    }

    #[test]
    fn ids_default_to_zero() {
        assert_eq!(parse_id("12"), 12);
        assert_eq!(parse_id("12.0"), 12);
        assert_eq!(parse_id("12.5"), 0);
        assert_eq!(parse_id(""), 0);
        assert_eq!(parse_id("n/a"), 0);
    }

    #[test]
    fn reads_records_after_title_rows() {
        let file = write_sheet(&[
            "1,Billing,运营管理部,运营业务开发科,,,,,,,,,2026-06-30,2026-04-15,,,Lin,资料整理中",
            ",,,,,,,,,,,,,,,,,",
            "2,Portal,渠道部,其他科,,,,,,,,,上期未签订,2026/05/01,,,Zhou,",
        ]);

        let outcome = read_agreements(file.path(), &AlertConfig::default()).unwrap();
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.records.len(), 2);

        let first = &outcome.records[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.system_name, "Billing");
        assert_eq!(first.responsible_person, "Lin");
        assert_eq!(first.progress, LifecycleStage::DataPrep);
        assert_eq!(first.previous_agreement_expiry, NaiveDate::from_ymd_opt(2026, 6, 30));

        let second = &outcome.records[1];
        assert_eq!(second.previous_agreement_expiry, None);
        assert_eq!(second.planned_approval_date, NaiveDate::from_ymd_opt(2026, 5, 1));
        assert_eq!(second.progress, LifecycleStage::NotStarted);
    }

    #[test]
    fn short_rows_and_bad_dates_still_produce_records() {
        let file = write_sheet(&["3,Gateway,运营管理部,运营业务开发科,,,,,,,,,soon"]);

        let outcome = read_agreements(file.path(), &AlertConfig::default()).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].responsible_person, "");
        assert_eq!(outcome.records[0].previous_agreement_expiry, None);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(matches!(
            &outcome.warnings[0],
            IngestError::UnparseableDate { line: 3, value, .. } if value == "soon"
        ));
    }

    #[test]
    fn filters_to_configured_department() {
        let file = write_sheet(&[
            "1,Billing,运营管理部,运营业务开发科,,,,,,,,,,,,,Lin,",
            "2,Portal,渠道部,其他科,,,,,,,,,,,,,Zhou,",
        ]);
        let records = read_agreements(file.path(), &AlertConfig::default())
            .unwrap()
            .records;

        let kept = filter_department(records.clone(), Some("运营业务开发科"));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].responsible_person, "Lin");
        assert_eq!(filter_department(records, None).len(), 2);
    }

    #[test]
    fn survey_reports_header_positions() {
        let file = write_sheet(&[]);
        let survey = survey_columns(file.path(), &AlertConfig::default(), 5).unwrap();

        assert_eq!(survey.preview.len(), 2);
        let person = survey
            .headers
            .iter()
            .find(|location| location.field == "responsible_person")
            .unwrap();
        assert_eq!(person.found, Some((1, 16)));
        assert!(person.matches_config());
        assert!(survey.headers.iter().all(HeaderLocation::matches_config));
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(16), "Q");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
    }
}

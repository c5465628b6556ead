//! Attendance extraction: monthly present/total counts plus an overall
//! percentage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::browser::{diag, PortalContext};
use crate::config::Config;
use crate::error::Result;
use crate::extract::clean::{clean_rows, is_junk, looks_like_header, normalize_number};
use crate::extract::{
    json_rows, navigate_with_retry, num_field, run_strategies, settle_templates, str_field,
    Domain, Extract, ExtractedRecord, Parsed, RecordPayload, Strategy, StrategyData, StrategyKind,
    Verdict,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthAttendance {
    pub month: String,
    pub present: u32,
    pub total: u32,
    pub percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttendanceReport {
    pub months: Vec<MonthAttendance>,
    pub overall_percent: f64,
}

fn month_entry(month: String, present: f64, total: f64) -> MonthAttendance {
    let percent = if total > 0.0 { present / total * 100.0 } else { 0.0 };
    MonthAttendance {
        month,
        present: present.max(0.0) as u32,
        total: total.max(0.0) as u32,
        percent,
    }
}

fn report_from(months: Vec<MonthAttendance>) -> AttendanceReport {
    let present: u32 = months.iter().map(|m| m.present).sum();
    let total: u32 = months.iter().map(|m| m.total).sum();
    let overall_percent = if total > 0 {
        f64::from(present) / f64::from(total) * 100.0
    } else {
        0.0
    };
    AttendanceReport { months, overall_percent }
}

fn parse_json(value: &JsonValue) -> Parsed<AttendanceReport> {
    let Some(items) = json_rows(value) else {
        return Parsed::Unparsed;
    };
    if items.is_empty() {
        return Parsed::NoData;
    }
    let mut months = Vec::new();
    for item in items {
        let Some(month) = str_field(item, &["month", "Month", "monthName"]) else {
            continue;
        };
        let present = num_field(item, &["present", "Present", "attended"]).unwrap_or(0.0);
        let total = num_field(item, &["total", "Total", "working"]).unwrap_or(0.0);
        months.push(month_entry(month, present, total));
    }
    if months.is_empty() {
        Parsed::Unparsed
    } else {
        Parsed::Data(report_from(months))
    }
}

fn parse_rows(rows: &[Vec<String>]) -> Parsed<AttendanceReport> {
    let cleaned = clean_rows(rows);
    let data_rows: Vec<&Vec<String>> =
        cleaned.iter().filter(|row| !looks_like_header(row)).collect();
    if data_rows.is_empty() {
        return Parsed::NoData;
    }
    let mut months = Vec::new();
    for row in data_rows {
        if row.len() < 3 || is_junk(&row[0]) {
            continue;
        }
        months.push(month_entry(
            row[0].clone(),
            normalize_number(&row[1]),
            normalize_number(&row[2]),
        ));
    }
    if months.is_empty() {
        Parsed::Unparsed
    } else {
        Parsed::Data(report_from(months))
    }
}

pub struct AttendanceExtractor {
    config: Config,
    http: reqwest::Client,
}

impl AttendanceExtractor {
    pub fn new(config: Config) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    fn strategies(&self) -> Vec<Strategy> {
        vec![
            Strategy {
                name: "backend-json",
                kind: StrategyKind::BackendJson {
                    api_path: self.config.attendance_api_path.clone(),
                },
            },
            Strategy {
                name: "dom-table",
                kind: StrategyKind::DomTable { table_selector: "#tblAttendance" },
            },
        ]
    }
}

#[async_trait]
impl Extract<PortalContext> for AttendanceExtractor {
    fn domain(&self) -> Domain {
        Domain::Attendance
    }

    async fn extract(&self, ctx: &PortalContext) -> Result<ExtractedRecord> {
        let page = ctx.page();
        navigate_with_retry(&self.config, page, &self.config.url(&self.config.attendance_path))
            .await?;
        settle_templates(&self.config, page).await;

        let verdict = run_strategies(
            &self.config,
            &self.http,
            page,
            Domain::Attendance,
            &self.strategies(),
            |data| match data {
                StrategyData::Json(value) => parse_json(value),
                StrategyData::Rows(rows) => parse_rows(rows),
            },
        )
        .await?;

        Ok(match verdict {
            Verdict::Data(report) => {
                ExtractedRecord::data(Domain::Attendance, RecordPayload::Attendance(report))
            }
            Verdict::NoData => ExtractedRecord::no_data(Domain::Attendance),
            Verdict::Unparsed => {
                let screenshot = diag::capture(&self.config, page, "attendance_unparsed").await;
                ExtractedRecord::unparsed(Domain::Attendance, screenshot)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_fixture_with_one_month_parses() {
        let rows = vec![
            vec!["Month".to_string(), "Present".to_string(), "Total".to_string()],
            vec!["Jan".to_string(), "18".to_string(), "20".to_string()],
        ];
        let Parsed::Data(report) = parse_rows(&rows) else {
            panic!("expected data");
        };
        assert_eq!(report.months.len(), 1);
        assert_eq!(report.months[0].present, 18);
        assert_eq!(report.months[0].total, 20);
        assert!((report.months[0].percent - 90.0).abs() < 1e-9);
        assert!((report.overall_percent - 90.0).abs() < 1e-9);
    }

    #[test]
    fn placeholder_only_fixture_is_no_data_not_garbage() {
        let rows = vec![
            vec!["{{row.month}}".to_string(), "{{row.present}}".to_string(), "{{row.total}}".to_string()],
            vec!["{{row.month}}".to_string(), "{{row.present}}".to_string(), "{{row.total}}".to_string()],
        ];
        assert!(matches!(parse_rows(&rows), Parsed::NoData));
    }

    #[test]
    fn backend_json_accepts_numbers_or_display_strings() {
        let value = json!({
            "data": [
                {"month": "Jan", "present": 18, "total": 20},
                {"month": "Feb", "present": "19", "total": "22"}
            ]
        });
        let Parsed::Data(report) = parse_json(&value) else {
            panic!("expected data");
        };
        assert_eq!(report.months.len(), 2);
        assert_eq!(report.months[1].present, 19);
        // 37 of 42 days overall
        assert!((report.overall_percent - (37.0 / 42.0 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn empty_backend_payload_is_no_data() {
        assert!(matches!(parse_json(&json!({"data": []})), Parsed::NoData));
    }

    #[test]
    fn unrecognizable_backend_payload_is_unparsed() {
        assert!(matches!(parse_json(&json!({"html": "<table>"})), Parsed::Unparsed));
        let items = json!([{"foo": 1}]);
        assert!(matches!(parse_json(&items), Parsed::Unparsed));
    }

    #[test]
    fn zero_working_days_never_divides_by_zero() {
        let entry = month_entry("Jun".into(), 0.0, 0.0);
        assert_eq!(entry.percent, 0.0);
    }
}

//! Exam result extraction: per-subject marks, keyed by exam name.

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
pub struct ExamRow {
    pub exam: String,
    pub subject: String,
    pub obtained: f64,
    pub maximum: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExamResults {
    pub rows: Vec<ExamRow>,
}

impl ExamResults {
    /// Exam names in first-seen order; the formatter groups by these.
    pub fn exams(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !names.contains(&row.exam.as_str()) {
                names.push(&row.exam);
            }
        }
        names
    }
}

fn parse_json(value: &JsonValue) -> Parsed<ExamResults> {
    let Some(items) = json_rows(value) else {
        return Parsed::Unparsed;
    };
    if items.is_empty() {
        return Parsed::NoData;
    }
    let mut rows = Vec::new();
    for item in items {
        let Some(subject) = str_field(item, &["subject", "subjectName", "paper"]) else {
            continue;
        };
        let exam = str_field(item, &["exam", "examName", "term"])
            .unwrap_or_else(|| "Exam".to_string());
        rows.push(ExamRow {
            exam,
            subject,
            obtained: num_field(item, &["obtained", "marksObtained", "marks"]).unwrap_or(0.0),
            maximum: num_field(item, &["maximum", "maxMarks", "outOf"]).unwrap_or(0.0),
        });
    }
    if rows.is_empty() {
        Parsed::Unparsed
    } else {
        Parsed::Data(ExamResults { rows })
    }
}

fn parse_rows(raw: &[Vec<String>]) -> Parsed<ExamResults> {
    let cleaned = clean_rows(raw);
    let data_rows: Vec<&Vec<String>> =
        cleaned.iter().filter(|row| !looks_like_header(row)).collect();
    if data_rows.is_empty() {
        return Parsed::NoData;
    }
    let mut rows = Vec::new();
    for row in data_rows {
        if row.len() < 4 || is_junk(&row[0]) || is_junk(&row[1]) {
            continue;
        }
        rows.push(ExamRow {
            exam: row[0].clone(),
            subject: row[1].clone(),
            obtained: normalize_number(&row[2]),
            maximum: normalize_number(&row[3]),
        });
    }
    if rows.is_empty() {
        Parsed::Unparsed
    } else {
        Parsed::Data(ExamResults { rows })
    }
}

pub struct ExamExtractor {
    config: Config,
    http: reqwest::Client,
}

impl ExamExtractor {
    pub fn new(config: Config) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    fn strategies(&self) -> Vec<Strategy> {
        vec![
            Strategy {
                name: "backend-json",
                kind: StrategyKind::BackendJson { api_path: self.config.exam_api_path.clone() },
            },
            Strategy {
                name: "dom-table",
                kind: StrategyKind::DomTable { table_selector: "#tblExamResult" },
            },
        ]
    }
}

#[async_trait]
impl Extract<PortalContext> for ExamExtractor {
    fn domain(&self) -> Domain {
        Domain::Exam
    }

    async fn extract(&self, ctx: &PortalContext) -> Result<ExtractedRecord> {
        let page = ctx.page();
        navigate_with_retry(&self.config, page, &self.config.url(&self.config.exam_path)).await?;
        settle_templates(&self.config, page).await;

        let verdict = run_strategies(
            &self.config,
            &self.http,
            page,
            Domain::Exam,
            &self.strategies(),
            |data| match data {
                StrategyData::Json(value) => parse_json(value),
                StrategyData::Rows(rows) => parse_rows(rows),
            },
        )
        .await?;

        Ok(match verdict {
            Verdict::Data(results) => {
                ExtractedRecord::data(Domain::Exam, RecordPayload::Exam(results))
            }
            Verdict::NoData => ExtractedRecord::no_data(Domain::Exam),
            Verdict::Unparsed => {
                let screenshot = diag::capture(&self.config, page, "exam_unparsed").await;
                ExtractedRecord::unparsed(Domain::Exam, screenshot)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backend_rows_group_by_exam_in_first_seen_order() {
        let value = json!([
            {"examName": "Unit Test 1", "subject": "Maths", "marksObtained": 42, "maxMarks": 50},
            {"examName": "Half Yearly", "subject": "Maths", "marksObtained": 81, "maxMarks": 100},
            {"examName": "Unit Test 1", "subject": "Science", "marksObtained": 45, "maxMarks": 50}
        ]);
        let Parsed::Data(results) = parse_json(&value) else {
            panic!("expected data");
        };
        assert_eq!(results.exams(), vec!["Unit Test 1", "Half Yearly"]);
        assert_eq!(results.rows.len(), 3);
    }

    #[test]
    fn table_rows_need_exam_and_subject() {
        let rows = vec![
            vec!["Exam".into(), "Subject".into(), "Obtained".into(), "Max".into()],
            vec!["Unit Test 1".into(), "Maths".into(), "42".into(), "50".into()],
            vec!["{{r.exam}}".into(), "{{r.subject}}".into(), "0".into(), "0".into()],
        ];
        let Parsed::Data(results) = parse_rows(&rows) else {
            panic!("expected data");
        };
        assert_eq!(results.rows.len(), 1);
        assert_eq!(results.rows[0].obtained, 42.0);
    }

    #[test]
    fn no_results_published_yet_is_no_data() {
        assert!(matches!(parse_json(&json!({"data": []})), Parsed::NoData));
    }
}

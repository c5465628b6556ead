//! Student profile extraction: labelled fields, no backend endpoint — the
//! profile page is server-rendered, so both strategies read the DOM.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::browser::{diag, PortalContext};
use crate::config::Config;
use crate::error::Result;
use crate::extract::clean::{clean_rows, collapse_doubled, is_junk, looks_like_header};
use crate::extract::{
    navigate_with_retry, run_strategies, settle_templates, Domain, Extract, ExtractedRecord,
    Parsed, RecordPayload, Strategy, StrategyData, StrategyKind, Verdict,
};

/// Known profile label elements, in display order.
const PROFILE_FIELDS: &[(&str, &str)] = &[
    ("Name", "#lblStudentName"),
    ("Enrollment No", "#lblEnrollmentNo"),
    ("Class", "#lblClass"),
    ("Section", "#lblSection"),
    ("Father's Name", "#lblFatherName"),
    ("Mobile", "#lblMobile"),
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileField {
    pub label: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub fields: Vec<ProfileField>,
}

fn parse_fields(value: &JsonValue) -> Parsed<StudentProfile> {
    let Some(object) = value.as_object() else {
        return Parsed::Unparsed;
    };
    if object.is_empty() {
        return Parsed::NoData;
    }
    let mut fields = Vec::new();
    // Preserve the configured display order, not the object's.
    for (label, _) in PROFILE_FIELDS {
        if let Some(text) = object.get(*label).and_then(|v| v.as_str()) {
            let text = collapse_doubled(text);
            if !is_junk(&text) {
                fields.push(ProfileField { label: (*label).to_string(), value: text });
            }
        }
    }
    if fields.is_empty() {
        Parsed::NoData
    } else {
        Parsed::Data(StudentProfile { fields })
    }
}

fn parse_rows(raw: &[Vec<String>]) -> Parsed<StudentProfile> {
    let cleaned = clean_rows(raw);
    let data_rows: Vec<&Vec<String>> =
        cleaned.iter().filter(|row| !looks_like_header(row)).collect();
    if data_rows.is_empty() {
        return Parsed::NoData;
    }
    let mut fields = Vec::new();
    for row in data_rows {
        if row.len() < 2 || is_junk(&row[0]) || is_junk(&row[1]) {
            continue;
        }
        fields.push(ProfileField {
            label: row[0].trim_end_matches(':').trim().to_string(),
            value: row[1].clone(),
        });
    }
    if fields.is_empty() {
        Parsed::Unparsed
    } else {
        Parsed::Data(StudentProfile { fields })
    }
}

pub struct ProfileExtractor {
    config: Config,
    http: reqwest::Client,
}

impl ProfileExtractor {
    pub fn new(config: Config) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    fn strategies(&self) -> Vec<Strategy> {
        vec![
            Strategy {
                name: "dom-fields",
                kind: StrategyKind::DomFields { fields: PROFILE_FIELDS },
            },
            Strategy {
                name: "dom-table",
                kind: StrategyKind::DomTable { table_selector: "#tblProfile" },
            },
        ]
    }
}

#[async_trait]
impl Extract<PortalContext> for ProfileExtractor {
    fn domain(&self) -> Domain {
        Domain::Profile
    }

    async fn extract(&self, ctx: &PortalContext) -> Result<ExtractedRecord> {
        let page = ctx.page();
        navigate_with_retry(&self.config, page, &self.config.url(&self.config.profile_path))
            .await?;
        settle_templates(&self.config, page).await;

        let verdict = run_strategies(
            &self.config,
            &self.http,
            page,
            Domain::Profile,
            &self.strategies(),
            |data| match data {
                StrategyData::Json(value) => parse_fields(value),
                StrategyData::Rows(rows) => parse_rows(rows),
            },
        )
        .await?;

        Ok(match verdict {
            Verdict::Data(profile) => {
                ExtractedRecord::data(Domain::Profile, RecordPayload::Profile(profile))
            }
            Verdict::NoData => ExtractedRecord::no_data(Domain::Profile),
            Verdict::Unparsed => {
                let screenshot = diag::capture(&self.config, page, "profile_unparsed").await;
                ExtractedRecord::unparsed(Domain::Profile, screenshot)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labelled_fields_keep_display_order_and_drop_junk() {
        let value = json!({
            "Mobile": "98765 43210",
            "Name": "Alice Kumar",
            "Class": "{{student.class}}",
            "Section": ""
        });
        let Parsed::Data(profile) = parse_fields(&value) else {
            panic!("expected data");
        };
        let labels: Vec<&str> = profile.fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Name", "Mobile"]);
    }

    #[test]
    fn doubled_text_nodes_in_values_collapse() {
        let value = json!({"Name": "Alice KumarAlice Kumar"});
        let Parsed::Data(profile) = parse_fields(&value) else {
            panic!("expected data");
        };
        assert_eq!(profile.fields[0].value, "Alice Kumar");
    }

    #[test]
    fn two_column_table_parses_as_label_value() {
        let rows = vec![
            vec!["Name:".to_string(), "Alice Kumar".to_string()],
            vec!["Class:".to_string(), "X-B".to_string()],
        ];
        let Parsed::Data(profile) = parse_rows(&rows) else {
            panic!("expected data");
        };
        assert_eq!(profile.fields[0].label, "Name");
        assert_eq!(profile.fields[1].value, "X-B");
    }

    #[test]
    fn all_placeholder_profile_is_no_data() {
        let value = json!({"Name": "{{student.name}}", "Class": "-"});
        assert!(matches!(parse_fields(&value), Parsed::NoData));
    }
}

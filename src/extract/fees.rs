//! Fee ledger extraction: per-head charged/paid/due amounts plus totals.

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
pub struct FeeRow {
    pub head: String,
    pub charged: f64,
    pub paid: f64,
    pub due: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeLedger {
    pub rows: Vec<FeeRow>,
    pub total_charged: f64,
    pub total_paid: f64,
    pub total_due: f64,
}

fn ledger_from(rows: Vec<FeeRow>) -> FeeLedger {
    let total_charged = rows.iter().map(|r| r.charged).sum();
    let total_paid = rows.iter().map(|r| r.paid).sum();
    let total_due = rows.iter().map(|r| r.due).sum();
    FeeLedger { rows, total_charged, total_paid, total_due }
}

fn parse_json(value: &JsonValue) -> Parsed<FeeLedger> {
    let Some(items) = json_rows(value) else {
        return Parsed::Unparsed;
    };
    if items.is_empty() {
        return Parsed::NoData;
    }
    let mut rows = Vec::new();
    for item in items {
        let Some(head) = str_field(item, &["head", "feeHead", "particulars", "particular"]) else {
            continue;
        };
        rows.push(FeeRow {
            head,
            charged: num_field(item, &["charged", "amount", "demand"]).unwrap_or(0.0),
            paid: num_field(item, &["paid", "received"]).unwrap_or(0.0),
            due: num_field(item, &["due", "balance", "pending"]).unwrap_or(0.0),
        });
    }
    if rows.is_empty() {
        Parsed::Unparsed
    } else {
        Parsed::Data(ledger_from(rows))
    }
}

fn parse_rows(raw: &[Vec<String>]) -> Parsed<FeeLedger> {
    let cleaned = clean_rows(raw);
    let data_rows: Vec<&Vec<String>> =
        cleaned.iter().filter(|row| !looks_like_header(row)).collect();
    if data_rows.is_empty() {
        return Parsed::NoData;
    }
    let mut rows = Vec::new();
    for row in data_rows {
        if row.len() < 4 || is_junk(&row[0]) {
            continue;
        }
        rows.push(FeeRow {
            head: row[0].clone(),
            charged: normalize_number(&row[1]),
            paid: normalize_number(&row[2]),
            due: normalize_number(&row[3]),
        });
    }
    if rows.is_empty() {
        Parsed::Unparsed
    } else {
        Parsed::Data(ledger_from(rows))
    }
}

pub struct FeesExtractor {
    config: Config,
    http: reqwest::Client,
}

impl FeesExtractor {
    pub fn new(config: Config) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    fn strategies(&self) -> Vec<Strategy> {
        vec![
            Strategy {
                name: "backend-json",
                kind: StrategyKind::BackendJson { api_path: self.config.fees_api_path.clone() },
            },
            Strategy {
                name: "dom-table",
                kind: StrategyKind::DomTable { table_selector: "#tblFeeLedger" },
            },
        ]
    }
}

#[async_trait]
impl Extract<PortalContext> for FeesExtractor {
    fn domain(&self) -> Domain {
        Domain::Fees
    }

    async fn extract(&self, ctx: &PortalContext) -> Result<ExtractedRecord> {
        let page = ctx.page();
        navigate_with_retry(&self.config, page, &self.config.url(&self.config.fees_path)).await?;
        settle_templates(&self.config, page).await;

        let verdict = run_strategies(
            &self.config,
            &self.http,
            page,
            Domain::Fees,
            &self.strategies(),
            |data| match data {
                StrategyData::Json(value) => parse_json(value),
                StrategyData::Rows(rows) => parse_rows(rows),
            },
        )
        .await?;

        Ok(match verdict {
            Verdict::Data(ledger) => {
                ExtractedRecord::data(Domain::Fees, RecordPayload::Fees(ledger))
            }
            Verdict::NoData => ExtractedRecord::no_data(Domain::Fees),
            Verdict::Unparsed => {
                let screenshot = diag::capture(&self.config, page, "fees_unparsed").await;
                ExtractedRecord::unparsed(Domain::Fees, screenshot)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn currency_display_strings_normalize_to_numbers() {
        let rows = vec![
            vec!["Particulars".into(), "Charged".into(), "Paid".into(), "Due".into()],
            vec!["Tuition".into(), "₹12,345.00".into(), "₹12,000.00".into(), "₹345.00".into()],
            vec!["Transport".into(), "Rs. 6,000".into(), "Rs. 6,000".into(), "0".into()],
        ];
        let Parsed::Data(ledger) = parse_rows(&rows) else {
            panic!("expected data");
        };
        assert_eq!(ledger.rows[0].charged, 12345.0);
        assert_eq!(ledger.rows[1].charged, 6000.0);
        assert_eq!(ledger.total_due, 345.0);
    }

    #[test]
    fn unpayable_field_defaults_to_zero_without_killing_the_record() {
        let value = json!([{"head": "Tuition", "charged": "pending", "paid": 500, "due": 250}]);
        let Parsed::Data(ledger) = parse_json(&value) else {
            panic!("expected data");
        };
        assert_eq!(ledger.rows[0].charged, 0.0);
        assert_eq!(ledger.rows[0].paid, 500.0);
    }

    #[test]
    fn empty_ledger_is_no_data() {
        assert!(matches!(parse_json(&json!([])), Parsed::NoData));
        let rows: Vec<Vec<String>> = vec![vec!["--".into(), "-".into(), "".into(), "-".into()]];
        assert!(matches!(parse_rows(&rows), Parsed::NoData));
    }

    #[test]
    fn rows_without_a_fee_head_are_unparsed_not_invented() {
        let rows = vec![vec!["{{fee.head}}".into(), "100".into(), "50".into(), "50".into()]];
        assert!(matches!(parse_rows(&rows), Parsed::Unparsed));
    }
}

//! Human-readable rendering of extracted records.
//!
//! Pure and deterministic: same record in, same text out. Domain thresholds
//! live here as named constants so they can be tested without a browser.

use crate::extract::{
    AttendanceReport, ExamResults, ExtractOutcome, ExtractedRecord, FeeLedger, RecordPayload,
    StudentProfile,
};

/// Attendance at or above this is healthy.
pub const ATTENDANCE_GOOD_MIN: f64 = 85.0;
/// Attendance at or above this (but below good) is a warning band.
pub const ATTENDANCE_WARN_MIN: f64 = 75.0;

/// Risk classification for an attendance percentage.
pub fn attendance_band(percent: f64) -> &'static str {
    if percent >= ATTENDANCE_GOOD_MIN {
        "Good"
    } else if percent >= ATTENDANCE_WARN_MIN {
        "Needs attention"
    } else {
        "Critical"
    }
}

/// Render a record for the chat front-end.
pub fn format(record: &ExtractedRecord) -> String {
    match &record.outcome {
        ExtractOutcome::Data(payload) => match payload {
            RecordPayload::Attendance(report) => format_attendance(report),
            RecordPayload::Fees(ledger) => format_fees(ledger),
            RecordPayload::Exam(results) => format_exam(results),
            RecordPayload::Profile(profile) => format_profile(profile),
        },
        ExtractOutcome::NoData => format!("ℹ️ No {} records found.", record.domain),
        ExtractOutcome::Unparsed { screenshot } => match screenshot {
            Some(path) => format!(
                "⚠️ Could not read the {} page; a screenshot was saved to {}.",
                record.domain,
                path.display()
            ),
            None => format!("⚠️ Could not read the {} page.", record.domain),
        },
    }
}

fn format_attendance(report: &AttendanceReport) -> String {
    let mut out = String::from("📊 Your Attendance\n");
    for month in &report.months {
        out.push_str(&format!(
            "{}: {}/{} ({:.1}%)\n",
            month.month, month.present, month.total, month.percent
        ));
    }
    out.push_str(&format!(
        "Overall: {:.1}% — {}",
        report.overall_percent,
        attendance_band(report.overall_percent)
    ));
    out
}

fn format_fees(ledger: &FeeLedger) -> String {
    let mut out = String::from("💰 Fee Ledger\n");
    for row in &ledger.rows {
        out.push_str(&format!(
            "{}: charged ₹{:.2}, paid ₹{:.2}, due ₹{:.2}\n",
            row.head, row.charged, row.paid, row.due
        ));
    }
    out.push_str(&format!(
        "Total: charged ₹{:.2}, paid ₹{:.2}, due ₹{:.2}",
        ledger.total_charged, ledger.total_paid, ledger.total_due
    ));
    if ledger.total_due > 0.0 {
        out.push_str("\n⚠️ Payment pending.");
    }
    out
}

fn format_exam(results: &ExamResults) -> String {
    let mut out = String::from("📝 Exam Results");
    for exam in results.exams() {
        out.push_str(&format!("\n\n{exam}:"));
        for row in results.rows.iter().filter(|r| r.exam == exam) {
            out.push_str(&format!("\n  {}: {:.0}/{:.0}", row.subject, row.obtained, row.maximum));
        }
    }
    out
}

fn format_profile(profile: &StudentProfile) -> String {
    let mut out = String::from("🎓 Student Profile\n");
    for field in &profile.fields {
        out.push_str(&format!("{}: {}\n", field.label, field.value));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Domain, ExamRow, FeeRow, MonthAttendance, ProfileField};

    fn attendance_record(percent_rows: &[(&str, u32, u32)]) -> ExtractedRecord {
        let months: Vec<MonthAttendance> = percent_rows
            .iter()
            .map(|(m, p, t)| MonthAttendance {
                month: (*m).to_string(),
                present: *p,
                total: *t,
                percent: f64::from(*p) / f64::from(*t) * 100.0,
            })
            .collect();
        let present: u32 = months.iter().map(|m| m.present).sum();
        let total: u32 = months.iter().map(|m| m.total).sum();
        ExtractedRecord::data(
            Domain::Attendance,
            RecordPayload::Attendance(AttendanceReport {
                months,
                overall_percent: f64::from(present) / f64::from(total) * 100.0,
            }),
        )
    }

    #[test]
    fn ninety_percent_formats_as_good() {
        let record = attendance_record(&[("Jan", 18, 20)]);
        let text = format(&record);
        assert!(text.contains("90.0%"), "got: {text}");
        assert!(text.contains("Good"));
    }

    #[test]
    fn threshold_boundary_is_inclusive_at_85() {
        assert_eq!(attendance_band(85.0), "Good");
        assert_eq!(attendance_band(84.9), "Needs attention");
        assert_eq!(attendance_band(75.0), "Needs attention");
        assert_eq!(attendance_band(74.9), "Critical");
    }

    #[test]
    fn no_data_and_unreadable_read_differently() {
        let empty = ExtractedRecord::no_data(Domain::Fees);
        let unreadable = ExtractedRecord::unparsed(Domain::Fees, None);
        assert_ne!(format(&empty), format(&unreadable));
        assert!(format(&empty).contains("No fees records"));
        assert!(format(&unreadable).contains("Could not read"));
    }

    #[test]
    fn fees_render_with_rupee_amounts_and_pending_marker() {
        let record = ExtractedRecord::data(
            Domain::Fees,
            RecordPayload::Fees(FeeLedger {
                rows: vec![FeeRow { head: "Tuition".into(), charged: 12345.0, paid: 12000.0, due: 345.0 }],
                total_charged: 12345.0,
                total_paid: 12000.0,
                total_due: 345.0,
            }),
        );
        let text = format(&record);
        assert!(text.contains("₹12345.00"));
        assert!(text.contains("Payment pending"));
    }

    #[test]
    fn exam_rows_group_under_their_exam() {
        let record = ExtractedRecord::data(
            Domain::Exam,
            RecordPayload::Exam(ExamResults {
                rows: vec![
                    ExamRow { exam: "Unit Test 1".into(), subject: "Maths".into(), obtained: 42.0, maximum: 50.0 },
                    ExamRow { exam: "Unit Test 1".into(), subject: "Science".into(), obtained: 45.0, maximum: 50.0 },
                ],
            }),
        );
        let text = format(&record);
        let exam_pos = text.find("Unit Test 1").unwrap();
        let maths_pos = text.find("Maths").unwrap();
        assert!(exam_pos < maths_pos);
        assert!(text.contains("42/50"));
    }

    #[test]
    fn formatting_is_deterministic() {
        let record = ExtractedRecord::data(
            Domain::Profile,
            RecordPayload::Profile(StudentProfile {
                fields: vec![ProfileField { label: "Name".into(), value: "Alice Kumar".into() }],
            }),
        );
        assert_eq!(format(&record), format(&record));
    }
}

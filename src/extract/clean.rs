//! Junk filtering and numeric normalization.
//!
//! The portal's markup is partially template-rendered and likes to emit
//! unresolved `{{ placeholders }}`, dash-only filler cells, and duplicated
//! text nodes. Everything here is pure so the fixtures in the tests below
//! are the whole story.

use regex::Regex;

/// Unresolved client-side template syntax: `{{ ... }}` or `<% ... %>`.
const TEMPLATE_PATTERN: &str = r"\{\{[^}]*\}\}|<%[^%]*%>";

/// Filler the portal renders where data is missing.
const PLACEHOLDERS: &[&str] = &["-", "--", "---", "—", "n/a", "na", "nil", "*", ".", ".."];

/// Is this cell text junk: empty, placeholder punctuation, or unresolved
/// template syntax?
pub fn is_junk(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lowered = trimmed.to_lowercase();
    if PLACEHOLDERS.contains(&lowered.as_str()) {
        return true;
    }
    Regex::new(TEMPLATE_PATTERN)
        .map(|re| re.is_match(trimmed))
        .unwrap_or(false)
}

/// Collapse a doubled text node: the portal occasionally renders a value
/// twice back-to-back inside one cell ("JanJan", "9090").
pub fn collapse_doubled(text: &str) -> String {
    let trimmed = text.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() >= 2 && chars.len() % 2 == 0 {
        let (first, second) = chars.split_at(chars.len() / 2);
        if first == second {
            return first.iter().collect();
        }
    }
    trimmed.to_string()
}

/// Trim and de-duplicate a raw cell grid: cells are collapsed, rows whose
/// every cell is junk are dropped, and consecutive identical rows (another
/// template artifact) keep only their first occurrence.
pub fn clean_rows(rows: &[Vec<String>]) -> Vec<Vec<String>> {
    let mut cleaned: Vec<Vec<String>> = Vec::new();
    for row in rows {
        let cells: Vec<String> = row.iter().map(|c| collapse_doubled(c)).collect();
        if cells.iter().all(|c| is_junk(c)) {
            continue;
        }
        if cleaned.last().map(|prev| prev == &cells).unwrap_or(false) {
            continue;
        }
        cleaned.push(cells);
    }
    cleaned
}

/// Normalize a display string to a number: strip currency marks, grouping
/// commas, percent signs and whatever else is not part of the value. A
/// string that still fails to parse is `0.0` — a field-level failure never
/// aborts the record it belongs to.
pub fn normalize_number(raw: &str) -> f64 {
    let mut filtered = String::new();
    for ch in raw.chars() {
        if ch.is_ascii_digit() {
            filtered.push(ch);
        } else if ch == '.' && filtered.chars().last().is_some_and(|c| c.is_ascii_digit()) {
            // A decimal point only counts when it follows a digit; the dot
            // in "Rs." must not become one.
            filtered.push(ch);
        } else if ch == '-' && filtered.is_empty() {
            filtered.push(ch);
        }
    }
    filtered.parse::<f64>().unwrap_or(0.0)
}

/// Header-row detection for the portal's tables.
pub fn looks_like_header(row: &[String]) -> bool {
    const HEADER_WORDS: &[&str] = &[
        "month", "present", "total", "percentage", "head", "particulars", "charged", "paid",
        "due", "balance", "exam", "subject", "marks", "obtained", "maximum", "max", "field",
        "value", "sr", "sr.", "#",
    ];
    row.iter()
        .any(|cell| HEADER_WORDS.contains(&cell.trim().to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_placeholder_cells_are_junk() {
        assert!(is_junk(""));
        assert!(is_junk("   "));
        assert!(is_junk("-"));
        assert!(is_junk("N/A"));
        assert!(is_junk("nil"));
        assert!(!is_junk("Jan"));
        assert!(!is_junk("0"));
    }

    #[test]
    fn unresolved_template_syntax_is_junk() {
        assert!(is_junk("{{row.month}}"));
        assert!(is_junk("<%= fee.due %>"));
        assert!(!is_junk("{not a template}"));
    }

    #[test]
    fn doubled_text_nodes_collapse() {
        assert_eq!(collapse_doubled("JanJan"), "Jan");
        assert_eq!(collapse_doubled("9090"), "90");
        assert_eq!(collapse_doubled("Jan"), "Jan");
        // Not doubled, just repetitive.
        assert_eq!(collapse_doubled("aab"), "aab");
    }

    #[test]
    fn clean_rows_drops_junk_only_rows_and_consecutive_duplicates() {
        let raw = vec![
            vec!["{{row.month}}".to_string(), "{{row.present}}".to_string()],
            vec!["Jan".to_string(), " 18 ".to_string()],
            vec!["Jan".to_string(), "18".to_string()],
            vec!["-".to_string(), "".to_string()],
            vec!["Feb".to_string(), "20".to_string()],
        ];
        let cleaned = clean_rows(&raw);
        assert_eq!(
            cleaned,
            vec![
                vec!["Jan".to_string(), "18".to_string()],
                vec!["Feb".to_string(), "20".to_string()],
            ]
        );
    }

    #[test]
    fn currency_strings_normalize() {
        assert_eq!(normalize_number("₹12,345.00"), 12345.0);
        assert_eq!(normalize_number("94%"), 94.0);
        assert_eq!(normalize_number(" 18 "), 18.0);
        assert_eq!(normalize_number("Rs. 1,200"), 1200.0);
    }

    #[test]
    fn unparseable_numbers_default_to_zero() {
        assert_eq!(normalize_number("pending"), 0.0);
        assert_eq!(normalize_number(""), 0.0);
        assert_eq!(normalize_number("--"), 0.0);
    }

    #[test]
    fn header_rows_are_recognized() {
        let header = vec!["Month".to_string(), "Present".to_string(), "Total".to_string()];
        assert!(looks_like_header(&header));
        let data = vec!["Jan".to_string(), "18".to_string(), "20".to_string()];
        assert!(!looks_like_header(&data));
    }
}

use chrono::{NaiveDate, NaiveDateTime};

use crate::KeyError;

const DATE_LAYOUTS: &[&str] = &["%m-%d-%Y", "%m/%d/%Y", "%Y-%m-%d"];
const DATETIME_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

const NOTES_HIRE_MARKER: &str = "Hire Date:";

/// `MM-DD-YYYY`, the layout used in identity keys and driver notes.
pub fn format_mdy(d: NaiveDate) -> String {
    d.format("%m-%d-%Y").to_string()
}

/// Parse a payroll date cell.
///
/// Payroll exports are not consistent about layout, so the common ones are
/// tried in order. A trailing time component is accepted and discarded.
pub fn parse_date(raw: &str) -> Result<NaiveDate, KeyError> {
    let s = raw.trim();
    for layout in DATE_LAYOUTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, layout) {
            return Ok(d);
        }
    }
    for layout in DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, layout) {
            return Ok(dt.date());
        }
    }
    Err(KeyError::InvalidDate {
        raw: raw.to_string(),
    })
}

/// Recover the hire date written into driver notes by the create path
/// (`Hire Date: MM-DD-YYYY`). Returns `None` when absent or malformed.
pub fn hire_date_from_notes(notes: &str) -> Option<NaiveDate> {
    let idx = notes.find(NOTES_HIRE_MARKER)?;
    let rest = notes[idx + NOTES_HIRE_MARKER.len()..].trim_start();
    let candidate = rest.get(..10)?;
    NaiveDate::parse_from_str(candidate, "%m-%d-%Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_supported_layouts() {
        assert_eq!(parse_date("01-15-2024").unwrap(), d(2024, 1, 15));
        assert_eq!(parse_date("1/5/2024").unwrap(), d(2024, 1, 5));
        assert_eq!(parse_date("2024-01-15").unwrap(), d(2024, 1, 15));
        assert_eq!(parse_date(" 2024-01-15 00:00:00 ").unwrap(), d(2024, 1, 15));
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_date("next tuesday").unwrap_err();
        assert_eq!(
            err,
            KeyError::InvalidDate {
                raw: "next tuesday".to_string()
            }
        );
        assert!(parse_date("13-40-2024").is_err());
    }

    #[test]
    fn format_is_zero_padded() {
        assert_eq!(format_mdy(d(2024, 3, 7)), "03-07-2024");
    }

    #[test]
    fn notes_extraction() {
        assert_eq!(
            hire_date_from_notes("Hire Date: 01-15-2024"),
            Some(d(2024, 1, 15))
        );
        assert_eq!(
            hire_date_from_notes("Transferred. Hire Date:03-02-2021 (rehire)"),
            Some(d(2021, 3, 2))
        );
        assert_eq!(hire_date_from_notes("Terminated: 01-15-2024"), None);
        assert_eq!(hire_date_from_notes("Hire Date: 1/5/24"), None);
        assert_eq!(hire_date_from_notes(""), None);
    }
}

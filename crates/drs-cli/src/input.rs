//! CSV adapter for payroll exports.
//!
//! Rows that cannot become a typed record (missing name, unparseable date) are
//! not dropped: they come back as FAILED outcomes so the run summary counts
//! them.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use drs_identity::parse_date;
use drs_reconcile::{EmployeeRecord, OutcomeKind, RowOutcome, TerminationRecord};

#[derive(Debug, Deserialize)]
struct ExportRow {
    #[serde(rename = "Legal_Firstname", default)]
    first_name: String,
    #[serde(rename = "Legal_Lastname", default)]
    last_name: String,
    #[serde(rename = "Hire_Date", default)]
    hire_date: Option<String>,
    #[serde(rename = "Termination_Date", default)]
    termination_date: Option<String>,
    #[serde(rename = "Work_Location", default)]
    work_location: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Position", default)]
    position: String,
    #[serde(rename = "Employee_Status", default)]
    employee_status: String,
    #[serde(rename = "Phone", default)]
    phone: Option<String>,
}

impl ExportRow {
    fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Typed rows plus the rows rejected during parsing.
#[derive(Debug)]
pub struct Parsed<T> {
    pub rows: Vec<T>,
    pub rejected: Vec<RowOutcome>,
}

fn blank_to_none(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn required_date(raw: Option<String>, column: &str) -> std::result::Result<NaiveDate, String> {
    let raw = blank_to_none(raw).ok_or_else(|| format!("validation: {column} is empty"))?;
    parse_date(&raw).map_err(|e| format!("validation: {column}: {e}"))
}

fn read_rows(path: &Path) -> Result<Vec<ExportRow>> {
    let bytes = fs::read(path).with_context(|| format!("read input failed: {}", path.display()))?;
    // Strip UTF-8 BOM left by spreadsheet exports.
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let mut out = Vec::new();
    for (i, rec) in reader.deserialize::<ExportRow>().enumerate() {
        let row = rec.with_context(|| format!("{}: malformed row {}", path.display(), i + 2))?;
        if row.first_name.is_empty() && row.last_name.is_empty() {
            debug!(line = i + 2, "blank row skipped");
            continue;
        }
        out.push(row);
    }
    Ok(out)
}

/// Hire export. Only rows with `Employee_Status == Active` are kept.
pub fn read_hires(path: &Path) -> Result<Parsed<EmployeeRecord>> {
    let all = read_rows(path)?;
    let total = all.len();
    let mut parsed = Parsed {
        rows: Vec::new(),
        rejected: Vec::new(),
    };

    for row in all {
        if !row.employee_status.eq_ignore_ascii_case("active") {
            continue;
        }
        let name = row.display_name();
        let hire_date = match required_date(row.hire_date, "Hire_Date") {
            Ok(d) => d,
            Err(detail) => {
                warn!(employee = %name, %detail, "hire row rejected");
                parsed
                    .rejected
                    .push(RowOutcome::new(name, OutcomeKind::Failed).detail(detail));
                continue;
            }
        };
        let termination_date = blank_to_none(row.termination_date)
            .and_then(|raw| parse_date(&raw).ok());

        parsed.rows.push(EmployeeRecord {
            first_name: row.first_name,
            last_name: row.last_name,
            hire_date,
            termination_date,
            work_location: row.work_location,
            license_state: row.state,
            position: row.position,
            employment_status: row.employee_status,
            phone: blank_to_none(row.phone),
        });
    }

    debug!(
        total,
        active = parsed.rows.len(),
        rejected = parsed.rejected.len(),
        "hire export read"
    );
    Ok(parsed)
}

/// Termination export. `Hire_Date` may be missing or blank.
pub fn read_terminations(path: &Path) -> Result<Parsed<TerminationRecord>> {
    let mut parsed = Parsed {
        rows: Vec::new(),
        rejected: Vec::new(),
    };

    for row in read_rows(path)? {
        let name = row.display_name();
        let termination_date = match required_date(row.termination_date, "Termination_Date") {
            Ok(d) => d,
            Err(detail) => {
                warn!(employee = %name, %detail, "termination row rejected");
                parsed
                    .rejected
                    .push(RowOutcome::new(name, OutcomeKind::Failed).detail(detail));
                continue;
            }
        };
        let hire_date = match blank_to_none(row.hire_date) {
            None => None,
            Some(raw) => match parse_date(&raw) {
                Ok(d) => Some(d),
                Err(e) => {
                    warn!(employee = %name, error = %e, "unparseable hire date; treating as missing");
                    None
                }
            },
        };

        parsed.rows.push(TerminationRecord {
            first_name: row.first_name,
            last_name: row.last_name,
            termination_date,
            hire_date,
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn csv_file(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn hires_keep_active_rows_only() {
        let f = csv_file(
            "\u{feff}Legal_Firstname,Legal_Lastname,Hire_Date,Work_Location,State,Position,Employee_Status\n\
             John,Smith,01-15-2024,Abilene,TX,CDL Driver,Active\n\
             Old,Timer,2019-03-01,Abilene,TX,CDL Driver,Terminated\n",
        );
        let parsed = read_hires(f.path()).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].hire_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(parsed.rows[0].license_state, "TX");
        assert!(parsed.rows[0].phone.is_none());
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn bad_hire_date_becomes_failed_outcome() {
        let f = csv_file(
            "Legal_Firstname,Legal_Lastname,Hire_Date,Work_Location,State,Position,Employee_Status\n\
             Ann,Doe,someday,Abilene,TX,CDL Driver,Active\n",
        );
        let parsed = read_hires(f.path()).unwrap();
        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.rejected[0].kind, OutcomeKind::Failed);
        assert!(parsed.rejected[0].detail.as_deref().unwrap().starts_with("validation: Hire_Date"));
    }

    #[test]
    fn terminations_tolerate_missing_hire_column() {
        let f = csv_file(
            "Legal_Firstname,Legal_Lastname,Termination_Date\n\
             Ana,Cruz,3/1/2024\n",
        );
        let parsed = read_terminations(f.path()).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].hire_date, None);
        assert_eq!(
            parsed.rows[0].termination_date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_hires(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(err.to_string().contains("read input failed"));
    }
}

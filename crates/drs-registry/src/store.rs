//! Ledger file format: one-column CSV with a `username` header, sorted.
//!
//! Older ledgers may use a `Username` header, or no header at all. When row 1
//! names no `username` column it is data, and the first column is read.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::RegistryError;

const HEADER: &str = "username";

fn store_err(path: &Path, detail: impl std::fmt::Display) -> RegistryError {
    RegistryError::Store {
        path: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

pub(crate) fn load(path: &Path) -> Result<BTreeSet<String>, RegistryError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| store_err(path, e))?;

    let mut names = BTreeSet::new();
    let mut column = None;
    for rec in rdr.records() {
        let rec = rec.map_err(|e| store_err(path, e))?;
        let col = match column {
            Some(c) => c,
            None => {
                // Row 1 is a header only when it names the username column.
                let header = rec
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(HEADER));
                column = Some(header.unwrap_or(0));
                if header.is_some() {
                    continue;
                }
                0
            }
        };
        if let Some(v) = rec.get(col) {
            let v = v.trim().to_lowercase();
            if !v.is_empty() {
                names.insert(v);
            }
        }
    }
    Ok(names)
}

/// Rewrite the whole ledger. The new content goes to a sibling temp file that
/// is renamed over the old one, so a crash mid-write leaves the previous ledger.
pub(crate) fn save(path: &Path, names: &BTreeSet<String>) -> Result<(), RegistryError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| store_err(path, e))?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    {
        let mut w = csv::Writer::from_path(&tmp).map_err(|e| store_err(path, e))?;
        w.write_record([HEADER]).map_err(|e| store_err(path, e))?;
        for name in names {
            w.write_record([name.as_str()])
                .map_err(|e| store_err(path, e))?;
        }
        w.flush().map_err(|e| store_err(path, e))?;
    }

    fs::rename(&tmp, path).map_err(|e| store_err(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_prefers_username_column() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("u.csv");
        fs::write(&p, "id,Username\n1,JSmith\n2,\n3, ADoe \n").unwrap();

        let names = load(&p).unwrap();
        assert_eq!(
            names,
            ["adoe", "jsmith"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn load_falls_back_to_first_column() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("u.csv");
        fs::write(&p, "login\nMLopez\n").unwrap();

        let names = load(&p).unwrap();
        assert!(names.contains("mlopez"));
        assert!(names.contains("login"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn headerless_ledger_keeps_first_row() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("u.csv");
        fs::write(&p, "jsmith\nadoe\n").unwrap();

        let names = load(&p).unwrap();
        assert_eq!(
            names,
            ["adoe", "jsmith"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn save_writes_sorted_with_header_and_no_temp_leftover() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("u.csv");
        let names: BTreeSet<String> = ["zed", "amy"].iter().map(|s| s.to_string()).collect();

        save(&p, &names).unwrap();

        assert_eq!(fs::read_to_string(&p).unwrap(), "username\namy\nzed\n");
        assert!(!dir.path().join("u.csv.tmp").exists());
    }
}

//! Static lookup tables: position -> tag, work location -> tag + timezone,
//! and positions that never get a driver account.
//!
//! Files are plain CSV with a header row. Header names match
//! case-insensitively; cell values are trimmed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;

use crate::MappingPaths;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationTag {
    pub tag_id: String,
    /// IANA zone name, validated at load.
    pub timezone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMappings {
    pub positions: BTreeMap<String, String>,
    pub locations: BTreeMap<String, LocationTag>,
    pub excluded_positions: BTreeSet<String>,
}

impl TagMappings {
    pub fn load(paths: &MappingPaths, default_timezone: &str) -> Result<Self> {
        validate_timezone(default_timezone).context("drivers.default_timezone")?;
        Ok(Self {
            positions: load_positions(&paths.positions)?,
            locations: load_locations(&paths.locations, default_timezone)?,
            excluded_positions: load_excluded(&paths.excluded_positions)?,
        })
    }

    pub fn position_tag(&self, position: &str) -> Option<&str> {
        self.positions.get(position.trim()).map(|s| s.as_str())
    }

    pub fn location(&self, work_location: &str) -> Option<&LocationTag> {
        self.locations.get(work_location.trim())
    }

    pub fn is_excluded(&self, position: &str) -> bool {
        self.excluded_positions.contains(position.trim())
    }
}

fn validate_timezone(tz: &str) -> Result<()> {
    tz.parse::<Tz>()
        .map(|_| ())
        .map_err(|_| anyhow!("MAPPING_INVALID: unknown timezone '{tz}'"))
}

/// Rows of a headered CSV, with a lookup from lowercase header to column.
struct Table {
    columns: BTreeMap<String, usize>,
    rows: Vec<csv::StringRecord>,
}

impl Table {
    fn read(path: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("open mapping csv: {}", path.display()))?;
        let columns = rdr
            .headers()
            .with_context(|| format!("read header: {}", path.display()))?
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        let rows = rdr
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("read rows: {}", path.display()))?;
        Ok(Self { columns, rows })
    }

    fn column(&self, path: &Path, name: &str) -> Result<usize> {
        match self.columns.get(name) {
            Some(i) => Ok(*i),
            None => bail!(
                "MAPPING_INVALID: {} has no '{}' column",
                path.display(),
                name
            ),
        }
    }
}

fn cell(rec: &csv::StringRecord, i: usize) -> &str {
    rec.get(i).map(str::trim).unwrap_or("")
}

fn load_positions(path: &Path) -> Result<BTreeMap<String, String>> {
    let t = Table::read(path)?;
    let pos = t.column(path, "position")?;
    let tag = t.column(path, "tagid")?;

    Ok(t.rows
        .iter()
        .filter(|r| !cell(r, pos).is_empty() && !cell(r, tag).is_empty())
        .map(|r| (cell(r, pos).to_string(), cell(r, tag).to_string()))
        .collect())
}

fn load_locations(path: &Path, default_timezone: &str) -> Result<BTreeMap<String, LocationTag>> {
    let t = Table::read(path)?;
    let loc = t.column(path, "location")?;
    let id = t.column(path, "id")?;
    let tz = t.columns.get("timezone").copied();

    let mut out = BTreeMap::new();
    for r in &t.rows {
        let name = cell(r, loc);
        if name.is_empty() {
            continue;
        }
        let timezone = match tz.map(|i| cell(r, i)).filter(|s| !s.is_empty()) {
            Some(z) => z.to_string(),
            None => default_timezone.to_string(),
        };
        validate_timezone(&timezone).with_context(|| format!("location '{name}'"))?;
        out.insert(
            name.to_string(),
            LocationTag {
                tag_id: cell(r, id).to_string(),
                timezone,
            },
        );
    }
    Ok(out)
}

fn load_excluded(path: &Path) -> Result<BTreeSet<String>> {
    let t = Table::read(path)?;
    let pos = t.column(path, "position")?;
    Ok(t.rows
        .iter()
        .map(|r| cell(r, pos))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_tables(dir: &Path, locations: &str) -> MappingPaths {
        let paths = MappingPaths {
            positions: dir.join("positions.csv"),
            locations: dir.join("locations.csv"),
            excluded_positions: dir.join("never_positions.csv"),
        };
        fs::write(&paths.positions, "Position,TagId\nCDL Driver,3001\nYard Jockey , 3002 \n").unwrap();
        fs::write(&paths.locations, locations).unwrap();
        fs::write(&paths.excluded_positions, "Position\nOffice Manager\n").unwrap();
        paths
    }

    #[test]
    fn loads_all_tables_with_default_timezone() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_tables(
            dir.path(),
            "LOCATION,ID,TIMEZONE\nAbilene,2762144,\nEl Paso,2762150,America/Denver\n",
        );

        let m = TagMappings::load(&paths, "America/Chicago").unwrap();
        assert_eq!(m.position_tag("Yard Jockey"), Some("3002"));
        assert_eq!(m.position_tag("Dispatcher"), None);
        assert_eq!(m.location("Abilene").unwrap().timezone, "America/Chicago");
        assert_eq!(m.location(" El Paso ").unwrap().tag_id, "2762150");
        assert!(m.is_excluded("Office Manager"));
        assert!(!m.is_excluded("CDL Driver"));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_tables(dir.path(), "Location,Id,Timezone\nMoon Base,1,Lunar/Crater\n");
        let err = TagMappings::load(&paths, "America/Chicago").unwrap_err();
        assert!(format!("{err:#}").contains("Lunar/Crater"));
    }

    #[test]
    fn missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_tables(dir.path(), "Site,Id\nAbilene,1\n");
        let err = TagMappings::load(&paths, "America/Chicago").unwrap_err();
        assert!(err.to_string().contains("'location'"));
    }
}

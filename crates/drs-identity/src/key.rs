use std::fmt;

use chrono::NaiveDate;

use crate::dates::format_mdy;
use crate::KeyError;

/// External identity key of one employee: `{first}-{last}_{MM-DD-YYYY}`.
///
/// Two rows with the same legal name and hire date always produce the same key.
/// Two *different* employees sharing both also collide; nothing here detects it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdentityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn strip_non_alnum(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Derive the identity key for `(first, last, hire_date)`.
///
/// Case is preserved; every character outside `[A-Za-z0-9]` is dropped from
/// each name fragment independently. Callers must pass the same field values
/// that were used when the driver was created, otherwise lookups miss.
pub fn derive_key(first: &str, last: &str, hire_date: NaiveDate) -> Result<IdentityKey, KeyError> {
    let first_clean = strip_non_alnum(first);
    if first_clean.is_empty() {
        return Err(KeyError::EmptyName {
            field: "first",
            raw: first.to_string(),
        });
    }
    let last_clean = strip_non_alnum(last);
    if last_clean.is_empty() {
        return Err(KeyError::EmptyName {
            field: "last",
            raw: last.to_string(),
        });
    }

    Ok(IdentityKey(format!(
        "{first_clean}-{last_clean}_{}",
        format_mdy(hire_date)
    )))
}

/// Base login name: lower-cased first initial + last name, `[a-z0-9]` only.
///
/// The initial is the first character of `first` that survives the filter, so
/// a leading apostrophe or space does not consume it.
pub fn derive_base_username(first: &str, last: &str) -> Result<String, KeyError> {
    let initial = first
        .to_lowercase()
        .chars()
        .find(|c| c.is_ascii_alphanumeric())
        .ok_or_else(|| KeyError::EmptyName {
            field: "first",
            raw: first.to_string(),
        })?;

    let last_clean = strip_non_alnum(&last.to_lowercase());
    if last_clean.is_empty() {
        return Err(KeyError::EmptyName {
            field: "last",
            raw: last.to_string(),
        });
    }

    Ok(format!("{initial}{last_clean}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn key_matches_documented_layout() {
        let k = derive_key("John", "Smith", jan15()).unwrap();
        assert_eq!(k.as_str(), "John-Smith_01-15-2024");
    }

    #[test]
    fn key_is_stable_across_calls() {
        let a = derive_key("Mary Ann", "O'Neil-Jones", jan15()).unwrap();
        let b = derive_key("Mary Ann", "O'Neil-Jones", jan15()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "MaryAnn-ONeilJones_01-15-2024");
    }

    #[test]
    fn key_preserves_case() {
        let k = derive_key("jOhN", "SMITH", jan15()).unwrap();
        assert_eq!(k.as_str(), "jOhN-SMITH_01-15-2024");
    }

    #[test]
    fn key_rejects_punctuation_only_names() {
        let err = derive_key("--", "Smith", jan15()).unwrap_err();
        assert!(matches!(err, KeyError::EmptyName { field: "first", .. }));

        let err = derive_key("John", " ", jan15()).unwrap_err();
        assert!(matches!(err, KeyError::EmptyName { field: "last", .. }));
    }

    #[test]
    fn base_username_is_initial_plus_last() {
        assert_eq!(derive_base_username("John", "Smith").unwrap(), "jsmith");
        assert_eq!(derive_base_username("Ana", "De La Cruz").unwrap(), "adelacruz");
        assert_eq!(derive_base_username("'Bo", "O'Hara").unwrap(), "bohara");
    }

    #[test]
    fn base_username_drops_non_ascii() {
        assert_eq!(derive_base_username("José", "Núñez").unwrap(), "jnez");
    }

    #[test]
    fn base_username_rejects_empty_fragments() {
        assert!(derive_base_username("", "Smith").is_err());
        assert!(derive_base_username("John", "").is_err());
    }
}

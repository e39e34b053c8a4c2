use std::collections::BTreeMap;

fn fold(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Collapse spelling variants of canonical namespaces (`EncompassId`,
/// `encompass_id`) onto the canonical key. The first value seen in map order
/// wins, with the canonical spelling itself taking precedence. Keys that match
/// no canonical namespace pass through untouched.
pub fn normalize_external_ids(
    ids: &BTreeMap<String, String>,
    canonical: &[String],
) -> BTreeMap<String, String> {
    let folded: Vec<(String, &String)> = canonical.iter().map(|c| (fold(c), c)).collect();
    let mut out = BTreeMap::new();

    for c in canonical {
        if let Some(v) = ids.get(c) {
            out.insert(c.clone(), v.clone());
        }
    }

    for (k, v) in ids {
        match folded.iter().find(|(f, _)| *f == fold(k)) {
            Some((_, canon)) => {
                out.entry((*canon).clone()).or_insert_with(|| v.clone());
            }
            None => {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    out
}

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// How raw atlas ids map to hemispheres and display names.
///
/// Ids at or above `lr_offset` encode the left-hemisphere copy of the region
/// `id - lr_offset`; everything else is right (or unsided). The offset must be
/// larger than every base id in the table, which is checked by
/// [`validate_offset`] before any resolution happens.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub lr_offset: i32,
    pub right_suffix: String,
    pub left_suffix: String,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            lr_offset: 2000,
            right_suffix: "_R".to_string(),
            left_suffix: "_L".to_string(),
        }
    }
}

/// A raw atlas id resolved to its canonical region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLabel {
    pub base_id: i32,
    pub hemisphere: &'static str,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct LabelRecord {
    id: String,
    name: String,
}

/// Loads the id -> name table from a CSV with at least `id` and `name` columns.
/// Rows with a non-parseable id or a blank name are skipped.
pub fn load_label_table(path: &Path) -> Result<HashMap<i32, String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open label table {:?}", path))?;

    let headers = reader.headers().context("Label table has no header row")?;
    if !headers.iter().any(|h| h == "id") || !headers.iter().any(|h| h == "name") {
        bail!(
            "Label table must contain columns 'id' and 'name', found: {:?}",
            headers
        );
    }

    let mut table = HashMap::new();
    for record in reader.deserialize::<LabelRecord>() {
        let Ok(record) = record else { continue };
        let Ok(id) = record.id.trim().parse::<i32>() else {
            continue;
        };
        let name = record.name.trim();
        if name.is_empty() {
            continue;
        }
        table.insert(id, name.to_string());
    }
    Ok(table)
}

/// Rejects configurations where a legitimate base id reaches the left/right
/// offset, since such an id would silently resolve to the wrong hemisphere.
pub fn validate_offset(table: &HashMap<i32, String>, opts: &ResolveOptions) -> Result<()> {
    if opts.lr_offset <= 0 {
        return Ok(());
    }
    if let Some((&id, name)) = table.iter().find(|(&id, _)| id >= opts.lr_offset) {
        bail!(
            "Label table id {} ({:?}) is not below the left/right offset {}; \
             hemisphere resolution would be ambiguous",
            id,
            name,
            opts.lr_offset
        );
    }
    Ok(())
}

/// Resolves a raw atlas id into (base id, hemisphere, display name).
///
/// Total and side-effect free: unknown ids degrade to a synthesized `ID_<n>`
/// name instead of failing, and id 0 is always the reserved background.
pub fn resolve(roi_id: i32, table: &HashMap<i32, String>, opts: &ResolveOptions) -> ResolvedLabel {
    if roi_id == 0 {
        return ResolvedLabel {
            base_id: 0,
            hemisphere: "",
            name: "Background".to_string(),
        };
    }

    if opts.lr_offset > 0 && roi_id >= opts.lr_offset {
        let base_id = roi_id - opts.lr_offset;
        ResolvedLabel {
            base_id,
            hemisphere: "L",
            name: format!("{}{}", base_name(table, base_id), opts.left_suffix),
        }
    } else {
        ResolvedLabel {
            base_id: roi_id,
            hemisphere: "R",
            name: format!("{}{}", base_name(table, roi_id), opts.right_suffix),
        }
    }
}

fn base_name(table: &HashMap<i32, String>, base_id: i32) -> String {
    table
        .get(&base_id)
        .cloned()
        .unwrap_or_else(|| format!("ID_{}", base_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn thalamus_table() -> HashMap<i32, String> {
        HashMap::from([(5, "Thalamus".to_string())])
    }

    #[test]
    fn zero_is_always_background() {
        let resolved = resolve(0, &thalamus_table(), &ResolveOptions::default());
        assert_eq!(resolved.base_id, 0);
        assert_eq!(resolved.hemisphere, "");
        assert_eq!(resolved.name, "Background");
    }

    #[test]
    fn offset_ids_resolve_to_left() {
        let resolved = resolve(2005, &thalamus_table(), &ResolveOptions::default());
        assert_eq!(resolved.base_id, 5);
        assert_eq!(resolved.hemisphere, "L");
        assert_eq!(resolved.name, "Thalamus_L");
    }

    #[test]
    fn low_ids_resolve_to_right() {
        let resolved = resolve(5, &thalamus_table(), &ResolveOptions::default());
        assert_eq!(resolved.base_id, 5);
        assert_eq!(resolved.hemisphere, "R");
        assert_eq!(resolved.name, "Thalamus_R");
    }

    #[test]
    fn unknown_ids_get_synthesized_names() {
        let resolved = resolve(42, &HashMap::new(), &ResolveOptions::default());
        assert_eq!(resolved.name, "ID_42_R");
        let resolved = resolve(2042, &HashMap::new(), &ResolveOptions::default());
        assert_eq!(resolved.name, "ID_42_L");
    }

    #[test]
    fn zero_offset_disables_hemisphere_split() {
        let opts = ResolveOptions {
            lr_offset: 0,
            ..ResolveOptions::default()
        };
        let resolved = resolve(2005, &thalamus_table(), &opts);
        assert_eq!(resolved.base_id, 2005);
        assert_eq!(resolved.hemisphere, "R");
    }

    #[test]
    fn table_loader_skips_junk_rows() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("labels.csv");
        fs::write(
            &path,
            "id,name\nbogus,Foo\n5,Thalamus\n6,\n7,  Cortex  \n",
        )
        .expect("write table");

        let table = load_label_table(&path).expect("load");
        assert_eq!(table.len(), 2);
        assert_eq!(table[&5], "Thalamus");
        assert_eq!(table[&7], "Cortex");
    }

    #[test]
    fn table_loader_requires_id_and_name_columns() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("labels.csv");
        fs::write(&path, "region,label\n1,Foo\n").expect("write table");
        assert!(load_label_table(&path).is_err());
    }

    #[test]
    fn offset_collision_is_rejected() {
        let table = HashMap::from([(2300, "TooBig".to_string())]);
        assert!(validate_offset(&table, &ResolveOptions::default()).is_err());
        assert!(validate_offset(&thalamus_table(), &ResolveOptions::default()).is_ok());
    }
}

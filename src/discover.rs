use std::fs;
use std::path::{Path, PathBuf};

/// One discovered (group, modality, template volume) triple.
#[derive(Debug, Clone)]
pub struct TemplatePair {
    pub group: String,
    pub modality: String,
    pub template: PathBuf,
}

// Fixed layout produced by the upstream registration pipeline:
// <root>/derivatives/Brain_extracted/<MOD>/To_Template/<GROUP>/template/*_template.nii.gz
const BRAIN_EXTRACTED: &[&str] = &["derivatives", "Brain_extracted"];
const TO_TEMPLATE: &str = "To_Template";
const TEMPLATE_SUBDIR: &str = "template";
const TEMPLATE_SUFFIX: &str = "_template.nii.gz";

/// Discovers one aligned template volume per (group, modality) pair.
///
/// The canonical `<group>_<modality>_template.nii.gz` is preferred; otherwise
/// the lexicographically first `*_template.nii.gz` is taken. Missing
/// directories and empty template folders are skipped silently, so an empty
/// result means "nothing to do", not an error.
pub fn discover_templates(out_root: &Path, modalities: &[String]) -> Vec<TemplatePair> {
    let mut found = Vec::new();
    for modality in modalities {
        let mut base = out_root.to_path_buf();
        for part in BRAIN_EXTRACTED {
            base.push(part);
        }
        base.push(modality);
        base.push(TO_TEMPLATE);

        for group_dir in sorted_dirs(&base) {
            let Some(group) = group_dir
                .file_name()
                .and_then(|n| n.to_str())
                .map(String::from)
            else {
                continue;
            };
            let tpl_dir = group_dir.join(TEMPLATE_SUBDIR);
            if !tpl_dir.is_dir() {
                continue;
            }

            let expected = tpl_dir.join(format!("{}_{}{}", group, modality, TEMPLATE_SUFFIX));
            let template = if expected.is_file() {
                expected
            } else if let Some(hit) = first_suffix_match(&tpl_dir) {
                hit
            } else {
                continue;
            };

            found.push(TemplatePair {
                group,
                modality: modality.clone(),
                template,
            });
        }
    }
    found
}

fn sorted_dirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}

fn first_suffix_match(dir: &Path) -> Option<PathBuf> {
    let mut hits: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.ends_with(TEMPLATE_SUFFIX))
        })
        .collect();
    hits.sort();
    hits.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn template_dir(root: &Path, modality: &str, group: &str) -> PathBuf {
        let dir = root
            .join("derivatives")
            .join("Brain_extracted")
            .join(modality)
            .join(TO_TEMPLATE)
            .join(group)
            .join(TEMPLATE_SUBDIR);
        fs::create_dir_all(&dir).expect("create layout");
        dir
    }

    #[test]
    fn canonical_name_is_preferred() {
        let root = tempdir().expect("tempdir");
        let dir = template_dir(root.path(), "T1map", "S01");
        fs::write(dir.join("S01_T1map_template.nii.gz"), b"x").expect("write");
        fs::write(dir.join("aaa_template.nii.gz"), b"x").expect("write");

        let pairs = discover_templates(root.path(), &["T1map".to_string()]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].group, "S01");
        assert_eq!(pairs[0].modality, "T1map");
        assert!(pairs[0].template.ends_with("S01_T1map_template.nii.gz"));
    }

    #[test]
    fn wildcard_fallback_is_lexicographically_first() {
        let root = tempdir().expect("tempdir");
        let dir = template_dir(root.path(), "T1map", "S01");
        fs::write(dir.join("zzz_template.nii.gz"), b"x").expect("write");
        fs::write(dir.join("aaa_template.nii.gz"), b"x").expect("write");
        fs::write(dir.join("unrelated.nii.gz"), b"x").expect("write");

        let pairs = discover_templates(root.path(), &["T1map".to_string()]);
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].template.ends_with("aaa_template.nii.gz"));
    }

    #[test]
    fn groups_without_templates_are_skipped() {
        let root = tempdir().expect("tempdir");
        template_dir(root.path(), "T1map", "S01");
        let pairs = discover_templates(root.path(), &["T1map".to_string()]);
        assert!(pairs.is_empty());
    }

    #[test]
    fn missing_layout_yields_empty_list() {
        let root = tempdir().expect("tempdir");
        let pairs = discover_templates(root.path(), &["T1map".to_string(), "UNIT1".to_string()]);
        assert!(pairs.is_empty());
    }

    #[test]
    fn groups_are_visited_in_sorted_order() {
        let root = tempdir().expect("tempdir");
        for group in ["S02", "S01"] {
            let dir = template_dir(root.path(), "T1map", group);
            fs::write(
                dir.join(format!("{}_T1map_template.nii.gz", group)),
                b"x",
            )
            .expect("write");
        }
        let pairs = discover_templates(root.path(), &["T1map".to_string()]);
        let groups: Vec<&str> = pairs.iter().map(|p| p.group.as_str()).collect();
        assert_eq!(groups, vec!["S01", "S02"]);
    }
}

use std::path::Path;

use anyhow::{Context, Result};
use ndarray::ArrayD;
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

/// Loads a NIfTI volume as a float array. Only voxels and shape are consulted
/// downstream; orientation and affine belong to the upstream registration
/// stages and are ignored here.
pub fn load_value_volume(path: &Path) -> Result<ArrayD<f32>> {
    let obj = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("Failed to open NIfTI volume {:?}", path))?;
    obj.into_volume()
        .into_ndarray::<f32>()
        .with_context(|| format!("Failed to convert {:?} into an ndarray", path))
}

/// Loads an atlas volume as integer labels.
///
/// Atlases are frequently stored with a float datatype, so values are rounded
/// rather than truncated before the integer cast.
pub fn load_label_volume(path: &Path) -> Result<ArrayD<i32>> {
    let data = load_value_volume(path)?;
    Ok(data.mapv(|v| v.round() as i32))
}

/// Sorted distinct non-zero ids present in a label volume.
pub fn present_roi_ids(labels: &ArrayD<i32>) -> Vec<i32> {
    let mut ids: Vec<i32> = labels.iter().copied().filter(|&v| v != 0).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn present_ids_are_sorted_distinct_and_nonzero() {
        let mut labels = Array3::<i32>::zeros((2, 2, 2));
        labels[[0, 0, 0]] = 7;
        labels[[0, 0, 1]] = 7;
        labels[[1, 1, 1]] = 2005;
        labels[[0, 1, 0]] = 3;

        let ids = present_roi_ids(&labels.into_dyn());
        assert_eq!(ids, vec![3, 7, 2005]);
    }

    #[test]
    fn empty_atlas_has_no_ids() {
        let labels = Array3::<i32>::zeros((2, 2, 2)).into_dyn();
        assert!(present_roi_ids(&labels).is_empty());
    }
}

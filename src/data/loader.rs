// ============================================================
// Layer 4 — CSV Image Loader
// ============================================================
// Reads one partition of the dataset from two aligned CSV
// tables using the `csv` crate:
//
//   <images file>   one row per sample, H*W pixel intensities
//   <labels file>   one row per sample, a single 1-indexed label
//
// On load:
//   - pixel values must be integers in 0..=255
//   - every pixel row must have exactly H*W values
//   - the two tables must have the same number of rows
//   - labels must be integers in 1..=MAX_CLASSES
//   - labels are shifted 1 → 0 here, and only here
//
// The first row of each table is skipped as a header unless
// the loader is told otherwise.
//
// Reference: csv crate documentation

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::domain::error::PipelineError;
use crate::domain::sample::{DataVariant, ImageShape, Partition, RawImages};
use crate::domain::traits::LabeledImageSource;

/// Largest 1-indexed label accepted on disk. The class count is derived
/// from the labels, so this also bounds the width of the model head.
pub const MAX_CLASSES: usize = 1024;

/// Loads pixel/label CSV pairs for a dataset variant.
/// Implements the LabeledImageSource trait from Layer 3.
pub struct CsvImageSource {
    dir:        PathBuf,
    variant:    DataVariant,
    shape:      ImageShape,
    has_header: bool,
}

impl CsvImageSource {
    pub fn new(dir: impl Into<PathBuf>, variant: DataVariant, shape: ImageShape) -> Self {
        Self { dir: dir.into(), variant, shape, has_header: true }
    }

    pub fn has_header(mut self, yes: bool) -> Self {
        self.has_header = yes;
        self
    }

    fn reader(&self, path: &Path) -> Result<csv::Reader<std::fs::File>> {
        csv::ReaderBuilder::new()
            .has_headers(self.has_header)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Cannot open '{}'", path.display()))
    }

    fn read_images(&self, path: &Path) -> Result<Vec<Vec<u8>>> {
        let mut rows = Vec::new();
        for (i, record) in self.reader(path)?.records().enumerate() {
            let record = record.with_context(|| format!("Bad CSV row {} in '{}'", i, path.display()))?;
            if record.len() != self.shape.pixels() {
                return Err(PipelineError::data_shape(format!(
                    "row {} of '{}' has {} pixels, expected {}",
                    i,
                    path.display(),
                    record.len(),
                    self.shape.pixels()
                ))
                .into());
            }
            let row = record
                .iter()
                .map(parse_pixel)
                .collect::<Result<Vec<u8>, _>>()
                .with_context(|| format!("row {} of '{}'", i, path.display()))?;
            rows.push(row);
        }
        Ok(rows)
    }

    fn read_labels(&self, path: &Path) -> Result<Vec<usize>> {
        let mut labels = Vec::new();
        for (i, record) in self.reader(path)?.records().enumerate() {
            let record = record.with_context(|| format!("Bad CSV row {} in '{}'", i, path.display()))?;
            let field = match (record.len(), record.get(0)) {
                (1, Some(f)) => f,
                (n, _) => {
                    return Err(PipelineError::data_shape(format!(
                        "label row {} of '{}' has {} fields, expected 1",
                        i,
                        path.display(),
                        n
                    ))
                    .into())
                }
            };
            labels.push(shift_label(field).with_context(|| format!("label row {} of '{}'", i, path.display()))?);
        }
        Ok(labels)
    }
}

impl LabeledImageSource for CsvImageSource {
    fn load(&self, partition: Partition) -> Result<RawImages> {
        let (images_file, labels_file) = self.variant.file_names(partition);
        let images_path = self.dir.join(images_file);
        let labels_path = self.dir.join(labels_file);

        tracing::info!("Loading {:?} images from '{}'", partition, images_path.display());
        let images = self.read_images(&images_path)?;
        let labels = self.read_labels(&labels_path)?;

        if images.len() != labels.len() {
            return Err(PipelineError::data_shape(format!(
                "'{}' has {} rows but '{}' has {}",
                images_path.display(),
                images.len(),
                labels_path.display(),
                labels.len()
            ))
            .into());
        }

        tracing::info!("Loaded {} {:?} samples", images.len(), partition);
        Ok(RawImages { shape: self.shape, images, labels })
    }
}

/// Pixel intensity as u8. Accepts "12" and "12.0".
fn parse_pixel(field: &str) -> Result<u8, PipelineError> {
    let v: f64 = field
        .trim()
        .parse()
        .map_err(|_| PipelineError::data_shape(format!("'{field}' is not a pixel value")))?;
    if !(0.0..=255.0).contains(&v) || v.fract() != 0.0 {
        return Err(PipelineError::data_shape(format!("pixel value {v} outside 0..=255")));
    }
    Ok(v as u8)
}

/// 1-indexed label on disk → 0-indexed class id.
fn shift_label(field: &str) -> Result<usize, PipelineError> {
    let v: f64 = field
        .trim()
        .parse()
        .map_err(|_| PipelineError::data_shape(format!("'{field}' is not a label")))?;
    if !v.is_finite() || v.fract() != 0.0 {
        return Err(PipelineError::data_shape(format!("label {v} is not an integer")));
    }
    if v < 1.0 || v > MAX_CLASSES as f64 {
        return Err(PipelineError::data_shape(format!(
            "label {v} outside 1..={MAX_CLASSES}"
        )));
    }
    Ok(v as usize - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_variant(dir: &Path, images: &str, labels: &str) {
        let (img, lbl) = DataVariant::Primary.file_names(Partition::Train);
        fs::write(dir.join(img), images).unwrap();
        fs::write(dir.join(lbl), labels).unwrap();
    }

    #[test]
    fn test_loads_and_shifts_labels() {
        let dir = tempfile::tempdir().unwrap();
        write_variant(dir.path(), "p0,p1,p2,p3\n0,255,10,20\n1,2,3,4\n", "label\n1\n28\n");

        let src = CsvImageSource::new(dir.path(), DataVariant::Primary, ImageShape::new(2, 2));
        let raw = src.load(Partition::Train).unwrap();

        assert_eq!(raw.images, vec![vec![0, 255, 10, 20], vec![1, 2, 3, 4]]);
        assert_eq!(raw.labels, vec![0, 27]);
    }

    #[test]
    fn test_headerless_tables() {
        let dir = tempfile::tempdir().unwrap();
        write_variant(dir.path(), "0,0,0,0\n9,9,9,9\n", "3\n2\n");

        let src = CsvImageSource::new(dir.path(), DataVariant::Primary, ImageShape::new(2, 2))
            .has_header(false);
        let raw = src.load(Partition::Train).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.labels, vec![2, 1]);
    }

    #[test]
    fn test_row_count_mismatch_is_shape_error() {
        let dir = tempfile::tempdir().unwrap();
        write_variant(dir.path(), "0,0,0,0\n1,1,1,1\n", "1\n");

        let src = CsvImageSource::new(dir.path(), DataVariant::Primary, ImageShape::new(2, 2))
            .has_header(false);
        let err = src.load(Partition::Train).unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::DataShape(_))));
    }

    #[test]
    fn test_wrong_pixel_count_is_shape_error() {
        let dir = tempfile::tempdir().unwrap();
        write_variant(dir.path(), "0,0,0\n", "1\n");

        let src = CsvImageSource::new(dir.path(), DataVariant::Primary, ImageShape::new(2, 2))
            .has_header(false);
        let err = src.load(Partition::Train).unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::DataShape(_))));
    }

    #[test]
    fn test_zero_label_rejected() {
        assert!(shift_label("0").is_err());
        assert_eq!(shift_label(" 5 ").unwrap(), 4);
    }

    #[test]
    fn test_out_of_range_labels_rejected() {
        for field in ["1e30", "1000000", "1025", "inf", "NaN", "2.5"] {
            assert!(
                matches!(shift_label(field), Err(PipelineError::DataShape(_))),
                "accepted label {field}"
            );
        }
        assert_eq!(shift_label("1024").unwrap(), MAX_CLASSES - 1);
    }

    #[test]
    fn test_huge_label_fails_load_with_shape_error() {
        let dir = tempfile::tempdir().unwrap();
        write_variant(dir.path(), "0,0,0,0
1,1,1,1
", "1
1e30
");

        let src = CsvImageSource::new(dir.path(), DataVariant::Primary, ImageShape::new(2, 2))
            .has_header(false);
        let err = src.load(Partition::Train).unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::DataShape(_))));
    }

    #[test]
    fn test_pixel_parsing() {
        assert_eq!(parse_pixel("12.0").unwrap(), 12);
        assert!(parse_pixel("256").is_err());
        assert!(parse_pixel("-1").is_err());
        assert!(parse_pixel("x").is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let src = CsvImageSource::new(dir.path(), DataVariant::Alternate, ImageShape::new(32, 32));
        let err = src.load(Partition::Test).unwrap_err();
        assert!(format!("{err:#}").contains("csvTestImages 3360x1024.csv"));
    }
}

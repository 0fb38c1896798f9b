//! CUB-200-2011 Metadata Joining
//!
//! The dataset ships three whitespace-delimited text files:
//!
//! - `images.txt`: `image_id image_filename`
//! - `image_class_labels.txt`: `image_id class_id`
//! - `classes.txt`: `class_id species_name`
//!
//! This module joins them into a single `labels.csv` table with columns
//! `image_id,image_filename,label,species`. The join is an inner join on
//! the shared keys; rows without a match are dropped silently. Output rows
//! follow `images.txt` order, so re-running on unchanged inputs produces a
//! byte-identical file.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::utils::error::{CubError, Result};

/// One row of the joined label table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Image id from `images.txt`
    pub image_id: u32,
    /// Image path relative to the dataset's `images/` directory
    pub image_filename: String,
    /// Class id from `classes.txt` (1-based, as shipped)
    pub label: u32,
    /// Species name, e.g. "001.Black_footed_Albatross"
    pub species: String,
}

/// Parse one `<id> <value>` line
fn parse_line<'a>(line: &'a str, file: &str, line_no: usize) -> Result<(u32, &'a str)> {
    let mut parts = line.splitn(2, ' ');
    let id = parts
        .next()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(|| CubError::Metadata(format!("{}:{}: invalid id column", file, line_no)))?;
    let value = parts
        .next()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CubError::Metadata(format!("{}:{}: missing value column", file, line_no)))?;
    Ok((id, value))
}

/// Read a two-column metadata file into `(id, value)` pairs, in file order
fn read_pairs(path: &Path) -> Result<Vec<(u32, String)>> {
    let file = File::open(path)
        .map_err(|_| CubError::PathNotFound(path.to_path_buf()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let mut pairs = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (id, value) = parse_line(&line, &name, idx + 1)?;
        pairs.push((id, value.to_string()));
    }
    Ok(pairs)
}

/// Read `images.txt`: `(image_id, image_filename)`
pub fn read_images_file(path: &Path) -> Result<Vec<(u32, String)>> {
    read_pairs(path)
}

/// Read `image_class_labels.txt`: `(image_id, class_id)`
pub fn read_class_labels_file(path: &Path) -> Result<Vec<(u32, u32)>> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    read_pairs(path)?
        .into_iter()
        .enumerate()
        .map(|(idx, (image_id, class_id))| {
            let class_id = class_id.parse::<u32>().map_err(|_| {
                CubError::Metadata(format!("{}:{}: invalid class id", name, idx + 1))
            })?;
            Ok((image_id, class_id))
        })
        .collect()
}

/// Read `classes.txt`: `(class_id, species_name)`
pub fn read_classes_file(path: &Path) -> Result<Vec<(u32, String)>> {
    read_pairs(path)
}

/// Inner-join the three tables on `image_id` and `class_id`.
///
/// Rows whose image id carries no label, or whose class id names no
/// species, are dropped without error. Output follows `images.txt` order.
pub fn join_tables(
    images: &[(u32, String)],
    class_labels: &[(u32, u32)],
    classes: &[(u32, String)],
) -> Vec<ImageRecord> {
    let label_by_image: HashMap<u32, u32> = class_labels.iter().copied().collect();
    let species_by_class: HashMap<u32, &str> = classes
        .iter()
        .map(|(id, name)| (*id, name.as_str()))
        .collect();

    images
        .iter()
        .filter_map(|(image_id, filename)| {
            let label = *label_by_image.get(image_id)?;
            let species = *species_by_class.get(&label)?;
            Some(ImageRecord {
                image_id: *image_id,
                image_filename: filename.clone(),
                label,
                species: species.to_string(),
            })
        })
        .collect()
}

/// Write the joined table as CSV with a header row
pub fn write_labels_csv(records: &[ImageRecord], output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(output)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a `labels.csv` file back into records
pub fn read_labels_csv(path: &Path) -> Result<Vec<ImageRecord>> {
    if !path.exists() {
        return Err(CubError::PathNotFound(path.to_path_buf()));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<ImageRecord>, csv::Error>>()?;
    Ok(records)
}

/// One-shot ETL: join the three metadata files under `data_dir` and write
/// `labels.csv` to `output`. Returns the number of rows written.
pub fn build_labels_csv(data_dir: &Path, output: &Path) -> Result<usize> {
    let images = read_images_file(&data_dir.join("images.txt"))?;
    let class_labels = read_class_labels_file(&data_dir.join("image_class_labels.txt"))?;
    let classes = read_classes_file(&data_dir.join("classes.txt"))?;

    info!(
        "Joining {} images, {} labels, {} classes",
        images.len(),
        class_labels.len(),
        classes.len()
    );

    let records = join_tables(&images, &class_labels, &classes);
    write_labels_csv(&records, output)?;

    info!("Wrote {} rows to {:?}", records.len(), output);

    Ok(records.len())
}

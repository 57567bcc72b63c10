use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Reader, Xlsx};
use log::{info, warn};
use serde::Deserialize;

use crate::error::PipelineError;
use crate::model::WorkItem;

/// Ordered, repeatable list of work items per category.
pub trait WorkSource {
    fn items(&self, category: &str) -> Result<Vec<WorkItem>, PipelineError>;
}

#[derive(Debug, Deserialize)]
struct UrlRow {
    #[serde(rename = "url", alias = "URL", alias = "Url", alias = "link", alias = "Link")]
    url: Option<String>,
}

/// Reads `{input_dir}/{category}.csv`, falling back to `{category}.xlsx`.
pub struct FileWorkSource {
    input_dir: PathBuf,
}

impl FileWorkSource {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        FileWorkSource {
            input_dir: input_dir.into(),
        }
    }

    fn locate(&self, category: &str) -> Option<PathBuf> {
        ["csv", "xlsx"]
            .iter()
            .map(|ext| self.input_dir.join(format!("{}.{}", category, ext)))
            .find(|p| p.exists())
    }
}

impl WorkSource for FileWorkSource {
    fn items(&self, category: &str) -> Result<Vec<WorkItem>, PipelineError> {
        let unavailable = |reason: String| PipelineError::SourceUnavailable {
            category: category.to_string(),
            reason,
        };

        let path = self.locate(category).ok_or_else(|| {
            unavailable(format!(
                "no {}.csv or {}.xlsx in {}",
                category,
                category,
                self.input_dir.display()
            ))
        })?;

        let is_excel = path.extension().map_or(false, |ext| ext == "xlsx");
        let loaded = if is_excel {
            load_excel(&path)
        } else {
            load_csv(&path)
        };
        let urls = loaded.map_err(unavailable)?;

        info!("Loaded {} item(s) for '{}' from {:?}", urls.len(), category, path);
        Ok(into_items(category, urls))
    }
}

fn into_items(category: &str, urls: Vec<String>) -> Vec<WorkItem> {
    urls.into_iter()
        .enumerate()
        .map(|(index, payload)| WorkItem {
            category: category.to_string(),
            index,
            payload,
        })
        .collect()
}

fn load_csv(path: &Path) -> Result<Vec<String>, String> {
    let file = File::open(path).map_err(|e| format!("could not open {:?}: {}", path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let mut urls = Vec::new();
    for (line, result) in rdr.deserialize::<UrlRow>().enumerate() {
        // A bad row would shift every later index, so the whole list is rejected.
        let row = result.map_err(|e| format!("row {}: {}", line + 1, e))?;
        match row.url {
            Some(url) if !url.is_empty() => urls.push(url),
            _ => warn!("Skipping blank row {} in {:?}", line + 1, path),
        }
    }
    Ok(urls)
}

fn load_excel(path: &Path) -> Result<Vec<String>, String> {
    let mut excel: Xlsx<_> =
        open_workbook(path).map_err(|e| format!("could not open Excel file {:?}: {}", path, e))?;

    let worksheets = excel.worksheets();
    let (_name, range) = worksheets
        .first()
        .ok_or_else(|| format!("{:?} has no worksheets", path))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| format!("{:?} is empty", path))?;
    let url_idx = header
        .iter()
        .position(|cell| {
            let h = cell.to_string().to_lowercase();
            h.contains("url") || h.contains("link")
        })
        .ok_or_else(|| format!("{:?} header has no 'url' column", path))?;

    Ok(rows
        .filter_map(|row| row.get(url_idx).map(|c| c.to_string().trim().to_string()))
        .filter(|s| !s.is_empty())
        .collect())
}

/// Fixed lists held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryWorkSource {
    lists: HashMap<String, Vec<String>>,
}

impl MemoryWorkSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category<I, S>(mut self, category: &str, payloads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lists.insert(
            category.to_string(),
            payloads.into_iter().map(Into::into).collect(),
        );
        self
    }
}

impl WorkSource for MemoryWorkSource {
    fn items(&self, category: &str) -> Result<Vec<WorkItem>, PipelineError> {
        self.lists
            .get(category)
            .map(|urls| into_items(category, urls.clone()))
            .ok_or_else(|| PipelineError::SourceUnavailable {
                category: category.to_string(),
                reason: "unknown category".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_csv_items_are_indexed_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("fast-food.csv"),
            "url\n\"https://maps.example/a/@1,2,16z\"\n\n\"https://maps.example/b/@3,4,16z\"\n",
        )
        .unwrap();

        let source = FileWorkSource::new(dir.path());
        let items = source.items("fast-food").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].index, 0);
        assert_eq!(items[1].index, 1);
        assert_eq!(items[1].payload, "https://maps.example/b/@3,4,16z");
        assert_eq!(items[1].category, "fast-food");

        // same sequence on every call
        assert_eq!(source.items("fast-food").unwrap(), items);
    }

    #[test]
    fn test_header_alias_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pizzeria.csv"), "Link\nhttps://a\nhttps://b\n").unwrap();
        let items = FileWorkSource::new(dir.path()).items("pizzeria").unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_missing_list_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileWorkSource::new(dir.path()).items("brasserie").unwrap_err();
        match err {
            PipelineError::SourceUnavailable { category, .. } => assert_eq!(category, "brasserie"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_memory_source() {
        let source = MemoryWorkSource::new().with_category("restaurant", ["u1", "u2", "u3"]);
        let items = source.items("restaurant").unwrap();
        assert_eq!(items.iter().map(|i| i.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(source.items("sushi").is_err());
    }
}

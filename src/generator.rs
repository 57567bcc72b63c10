use std::fs;
use std::io;
use std::path::Path;

use log::info;

use crate::coordinates::{CoordinateParser, Coordinates};
use crate::error::PipelineError;

/// Search URL for one category around one point.
pub fn search_url(category: &str, coords: &Coordinates) -> String {
    format!(
        "https://www.google.com/maps/search/{}/@{},{},16z",
        category, coords.lat, coords.lng
    )
}

/// Reads every data line of `source` (header skipped) and keeps the
/// `@lat,lng,` pairs it finds, in file order.
pub fn load_coordinates(source: &Path) -> Result<Vec<Coordinates>, PipelineError> {
    let content = fs::read_to_string(source).map_err(|e| PipelineError::store_io(source, e))?;
    let parser = CoordinateParser::new();
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .skip(1)
        .filter_map(|line| parser.parse_listing(line))
        .collect())
}

/// Writes `{out_dir}/{category}.csv` (header `url`) for every category.
/// Returns the number of URLs written to each file.
pub fn generate_category_files(
    source: &Path,
    out_dir: &Path,
    categories: &[String],
) -> Result<usize, PipelineError> {
    let coordinates = load_coordinates(source)?;
    fs::create_dir_all(out_dir).map_err(|e| PipelineError::store_io(out_dir, e))?;

    for category in categories {
        let path = out_dir.join(format!("{}.csv", category));
        write_list(&path, category, &coordinates).map_err(|e| PipelineError::store_io(&path, e))?;
        info!(
            "{}.csv written with {} coordinate(s)",
            category,
            coordinates.len()
        );
    }
    Ok(coordinates.len())
}

fn write_list(path: &Path, category: &str, coordinates: &[Coordinates]) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_path(path)?;
    wtr.write_record(["url"])?;
    for coords in coordinates {
        wtr.write_record([search_url(category, coords)])?;
    }
    wtr.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input_loader::{FileWorkSource, WorkSource};

    const SOURCE: &str = "\
Name,Link
Atelier A,https://www.google.com/maps/place/a/@48.8566,2.3522,17z/data=x
No coords,https://example.org/b

Atelier C,\"https://www.google.com/maps/place/c/@-21.1151,55.5364,15z\"
";

    #[test]
    fn test_coordinates_are_extracted_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("therapists.csv");
        fs::write(&source, SOURCE).unwrap();

        let coords = load_coordinates(&source).unwrap();
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[0].lat, "48.8566");
        assert_eq!(coords[1].lng, "55.5364");
    }

    #[test]
    fn test_generated_lists_feed_the_work_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("therapists.csv");
        fs::write(&source, SOURCE).unwrap();
        let out = dir.path().join("csvCateg");

        let categories = vec!["fast-food".to_string(), "brasserie".to_string()];
        let written = generate_category_files(&source, &out, &categories).unwrap();
        assert_eq!(written, 2);

        let raw = fs::read_to_string(out.join("fast-food.csv")).unwrap();
        assert!(raw.starts_with("\"url\"\n"));
        assert!(raw.contains("\"https://www.google.com/maps/search/fast-food/@48.8566,2.3522,16z\""));

        let items = FileWorkSource::new(&out).items("brasserie").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[1].payload,
            "https://www.google.com/maps/search/brasserie/@-21.1151,55.5364,16z"
        );
    }

    #[test]
    fn test_missing_source_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate_category_files(&dir.path().join("nope.csv"), dir.path(), &[]).unwrap_err();
        assert!(err.is_store_error());
    }
}

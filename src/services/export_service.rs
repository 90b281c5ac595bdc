use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::models::NavSeries;

/// Byte order mark so spreadsheet tools pick UTF-8 for fund names.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Serialize)]
struct ExportRow {
    date: String,
    nav: String,
    daily_change_pct: String,
}

/// Renders the series as `date,nav,daily_change_pct` CSV, prefixed with a BOM.
/// The first row has an empty change.
pub fn to_csv_bytes(series: &NavSeries) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());

    for (point, change) in series.points().iter().zip(series.daily_change_pct()) {
        writer
            .serialize(ExportRow {
                date: point.date.format("%Y-%m-%d").to_string(),
                nav: format!("{:.4}", point.value),
                daily_change_pct: change.map(|c| format!("{:.2}", c)).unwrap_or_default(),
            })
            .context("Failed to serialize NAV row")?;
    }

    writer.into_inner().context("Failed to flush CSV writer")
}

pub fn export_file_name(code: &str, projected: bool, at: DateTime<Utc>) -> String {
    let ts = at.format("%Y%m%d_%H%M%S");
    if projected {
        format!("fund_{}_valuation_{}.csv", code, ts)
    } else {
        format!("fund_{}_{}.csv", code, ts)
    }
}

/// Writes `bytes` as `file_name` under `dir`, creating the directory if needed.
pub fn write_to_dir(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let path = dir.join(file_name);
    fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;

    info!("✓ Exported {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NavPoint;
    use chrono::{NaiveDate, TimeZone};

    fn series() -> NavSeries {
        NavSeries::new(vec![
            NavPoint::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 1.0),
            NavPoint::new(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), 1.05),
        ])
        .unwrap()
    }

    #[test]
    fn test_csv_has_bom_header_and_rows() {
        let bytes = to_csv_bytes(&series()).unwrap();

        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "date,nav,daily_change_pct");
        assert_eq!(lines[1], "2024-01-02,1.0000,");
        assert_eq!(lines[2], "2024-01-03,1.0500,5.00");
    }

    #[test]
    fn test_file_names() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();

        assert_eq!(export_file_name("000001", false, at), "fund_000001_20240301_093000.csv");
        assert_eq!(export_file_name("000001", true, at), "fund_000001_valuation_20240301_093000.csv");
    }

    #[test]
    fn test_write_to_dir_creates_directory() {
        let dir = std::env::temp_dir().join(format!("fundscope-export-{}", std::process::id()));
        let path = write_to_dir(&dir, "out.csv", b"abc").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"abc");
        fs::remove_dir_all(&dir).unwrap();
    }
}

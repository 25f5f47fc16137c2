use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::SummaryRow;
use crate::domain::format_paise;

/// Summary export wrapper for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryExport {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub hall: String,
    pub wing: String,
    pub summary: Vec<SummaryRow>,
}

/// Writes a computed summary to CSV or JSON. Takes the rows rather than the
/// service so every format renders the same aggregate.
pub struct SummaryExporter<'a> {
    rows: &'a [SummaryRow],
}

impl<'a> SummaryExporter<'a> {
    pub fn new(rows: &'a [SummaryRow]) -> Self {
        Self { rows }
    }

    /// Export the summary to CSV, dues formatted in rupees.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "Name",
            "Wing",
            "Hall",
            "Roll",
            "Total Clothes",
            "Total Dues",
            "Month",
        ])?;

        for row in self.rows {
            csv_writer.write_record([
                row.name.as_str(),
                row.wing.as_str(),
                row.hall.as_str(),
                row.roll.as_str(),
                &row.total_clothes.to_string(),
                &format_paise(row.total_dues),
                row.month.as_str(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(self.rows.len())
    }

    pub fn export_json<W: Write>(&self, mut writer: W, hall: &str, wing: &str) -> Result<usize> {
        let export = SummaryExport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            hall: hall.to_string(),
            wing: wing.to_string(),
            summary: self.rows.to_vec(),
        };

        let json = serde_json::to_string_pretty(&export)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;
        Ok(self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<SummaryRow> {
        vec![SummaryRow {
            name: "Asha, K".into(),
            wing: "A".into(),
            hall: "H1".into(),
            roll: "21CS001".into(),
            total_clothes: 7,
            total_dues: 12550,
            month: "May".into(),
        }]
    }

    #[test]
    fn test_csv_export() {
        let rows = rows();
        let mut out = Vec::new();
        let count = SummaryExporter::new(&rows).export_csv(&mut out).unwrap();
        assert_eq!(count, 1);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Name,Wing,Hall,Roll,Total Clothes,Total Dues,Month"
        );
        assert_eq!(lines.next().unwrap(), "\"Asha, K\",A,H1,21CS001,7,125.50,May");
    }

    #[test]
    fn test_json_export_keeps_rows() {
        let rows = rows();
        let mut out = Vec::new();
        SummaryExporter::new(&rows)
            .export_json(&mut out, "H1", "A")
            .unwrap();

        let parsed: SummaryExport = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.summary, rows);
        assert_eq!(parsed.wing, "A");
    }
}

#![cfg(feature = "web")]

//! CSV and XLSX export of data assets for the admin and customer portals.

use std::error::Error;

use crate::records::DataAsset;

/// Renders assets as CSV with a header row. Fields containing commas,
/// quotes or newlines are quoted with doubled inner quotes.
pub fn assets_to_csv(assets: &[&DataAsset]) -> String {
    let mut csv = String::from("ID,Name,Category,Format,Description,Assigned Customers,Uploaded\n");

    for asset in assets {
        let assigned: Vec<String> = asset
            .assigned_customers
            .iter()
            .map(|id| id.to_string())
            .collect();

        let fields = [
            asset.id.to_string(),
            asset.name.clone(),
            asset.category.as_str().to_string(),
            asset.format.as_str().to_string(),
            asset.description.clone(),
            assigned.join(" "),
            asset.uploaded_at.to_rfc3339(),
        ];

        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                csv.push(',');
            }
            csv.push_str(&escape_csv_field(field));
        }
        csv.push('\n');
    }

    csv
}

/// Renders assets as an XLSX workbook in memory.
pub fn assets_to_xlsx(assets: &[&DataAsset]) -> Result<Vec<u8>, Box<dyn Error>> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    let headers = [
        "ID",
        "Name",
        "Category",
        "Format",
        "Description",
        "Assigned Customers",
        "Uploaded",
    ];
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (row, asset) in assets.iter().enumerate() {
        let row = (row + 1) as u32;
        let assigned: Vec<String> = asset
            .assigned_customers
            .iter()
            .map(|id| id.to_string())
            .collect();

        worksheet.write_number(row, 0, asset.id as f64)?;
        worksheet.write_string(row, 1, &asset.name)?;
        worksheet.write_string(row, 2, asset.category.as_str())?;
        worksheet.write_string(row, 3, asset.format.as_str())?;
        worksheet.write_string(row, 4, &asset.description)?;
        worksheet.write_string(row, 5, assigned.join(" "))?;
        worksheet.write_string(row, 6, asset.uploaded_at.to_rfc3339())?;
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

fn escape_csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{AssetFormat, DataCategory};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn asset(name: &str, description: &str) -> DataAsset {
        DataAsset {
            id: 7,
            name: name.to_string(),
            category: DataCategory::Sales,
            format: AssetFormat::Csv,
            description: description.to_string(),
            assigned_customers: BTreeSet::from([1, 3]),
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(escape_csv_field("plain"), "plain");
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_csv_rows() {
        let a = asset("Q4 Report", "Revenue, orders and churn");
        let csv = assets_to_csv(&[&a]);

        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "ID,Name,Category,Format,Description,Assigned Customers,Uploaded",
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("7,Q4 Report,sales,csv,\"Revenue, orders and churn\",1 3,"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_xlsx_produces_a_workbook() {
        let a = asset("Traffic", "Page views");
        let bytes = assets_to_xlsx(&[&a]).unwrap();
        // XLSX files are zip archives.
        assert_eq!(&bytes[..2], b"PK");
    }
}

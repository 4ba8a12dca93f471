//! Reference glacier table.
//!
//! A CSV file listing the glaciers with direct observations. Only the
//! `RGI_ID` column is used.

use crate::error::{Result, WorkflowError};
use glacierflow_core::GlacierDirectory;
use std::collections::HashSet;
use std::path::Path;

/// Column holding the glacier identifiers.
pub const REFERENCE_ID_COLUMN: &str = "RGI_ID";

/// Read the set of reference glacier identifiers.
pub fn read_reference_ids(path: &Path) -> Result<HashSet<String>> {
    let table_error = |reason: String| WorkflowError::ReferenceTable {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| table_error(e.to_string()))?;
    // Spreadsheet exports often start with a byte order mark.
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    let mut records = parse_records(content).into_iter();

    let header = records.next().ok_or_else(|| table_error("empty table".to_string()))?;
    let column = header
        .iter()
        .position(|h| h == REFERENCE_ID_COLUMN)
        .ok_or_else(|| table_error(format!("no {} column", REFERENCE_ID_COLUMN)))?;

    let mut ids = HashSet::new();
    for (n, fields) in records.enumerate() {
        let id = fields
            .get(column)
            .ok_or_else(|| table_error(format!("row {} has no {} field", n + 1, REFERENCE_ID_COLUMN)))?;
        if !id.is_empty() {
            ids.insert(id.clone());
        }
    }
    Ok(ids)
}

/// Keep the glaciers listed in `ids`, in their original order.
pub fn filter_reference(gdirs: &[GlacierDirectory], ids: &HashSet<String>) -> Vec<GlacierDirectory> {
    gdirs
        .iter()
        .filter(|g| ids.contains(g.rgi_id()))
        .cloned()
        .collect()
}

/// Split CSV text into records, honouring double quotes.
///
/// Separators and line breaks inside quotes belong to the field. Blank
/// records are dropped.
fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    let mut end_record = |fields: &mut Vec<String>, field: &mut String| {
        fields.push(std::mem::take(field).trim().to_string());
        let record = std::mem::take(fields);
        if !(record.len() == 1 && record[0].is_empty()) {
            records.push(record);
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field).trim().to_string()),
            '\r' if !quoted && chars.peek() == Some(&'\n') => {}
            '\n' if !quoted => end_record(&mut fields, &mut field),
            _ => field.push(c),
        }
    }
    end_record(&mut fields, &mut field);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use glacierflow_core::RgiEntity;

    #[test]
    fn test_parse_records() {
        assert_eq!(parse_records("a,b,c"), vec![vec!["a", "b", "c"]]);
        assert_eq!(
            parse_records(r#"1,"Hintereis, F.","x""y""#),
            vec![vec!["1", "Hintereis, F.", r#"x"y"#]]
        );
        assert_eq!(parse_records("a,\r\nb,c\r\n\r\n"), vec![vec!["a", ""], vec!["b", "c"]]);
        assert_eq!(
            parse_records("1,\"two\nlines\"\n2,x"),
            vec![vec!["1", "two\nlines"], vec!["2", "x"]]
        );
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("links.csv");
        std::fs::write(&path, "\u{feff}RGI_ID,WGMS_ID\nA,1\n").unwrap();

        let ids = read_reference_ids(&path).unwrap();
        assert_eq!(ids, HashSet::from(["A".to_string()]));
    }

    #[test]
    fn test_quoted_field_spanning_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("links.csv");
        std::fs::write(&path, "WGMS_ID,RGI_ID,NAME\n1,A,\"multi\nline\"\n2,C,x\n").unwrap();

        let ids = read_reference_ids(&path).unwrap();
        assert_eq!(ids, HashSet::from(["A".to_string(), "C".to_string()]));
    }

    #[test]
    fn test_read_reference_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("links.csv");
        std::fs::write(&path, "WGMS_ID,RGI_ID,NAME\n491,RGI40-11.00897,\"HINTEREIS, F.\"\n\n520,RGI40-11.00787,KESSELWAND\n").unwrap();

        let ids = read_reference_ids(&path).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("RGI40-11.00897"));
        assert!(ids.contains("RGI40-11.00787"));
    }

    #[test]
    fn test_missing_table_and_column() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_reference_ids(&tmp.path().join("none.csv")).unwrap_err();
        assert!(matches!(err, WorkflowError::ReferenceTable { .. }));

        let path = tmp.path().join("bad.csv");
        std::fs::write(&path, "ID,NAME\nA,x\n").unwrap();
        let err = read_reference_ids(&path).unwrap_err();
        assert!(err.to_string().contains("no RGI_ID column"));
    }

    #[test]
    fn test_filter_preserves_order() {
        let tmp = tempfile::tempdir().unwrap();
        let gdirs: Vec<_> = ["D", "A", "C", "B"]
            .iter()
            .map(|id| GlacierDirectory::new(RgiEntity::new(*id), tmp.path(), false).unwrap())
            .collect();
        let ids: HashSet<String> = ["A", "B", "Z"].iter().map(|s| s.to_string()).collect();

        let refs = filter_reference(&gdirs, &ids);
        let refs: Vec<_> = refs.iter().map(|g| g.rgi_id()).collect();
        assert_eq!(refs, vec!["A", "B"]);
    }
}

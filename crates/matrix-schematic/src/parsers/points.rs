//! Key records from an ergogen `points.yaml`.

use log::debug;
use serde_yaml::Value;

use super::scalar_string;
use crate::error::SchematicError;
use crate::types::{BoardDefinition, KeyRecord};

/// A parsed points document. Entries keep their declaration order, which
/// later drives reference numbering.
#[derive(Debug, Clone, Default)]
pub struct PointsDocument {
    keys: Vec<KeyRecord>,
}

impl PointsDocument {
    pub fn parse(data: &[u8]) -> Result<Self, SchematicError> {
        let root: Value = serde_yaml::from_slice(data)
            .map_err(|e| SchematicError::ParseError(format!("points document: {e}")))?;
        let root = root.as_mapping().ok_or_else(|| {
            SchematicError::ParseError("points document is not a mapping".to_string())
        })?;

        let mut keys = Vec::new();
        for (name, value) in root {
            let Some(name) = scalar_string(name) else {
                continue;
            };
            if !value.is_mapping() {
                debug!("point {name} is not a mapping, skipping");
                continue;
            }

            // Connectors and other non-matrix footprints carry no nets, and
            // their meta may not even be a mapping.
            let net = |field: &str| {
                value
                    .get("meta")
                    .and_then(|meta| meta.get(field))
                    .and_then(scalar_string)
            };
            let (Some(column_net), Some(row_net)) = (net("column_net"), net("row_net")) else {
                debug!("point {name} has no column_net/row_net, skipping");
                continue;
            };

            keys.push(KeyRecord {
                x: coordinate(&name, value, "x"),
                y: coordinate(&name, value, "y"),
                name,
                column_net,
                row_net,
            });
        }

        Ok(Self { keys })
    }

    /// Number of matrix keys, across all boards.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Matrix keys belonging to `board`, or every matrix key when `board`
    /// is `None`.
    pub fn keys(&self, board: Option<&BoardDefinition>) -> Vec<KeyRecord> {
        self.keys
            .iter()
            .filter(|key| board.map_or(true, |b| b.matches_key(&key.name)))
            .cloned()
            .collect()
    }
}

/// Design coordinate of a point. Missing or non-numeric values read as 0.
fn coordinate(name: &str, point: &Value, axis: &str) -> f64 {
    match point.get(axis) {
        None | Some(Value::Null) => 0.0,
        Some(v) => v.as_f64().unwrap_or_else(|| {
            debug!("point {name}: {axis} {v:?} is not a number, using 0");
            0.0
        }),
    }
}

/// Parse a points document and select the keys of one board.
pub fn parse(
    data: &[u8],
    board: Option<&BoardDefinition>,
) -> Result<Vec<KeyRecord>, SchematicError> {
    Ok(PointsDocument::parse(data)?.keys(board))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PatternSpec;
    use approx::assert_relative_eq;

    const POINTS: &str = "\
matrix_left_1:
  x: 0
  y: 0
  r: 0
  meta:
    column_net: col0
    row_net: row0
    name: matrix_left_1
matrix_left_2:
  x: 19.5
  y: -2
  meta:
    column_net: col1
    row_net: row0
usb_connector:
  x: 40
  y: 10
  meta:
    name: usb
matrix_left_10:
  meta:
    column_net: col1
    row_net: row1
matrix_right_1:
  x: 120
  y: 0
  meta:
    column_net: col0
    row_net: row0
";

    fn board(patterns: &[&str]) -> BoardDefinition {
        BoardDefinition {
            name: "test".to_string(),
            patterns: patterns
                .iter()
                .map(|p| PatternSpec::parse(p).unwrap())
                .collect(),
        }
    }

    #[test]
    fn test_all_keys_in_declaration_order() {
        let keys = parse(POINTS.as_bytes(), None).unwrap();
        let names: Vec<&str> = keys.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "matrix_left_1",
                "matrix_left_2",
                "matrix_left_10",
                "matrix_right_1"
            ]
        );
    }

    #[test]
    fn test_keys_without_nets_are_skipped() {
        let doc = PointsDocument::parse(POINTS.as_bytes()).unwrap();
        assert_eq!(doc.len(), 4);
        assert!(doc.keys(None).iter().all(|k| k.name != "usb_connector"));
    }

    #[test]
    fn test_coordinates_default_to_zero() {
        let keys = parse(POINTS.as_bytes(), None).unwrap();
        assert_relative_eq!(keys[1].x, 19.5);
        assert_relative_eq!(keys[1].y, -2.0);
        assert_relative_eq!(keys[2].x, 0.0);
        assert_relative_eq!(keys[2].y, 0.0);
    }

    #[test]
    fn test_board_filter_regex() {
        let b = board(&["/^matrix_left.*/"]);
        let keys = parse(POINTS.as_bytes(), Some(&b)).unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0].column_net, "col0");
        assert_eq!(keys[1].column_net, "col1");
    }

    #[test]
    fn test_board_filter_literal() {
        let b = board(&["matrix_left_1"]);
        let keys = parse(POINTS.as_bytes(), Some(&b)).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "matrix_left_1");
    }

    #[test]
    fn test_board_filter_no_match() {
        let b = board(&["/^thumb/"]);
        assert!(parse(POINTS.as_bytes(), Some(&b)).unwrap().is_empty());
    }

    #[test]
    fn test_numeric_net_names() {
        let doc = "k:\n  meta:\n    column_net: 3\n    row_net: 7\n";
        let keys = parse(doc.as_bytes(), None).unwrap();
        assert_eq!(keys[0].column_net, "3");
        assert_eq!(keys[0].row_net, "7");
    }

    #[test]
    fn test_non_numeric_coordinate_reads_as_zero() {
        let doc = "k:\n  x: 12mm\n  y: 3\n  meta:\n    column_net: c\n    row_net: r\n";
        let keys = parse(doc.as_bytes(), None).unwrap();
        assert_eq!(keys.len(), 1);
        assert_relative_eq!(keys[0].x, 0.0);
        assert_relative_eq!(keys[0].y, 3.0);
    }

    #[test]
    fn test_scalar_meta_is_skipped() {
        let doc = "\
usb:
  x: 1
  meta: usb_connector
k:
  meta:
    column_net: c
    row_net: r
";
        let keys = parse(doc.as_bytes(), None).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "k");
    }

    #[test]
    fn test_no_matrix_keys() {
        let doc = PointsDocument::parse(b"usb:\n  x: 1\n").unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_not_a_mapping() {
        assert!(matches!(
            PointsDocument::parse(b"just text\n").unwrap_err(),
            SchematicError::ParseError(_)
        ));
    }
}

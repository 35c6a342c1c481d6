//! Board definitions from an ergogen `config.yaml`.
//!
//! Only `pcbs.<board>.footprints.sockets.where` is consulted: the key
//! sockets decide which points end up on which physical board.

use log::{debug, info, warn};
use serde_yaml::{Mapping, Value};

use super::scalar_string;
use crate::error::SchematicError;
use crate::types::{BoardDefinition, PatternSpec};

/// Parse a config document into board definitions, in document order.
///
/// Boards without a `footprints.sockets.where` entry are left out.
pub fn parse(data: &[u8]) -> Result<Vec<BoardDefinition>, SchematicError> {
    let root: Value = serde_yaml::from_slice(data)
        .map_err(|e| SchematicError::ParseError(format!("config document: {e}")))?;

    let root = root.as_mapping().ok_or_else(|| {
        SchematicError::ParseError("config document is not a mapping".to_string())
    })?;

    let pcbs = match root.get("pcbs") {
        Some(Value::Mapping(pcbs)) => pcbs,
        Some(Value::Null) | None => {
            debug!("config has no pcbs section");
            return Ok(Vec::new());
        }
        Some(_) => {
            return Err(SchematicError::ParseError(
                "`pcbs` is not a mapping".to_string(),
            ))
        }
    };

    let mut boards = Vec::new();
    for (name, pcb) in pcbs {
        let Some(name) = scalar_string(name) else {
            warn!("Skipping PCB with non-scalar name: {name:?}");
            continue;
        };
        let Some(where_value) = sockets_where(pcb) else {
            debug!("PCB {name} has no sockets footprint, skipping");
            continue;
        };

        let patterns = parse_patterns(&name, where_value)?;
        if patterns.is_empty() {
            warn!("PCB {name} has no usable key patterns, skipping");
            continue;
        }
        check_board_name(&name)?;

        let board = BoardDefinition { name, patterns };
        info!(
            "Found PCB definition: {} with patterns: [{}]",
            board.name,
            board
                .patterns
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        boards.push(board);
    }

    Ok(boards)
}

/// Board names become file names in the output directory.
fn check_board_name(name: &str) -> Result<(), SchematicError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(SchematicError::ParseError(format!(
            "PCB name {name:?} cannot be used as a file name"
        )));
    }
    Ok(())
}

/// Walk `footprints` → `sockets` → `where`.
fn sockets_where(pcb: &Value) -> Option<&Value> {
    let footprints: &Mapping = pcb.get("footprints")?.as_mapping()?;
    footprints.get("sockets")?.as_mapping()?.get("where")
}

/// A `where` value is either a single pattern or a list of them.
fn parse_patterns(board: &str, value: &Value) -> Result<Vec<PatternSpec>, SchematicError> {
    let raw: Vec<&Value> = match value {
        Value::Sequence(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut patterns = Vec::with_capacity(raw.len());
    for item in raw {
        let Value::String(text) = item else {
            warn!("PCB {board}: ignoring non-string key pattern {item:?}");
            continue;
        };
        let pattern =
            PatternSpec::parse(text).map_err(|source| SchematicError::InvalidPattern {
                board: board.to_string(),
                pattern: text.clone(),
                source,
            })?;
        patterns.push(pattern);
    }
    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "\
units:
  kx: 19
points:
  zones:
    matrix: {}
pcbs:
  left:
    outlines:
      main:
        outline: board
    footprints:
      sockets:
        what: choc
        where: /^matrix_left.*/
      diodes:
        what: diode
        where: true
  right:
    footprints:
      sockets:
        where:
          - /^matrix_right/
          - thumb_right
  plate:
    outlines: {}
";

    #[test]
    fn test_parse_boards_in_order() {
        let boards = parse(CONFIG.as_bytes()).unwrap();
        let names: Vec<&str> = boards.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["left", "right"]);
    }

    #[test]
    fn test_single_string_where() {
        let boards = parse(CONFIG.as_bytes()).unwrap();
        let left = &boards[0];
        assert_eq!(left.patterns.len(), 1);
        assert!(matches!(left.patterns[0], PatternSpec::Regex { .. }));
        assert!(left.matches_key("matrix_left_1"));
        assert!(!left.matches_key("matrix_right_1"));
    }

    #[test]
    fn test_where_list_mixes_regex_and_literal() {
        let boards = parse(CONFIG.as_bytes()).unwrap();
        let right = &boards[1];
        assert_eq!(right.patterns.len(), 2);
        assert!(matches!(right.patterns[1], PatternSpec::Literal(_)));
        assert!(right.matches_key("thumb_right"));
        assert!(!right.matches_key("thumb_right_2"));
    }

    #[test]
    fn test_missing_pcbs_is_empty() {
        let boards = parse(b"points: {}\n").unwrap();
        assert!(boards.is_empty());
    }

    #[test]
    fn test_not_a_mapping() {
        let err = parse(b"- a\n- b\n").unwrap_err();
        assert!(matches!(err, SchematicError::ParseError(_)));
    }

    #[test]
    fn test_malformed_yaml() {
        let err = parse(b"pcbs: [unclosed\n").unwrap_err();
        assert!(matches!(err, SchematicError::ParseError(_)));
    }

    #[test]
    fn test_invalid_regex_names_board() {
        let doc = "pcbs:\n  left:\n    footprints:\n      sockets:\n        where: /(/\n";
        match parse(doc.as_bytes()).unwrap_err() {
            SchematicError::InvalidPattern { board, pattern, .. } => {
                assert_eq!(board, "left");
                assert_eq!(pattern, "/(/");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_string_patterns_skip_board() {
        let doc = "pcbs:\n  left:\n    footprints:\n      sockets:\n        where: [1, true]\n";
        assert!(parse(doc.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_lookahead_pattern() {
        let doc = "pcbs:\n  left:\n    footprints:\n      sockets:\n        where: /^matrix_(?!thumb)/\n";
        let boards = parse(doc.as_bytes()).unwrap();
        assert!(boards[0].matches_key("matrix_inner_top"));
        assert!(!boards[0].matches_key("matrix_thumb_home"));
    }

    #[test]
    fn test_board_name_with_path_separator() {
        for name in ["a/b", "'a\\b'", "'..'"] {
            let doc = format!("pcbs:\n  {name}:\n    footprints:\n      sockets:\n        where: k1\n");
            match parse(doc.as_bytes()).unwrap_err() {
                SchematicError::ParseError(msg) => assert!(msg.contains("cannot be used as a file name")),
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}

use fancy_regex::Regex;
use log::warn;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Round a float to N decimal places.
pub fn round_f64(v: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (v * factor).round() / factor
}

// ─── Key selection ───────────────────────────────────────────────────

/// A rule from a board's `where` list deciding which keys belong to it.
///
/// `/.../` strings become [`PatternSpec::Regex`], everything else is a
/// [`PatternSpec::Literal`]. The decision is made once when the config is
/// parsed.
#[derive(Debug, Clone)]
pub enum PatternSpec {
    /// Matches a key name exactly.
    Literal(String),
    /// Matches when the expression matches at the start of the key name.
    /// Look-around and backreferences are accepted.
    Regex { source: String, regex: Regex },
}

impl PatternSpec {
    /// Interpret a raw `where` entry.
    pub fn parse(raw: &str) -> Result<Self, fancy_regex::Error> {
        match raw
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            Some(body) => {
                let regex = Regex::new(&format!("^(?:{body})"))?;
                Ok(PatternSpec::Regex {
                    source: body.to_string(),
                    regex,
                })
            }
            None => Ok(PatternSpec::Literal(raw.to_string())),
        }
    }

    pub fn matches(&self, key_name: &str) -> bool {
        match self {
            PatternSpec::Literal(name) => name == key_name,
            PatternSpec::Regex { source, regex } => match regex.is_match(key_name) {
                Ok(found) => found,
                Err(e) => {
                    warn!("pattern /{source}/ failed on {key_name}: {e}");
                    false
                }
            },
        }
    }
}

impl fmt::Display for PatternSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSpec::Literal(name) => write!(f, "{name}"),
            PatternSpec::Regex { source, .. } => write!(f, "/{source}/"),
        }
    }
}

/// One physical PCB of the keyboard and the keys it carries.
#[derive(Debug, Clone)]
pub struct BoardDefinition {
    pub name: String,
    pub patterns: Vec<PatternSpec>,
}

impl BoardDefinition {
    /// True when any of the board's patterns matches `key_name`.
    pub fn matches_key(&self, key_name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(key_name))
    }
}

// ─── Keys ────────────────────────────────────────────────────────────

/// A matrix key read from the points document.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRecord {
    pub name: String,
    pub column_net: String,
    pub row_net: String,
    /// Design coordinates from ergogen. Not used for schematic placement.
    pub x: f64,
    pub y: f64,
}

// ─── Generation report ───────────────────────────────────────────────

/// Summary of one `generate_schematics` run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    /// Set when the config document contained no usable board definitions.
    pub no_boards: bool,
    pub boards: Vec<BoardReport>,
}

impl GenerationReport {
    pub fn generated(&self) -> impl Iterator<Item = &BoardReport> {
        self.boards
            .iter()
            .filter(|b| matches!(b.status, BoardStatus::Generated { .. }))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardReport {
    pub name: String,
    pub patterns: Vec<String>,
    #[serde(flatten)]
    pub status: BoardStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BoardStatus {
    Generated {
        keys: usize,
        column_nets: Vec<String>,
        row_nets: Vec<String>,
        output: PathBuf,
    },
    Skipped {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_f64() {
        assert_eq!(round_f64(1.23456789, 4), 1.2346);
        assert_eq!(round_f64(-0.00004, 4), -0.0);
    }

    #[test]
    fn test_literal_is_exact() {
        let p = PatternSpec::parse("matrix_left_1").unwrap();
        assert!(matches!(p, PatternSpec::Literal(_)));
        assert!(p.matches("matrix_left_1"));
        assert!(!p.matches("matrix_left_10"));
        assert!(!p.matches("xmatrix_left_1"));
    }

    #[test]
    fn test_regex_anchored_at_start_only() {
        let p = PatternSpec::parse("/matrix_left/").unwrap();
        assert!(p.matches("matrix_left_10"));
        assert!(!p.matches("thumb_matrix_left"));

        let anchored = PatternSpec::parse("/matrix_.*_1$/").unwrap();
        assert!(anchored.matches("matrix_left_1"));
        assert!(!anchored.matches("matrix_left_10"));
    }

    #[test]
    fn test_regex_alternation_stays_anchored() {
        let p = PatternSpec::parse("/a|b/").unwrap();
        assert!(p.matches("apple"));
        assert!(p.matches("banana"));
        assert!(!p.matches("cab"));
    }

    #[test]
    fn test_lone_slash_is_literal() {
        let p = PatternSpec::parse("/").unwrap();
        assert!(matches!(p, PatternSpec::Literal(_)));
        assert!(p.matches("/"));
    }

    #[test]
    fn test_regex_lookahead() {
        let p = PatternSpec::parse("/^matrix_(?!thumb)/").unwrap();
        assert!(p.matches("matrix_left_1"));
        assert!(!p.matches("matrix_thumb_1"));
        assert!(!p.matches("thumb_matrix_1"));
    }

    #[test]
    fn test_regex_backreference() {
        let p = PatternSpec::parse(r"/(\w)\1_/").unwrap();
        assert!(p.matches("ll_key"));
        assert!(!p.matches("lr_key"));
    }

    #[test]
    fn test_invalid_regex() {
        assert!(PatternSpec::parse("/matrix(/").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(PatternSpec::parse("/^m.*/").unwrap().to_string(), "/^m.*/");
        assert_eq!(PatternSpec::parse("k1").unwrap().to_string(), "k1");
    }

    #[test]
    fn test_board_matches_any_pattern() {
        let board = BoardDefinition {
            name: "left".to_string(),
            patterns: vec![
                PatternSpec::parse("thumb_1").unwrap(),
                PatternSpec::parse("/^matrix_left/").unwrap(),
            ],
        };
        assert!(board.matches_key("thumb_1"));
        assert!(board.matches_key("matrix_left_outer_top"));
        assert!(!board.matches_key("matrix_right_1"));
    }
}

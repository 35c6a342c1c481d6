pub mod error;
pub mod layout;
pub mod parsers;
pub mod schematic;
pub mod types;

use error::SchematicError;
use log::{error, info, warn};
use parsers::points::PointsDocument;
use std::path::{Path, PathBuf};
use types::{BoardReport, BoardStatus, GenerationReport};

/// Extension of generated schematic files.
pub const SCHEMATIC_EXTENSION: &str = "kicad_sch";

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// ergogen `config.yaml`
    pub config_path: PathBuf,
    /// ergogen `points.yaml`
    pub points_path: PathBuf,
    /// Directory receiving one schematic per board. Created if missing.
    pub output_dir: PathBuf,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("ergogen/config.yaml"),
            points_path: PathBuf::from("output/points/points.yaml"),
            output_dir: PathBuf::from("pcb"),
        }
    }
}

/// Where the schematic for `board` is written.
pub fn output_path(output_dir: &Path, board: &str) -> PathBuf {
    output_dir.join(format!("{board}.{SCHEMATIC_EXTENSION}"))
}

/// Check that both input documents exist. Nothing is created on failure.
pub fn check_inputs(opts: &GenerateOptions) -> Result<(), SchematicError> {
    for (kind, path) in [("Config", &opts.config_path), ("Points", &opts.points_path)] {
        if !path.exists() {
            return Err(SchematicError::InputMissing {
                kind,
                path: path.clone(),
            });
        }
    }
    Ok(())
}

/// Generate a schematic for every board in the config.
///
/// Boards whose patterns select no keys are skipped with a warning. A
/// config without any boards is reported through
/// [`GenerationReport::no_boards`] rather than as an error.
pub fn generate_schematics(opts: &GenerateOptions) -> Result<GenerationReport, SchematicError> {
    check_inputs(opts)?;
    std::fs::create_dir_all(&opts.output_dir)?;

    let boards = parsers::config::parse(&std::fs::read(&opts.config_path)?)?;
    let mut report = GenerationReport::default();
    if boards.is_empty() {
        error!(
            "No PCB definitions found in {}. Make sure it has a 'pcbs' section with 'sockets' footprints",
            opts.config_path.display()
        );
        report.no_boards = true;
        return Ok(report);
    }

    let points = PointsDocument::parse(&std::fs::read(&opts.points_path)?)?;
    if points.is_empty() {
        warn!(
            "{} has no points with both column_net and row_net",
            opts.points_path.display()
        );
    } else {
        info!(
            "Loaded {} matrix keys from {}",
            points.len(),
            opts.points_path.display()
        );
    }

    for board in &boards {
        info!("--- Processing {} ---", board.name);
        let keys = points.keys(Some(board));
        info!("Found {} keys for {}", keys.len(), board.name);

        let patterns = board.patterns.iter().map(|p| p.to_string()).collect();
        if keys.is_empty() {
            warn!(
                "No keys found for {}, skipping schematic generation",
                board.name
            );
            report.boards.push(BoardReport {
                name: board.name.clone(),
                patterns,
                status: BoardStatus::Skipped {
                    reason: "no keys matched".to_string(),
                },
            });
            continue;
        }

        let path = output_path(&opts.output_dir, &board.name);
        let layout = layout::generate_matrix_schematic(&keys, &board.name, &path)?;
        report.boards.push(BoardReport {
            name: board.name.clone(),
            patterns,
            status: BoardStatus::Generated {
                keys: layout.keys.len(),
                column_nets: layout.columns.names().to_vec(),
                row_nets: layout.rows.names().to_vec(),
                output: path,
            },
        });
    }

    info!("Schematic generation complete");
    Ok(report)
}

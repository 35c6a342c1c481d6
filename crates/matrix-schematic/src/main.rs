use clap::Parser;
use matrix_schematic::error::SchematicError;
use matrix_schematic::types::{BoardStatus, GenerationReport};
use matrix_schematic::{generate_schematics, GenerateOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "matrix-schematic",
    version,
    about = "Generate KiCad switch matrix schematics from an ergogen config and points.yaml"
)]
struct Cli {
    /// Path to the ergogen config.yaml
    #[arg(long, default_value = "ergogen/config.yaml")]
    config: PathBuf,

    /// Path to the ergogen points.yaml
    #[arg(long, default_value = "output/points/points.yaml")]
    points: PathBuf,

    /// Output directory for .kicad_sch files
    #[arg(long, default_value = "pcb")]
    output: PathBuf,

    /// Also write a JSON summary of the run
    #[arg(long)]
    report: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

fn write_report(report: &GenerationReport, cli: &Cli) -> Result<(), SchematicError> {
    let Some(path) = &cli.report else {
        return Ok(());
    };
    let json = if cli.pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }?;
    std::fs::write(path, json)?;
    eprintln!("Report written to {}", path.display());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let opts = GenerateOptions {
        config_path: cli.config.clone(),
        points_path: cli.points.clone(),
        output_dir: cli.output.clone(),
    };

    let report = match generate_schematics(&opts) {
        Ok(report) => report,
        Err(e @ SchematicError::InputMissing { .. }) => {
            eprintln!("Error: {e}");
            match e {
                SchematicError::InputMissing { kind: "Config", .. } => {
                    eprintln!("Please specify the correct path with --config")
                }
                _ => eprintln!("Please run ergogen first to generate points.yaml"),
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if report.no_boards {
        eprintln!("Error: No PCB definitions found in {}", opts.config_path.display());
        eprintln!("Make sure your config.yaml has a 'pcbs' section with 'sockets' footprints");
    }

    for board in &report.boards {
        match &board.status {
            BoardStatus::Generated { keys, output, .. } => {
                eprintln!("{}: {} keys -> {}", board.name, keys, output.display())
            }
            BoardStatus::Skipped { reason } => {
                eprintln!("{}: skipped ({reason})", board.name)
            }
        }
    }

    if let Err(e) = write_report(&report, &cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    if report.generated().next().is_some() {
        eprintln!("Generated KiCad 8 schematic files. Open them in KiCad and assign footprints.");
    }
}

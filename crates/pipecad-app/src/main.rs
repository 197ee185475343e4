//! PipeCAD 命令行入口
//!
//! 导入 DXF 底图并查看摘要，在项目 JSON、存档与 DXF 之间转换。

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use pipecad_core::blueprint::Blueprint;
use pipecad_core::config::EditorConfig;
use pipecad_core::drawing::ParsedDrawing;
use pipecad_core::session::DrawingSession;
use pipecad_file::{archive, dxf_export, project, Archive, ImportJob};

#[derive(Debug, Parser)]
#[command(name = "pipecad")]
#[command(version)]
#[command(about = "Pipe network drafting tools.", long_about = None)]
struct Args {
    /// Editor configuration file (JSON).
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
    /// Enable debug logging.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import a DXF drawing and print a summary.
    Import {
        /// The input DXF file.
        input: PathBuf,
        /// Scale factor, or `auto` to convert drawing units to meters.
        #[arg(long, short)]
        scale: Option<ScaleArg>,
        /// Move the drawing's X/Y center to the origin.
        #[arg(long)]
        center: bool,
        /// Write the normalized drawing as JSON.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Export a project JSON file to DXF.
    Export {
        /// The project JSON file.
        project: PathBuf,
        /// The output DXF file.
        output: PathBuf,
    },
    /// Pack a project JSON file into a compressed archive.
    Pack {
        project: PathBuf,
        output: PathBuf,
        /// Project title stored in the archive.
        #[arg(long, short)]
        title: Option<String>,
    },
    /// Unpack an archive into a project JSON file.
    Unpack { archive: PathBuf, output: PathBuf },
}

/// `--scale` 参数：固定系数或按图纸单位自动换算
#[derive(Debug, Clone, Copy, PartialEq)]
enum ScaleArg {
    Auto,
    Factor(f64),
}

impl FromStr for ScaleArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(ScaleArg::Auto);
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => Ok(ScaleArg::Factor(v)),
            _ => Err(format!("expected a positive number or `auto`, got {:?}", s)),
        }
    }
}

impl ScaleArg {
    fn factor(self, drawing: &ParsedDrawing) -> f64 {
        match self {
            ScaleArg::Factor(f) => f,
            ScaleArg::Auto => drawing.units.meters_per_unit().unwrap_or_else(|| {
                warn!("Drawing has no units ({:?}), keeping scale 1.0", drawing.units);
                1.0
            }),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

async fn run_import(
    config: EditorConfig,
    input: &Path,
    scale: Option<ScaleArg>,
    center: bool,
    out: Option<&Path>,
) -> Result<()> {
    let mut session = DrawingSession::new(config);

    let job = ImportJob::open(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    let id = job
        .merge_into(&mut session)
        .await
        .with_context(|| format!("importing {}", input.display()))?;

    if let Some(scale) = scale {
        let factor = session
            .blueprint(id)
            .map(|b| scale.factor(&b.drawing))
            .unwrap_or(1.0);
        session.scale_drawing(id, factor)?;
        info!("Scaled drawing by {}", factor);
    }
    if center {
        session.center_drawing(id)?;
    }

    let blueprint = session
        .blueprint(id)
        .context("imported drawing missing from session")?;
    print_summary(blueprint);

    if let Some(out) = out {
        let json = serde_json::to_string_pretty(&blueprint.drawing)?;
        fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;
        info!("Wrote {}", out.display());
    }

    Ok(())
}

fn print_summary(blueprint: &Blueprint) {
    let drawing = &blueprint.drawing;
    println!("{}", blueprint.name);
    println!("  version:  {}", drawing.version);
    println!("  units:    {:?}", drawing.units);
    println!("  entities: {}", drawing.entities.len());
    println!("  layers:   {}", drawing.layers.len());
    for layer in &drawing.layers {
        let state = if layer.visible { "on" } else { "off" };
        println!("    {} (color {}, {})", layer.name, layer.color, state);
    }
    println!("  blocks:   {}", drawing.blocks.len());
    match &drawing.bounds {
        Some(b) => println!(
            "  bounds:   ({:.3}, {:.3}) - ({:.3}, {:.3})  [{:.3} x {:.3}]",
            b.min.x,
            b.min.y,
            b.max.x,
            b.max.y,
            b.width(),
            b.height()
        ),
        None => println!("  bounds:   empty"),
    }
    if let Some(scene) = blueprint.scene_bounds() {
        println!(
            "  scene:    ({:.3}, {:.3}, {:.3}) - ({:.3}, {:.3}, {:.3})",
            scene.min.x, scene.min.y, scene.min.z, scene.max.x, scene.max.y, scene.max.z
        );
    }
    for skipped in &drawing.skipped {
        println!("  skipped:  {} x{}", skipped.kind, skipped.count);
    }
}

fn run_export(config: EditorConfig, project_path: &Path, output: &Path) -> Result<()> {
    let data = project::load(project_path).with_context(|| format!("loading {}", project_path.display()))?;
    let session = DrawingSession::from_data(data, config);
    dxf_export::export(&session.to_data(), output).with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

fn run_pack(project_path: &Path, output: &Path, title: Option<String>) -> Result<()> {
    let data = project::load(project_path).with_context(|| format!("loading {}", project_path.display()))?;
    let title = title.unwrap_or_else(|| {
        project_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    archive::save(&Archive::new(title, data), output).with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

fn run_unpack(archive_path: &Path, output: &Path) -> Result<()> {
    let archive = archive::load(archive_path).with_context(|| format!("loading {}", archive_path.display()))?;
    info!(
        "Archive '{}' created {}, modified {}",
        archive.metadata.title, archive.metadata.created, archive.metadata.modified
    );
    project::save(&archive.session, output).with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing::subscriber::set_global_default(FmtSubscriber::builder().with_max_level(level).finish())?;

    info!("Starting PipeCAD...");

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Import {
            input,
            scale,
            center,
            out,
        } => run_import(config, &input, scale, center, out.as_deref()).await,
        Command::Export { project, output } => run_export(config, &project, &output),
        Command::Pack { project, output, title } => run_pack(&project, &output, title),
        Command::Unpack { archive, output } => run_unpack(&archive, &output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_scale_arg() {
        assert_eq!("auto".parse::<ScaleArg>(), Ok(ScaleArg::Auto));
        assert_eq!("0.001".parse::<ScaleArg>(), Ok(ScaleArg::Factor(0.001)));
        assert!("0".parse::<ScaleArg>().is_err());
        assert!("-1".parse::<ScaleArg>().is_err());
        assert!("big".parse::<ScaleArg>().is_err());
    }

    #[test]
    fn test_parse_import_args() {
        let args = Args::parse_from(["pipecad", "-v", "import", "plan.dxf", "--scale", "auto", "--center"]);
        assert!(args.verbose);
        match args.command {
            Command::Import { input, scale, center, out } => {
                assert_eq!(input, PathBuf::from("plan.dxf"));
                assert_eq!(scale, Some(ScaleArg::Auto));
                assert!(center);
                assert!(out.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_auto_scale_uses_units() {
        let mut drawing = ParsedDrawing::new(Vec::new(), Vec::new(), Vec::new());
        drawing.units = pipecad_core::drawing::Units::Millimeters;
        assert_eq!(ScaleArg::Auto.factor(&drawing), 0.001);

        drawing.units = pipecad_core::drawing::Units::Unitless;
        assert_eq!(ScaleArg::Auto.factor(&drawing), 1.0);
        assert_eq!(ScaleArg::Factor(2.0).factor(&drawing), 2.0);
    }

    #[test]
    fn test_missing_config_is_default() {
        assert_eq!(load_config(None).unwrap(), EditorConfig::default());
    }
}

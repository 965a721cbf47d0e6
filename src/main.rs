use clap::{Args, Parser, Subcommand};
use mpo_wiggle::batch::{self, BatchOptions};
use mpo_wiggle::config::{self, WiggleConfig};
use mpo_wiggle::editor::{self, EditorOptions};
use mpo_wiggle::imaging::{LoopFormat, NativeBackend, ParamUpdate, is_ffmpeg_available};
use mpo_wiggle::session::{ExportTargets, PipelineSession};
use mpo_wiggle::{naming, output, scan};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mpo-wiggle")]
#[command(about = "Turn stereoscopic MPO photos into wiggle animations")]
#[command(long_about = "\
Turn stereoscopic MPO photos into wiggle animations

Each export writes, under the output directory:

  <name>_left.jpg     left view, aligned and cropped
  <name>_right.jpg    right view, aligned and cropped
  <name>.gif          two-frame loop (or <name>.png with --format apng)
  <name>.mp4          short silent video (needs ffmpeg on PATH)

Alignment: the left view shifts by -overlap pixels and the right view by
+overlap; uncovered columns are black. The same crop is then removed from
both views.

Interactive editing (mpo-wiggle edit) reads one command per line:

  o<n>          overlap          f<n>   frame duration (ms)
  c <side><n>   crop l/t/r/b     e      export, next file
  s             skip             s<n>   skip ahead n files
  x             reset            p      print parameters
  q, exit       quit

Run 'mpo-wiggle gen-config' to generate a documented mpo-wiggle.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./mpo-wiggle.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that read a folder.
#[derive(Args, Clone)]
struct FolderArgs {
    /// Folder to read containers from
    input: PathBuf,

    /// Also look in subfolders
    #[arg(short, long)]
    recursive: bool,
}

/// Shared flags for commands that export.
#[derive(Args, Clone)]
struct ExportArgs {
    /// Output directory (created if missing)
    #[arg(short, long)]
    output: PathBuf,

    /// Loop format: gif or apng (default from config)
    #[arg(long)]
    format: Option<LoopFormat>,

    /// Do not write the video
    #[arg(long)]
    no_video: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List the containers in a folder
    Scan(FolderArgs),
    /// Export one container with the given parameters
    Convert {
        /// Container file
        file: PathBuf,
        #[command(flatten)]
        export: ExportArgs,
        /// Horizontal disparity in pixels
        #[arg(long, allow_hyphen_values = true)]
        overlap: Option<i32>,
        #[arg(long)]
        crop_left: Option<u32>,
        #[arg(long)]
        crop_top: Option<u32>,
        #[arg(long)]
        crop_right: Option<u32>,
        #[arg(long)]
        crop_bottom: Option<u32>,
        /// Frame duration in milliseconds
        #[arg(long)]
        duration: Option<u32>,
        /// Output base name (default from the naming config)
        #[arg(long)]
        name: Option<String>,
    },
    /// Edit every container in a folder interactively
    Edit {
        #[command(flatten)]
        folder: FolderArgs,
        #[command(flatten)]
        export: ExportArgs,
        /// Keep this file updated with the current loop for an external viewer
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// Export every container in a folder with the configured defaults
    Batch {
        #[command(flatten)]
        folder: FolderArgs,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Print a stock mpo-wiggle.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Scan(folder) => {
            let config = load_config(config_path)?;
            let files = scan::scan(&folder.input, &config.scan.extensions, folder.recursive)?;
            output::print_scan_output(&files, &folder.input);
        }
        Command::Convert {
            file,
            export,
            overlap,
            crop_left,
            crop_top,
            crop_right,
            crop_bottom,
            duration,
            name,
        } => {
            let mut config = load_config(config_path)?;
            apply_export_args(&mut config, &export);
            let update = ParamUpdate {
                overlap,
                crop_left,
                crop_top,
                crop_right,
                crop_bottom,
                frame_duration_ms: duration,
            };
            let params = config.alignment.merged(&update);
            let name = match name {
                Some(name) => name,
                None => naming::output_name(&config.naming, 0, &file)?,
            };

            let mut session = PipelineSession::new(backend(&config))
                .with_defaults(params)
                .with_quality(config.output.quality());
            session.load(&file)?;
            let targets = export_targets(&config, &export.output, &name);
            let report = session.export(&targets)?;
            output::print_export_report(&name, &report);
        }
        Command::Edit {
            folder,
            export,
            preview,
        } => {
            let mut config = load_config(config_path)?;
            apply_export_args(&mut config, &export);
            let files = scan::scan(&folder.input, &config.scan.extensions, folder.recursive)?;
            output::print_scan_output(&files, &folder.input);
            for line in output::format_command_help() {
                println!("{}", line);
            }

            let mut options = EditorOptions::from_config(&config, &folder.input, &export.output);
            options.preview = preview;
            let mut session = PipelineSession::new(backend(&config))
                .with_defaults(config.alignment)
                .with_quality(config.output.quality());

            let stdin = std::io::stdin();
            let summary = editor::run_editor(
                &files,
                &options,
                &mut session,
                stdin.lock(),
                std::io::stdout(),
            )?;
            println!(
                "Done: {} exported, {} skipped, {} failed",
                summary.exported, summary.skipped, summary.failed
            );
        }
        Command::Batch { folder, export } => {
            let mut config = load_config(config_path)?;
            apply_export_args(&mut config, &export);
            let files = scan::scan(&folder.input, &config.scan.extensions, folder.recursive)?;
            init_thread_pool(&config.processing);

            let options = BatchOptions::from_config(&config, &export.output);
            let root = folder.input.clone();
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event, &root) {
                        println!("{}", line);
                    }
                }
            });
            let result = batch::run_batch(&files, &options, &backend(&config), Some(tx));
            printer.join().ok();
            let summary = result?;
            for line in output::format_batch_summary(&summary) {
                println!("{}", line);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "mpo_wiggle=debug,info"
    } else {
        "mpo_wiggle=info,warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// An explicit `--config` must exist; the default file is optional.
fn load_config(path: Option<&Path>) -> Result<WiggleConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) if !path.exists() => {
            Err(format!("config file not found: {}", path.display()).into())
        }
        Some(path) => Ok(config::load_config(path)?),
        None => Ok(config::load_config(Path::new(config::DEFAULT_CONFIG_FILE))?),
    }
}

fn apply_export_args(config: &mut WiggleConfig, export: &ExportArgs) {
    if let Some(format) = export.format {
        config.output.loop_format = format;
    }
    if export.no_video {
        config.video.enabled = false;
    }
    if config.video.enabled && !is_ffmpeg_available(Path::new(&config.video.ffmpeg)) {
        tracing::warn!(
            ffmpeg = %config.video.ffmpeg,
            "ffmpeg not found, videos will be reported as failed (use --no-video to skip them)"
        );
    }
}

fn backend(config: &WiggleConfig) -> NativeBackend {
    NativeBackend::new(config.video.options())
}

fn export_targets(config: &WiggleConfig, dir: &Path, name: &str) -> ExportTargets {
    ExportTargets::for_basename(
        dir,
        name,
        config.output.loop_format,
        config
            .video
            .enabled
            .then_some(config.video.extension.as_str()),
    )
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

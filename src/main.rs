use clap::{Parser, Subcommand};
use dossier::build::{BuildRequest, NormalizeOutcome};
use dossier::imaging::{self, Quality, RustBackend};
use dossier::{build, config, output, scan};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "dossier")]
#[command(about = "Turn a folder of photos into a Word report")]
#[command(long_about = "\
Turn a folder of photos into a Word report

Your filesystem is the outline. Every directory becomes a heading, its photos
become one large featured image plus a grid of thumbnails, and a page break
closes the section. Subdirectories follow as deeper headings.

Source structure:

  Site visit/                    # Heading 1
  ├── config.toml                # Optional config (see gen-config)
  ├── 01-overview.jpg            # Featured image (first by name)
  ├── 02-entrance.png            # Thumbnail
  ├── Basement/                  # Heading 2
  │   └── IMG_0001.JPG
  └── Roof/                      # Heading 2
      └── Gutters/               # Heading 3 (no photos = heading only)

Photos are .jpg, .jpeg, .png or .gif. Sideways photos are rotated in place
using their EXIF orientation before they are embedded.

Run 'dossier gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Log debug detail to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a report from a template and a photo directory
    Build {
        /// Word template (.docx) the report starts from
        #[arg(long)]
        template: PathBuf,
        /// Root photo directory
        #[arg(long)]
        source: PathBuf,
        /// Report to write (.docx)
        #[arg(long)]
        output: PathBuf,
        /// Config file (default: config.toml in the source directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show the sections a build would produce, without writing anything
    Check {
        /// Root photo directory
        #[arg(long)]
        source: PathBuf,
        /// Print the outline as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fix EXIF orientation of image files in place
    Normalize {
        /// Image files to correct
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Config file providing [images] quality
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build {
            template,
            source,
            output: out,
            config: config_path,
        } => {
            let report_config = load_config(config_path.as_deref(), &source)?;
            let request = BuildRequest {
                template,
                root: source,
                output: out,
            };
            let report = build::build(&request, &report_config)?;
            output::print_build_report(&report);
        }
        Command::Check { source, json } => {
            if !source.is_dir() {
                return Err(format!("Source directory not found: {}", source.display()).into());
            }
            let entries = scan::outline(&source)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                output::print_outline(&entries);
            }
        }
        Command::Normalize {
            files,
            config: config_path,
        } => {
            let report_config = match config_path {
                Some(path) => config::load_config_file(&path)?,
                None => config::ReportConfig::default(),
            };
            let quality = Quality::new(report_config.images.quality);
            let backend = RustBackend::new();
            let results: Vec<(PathBuf, NormalizeOutcome)> = files
                .into_iter()
                .map(|path| {
                    let outcome =
                        NormalizeOutcome::from(imaging::normalize(&backend, &path, quality));
                    (path, outcome)
                })
                .collect();
            output::print_normalize(&results);

            let failed = results
                .iter()
                .filter(|(_, outcome)| matches!(outcome, NormalizeOutcome::Failed(_)))
                .count();
            if failed > 0 {
                return Err(format!("{failed} file(s) could not be corrected").into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

/// Explicit `--config` file, else `config.toml` in the source directory.
fn load_config(
    explicit: Option<&Path>,
    source: &Path,
) -> Result<config::ReportConfig, config::ConfigError> {
    match explicit {
        Some(path) => config::load_config_file(path),
        None => config::load_config(source),
    }
}

use clap::{Parser, Subcommand};
use image_variants::config::{self, BackendKind, Config, Overrides, Profile};
use image_variants::imaging::{ImageBackend, RustBackend, SquooshBackend};
use image_variants::{output, process};
use std::path::PathBuf;
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
#[command(name = "image-variants")]
#[command(about = "Generate missing resized WebP/AVIF/JPEG variants of a directory of images")]
#[command(long_about = "\
Generate missing resized WebP/AVIF/JPEG variants of a directory of images

Every file <stem>.<ext> in the input directory gets one output per configured
percentage and format, plus an optional thumbnail. Outputs that already exist
are left alone, so re-running only fills gaps.

Output layout (responsive profile):

  public/images/
  ├── webp/
  │   ├── photo_75.webp
  │   ├── photo_50.webp
  │   └── photo_thumb.webp
  └── avif/
      └── photo_75.avif

When several files share a stem, the source is chosen by preference:
AVIF > WebP > PNG > JPG > JPEG.

Per-file failures are reported and skipped; the exit code is non-zero only
when the input directory or the external encoder is missing.

Run 'image-variants gen-config' to generate a documented config file.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: ./image-variants.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Stock defaults to start from
    #[arg(long, value_enum, default_value_t = Profile::Responsive, global = true)]
    profile: Profile,

    /// Override the input directory
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Override the output directory (moves the input too for in-place configs)
    #[arg(long, global = true)]
    target: Option<PathBuf>,

    /// Encoder strategy
    #[arg(long, value_enum, global = true)]
    backend: Option<BackendKind>,

    /// Decode sources and report what would be written, without writing
    #[arg(long, global = true)]
    dry_run: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Produce every missing variant (default)
    Run,
    /// List stems, their canonical source and missing outputs without decoding
    Check,
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.unwrap_or(Command::Run) {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml(cli.profile)?);
        }
        Command::Check => {
            let config = load(&cli)?;
            let process_config = process::ProcessConfig::from_config(&config);
            println!("==> Checking {}", config.input_dir.display());
            let checks = process::check(&process_config)?;
            output::print_check_output(&checks);
        }
        Command::Run => {
            let config = load(&cli)?;
            let backend: Box<dyn ImageBackend> = match config.backend {
                BackendKind::Library => Box::new(RustBackend::new()),
                BackendKind::Squoosh => Box::new(SquooshBackend::from_config(&config.squoosh)),
            };
            output::print_config(&config, backend.name(), cli.dry_run);
            println!();

            let process_config = process::ProcessConfig::from_config(&config).dry_run(cli.dry_run);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = process::run(&process_config, backend.as_ref(), Some(tx));
            if printer.join().is_err() {
                tracing::warn!("progress printer thread panicked");
            }

            let report = result?;
            if report.total() > 0 {
                println!();
                output::print_summary(&report, cli.dry_run);
            }
        }
    }

    Ok(())
}

/// Resolve the configuration: profile defaults, config file, then CLI flags.
fn load(cli: &Cli) -> Result<Config, config::ConfigError> {
    let path = cli.config.clone().or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|dir| config::find_config_file(&dir))
    });
    let config = config::load_config(path.as_deref(), cli.profile)?;
    let config = config.with_overrides(&Overrides {
        input: cli.input.clone(),
        target: cli.target.clone(),
        backend: cli.backend,
    });
    config.validate()?;
    Ok(config)
}

/// stderr logging; `RUST_LOG` wins unless `--verbose` is given.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

use clap::{Parser, Subcommand};
use lrprev_extract::types::ExtractRequest;
use lrprev_extract::{batch, config, output};
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
            // Leaked once; only called at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "lrprev-extract")]
#[command(about = "Extract full-size JPEGs from Lightroom preview files")]
#[command(long_about = "\
Extract full-size JPEGs from Lightroom preview files

Lightroom caches previews in <catalog> Previews.lrdata/ as .lrprev files,
each holding several JPEG levels. The largest level of every file is written
to the output directory.

Naming:
  With --catalog:  original base name    (IMG_0421.jpg)
  Without:         preview UUID          (3F2504E0-4F89-11D3-9A0C-0305E82C3301.jpg)
  --include-size:  adds pixel size       (IMG_0421_2048x1365.jpg)

Existing files are never overwritten: identical content is left alone,
different content gets a -1, -2, ... suffix.

Examples:
  lrprev-extract -d \"Catalog Previews.lrdata\" -o recovered
  lrprev-extract -f preview.lrprev -o recovered -l \"Catalog.lrcat\"

Run 'lrprev-extract gen-config' to generate a documented lrprev-extract.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Lightroom previews directory (.lrdata), searched recursively
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Single preview file (.lrprev); takes precedence over --dir
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Output directory (created if missing)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Lightroom catalog (.lrcat) used to recover original file names
    #[arg(short = 'l', long)]
    catalog: Option<PathBuf>,

    /// Include image size in output file names
    #[arg(long)]
    include_size: bool,

    /// Config file (default: ./lrprev-extract.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a JSON report of every file to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print a stock lrprev-extract.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(Command::GenConfig) = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let cwd = std::env::current_dir()?;
    let settings = config::load_config(cli.config.as_deref(), &cwd)?;
    let request = build_request(&cli, &settings)?;
    init_thread_pool(&settings.processing);

    let single_file = request.input.is_file();
    let output_dir = request.output_dir.clone();
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        let mut finished = 0;
        for event in rx {
            if !matches!(event, batch::BatchEvent::Started { .. }) {
                finished += 1;
            }
            for line in output::format_batch_event(finished, &event, &output_dir) {
                println!("{}", line);
            }
        }
    });
    // Display, not Debug: this is what the user sees on exit.
    let report = batch::run(&request, Some(tx)).map_err(|e| e.to_string())?;
    printer.join().ok();

    println!();
    println!("{}", output::format_summary(&report.summary));

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;
        println!("Report: {}", path.display());
    }

    if single_file && report.summary.failed > 0 {
        return Err("extraction failed".into());
    }
    Ok(())
}

/// Combine flags and config into one immutable request. Flags win.
fn build_request(
    cli: &Cli,
    settings: &config::ExtractConfig,
) -> Result<ExtractRequest, Box<dyn std::error::Error>> {
    let input = cli
        .file
        .clone()
        .or_else(|| cli.dir.clone())
        .ok_or("no input given: pass --dir <previews dir> or --file <preview file>")?;
    let output_dir = cli
        .output
        .clone()
        .or_else(|| settings.output.directory.clone())
        .ok_or("no output directory given: pass --output <dir> or set output.directory")?;
    let catalog = cli
        .catalog
        .clone()
        .or_else(|| settings.catalog.path.clone())
        // An empty value means "no catalog", not "catalog at ''".
        .filter(|p| !p.as_os_str().is_empty());

    Ok(ExtractRequest {
        input,
        output_dir,
        catalog,
        include_size: cli.include_size || settings.output.include_size,
    })
}

/// Logs go to stderr so stdout stays the result listing.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

use clap::{ArgAction, Parser, Subcommand};
use mailbatch::config::{self, BatchConfig};
use mailbatch::message::{OutboxTransport, Transport};
use mailbatch::metadata::Extractor;
use mailbatch::output;
use mailbatch::pipeline::{self, PlannedMessage};
use std::path::PathBuf;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "mailbatch")]
#[command(about = "Batch photos and files into size-bounded, mail-ready messages")]
#[command(long_about = "\
Batch photos and files into size-bounded, mail-ready messages

Every file is hashed and, if it is an image, described (format, size, EXIF
capture date and camera) with a small inline thumbnail. Files are optionally
ordered, then packed in order into groups whose total size stays below the
limit. Each group becomes one message: a subject, an HTML report, a JSON text
report and the files as attachments.

  mailbatch plan photos/ --max-size 10MiB --order-by image.date
  mailbatch build photos/ --outbox outbox/ --from me@example.com --to you@example.org

Settings are read from mailbatch.toml in the working directory (or --config).
Run 'mailbatch gen-config' to generate a documented one.")]
#[command(version)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: ./mailbatch.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that batch files.
#[derive(clap::Args, Clone)]
struct BatchArgs {
    /// Files or directories (directories are walked recursively)
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Maximum total size per message, e.g. 10MiB or 25000000
    #[arg(long)]
    max_size: Option<String>,

    /// Order files by a dotted key such as image.date or file.size
    #[arg(long)]
    order_by: Option<String>,

    /// Reverse the order
    #[arg(long)]
    reverse: bool,

    /// Longer thumbnail edge in pixels (0 disables thumbnails)
    #[arg(long)]
    thumbnail_size: Option<u32>,

    /// Title used in subjects
    #[arg(long)]
    title: Option<String>,

    /// Leave out unreadable files instead of failing
    #[arg(long)]
    skip_unreadable: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show how files would be grouped into messages
    Plan {
        #[command(flatten)]
        batch: BatchArgs,

        /// Also print each message as JSON (long bodies cut)
        #[arg(long)]
        show_messages: bool,
    },
    /// Write one JSON message descriptor per group into an outbox directory
    Build {
        #[command(flatten)]
        batch: BatchArgs,

        /// Outbox directory
        #[arg(long)]
        outbox: PathBuf,

        /// Sender, "Name <address>" or address
        #[arg(long)]
        from: Option<String>,

        /// Recipient (repeatable)
        #[arg(long)]
        to: Vec<String>,
    },
    /// Print a stock mailbatch.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Plan {
            batch,
            show_messages,
        } => {
            let overrides = batch_overrides(&batch);
            let config = config::load_config(cli.config.as_deref(), Some(overrides))?;
            let planned = run_batch(&batch.paths, &config)?;
            output::print_plan(&planned);
            if show_messages {
                println!();
                output::print_message_summaries(&planned);
            }
        }
        Command::Build {
            batch,
            outbox,
            from,
            to,
        } => {
            let mut overrides = batch_overrides(&batch);
            if let Some(from) = from {
                set(&mut overrides, "mail", "from", from);
            }
            if !to.is_empty() {
                set(&mut overrides, "mail", "to", to);
            }
            let config = config::load_config(cli.config.as_deref(), Some(overrides))?;
            let planned = run_batch(&batch.paths, &config)?;
            output::print_plan(&planned);

            let mut transport = OutboxTransport::new(outbox)?;
            let mut sent = Vec::new();
            for item in &planned {
                let path = transport.send(&item.message)?;
                sent.push((item.message.subject.clone(), path));
            }
            println!();
            output::print_build_output(&sent);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Extract, then plan. Progress lines are printed as files finish.
fn run_batch(
    paths: &[PathBuf],
    config: &BatchConfig,
) -> Result<Vec<PlannedMessage>, Box<dyn std::error::Error>> {
    init_thread_pool(&config.processing);
    let files = expand_paths(paths)?;
    let extractor = Extractor::with_defaults().with_quality(config.thumbnail_quality());

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_extract_event(&event) {
                println!("{}", line);
            }
        }
    });
    let extraction = pipeline::extract_all(
        &files,
        &extractor,
        config.thumbnails.max_dimension,
        config.error_policy(),
        Some(tx),
    );
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    let extraction = extraction?;
    output::print_skipped(&extraction.skipped);
    println!();

    Ok(pipeline::plan(extraction.records, &config.plan_options()?)?)
}

/// Files stay as given; directories expand to the files below them, sorted by path.
fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(path) {
                let entry = entry?;
                if entry.file_type().is_file() {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

/// Command-line flags as a sparse config overlay.
fn batch_overrides(batch: &BatchArgs) -> toml::Value {
    let mut overrides = toml::Value::Table(toml::Table::new());
    if let Some(max_size) = &batch.max_size {
        set(&mut overrides, "grouping", "max_size", max_size.clone());
    }
    if let Some(order_by) = &batch.order_by {
        set(&mut overrides, "grouping", "order_by", order_by.clone());
    }
    if batch.reverse {
        set(&mut overrides, "grouping", "reverse", true);
    }
    if let Some(size) = batch.thumbnail_size {
        set(&mut overrides, "thumbnails", "max_dimension", i64::from(size));
    }
    if let Some(title) = &batch.title {
        set(&mut overrides, "subject", "title", title.clone());
    }
    if batch.skip_unreadable {
        set(&mut overrides, "processing", "skip_unreadable", true);
    }
    overrides
}

fn set(overrides: &mut toml::Value, section: &str, key: &str, value: impl Into<toml::Value>) {
    if let toml::Value::Table(root) = overrides {
        let section = root
            .entry(section)
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if let toml::Value::Table(section) = section {
            section.insert(key.to_string(), value.into());
        }
    }
}

/// Set up tracing on stderr so it never mixes with the plan on stdout.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "mailbatch=info",
        2 => "mailbatch=debug",
        _ => "trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

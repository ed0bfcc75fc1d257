use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::mpsc;
use wikidown::types::Method;
use wikidown::{config, convert, output, process, scan};

#[derive(Parser)]
#[command(name = "wikidown")]
#[command(about = "Convert an exported HTML wiki into Markdown")]
#[command(long_about = "\
Convert an exported HTML wiki into Markdown

Every .html page under the source directory becomes a .md file at the same
relative path under the output directory. Only the content region of each
page (the children of #main-content) is kept.

  export/                        markdown/
  ├── index.html           →     ├── index.md
  ├── Guides/                    ├── Guides/
  │   └── Setup.html       →     │   └── Setup.md
  └── attachments/         →     └── attachments/   (copied unchanged)

Methods:
  pandoc   pipe each page through the external pandoc binary (default)
  godown   convert in-process, no external tools needed

Settings are read from wikidown.toml in the working directory, or from
--config FILE. Run 'wikidown gen-config' to generate a documented one.
Set RUST_LOG=debug for diagnostics.")]
#[command(version)]
struct Cli {
    /// Exported HTML tree
    #[arg(long, default_value = "export", global = true)]
    source: PathBuf,

    /// Destination for Markdown files (must exist)
    #[arg(long, default_value = "markdown", global = true)]
    output: PathBuf,

    /// Config file (default: ./wikidown.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Conversion method, overrides the config file
    #[arg(long, value_enum, global = true)]
    method: Option<Method>,

    /// Max pages converted at once (default: CPU cores)
    #[arg(long, short = 'j', global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the pages and attachments that would be converted
    Scan,
    /// Convert every page and copy attachments
    Convert,
    /// Print a stock wikidown.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Scan => {
            let manifest = scan::scan(&cli.source)?;
            output::print_scan_output(&manifest);
        }
        Command::Convert => {
            let cwd = std::env::current_dir()?;
            let overrides = config::cli_overrides(cli.method, cli.jobs);
            let config = config::load_config(cli.config.as_deref(), &cwd, overrides)?;
            let manifest = scan::scan(&cli.source)?;

            init_thread_pool(&config.processing);
            println!("Using method {}", config.method);
            let pipeline = convert::Pipeline::from_config(&config);

            let (tx, rx) = mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = process::process(&manifest, &cli.output, &pipeline, Some(tx));
            if printer.join().is_err() {
                log::warn!("progress printer panicked, output may be incomplete");
            }
            let summary = result?;
            output::print_summary(&summary);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

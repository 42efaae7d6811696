use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use mapsalvage_core::{extract_file, ClientConfig, CrawlOptions, Crawler, Eol, ExtractEvent, ExtractOptions};
use url::Url;

#[derive(Parser)]
#[command(version, about = "Recover original sources from sourcemaps")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract sources from a local .map file
    Extract {
        /// Path to the .map file
        #[arg(long, value_name = "FILE")]
        map: PathBuf,

        /// Output directory
        #[arg(long, default_value = "extracted_sources")]
        out: PathBuf,

        #[command(flatten)]
        format: FormatArgs,
    },
    /// Crawl a page, find its scripts and extract their sourcemaps
    Crawl {
        /// Root page URL
        #[arg(long)]
        url: Url,

        /// Output base directory
        #[arg(long, default_value = "recovered")]
        out: PathBuf,

        /// Parallel script workers
        #[arg(long, default_value_t = 4)]
        concurrency: usize,

        #[arg(long, default_value = mapsalvage_core::fetch::DEFAULT_USER_AGENT)]
        user_agent: String,

        /// Proxy URL (e.g. http://127.0.0.1:8080)
        #[arg(long)]
        proxy: Option<String>,

        /// Skip TLS certificate verification (intercepting proxies)
        #[arg(long)]
        insecure: bool,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 25)]
        timeout: u64,

        /// Save fetched scripts next to the recovered sources
        #[arg(long)]
        save_js: bool,

        /// Save fetched maps next to the recovered sources
        #[arg(long)]
        save_map: bool,

        /// Levels of derived chunks to follow
        #[arg(long, default_value_t = 3)]
        max_chunk_depth: usize,

        /// Print the totals as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        format: FormatArgs,
    },
}

#[derive(clap::Args)]
struct FormatArgs {
    /// Beautify minified JS/TS
    #[arg(long)]
    beautify: bool,

    /// Normalize line endings
    #[arg(long, value_enum)]
    eol: Option<EolArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum EolArg {
    Unix,
    Dos,
}

impl From<FormatArgs> for ExtractOptions {
    fn from(args: FormatArgs) -> Self {
        ExtractOptions {
            beautify: args.beautify,
            eol: args.eol.map(|e| match e {
                EolArg::Unix => Eol::Unix,
                EolArg::Dos => Eol::Dos,
            }),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Extract { map, out, format } => {
            let options = ExtractOptions::from(format);
            match extract_file(&map, &out, &options).await {
                Ok(summary) => {
                    for event in &summary.events {
                        match event {
                            ExtractEvent::Written { path, .. } => println!("Written: {}", path.display()),
                            ExtractEvent::Skipped { source, reason } => println!("Skipped ({}): {}", reason, source),
                            ExtractEvent::Failed { source, reason } => println!("Failed: {}: {}", source, reason),
                        }
                    }
                    println!("\nSummary: {} written, {} skipped", summary.written, summary.skipped);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    log::error!("{}", e);
                    ExitCode::from(2)
                }
            }
        }
        Command::Crawl {
            url,
            out,
            concurrency,
            user_agent,
            proxy,
            insecure,
            timeout,
            save_js,
            save_map,
            max_chunk_depth,
            json,
            format,
        } => {
            let options = CrawlOptions {
                extract: ExtractOptions::from(format),
                client: ClientConfig {
                    proxy,
                    skip_tls_verify: insecure,
                    user_agent,
                    timeout: Duration::from_secs(timeout),
                },
                save_raw_script: save_js,
                save_raw_map: save_map,
                max_chunk_depth,
            };

            let crawler = match Crawler::new(options) {
                Ok(c) => detectors::all().into_iter().fold(c, |c, s| c.with_strategy(s)),
                Err(e) => {
                    log::error!("{}", e);
                    return ExitCode::from(2);
                }
            };

            match crawler.run(&url, &out, concurrency).await {
                Ok(report) => {
                    let t = report.totals;
                    if json {
                        match serde_json::to_string_pretty(&t) {
                            Ok(s) => println!("{}", s),
                            Err(e) => log::error!("{}", e),
                        }
                    } else {
                        println!(
                            "\nDone. Scripts discovered: {}, processed: {}. Maps: {}, files written: {}, skipped: {}, failures: {}, without sourcemap: {}",
                            report.scripts_discovered,
                            t.scripts_processed,
                            t.maps_found,
                            t.files_written,
                            t.skipped,
                            t.failures,
                            t.without_sourcemap
                        );
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    log::error!("{}", e);
                    ExitCode::from(2)
                }
            }
        }
    }
}

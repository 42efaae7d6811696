pub mod anchor;
pub mod cli_ops;
pub mod crawl;
pub mod events;
pub mod extract;
pub mod fetch;
pub mod file_io;
pub mod format;
pub mod locator;
pub mod output;
pub mod path_reconstruct;
pub mod sm_parse;
pub mod url_utils;
pub mod webpack;

pub use anchor::{AnchorTree, PathError, RecoveredFile};
pub use cli_ops::{extract_file, CLIError};
pub use crawl::{crawl, CrawlError, CrawlOptions, CrawlReport, Crawler};
pub use events::{CrawlEvent, CrawlTotals};
pub use extract::{extract, extract_all, ExtractError, ExtractEvent, ExtractOptions, ExtractSummary, IoPolicy, SkipReason};
pub use fetch::{ClientConfig, FetchError, Fetcher, HttpFetcher};
pub use format::Eol;
pub use locator::{locate_map, LocatedMap, MapSource};
pub use output::ensure_output_dir;
pub use path_reconstruct::{count_leading_ups, normalize, sanitize_segments};
pub use sm_parse::{parse_sourcemap, sources_list, SourcemapDocument, SourcemapError};
pub use url_utils::find_scripts;
pub use webpack::{ChunkCandidate, ChunkNamingStrategy, ReturnObjectStrategy};

pub mod assets;
pub mod config;
pub mod download_manager;
pub mod fetch;
pub mod file_io;
pub mod output;
pub mod path_reconstruct;
pub mod pipeline;
pub mod sm_parse;
pub mod sourcemap;
pub mod url_utils;

pub use assets::{extract_assets, AssetClasses, AssetKind, AssetReference};
pub use config::{default_output_dir, Config};
pub use fetch::{FetchError, Fetcher, HttpFetcher, MemoryFetcher};
pub use file_io::{write_sources, WriteSummary};
pub use output::{ensure_output_dir, validate_output_dir, OutputDirError};
pub use path_reconstruct::{sanitize_logical_path, PathSafetyViolation, ReconstructionTarget};
pub use pipeline::{run, AssetFailure, AssetOutcome, RunError, RunReport};
pub use sm_parse::{decode_sourcemap, fetch_and_decode, DecodeFailure, MapError, SourceEntry};
pub use sourcemap::{locate_sourcemap, MapReference};
pub use url_utils::{resolve, Resolution};

pub mod clean_files;
pub mod generate;
pub mod ingest;
pub mod worker;

pub use clean_files::{clean_files, CleanReport};
pub use generate::{generate_derivatives, GenerateSummary};
pub use ingest::{ingest_file, IngestReport};
pub use worker::{enqueue_missing, run_worker};

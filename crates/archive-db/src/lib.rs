//! Archive database layer
//!
//! File-record persistence behind the [`RecordFileStore`] trait, with a Postgres
//! repository for deployments and an in-memory store for tests and local runs
//! without `DATABASE_URL`.

pub mod memory;
pub mod pool;
pub mod record_file;
pub mod store;

pub use memory::MemoryRecordFileStore;
pub use pool::{connect_store, setup_database};
pub use record_file::RecordFileRepository;
pub use store::RecordFileStore;

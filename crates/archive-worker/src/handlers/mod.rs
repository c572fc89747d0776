pub mod derivatives;

pub use derivatives::DerivativeTaskHandler;

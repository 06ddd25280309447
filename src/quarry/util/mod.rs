pub mod errors;
pub mod job_pool;
pub mod shell;

pub use errors::{DiagnosticError, ErrorSink, Location, QuarryResult, ResolutionError};
pub use job_pool::JobPool;
pub use shell::{ColorConfig, Shell, Verbosity};

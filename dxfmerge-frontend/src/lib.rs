pub mod errors;
pub mod loader;
pub mod pipeline;
pub mod report;

pub use errors::PipelineError;
pub use pipeline::{NestRequest, run};
pub use report::NestReport;

//! Library surface of the covgate binary: options layer, pipeline driver,
//! and process output emission. Split out so integration tests can drive
//! the pipeline directly.

pub mod options;
pub mod outputs;
pub mod pipeline;

pub use options::{AnnotationMode, Cli, Options, OutputKind, SkipStep};
pub use pipeline::{run, PipelineRun};

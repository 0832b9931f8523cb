//! Validation pipeline: echo, secure echo and content rules, one endpoint
//! at a time.

mod pipeline;
mod probe;
mod reqwest_probe;

pub use pipeline::{DEFAULT_ECHO_URL, PipelineSettings, Validator};
pub use probe::{ProbeConnector, ProbeError, ProbeResponse, ProbeSession};
pub use reqwest_probe::ReqwestConnector;

//! Value types shared by the pipeline, the store ports and the loops.

mod check_entry;
mod endpoint;
mod rule;
mod score;

pub use check_entry::CheckEntry;
pub use endpoint::{Endpoint, EndpointParseError};
pub use rule::RuleSpec;
pub use score::{ScoreBand, ScoreBounds};

//! Research domain: search sources, fan-out results and tool session traits.

pub mod results;
pub mod session;
pub mod source;

pub use results::{FanoutResults, SourceOutcome};
pub use session::{ToolConnector, ToolSession};
pub use source::SearchSource;

pub mod factory;
pub mod record;
pub mod recorder;
pub mod sink;

pub use factory::{build_failure_recorder, build_sink};
pub use record::{ErrorDescription, FailureRecord, RequestSnapshot};
pub use recorder::{FailureRecorder, StatusWhitelist};
pub use sink::{DeadLetterSink, SinkError, TracingSink};

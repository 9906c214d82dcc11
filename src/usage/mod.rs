//! Anonymous SDK usage telemetry.
//!
//! Calls wrapped with [`UsageRecorder::instrument`] are timed and counted per
//! method. The first 100 calls of a method are always reported, after that
//! progressively fewer (10%, 1%, 0.1%); failed calls are always reported.
//! Setting `ENABLE_HOPSWORKS_USAGE` to anything but `true` turns it off.

pub mod counter;
pub mod environment;
pub mod method;
pub mod record;
pub mod recorder;
pub mod version_source;

pub use counter::{sampling_rate, MethodCounter};
pub use environment::{generate_user_id, load_or_create_user_id, EnvironmentAttributes};
pub use method::{CallArguments, MethodRef};
pub use record::UsageRecord;
pub use recorder::UsageRecorder;
pub use version_source::{default_version_sources, VersionSource};

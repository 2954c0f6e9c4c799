//! Wire-level contracts of the Application Insights ingestion endpoint.
//!
//! The page-view beacon path serializes these directly; a [`TelemetryClient`]
//! implementation uses them to shape everything else it sends.
//!
//! [`TelemetryClient`]: crate::TelemetryClient

pub mod context_tag_keys;
mod data;
mod data_point;
mod envelope;
mod event_data;
mod exception_data;
mod exception_details;
mod message_data;
mod metric_data;
mod page_view_data;
mod remote_dependency_data;
mod sanitize;
mod severity_level;

pub use data::*;
pub use data_point::*;
pub use envelope::*;
pub use event_data::*;
pub use exception_data::*;
pub use exception_details::*;
pub use message_data::*;
pub use metric_data::*;
pub use page_view_data::*;
pub use remote_dependency_data::*;
pub use sanitize::Sanitize;
pub(crate) use sanitize::sanitize_url;
pub use severity_level::*;

use std::collections::BTreeMap;

/// Custom properties attached to a telemetry item.
pub type Properties = BTreeMap<String, String>;

/// Custom measurements attached to a telemetry item.
pub type Measurements = BTreeMap<String, f64>;

use crate::models::{
    Envelope, EventData, ExceptionData, MessageData, MetricData, RemoteDependencyData,
};
use http::Uri;
use std::fmt::Debug;

/// Mutation function invoked once per outgoing telemetry item before
/// dispatch.
pub type TelemetryInitializer = Box<dyn FnMut(&mut Envelope)>;

/// Identifiers the telemetry client resolved from its cookies and client
/// context, copied into the custom page-view envelope.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    /// Session id from the `ai_session` cookie.
    pub session_id: Option<String>,
    /// Unique client device id.
    pub device_id: Option<String>,
    /// Device type, e.g. `Browser`.
    pub device_type: Option<String>,
    /// Version of the client SDK.
    pub sdk_version: Option<String>,
    /// Anonymous user id from the user cookie.
    pub user_id: Option<String>,
    /// Authenticated user id.
    pub authenticated_user_id: Option<String>,
    /// Identifier of the containing operation.
    pub operation_id: Option<String>,
    /// Name of the containing operation.
    pub operation_name: Option<String>,
}

/// Configuration flags forwarded verbatim from the options bag to the
/// telemetry client. `None` means the key was absent and the client keeps its
/// own default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientConfigUpdate {
    /// Turn on the client's own debug output.
    pub enable_debug: Option<bool>,
    /// Disable the client's automatic exception collection.
    pub disable_exception_tracking: Option<bool>,
    /// Disable the client's automatic ajax collection.
    pub disable_ajax_tracking: Option<bool>,
    /// Cap on ajax calls tracked per page view; `-1` tracks all.
    pub max_ajax_calls_per_view: Option<i64>,
    /// Disable the client's trace collection.
    pub disable_trace_tracking: Option<bool>,
    /// Disable the client's dependency collection.
    pub disable_dependency_tracking: Option<bool>,
    /// Disable the client's metric collection.
    pub disable_metric_tracking: Option<bool>,
    /// Disable the client's event collection.
    pub disable_event_tracking: Option<bool>,
}

/// An already-initialized Application Insights client.
///
/// The adapter treats this as a black-box sink: it gates and shapes
/// telemetry, then hands the typed payload over. Batching, retries and
/// cookie management stay on the client's side of the seam.
pub trait TelemetryClient: Debug {
    /// The instrumentation key the client was initialized with.
    fn instrumentation_key(&self) -> String;

    /// The ingestion endpoint telemetry is delivered to.
    fn endpoint_url(&self) -> Uri;

    /// Session, device, user and operation identifiers for the current page.
    fn context(&self) -> ClientContext;

    /// Apply configuration flags forwarded from the options bag.
    fn update_config(&self, update: ClientConfigUpdate);

    /// Register a mutation function invoked once per outgoing telemetry item
    /// before dispatch.
    fn add_telemetry_initializer(&self, initializer: TelemetryInitializer);

    /// Record the authenticated user for the rest of the session.
    fn set_authenticated_user_context(&self, user_id: &str);

    /// Send a custom event.
    fn track_event(&self, event: EventData);

    /// Send a metric.
    fn track_metric(&self, metric: MetricData);

    /// Send a trace message.
    fn track_trace(&self, trace: MessageData);

    /// Send an exception.
    fn track_exception(&self, exception: ExceptionData);

    /// Send a dependency record.
    fn track_dependency(&self, dependency: RemoteDependencyData);
}

use crate::{client::ClientConfigUpdate, Error};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

/// The kinds of telemetry a form session can emit, each with its own
/// disable flag and sampling percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryKind {
    /// The custom page-view beacon sent at page unload.
    Pageview,
    /// The PageLoad timing metric.
    PageLoadTime,
    /// The PageSave timing metric.
    PageSaveTime,
    /// Trace messages.
    Trace,
    /// Exceptions.
    Exception,
    /// Dependency calls.
    Dependency,
    /// Metrics.
    Metric,
    /// Custom events.
    Event,
}

impl fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TelemetryKind::Pageview => "Pageview",
            TelemetryKind::PageLoadTime => "PageLoadTime",
            TelemetryKind::PageSaveTime => "PageSaveTime",
            TelemetryKind::Trace => "Trace",
            TelemetryKind::Exception => "Exception",
            TelemetryKind::Dependency => "Dependency",
            TelemetryKind::Metric => "Metric",
            TelemetryKind::Event => "Event",
        })
    }
}

/// Per-kind tracking state: a disable flag and a sampling percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindConfig {
    /// Suppress this kind entirely.
    pub disabled: bool,
    /// Percent chance, in `[0, 100]`, that one event of this kind is
    /// emitted.
    pub percent: u8,
}

impl Default for KindConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            percent: 100,
        }
    }
}

/// Resolved configuration of one form telemetry session.
///
/// Starts from defaults (everything enabled at 100%) and is overridden once
/// per session from the options bag passed to the builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Emit per-event diagnostic log lines.
    pub debug: bool,
    /// Suppress automatic dependency timing of outbound calls.
    pub disable_ajax_tracking: bool,
    pageview: KindConfig,
    page_load_time: KindConfig,
    page_save_time: KindConfig,
    trace: KindConfig,
    exception: KindConfig,
    dependency: KindConfig,
    metric: KindConfig,
    event: KindConfig,
}

/// Option keys recognized per kind: `(kind, disable key, percent key)`.
const KIND_OPTION_KEYS: [(TelemetryKind, &str, &str); 8] = [
    (
        TelemetryKind::Pageview,
        "disablePageviewTracking",
        "percentLoggedPageview",
    ),
    (
        TelemetryKind::PageLoadTime,
        "disablePageLoadTimeTracking",
        "percentLoggedPageLoadTime",
    ),
    (
        TelemetryKind::PageSaveTime,
        "disablePageSaveTimeTracking",
        "percentLoggedPageSaveTime",
    ),
    (
        TelemetryKind::Trace,
        "disableTraceTracking",
        "percentLoggedTrace",
    ),
    (
        TelemetryKind::Exception,
        "disableExceptionTracking",
        "percentLoggedException",
    ),
    (
        TelemetryKind::Dependency,
        "disableDependencyTracking",
        "percentLoggedDependency",
    ),
    (
        TelemetryKind::Metric,
        "disableMetricTracking",
        "percentLoggedMetric",
    ),
    (
        TelemetryKind::Event,
        "disableEventTracking",
        "percentLoggedEvent",
    ),
];

impl TelemetryConfig {
    /// Tracking state for one telemetry kind.
    pub fn kind(&self, kind: TelemetryKind) -> KindConfig {
        match kind {
            TelemetryKind::Pageview => self.pageview,
            TelemetryKind::PageLoadTime => self.page_load_time,
            TelemetryKind::PageSaveTime => self.page_save_time,
            TelemetryKind::Trace => self.trace,
            TelemetryKind::Exception => self.exception,
            TelemetryKind::Dependency => self.dependency,
            TelemetryKind::Metric => self.metric,
            TelemetryKind::Event => self.event,
        }
    }

    fn kind_mut(&mut self, kind: TelemetryKind) -> &mut KindConfig {
        match kind {
            TelemetryKind::Pageview => &mut self.pageview,
            TelemetryKind::PageLoadTime => &mut self.page_load_time,
            TelemetryKind::PageSaveTime => &mut self.page_save_time,
            TelemetryKind::Trace => &mut self.trace,
            TelemetryKind::Exception => &mut self.exception,
            TelemetryKind::Dependency => &mut self.dependency,
            TelemetryKind::Metric => &mut self.metric,
            TelemetryKind::Event => &mut self.event,
        }
    }

    /// Apply an options bag in place.
    ///
    /// Keys present in the bag override the corresponding field; absent keys
    /// leave the prior value untouched. Returns the client flags that are
    /// forwarded verbatim to the underlying telemetry client.
    pub(crate) fn apply_options(&mut self, options: &Value) -> Result<ClientConfigUpdate, Error> {
        let bag = options
            .as_object()
            .ok_or_else(|| Error::Configuration(format!("expected a JSON object, got: {}", options)))?;

        if let Some(value) = bag.get("enableDebug").and_then(Value::as_bool) {
            self.debug = value;
        }
        if let Some(value) = bag.get("disableAjaxTracking").and_then(Value::as_bool) {
            self.disable_ajax_tracking = value;
        }

        for (kind, disable_key, percent_key) in KIND_OPTION_KEYS {
            if let Some(value) = bag.get(disable_key).and_then(Value::as_bool) {
                self.kind_mut(kind).disabled = value;
            }
            if let Some(value) = bag.get(percent_key) {
                if let Some(percent) = log_percent(percent_key, value) {
                    self.kind_mut(kind).percent = percent;
                }
            }
        }

        let update = ClientConfigUpdate {
            enable_debug: bag.get("enableDebug").and_then(Value::as_bool),
            disable_exception_tracking: bag
                .get("disableExceptionTracking")
                .and_then(Value::as_bool),
            disable_ajax_tracking: bag.get("disableAjaxTracking").and_then(Value::as_bool),
            max_ajax_calls_per_view: bag.get("maxAjaxCallsPerView").and_then(Value::as_i64),
            disable_trace_tracking: bag.get("disableTraceTracking").and_then(Value::as_bool),
            disable_dependency_tracking: bag
                .get("disableDependencyTracking")
                .and_then(Value::as_bool),
            disable_metric_tracking: bag.get("disableMetricTracking").and_then(Value::as_bool),
            disable_event_tracking: bag.get("disableEventTracking").and_then(Value::as_bool),
        };

        // Dump the state strictly after all overrides, so support can see
        // what a session actually ran with.
        if self.debug {
            debug!("Application Insights configuration: {:?}", self);
            debug!("Application Insights client pass-through: {:?}", update);
        }

        Ok(update)
    }
}

/// Parse a sampling percent from the options bag. Accepts numbers and numeric
/// strings; rounds to the nearest integer and clamps to `[0, 100]`. Returns
/// `None` for non-numeric input, leaving the prior value in effect.
fn log_percent(key: &str, value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(x) if x.is_finite() => Some(x.round().clamp(0.0, 100.0) as u8),
        _ => {
            warn!("Log percent {}: {} is not a number", key, value);
            None
        }
    }
}

use crate::{client::TelemetryClient, models::Properties, FormTelemetry};
use http::Uri;
use std::time::Instant;
use tracing::debug;

/// Transient state attached to one outbound network call: the start instant
/// and the logical method name, captured at request start and consumed
/// exactly once at completion.
#[derive(Debug)]
pub struct PendingDependencyRequest {
    started: Instant,
    method: String,
    url: String,
    method_name: String,
}

impl<C: TelemetryClient> FormTelemetry<C> {
    /// Record the start of an outbound network call.
    ///
    /// Every concurrent call carries its own pending state, so overlapping
    /// requests do not interfere with each other.
    pub fn begin_dependency(
        &self,
        method: &str,
        url: &str,
        method_name: &str,
    ) -> PendingDependencyRequest {
        if self.config().debug {
            debug!("Application Insights started timing dependency: {}", method_name);
        }
        PendingDependencyRequest {
            started: Instant::now(),
            method: method.into(),
            url: url.into(),
            method_name: method_name.into(),
        }
    }

    /// Record the completion of an outbound network call, successful or not,
    /// and write the dependency record. Suppressed entirely by the
    /// `disableAjaxTracking` option.
    pub fn complete_dependency(
        &self,
        request: PendingDependencyRequest,
        success: bool,
        result_code: u16,
    ) {
        if self.config().disable_ajax_tracking {
            return;
        }

        let duration_ms = request.started.elapsed().as_secs_f64() * 1000.0;
        let props = Properties::from([("methodName".to_string(), request.method_name)]);
        self.write_dependency(
            &request.url,
            &request.method,
            duration_ms,
            success,
            result_code,
            None,
            Some(props),
        );
    }
}

/// Whether a dependency name is an absolute URL rather than a logical
/// operation name.
pub(crate) fn is_url(name: &str) -> bool {
    name.parse::<Uri>()
        .map(|uri| uri.scheme().is_some())
        .unwrap_or(false)
}

/// The path portion of an absolute URL, or `None` for anything else.
pub(crate) fn url_path(name: &str) -> Option<String> {
    name.parse::<Uri>()
        .ok()
        .filter(|uri| uri.scheme().is_some())
        .map(|uri| uri.path().to_string())
}

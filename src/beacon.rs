use crate::{
    client::ClientContext,
    context::FormContext,
    convert::{duration_to_string, new_id, time_to_string},
    models::{
        context_tag_keys as tags, context_tag_keys::Tags, sanitize_url, Data, Envelope,
        PageViewData, Properties, Sanitize,
    },
};
use http::Uri;
use std::{
    cell::Cell,
    fmt::Debug,
    time::{Duration, Instant, SystemTime},
};
use tracing::{debug, warn};

/// How long the synchronous fallback keeps the thread alive after posting,
/// to raise the odds the request leaves before the page is torn down.
const FALLBACK_LINGER: Duration = Duration::from_millis(100);

/// A fire-and-forget delivery primitive for small payloads, safe to call
/// while the page unloads. Returns whether the payload was accepted for
/// delivery; nothing is ever reported about the outcome.
pub trait BeaconTransport: Debug {
    /// Queue one payload for best-effort delivery to `endpoint`.
    fn send_beacon(&self, endpoint: &Uri, payload: &[u8]) -> bool;
}

/// Delivery state of the session's page view. One-way: once sent, the
/// session never builds a second envelope.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PageViewState {
    /// Session is live, duration timer running since `started`.
    Armed {
        /// When the page view began.
        started: Instant,
    },
    /// The envelope went out (or page-view tracking never armed). Terminal.
    Sent,
}

/// The Armed -> Sent latch guarding the custom page-view path.
#[derive(Debug)]
pub(crate) struct PageViewBeacon {
    state: Cell<PageViewState>,
}

impl PageViewBeacon {
    pub(crate) fn armed(started: Instant) -> Self {
        Self {
            state: Cell::new(PageViewState::Armed { started }),
        }
    }

    pub(crate) fn unarmed() -> Self {
        Self {
            state: Cell::new(PageViewState::Sent),
        }
    }

    /// Take the start instant if the beacon is still armed, transitioning to
    /// `Sent`. Subsequent calls return `None`.
    pub(crate) fn take_if_armed(&self) -> Option<Instant> {
        match self.state.replace(PageViewState::Sent) {
            PageViewState::Armed { started } => Some(started),
            PageViewState::Sent => None,
        }
    }
}

/// Build the backend-compatible envelope for one page view.
///
/// This bypasses the client's own page-view collection, which double-records
/// when the hosting application already runs its own Application Insights
/// account.
pub(crate) fn build_page_view_envelope(
    instrumentation_key: &str,
    client_context: &ClientContext,
    form_context: &FormContext,
    duration: Duration,
    properties: &Properties,
) -> Envelope {
    let mut envelope_tags = Tags::new();
    let mut insert = |key, value: &Option<String>| {
        if let Some(value) = value {
            envelope_tags.insert(key, value.clone());
        }
    };
    insert(tags::SESSION_ID, &client_context.session_id);
    insert(tags::DEVICE_ID, &client_context.device_id);
    insert(tags::DEVICE_TYPE, &client_context.device_type);
    insert(tags::INTERNAL_SDK_VERSION, &client_context.sdk_version);
    insert(tags::USER_ID, &client_context.user_id);
    insert(
        tags::USER_AUTH_USER_ID,
        &client_context
            .authenticated_user_id
            .as_ref()
            .map(|id| id.to_uppercase()),
    );
    insert(tags::OPERATION_ID, &client_context.operation_id);
    insert(tags::OPERATION_NAME, &client_context.operation_name);

    let mut envelope = Envelope {
        name: format!(
            "Microsoft.ApplicationInsights.{}.Pageview",
            instrumentation_key.replace('-', "")
        ),
        time: time_to_string(SystemTime::now()),
        sample_rate: None,
        i_key: Some(instrumentation_key.to_string()),
        tags: Some(envelope_tags),
        data: Some(Data::PageView(PageViewData {
            ver: 2,
            name: form_context.form_name.clone(),
            url: Some(sanitize_url(form_context.page_url.clone())),
            duration: duration_to_string(duration),
            id: new_id(),
            properties: Some(properties.clone()).filter(|x| !x.is_empty()),
            measurements: None,
        })),
    };
    envelope.sanitize();
    envelope
}

/// Deliver a page-view payload when no beacon transport is available: one
/// blocking POST, then a busy-wait so the network stack gets wall-clock time
/// before teardown continues. Best effort; failures are not retried or
/// surfaced.
pub(crate) fn send_page_view_sync(endpoint: &Uri, payload: &[u8], debug_enabled: bool) {
    let deadline = Instant::now() + FALLBACK_LINGER;

    let response = ureq::post(&endpoint.to_string())
        .set(http::header::ACCEPT.as_str(), "*/*")
        .set(http::header::CONTENT_TYPE.as_str(), "application/json")
        .send_bytes(payload);
    match response {
        Ok(response) if response.status() == 200 => {
            if debug_enabled {
                debug!("Application Insights logged Pageview via sync POST");
            }
        }
        Ok(response) => {
            warn!(
                "Application Insights Pageview POST returned status {}",
                response.status()
            );
        }
        Err(err) => {
            warn!("Application Insights Pageview POST failed: {}", err);
        }
    }

    wait_until(deadline);
}

/// Block the calling thread until an absolute deadline. During page teardown
/// timers no longer fire, so an async sleep would never wake; burning the
/// thread is the only way to keep the process alive long enough for the
/// request to leave. Delivery is still not guaranteed.
fn wait_until(deadline: Instant) {
    while Instant::now() < deadline {}
}

//! An [Azure Application Insights] adapter for Dynamics 365 style form
//! scripting.
//!
//! [Azure Application Insights]: https://docs.microsoft.com/en-us/azure/azure-monitor/app/app-insights-overview
//!
//! **Disclaimer**: This is not an official Microsoft product.
//!
//! One [`FormTelemetry`] session is created per form load. It reads an
//! options bag, captures the business-entity context from whichever host
//! form API variant is available, and forwards form-lifecycle and ad-hoc
//! telemetry (events, metrics, traces, exceptions, dependency timings) to an
//! already-initialized telemetry client, tagging every item with the form's
//! entity, organization and user identifiers.
//!
//! Page views take a custom path: the hosting application ships its own
//! Application Insights account, and the client SDK's default page-view
//! collection double-records in that setup. Instead the session arms a
//! one-shot beacon at load and, on [`FormTelemetry::page_unloading`], builds
//! the page-view envelope itself and delivers it fire-and-forget.
//!
//! # Usage
//!
//! ```rust,no_run
//! use d365_application_insights::FormTelemetry;
//! use serde_json::json;
//!
//! # #[derive(Debug)]
//! # struct Client;
//! # impl d365_application_insights::TelemetryClient for Client {
//! #     fn instrumentation_key(&self) -> String { "0fdcec70-0ce5-4085-89d9-9ae8ead9af66".into() }
//! #     fn endpoint_url(&self) -> http::Uri { http::Uri::from_static("https://dc.services.visualstudio.com/v2/track") }
//! #     fn context(&self) -> d365_application_insights::ClientContext { Default::default() }
//! #     fn update_config(&self, _: d365_application_insights::ClientConfigUpdate) {}
//! #     fn add_telemetry_initializer(&self, _: d365_application_insights::TelemetryInitializer) {}
//! #     fn set_authenticated_user_context(&self, _: &str) {}
//! #     fn track_event(&self, _: d365_application_insights::models::EventData) {}
//! #     fn track_metric(&self, _: d365_application_insights::models::MetricData) {}
//! #     fn track_trace(&self, _: d365_application_insights::models::MessageData) {}
//! #     fn track_exception(&self, _: d365_application_insights::models::ExceptionData) {}
//! #     fn track_dependency(&self, _: d365_application_insights::models::RemoteDependencyData) {}
//! # }
//! # #[derive(Debug)]
//! # struct Page;
//! # impl d365_application_insights::FormScope for Page {
//! #     fn form_label(&self) -> String { "Account Form".into() }
//! #     fn entity_id(&self) -> String { "{3fa85f64-5717-4562-b3fc-2c963f66afa6}".into() }
//! #     fn entity_name(&self) -> String { "account".into() }
//! #     fn form_type(&self) -> i32 { 2 }
//! #     fn org_unique_name(&self) -> String { "contoso".into() }
//! #     fn org_version(&self) -> String { "9.2.0.0".into() }
//! #     fn user_id(&self) -> String { "{2c963f66-afa6-4562-b3fc-3fa85f645717}".into() }
//! #     fn page_url(&self) -> String { "https://contoso.crm.dynamics.com/main.aspx".into() }
//! #     fn add_on_save(&self, _: d365_application_insights::SaveHandler) {}
//! # }
//! # fn run() -> Result<(), d365_application_insights::Error> {
//! let page = Page;
//! let session = FormTelemetry::builder(Client)
//!     .with_legacy_page(&page)
//!     .with_options(json!({
//!         "enableDebug": true,
//!         "percentLoggedPageview": 100,
//!     }))
//!     .start()?;
//!
//! session.write_event("Quote calculated", None, None);
//! session.page_unloading();
//! # Ok(())
//! # }
//! ```
#![doc(html_root_url = "https://docs.rs/d365-application-insights/0.1.0")]
#![deny(missing_docs, unreachable_pub, missing_debug_implementations)]
#![cfg_attr(test, deny(warnings))]

mod beacon;
mod client;
mod config;
mod context;
mod convert;
mod dependency;
mod error;
pub mod models;
mod sampling;

pub use beacon::BeaconTransport;
pub use client::{ClientConfigUpdate, ClientContext, TelemetryClient, TelemetryInitializer};
pub use config::{KindConfig, TelemetryConfig, TelemetryKind};
pub use context::{
    get_form_type_name, get_save_mode_name, normalize_guid, ExecutionContext, FormContext,
    FormScope, SaveEvent, SaveHandler,
};
pub use dependency::PendingDependencyRequest;
pub use error::Error;

use beacon::PageViewBeacon;
use context::is_guid;
use convert::{duration_to_string, millis_to_duration, new_id};
use models::{
    DataPoint, DataPointType, EventData, ExceptionData, ExceptionDetails, Measurements,
    MessageData, MetricData, Properties, RemoteDependencyData, Sanitize, SeverityLevel,
};
use serde_json::Value;
use std::{
    cell::Cell,
    fmt,
    rc::Rc,
    time::Instant,
};
use tracing::{debug, error, warn};

/// The value shipped in the distributable before the consumer pastes in
/// their own key.
const PLACEHOLDER_INSTRUMENTATION_KEY: &str = "Your AI Instrumentation Key";

/// One form session's telemetry adapter.
///
/// Created through [`FormTelemetry::builder`] at form load. All tracking
/// operations take `&self`: a session is single-threaded by construction
/// (it follows the hosting page's event loop) and the two mutable bits —
/// the page-view latch and the save timer mark — live in [`Cell`]s.
#[derive(Debug)]
pub struct FormTelemetry<C: TelemetryClient> {
    client: C,
    config: TelemetryConfig,
    context: FormContext,
    props: Properties,
    page_view: PageViewBeacon,
    save_mark: Cell<Option<Instant>>,
    beacon: Option<Box<dyn BeaconTransport>>,
}

/// Builder for a [`FormTelemetry`] session.
pub struct FormTelemetryBuilder<'a, C: TelemetryClient> {
    client: C,
    execution_context: Option<&'a dyn ExecutionContext>,
    legacy_page: Option<&'a dyn FormScope>,
    options: Option<Value>,
    beacon: Option<Box<dyn BeaconTransport>>,
}

impl<C: TelemetryClient> fmt::Debug for FormTelemetryBuilder<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormTelemetryBuilder")
            .field("client", &self.client)
            .field("has_execution_context", &self.execution_context.is_some())
            .field("has_legacy_page", &self.legacy_page.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl<C: TelemetryClient> FormTelemetry<C> {
    /// Start configuring a session around an already-initialized telemetry
    /// client.
    pub fn builder(client: C) -> FormTelemetryBuilder<'static, C> {
        FormTelemetryBuilder {
            client,
            execution_context: None,
            legacy_page: None,
            options: None,
            beacon: None,
        }
    }

    /// The configuration the session resolved from its options bag.
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// The business-entity context captured at session start.
    pub fn context(&self) -> &FormContext {
        &self.context
    }

    /// Signal that the hosting page is unloading.
    ///
    /// On the first call of an armed session this computes the elapsed
    /// page-view duration, builds the page-view envelope and delivers it —
    /// through the beacon transport when one is configured, otherwise
    /// through the blocking fallback. Subsequent calls do nothing; loss on
    /// unload is accepted and never retried.
    pub fn page_unloading(&self) {
        let started = match self.page_view.take_if_armed() {
            Some(started) => started,
            None => return,
        };

        let envelope = beacon::build_page_view_envelope(
            &self.client.instrumentation_key(),
            &self.client.context(),
            &self.context,
            started.elapsed(),
            &self.props,
        );
        let payload = match serde_json::to_vec(&envelope) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("Application Insights failed to serialize Pageview: {}", err);
                return;
            }
        };

        let endpoint = self.client.endpoint_url();
        match self.beacon.as_ref() {
            Some(transport) => {
                if transport.send_beacon(&endpoint, &payload) {
                    if self.config.debug {
                        debug!("Application Insights logged Pageview via Beacon");
                    }
                } else {
                    warn!("Application Insights Beacon rejected the Pageview payload");
                }
            }
            None => beacon::send_page_view_sync(&endpoint, &payload, self.config.debug),
        }
    }

    /// Write an event record.
    pub fn write_event(
        &self,
        name: &str,
        props: Option<Properties>,
        measurements: Option<Measurements>,
    ) {
        if !self.should_log(TelemetryKind::Event) {
            return;
        }

        let mut data = EventData {
            ver: 2,
            name: name.into(),
            properties: props,
            measurements,
        };
        data.sanitize();
        self.client.track_event(data);
        if self.config.debug {
            debug!("Application Insights logged event: {}", name);
        }
    }

    /// Write a metric. `sample_count` defaults to 1; `min` and `max` default
    /// to `value`.
    pub fn write_metric(
        &self,
        name: &str,
        value: f64,
        sample_count: Option<i32>,
        min: Option<f64>,
        max: Option<f64>,
        props: Option<Properties>,
    ) {
        if !self.should_log(TelemetryKind::Metric) {
            return;
        }

        let mut data = MetricData {
            ver: 2,
            metrics: vec![DataPoint {
                name: name.into(),
                kind: Some(DataPointType::Aggregation {
                    count: Some(sample_count.unwrap_or(1)),
                    min: Some(min.unwrap_or(value)),
                    max: Some(max.unwrap_or(value)),
                    std_dev: None,
                }),
                value,
            }],
            properties: props,
        };
        data.sanitize();
        self.client.track_metric(data);
        if self.config.debug {
            debug!("Application Insights logged metric: {}", name);
        }
    }

    /// Write an exception. Severity defaults to
    /// [`SeverityLevel::Error`]; `handled_at` is folded into the custom
    /// properties.
    pub fn write_exception(
        &self,
        exception: ExceptionDetails,
        handled_at: Option<&str>,
        severity_level: Option<SeverityLevel>,
        props: Option<Properties>,
        measurements: Option<Measurements>,
    ) {
        if !self.should_log(TelemetryKind::Exception) {
            return;
        }

        let type_name = exception.type_name.clone();
        let mut properties = props.unwrap_or_default();
        if let Some(handled_at) = handled_at {
            properties.insert("handledAt".into(), handled_at.into());
        }
        let mut data = ExceptionData {
            ver: 2,
            exceptions: vec![exception],
            severity_level: Some(severity_level.unwrap_or(SeverityLevel::Error)),
            properties: Some(properties).filter(|x| !x.is_empty()),
            measurements,
        };
        data.sanitize();
        self.client.track_exception(data);
        if self.config.debug {
            debug!("Application Insights logged exception: {}", type_name);
        }
    }

    /// Write a trace message. Severity defaults to
    /// [`SeverityLevel::Information`].
    pub fn write_trace(
        &self,
        message: &str,
        severity_level: Option<SeverityLevel>,
        props: Option<Properties>,
    ) {
        if !self.should_log(TelemetryKind::Trace) {
            return;
        }

        let mut data = MessageData {
            ver: 2,
            message: message.into(),
            severity_level: Some(severity_level.unwrap_or(SeverityLevel::Information)),
            properties: props,
        };
        data.sanitize();
        self.client.track_trace(data);
        if self.config.debug {
            debug!("Application Insights logged trace: {}", message);
        }
    }

    /// Write a dependency record. `name` is the dependency name or absolute
    /// URL; when `path_name` is absent the path portion is derived from
    /// `name`.
    #[allow(clippy::too_many_arguments)]
    pub fn write_dependency(
        &self,
        name: &str,
        method: &str,
        duration_ms: f64,
        success: bool,
        result_code: u16,
        path_name: Option<&str>,
        props: Option<Properties>,
    ) {
        if !self.should_log(TelemetryKind::Dependency) {
            return;
        }

        let id = new_id();
        let path = path_name
            .map(str::to_string)
            .or_else(|| dependency::url_path(name));
        let mut data = RemoteDependencyData {
            ver: 2,
            name: match path.as_deref() {
                Some(path) => format!("{} {}", method, path),
                None => name.to_string(),
            },
            id: Some(id.clone()),
            result_code: Some(result_code.to_string()),
            duration: duration_to_string(millis_to_duration(duration_ms)),
            success: Some(success),
            data: dependency::is_url(name).then(|| name.to_string()),
            target: path,
            type_: Some("Ajax".into()),
            properties: props,
            measurements: None,
        };
        data.sanitize();
        self.client.track_dependency(data);
        if self.config.debug {
            debug!(
                "Application Insights logged dependency: {}: {}",
                id, duration_ms
            );
        }
    }

    /// Write a method execution duration as a `Method Time: <name>` metric.
    pub fn write_method_time(&self, method_name: &str, start: Instant, end: Instant) {
        let elapsed = end.saturating_duration_since(start);
        let millis = elapsed.as_secs_f64() * 1000.0;
        self.write_metric(
            &format!("Method Time: {}", method_name),
            millis,
            None,
            None,
            None,
            None,
        );
        if self.config.debug {
            debug!(
                "Application Insights logged method time: {}: {}ms",
                method_name, millis
            );
        }
    }

    /// Start timing a record save.
    ///
    /// One timer slot per session: starting a new measurement before the
    /// prior one completes overwrites the mark and the prior measurement is
    /// silently lost.
    pub fn track_save_time(&self) {
        if self.config.kind(TelemetryKind::PageSaveTime).disabled {
            return;
        }

        self.save_mark.set(Some(Instant::now()));
        if self.config.debug {
            debug!("Application Insights started timing PageSave");
        }
    }

    /// Complete a save timing and write the `PageSave` metric, labeled with
    /// the save mode from the OnSave event args.
    ///
    /// Wired automatically through the form's OnSave hook when page-save
    /// tracking is enabled; callers registering the handler themselves must
    /// pass the save event through.
    pub fn write_page_save_metric(&self, event: Option<&dyn SaveEvent>) -> Result<(), Error> {
        if !self.should_log(TelemetryKind::PageSaveTime) {
            return Ok(());
        }

        let event = event.ok_or(Error::MissingContext)?;
        let mark = match self.save_mark.take() {
            Some(mark) => mark,
            None => {
                if self.config.debug {
                    debug!("Application Insights PageSave measured without a start mark");
                }
                return Ok(());
            }
        };

        let duration_ms = (mark.elapsed().as_secs_f64() * 1000.0).round();
        let save_mode = get_save_mode_name(event.save_mode());
        let props = Properties::from([("saveMode".to_string(), save_mode.to_string())]);
        self.write_metric("PageSave", duration_ms, Some(1), None, None, Some(props));
        if self.config.debug {
            debug!(
                "Application Insights logged metric: PageSave time: {}ms",
                duration_ms
            );
        }
        Ok(())
    }

    fn write_page_load_metric(&self, load_time: Option<std::time::Duration>) {
        if !self.should_log(TelemetryKind::PageLoadTime) {
            return;
        }

        let load_time = match load_time {
            Some(load_time) => load_time,
            None => {
                if self.config.debug {
                    debug!("Application Insights PageLoad time not available");
                }
                return;
            }
        };

        let millis = (load_time.as_secs_f64() * 1000.0).round();
        self.write_metric("PageLoad", millis, None, None, None, None);
        if self.config.debug {
            debug!(
                "Application Insights logged metric: PageLoad time: {}ms",
                millis
            );
        }
    }

    fn should_log(&self, kind: TelemetryKind) -> bool {
        sampling::should_log(kind, self.config.kind(kind), self.config.debug)
    }
}

impl<'a, C: TelemetryClient + 'static> FormTelemetryBuilder<'a, C> {
    /// Use the execution context the triggering lifecycle event passed in.
    pub fn with_execution_context(mut self, context: &'a dyn ExecutionContext) -> Self {
        self.execution_context = Some(context);
        self
    }

    /// Use a legacy global page handle when no execution context is
    /// available.
    pub fn with_legacy_page(mut self, page: &'a dyn FormScope) -> Self {
        self.legacy_page = Some(page);
        self
    }

    /// Apply an options bag (see the crate documentation for the recognized
    /// keys).
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    /// Deliver the page-view envelope through this fire-and-forget
    /// transport. Without one, the session falls back to a blocking POST at
    /// unload.
    pub fn with_beacon(mut self, beacon: impl BeaconTransport + 'static) -> Self {
        self.beacon = Some(Box::new(beacon));
        self
    }

    /// Validate the setup and start the session.
    ///
    /// Fails with [`Error::InvalidInstrumentationKey`] when the client's key
    /// is the placeholder or not a GUID (nothing is tracked), and with
    /// [`Error::MissingContext`] when neither host form API variant is
    /// usable. A malformed options bag is logged and ignored; the session
    /// starts with the prior (default) configuration.
    pub fn start(self) -> Result<Rc<FormTelemetry<C>>, Error> {
        let instrumentation_key = self.client.instrumentation_key();
        if instrumentation_key == PLACEHOLDER_INSTRUMENTATION_KEY || !is_guid(&instrumentation_key)
        {
            error!(
                "Application Insights instrumentation key was not updated or has an invalid value - search for {:?} and replace it with your key",
                PLACEHOLDER_INSTRUMENTATION_KEY
            );
            return Err(Error::InvalidInstrumentationKey(instrumentation_key));
        }

        let (context, scope) = context::resolve(self.execution_context, self.legacy_page)?;

        let mut config = TelemetryConfig::default();
        if let Some(options) = self.options.as_ref() {
            match config.apply_options(options) {
                Ok(update) => self.client.update_config(update),
                Err(err) => error!("Application Insights {}", err),
            }
        }

        let page_view_start = Instant::now();

        let mut props = Properties::new();
        props.insert("entityId".into(), context.entity_id.clone());
        props.insert("entityName".into(), context.entity_name.clone());
        props.insert("formType".into(), context.form_type.clone());
        props.insert("orgName".into(), context.org_name.clone());
        props.insert("orgVersion".into(), context.org_version.clone());
        props.insert("formName".into(), context.form_name.clone());
        props.insert("source".into(), "Rust".into());

        let initializer_props = props.clone();
        self.client
            .add_telemetry_initializer(Box::new(move |envelope| {
                if let Some(data) = envelope.data.as_mut() {
                    data.merge_properties(&initializer_props);
                }
            }));
        if config.debug {
            debug!("Application Insights added telemetry initializer");
        }

        self.client.set_authenticated_user_context(&context.user_id);

        let page_view = if sampling::should_log(
            TelemetryKind::Pageview,
            config.kind(TelemetryKind::Pageview),
            config.debug,
        ) {
            PageViewBeacon::armed(page_view_start)
        } else {
            PageViewBeacon::unarmed()
        };

        let session = Rc::new(FormTelemetry {
            client: self.client,
            config,
            context,
            props,
            page_view,
            save_mark: Cell::new(None),
            beacon: self.beacon,
        });

        session.write_page_load_metric(scope.page_load_time());

        if !session.config.kind(TelemetryKind::PageSaveTime).disabled {
            let weak = Rc::downgrade(&session);
            scope.add_on_save(Box::new(move |event| {
                if let Some(session) = weak.upgrade() {
                    if let Err(err) = session.write_page_save_metric(Some(event)) {
                        error!("Application Insights {}", err);
                    }
                }
            }));
        }

        Ok(session)
    }
}

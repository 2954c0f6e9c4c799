//! End-to-end tests for a form telemetry session, using recording doubles
//! for the telemetry client, the host form API and the beacon transport.

use d365_application_insights::{
    models::{
        Data, DataPointType, Envelope, EventData, ExceptionData, ExceptionDetails, MessageData,
        MetricData, RemoteDependencyData, SeverityLevel,
    },
    BeaconTransport, ClientConfigUpdate, ClientContext, Error, ExecutionContext, FormScope,
    FormTelemetry, SaveEvent, SaveHandler, TelemetryClient, TelemetryInitializer,
};
use http::Uri;
use serde_json::{json, Value};
use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
    time::Duration,
};

// Fake instrumentation key (this is a random uuid)
const INSTRUMENTATION_KEY: &str = "0fdcec70-0ce5-4085-89d9-9ae8ead9af66";

#[derive(Default)]
struct RecorderState {
    events: RefCell<Vec<EventData>>,
    metrics: RefCell<Vec<MetricData>>,
    traces: RefCell<Vec<MessageData>>,
    exceptions: RefCell<Vec<ExceptionData>>,
    dependencies: RefCell<Vec<RemoteDependencyData>>,
    initializers: RefCell<Vec<TelemetryInitializer>>,
    config_updates: RefCell<Vec<ClientConfigUpdate>>,
    authenticated_user: RefCell<Option<String>>,
}

/// Telemetry client double; clones share the recorded state.
#[derive(Clone)]
struct Recorder {
    instrumentation_key: String,
    state: Rc<RecorderState>,
}

impl Recorder {
    fn new() -> Self {
        Self::with_key(INSTRUMENTATION_KEY)
    }

    fn with_key(key: &str) -> Self {
        Self {
            instrumentation_key: key.into(),
            state: Rc::default(),
        }
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder").finish()
    }
}

impl TelemetryClient for Recorder {
    fn instrumentation_key(&self) -> String {
        self.instrumentation_key.clone()
    }

    fn endpoint_url(&self) -> Uri {
        Uri::from_static("https://dc.services.visualstudio.com/v2/track")
    }

    fn context(&self) -> ClientContext {
        ClientContext {
            session_id: Some("session-1".into()),
            device_type: Some("Browser".into()),
            ..Default::default()
        }
    }

    fn update_config(&self, update: ClientConfigUpdate) {
        self.state.config_updates.borrow_mut().push(update);
    }

    fn add_telemetry_initializer(&self, initializer: TelemetryInitializer) {
        self.state.initializers.borrow_mut().push(initializer);
    }

    fn set_authenticated_user_context(&self, user_id: &str) {
        *self.state.authenticated_user.borrow_mut() = Some(user_id.into());
    }

    fn track_event(&self, event: EventData) {
        self.state.events.borrow_mut().push(event);
    }

    fn track_metric(&self, metric: MetricData) {
        self.state.metrics.borrow_mut().push(metric);
    }

    fn track_trace(&self, trace: MessageData) {
        self.state.traces.borrow_mut().push(trace);
    }

    fn track_exception(&self, exception: ExceptionData) {
        self.state.exceptions.borrow_mut().push(exception);
    }

    fn track_dependency(&self, dependency: RemoteDependencyData) {
        self.state.dependencies.borrow_mut().push(dependency);
    }
}

/// Host form API double for the legacy page variant.
#[derive(Default)]
struct Scope {
    page_load_time: Cell<Option<Duration>>,
    save_handlers: RefCell<Vec<SaveHandler>>,
}

impl Scope {
    fn fire_save(&self, mode: i32) {
        let event = Save { mode };
        for handler in self.save_handlers.borrow_mut().iter_mut() {
            handler(&event);
        }
    }
}

impl FormScope for Scope {
    fn form_label(&self) -> String {
        "Account Form".into()
    }

    fn entity_id(&self) -> String {
        "{3fa85f64-5717-4562-b3fc-2c963f66afa6}".into()
    }

    fn entity_name(&self) -> String {
        "account".into()
    }

    fn form_type(&self) -> i32 {
        2
    }

    fn org_unique_name(&self) -> String {
        "contoso".into()
    }

    fn org_version(&self) -> String {
        "9.2.0.0".into()
    }

    fn user_id(&self) -> String {
        "{2c963f66-afa6-4562-b3fc-3fa85f645717}".into()
    }

    fn page_url(&self) -> String {
        "https://contoso.crm.dynamics.com/main.aspx?etn=account".into()
    }

    fn page_load_time(&self) -> Option<Duration> {
        self.page_load_time.get()
    }

    fn add_on_save(&self, handler: SaveHandler) {
        self.save_handlers.borrow_mut().push(handler);
    }
}

struct Save {
    mode: i32,
}

impl SaveEvent for Save {
    fn save_mode(&self) -> i32 {
        self.mode
    }
}

/// Execution context double carrying a form scope.
struct ModernContext<'a> {
    scope: &'a Scope,
}

impl ExecutionContext for ModernContext<'_> {
    fn form_context(&self) -> Option<&dyn FormScope> {
        Some(self.scope)
    }
}

/// Execution context double without a form scope.
struct EmptyContext;

impl ExecutionContext for EmptyContext {
    fn form_context(&self) -> Option<&dyn FormScope> {
        None
    }
}

#[derive(Clone, Debug, Default)]
struct RecordingBeacon {
    sends: Rc<RefCell<Vec<(Uri, Vec<u8>)>>>,
}

impl BeaconTransport for RecordingBeacon {
    fn send_beacon(&self, endpoint: &Uri, payload: &[u8]) -> bool {
        self.sends
            .borrow_mut()
            .push((endpoint.clone(), payload.to_vec()));
        true
    }
}

fn start_session(
    client: Recorder,
    scope: &Scope,
    beacon: RecordingBeacon,
    options: Value,
) -> Rc<FormTelemetry<Recorder>> {
    FormTelemetry::builder(client)
        .with_legacy_page(scope)
        .with_options(options)
        .with_beacon(beacon)
        .start()
        .expect("session should start")
}

#[test]
fn page_view_is_sent_exactly_once_on_unload() {
    let client = Recorder::new();
    let scope = Scope::default();
    let beacon = RecordingBeacon::default();
    let session = start_session(
        client,
        &scope,
        beacon.clone(),
        json!({ "disablePageviewTracking": false, "percentLoggedPageview": 100 }),
    );

    session.page_unloading();
    session.page_unloading();

    let sends = beacon.sends.borrow();
    assert_eq!(1, sends.len());
    assert_eq!(
        "https://dc.services.visualstudio.com/v2/track",
        sends[0].0.to_string()
    );

    let envelope: Value = serde_json::from_slice(&sends[0].1).unwrap();
    assert_eq!(
        format!(
            "Microsoft.ApplicationInsights.{}.Pageview",
            INSTRUMENTATION_KEY.replace('-', "")
        ),
        envelope["name"]
    );
    assert_eq!(INSTRUMENTATION_KEY, envelope["iKey"]);
    assert_eq!("PageviewData", envelope["data"]["baseType"]);
    assert_eq!(2, envelope["data"]["baseData"]["ver"]);
    assert_eq!("Account Form", envelope["data"]["baseData"]["name"]);
    assert_eq!("session-1", envelope["tags"]["ai.session.id"]);

    // The session unloads within the test, so the measured duration is
    // sub-second.
    let duration = envelope["data"]["baseData"]["duration"].as_str().unwrap();
    assert!(duration.starts_with("0.00:00:00."), "duration: {}", duration);

    let properties = &envelope["data"]["baseData"]["properties"];
    assert_eq!("3fa85f64-5717-4562-b3fc-2c963f66afa6", properties["entityId"]);
    assert_eq!("account", properties["entityName"]);
    assert_eq!("Update", properties["formType"]);
    assert_eq!("Rust", properties["source"]);
}

#[test]
fn disabled_page_view_tracking_sends_nothing() {
    let client = Recorder::new();
    let scope = Scope::default();
    let beacon = RecordingBeacon::default();
    let session = start_session(
        client,
        &scope,
        beacon.clone(),
        json!({ "disablePageviewTracking": true }),
    );

    session.page_unloading();
    assert!(beacon.sends.borrow().is_empty());
}

#[test]
fn zero_percent_page_view_sampling_sends_nothing() {
    let client = Recorder::new();
    let scope = Scope::default();
    let beacon = RecordingBeacon::default();
    let session = start_session(
        client,
        &scope,
        beacon.clone(),
        json!({ "percentLoggedPageview": 0 }),
    );

    session.page_unloading();
    assert!(beacon.sends.borrow().is_empty());
}

#[test]
fn save_flow_writes_page_save_metric_with_save_mode() {
    let client = Recorder::new();
    let scope = Scope::default();
    let session = start_session(client.clone(), &scope, RecordingBeacon::default(), json!({}));

    session.track_save_time();
    scope.fire_save(70);

    let metrics = client.state.metrics.borrow();
    let page_save = metrics
        .iter()
        .find(|m| m.metrics[0].name == "PageSave")
        .expect("PageSave metric");
    assert_eq!(
        "Auto Save",
        page_save.properties.as_ref().unwrap().get("saveMode").unwrap()
    );
}

#[test]
fn page_load_metric_is_written_at_start_when_timing_is_available() {
    let client = Recorder::new();
    let scope = Scope::default();
    scope.page_load_time.set(Some(Duration::from_millis(320)));
    let _session = start_session(client.clone(), &scope, RecordingBeacon::default(), json!({}));

    let metrics = client.state.metrics.borrow();
    let page_load = metrics
        .iter()
        .find(|m| m.metrics[0].name == "PageLoad")
        .expect("PageLoad metric");
    assert_eq!(320.0, page_load.metrics[0].value);
}

#[test]
fn dependency_path_is_derived_from_the_url() {
    let client = Recorder::new();
    let scope = Scope::default();
    let session = start_session(client.clone(), &scope, RecordingBeacon::default(), json!({}));

    session.write_dependency(
        "https://api.example.com/orders",
        "GET",
        120.0,
        true,
        200,
        None,
        None,
    );

    let dependencies = client.state.dependencies.borrow();
    assert_eq!(1, dependencies.len());
    let dependency = &dependencies[0];
    assert_eq!(Some("/orders"), dependency.target.as_deref());
    assert_eq!("GET /orders", dependency.name);
    assert_eq!(Some("200"), dependency.result_code.as_deref());
    assert_eq!(Some(true), dependency.success);
    assert_eq!("0.00:00:00.120000", dependency.duration);
    assert_eq!(
        Some("https://api.example.com/orders"),
        dependency.data.as_deref()
    );
}

#[test]
fn pending_dependency_requests_time_independently() {
    let client = Recorder::new();
    let scope = Scope::default();
    let session = start_session(client.clone(), &scope, RecordingBeacon::default(), json!({}));

    let first = session.begin_dependency("GET", "https://api.example.com/orders", "loadOrders");
    let second = session.begin_dependency("POST", "https://api.example.com/quotes", "saveQuote");
    session.complete_dependency(second, false, 500);
    session.complete_dependency(first, true, 200);

    let dependencies = client.state.dependencies.borrow();
    assert_eq!(2, dependencies.len());
    assert_eq!(Some("/quotes"), dependencies[0].target.as_deref());
    assert_eq!(Some(false), dependencies[0].success);
    assert_eq!(
        "saveQuote",
        dependencies[0]
            .properties
            .as_ref()
            .unwrap()
            .get("methodName")
            .unwrap()
    );
    assert_eq!(Some("/orders"), dependencies[1].target.as_deref());
}

#[test]
fn disable_ajax_tracking_suppresses_completed_dependencies() {
    let client = Recorder::new();
    let scope = Scope::default();
    let session = start_session(
        client.clone(),
        &scope,
        RecordingBeacon::default(),
        json!({ "disableAjaxTracking": true }),
    );

    let pending = session.begin_dependency("GET", "https://api.example.com/orders", "loadOrders");
    session.complete_dependency(pending, true, 200);
    assert!(client.state.dependencies.borrow().is_empty());
}

#[test]
fn metric_defaults_count_min_max() {
    let client = Recorder::new();
    let scope = Scope::default();
    let session = start_session(client.clone(), &scope, RecordingBeacon::default(), json!({}));

    session.write_metric("Queue depth", 42.0, None, None, None, None);

    let metrics = client.state.metrics.borrow();
    let metric = &metrics[0].metrics[0];
    assert_eq!(42.0, metric.value);
    match metric.kind.as_ref().unwrap() {
        DataPointType::Aggregation {
            count, min, max, ..
        } => {
            assert_eq!(Some(1), *count);
            assert_eq!(Some(42.0), *min);
            assert_eq!(Some(42.0), *max);
        }
        other => panic!("expected an aggregation, got {:?}", other),
    }
}

#[test]
fn method_time_is_written_as_a_metric() {
    let client = Recorder::new();
    let scope = Scope::default();
    let session = start_session(client.clone(), &scope, RecordingBeacon::default(), json!({}));

    let start = std::time::Instant::now();
    let end = start + Duration::from_millis(250);
    session.write_method_time("calculateQuote", start, end);

    let metrics = client.state.metrics.borrow();
    let metric = metrics
        .iter()
        .find(|m| m.metrics[0].name == "Method Time: calculateQuote")
        .expect("method time metric");
    assert!((metric.metrics[0].value - 250.0).abs() < 1.0);
}

#[test]
fn exception_defaults_to_error_severity_and_keeps_handled_at() {
    let client = Recorder::new();
    let scope = Scope::default();
    let session = start_session(client.clone(), &scope, RecordingBeacon::default(), json!({}));

    session.write_exception(
        ExceptionDetails::new("TypeError", "boom"),
        Some("onLoad"),
        None,
        None,
        None,
    );

    let exceptions = client.state.exceptions.borrow();
    let exception = &exceptions[0];
    assert_eq!(Some(SeverityLevel::Error), exception.severity_level);
    assert_eq!("TypeError", exception.exceptions[0].type_name);
    assert_eq!(
        "onLoad",
        exception.properties.as_ref().unwrap().get("handledAt").unwrap()
    );
}

#[test]
fn trace_defaults_to_information_severity() {
    let client = Recorder::new();
    let scope = Scope::default();
    let session = start_session(client.clone(), &scope, RecordingBeacon::default(), json!({}));

    session.write_trace("loaded quote grid", None, None);

    let traces = client.state.traces.borrow();
    assert_eq!(Some(SeverityLevel::Information), traces[0].severity_level);
    assert_eq!("loaded quote grid", traces[0].message);
}

#[test]
fn disabled_event_tracking_suppresses_events() {
    let client = Recorder::new();
    let scope = Scope::default();
    let session = start_session(
        client.clone(),
        &scope,
        RecordingBeacon::default(),
        json!({ "disableEventTracking": true }),
    );

    session.write_event("Quote calculated", None, None);
    assert!(client.state.events.borrow().is_empty());
}

#[test]
fn pass_through_flags_reach_the_client() {
    let client = Recorder::new();
    let scope = Scope::default();
    let _session = start_session(
        client.clone(),
        &scope,
        RecordingBeacon::default(),
        json!({
            "enableDebug": true,
            "disableAjaxTracking": true,
            "maxAjaxCallsPerView": -1,
        }),
    );

    let updates = client.state.config_updates.borrow();
    assert_eq!(1, updates.len());
    assert_eq!(Some(true), updates[0].enable_debug);
    assert_eq!(Some(true), updates[0].disable_ajax_tracking);
    assert_eq!(Some(-1), updates[0].max_ajax_calls_per_view);
    assert_eq!(None, updates[0].disable_metric_tracking);
}

#[test]
fn telemetry_initializer_merges_entity_context_into_items() {
    let client = Recorder::new();
    let scope = Scope::default();
    let _session = start_session(client.clone(), &scope, RecordingBeacon::default(), json!({}));

    let mut initializers = client.state.initializers.borrow_mut();
    assert_eq!(1, initializers.len());

    let mut envelope = Envelope {
        name: "Microsoft.ApplicationInsights.Event".into(),
        time: "2026-08-07T10:40:00.000Z".into(),
        sample_rate: None,
        i_key: None,
        tags: None,
        data: Some(Data::Event(EventData {
            ver: 2,
            name: "Quote calculated".into(),
            properties: None,
            measurements: None,
        })),
    };
    let initializer = initializers.first_mut().unwrap();
    initializer(&mut envelope);

    let properties = match envelope.data.unwrap() {
        Data::Event(data) => data.properties.unwrap(),
        other => panic!("expected an event, got {:?}", other),
    };
    assert_eq!("account", properties.get("entityName").unwrap());
    assert_eq!("Account Form", properties.get("formName").unwrap());
    assert_eq!("Rust", properties.get("source").unwrap());
}

#[test]
fn authenticated_user_context_is_set_from_the_form_scope() {
    let client = Recorder::new();
    let scope = Scope::default();
    let _session = start_session(client.clone(), &scope, RecordingBeacon::default(), json!({}));

    assert_eq!(
        Some("2c963f66-afa6-4562-b3fc-3fa85f645717"),
        client.state.authenticated_user.borrow().as_deref()
    );
}

#[test]
fn execution_context_variant_wins_over_legacy_page() {
    let client = Recorder::new();
    let scope = Scope::default();
    let context = ModernContext { scope: &scope };
    let session = FormTelemetry::builder(client)
        .with_execution_context(&context)
        .start()
        .expect("session should start");

    assert_eq!("3fa85f64-5717-4562-b3fc-2c963f66afa6", session.context().entity_id);
    assert_eq!("Update", session.context().form_type);
}

#[test]
fn missing_context_is_an_integration_bug() {
    let err = FormTelemetry::builder(Recorder::new())
        .with_execution_context(&EmptyContext)
        .start()
        .unwrap_err();
    assert!(matches!(err, Error::MissingContext));

    let err = FormTelemetry::builder(Recorder::new()).start().unwrap_err();
    assert!(matches!(err, Error::MissingContext));
}

#[test]
fn placeholder_instrumentation_key_halts_startup() {
    let client = Recorder::with_key("Your AI Instrumentation Key");
    let scope = Scope::default();
    let err = FormTelemetry::builder(client.clone())
        .with_legacy_page(&scope)
        .start()
        .unwrap_err();

    assert!(matches!(err, Error::InvalidInstrumentationKey(_)));
    assert!(client.state.initializers.borrow().is_empty());
    assert!(client.state.authenticated_user.borrow().is_none());
}

#[test]
fn malformed_options_bag_keeps_defaults_and_the_session_alive() {
    let client = Recorder::new();
    let scope = Scope::default();
    let beacon = RecordingBeacon::default();
    let session = start_session(client.clone(), &scope, beacon.clone(), json!("not an object"));

    // Defaults stay in effect: everything tracked at 100%.
    session.write_event("Quote calculated", None, None);
    assert_eq!(1, client.state.events.borrow().len());
    assert!(client.state.config_updates.borrow().is_empty());

    session.page_unloading();
    assert_eq!(1, beacon.sends.borrow().len());
}

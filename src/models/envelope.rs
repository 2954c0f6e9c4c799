use crate::models::{context_tag_keys::Tags, Data, Sanitize};
use serde::Serialize;

/// System variables for a telemetry item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Fully qualified event name, e.g.
    /// `Microsoft.ApplicationInsights.<ikey-no-dashes>.Pageview`.
    pub name: String,

    /// Event date time when telemetry item was created, ISO-8601.
    pub time: String,

    /// Sampling rate used in application. This telemetry item represents
    /// 100 / sampleRate actual telemetry items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<f64>,

    /// The instrumentation key of the Application Insights resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i_key: Option<String>,

    /// Key/value collection of context properties (`ai.*` tags).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,

    /// Telemetry data item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,
}

impl Sanitize for Envelope {
    fn sanitize(&mut self) {
        self.name.truncate(1024);
        if let Some(tags) = self.tags.as_mut() {
            tags.sanitize();
        }
        if let Some(data) = self.data.as_mut() {
            data.sanitize();
        }
    }
}

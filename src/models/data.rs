use crate::models::{
    EventData, ExceptionData, MessageData, MetricData, PageViewData, Properties,
    RemoteDependencyData, Sanitize,
};
use serde::Serialize;

/// Data struct to contain both B and C sections.
#[derive(Debug, Serialize)]
#[serde(tag = "baseType", content = "baseData")]
pub enum Data {
    /// A structured event record.
    #[serde(rename = "EventData")]
    Event(EventData),

    /// A handled or unhandled exception.
    #[serde(rename = "ExceptionData")]
    Exception(ExceptionData),

    /// A printf-like trace statement.
    #[serde(rename = "MessageData")]
    Message(MessageData),

    /// A list of measurements and/or aggregations.
    #[serde(rename = "MetricData")]
    Metric(MetricData),

    /// A page view.
    #[serde(rename = "PageviewData")]
    PageView(PageViewData),

    /// An interaction with a remote component or service.
    #[serde(rename = "RemoteDependencyData")]
    RemoteDependency(RemoteDependencyData),
}

impl Data {
    /// Custom properties of the contained telemetry item.
    pub fn properties_mut(&mut self) -> &mut Option<Properties> {
        match self {
            Data::Event(data) => &mut data.properties,
            Data::Exception(data) => &mut data.properties,
            Data::Message(data) => &mut data.properties,
            Data::Metric(data) => &mut data.properties,
            Data::PageView(data) => &mut data.properties,
            Data::RemoteDependency(data) => &mut data.properties,
        }
    }

    /// Merge `extra` into the custom properties, overriding existing keys.
    pub fn merge_properties(&mut self, extra: &Properties) {
        if extra.is_empty() {
            return;
        }
        let properties = self.properties_mut().get_or_insert_with(Properties::new);
        for (key, value) in extra {
            properties.insert(key.clone(), value.clone());
        }
    }
}

impl Sanitize for Data {
    fn sanitize(&mut self) {
        match self {
            Data::Event(data) => data.sanitize(),
            Data::Exception(data) => data.sanitize(),
            Data::Message(data) => data.sanitize(),
            Data::Metric(data) => data.sanitize(),
            Data::PageView(data) => data.sanitize(),
            Data::RemoteDependency(data) => data.sanitize(),
        }
    }
}

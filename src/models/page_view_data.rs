use crate::models::{Measurements, Properties, Sanitize};
use serde::Serialize;

/// An instance of PageView represents a generic action on a page like a
/// button click. It is also the base type for PageView.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewData {
    /// Schema version
    pub ver: i32,

    /// Event name. Keep it low cardinality to allow proper grouping and
    /// useful metrics.
    pub name: String,

    /// Request URL with all query string parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Request duration in format: DD.HH:MM:SS.MMMMMM. For a page view
    /// (PageViewData), this is the duration. For a page view with performance
    /// information (PageViewPerfData), this is the page load time.
    pub duration: String,

    /// Identifier of a page view instance. Used for correlation between page
    /// view and other telemetry items.
    pub id: String,

    /// Collection of custom properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,

    /// Collection of custom measurements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurements: Option<Measurements>,
}

impl Sanitize for PageViewData {
    fn sanitize(&mut self) {
        self.name.truncate(1024);
        if let Some(url) = self.url.as_mut() {
            url.truncate(2048);
        }
        self.id.truncate(128);
        if let Some(properties) = self.properties.as_mut() {
            properties.sanitize();
        }
    }
}

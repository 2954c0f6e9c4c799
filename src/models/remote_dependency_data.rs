use crate::models::{Measurements, Properties, Sanitize};
use serde::Serialize;

/// An instance of Remote Dependency represents an interaction of the
/// monitored component with a remote component/service like SQL or an HTTP
/// endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDependencyData {
    /// Schema version
    pub ver: i32,

    /// Name of the command initiated with this dependency call, e.g. an
    /// absolute URL or a logical operation name.
    pub name: String,

    /// Identifier of a dependency call instance. Used for correlation with
    /// the request telemetry item corresponding to this dependency call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Result code of a dependency call. Examples are SQL error code and
    /// HTTP status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_code: Option<String>,

    /// Request duration in format: DD.HH:MM:SS.MMMMMM.
    pub duration: String,

    /// Indication of successful or unsuccessful call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    /// Command initiated by this dependency call, e.g. the full URL with all
    /// query parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Target site of a dependency call, e.g. the path portion of the URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Dependency type name, e.g. HTTP, SQL or Ajax.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// Collection of custom properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,

    /// Collection of custom measurements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurements: Option<Measurements>,
}

impl Sanitize for RemoteDependencyData {
    fn sanitize(&mut self) {
        self.name.truncate(1024);
        if let Some(data) = self.data.as_mut() {
            data.truncate(8192);
        }
        if let Some(target) = self.target.as_mut() {
            target.truncate(1024);
        }
        if let Some(properties) = self.properties.as_mut() {
            properties.sanitize();
        }
    }
}

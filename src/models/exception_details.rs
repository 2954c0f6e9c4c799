use crate::models::Sanitize;
use serde::Serialize;
use std::error::Error as StdError;

/// Exception details of the exception in a chain.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    /// Exception type name.
    pub type_name: String,

    /// Exception message.
    pub message: String,

    /// Text describing the stack. Either stack or parsedStack should have a
    /// value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ExceptionDetails {
    /// Create exception details from a type name and message.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// Create exception details from an error, using the error's source chain
    /// in place of a stack trace.
    pub fn from_error(error: &dyn StdError) -> Self {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {}", cause));
            source = cause.source();
        }
        Self {
            type_name: "Error".into(),
            message: error.to_string(),
            stack: Some(chain.join("\n")).filter(|x| !x.is_empty()),
        }
    }
}

impl Sanitize for ExceptionDetails {
    fn sanitize(&mut self) {
        self.type_name.truncate(1024);
        self.message.truncate(32768);
        if let Some(stack) = self.stack.as_mut() {
            stack.truncate(32768);
        }
    }
}

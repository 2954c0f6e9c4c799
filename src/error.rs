/// Errors that occurred while setting up a form telemetry session.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The telemetry client's instrumentation key is still the placeholder
    /// value or is not a valid GUID. The session is not started and no
    /// telemetry is sent.
    #[error("instrumentation key was not updated or has an invalid value: {0:?}")]
    InvalidInstrumentationKey(String),

    /// Neither host form API variant was usable. The caller must pass the
    /// execution context as the first argument of the triggering lifecycle
    /// event.
    #[error("execution context was not passed as the first parameter of the triggering event")]
    MissingContext,

    /// The options bag could not be interpreted. Reported and ignored during
    /// session setup; the prior configuration stays in effect.
    #[error("error parsing configuration parameters: {0}")]
    Configuration(String),
}

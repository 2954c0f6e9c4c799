use serde_repr::Serialize_repr;

/// Defines the level of severity for the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr)]
#[repr(i32)]
pub enum SeverityLevel {
    /// Verbose severity level.
    Verbose = 0,

    /// Information severity level.
    Information = 1,

    /// Warning severity level.
    Warning = 2,

    /// Error severity level.
    Error = 3,

    /// Critical severity level.
    Critical = 4,
}

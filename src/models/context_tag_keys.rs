//! Well-known `ai.*` context tag keys and the [`Tags`] map that carries them.

use crate::models::Sanitize;
use serde::ser::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Well-known key of an `ai.*` context tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ContextTagKey(&'static str);

impl ContextTagKey {
    const fn new(key: &'static str) -> Self {
        ContextTagKey(key)
    }
}

impl Serialize for ContextTagKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0)
    }
}

/// Context tags of a telemetry envelope.
pub type Tags = BTreeMap<ContextTagKey, String>;

/// Application version. Information in the application context fields is
/// always about the application that is sending the telemetry.
pub const APPLICATION_VERSION: ContextTagKey = ContextTagKey::new("ai.application.ver");

/// Unique client device id. Computer name in most cases.
pub const DEVICE_ID: ContextTagKey = ContextTagKey::new("ai.device.id");

/// The type of the device the end user of the application is using. Used
/// primarily to distinguish JavaScript telemetry from server side telemetry.
/// Examples: 'PC', 'Phone', 'Browser'. 'PC' is the default value.
pub const DEVICE_TYPE: ContextTagKey = ContextTagKey::new("ai.device.type");

/// A unique identifier for the operation instance. The operation.id is
/// created by either a request or a page view. All other telemetry sets this
/// to the value for the containing request or page view. Operation.id is used
/// for finding all the telemetry items for a specific operation instance.
pub const OPERATION_ID: ContextTagKey = ContextTagKey::new("ai.operation.id");

/// The name (group) of the operation. The operation.name is created by either
/// a request or a page view. All other telemetry items set this to the value
/// for the containing request or page view.
pub const OPERATION_NAME: ContextTagKey = ContextTagKey::new("ai.operation.name");

/// Session ID - the instance of the user's interaction with the app.
/// Information in the session context fields is always about the end user.
pub const SESSION_ID: ContextTagKey = ContextTagKey::new("ai.session.id");

/// Anonymous user id. Represents the end user of the application.
pub const USER_ID: ContextTagKey = ContextTagKey::new("ai.user.id");

/// Authenticated user id. The opposite of ai.user.id, this represents the
/// user with a friendly name. Since it's PII information it is not collected
/// by default by most SDKs.
pub const USER_AUTH_USER_ID: ContextTagKey = ContextTagKey::new("ai.user.authUserId");

/// SDK version. See
/// https://github.com/Microsoft/ApplicationInsights-Home/blob/master/SDK-AUTHORING.md#sdk-version-specification
/// for information.
pub const INTERNAL_SDK_VERSION: ContextTagKey = ContextTagKey::new("ai.internal.sdkVersion");

impl Sanitize for Tags {
    fn sanitize(&mut self) {
        for (key, value) in self.iter_mut() {
            value.truncate(match *key {
                APPLICATION_VERSION => 1024,
                DEVICE_ID => 1024,
                DEVICE_TYPE => 64,
                OPERATION_ID => 128,
                OPERATION_NAME => 1024,
                SESSION_ID => 64,
                USER_ID => 128,
                USER_AUTH_USER_ID => 1024,
                INTERNAL_SDK_VERSION => 64,
                _ => 0,
            });
        }
    }
}

use std::collections::BTreeMap;
use tracing::debug;

/// Truncation of telemetry items to the limits the ingestion endpoint
/// enforces. Items over the limit are rejected server-side, so trimming them
/// client-side is the lesser evil.
pub trait Sanitize {
    /// Truncate all fields to their backend limits.
    fn sanitize(&mut self);
}

impl Sanitize for BTreeMap<String, String> {
    fn sanitize(&mut self) {
        let long_keys: Vec<_> = self
            .keys()
            .filter(|k| k.len() > 150)
            .map(|k| k.to_owned())
            .collect();
        for mut long_key in long_keys {
            let (mut key, value) = self
                .remove_entry(&long_key)
                .expect("value needs to exist. got key by iterating over map");
            key.truncate(150);
            if self.insert(key, value).is_some() {
                long_key.truncate(150);
                debug!(
                    "Truncated property name overrides property with the same name: {}",
                    long_key
                );
            }
        }
        for value in self.values_mut() {
            value.truncate(8192);
        }
    }
}

/// Truncate a URL to the maximum length the backend accepts.
pub(crate) fn sanitize_url(mut url: String) -> String {
    url.truncate(2048);
    url
}

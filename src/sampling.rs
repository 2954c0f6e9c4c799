use crate::config::{KindConfig, TelemetryKind};
use rand::Rng;
use tracing::debug;

/// Decide whether one event of the given kind is emitted.
pub(crate) fn should_log(kind: TelemetryKind, config: KindConfig, debug_enabled: bool) -> bool {
    if config.disabled {
        if debug_enabled {
            debug!("Application Insights {} not written: Disabled", kind);
        }
        return false;
    }

    if !in_threshold(config.percent) {
        if debug_enabled {
            debug!(
                "Application Insights {} not written: Threshold%: {}",
                kind, config.percent
            );
        }
        return false;
    }

    true
}

pub(crate) fn in_threshold(percent: u8) -> bool {
    in_threshold_with(&mut rand::rng(), percent)
}

fn in_threshold_with<R: Rng>(rng: &mut R, percent: u8) -> bool {
    if percent >= 100 {
        return true;
    }
    if percent == 0 {
        return false;
    }

    // Inclusive comparison over 101 draw outcomes: percent=1 admits both 0
    // and 1, an effective pass rate of (percent + 1) / 101. Consumers are
    // calibrated against this distribution, so the boundary stays as is.
    let draw: u8 = rng.random_range(0..=100);
    draw <= percent
}

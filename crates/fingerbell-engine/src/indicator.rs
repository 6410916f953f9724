use fingerbell_hardware::{IndicatorPattern, SensorLink};
use tracing::debug;

/// Drive the sensor ring LED. Failures are logged and ignored.
pub(crate) async fn indicate<L: SensorLink>(link: &mut L, pattern: IndicatorPattern) {
    if let Err(e) = link.set_led(pattern.control()).await {
        debug!(?pattern, error = %e, "Indicator update failed");
    }
}

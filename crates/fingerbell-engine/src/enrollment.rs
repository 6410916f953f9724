//! Multi-pass enrollment.
//!
//! An enrollment takes five samples of the same finger into character
//! buffers 1-5, merges them into one model and stores it at the requested
//! slot. Between passes the finger must be lifted and the window left empty
//! for a settle delay, so one long touch cannot supply all five samples.
//!
//! Every wait polls the sensor at `finger_poll_interval` and gives up after
//! `finger_wait_timeout`.

use std::time::Duration;

use fingerbell_core::SlotId;
use fingerbell_core::constants::ENROLL_PASSES;
use fingerbell_hardware::{IndicatorPattern, SensorError, SensorLink};
use tokio::time::{Instant, sleep};
use tracing::{error, info};

use crate::config::EngineConfig;
use crate::error::{EnrollError, WaitTarget};
use crate::indicator::indicate;
use crate::observation::{ObservationSink, Publisher};

/// Timing for one enrollment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollTiming {
    pub poll_interval: Duration,
    pub settle_delay: Duration,
    pub confirm_delay: Duration,
    pub wait_timeout: Duration,
}

impl From<&EngineConfig> for EnrollTiming {
    fn from(config: &EngineConfig) -> Self {
        Self {
            poll_interval: config.finger_poll_interval(),
            settle_delay: config.settle_delay(),
            confirm_delay: config.pass_confirm_delay(),
            wait_timeout: config.finger_wait_timeout(),
        }
    }
}

/// Capture five samples, merge them, and store the model at `slot`.
///
/// Leaves the registry, the session state and the idle indicator to the
/// caller. On error nothing has been stored on the sensor.
pub async fn run<L, S>(
    link: &mut L,
    publisher: &mut Publisher<S>,
    timing: EnrollTiming,
    slot: SlotId,
) -> Result<(), EnrollError>
where
    L: SensorLink,
    S: ObservationSink,
{
    info!(%slot, "Starting enrollment");

    for pass in 1..=ENROLL_PASSES {
        info!("Enrollment pass {}/{}", pass, ENROLL_PASSES);
        publisher.status(format!(
            "Enrollment pass {}/{}: Place finger",
            pass, ENROLL_PASSES
        ));

        if pass > 1 {
            indicate(link, IndicatorPattern::EnrollAwaitLift).await;
            wait_for_lift(link, timing, pass).await?;
            sleep(timing.settle_delay).await;
        }

        indicate(link, IndicatorPattern::EnrollReady).await;
        wait_for_finger(link, timing, pass).await?;
        info!("Image captured");

        link.image_to_template(pass)
            .await
            .map_err(|source| EnrollError::Convert { pass, source })
            .inspect_err(|e| error!("{}", e))?;

        indicate(link, IndicatorPattern::EnrollCaptured).await;
        sleep(timing.confirm_delay).await;
    }

    info!("Creating fingerprint model");
    publisher.status("Creating fingerprint model...");
    link.create_model().await.map_err(|source| match source {
        SensorError::EnrollMismatch => {
            error!("Fingerprints did not match");
            EnrollError::Mismatch
        }
        source => {
            error!(error = %source, "Error creating model");
            EnrollError::Model { source }
        }
    })?;

    info!(%slot, "Storing fingerprint model");
    publisher.status("Storing fingerprint...");
    link.store_model(slot)
        .await
        .map_err(|source| EnrollError::Store { slot, source })
        .inspect_err(|e| error!("{}", e))?;

    info!(%slot, "Enrollment complete");
    Ok(())
}

/// Poll until the window is empty.
async fn wait_for_lift<L: SensorLink>(
    link: &mut L,
    timing: EnrollTiming,
    pass: u8,
) -> Result<(), EnrollError> {
    let deadline = Instant::now() + timing.wait_timeout;
    loop {
        if let Err(SensorError::NoFinger) = link.capture_image().await {
            return Ok(());
        }
        check_deadline(deadline, timing, WaitTarget::FingerLifted, pass)?;
        sleep(timing.poll_interval).await;
    }
}

/// Poll until an image is captured. Capture failures other than an empty
/// window abort the enrollment.
async fn wait_for_finger<L: SensorLink>(
    link: &mut L,
    timing: EnrollTiming,
    pass: u8,
) -> Result<(), EnrollError> {
    let deadline = Instant::now() + timing.wait_timeout;
    loop {
        match link.capture_image().await {
            Ok(()) => return Ok(()),
            Err(SensorError::NoFinger) => {}
            Err(source) => {
                error!(error = %source, "Error capturing image");
                return Err(EnrollError::Capture { pass, source });
            }
        }
        check_deadline(deadline, timing, WaitTarget::FingerPresent, pass)?;
        sleep(timing.poll_interval).await;
    }
}

fn check_deadline(
    deadline: Instant,
    timing: EnrollTiming,
    waiting_for: WaitTarget,
    pass: u8,
) -> Result<(), EnrollError> {
    if Instant::now() >= deadline {
        let after_ms = u64::try_from(timing.wait_timeout.as_millis()).unwrap_or(u64::MAX);
        error!(%waiting_for, pass, after_ms, "Enrollment wait timed out");
        return Err(EnrollError::Timeout {
            waiting_for,
            pass,
            after_ms,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::RecordingSink;
    use fingerbell_hardware::mock::{CaptureStep, MockSensor, Operation};

    fn timing() -> EnrollTiming {
        EnrollTiming::from(&EngineConfig::default())
    }

    fn slot(id: i64) -> SlotId {
        SlotId::new(id).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_pass_enrollment_stores_template() {
        let (mut sensor, handle) = MockSensor::new();
        handle.script_enrollment(21);

        let sink = RecordingSink::new();
        let mut publisher = Publisher::new(sink.clone());

        run(&mut sensor, &mut publisher, timing(), slot(4))
            .await
            .unwrap();

        assert_eq!(handle.template_at(slot(4)), Some(21));
        assert_eq!(handle.calls(Operation::ImageToTemplate), 5);
        assert_eq!(
            sink.statuses(),
            vec![
                "Enrollment pass 1/5: Place finger",
                "Enrollment pass 2/5: Place finger",
                "Enrollment pass 3/5: Place finger",
                "Enrollment pass 4/5: Place finger",
                "Enrollment pass 5/5: Place finger",
                "Creating fingerprint model...",
                "Storing fingerprint...",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_finger_must_lift_between_passes() {
        let (mut sensor, handle) = MockSensor::new();
        // First pass, then the finger stays for three polls before lifting.
        handle.script([
            CaptureStep::Finger(3),
            CaptureStep::Finger(3),
            CaptureStep::Finger(3),
            CaptureStep::Finger(3),
        ]);

        let mut publisher = Publisher::new(RecordingSink::new());
        let short = EnrollTiming {
            wait_timeout: Duration::from_secs(2),
            ..timing()
        };

        let err = run(&mut sensor, &mut publisher, short, slot(1))
            .await
            .unwrap_err();

        // After the lift nobody presents the finger again.
        assert!(matches!(
            err,
            EnrollError::Timeout {
                waiting_for: WaitTarget::FingerPresent,
                pass: 2,
                ..
            }
        ));
        assert_eq!(handle.calls(Operation::ImageToTemplate), 1);
        assert_eq!(handle.template_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finger_never_lifted_times_out() {
        let (mut sensor, handle) = MockSensor::new();
        handle.place_finger(3);

        let mut publisher = Publisher::new(RecordingSink::new());
        let started = Instant::now();

        let err = run(&mut sensor, &mut publisher, timing(), slot(1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EnrollError::Timeout {
                waiting_for: WaitTarget::FingerLifted,
                pass: 2,
                after_ms: 30_000,
            }
        ));
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_failure_aborts() {
        let (mut sensor, handle) = MockSensor::new();
        handle.script([
            CaptureStep::Finger(8),
            CaptureStep::NoFinger,
            CaptureStep::Finger(8),
            CaptureStep::NoFinger,
            CaptureStep::Fail(SensorError::ImageFail),
        ]);

        let mut publisher = Publisher::new(RecordingSink::new());
        let err = run(&mut sensor, &mut publisher, timing(), slot(2))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EnrollError::Capture {
                pass: 3,
                source: SensorError::ImageFail
            }
        ));
        assert_eq!(handle.calls(Operation::StoreModel), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inconsistent_samples_report_mismatch() {
        let (mut sensor, handle) = MockSensor::new();
        handle.script([
            CaptureStep::Finger(1),
            CaptureStep::NoFinger,
            CaptureStep::Finger(1),
            CaptureStep::NoFinger,
            CaptureStep::Finger(2),
            CaptureStep::NoFinger,
            CaptureStep::Finger(1),
            CaptureStep::NoFinger,
            CaptureStep::Finger(1),
        ]);

        let mut publisher = Publisher::new(RecordingSink::new());
        let err = run(&mut sensor, &mut publisher, timing(), slot(2))
            .await
            .unwrap_err();

        assert!(matches!(err, EnrollError::Mismatch));
        assert_eq!(handle.template_at(slot(2)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_reports_slot() {
        let (mut sensor, handle) = MockSensor::new();
        handle.script_enrollment(5);
        handle.fail_next(Operation::StoreModel, SensorError::FlashError);

        let mut publisher = Publisher::new(RecordingSink::new());
        let err = run(&mut sensor, &mut publisher, timing(), slot(6))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EnrollError::Store { slot: s, source: SensorError::FlashError } if s == slot(6)
        ));
    }
}

//! Capture & match loop.
//!
//! One [`Scanner::poll`] call runs at most one capture → convert → search
//! cycle. Consecutive polls are rate limited, and every presentation yields
//! exactly one identification or doorbell event followed by exactly one
//! cleared event once the finger is gone.

use std::time::Duration;

use fingerbell_core::MatchResult;
use fingerbell_hardware::{IndicatorPattern, SensorError, SensorLink};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::config::{CooldownMode, EngineConfig};
use crate::indicator::indicate;
use crate::observation::{ObservationSink, Publisher};
use crate::registry::TemplateRegistry;

/// Character buffer used for identification.
const SEARCH_BUFFER: u8 = 1;

#[derive(Debug, Clone)]
pub struct Scanner {
    poll_interval: Duration,
    match_cooldown: Duration,
    ring_cooldown: Duration,
    cooldown_mode: CooldownMode,
    last_poll: Option<Instant>,
    resume_at: Option<Instant>,
    /// Ring edge latch: the last completed cycle produced an event.
    latched: bool,
}

impl Scanner {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            match_cooldown: config.match_cooldown(),
            ring_cooldown: config.ring_cooldown(),
            cooldown_mode: config.cooldown_mode,
            last_poll: None,
            resume_at: None,
            latched: false,
        }
    }

    /// True while an event is latched and no cleared event was sent yet.
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// True if a poll made now would reach the sensor.
    pub fn is_due(&self) -> bool {
        let now = Instant::now();
        let interval_elapsed = self
            .last_poll
            .is_none_or(|last| now.duration_since(last) >= self.poll_interval);
        let cooled_down = self.resume_at.is_none_or(|resume| now >= resume);
        interval_elapsed && cooled_down
    }

    /// Run one scan cycle if one is due.
    ///
    /// Returns the event produced, if any: an identification, a doorbell
    /// ring, or the cleared event following either.
    pub async fn poll<L, S>(
        &mut self,
        link: &mut L,
        registry: &TemplateRegistry,
        publisher: &mut Publisher<S>,
    ) -> Option<MatchResult>
    where
        L: SensorLink,
        S: ObservationSink,
    {
        if !self.is_due() {
            return None;
        }
        self.last_poll = Some(Instant::now());
        self.resume_at = None;

        match link.capture_image().await {
            Ok(()) => {}
            Err(SensorError::NoFinger) => return self.release(link, publisher).await,
            Err(e) if e.is_transient() => {
                debug!(error = %e, "Capture failed, retrying next poll");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Sensor fault during capture");
                return None;
            }
        }

        indicate(link, IndicatorPattern::Capturing).await;

        if let Err(e) = link.image_to_template(SEARCH_BUFFER).await {
            if e.is_unusable_image() {
                warn!(error = %e, "Unusable fingerprint image");
            } else {
                warn!(error = %e, "Feature extraction failed");
            }
            return None;
        }

        match link.search().await {
            Ok(hit) => {
                let name = registry.lookup(hit.slot);
                info!(slot = %hit.slot, confidence = hit.confidence, name, "Match found");

                let result = MatchResult::identified(hit.slot, name, hit.confidence);
                publisher.match_result(&result);
                indicate(link, IndicatorPattern::Identified).await;
                publisher.status(format!("Match: {}", name));
                self.latched = true;

                self.cool_down(self.match_cooldown).await;
                Some(result)
            }
            Err(SensorError::NotFound) => {
                info!("No match found, ringing doorbell");

                let result = MatchResult::doorbell();
                publisher.match_result(&result);
                publisher.status("Doorbell ring!");
                self.latched = true;

                self.cool_down(self.ring_cooldown).await;
                Some(result)
            }
            Err(e) => {
                warn!(error = %e, "Template search failed");
                None
            }
        }
    }

    /// Emit the cleared event if one is owed.
    ///
    /// Called on an empty sensor window, and by the controller before an
    /// enrollment takes over the sensor.
    pub async fn release<L, S>(
        &mut self,
        link: &mut L,
        publisher: &mut Publisher<S>,
    ) -> Option<MatchResult>
    where
        L: SensorLink,
        S: ObservationSink,
    {
        if !self.latched {
            return None;
        }
        self.latched = false;

        let result = MatchResult::cleared();
        publisher.match_result(&result);
        indicate(link, IndicatorPattern::Idle).await;
        debug!("Finger removed, event cleared");
        Some(result)
    }

    async fn cool_down(&mut self, cooldown: Duration) {
        match self.cooldown_mode {
            CooldownMode::Blocking => sleep(cooldown).await,
            CooldownMode::Deferred => self.resume_at = Some(Instant::now() + cooldown),
        }
    }
}

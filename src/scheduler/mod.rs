// ABOUTME: Cancellable session timers feeding the controller event loop
// ABOUTME: At most one nudge-reset timer is live; teardown aborts everything

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, sleep, Instant, MissedTickBehavior};

/// A timer firing, delivered to the controller's event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Host cadence: time to broadcast a playback snapshot.
    BroadcastTick,
    /// Follower cadence: check staleness and deferred readiness work.
    ResyncTick,
    /// Time to send a clock probe.
    ClockProbe,
    /// A soft nudge's duration elapsed; the rate must revert to 1.0.
    NudgeExpired,
    /// A correction cooldown elapsed; re-evaluate the newest snapshot.
    CooldownElapsed,
    /// Retry a refused play() once.
    PlayRetry,
}

/// Owner of every timer a sync session runs.
///
/// Each timer is a spawned task sending [`SchedulerEvent`]s into one channel;
/// arming a one-shot aborts its predecessor, so a superseded nudge can never
/// race a stale reset against the new one. Dropping the scheduler aborts
/// everything; no timer outlives the session that created it.
#[derive(Debug)]
pub struct SyncScheduler {
    events: mpsc::UnboundedSender<SchedulerEvent>,
    host_cadence: Option<JoinHandle<()>>,
    resync_checks: Option<JoinHandle<()>>,
    clock_probes: Option<JoinHandle<()>>,
    nudge_reset: Option<JoinHandle<()>>,
    cooldown_retry: Option<JoinHandle<()>>,
    play_retry: Option<JoinHandle<()>>,
}

impl SyncScheduler {
    /// Create a scheduler sending events into `events`.
    pub fn new(events: mpsc::UnboundedSender<SchedulerEvent>) -> Self {
        Self {
            events,
            host_cadence: None,
            resync_checks: None,
            clock_probes: None,
            nudge_reset: None,
            cooldown_retry: None,
            play_retry: None,
        }
    }

    /// Create a scheduler together with the receiving half of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SchedulerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Start the host broadcast cadence; the first tick fires immediately so
    /// a fresh host announces its timeline without waiting a period.
    pub fn start_host_cadence(&mut self, period: Duration) {
        abort(&mut self.host_cadence);
        let events = self.events.clone();
        self.host_cadence = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.send(SchedulerEvent::BroadcastTick).is_err() {
                    break;
                }
            }
        }));
    }

    /// Stop the host broadcast cadence.
    pub fn stop_host_cadence(&mut self) {
        abort(&mut self.host_cadence);
    }

    /// Start the follower staleness/readiness cadence.
    pub fn start_resync_checks(&mut self, period: Duration) {
        abort(&mut self.resync_checks);
        let events = self.events.clone();
        self.resync_checks = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.send(SchedulerEvent::ResyncTick).is_err() {
                    break;
                }
            }
        }));
    }

    /// Stop the follower cadence.
    pub fn stop_resync_checks(&mut self) {
        abort(&mut self.resync_checks);
    }

    /// Start clock probes: a seeding burst, then the steady period.
    pub fn start_clock_probes(&mut self, burst: usize, spacing: Duration, period: Duration) {
        abort(&mut self.clock_probes);
        let events = self.events.clone();
        self.clock_probes = Some(tokio::spawn(async move {
            for _ in 0..burst {
                if events.send(SchedulerEvent::ClockProbe).is_err() {
                    return;
                }
                sleep(spacing).await;
            }
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.send(SchedulerEvent::ClockProbe).is_err() {
                    break;
                }
            }
        }));
    }

    /// Whether the probe loop is running.
    pub fn probes_running(&self) -> bool {
        self.clock_probes
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Arm the nudge expiry timer, replacing any previous one.
    pub fn arm_nudge_reset(&mut self, after: Duration) {
        Self::arm(&self.events, &mut self.nudge_reset, after, SchedulerEvent::NudgeExpired);
    }

    /// Cancel the nudge expiry timer.
    pub fn cancel_nudge_reset(&mut self) {
        abort(&mut self.nudge_reset);
    }

    /// Arm a cooldown re-evaluation, replacing any previous one.
    pub fn arm_cooldown_retry(&mut self, after: Duration) {
        Self::arm(&self.events, &mut self.cooldown_retry, after, SchedulerEvent::CooldownElapsed);
    }

    /// Arm a single play() retry, replacing any previous one.
    pub fn arm_play_retry(&mut self, after: Duration) {
        Self::arm(&self.events, &mut self.play_retry, after, SchedulerEvent::PlayRetry);
    }

    /// Cancel everything tied to the current role. The probe loop survives;
    /// both roles need the offset estimate.
    pub fn cancel_role_timers(&mut self) {
        abort(&mut self.host_cadence);
        abort(&mut self.resync_checks);
        abort(&mut self.nudge_reset);
        abort(&mut self.cooldown_retry);
        abort(&mut self.play_retry);
    }

    /// Cancel every outstanding timer.
    pub fn cancel_all(&mut self) {
        self.cancel_role_timers();
        abort(&mut self.clock_probes);
    }

    fn arm(
        events: &mpsc::UnboundedSender<SchedulerEvent>,
        slot: &mut Option<JoinHandle<()>>,
        after: Duration,
        event: SchedulerEvent,
    ) {
        abort(slot);
        let events = events.clone();
        *slot = Some(tokio::spawn(async move {
            sleep(after).await;
            let _ = events.send(event);
        }));
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn abort(slot: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = slot.take() {
        handle.abort();
    }
}

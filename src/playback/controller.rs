// ABOUTME: Session state machine driving a playback device from sync messages
// ABOUTME: Hosts broadcast snapshots; followers project, decide, and correct

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use typed_builder::TypedBuilder;

use crate::playback::corrector::{CorrectionDecision, DriftCorrector};
use crate::playback::device::PlaybackDevice;
use crate::playback::projector::project;
use crate::playback::types::PlaybackSnapshot;
use crate::protocol::messages::{
    LeaveRoom, Message, PingSync, RequestSync, SyncPlayback, SyncSeek,
};
use crate::scheduler::{SchedulerEvent, SyncScheduler};
use crate::sync::clock::{unix_time_ms, ClockOffsetEstimator};

/// Which side of the timeline a session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Drives the authoritative timeline and broadcasts snapshots.
    Host,
    /// Tracks the host's timeline and corrects local drift.
    Follower,
}

/// Tunables for one sync session.
#[derive(Debug, Clone, TypedBuilder)]
pub struct SyncConfig {
    /// How often a host broadcasts its playback snapshot.
    #[builder(default = Duration::from_millis(250))]
    pub broadcast_interval: Duration,
    /// How often a follower checks staleness and deferred readiness work.
    #[builder(default = Duration::from_secs(1))]
    pub resync_check_interval: Duration,
    /// Follower requests a fresh snapshot after this long without one.
    #[builder(default = Duration::from_millis(2_500))]
    pub resync_staleness: Duration,
    /// Steady clock probe period.
    #[builder(default = Duration::from_secs(5))]
    pub probe_interval: Duration,
    /// Number of back-to-back probes that seed the offset at session start.
    #[builder(default = 5)]
    pub probe_burst: usize,
    /// Spacing between the seeding probes.
    #[builder(default = Duration::from_millis(200))]
    pub probe_burst_spacing: Duration,
    /// Delay before the single retry of a refused play().
    #[builder(default = Duration::from_millis(300))]
    pub play_retry_delay: Duration,
    /// Warn once when the device stays unready this long with state deferred.
    #[builder(default = Duration::from_secs(5))]
    pub readiness_warn_after: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Per-room session state. Created on entering a room, destroyed on leaving;
/// survives an in-place role flip.
#[derive(Debug)]
struct SyncSession {
    role: Role,
    last_snapshot: Option<PlaybackSnapshot>,
    last_applied_at_ms: Option<f64>,
    last_correction_at_ms: Option<f64>,
    last_resync_request_ms: Option<f64>,
    nudge_active: bool,
    /// Snapshot waiting for device readiness, with its force flag.
    pending_state: Option<(PlaybackSnapshot, bool)>,
    pending_since_ms: Option<f64>,
    readiness_warned: bool,
    play_retry_pending: bool,
}

impl SyncSession {
    fn new(role: Role) -> Self {
        Self {
            role,
            last_snapshot: None,
            last_applied_at_ms: None,
            last_correction_at_ms: None,
            last_resync_request_ms: None,
            nudge_active: false,
            pending_state: None,
            pending_since_ms: None,
            readiness_warned: false,
            play_retry_pending: false,
        }
    }

    /// Flip the role in place, dropping role-specific transient state.
    fn with_role(self, role: Role) -> Self {
        Self::new(role)
    }
}

/// Orchestrates clock probing, snapshot flow, and drift correction against a
/// [`PlaybackDevice`] and the relay channel.
///
/// States: idle (no room) → joining → host or follower → idle again on
/// leave/disconnect. Host and follower swap in place on a `new_host` notice
/// without tearing the session down. All mutation happens on the caller's
/// event loop, either [`run`](Self::run) or direct calls to
/// [`handle_message`](Self::handle_message) and
/// [`handle_scheduler_event`](Self::handle_scheduler_event).
pub struct PlaybackSyncController {
    config: SyncConfig,
    corrector: DriftCorrector,
    estimator: Arc<Mutex<ClockOffsetEstimator>>,
    outbound: mpsc::UnboundedSender<Message>,
    scheduler: SyncScheduler,
    events_rx: Option<mpsc::UnboundedReceiver<SchedulerEvent>>,
    device: Option<Box<dyn PlaybackDevice>>,
    session: Option<SyncSession>,
    joining: bool,
    room_id: Option<String>,
    last_fault: Option<String>,
}

impl PlaybackSyncController {
    /// Create a controller emitting messages on `outbound`.
    pub fn new(outbound: mpsc::UnboundedSender<Message>, config: SyncConfig) -> Self {
        let (scheduler, events_rx) = SyncScheduler::channel();
        Self {
            config,
            corrector: DriftCorrector::new(),
            estimator: Arc::new(Mutex::new(ClockOffsetEstimator::new())),
            outbound,
            scheduler,
            events_rx: Some(events_rx),
            device: None,
            session: None,
            joining: false,
            room_id: None,
            last_fault: None,
        }
    }

    /// Replace the drift correction policy.
    pub fn with_corrector(mut self, corrector: DriftCorrector) -> Self {
        self.corrector = corrector;
        self
    }

    /// Attach the playback device the session drives.
    pub fn attach(&mut self, device: Box<dyn PlaybackDevice>) {
        self.device = Some(device);
    }

    /// Note that a join/create request is in flight.
    pub fn begin_join(&mut self) {
        if self.session.is_none() {
            self.joining = true;
        }
    }

    /// Whether a join/create request is in flight.
    pub fn is_joining(&self) -> bool {
        self.joining
    }

    /// Current role, if a session is active.
    pub fn role(&self) -> Option<Role> {
        self.session.as_ref().map(|s| s.role)
    }

    /// Handle to the shared clock offset estimator.
    pub fn clock(&self) -> Arc<Mutex<ClockOffsetEstimator>> {
        Arc::clone(&self.estimator)
    }

    /// Drain the most recent user-visible fault, if any.
    pub fn take_fault(&mut self) -> Option<String> {
        self.last_fault.take()
    }

    /// Enter the host role (cancels follower timers, starts the broadcast
    /// cadence; the first broadcast fires immediately).
    pub fn start_as_host(&mut self) {
        self.joining = false;
        self.enter_role(Role::Host, None);
    }

    /// Enter the follower role, applying `initial` with the correction
    /// cooldown bypassed once the device is ready to accept a position.
    pub fn start_as_follower(&mut self, initial: Option<PlaybackSnapshot>) {
        self.joining = false;
        self.enter_role(Role::Follower, initial);
    }

    /// Flip an active session to host (host migration).
    pub fn become_host(&mut self) {
        if self.session.is_some() {
            self.enter_role(Role::Host, None);
        }
    }

    /// Flip an active session to follower (host migration).
    pub fn become_follower(&mut self) {
        if self.session.is_some() {
            self.enter_role(Role::Follower, None);
        }
    }

    /// Report that the local user seeked the device.
    ///
    /// A host broadcasts the seek; a follower's intent is ignored, since only
    /// the host may move the authoritative timeline. The next snapshot pulls
    /// a strayed follower back.
    pub fn notify_local_seek(&mut self) {
        match self.role() {
            Some(Role::Host) => {
                let Some(device) = self.device.as_ref() else {
                    return;
                };
                let timestamp = self.estimator.lock().reference_now_ms();
                let _ = self.outbound.send(Message::SyncSeek(SyncSeek {
                    room_id: self.room_id.clone(),
                    position: device.position(),
                    timestamp,
                }));
            }
            Some(Role::Follower) => {
                log::warn!("ignoring local seek intent; only the host may move the timeline");
            }
            None => {}
        }
    }

    /// Leave the room: notify the relay and tear the session down.
    pub fn leave(&mut self) {
        if let Some(room_id) = self.room_id.clone() {
            let _ = self.outbound.send(Message::LeaveRoom(LeaveRoom { room_id }));
        }
        self.teardown();
    }

    /// Cancel every timer and destroy session state. The device stays
    /// attached; its rate is restored if a nudge was in flight.
    pub fn teardown(&mut self) {
        self.scheduler.cancel_all();
        if let (Some(device), Some(session)) = (self.device.as_mut(), self.session.as_ref()) {
            if session.nudge_active {
                device.set_rate(1.0);
            }
        }
        self.session = None;
        self.joining = false;
        self.room_id = None;
    }

    /// Drive the controller until the inbound channel closes, then tear down.
    ///
    /// Queued snapshots are collapsed to the newest before processing; a
    /// stale snapshot behind a fresh one is never applied.
    pub async fn run(&mut self, inbound: &mut mpsc::UnboundedReceiver<Message>) {
        let mut events = match self.events_rx.take() {
            Some(events) => events,
            None => {
                log::error!("controller loop already running");
                return;
            }
        };
        loop {
            tokio::select! {
                maybe_message = inbound.recv() => match maybe_message {
                    Some(first) => {
                        for message in collapse_batch(first, inbound) {
                            self.handle_message(message);
                        }
                    }
                    None => break,
                },
                maybe_event = events.recv() => match maybe_event {
                    Some(event) => self.handle_scheduler_event(event),
                    None => break,
                },
            }
        }
        self.teardown();
        self.events_rx = Some(events);
    }

    /// Process one inbound relay message.
    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::RoomCreated(assignment) => {
                self.joining = false;
                self.room_id = Some(assignment.room_id);
                if assignment.is_host {
                    self.start_as_host();
                } else {
                    self.start_as_follower(None);
                }
            }
            Message::RoomJoined(joined) => {
                self.joining = false;
                self.room_id = Some(joined.room_id.clone());
                if joined.is_host {
                    self.start_as_host();
                } else {
                    let reference_timestamp_ms = joined
                        .timestamp
                        .unwrap_or_else(|| self.estimator.lock().reference_now_ms());
                    let initial = PlaybackSnapshot {
                        position: joined.position,
                        is_playing: joined.is_playing,
                        reference_timestamp_ms,
                        duration: None,
                    };
                    self.start_as_follower(Some(initial));
                }
            }
            Message::JoinError(refusal) => {
                self.joining = false;
                log::warn!("join refused: {}", refusal.message);
                self.last_fault = Some(refusal.message);
            }
            Message::NewHost(notice) => {
                if notice.is_host {
                    self.become_host();
                } else {
                    self.become_follower();
                }
            }
            Message::SyncPlayback(sync) => {
                if self.role() == Some(Role::Follower) {
                    self.apply_snapshot(sync.snapshot(), false);
                }
            }
            Message::SyncSeek(seek) => {
                if self.role() == Some(Role::Follower) {
                    self.apply_seek(seek);
                }
            }
            Message::MediaChanged(change) => {
                if self.role() == Some(Role::Follower) {
                    let snapshot = PlaybackSnapshot {
                        position: change.position,
                        is_playing: change.is_playing,
                        reference_timestamp_ms: self.estimator.lock().reference_now_ms(),
                        duration: None,
                    };
                    self.apply_snapshot(snapshot, true);
                }
            }
            Message::RequestSync(_) => {
                if self.role() == Some(Role::Host) {
                    self.broadcast_snapshot();
                }
            }
            Message::PongSync(pong) => {
                self.estimator
                    .lock()
                    .complete_probe(pong.server_time, unix_time_ms());
            }
            Message::PingSync(_) => {}
            Message::ClientsUpdated(roster) => {
                log::debug!("room now has {} clients", roster.clients);
            }
            other => log::debug!("ignoring message: {:?}", other),
        }
    }

    /// Process one timer firing.
    pub fn handle_scheduler_event(&mut self, event: SchedulerEvent) {
        match event {
            SchedulerEvent::BroadcastTick => self.broadcast_snapshot(),
            SchedulerEvent::ResyncTick => self.follower_tick(),
            SchedulerEvent::ClockProbe => self.send_probe(),
            SchedulerEvent::NudgeExpired => {
                if let (Some(device), Some(session)) =
                    (self.device.as_mut(), self.session.as_mut())
                {
                    if session.nudge_active {
                        device.set_rate(1.0);
                        session.nudge_active = false;
                    }
                }
            }
            SchedulerEvent::CooldownElapsed => {
                if self.role() == Some(Role::Follower) {
                    if let Some(snapshot) = self.session.as_ref().and_then(|s| s.last_snapshot) {
                        self.apply_snapshot(snapshot, false);
                    }
                }
            }
            SchedulerEvent::PlayRetry => self.retry_play(),
        }
    }

    fn enter_role(&mut self, role: Role, initial: Option<PlaybackSnapshot>) {
        self.scheduler.cancel_role_timers();
        if let (Some(device), Some(session)) = (self.device.as_mut(), self.session.as_ref()) {
            if session.nudge_active {
                device.set_rate(1.0);
            }
        }
        self.session = Some(match self.session.take() {
            Some(session) => session.with_role(role),
            None => SyncSession::new(role),
        });
        if !self.scheduler.probes_running() {
            self.scheduler.start_clock_probes(
                self.config.probe_burst,
                self.config.probe_burst_spacing,
                self.config.probe_interval,
            );
        }
        match role {
            Role::Host => {
                log::info!("entering host role");
                self.scheduler
                    .start_host_cadence(self.config.broadcast_interval);
            }
            Role::Follower => {
                log::info!("entering follower role");
                self.scheduler
                    .start_resync_checks(self.config.resync_check_interval);
            }
        }
        if let Some(snapshot) = initial {
            self.apply_snapshot(snapshot, true);
        }
    }

    /// Validate, project, and correct against one host snapshot.
    ///
    /// With `force` set the correction cooldown is bypassed; used for the
    /// initial state after a join and for explicit host seeks.
    fn apply_snapshot(&mut self, snapshot: PlaybackSnapshot, force: bool) {
        let now_local_ms = unix_time_ms();
        let now_ref_ms = self.estimator.lock().to_reference_ms(now_local_ms);
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !snapshot.is_valid(now_ref_ms) {
            log::warn!("ignoring invalid snapshot: {:?}", snapshot);
            return;
        }
        session.last_snapshot = Some(snapshot);
        session.last_applied_at_ms = Some(now_local_ms);

        let Some(device) = self.device.as_mut() else {
            return;
        };
        if !device.is_ready() {
            session.pending_state = Some((snapshot, force));
            if session.pending_since_ms.is_none() {
                session.pending_since_ms = Some(now_local_ms);
            }
            return;
        }
        session.pending_state = None;
        session.pending_since_ms = None;
        session.readiness_warned = false;

        let duration = device.duration().or(snapshot.duration);
        let target = project(&snapshot, now_ref_ms, duration);

        align_transport(
            &mut **device,
            session,
            &mut self.scheduler,
            &self.config,
            &mut self.last_fault,
            snapshot.is_playing,
        );

        let last_correction = if force {
            None
        } else {
            session.last_correction_at_ms
        };
        let decision = self.corrector.decide(
            device.position(),
            &target,
            snapshot.is_playing,
            device.is_seeking(),
            last_correction,
            now_local_ms,
        );

        match decision {
            CorrectionDecision::NoOp => {
                // When the cooldown did the suppressing, re-evaluate the
                // newest snapshot once it elapses.
                if let Some(last) = last_correction {
                    let cooldown_ms = self.corrector.cooldown().as_secs_f64() * 1000.0;
                    let elapsed = now_local_ms - last;
                    if elapsed < cooldown_ms {
                        self.scheduler.arm_cooldown_retry(Duration::from_millis(
                            (cooldown_ms - elapsed).ceil() as u64,
                        ));
                    }
                }
            }
            CorrectionDecision::SoftNudge { rate, duration } => {
                device.set_rate(rate);
                session.nudge_active = true;
                session.last_correction_at_ms = Some(now_local_ms);
                self.scheduler.arm_nudge_reset(duration);
            }
            CorrectionDecision::HardSeek { position } => {
                self.scheduler.cancel_nudge_reset();
                if session.nudge_active {
                    device.set_rate(1.0);
                    session.nudge_active = false;
                }
                device.set_position(position);
                session.last_correction_at_ms = Some(now_local_ms);
            }
        }
    }

    /// An explicit host seek is an intentional discontinuity; apply it with
    /// the cooldown bypassed.
    fn apply_seek(&mut self, seek: SyncSeek) {
        let is_playing = self
            .session
            .as_ref()
            .and_then(|s| s.last_snapshot.map(|snapshot| snapshot.is_playing))
            .or_else(|| self.device.as_ref().map(|d| !d.is_paused()))
            .unwrap_or(false);
        let snapshot = PlaybackSnapshot {
            position: seek.position,
            is_playing,
            reference_timestamp_ms: seek.timestamp,
            duration: None,
        };
        self.apply_snapshot(snapshot, true);
    }

    fn broadcast_snapshot(&mut self) {
        if self.role() != Some(Role::Host) {
            return;
        }
        let Some(device) = self.device.as_mut() else {
            return;
        };
        if let Some(fault) = device.take_fault() {
            log::warn!("playback device fault: {}", fault);
            self.last_fault = Some(fault);
        }
        if !device.is_ready() {
            return;
        }
        let timestamp = self.estimator.lock().reference_now_ms();
        let message = Message::SyncPlayback(SyncPlayback {
            room_id: self.room_id.clone(),
            position: device.position(),
            is_playing: !device.is_paused(),
            timestamp,
            duration: device.duration(),
        });
        // Fire and forget; a dead transport surfaces on the channel, not here.
        let _ = self.outbound.send(message);
    }

    fn follower_tick(&mut self) {
        if self.role() != Some(Role::Follower) {
            return;
        }
        let now_local_ms = unix_time_ms();

        let mut deferred = None;
        if let (Some(device), Some(session)) = (self.device.as_mut(), self.session.as_mut()) {
            if let Some(fault) = device.take_fault() {
                log::warn!("playback device fault: {}", fault);
                self.last_fault = Some(fault);
            }
            if session.pending_state.is_some() {
                if device.is_ready() {
                    deferred = session.pending_state.take();
                } else if !session.readiness_warned {
                    let waited = session
                        .pending_since_ms
                        .map(|since| now_local_ms - since)
                        .unwrap_or(0.0);
                    if waited > self.config.readiness_warn_after.as_secs_f64() * 1000.0 {
                        log::warn!(
                            "playback device not ready after {:.1}s; holding deferred state",
                            waited / 1000.0
                        );
                        session.readiness_warned = true;
                    }
                }
            }
        }
        if let Some((snapshot, force)) = deferred {
            self.apply_snapshot(snapshot, force);
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let staleness_ms = self.config.resync_staleness.as_secs_f64() * 1000.0;
        let stale = session
            .last_applied_at_ms
            .map(|t| now_local_ms - t > staleness_ms)
            .unwrap_or(true);
        let throttled = session
            .last_resync_request_ms
            .map(|t| now_local_ms - t < staleness_ms)
            .unwrap_or(false);
        if stale && !throttled {
            session.last_resync_request_ms = Some(now_local_ms);
            log::debug!("no recent snapshot; requesting resync");
            let _ = self.outbound.send(Message::RequestSync(RequestSync {}));
        }
    }

    fn send_probe(&mut self) {
        self.estimator.lock().mark_probe_sent(unix_time_ms());
        if self.outbound.send(Message::PingSync(PingSync {})).is_err() {
            self.estimator.lock().abandon_probe();
        }
    }

    fn retry_play(&mut self) {
        let (Some(device), Some(session)) = (self.device.as_mut(), self.session.as_mut()) else {
            return;
        };
        if !session.play_retry_pending {
            return;
        }
        session.play_retry_pending = false;
        if let Err(e) = device.play() {
            log::error!("playback start refused after retry: {}", e);
            self.last_fault = Some(e.to_string());
        }
    }
}

/// Bring the device's transport state in line with the host's.
///
/// Runs outside the correction cooldown: matching play/pause is not a drift
/// correction. A refused play() is retried exactly once; the second refusal
/// is surfaced through the controller's fault slot.
fn align_transport(
    device: &mut dyn PlaybackDevice,
    session: &mut SyncSession,
    scheduler: &mut SyncScheduler,
    config: &SyncConfig,
    last_fault: &mut Option<String>,
    want_playing: bool,
) {
    if want_playing && device.is_paused() {
        match device.play() {
            Ok(()) => session.play_retry_pending = false,
            Err(e) => {
                if session.play_retry_pending {
                    log::error!("playback start refused again: {}", e);
                    *last_fault = Some(e.to_string());
                    session.play_retry_pending = false;
                } else {
                    log::warn!("playback start refused, retrying once: {}", e);
                    session.play_retry_pending = true;
                    scheduler.arm_play_retry(config.play_retry_delay);
                }
            }
        }
    } else if !want_playing && !device.is_paused() {
        device.pause();
        if session.nudge_active {
            scheduler.cancel_nudge_reset();
            device.set_rate(1.0);
            session.nudge_active = false;
        }
    }
}

/// Drain everything already queued behind `first` and collapse stale
/// snapshots: only the newest `sync_playback` in the batch survives.
fn collapse_batch(
    first: Message,
    inbound: &mut mpsc::UnboundedReceiver<Message>,
) -> Vec<Message> {
    let mut batch = vec![first];
    while let Ok(message) = inbound.try_recv() {
        batch.push(message);
    }
    collapse_snapshots(batch)
}

fn collapse_snapshots(mut batch: Vec<Message>) -> Vec<Message> {
    let Some(latest) = batch
        .iter()
        .rposition(|m| matches!(m, Message::SyncPlayback(_)))
    else {
        return batch;
    };
    let mut index = 0;
    batch.retain(|message| {
        let keep = !matches!(message, Message::SyncPlayback(_)) || index == latest;
        index += 1;
        keep
    });
    batch
}

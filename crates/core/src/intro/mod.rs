use serde::{Deserialize, Deserializer, Serialize};

use crate::assets::SoundName;
use crate::audio::{AudioSession, PlayOptions, PlaybackHandle};
use crate::config::IntroConfig;
use crate::storage::{KeyValueStore, INTRO_SEEN_KEY};
use crate::timeline::{Millis, Scheduler, SharedClock};

/// Ordinal stage of the intro. Only ever moves forward.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum IntroPhase {
    #[default]
    NotStarted,
    Flicker,
    Reel,
    Name,
    Tagline,
    FadeOut,
}

impl IntroPhase {
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// What a timetable entry does when its offset is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntroStep {
    Phase(IntroPhase),
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroCue {
    /// Offset from the sequencer's start, not from the previous cue.
    pub offset_ms: Millis,
    pub step: IntroStep,
}

impl IntroCue {
    pub fn new(offset_ms: Millis, step: IntroStep) -> Self {
        Self { offset_ms, step }
    }
}

/// Cues kept in offset order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IntroTimetable {
    cues: Vec<IntroCue>,
}

impl IntroTimetable {
    pub fn new(mut cues: Vec<IntroCue>) -> Self {
        cues.sort_by_key(|cue| cue.offset_ms);
        Self { cues }
    }

    pub fn cues(&self) -> &[IntroCue] {
        &self.cues
    }

    /// Offset of the first `Complete` cue, if the timetable has one.
    pub fn completes_at(&self) -> Option<Millis> {
        self.cues
            .iter()
            .find(|cue| cue.step == IntroStep::Complete)
            .map(|cue| cue.offset_ms)
    }
}

impl<'de> Deserialize<'de> for IntroTimetable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<IntroCue>::deserialize(deserializer).map(Self::new)
    }
}

impl Default for IntroTimetable {
    fn default() -> Self {
        use IntroPhase::*;
        Self::new(vec![
            IntroCue::new(500, IntroStep::Phase(Flicker)),
            IntroCue::new(1_500, IntroStep::Phase(Reel)),
            IntroCue::new(2_500, IntroStep::Phase(Name)),
            IntroCue::new(4_000, IntroStep::Phase(Tagline)),
            IntroCue::new(5_500, IntroStep::Phase(FadeOut)),
            IntroCue::new(6_500, IntroStep::Complete),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroEvent {
    PhaseChanged(IntroPhase),
    Completed,
}

/// Time-driven intro state machine.
#[derive(Debug)]
pub struct IntroSequencer {
    clock: SharedClock,
    timers: Scheduler<IntroStep>,
    started_at: Millis,
    phase: IntroPhase,
    completed: bool,
    awaiting_interaction: bool,
    sounds: Vec<PlaybackHandle>,
}

impl IntroSequencer {
    /// Starts the sequence now, scheduling every cue up front.
    pub fn start(timetable: &IntroTimetable, clock: SharedClock) -> Self {
        let started_at = clock.now_ms();
        let mut timers = Scheduler::new();
        for cue in timetable.cues() {
            timers.schedule_at(started_at.saturating_add(cue.offset_ms), cue.step);
        }
        tracing::debug!(started_at, cues = timers.len(), "intro started");

        Self {
            clock,
            timers,
            started_at,
            phase: IntroPhase::NotStarted,
            completed: false,
            awaiting_interaction: true,
            sounds: Vec::new(),
        }
    }

    pub fn phase(&self) -> IntroPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn elapsed(&self) -> Millis {
        self.clock.now_ms().saturating_sub(self.started_at)
    }

    pub fn shows_projector_beam(&self) -> bool {
        self.phase >= IntroPhase::Flicker && self.phase < IntroPhase::FadeOut
    }

    pub fn shows_name(&self) -> bool {
        self.phase >= IntroPhase::Name
    }

    pub fn shows_tagline(&self) -> bool {
        self.phase >= IntroPhase::Tagline
    }

    pub fn is_fading(&self) -> bool {
        self.phase == IntroPhase::FadeOut
    }

    /// Applies every cue that has come due. Cues that fire after completion
    /// are swallowed.
    pub fn tick(&mut self, audio: &mut AudioSession) -> Vec<IntroEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();

        while let Some(step) = self.timers.pop_due(now) {
            if self.completed {
                continue;
            }
            match step {
                IntroStep::Phase(phase) if phase > self.phase => {
                    self.phase = phase;
                    self.play_phase_sound(phase, audio);
                    events.push(IntroEvent::PhaseChanged(phase));
                }
                IntroStep::Phase(_) => {}
                IntroStep::Complete => {
                    self.finish();
                    events.push(IntroEvent::Completed);
                }
            }
        }

        events
    }

    /// Jumps straight to completion. Returns `None` if the intro had
    /// already completed, so completion is only ever reported once.
    pub fn skip(&mut self) -> Option<IntroEvent> {
        if self.completed {
            return None;
        }
        tracing::info!(phase = self.phase.ordinal(), "intro skipped");
        self.finish();
        Some(IntroEvent::Completed)
    }

    /// First pointer interaction unlocks audio. Returns whether this call
    /// was the one that did it.
    pub fn on_pointer(&mut self, audio: &mut AudioSession) -> bool {
        if !self.awaiting_interaction {
            return false;
        }
        self.awaiting_interaction = false;
        audio.initialize();
        true
    }

    fn finish(&mut self) {
        self.completed = true;
        self.timers.clear();
        tracing::info!(elapsed = self.elapsed(), "intro complete");
    }

    fn play_phase_sound(&mut self, phase: IntroPhase, audio: &mut AudioSession) {
        let handle = match phase {
            IntroPhase::Flicker => audio.play(SoundName::ProjectorStart, PlayOptions::volume(0.3)),
            IntroPhase::Name => audio.play(SoundName::FilmFlicker, PlayOptions::volume(0.2)),
            _ => None,
        };
        self.sounds.extend(handle);
    }
}

/// Session-level decision about the intro overlay.
#[derive(Debug)]
pub struct IntroGate {
    clock: SharedClock,
    grace_ms: Millis,
    hide_timer: Scheduler<()>,
    visible: bool,
    complete: bool,
}

impl IntroGate {
    /// Opens the gate: the overlay is visible unless this session has
    /// already seen the intro.
    pub fn open(store: &dyn KeyValueStore, config: &IntroConfig, clock: SharedClock) -> Self {
        let seen = store.contains(INTRO_SEEN_KEY);
        Self {
            clock,
            grace_ms: config.grace_ms,
            hide_timer: Scheduler::new(),
            visible: !seen,
            complete: seen,
        }
    }

    /// Whether the intro overlay is mounted.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the page content may start its own entrance.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Records the intro as seen and starts the grace countdown.
    pub fn complete(&mut self, store: &mut dyn KeyValueStore) {
        if self.complete {
            return;
        }
        self.complete = true;
        if let Err(err) = store.set(INTRO_SEEN_KEY, "true") {
            tracing::warn!(%err, "failed to record intro as seen");
        }
        let now = self.clock.now_ms();
        self.hide_timer.schedule_after(now, self.grace_ms, ());
    }

    /// Returns `true` on the tick the overlay is unmounted.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now_ms();
        if self.hide_timer.drain_due(now).is_empty() || !self.visible {
            return false;
        }
        self.visible = false;
        true
    }
}

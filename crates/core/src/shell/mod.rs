use crate::audio::{AudioBackend, AudioSession, PlaybackHandle, UiCue};
use crate::catalog::ProjectCatalog;
use crate::config::AppConfig;
use crate::gestures::{EasterEggs, EggEvent, Key};
use crate::intro::{IntroEvent, IntroGate, IntroSequencer};
use crate::modal::{ModalEvent, ProjectViewer};
use crate::storage::KeyValueStore;
use crate::timeline::{Millis, Scheduler, SharedClock};
use crate::Result;

/// Delay between unmuting and the confirmation click.
const MUTE_CONFIRM_DELAY_MS: Millis = 50;

/// Most UI cue sounds held at once; the oldest is released first.
const MAX_CUE_SOUNDS: usize = 8;

/// Input forwarded from the page.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Key(Key),
    Click { on_logo: bool },
    /// Any pointer interaction that is not a click.
    Pointer,
    SelectProject(Option<u32>),
    CloseProject,
    ToggleMute,
    SkipIntro,
    Cue(UiCue),
}

/// Everything the page needs to re-render for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellEvent {
    Intro(IntroEvent),
    /// The intro overlay has finished fading and can be unmounted.
    IntroHidden,
    Egg(EggEvent),
    Modal(ModalEvent),
    MuteChanged(bool),
}

#[derive(Debug, Clone, Copy)]
enum ShellTimer {
    MuteConfirm,
}

/// Owns the audio session and every controller, routes page input to them
/// and advances them all from one clock.
#[derive(Debug)]
pub struct PortfolioShell {
    clock: SharedClock,
    audio: AudioSession,
    session_store: Box<dyn KeyValueStore>,
    catalog: ProjectCatalog,
    gate: IntroGate,
    intro: Option<IntroSequencer>,
    eggs: EasterEggs,
    viewer: ProjectViewer,
    timers: Scheduler<ShellTimer>,
    cue_sounds: Vec<PlaybackHandle>,
}

impl PortfolioShell {
    pub fn new(
        config: &AppConfig,
        catalog: ProjectCatalog,
        clock: SharedClock,
        backend: Box<dyn AudioBackend>,
        durable_store: Box<dyn KeyValueStore>,
        session_store: Box<dyn KeyValueStore>,
    ) -> Self {
        let audio = AudioSession::new(&config.audio, backend, durable_store);
        let gate = IntroGate::open(session_store.as_ref(), &config.intro, clock.clone());
        let intro = gate
            .is_visible()
            .then(|| IntroSequencer::start(&config.intro.timetable, clock.clone()));
        tracing::info!(
            intro = intro.is_some(),
            muted = audio.is_muted(),
            projects = catalog.len(),
            "portfolio shell assembled"
        );

        Self {
            eggs: EasterEggs::new(&config.gestures, clock.clone()),
            viewer: ProjectViewer::new(&config.modal, clock.clone()),
            clock,
            audio,
            session_store,
            catalog,
            gate,
            intro,
            timers: Scheduler::new(),
            cue_sounds: Vec::new(),
        }
    }

    pub fn audio(&self) -> &AudioSession {
        &self.audio
    }

    pub fn catalog(&self) -> &ProjectCatalog {
        &self.catalog
    }

    pub fn intro(&self) -> Option<&IntroSequencer> {
        self.intro.as_ref()
    }

    pub fn gate(&self) -> &IntroGate {
        &self.gate
    }

    pub fn eggs(&self) -> &EasterEggs {
        &self.eggs
    }

    pub fn viewer(&self) -> &ProjectViewer {
        &self.viewer
    }

    pub fn session_store(&self) -> &dyn KeyValueStore {
        self.session_store.as_ref()
    }

    pub fn now_ms(&self) -> Millis {
        self.clock.now_ms()
    }

    /// Applies due timers, then the event. Only an unknown project id is an
    /// error, and it is raised before any due timer is applied.
    pub fn handle(&mut self, event: UiEvent) -> Result<Vec<ShellEvent>> {
        let selected = match &event {
            UiEvent::SelectProject(Some(id)) => Some(self.catalog.require(*id)?.clone()),
            _ => None,
        };
        let mut events = self.tick();

        match event {
            UiEvent::Key(key) => {
                events.extend(self.eggs.handle_key(&key).into_iter().map(ShellEvent::Egg));
                events.extend(
                    self.viewer
                        .handle_key(&key, &mut self.audio)
                        .into_iter()
                        .map(ShellEvent::Modal),
                );
            }
            UiEvent::Click { on_logo } => {
                self.unlock_audio();
                events.extend(self.eggs.handle_click(on_logo).into_iter().map(ShellEvent::Egg));
            }
            UiEvent::Pointer => self.unlock_audio(),
            UiEvent::SelectProject(_) => {
                events.extend(
                    self.viewer
                        .select(selected, &mut self.audio)
                        .into_iter()
                        .map(ShellEvent::Modal),
                );
            }
            UiEvent::CloseProject => {
                events.extend(
                    self.viewer
                        .close(&mut self.audio)
                        .into_iter()
                        .map(ShellEvent::Modal),
                );
            }
            UiEvent::ToggleMute => {
                let was_muted = self.audio.is_muted();
                let muted = self.audio.toggle_mute();
                if was_muted {
                    let now = self.clock.now_ms();
                    self.timers
                        .schedule_after(now, MUTE_CONFIRM_DELAY_MS, ShellTimer::MuteConfirm);
                }
                events.push(ShellEvent::MuteChanged(muted));
            }
            UiEvent::SkipIntro => {
                if let Some(completed) = self.intro.as_mut().and_then(IntroSequencer::skip) {
                    self.gate.complete(self.session_store.as_mut());
                    events.push(ShellEvent::Intro(completed));
                }
            }
            UiEvent::Cue(cue) => self.play_cue(cue),
        }

        Ok(events)
    }

    /// Advances every controller to the clock's current reading.
    pub fn tick(&mut self) -> Vec<ShellEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();

        while let Some(timer) = self.timers.pop_due(now) {
            match timer {
                ShellTimer::MuteConfirm => self.play_cue(UiCue::MuteConfirm),
            }
        }

        if let Some(intro) = self.intro.as_mut() {
            for event in intro.tick(&mut self.audio) {
                if event == IntroEvent::Completed {
                    self.gate.complete(self.session_store.as_mut());
                }
                events.push(ShellEvent::Intro(event));
            }
        }
        if self.gate.tick() {
            self.intro = None;
            events.push(ShellEvent::IntroHidden);
        }

        events.extend(self.eggs.tick().into_iter().map(ShellEvent::Egg));
        events.extend(self.viewer.tick(&mut self.audio).into_iter().map(ShellEvent::Modal));
        events
    }

    fn unlock_audio(&mut self) {
        if let Some(intro) = self.intro.as_mut() {
            intro.on_pointer(&mut self.audio);
        }
    }

    fn play_cue(&mut self, cue: UiCue) {
        self.cue_sounds.retain(PlaybackHandle::is_playing);
        if self.cue_sounds.len() >= MAX_CUE_SOUNDS {
            self.cue_sounds.remove(0);
        }
        self.cue_sounds.extend(self.audio.play_cue(cue));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{RecordingBackend, SilentBackend};
    use crate::storage::MemoryStore;
    use crate::timeline::ManualClock;

    fn shell(backend: Box<dyn AudioBackend>) -> PortfolioShell {
        PortfolioShell::new(
            &AppConfig::default(),
            ProjectCatalog::builtin().unwrap(),
            ManualClock::new().shared(),
            backend,
            Box::new(MemoryStore::new()),
            Box::new(MemoryStore::new()),
        )
    }

    #[test]
    fn hover_storm_keeps_cue_sounds_bounded() {
        let backend = RecordingBackend::new();
        let mut shell = shell(Box::new(backend.clone()));
        for _ in 0..10_000 {
            shell.handle(UiEvent::Cue(UiCue::NavHover)).unwrap();
        }
        assert!(shell.cue_sounds.len() <= MAX_CUE_SOUNDS);
        assert_eq!(backend.played().len(), 10_000);
    }

    #[test]
    fn finished_silent_cues_are_released() {
        let mut shell = shell(Box::new(SilentBackend));
        for _ in 0..100 {
            shell.handle(UiEvent::Cue(UiCue::NavClick)).unwrap();
        }
        assert!(shell.cue_sounds.len() <= 1);
    }
}

use crate::assets::SoundName;
use crate::audio::{AudioSession, PlayOptions, PlaybackHandle, UiCue};
use crate::catalog::ProjectCatalogEntry;
use crate::config::ModalConfig;
use crate::gestures::Key;
use crate::timeline::{Scheduler, SharedClock, TimerId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModalPhase {
    #[default]
    Closed,
    Loading,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalEvent {
    Loading(u32),
    ContentShown(u32),
    Closed,
    /// The selected entry was dropped after the closing transition.
    Cleared,
}

#[derive(Debug, Clone, Copy)]
enum ModalTimer {
    LoadingComplete,
    ClearSelection,
}

/// Closed, then a short reel-loading transition, then the project details.
#[derive(Debug)]
pub struct ProjectViewer {
    clock: SharedClock,
    config: ModalConfig,
    phase: ModalPhase,
    selected: Option<ProjectCatalogEntry>,
    timers: Scheduler<ModalTimer>,
    loading_timer: Option<TimerId>,
    clear_timer: Option<TimerId>,
    reel_sound: Option<PlaybackHandle>,
    close_sound: Option<PlaybackHandle>,
}

impl ProjectViewer {
    pub fn new(config: &ModalConfig, clock: SharedClock) -> Self {
        Self {
            clock,
            config: config.clone(),
            phase: ModalPhase::Closed,
            selected: None,
            timers: Scheduler::new(),
            loading_timer: None,
            clear_timer: None,
            reel_sound: None,
            close_sound: None,
        }
    }

    pub fn phase(&self) -> ModalPhase {
        self.phase
    }

    /// The entry being shown, or the one being closed during the exit
    /// transition.
    pub fn selected(&self) -> Option<&ProjectCatalogEntry> {
        self.selected.as_ref()
    }

    /// The entry whose details are on screen, if the reel has finished.
    pub fn content(&self) -> Option<&ProjectCatalogEntry> {
        match self.phase {
            ModalPhase::Content => self.selected.as_ref(),
            _ => None,
        }
    }

    /// Whether anything should be rendered at all.
    pub fn is_mounted(&self) -> bool {
        self.phase != ModalPhase::Closed || self.selected.is_some()
    }

    /// Starts loading `entry`, abandoning whatever was loading before.
    /// Selecting nothing closes the viewer without the click or the exit
    /// delay.
    pub fn select(
        &mut self,
        entry: Option<ProjectCatalogEntry>,
        audio: &mut AudioSession,
    ) -> Vec<ModalEvent> {
        let Some(entry) = entry else {
            if self.phase == ModalPhase::Closed {
                return Vec::new();
            }
            self.abandon_loading(audio);
            self.cancel_clear();
            self.phase = ModalPhase::Closed;
            self.selected = None;
            return vec![ModalEvent::Closed, ModalEvent::Cleared];
        };

        self.abandon_loading(audio);
        self.cancel_clear();

        let id = entry.id;
        tracing::debug!(id, title = %entry.title, "loading project");
        self.phase = ModalPhase::Loading;
        self.selected = Some(entry);
        self.reel_sound = audio.play(SoundName::ReelLoad, PlayOptions::volume(0.3));
        let now = self.clock.now_ms();
        self.loading_timer = Some(self.timers.schedule_after(
            now,
            self.config.loading_ms,
            ModalTimer::LoadingComplete,
        ));

        vec![ModalEvent::Loading(id)]
    }

    /// Closes the viewer; the entry stays readable for the exit transition.
    pub fn close(&mut self, audio: &mut AudioSession) -> Vec<ModalEvent> {
        if self.phase == ModalPhase::Closed {
            return Vec::new();
        }

        self.close_sound = audio.play_cue(UiCue::ModalClose);
        self.abandon_loading(audio);
        self.phase = ModalPhase::Closed;
        let now = self.clock.now_ms();
        self.clear_timer = Some(self.timers.schedule_after(
            now,
            self.config.close_clear_ms,
            ModalTimer::ClearSelection,
        ));

        vec![ModalEvent::Closed]
    }

    /// Escape closes the viewer while an entry is selected.
    pub fn handle_key(&mut self, key: &Key, audio: &mut AudioSession) -> Vec<ModalEvent> {
        if *key == Key::Escape && self.selected.is_some() {
            return self.close(audio);
        }
        Vec::new()
    }

    pub fn tick(&mut self, audio: &mut AudioSession) -> Vec<ModalEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();

        while let Some(timer) = self.timers.pop_due(now) {
            match timer {
                ModalTimer::LoadingComplete => {
                    self.loading_timer = None;
                    audio.stop(self.reel_sound.as_mut());
                    self.reel_sound = None;
                    if let (ModalPhase::Loading, Some(entry)) = (self.phase, &self.selected) {
                        self.phase = ModalPhase::Content;
                        events.push(ModalEvent::ContentShown(entry.id));
                    }
                }
                ModalTimer::ClearSelection => {
                    self.clear_timer = None;
                    if self.selected.take().is_some() {
                        events.push(ModalEvent::Cleared);
                    }
                }
            }
        }

        events
    }

    fn abandon_loading(&mut self, audio: &mut AudioSession) {
        if let Some(timer) = self.loading_timer.take() {
            self.timers.cancel(timer);
        }
        audio.stop(self.reel_sound.as_mut());
        self.reel_sound = None;
    }

    fn cancel_clear(&mut self) {
        if let Some(timer) = self.clear_timer.take() {
            self.timers.cancel(timer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{RecordingBackend, VoiceOp};
    use crate::catalog::ProjectCatalog;
    use crate::config::AudioConfig;
    use crate::storage::MemoryStore;
    use crate::timeline::ManualClock;

    struct Fixture {
        clock: ManualClock,
        audio: AudioSession,
        backend: RecordingBackend,
        viewer: ProjectViewer,
        catalog: ProjectCatalog,
    }

    fn fixture() -> Fixture {
        let clock = ManualClock::new();
        let backend = RecordingBackend::new();
        let audio = AudioSession::new(
            &AudioConfig::default(),
            Box::new(backend.clone()),
            Box::new(MemoryStore::new()),
        );
        Fixture {
            viewer: ProjectViewer::new(&ModalConfig::default(), clock.shared()),
            clock,
            audio,
            backend,
            catalog: ProjectCatalog::builtin().unwrap(),
        }
    }

    impl Fixture {
        fn entry(&self, id: u32) -> Option<ProjectCatalogEntry> {
            self.catalog.get(id).cloned()
        }
    }

    #[test]
    fn loads_then_shows_content() {
        let mut f = fixture();
        let entry = f.entry(1);
        assert_eq!(f.viewer.select(entry, &mut f.audio), vec![ModalEvent::Loading(1)]);
        assert_eq!(f.viewer.phase(), ModalPhase::Loading);
        assert!(f.viewer.content().is_none());

        f.clock.set(1_999);
        assert!(f.viewer.tick(&mut f.audio).is_empty());
        f.clock.set(2_000);
        assert_eq!(f.viewer.tick(&mut f.audio), vec![ModalEvent::ContentShown(1)]);
        assert_eq!(f.viewer.content().map(|entry| entry.id), Some(1));

        assert_eq!(f.backend.played(), vec![("/sounds/reel-load.mp3".to_string(), 0.3)]);
        assert!(f.backend.ops().contains(&VoiceOp::Pause { voice: 0 }));
    }

    #[test]
    fn reselecting_cancels_the_first_load() {
        let mut f = fixture();
        let (a, b) = (f.entry(1), f.entry(2));
        f.viewer.select(a, &mut f.audio);
        f.clock.set(1_000);
        f.viewer.select(b, &mut f.audio);

        assert!(f.backend.ops().contains(&VoiceOp::Pause { voice: 0 }));

        f.clock.set(2_000);
        assert!(f.viewer.tick(&mut f.audio).is_empty());
        f.clock.set(3_000);
        assert_eq!(f.viewer.tick(&mut f.audio), vec![ModalEvent::ContentShown(2)]);
        f.clock.set(10_000);
        assert!(f.viewer.tick(&mut f.audio).is_empty());
        assert_eq!(f.viewer.content().map(|entry| entry.id), Some(2));
    }

    #[test]
    fn close_keeps_entry_for_exit_transition() {
        let mut f = fixture();
        let entry = f.entry(3);
        f.viewer.select(entry, &mut f.audio);
        f.clock.set(2_500);
        f.viewer.tick(&mut f.audio);

        assert_eq!(f.viewer.close(&mut f.audio), vec![ModalEvent::Closed]);
        assert!(f.viewer.close(&mut f.audio).is_empty());
        assert_eq!(f.viewer.phase(), ModalPhase::Closed);
        assert_eq!(f.viewer.selected().map(|entry| entry.id), Some(3));
        assert!(f.viewer.is_mounted());

        f.clock.set(2_799);
        assert!(f.viewer.tick(&mut f.audio).is_empty());
        f.clock.set(2_800);
        assert_eq!(f.viewer.tick(&mut f.audio), vec![ModalEvent::Cleared]);
        assert!(!f.viewer.is_mounted());

        let clicks = f
            .backend
            .played()
            .iter()
            .filter(|(locator, _)| locator == "/sounds/click.mp3")
            .count();
        assert_eq!(clicks, 1);
    }

    #[test]
    fn closing_while_loading_never_shows_content() {
        let mut f = fixture();
        let entry = f.entry(4);
        f.viewer.select(entry, &mut f.audio);
        f.clock.set(500);
        f.viewer.handle_key(&Key::Escape, &mut f.audio);

        f.clock.set(5_000);
        assert_eq!(f.viewer.tick(&mut f.audio), vec![ModalEvent::Cleared]);
        assert_eq!(f.viewer.phase(), ModalPhase::Closed);
        assert!(f.viewer.selected().is_none());
    }

    #[test]
    fn selecting_during_exit_keeps_the_new_entry() {
        let mut f = fixture();
        let (a, b) = (f.entry(1), f.entry(5));
        f.viewer.select(a, &mut f.audio);
        f.viewer.close(&mut f.audio);
        f.clock.set(100);
        f.viewer.select(b, &mut f.audio);

        f.clock.set(2_100);
        assert_eq!(f.viewer.tick(&mut f.audio), vec![ModalEvent::ContentShown(5)]);
        assert_eq!(f.viewer.selected().map(|entry| entry.id), Some(5));
    }

    #[test]
    fn selecting_nothing_when_closed_is_a_no_op() {
        let mut f = fixture();
        assert!(f.viewer.select(None, &mut f.audio).is_empty());
        assert!(f.viewer.handle_key(&Key::Escape, &mut f.audio).is_empty());
        assert!(f.backend.ops().is_empty());

        let entry = f.entry(6);
        f.viewer.select(entry, &mut f.audio);
        assert_eq!(
            f.viewer.select(None, &mut f.audio),
            vec![ModalEvent::Closed, ModalEvent::Cleared]
        );
        assert!(!f.viewer.is_mounted());
    }
}

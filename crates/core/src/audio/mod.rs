use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::assets::{SoundName, SoundRegistry};
use crate::config::AudioConfig;
use crate::storage::{KeyValueStore, AUDIO_MUTED_KEY};
use crate::{PortfolioError, Result};

/// Volume given to pre-loaded cache entries.
const PRELOAD_VOLUME: f32 = 0.5;

/// One playable instance of an audio asset.
pub trait Voice: Send {
    fn set_volume(&mut self, volume: f32);
    fn set_looping(&mut self, looping: bool);
    /// Requests playback. Real backends start asynchronously; an error means
    /// the platform refused to start (autoplay policy and the like).
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    /// Moves the play position back to the start.
    fn rewind(&mut self);
    fn is_playing(&self) -> bool;
}

/// Platform audio layer the session plays through.
pub trait AudioBackend: Send {
    /// Creates a fresh, independent voice for the asset at `locator`.
    fn create_voice(&mut self, locator: &str) -> Result<Box<dyn Voice>>;

    /// Fetches an asset ahead of time. The returned voice is only kept as a
    /// warm cache entry; it is never used for playback.
    fn preload(&mut self, locator: &str) -> Result<Box<dyn Voice>> {
        let mut voice = self.create_voice(locator)?;
        voice.set_volume(PRELOAD_VOLUME);
        Ok(voice)
    }
}

/// Per-request playback settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    pub volume: f32,
    pub looping: bool,
}

impl PlayOptions {
    pub fn volume(volume: f32) -> Self {
        Self {
            volume,
            ..Self::default()
        }
    }

    pub fn looped(mut self) -> Self {
        self.looping = true;
        self
    }

    fn clamped_volume(&self) -> f32 {
        if self.volume.is_nan() {
            PRELOAD_VOLUME
        } else {
            self.volume.clamp(0.0, 1.0)
        }
    }
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            volume: 0.5,
            looping: false,
        }
    }
}

/// Fixed sound/volume pairs used by the pages for incidental feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCue {
    NavHover,
    NavClick,
    FilterClick,
    FilterHover,
    PosterHover,
    ProjectOpen,
    FormFocus,
    FormSubmit,
    MuteConfirm,
    ModalClose,
}

impl UiCue {
    pub fn sound(self) -> SoundName {
        match self {
            UiCue::NavHover | UiCue::FilterHover => SoundName::Hover,
            UiCue::NavClick
            | UiCue::FilterClick
            | UiCue::FormFocus
            | UiCue::MuteConfirm
            | UiCue::ModalClose => SoundName::Click,
            UiCue::PosterHover => SoundName::FilmFlicker,
            UiCue::ProjectOpen => SoundName::ReelLoad,
            UiCue::FormSubmit => SoundName::Whoosh,
        }
    }

    pub fn options(self) -> PlayOptions {
        let volume = match self {
            UiCue::NavHover => 0.1,
            UiCue::NavClick | UiCue::FormFocus | UiCue::ModalClose => 0.2,
            UiCue::FilterClick => 0.15,
            UiCue::FilterHover | UiCue::PosterHover => 0.05,
            UiCue::ProjectOpen | UiCue::FormSubmit | UiCue::MuteConfirm => 0.3,
        };
        PlayOptions::volume(volume)
    }
}

/// A sound instance owned by whoever asked for it.
pub struct PlaybackHandle {
    sound: SoundName,
    voice: Box<dyn Voice>,
}

impl PlaybackHandle {
    pub fn sound(&self) -> SoundName {
        self.sound
    }

    pub fn is_playing(&self) -> bool {
        self.voice.is_playing()
    }

    /// Pauses and rewinds. Safe to call any number of times.
    pub fn stop(&mut self) {
        self.voice.pause();
        self.voice.rewind();
    }
}

impl fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("sound", &self.sound)
            .field("playing", &self.voice.is_playing())
            .finish()
    }
}

/// Process-wide sound state: the persisted mute flag and the pre-load cache.
///
/// Built once by the shell and lent by `&mut` to every controller that makes
/// noise. Playback failures are logged, never returned.
pub struct AudioSession {
    registry: SoundRegistry,
    backend: Box<dyn AudioBackend>,
    store: Box<dyn KeyValueStore>,
    muted: bool,
    ready: bool,
    cache: BTreeMap<SoundName, Box<dyn Voice>>,
}

impl AudioSession {
    /// Builds a session, restoring the mute flag from `store` when present.
    pub fn new(
        config: &AudioConfig,
        backend: Box<dyn AudioBackend>,
        store: Box<dyn KeyValueStore>,
    ) -> Self {
        let muted = match store.get(AUDIO_MUTED_KEY) {
            Some(raw) => serde_json::from_str::<bool>(&raw).unwrap_or_else(|err| {
                tracing::warn!(%raw, %err, "stored mute flag unreadable, assuming unmuted");
                false
            }),
            None => config.muted_by_default,
        };

        Self {
            registry: SoundRegistry::with_root(&config.asset_root),
            backend,
            store,
            muted,
            ready: false,
            cache: BTreeMap::new(),
        }
    }

    /// Replaces the sound table, e.g. with one missing some assets.
    pub fn with_registry(mut self, registry: SoundRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn registry(&self) -> &SoundRegistry {
        &self.registry
    }

    /// Sounds currently held in the pre-load cache.
    pub fn cached(&self) -> BTreeSet<SoundName> {
        self.cache.keys().copied().collect()
    }

    /// Pre-loads every registered sound on the first call; later calls do
    /// nothing. Individual pre-load failures are logged and skipped.
    pub fn initialize(&mut self) {
        if self.ready {
            return;
        }

        for (name, locator) in self.registry.iter() {
            if self.cache.contains_key(&name) {
                continue;
            }
            match self.backend.preload(locator) {
                Ok(voice) => {
                    self.cache.insert(name, voice);
                }
                Err(err) => tracing::warn!(sound = %name, %err, "failed to preload sound"),
            }
        }

        self.ready = true;
        tracing::debug!(cached = self.cache.len(), "audio session ready");
    }

    /// Starts a fresh instance of `name`. Returns `None` when muted or when
    /// the asset is unavailable. A refused start still yields a handle.
    pub fn play(&mut self, name: SoundName, options: PlayOptions) -> Option<PlaybackHandle> {
        if self.muted {
            return None;
        }

        let Some(locator) = self.registry.locator(name) else {
            tracing::debug!(sound = %name, "sound not registered");
            return None;
        };

        let mut voice = match self.backend.create_voice(locator) {
            Ok(voice) => voice,
            Err(err) => {
                tracing::debug!(sound = %name, %err, "audio not available");
                return None;
            }
        };

        voice.set_volume(options.clamped_volume());
        voice.set_looping(options.looping);
        if let Err(err) = voice.play() {
            tracing::warn!(sound = %name, %err, "audio playback restricted");
        }

        Some(PlaybackHandle { sound: name, voice })
    }

    /// Like [`AudioSession::play`] but resolves a free-form key first.
    pub fn play_named(&mut self, key: &str, options: PlayOptions) -> Option<PlaybackHandle> {
        match key.parse::<SoundName>() {
            Ok(name) => self.play(name, options),
            Err(err) => {
                tracing::debug!(%err, "ignoring play request");
                None
            }
        }
    }

    pub fn play_cue(&mut self, cue: UiCue) -> Option<PlaybackHandle> {
        self.play(cue.sound(), cue.options())
    }

    pub fn stop(&mut self, handle: Option<&mut PlaybackHandle>) {
        if let Some(handle) = handle {
            handle.stop();
        }
    }

    /// Flips the mute flag and persists it. A failed write is logged; the
    /// in-memory state still changes.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        let encoded = if self.muted { "true" } else { "false" };
        if let Err(err) = self.store.set(AUDIO_MUTED_KEY, encoded) {
            tracing::warn!(%err, "failed to persist mute preference");
        }
        tracing::info!(muted = self.muted, "mute toggled");
        self.muted
    }
}

impl fmt::Debug for AudioSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSession")
            .field("muted", &self.muted)
            .field("ready", &self.ready)
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// Backend for hosts with no audio device. Voices only log, and a one-shot
/// voice has no length, so it finishes as soon as it starts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentBackend;

impl AudioBackend for SilentBackend {
    fn create_voice(&mut self, locator: &str) -> Result<Box<dyn Voice>> {
        Ok(Box::new(SilentVoice {
            locator: locator.to_string(),
            volume: PRELOAD_VOLUME,
            looping: false,
            playing: false,
        }))
    }
}

#[derive(Debug)]
struct SilentVoice {
    locator: String,
    volume: f32,
    looping: bool,
    playing: bool,
}

impl Voice for SilentVoice {
    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn play(&mut self) -> Result<()> {
        tracing::trace!(locator = %self.locator, volume = self.volume, looping = self.looping, "play");
        self.playing = self.looping;
        Ok(())
    }

    fn pause(&mut self) {
        if self.playing {
            tracing::trace!(locator = %self.locator, "pause");
        }
        self.playing = false;
    }

    fn rewind(&mut self) {}

    fn is_playing(&self) -> bool {
        self.playing
    }
}

/// Operation observed by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceOp {
    Preload { locator: String },
    Play { voice: usize, locator: String, volume: f32, looping: bool },
    Pause { voice: usize },
    Rewind { voice: usize },
}

#[derive(Debug, Default)]
struct Recording {
    ops: Vec<VoiceOp>,
    next_voice: usize,
    block_playback: bool,
    missing: BTreeSet<String>,
}

/// Backend that records every voice operation instead of producing sound.
/// Clones share the same log, so a test can keep one while the session owns
/// the other.
#[derive(Debug, Default, Clone)]
pub struct RecordingBackend {
    shared: Arc<Mutex<Recording>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `play` fail the way a blocked autoplay does.
    pub fn block_playback(&self, blocked: bool) {
        self.lock().block_playback = blocked;
    }

    /// Makes voice creation fail for `locator`.
    pub fn mark_missing(&self, locator: impl Into<String>) {
        self.lock().missing.insert(locator.into());
    }

    pub fn ops(&self) -> Vec<VoiceOp> {
        self.lock().ops.clone()
    }

    /// Locators and volumes of every started voice, in order.
    pub fn played(&self) -> Vec<(String, f32)> {
        self.lock()
            .ops
            .iter()
            .filter_map(|op| match op {
                VoiceOp::Play { locator, volume, .. } => Some((locator.clone(), *volume)),
                _ => None,
            })
            .collect()
    }

    pub fn preloaded(&self) -> Vec<String> {
        self.lock()
            .ops
            .iter()
            .filter_map(|op| match op {
                VoiceOp::Preload { locator } => Some(locator.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lock().ops.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AudioBackend for RecordingBackend {
    fn create_voice(&mut self, locator: &str) -> Result<Box<dyn Voice>> {
        let mut recording = self.lock();
        if recording.missing.contains(locator) {
            return Err(PortfolioError::msg(format!("no such asset: {locator}")));
        }
        let id = recording.next_voice;
        recording.next_voice += 1;
        Ok(Box::new(RecordedVoice {
            id,
            locator: locator.to_string(),
            volume: PRELOAD_VOLUME,
            looping: false,
            playing: false,
            shared: self.shared.clone(),
        }))
    }

    fn preload(&mut self, locator: &str) -> Result<Box<dyn Voice>> {
        let voice = self.create_voice(locator)?;
        self.lock().ops.push(VoiceOp::Preload {
            locator: locator.to_string(),
        });
        Ok(voice)
    }
}

struct RecordedVoice {
    id: usize,
    locator: String,
    volume: f32,
    looping: bool,
    playing: bool,
    shared: Arc<Mutex<Recording>>,
}

impl RecordedVoice {
    fn record(&self, op: VoiceOp) -> bool {
        let mut recording = self
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        recording.ops.push(op);
        recording.block_playback
    }
}

impl Voice for RecordedVoice {
    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn play(&mut self) -> Result<()> {
        let blocked = self.record(VoiceOp::Play {
            voice: self.id,
            locator: self.locator.clone(),
            volume: self.volume,
            looping: self.looping,
        });
        if blocked {
            return Err(PortfolioError::msg("playback blocked by autoplay policy"));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.record(VoiceOp::Pause { voice: self.id });
        self.playing = false;
    }

    fn rewind(&mut self) {
        self.record(VoiceOp::Rewind { voice: self.id });
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

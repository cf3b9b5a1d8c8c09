//! Core library for the Reel Portfolio site.
//!
//! The crate holds the stateful pieces behind the site's presentation: the
//! sound-effect session and its persisted mute flag, the timed intro
//! sequence, the keyboard and click easter eggs, and the project viewer.
//! Every controller runs off an injectable [`Clock`] and its own
//! [`Scheduler`], and [`PortfolioShell`] assembles them for a page to drive.

pub mod assets;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gestures;
pub mod intro;
pub mod modal;
pub mod shell;
pub mod storage;
pub mod timeline;

pub use assets::{SoundName, SoundRegistry};
pub use audio::{
    AudioBackend, AudioSession, PlayOptions, PlaybackHandle, RecordingBackend, SilentBackend,
    UiCue, Voice,
};
pub use catalog::{ProjectCatalog, ProjectCatalogEntry};
pub use config::{AppConfig, AudioConfig, GestureConfig, IntroConfig, ModalConfig};
pub use error::{PortfolioError, Result};
pub use gestures::{EasterEggs, EggEvent, Key, MismatchPolicy, Overlay, SequenceMatcher};
pub use intro::{IntroEvent, IntroGate, IntroPhase, IntroSequencer, IntroTimetable};
pub use modal::{ModalEvent, ModalPhase, ProjectViewer};
pub use shell::{PortfolioShell, ShellEvent, UiEvent};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use timeline::{Clock, ManualClock, Millis, Scheduler, SharedClock, SystemClock};

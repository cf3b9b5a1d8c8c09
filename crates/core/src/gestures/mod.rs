use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::GestureConfig;
use crate::timeline::{Millis, Scheduler, SharedClock, TimerId};

/// A key press, normalised from DOM-style key codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Escape,
    Enter,
    Space,
    /// `KeyA`..`KeyZ`, stored lowercase.
    Letter(char),
    Other(String),
}

impl Key {
    pub fn from_code(code: &str) -> Self {
        match code {
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "Escape" => Key::Escape,
            "Enter" => Key::Enter,
            "Space" => Key::Space,
            _ => {
                let mut rest = code.strip_prefix("Key").unwrap_or_default().chars();
                match (rest.next(), rest.next()) {
                    (Some(letter), None) if letter.is_ascii_alphabetic() => {
                        Key::Letter(letter.to_ascii_lowercase())
                    }
                    _ => Key::Other(code.to_string()),
                }
            }
        }
    }

    /// Keys spelling `word`, one letter each.
    pub fn spell(word: &str) -> Vec<Key> {
        word.chars()
            .map(|letter| Key::Letter(letter.to_ascii_lowercase()))
            .collect()
    }
}

impl From<&str> for Key {
    fn from(code: &str) -> Self {
        Key::from_code(code)
    }
}

/// Up, up, down, down, left, right, left, right, b, a.
pub fn konami_code() -> Vec<Key> {
    vec![
        Key::ArrowUp,
        Key::ArrowUp,
        Key::ArrowDown,
        Key::ArrowDown,
        Key::ArrowLeft,
        Key::ArrowRight,
        Key::ArrowLeft,
        Key::ArrowRight,
        Key::Letter('b'),
        Key::Letter('a'),
    ]
}

pub const ACTION_WORD: &str = "action";

/// What a matcher does with an input that breaks the current run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MismatchPolicy {
    /// Always drop back to the start, even if the input could begin a new
    /// run.
    #[default]
    Reset,
    /// Treat an input equal to the first symbol as the start of a new run.
    RestartOnFirst,
}

fn equal<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// Tracks how far a stream of inputs has progressed through `target`.
pub struct SequenceMatcher<T, F = fn(&T, &T) -> bool> {
    target: Vec<T>,
    eq: F,
    index: usize,
    policy: MismatchPolicy,
}

impl<T: PartialEq> SequenceMatcher<T> {
    pub fn new(target: Vec<T>) -> Self {
        Self::with_eq(target, equal::<T>)
    }
}

impl<T, F> SequenceMatcher<T, F>
where
    F: Fn(&T, &T) -> bool,
{
    pub fn with_eq(target: Vec<T>, eq: F) -> Self {
        Self {
            target,
            eq,
            index: 0,
            policy: MismatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Consecutive correct inputs seen so far. Always below the target length.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn target_len(&self) -> usize {
        self.target.len()
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Feeds one input. Returns `true` when it completes the sequence, after
    /// which matching starts over.
    pub fn feed(&mut self, input: &T) -> bool {
        let Some(expected) = self.target.get(self.index) else {
            return false;
        };

        if (self.eq)(expected, input) {
            self.index += 1;
            if self.index == self.target.len() {
                self.index = 0;
                return true;
            }
            return false;
        }

        self.index = match self.policy {
            MismatchPolicy::RestartOnFirst if (self.eq)(&self.target[0], input) => 1,
            _ => 0,
        };
        false
    }
}

impl<T: fmt::Debug, F> fmt::Debug for SequenceMatcher<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceMatcher")
            .field("target", &self.target)
            .field("index", &self.index)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Counts clicks until either the threshold is reached or the owner resets
/// the window.
#[derive(Debug, Clone)]
pub struct ClickBurst {
    count: u32,
    threshold: u32,
}

impl ClickBurst {
    pub fn new(threshold: u32) -> Self {
        Self {
            count: 0,
            threshold: threshold.max(1),
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Returns `true` when this click reaches the threshold; the count is
    /// cleared at the same time.
    pub fn click(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.threshold {
            self.count = 0;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Overlay {
    /// Konami code.
    DirectorMode,
    /// Typing "action".
    Action,
    /// Rapid clicks on the logo.
    FilmBurn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EggEvent {
    Shown(Overlay),
    Hidden(Overlay),
}

#[derive(Debug, Clone, Copy)]
enum EggTimer {
    Hide(Overlay),
    BurstWindow,
}

/// Runs every easter egg off one clock.
#[derive(Debug)]
pub struct EasterEggs {
    clock: SharedClock,
    config: GestureConfig,
    konami: SequenceMatcher<Key>,
    action: SequenceMatcher<Key>,
    burst: ClickBurst,
    timers: Scheduler<EggTimer>,
    hide_timers: BTreeMap<Overlay, TimerId>,
    visible: BTreeSet<Overlay>,
    next_window_at: Millis,
}

impl EasterEggs {
    pub fn new(config: &GestureConfig, clock: SharedClock) -> Self {
        let window = config.burst_window_ms.max(1);
        let next_window_at = clock.now_ms().saturating_add(window);
        let mut timers = Scheduler::new();
        timers.schedule_at(next_window_at, EggTimer::BurstWindow);

        Self {
            clock,
            konami: SequenceMatcher::new(konami_code()).with_policy(config.mismatch_policy),
            action: SequenceMatcher::new(Key::spell(ACTION_WORD))
                .with_policy(config.mismatch_policy),
            burst: ClickBurst::new(config.burst_threshold),
            config: config.clone(),
            timers,
            hide_timers: BTreeMap::new(),
            visible: BTreeSet::new(),
            next_window_at,
        }
    }

    pub fn is_visible(&self, overlay: Overlay) -> bool {
        self.visible.contains(&overlay)
    }

    pub fn konami_progress(&self) -> usize {
        self.konami.index()
    }

    pub fn action_progress(&self) -> usize {
        self.action.index()
    }

    pub fn click_count(&self) -> u32 {
        self.burst.count()
    }

    /// Feeds a key press to both sequence matchers.
    pub fn handle_key(&mut self, key: &Key) -> Vec<EggEvent> {
        let mut events = Vec::new();
        if self.konami.feed(key) {
            events.push(self.show(Overlay::DirectorMode));
        }
        if self.action.feed(key) {
            events.push(self.show(Overlay::Action));
        }
        events
    }

    /// Clicks outside the logo are ignored.
    pub fn handle_click(&mut self, on_logo: bool) -> Vec<EggEvent> {
        if on_logo && self.burst.click() {
            return vec![self.show(Overlay::FilmBurn)];
        }
        Vec::new()
    }

    /// Hides expired overlays and rolls the click window.
    pub fn tick(&mut self) -> Vec<EggEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();

        while let Some(timer) = self.timers.pop_due(now) {
            match timer {
                EggTimer::Hide(overlay) => {
                    self.hide_timers.remove(&overlay);
                    if self.visible.remove(&overlay) {
                        events.push(EggEvent::Hidden(overlay));
                    }
                }
                EggTimer::BurstWindow => {
                    self.burst.reset();
                    let window = self.config.burst_window_ms.max(1);
                    let missed = now.saturating_sub(self.next_window_at) / window;
                    self.next_window_at = self
                        .next_window_at
                        .saturating_add(missed.saturating_add(1).saturating_mul(window));
                    if self.next_window_at > now {
                        self.timers
                            .schedule_at(self.next_window_at, EggTimer::BurstWindow);
                    }
                }
            }
        }

        events
    }

    fn show(&mut self, overlay: Overlay) -> EggEvent {
        let duration = match overlay {
            Overlay::DirectorMode => self.config.director_mode_ms,
            Overlay::Action => self.config.action_ms,
            Overlay::FilmBurn => self.config.film_burn_ms,
        };
        if let Some(previous) = self.hide_timers.remove(&overlay) {
            self.timers.cancel(previous);
        }
        let now = self.clock.now_ms();
        let timer = self
            .timers
            .schedule_after(now, duration, EggTimer::Hide(overlay));
        self.hide_timers.insert(overlay, timer);
        self.visible.insert(overlay);
        tracing::info!(?overlay, duration, "easter egg activated");
        EggEvent::Shown(overlay)
    }
}

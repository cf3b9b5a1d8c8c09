use reel_portfolio_core::audio::RecordingBackend;
use reel_portfolio_core::storage::{AUDIO_MUTED_KEY, INTRO_SEEN_KEY};
use reel_portfolio_core::{
    AppConfig, EggEvent, IntroEvent, IntroPhase, JsonFileStore, Key, KeyValueStore, ManualClock,
    MemoryStore, ModalEvent, ModalPhase, Overlay, PortfolioError, PortfolioShell,
    ProjectCatalog, ShellEvent, UiEvent,
};

fn shell_with(
    clock: &ManualClock,
    backend: &RecordingBackend,
    durable: Box<dyn KeyValueStore>,
    session: MemoryStore,
) -> PortfolioShell {
    PortfolioShell::new(
        &AppConfig::default(),
        ProjectCatalog::builtin().unwrap(),
        clock.shared(),
        Box::new(backend.clone()),
        durable,
        Box::new(session),
    )
}

fn fresh_shell(clock: &ManualClock, backend: &RecordingBackend) -> PortfolioShell {
    shell_with(clock, backend, Box::new(MemoryStore::new()), MemoryStore::new())
}

fn intro_phases(events: &[ShellEvent]) -> Vec<IntroPhase> {
    events
        .iter()
        .filter_map(|event| match event {
            ShellEvent::Intro(IntroEvent::PhaseChanged(phase)) => Some(*phase),
            _ => None,
        })
        .collect()
}

#[test]
fn intro_plays_through_and_unmounts_after_grace() {
    let clock = ManualClock::new();
    let backend = RecordingBackend::new();
    let mut shell = fresh_shell(&clock, &backend);
    assert!(shell.gate().is_visible());

    let mut events = Vec::new();
    for _ in 0..70 {
        clock.advance(100);
        events.extend(shell.tick());
    }

    assert_eq!(intro_phases(&events).len(), 5);
    assert_eq!(
        events
            .iter()
            .filter(|event| **event == ShellEvent::Intro(IntroEvent::Completed))
            .count(),
        1
    );
    assert_eq!(events.last(), Some(&ShellEvent::IntroHidden));
    assert!(shell.intro().is_none());
    assert_eq!(shell.session_store().get(INTRO_SEEN_KEY).as_deref(), Some("true"));
}

#[test]
fn skipping_early_suppresses_later_phases() {
    let clock = ManualClock::new();
    let backend = RecordingBackend::new();
    let mut shell = fresh_shell(&clock, &backend);

    clock.set(1_000);
    let events = shell.handle(UiEvent::SkipIntro).unwrap();
    assert_eq!(intro_phases(&events), vec![IntroPhase::Flicker]);
    assert!(events.contains(&ShellEvent::Intro(IntroEvent::Completed)));
    assert!(shell.handle(UiEvent::SkipIntro).unwrap().is_empty());

    clock.set(1_500);
    assert_eq!(shell.tick(), vec![ShellEvent::IntroHidden]);

    clock.set(8_000);
    assert!(shell.tick().is_empty());
    assert_eq!(backend.played().len(), 1);
}

#[test]
fn seen_intro_is_not_replayed_in_the_same_session() {
    let clock = ManualClock::new();
    let backend = RecordingBackend::new();
    let mut session = MemoryStore::new();
    session.set(INTRO_SEEN_KEY, "true").unwrap();

    let mut shell = shell_with(&clock, &backend, Box::new(MemoryStore::new()), session);
    assert!(shell.intro().is_none());
    assert!(!shell.gate().is_visible());

    clock.set(10_000);
    assert!(shell.tick().is_empty());
    assert!(backend.played().is_empty());
}

#[test]
fn first_click_during_intro_preloads_audio() {
    let clock = ManualClock::new();
    let backend = RecordingBackend::new();
    let mut shell = fresh_shell(&clock, &backend);
    assert!(!shell.audio().is_ready());

    shell.handle(UiEvent::Click { on_logo: false }).unwrap();
    shell.handle(UiEvent::Pointer).unwrap();

    assert!(shell.audio().is_ready());
    assert_eq!(backend.preloaded().len(), 7);
}

#[test]
fn unmuting_plays_a_confirmation_click() {
    let clock = ManualClock::new();
    let backend = RecordingBackend::new();
    let mut shell = fresh_shell(&clock, &backend);
    shell.handle(UiEvent::SkipIntro).unwrap();
    backend.clear();

    assert_eq!(
        shell.handle(UiEvent::ToggleMute).unwrap(),
        vec![ShellEvent::MuteChanged(true)]
    );
    clock.advance(100);
    shell.tick();
    assert!(backend.played().is_empty());

    shell.handle(UiEvent::ToggleMute).unwrap();
    clock.advance(49);
    shell.tick();
    assert!(backend.played().is_empty());
    clock.advance(1);
    shell.tick();
    assert_eq!(backend.played(), vec![("/sounds/click.mp3".to_string(), 0.3)]);
}

#[test]
fn mute_preference_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    let clock = ManualClock::new();
    let backend = RecordingBackend::new();

    let mut shell = shell_with(
        &clock,
        &backend,
        Box::new(JsonFileStore::open(&path)),
        MemoryStore::new(),
    );
    shell.handle(UiEvent::ToggleMute).unwrap();
    drop(shell);

    assert_eq!(
        JsonFileStore::open(&path).get(AUDIO_MUTED_KEY).as_deref(),
        Some("true")
    );
    let shell = shell_with(
        &clock,
        &backend,
        Box::new(JsonFileStore::open(&path)),
        MemoryStore::new(),
    );
    assert!(shell.audio().is_muted());
}

#[test]
fn project_viewer_round_trip_through_the_shell() {
    let clock = ManualClock::new();
    let backend = RecordingBackend::new();
    let mut shell = fresh_shell(&clock, &backend);
    shell.handle(UiEvent::SkipIntro).unwrap();

    assert_eq!(
        shell.handle(UiEvent::SelectProject(Some(2))).unwrap(),
        vec![ShellEvent::Modal(ModalEvent::Loading(2))]
    );
    clock.advance(2_000);
    assert!(shell.tick().contains(&ShellEvent::Modal(ModalEvent::ContentShown(2))));
    assert_eq!(shell.viewer().phase(), ModalPhase::Content);

    let events = shell.handle(UiEvent::Key(Key::Escape)).unwrap();
    assert_eq!(events, vec![ShellEvent::Modal(ModalEvent::Closed)]);
    assert!(shell.handle(UiEvent::CloseProject).unwrap().is_empty());

    clock.advance(300);
    assert_eq!(shell.tick(), vec![ShellEvent::Modal(ModalEvent::Cleared)]);

    let err = shell.handle(UiEvent::SelectProject(Some(99))).unwrap_err();
    assert!(matches!(err, PortfolioError::UnknownProject(99)));
    assert_eq!(shell.viewer().phase(), ModalPhase::Closed);
}

#[test]
fn unknown_project_does_not_swallow_due_events() {
    let clock = ManualClock::new();
    let backend = RecordingBackend::new();
    let mut shell = fresh_shell(&clock, &backend);

    clock.set(6_500);
    let err = shell.handle(UiEvent::SelectProject(Some(99))).unwrap_err();
    assert!(matches!(err, PortfolioError::UnknownProject(99)));
    assert!(shell.intro().is_some_and(|intro| !intro.is_complete()));

    let events = shell.tick();
    assert!(events.contains(&ShellEvent::Intro(IntroEvent::Completed)));
    assert_eq!(intro_phases(&events).len(), 5);

    clock.set(7_000);
    assert_eq!(shell.tick(), vec![ShellEvent::IntroHidden]);
}

#[test]
fn konami_code_reaches_the_overlay() {
    let clock = ManualClock::new();
    let backend = RecordingBackend::new();
    let mut shell = fresh_shell(&clock, &backend);

    let codes = [
        "ArrowUp", "ArrowUp", "ArrowDown", "ArrowDown", "ArrowLeft", "ArrowRight", "ArrowLeft",
        "ArrowRight", "KeyB", "KeyA",
    ];
    let mut events = Vec::new();
    for code in codes {
        events.extend(shell.handle(UiEvent::Key(Key::from_code(code))).unwrap());
    }
    assert!(events.contains(&ShellEvent::Egg(EggEvent::Shown(Overlay::DirectorMode))));
    assert!(shell.eggs().is_visible(Overlay::DirectorMode));

    clock.advance(5_000);
    assert!(shell
        .tick()
        .contains(&ShellEvent::Egg(EggEvent::Hidden(Overlay::DirectorMode))));
}

//! Launcher wiring: owns every piece of session state and runs the body of
//! the 10 ms tick.
//!
//! Each tick polls the gamepad, advances navigation, feeds the watchdog the
//! fused activity signal and then polls background work. Installs and
//! update checks run as tokio tasks, but their results are only ever
//! applied here, so the catalog, the per-slot game records and the
//! lifecycle state have a single writer.

use std::path::PathBuf;
use tokio::task::JoinHandle;

use crate::catalog::{CatalogStore, UpdateDecision};
use crate::display::DisplaySink;
use crate::game::{self, GameInfo};
use crate::install::{self, InstallError, InstallOutcome, InstallRequest};
use crate::input::{InputSampler, KeySource};
use crate::lifecycle::LauncherState;
use crate::nav::{NavEffect, NavigationStateMachine, PAGE_SIZE, Screen};
use crate::task::{PollResult, poll_task};
use crate::watchdog::{SessionWatchdog, WatchdogEvent};
use crate::platform;

pub struct LauncherApp {
    http: reqwest::Client,
    games_root: PathBuf,
    store: CatalogStore,
    /// One slot per catalog entry, filled as metadata becomes known.
    game_infos: Vec<Option<GameInfo>>,
    /// How many entries the title list shows; grows one at a time during
    /// startup synchronization.
    revealed: usize,
    sampler: InputSampler,
    keys: Box<dyn KeySource>,
    nav: NavigationStateMachine,
    watchdog: SessionWatchdog,
    lifecycle: LauncherState,
    display: Box<dyn DisplaySink>,
    /// The single in-flight install, if any.
    install_task: Option<JoinHandle<Result<InstallOutcome, InstallError>>>,
    /// In-flight metadata fetch for a play/retry update check.
    check_task: Option<JoinHandle<reqwest::Result<GameInfo>>>,
    check_entry: usize,
}

impl LauncherApp {
    pub fn new(
        http: reqwest::Client,
        games_root: PathBuf,
        store: CatalogStore,
        sampler: InputSampler,
        keys: Box<dyn KeySource>,
        mut display: Box<dyn DisplaySink>,
    ) -> Self {
        let len = store.len();
        display.set_screen(Screen::Start);
        display.set_game_detail(None);

        let mut app = Self {
            http,
            games_root,
            store,
            game_infos: vec![None; len],
            revealed: len,
            sampler,
            keys,
            nav: NavigationStateMachine::new(len),
            watchdog: SessionWatchdog::new(),
            lifecycle: LauncherState::Ready,
            display,
            install_task: None,
            check_task: None,
            check_entry: 0,
        };
        app.set_lifecycle(LauncherState::Ready);
        app
    }

    pub fn lifecycle(&self) -> LauncherState {
        self.lifecycle
    }

    fn set_lifecycle(&mut self, state: LauncherState) {
        self.lifecycle = state;
        self.display.set_lifecycle_label(state);
    }

    /// Walk every catalog entry in index order, installing or updating as
    /// needed, and reveal titles one at a time as each check completes.
    /// Per-entry failures are scoped: they flip the lifecycle to Failed and
    /// move on to the next entry.
    pub async fn startup_sync(&mut self) {
        self.revealed = 0;

        for index in 0..self.store.len() {
            match self.store.check_for_update(index).await {
                Ok(UpdateDecision::UpToDate) => {
                    self.load_slot_from_disk(index);
                    self.set_lifecycle(LauncherState::Ready);
                }
                Ok(UpdateDecision::NeedsInstall) => {
                    self.set_lifecycle(LauncherState::DownloadingGame);
                    self.install_inline(index, None).await;
                }
                Ok(UpdateDecision::NeedsUpdate(remote)) => {
                    self.set_lifecycle(LauncherState::DownloadingUpdate);
                    self.install_inline(index, Some(remote)).await;
                }
                Err(e) => {
                    tracing::error!("Update check failed for entry {index}: {e}");
                    self.set_lifecycle(LauncherState::Failed);
                }
            }

            self.revealed = index + 1;
            self.publish_page(index / PAGE_SIZE);
        }
    }

    /// One install during startup, awaited in place so entries complete
    /// strictly in catalog order.
    async fn install_inline(&mut self, index: usize, remote: Option<GameInfo>) {
        let info = match remote {
            Some(info) => info,
            None => {
                let Some(entry) = self.store.entry(index) else {
                    return;
                };
                match self.store.fetch_remote_info(&entry.info_url).await {
                    Ok(info) => info,
                    Err(e) => {
                        tracing::error!("Failed to fetch metadata for entry {index}: {e}");
                        self.set_lifecycle(LauncherState::Failed);
                        return;
                    }
                }
            }
        };

        let request = InstallRequest {
            info,
            candidate_info_urls: self.store.info_urls(),
        };
        match install::install_game(self.http.clone(), self.games_root.clone(), request).await {
            Ok(outcome) => self.apply_install_outcome(outcome),
            Err(e) => {
                tracing::error!("Install failed for entry {index}: {e}");
                self.set_lifecycle(LauncherState::Failed);
            }
        }
    }

    /// One 10 ms tick: sample input, advance navigation, feed the watchdog,
    /// then pick up finished background work.
    pub fn tick(&mut self) {
        let sample = self.sampler.poll();

        let effects = self.nav.tick(&sample);
        self.handle_nav_effects(effects);

        let activity = sample.any_button_pressed() || self.keys.any_key_down();
        let events = self.watchdog.tick(activity);
        self.handle_watchdog_events(events);

        self.poll_check_task();
        self.poll_install_task();
    }

    fn handle_nav_effects(&mut self, effects: Vec<NavEffect>) {
        for effect in effects {
            match effect {
                NavEffect::ScreenChanged(screen) => self.display.set_screen(screen),
                NavEffect::HomeHighlight(index) => self.display.set_home_highlight(index),
                NavEffect::GameSelected { index, page } => {
                    self.publish_page(page);
                    let detail = if index >= 0 {
                        self.game_infos.get(index as usize).and_then(Option::as_ref)
                    } else {
                        None
                    };
                    self.display.set_game_detail(detail);
                }
                NavEffect::ShowAbout => {
                    tracing::info!("About: cabinet v{}", env!("CARGO_PKG_VERSION"));
                }
                NavEffect::PlayRequested(index) => self.handle_play(index),
                NavEffect::ExitedToStart => self.watchdog.schedule_deactivate(),
            }
        }
    }

    fn handle_watchdog_events(&mut self, events: Vec<WatchdogEvent>) {
        for event in events {
            match event {
                WatchdogEvent::Activated => {
                    let effects = self.nav.force_home();
                    self.handle_nav_effects(effects);
                }
                WatchdogEvent::Warned => {
                    tracing::warn!("Session idle: the running game will be closed shortly");
                }
                WatchdogEvent::Fired => {
                    let effects = self.nav.force_start();
                    self.handle_nav_effects(effects);
                    platform::reclaim_focus();
                }
                WatchdogEvent::ProcessExited => platform::reclaim_focus(),
            }
        }
    }

    /// Accept on a selected game: launch it when everything is in place,
    /// otherwise fall back to an update check (which is also the retry path
    /// out of the Failed state).
    fn handle_play(&mut self, index: usize) {
        if self.lifecycle.accepts_retry() {
            self.start_check(index);
            return;
        }
        if !self.lifecycle.accepts_play() {
            return;
        }

        let Some(info) = self.game_infos.get(index).and_then(Option::as_ref) else {
            self.start_check(index);
            return;
        };

        if !info.executable_path(&self.games_root).exists() {
            tracing::warn!("Executable missing for {}; re-checking", info.name);
            self.start_check(index);
            return;
        }

        if self.watchdog.has_running_process() {
            tracing::debug!("A game is already running; not spawning another");
            return;
        }

        match game::launch(&self.games_root, info) {
            Ok(child) => self.watchdog.attach_process(child),
            Err(e) => {
                tracing::error!("{e:#}");
                self.set_lifecycle(LauncherState::Failed);
            }
        }
    }

    /// Fetch the selected entry's remote metadata in the background; the
    /// decision is made on completion, on this context.
    fn start_check(&mut self, index: usize) {
        if self.install_task.is_some() || self.check_task.is_some() {
            return;
        }
        let Some(entry) = self.store.entry(index) else {
            return;
        };

        tracing::info!("Checking entry {index} for updates");
        let url = entry.info_url.clone();
        let http = self.http.clone();
        self.check_entry = index;
        self.check_task = Some(tokio::spawn(async move {
            http.get(&url)
                .send()
                .await?
                .error_for_status()?
                .json::<GameInfo>()
                .await
        }));
    }

    fn poll_check_task(&mut self) {
        match poll_task(&mut self.check_task) {
            PollResult::Complete(Ok(Ok(remote))) => {
                let index = self.check_entry;
                let local = self
                    .store
                    .entry(index)
                    .filter(|e| e.is_installed())
                    .and_then(|e| {
                        let path = game::local_info_path(&self.games_root, &e.folder_name);
                        game::read_local_info(&path).ok().flatten()
                    });

                match local {
                    Some(local) if !remote.version.differs(&local.version) => {
                        self.game_infos[index] = Some(local);
                        self.set_lifecycle(LauncherState::Ready);
                    }
                    Some(_) => self.start_install(remote, LauncherState::DownloadingUpdate),
                    None => self.start_install(remote, LauncherState::DownloadingGame),
                }
            }
            PollResult::Complete(Ok(Err(e))) => {
                tracing::error!("Update check failed: {e}");
                self.set_lifecycle(LauncherState::Failed);
            }
            PollResult::Complete(Err(e)) => {
                tracing::error!("Update check task panicked: {e}");
                self.set_lifecycle(LauncherState::Failed);
            }
            PollResult::Pending | PollResult::NoTask => {}
        }
    }

    fn start_install(&mut self, info: GameInfo, label: LauncherState) {
        if self.install_task.is_some() {
            return;
        }
        self.set_lifecycle(label);

        let request = InstallRequest {
            info,
            candidate_info_urls: self.store.info_urls(),
        };
        self.install_task = Some(tokio::spawn(install::install_game(
            self.http.clone(),
            self.games_root.clone(),
            request,
        )));
    }

    fn poll_install_task(&mut self) {
        match poll_task(&mut self.install_task) {
            PollResult::Complete(Ok(Ok(outcome))) => self.apply_install_outcome(outcome),
            PollResult::Complete(Ok(Err(e))) => {
                tracing::error!("Install failed: {e}");
                self.set_lifecycle(LauncherState::Failed);
            }
            PollResult::Complete(Err(e)) => {
                tracing::error!("Install task panicked: {e}");
                self.set_lifecycle(LauncherState::Failed);
            }
            PollResult::Pending | PollResult::NoTask => {}
        }
    }

    /// The three persistent writes after a finished install, plus display
    /// refreshes: catalog install pointer, local metadata document, and the
    /// in-memory record for the resolved slot.
    fn apply_install_outcome(&mut self, outcome: InstallOutcome) {
        let InstallOutcome { entry_index, info } = outcome;

        if let Err(e) = self.store.set_folder_name(entry_index, &info.folder_name) {
            tracing::error!("Failed to persist catalog after install: {e}");
        }
        if let Err(e) = game::write_local_info(&self.games_root, &info) {
            tracing::error!("Failed to persist game metadata: {e:#}");
        }

        if entry_index < self.game_infos.len() {
            self.game_infos[entry_index] = Some(info);
        }

        self.publish_page(entry_index / PAGE_SIZE);
        if self.nav.screen() == Screen::Selection
            && self.nav.state().game_index == entry_index as i32
        {
            let detail = self.game_infos[entry_index].as_ref();
            self.display.set_game_detail(detail);
        }

        self.set_lifecycle(LauncherState::Ready);
    }

    fn load_slot_from_disk(&mut self, index: usize) {
        let Some(entry) = self.store.entry(index) else {
            return;
        };
        let path = game::local_info_path(&self.games_root, &entry.folder_name);
        self.game_infos[index] = game::read_local_info(&path).ok().flatten();
    }

    fn title(&self, index: usize) -> String {
        match self.game_infos.get(index).and_then(Option::as_ref) {
            Some(info) => info.name.clone(),
            None => self
                .store
                .entry(index)
                .map(|e| e.display_name.clone())
                .unwrap_or_default(),
        }
    }

    /// Push the visible slice of the title list for one page, bounded by
    /// how much of the catalog has been revealed so far.
    fn publish_page(&mut self, page: usize) {
        let start = page * PAGE_SIZE;
        let end = (start + PAGE_SIZE).min(self.revealed);
        let titles: Vec<String> = (start..end).map(|i| self.title(i)).collect();
        self.display.set_game_list(page, &titles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogEntry};
    use crate::input::{
        ACCEPT_BUTTON, BUTTON_COUNT, ControllerSample, GamepadDevice,
    };
    use crate::version::Version;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Device whose sample the test mutates from outside.
    struct ScriptedPad(Rc<RefCell<ControllerSample>>);

    impl GamepadDevice for ScriptedPad {
        fn poll(&mut self) -> ControllerSample {
            self.0.borrow().clone()
        }
    }

    struct NoKeys;
    impl KeySource for NoKeys {
        fn any_key_down(&mut self) -> bool {
            false
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum DisplayCall {
        Screen(Screen),
        HomeHighlight(usize),
        GameList(usize, Vec<String>),
        Detail(Option<String>),
        Lifecycle(LauncherState),
    }

    #[derive(Clone, Default)]
    struct RecordingDisplay(Rc<RefCell<Vec<DisplayCall>>>);

    impl RecordingDisplay {
        fn calls(&self) -> Vec<DisplayCall> {
            self.0.borrow().clone()
        }
    }

    impl DisplaySink for RecordingDisplay {
        fn set_screen(&mut self, screen: Screen) {
            self.0.borrow_mut().push(DisplayCall::Screen(screen));
        }
        fn set_home_highlight(&mut self, index: usize) {
            self.0.borrow_mut().push(DisplayCall::HomeHighlight(index));
        }
        fn set_game_list(&mut self, page: usize, titles: &[String]) {
            self.0
                .borrow_mut()
                .push(DisplayCall::GameList(page, titles.to_vec()));
        }
        fn set_game_detail(&mut self, info: Option<&GameInfo>) {
            self.0
                .borrow_mut()
                .push(DisplayCall::Detail(info.map(|i| i.name.clone())));
        }
        fn set_lifecycle_label(&mut self, state: LauncherState) {
            self.0.borrow_mut().push(DisplayCall::Lifecycle(state));
        }
    }

    struct Fixture {
        app: LauncherApp,
        pad: Rc<RefCell<ControllerSample>>,
        display: RecordingDisplay,
        _root: TempDir,
    }

    fn entry(info_url: &str, folder: &str) -> CatalogEntry {
        CatalogEntry {
            display_name: String::new(),
            folder_name: folder.to_string(),
            info_url: info_url.to_string(),
            extra: serde_json::Map::new(),
        }
    }

    fn info(name: &str, folder: &str, version: &str) -> GameInfo {
        GameInfo {
            name: name.to_string(),
            version: Version::parse(version),
            authors: Vec::new(),
            description: String::new(),
            executable: "run.sh".to_string(),
            thumbnail: String::new(),
            tags: Vec::new(),
            zip_url: format!("https://example.invalid/{folder}.zip"),
            folder_name: folder.to_string(),
        }
    }

    fn fixture(entries: Vec<CatalogEntry>) -> Fixture {
        let root = TempDir::new().unwrap();
        let games_root = root.path().join("Games");
        std::fs::create_dir_all(&games_root).unwrap();

        let store = CatalogStore::open_for_tests(
            &games_root,
            &games_root.join("GameDatabase.json"),
            Catalog { games: entries },
        );

        let pad = Rc::new(RefCell::new(ControllerSample::default()));
        let display = RecordingDisplay::default();

        let app = LauncherApp::new(
            crate::catalog::build_http_client().unwrap(),
            games_root,
            store,
            InputSampler::new(Box::new(ScriptedPad(pad.clone()))),
            Box::new(NoKeys),
            Box::new(display.clone()),
        );

        Fixture {
            app,
            pad,
            display,
            _root: root,
        }
    }

    fn press(pad: &Rc<RefCell<ControllerSample>>, button: usize) {
        pad.borrow_mut().buttons[button] = true;
    }

    fn release_all(pad: &Rc<RefCell<ControllerSample>>) {
        pad.borrow_mut().buttons = [false; BUTTON_COUNT];
    }

    #[tokio::test]
    async fn first_activity_forces_home_screen() {
        let mut f = fixture(vec![entry("https://example.invalid/a.json", "")]);
        assert_eq!(f.app.nav.screen(), Screen::Start);

        press(&f.pad, ACCEPT_BUTTON);
        f.app.tick();

        assert_eq!(f.app.nav.screen(), Screen::Home);
        assert!(f.display.calls().contains(&DisplayCall::Screen(Screen::Home)));

        // The waking press must not have dispatched an accept as well.
        f.app.tick();
        assert_eq!(f.app.nav.screen(), Screen::Home);
    }

    #[tokio::test]
    async fn install_outcome_performs_all_three_writes() {
        let mut f = fixture(vec![
            entry("https://example.invalid/a.json", ""),
            entry("https://example.invalid/b.json", ""),
        ]);
        f.app.set_lifecycle(LauncherState::DownloadingGame);

        let installed = info("Star Courier", "StarCourier", "1.0.0");
        f.app.apply_install_outcome(InstallOutcome {
            entry_index: 1,
            info: installed.clone(),
        });

        // (a) catalog pointer persisted
        assert_eq!(f.app.store.entry(1).unwrap().folder_name, "StarCourier");
        // (b) metadata document on disk
        let path = game::local_info_path(&f.app.games_root, "StarCourier");
        assert_eq!(game::read_local_info(&path).unwrap().unwrap(), installed);
        // (c) in-memory record and lifecycle flip
        assert_eq!(f.app.game_infos[1].as_ref().unwrap().name, "Star Courier");
        assert_eq!(f.app.lifecycle(), LauncherState::Ready);
        assert!(
            f.display
                .calls()
                .contains(&DisplayCall::Lifecycle(LauncherState::Ready))
        );
    }

    #[tokio::test]
    async fn startup_sync_reveals_titles_one_at_a_time() {
        // Unreachable hosts: every entry fails its install, which must be
        // scoped per entry and still reveal titles in order.
        let mut f = fixture(vec![
            entry("https://game-db.invalid/a.json", ""),
            entry("https://game-db.invalid/b.json", ""),
        ]);

        f.app.startup_sync().await;

        let lists: Vec<(usize, usize)> = f
            .display
            .calls()
            .iter()
            .filter_map(|c| match c {
                DisplayCall::GameList(page, titles) => Some((*page, titles.len())),
                _ => None,
            })
            .collect();
        assert_eq!(lists, vec![(0, 1), (0, 2)]);
        assert_eq!(f.app.lifecycle(), LauncherState::Failed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn play_launches_once_and_tracks_the_process() {
        use std::os::unix::fs::PermissionsExt;

        let mut f = fixture(vec![entry("https://example.invalid/a.json", "Demo")]);

        // Materialize an installed game with a real executable.
        let game = info("Demo", "Demo", "1.0.0");
        let dir = f.app.games_root.join("Demo");
        std::fs::create_dir_all(&dir).unwrap();
        let exe = dir.join("run.sh");
        std::fs::write(&exe, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
        f.app.game_infos[0] = Some(game);

        f.app.handle_play(0);
        assert!(f.app.watchdog.has_running_process());
        assert_eq!(f.app.lifecycle(), LauncherState::Ready);

        // A second accept while running must not spawn another process.
        f.app.handle_play(0);
        assert!(f.app.watchdog.has_running_process());
    }

    #[tokio::test]
    async fn selection_effects_publish_detail_and_page() {
        let mut f = fixture(vec![entry("https://example.invalid/a.json", "Demo")]);
        f.app.game_infos[0] = Some(info("Demo", "Demo", "1.0.0"));

        // Wake to home, then accept the library option.
        press(&f.pad, ACCEPT_BUTTON);
        f.app.tick();
        release_all(&f.pad);
        for _ in 0..30 {
            f.app.tick();
        }
        press(&f.pad, ACCEPT_BUTTON);
        f.app.tick();

        assert_eq!(f.app.nav.screen(), Screen::Selection);
        let calls = f.display.calls();
        assert!(calls.contains(&DisplayCall::Screen(Screen::Selection)));
        assert!(
            calls
                .contains(&DisplayCall::GameList(0, vec!["Demo".to_string()]))
        );
        assert!(calls.contains(&DisplayCall::Detail(Some("Demo".to_string()))));
    }
}

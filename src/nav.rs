//! Menu navigation: screens, selection indices and input-to-transition
//! dispatch.
//!
//! Every transition routes through [`NavigationStateMachine::apply`]; there
//! are no per-screen handlers calling each other. The tick method turns a
//! controller sample into events (directional repeat with acceleration,
//! debounced accept/cancel) and returns the resulting [`NavEffect`]s for
//! the app to hand to the display sink.

use crate::input::{ACCEPT_BUTTON, CANCEL_BUTTON, ControllerSample, TICK_MS};

/// Repeat interval for the first directional move of a hold, in ms.
pub const BASE_REPEAT_INTERVAL_MS: u32 = 150;

/// Cap on the repeat acceleration counter.
pub const REPEAT_ACCEL_MAX: u32 = 10;

/// Divisor in the acceleration multiplier `1 - n / (max * 1.6)`. Together
/// with the cap this floors the repeat interval at 0.375 of the base.
const REPEAT_ACCEL_DIVISOR: f64 = 1.6;

/// Shared cooldown between accepted button actions of either kind, in ms.
pub const BUTTON_COOLDOWN_MS: u32 = 250;

/// Home screen options: 0 = open library, 1 = about, 2 = exit to start.
pub const HOME_OPTION_COUNT: usize = 3;

/// Title list slots per page.
pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Start,
    Home,
    Selection,
}

/// A navigation input event, after timing/debounce has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    MoveUp,
    MoveDown,
    Accept,
    Cancel,
}

/// What a transition asks the rest of the launcher to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEffect {
    ScreenChanged(Screen),
    HomeHighlight(usize),
    /// Selection moved; `index` of -1 is the "back" slot.
    GameSelected { index: i32, page: usize },
    ShowAbout,
    PlayRequested(usize),
    /// The user exited to the start screen; the watchdog should wind down
    /// its idle episode.
    ExitedToStart,
}

/// Navigation state, mutated only by the state machine.
#[derive(Debug, Clone)]
pub struct NavigationState {
    pub screen: Screen,
    pub home_index: usize,
    pub game_index: i32,
    pub page_index: usize,
    pub(crate) repeat_accel: u32,
    pub(crate) since_last_move_ms: u32,
    pub(crate) since_last_button_ms: u32,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            screen: Screen::Start,
            home_index: 0,
            game_index: 0,
            page_index: 0,
            repeat_accel: 0,
            since_last_move_ms: 0,
            since_last_button_ms: 0,
        }
    }
}

pub struct NavigationStateMachine {
    state: NavigationState,
    catalog_len: usize,
}

impl NavigationStateMachine {
    /// The catalog is index-stable for the session, so its size is fixed at
    /// construction.
    pub fn new(catalog_len: usize) -> Self {
        Self {
            state: NavigationState::default(),
            catalog_len,
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn screen(&self) -> Screen {
        self.state.screen
    }

    /// Current directional repeat interval. Shrinks toward
    /// `base * 0.375` as the acceleration counter grows.
    fn effective_interval_ms(&self) -> f64 {
        let multiplier = 1.0
            - self.state.repeat_accel as f64 / (REPEAT_ACCEL_MAX as f64 * REPEAT_ACCEL_DIVISOR);
        BASE_REPEAT_INTERVAL_MS as f64 * multiplier
    }

    /// Advance one tick: dispatch directional/button events from the sample
    /// (ignored on the start screen), then advance the repeat and cooldown
    /// timers. Releasing the stick for a full base interval resets the
    /// acceleration counter.
    pub fn tick(&mut self, sample: &ControllerSample) -> Vec<NavEffect> {
        let mut effects = Vec::new();

        if self.state.screen != Screen::Start {
            self.handle_direction(sample, &mut effects);
            self.handle_buttons(sample, &mut effects);
        }

        if self.state.since_last_move_ms > BASE_REPEAT_INTERVAL_MS {
            self.state.repeat_accel = 0;
        }
        self.state.since_last_move_ms += TICK_MS;
        self.state.since_last_button_ms += TICK_MS;

        effects
    }

    fn handle_direction(&mut self, sample: &ControllerSample, effects: &mut Vec<NavEffect>) {
        let direction = sample.vertical_direction();
        if direction == 0 {
            return;
        }
        if (self.state.since_last_move_ms as f64) < self.effective_interval_ms() {
            return;
        }

        self.state.since_last_move_ms = 0;
        if self.state.repeat_accel < REPEAT_ACCEL_MAX {
            self.state.repeat_accel += 1;
        }

        let event = if direction < 0 {
            NavEvent::MoveUp
        } else {
            NavEvent::MoveDown
        };
        self.apply(event, effects);
    }

    fn handle_buttons(&mut self, sample: &ControllerSample, effects: &mut Vec<NavEffect>) {
        // One cooldown for both buttons: an accepted action of either kind
        // silences the other for the full window.
        if self.state.since_last_button_ms > BUTTON_COOLDOWN_MS && sample.button(ACCEPT_BUTTON) {
            self.state.since_last_button_ms = 0;
            self.apply(NavEvent::Accept, effects);
        }

        if self.state.since_last_button_ms > BUTTON_COOLDOWN_MS && sample.button(CANCEL_BUTTON) {
            self.state.since_last_button_ms = 0;
            self.apply(NavEvent::Cancel, effects);
        }
    }

    /// Apply one navigation event to the current state.
    pub fn apply(&mut self, event: NavEvent, effects: &mut Vec<NavEffect>) {
        match (self.state.screen, event) {
            (Screen::Home, NavEvent::MoveUp) => {
                self.state.home_index = self.state.home_index.saturating_sub(1);
                effects.push(NavEffect::HomeHighlight(self.state.home_index));
            }
            (Screen::Home, NavEvent::MoveDown) => {
                self.state.home_index = (self.state.home_index + 1).min(HOME_OPTION_COUNT - 1);
                effects.push(NavEffect::HomeHighlight(self.state.home_index));
            }
            (Screen::Selection, NavEvent::MoveUp) => {
                self.state.game_index = (self.state.game_index - 1).max(-1);
                self.push_selection(effects);
            }
            (Screen::Selection, NavEvent::MoveDown) => {
                let last = self.catalog_len as i32 - 1;
                self.state.game_index = (self.state.game_index + 1).min(last);
                self.push_selection(effects);
            }
            (Screen::Home, NavEvent::Accept) => match self.state.home_index {
                0 => self.enter_selection(effects),
                1 => effects.push(NavEffect::ShowAbout),
                2 => self.exit_to_start(effects),
                _ => {}
            },
            (Screen::Selection, NavEvent::Accept) => {
                if self.state.game_index >= 0 {
                    effects.push(NavEffect::PlayRequested(self.state.game_index as usize));
                } else {
                    self.enter_home(effects);
                }
            }
            (Screen::Home, NavEvent::Cancel) => self.exit_to_start(effects),
            (Screen::Selection, NavEvent::Cancel) => self.enter_home(effects),
            (Screen::Start, _) => {}
        }
    }

    /// Force the home screen, as the watchdog does when a fresh idle
    /// episode starts. Also restarts the button cooldown so the waking
    /// press doesn't double as an accept.
    pub fn force_home(&mut self) -> Vec<NavEffect> {
        let mut effects = Vec::new();
        self.state.since_last_button_ms = 0;
        self.enter_home(&mut effects);
        effects
    }

    /// Force the start screen, as the watchdog does when it fires.
    pub fn force_start(&mut self) -> Vec<NavEffect> {
        self.state.screen = Screen::Start;
        vec![NavEffect::ScreenChanged(Screen::Start)]
    }

    fn enter_home(&mut self, effects: &mut Vec<NavEffect>) {
        self.state.screen = Screen::Home;
        self.state.home_index = 0;
        effects.push(NavEffect::ScreenChanged(Screen::Home));
        effects.push(NavEffect::HomeHighlight(0));
    }

    fn enter_selection(&mut self, effects: &mut Vec<NavEffect>) {
        self.state.screen = Screen::Selection;
        self.state.game_index = 0;
        effects.push(NavEffect::ScreenChanged(Screen::Selection));
        self.push_selection(effects);
    }

    fn exit_to_start(&mut self, effects: &mut Vec<NavEffect>) {
        self.state.screen = Screen::Start;
        effects.push(NavEffect::ScreenChanged(Screen::Start));
        effects.push(NavEffect::ExitedToStart);
    }

    fn push_selection(&mut self, effects: &mut Vec<NavEffect>) {
        // The "back" slot keeps whatever page was showing.
        if self.state.game_index >= 0 {
            self.state.page_index = self.state.game_index as usize / PAGE_SIZE;
        }
        effects.push(NavEffect::GameSelected {
            index: self.state.game_index,
            page: self.state.page_index,
        });
    }
}

//! Idle-timeout watchdog for the kiosk session.
//!
//! Tracks how long the cabinet has gone without input. The first activity
//! of an episode forces the home screen; a continuous activity-free span
//! first raises a warning and then fires: the running game process is
//! killed, the screen is forced back to start and the episode ends. This
//! is the only component allowed to terminate a game process.

use std::process::Child;

use crate::input::TICK_MS;

/// Idle span after which the warning condition is entered.
pub const WARN_AFTER_MS: u32 = 180_000;

/// Idle span after which the watchdog fires.
pub const FIRE_AFTER_MS: u32 = 185_000;

/// Delay between an exit-to-start action and the idle episode actually
/// ending, so the button press that triggered the exit doesn't immediately
/// start a new episode.
pub const EXIT_DEACTIVATE_DELAY_MS: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogEvent {
    /// First activity of a new idle episode: force the home screen.
    Activated,
    /// The warning threshold was crossed.
    Warned,
    /// The idle timeout elapsed: any running game was killed and the screen
    /// must return to start.
    Fired,
    /// The tracked game process exited on its own; focus returns to the
    /// launcher.
    ProcessExited,
}

pub struct SessionWatchdog {
    idle_active: bool,
    idle_elapsed_ms: u32,
    pending_deactivate_ms: Option<u32>,
    warned: bool,
    process: Option<Child>,
}

impl Default for SessionWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionWatchdog {
    pub fn new() -> Self {
        Self {
            idle_active: false,
            idle_elapsed_ms: 0,
            pending_deactivate_ms: None,
            warned: false,
            process: None,
        }
    }

    pub fn idle_active(&self) -> bool {
        self.idle_active
    }

    pub fn idle_elapsed_ms(&self) -> u32 {
        self.idle_elapsed_ms
    }

    /// Whether the session is currently inside the warning window.
    pub fn warning_active(&self) -> bool {
        self.idle_active && self.idle_elapsed_ms >= WARN_AFTER_MS
    }

    /// Track a freshly launched game process.
    pub fn attach_process(&mut self, child: Child) {
        tracing::info!("Tracking game process {}", child.id());
        self.process = Some(child);
    }

    pub fn has_running_process(&self) -> bool {
        self.process.is_some()
    }

    /// End the idle episode after [`EXIT_DEACTIVATE_DELAY_MS`].
    pub fn schedule_deactivate(&mut self) {
        self.pending_deactivate_ms = Some(EXIT_DEACTIVATE_DELAY_MS);
    }

    /// Advance one tick with the fused activity signal (any gamepad button
    /// held or any tracked keyboard key down).
    pub fn tick(&mut self, activity: bool) -> Vec<WatchdogEvent> {
        let mut events = Vec::new();

        if let Some(remaining) = self.pending_deactivate_ms {
            if remaining <= TICK_MS {
                self.pending_deactivate_ms = None;
                self.idle_active = false;
                self.idle_elapsed_ms = 0;
            } else {
                self.pending_deactivate_ms = Some(remaining - TICK_MS);
            }
        }

        if self.idle_active {
            // Only a continuous activity-free span can reach the timeout.
            if activity {
                self.idle_elapsed_ms = 0;
            }
        } else if activity {
            self.idle_active = true;
            self.idle_elapsed_ms = 0;
            events.push(WatchdogEvent::Activated);
        }

        if self.idle_elapsed_ms >= FIRE_AFTER_MS {
            self.idle_active = false;
            self.idle_elapsed_ms = 0;
            self.warned = false;
            self.kill_running_process();
            events.push(WatchdogEvent::Fired);
        } else if self.idle_elapsed_ms >= WARN_AFTER_MS {
            if !self.warned {
                self.warned = true;
                events.push(WatchdogEvent::Warned);
            }
        } else {
            self.warned = false;
        }

        if let Some(child) = &mut self.process {
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::info!("Game process exited with {status}");
                    self.process = None;
                    events.push(WatchdogEvent::ProcessExited);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Failed to poll game process: {e}");
                }
            }
        }

        if self.idle_active {
            self.idle_elapsed_ms += TICK_MS;
        }

        events
    }

    fn kill_running_process(&mut self) {
        let Some(mut child) = self.process.take() else {
            return;
        };

        match child.kill() {
            Ok(()) => {
                let _ = child.wait();
                tracing::info!("Killed idle game process {}", child.id());
            }
            Err(e) => tracing::warn!("Failed to kill game process {}: {e}", child.id()),
        }
    }
}

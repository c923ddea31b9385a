//! Adapters for the platform surfaces the core treats as external: the
//! gamepad device, raw keyboard state and window focus.

use anyhow::Result;
use gilrs::{Axis, Button, EventType, GamepadId, Gilrs};

use crate::input::{
    BUTTON_COUNT, ControllerSample, GamepadDevice, KeySource, STICK_MIDPOINT,
};

/// Half of the raw axis range the deadzone math expects (0..=65535 around
/// the 32767 midpoint). gilrs reports normalized -1.0..=1.0 values, so the
/// adapter reconstructs raw device units from them.
const AXIS_HALF_RANGE: f32 = 32_767.0;

fn raw_from_normalized(value: f32, inverted: bool) -> i32 {
    let signed = if inverted { -value } else { value };
    let raw = STICK_MIDPOINT as f32 + signed * AXIS_HALF_RANGE;
    raw.clamp(0.0, 2.0 * AXIS_HALF_RANGE + 1.0) as i32
}

/// Fixed slot for each named pad button. Accept/cancel sit at 0/1 to match
/// the cabinet wiring.
fn button_slot(button: Button) -> Option<usize> {
    let slot = match button {
        Button::South => 0,
        Button::East => 1,
        Button::West => 2,
        Button::North => 3,
        Button::LeftTrigger => 4,
        Button::RightTrigger => 5,
        Button::LeftTrigger2 => 6,
        Button::RightTrigger2 => 7,
        Button::Select => 8,
        Button::Start => 9,
        Button::LeftThumb => 10,
        Button::RightThumb => 11,
        Button::DPadUp => 12,
        Button::DPadDown => 13,
        Button::DPadLeft => 14,
        Button::DPadRight => 15,
        _ => return None,
    };
    (slot < BUTTON_COUNT).then_some(slot)
}

/// The first connected gamepad, polled through gilrs.
pub struct GilrsGamepad {
    gilrs: Gilrs,
    active: GamepadId,
    sample: ControllerSample,
}

impl GilrsGamepad {
    /// Open the first connected gamepad. A kiosk without one cannot be
    /// driven at all, so none found is an error the caller treats as fatal.
    pub fn open() -> Result<Self> {
        let gilrs = Gilrs::new()
            .map_err(|e| anyhow::anyhow!("failed to initialize gamepad backend: {e}"))?;

        let (active, pad) = gilrs
            .gamepads()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no gamepad or joystick connected"))?;

        tracing::info!("Using gamepad: {}", pad.name());
        Ok(Self {
            gilrs,
            active,
            sample: ControllerSample::default(),
        })
    }
}

impl GamepadDevice for GilrsGamepad {
    fn poll(&mut self) -> ControllerSample {
        while let Some(event) = self.gilrs.next_event() {
            if event.id != self.active {
                continue;
            }
            match event.event {
                EventType::AxisChanged(axis, value, _) => {
                    // gilrs points Y up; the cabinet's raw axes grow downward.
                    match axis {
                        Axis::LeftStickX => self.sample.left.x = raw_from_normalized(value, false),
                        Axis::LeftStickY => self.sample.left.y = raw_from_normalized(value, true),
                        Axis::RightStickX => {
                            self.sample.right.x = raw_from_normalized(value, false)
                        }
                        Axis::RightStickY => {
                            self.sample.right.y = raw_from_normalized(value, true)
                        }
                        _ => {}
                    }
                }
                EventType::ButtonPressed(button, _) => {
                    if let Some(slot) = button_slot(button) {
                        self.sample.buttons[slot] = true;
                    }
                }
                EventType::ButtonReleased(button, _) => {
                    if let Some(slot) = button_slot(button) {
                        self.sample.buttons[slot] = false;
                    }
                }
                EventType::Disconnected => {
                    // Don't leave a phantom hold behind an unplugged pad.
                    tracing::warn!("Gamepad disconnected");
                    self.sample = ControllerSample::default();
                }
                _ => {}
            }
        }

        self.sample.clone()
    }
}

/// Keyboard probe over raw OS key state (no event queue). The watchdog's
/// activity fuse polls this every tick.
pub struct SystemKeySource;

#[cfg(windows)]
impl KeySource for SystemKeySource {
    fn any_key_down(&mut self) -> bool {
        use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;

        // Virtual keys 8 (backspace) through 90 ('Z') cover everything the
        // cabinet's coin/service keyboard emits.
        (8..91).any(|vk| unsafe { GetAsyncKeyState(vk) } != 0)
    }
}

#[cfg(not(windows))]
impl KeySource for SystemKeySource {
    fn any_key_down(&mut self) -> bool {
        false
    }
}

/// Best-effort foreground focus for the launcher after a game exits or is
/// killed. Window chrome is owned by the rendering layer; this only nudges
/// the OS.
#[cfg(windows)]
pub fn reclaim_focus() {
    use windows::Win32::System::Console::GetConsoleWindow;
    use windows::Win32::UI::WindowsAndMessaging::SetForegroundWindow;

    unsafe {
        let hwnd = GetConsoleWindow();
        if !hwnd.is_invalid() {
            let _ = SetForegroundWindow(hwnd);
        }
    }
}

#[cfg(not(windows))]
pub fn reclaim_focus() {
    tracing::debug!("Focus reclaim requested (no-op on this platform)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{STICK_DEADZONE, axis_direction};

    #[test]
    fn normalized_axis_maps_back_to_raw_range() {
        assert_eq!(raw_from_normalized(0.0, false), STICK_MIDPOINT);
        assert!(raw_from_normalized(1.0, false) > STICK_MIDPOINT + STICK_DEADZONE);
        assert!(raw_from_normalized(-1.0, false) < STICK_MIDPOINT - STICK_DEADZONE);
    }

    #[test]
    fn stick_up_reads_as_negative_direction() {
        // gilrs up (+1.0) must land below the midpoint, the cabinet's "up".
        let raw = raw_from_normalized(1.0, true);
        assert_eq!(axis_direction(raw), -1);

        let raw = raw_from_normalized(-1.0, true);
        assert_eq!(axis_direction(raw), 1);
    }

    #[test]
    fn small_deflections_stay_inside_deadzone() {
        let raw = raw_from_normalized(0.1, false);
        assert_eq!(axis_direction(raw), 0);
    }

    #[test]
    fn named_buttons_have_stable_slots() {
        assert_eq!(button_slot(Button::South), Some(0));
        assert_eq!(button_slot(Button::East), Some(1));
        assert_eq!(button_slot(Button::Unknown), None);
    }
}

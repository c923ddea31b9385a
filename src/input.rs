//! Gamepad sampling and deadzone handling.
//!
//! The OS device itself lives behind [`GamepadDevice`]; the core only ever
//! sees one [`ControllerSample`] per tick. Axis values are raw device units
//! (0..=65535 on the cabinets this was written for), so stick directions are
//! derived from a dead band centred on the device midpoint rather than on
//! zero. Buttons are exposed raw; debouncing is the navigation layer's job.

/// Milliseconds between polls: one tick of the whole interactive loop.
pub const TICK_MS: u32 = 10;

/// Raw axis value at the stick's centre position.
pub const STICK_MIDPOINT: i32 = 32_767;

/// Dead band half-width around [`STICK_MIDPOINT`].
pub const STICK_DEADZONE: i32 = 7_700;

/// Size of the button state array reported per sample.
pub const BUTTON_COUNT: usize = 128;

/// Button index treated as "accept" by the navigation layer.
pub const ACCEPT_BUTTON: usize = 0;

/// Button index treated as "cancel" by the navigation layer.
pub const CANCEL_BUTTON: usize = 1;

/// Raw axis pair for one analog stick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickAxes {
    pub x: i32,
    pub y: i32,
}

impl StickAxes {
    /// A stick resting at the device midpoint.
    pub const CENTERED: StickAxes = StickAxes {
        x: STICK_MIDPOINT,
        y: STICK_MIDPOINT,
    };

    /// Deadzoned direction triple for this stick, one component per axis.
    pub fn direction(&self) -> (i8, i8) {
        (axis_direction(self.x), axis_direction(self.y))
    }
}

/// Map a raw axis value to -1/0/+1 around the midpoint dead band.
/// The boundary itself (midpoint ± deadzone) is inside the band.
pub fn axis_direction(raw: i32) -> i8 {
    if raw > STICK_MIDPOINT + STICK_DEADZONE {
        1
    } else if raw < STICK_MIDPOINT - STICK_DEADZONE {
        -1
    } else {
        0
    }
}

/// One polled controller snapshot.
#[derive(Debug, Clone)]
pub struct ControllerSample {
    pub left: StickAxes,
    pub right: StickAxes,
    pub buttons: [bool; BUTTON_COUNT],
}

impl Default for ControllerSample {
    fn default() -> Self {
        Self {
            left: StickAxes::CENTERED,
            right: StickAxes::CENTERED,
            buttons: [false; BUTTON_COUNT],
        }
    }
}

impl ControllerSample {
    pub fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }

    /// Any button held at all, used by the watchdog's fused activity signal.
    pub fn any_button_pressed(&self) -> bool {
        self.buttons.iter().any(|b| *b)
    }

    /// Vertical direction for menu movement: the left stick's Y if outside
    /// the dead band, otherwise the right stick's. Up is -1.
    pub fn vertical_direction(&self) -> i8 {
        let (_, left_y) = self.left.direction();
        let (_, right_y) = self.right.direction();
        if left_y == -1 || right_y == -1 {
            -1
        } else if left_y == 1 || right_y == 1 {
            1
        } else {
            0
        }
    }
}

/// Source of raw controller state, polled once per tick.
///
/// Production uses the gilrs adapter in [`crate::platform`]; tests drive the
/// sampler with scripted samples.
pub trait GamepadDevice {
    fn poll(&mut self) -> ControllerSample;
}

/// Source of "is any tracked keyboard key currently down", polled directly
/// from OS key state rather than an event queue.
pub trait KeySource {
    fn any_key_down(&mut self) -> bool;
}

/// Polls the gamepad once per tick and hands the sample to the rest of the
/// core. Thin by design: direction derivation lives on the sample so the
/// navigation layer and tests share it.
pub struct InputSampler {
    device: Box<dyn GamepadDevice>,
}

impl InputSampler {
    pub fn new(device: Box<dyn GamepadDevice>) -> Self {
        Self { device }
    }

    pub fn poll(&mut self) -> ControllerSample {
        self.device.poll()
    }
}

//! Input Decoder - Positional gamepad frame to named controls
//!
//! Joystick drivers deliver a flat frame of axis readings and button states.
//! This module maps the fixed Xbox-style index layout onto a [`DecodedInput`]
//! with one named field per stick, trigger, dpad axis and button.
//!
//! ```text
//! axes:    [LSX, LSY, LT, RSX, RSY, RT, DPX, DPY]
//! buttons: [A, B, X, Y, LB, RB, Select, Start, Guide, LS, RS]
//! ```
//!
//! Values are passed through unmodified; the decoder does not normalize or
//! filter anything.

use serde::{Deserialize, Serialize};

// Axis indices
const LEFT_STICK_X_AXIS: usize = 0;
const LEFT_STICK_Y_AXIS: usize = 1;
const LEFT_TRIGGER_AXIS: usize = 2;
const RIGHT_STICK_X_AXIS: usize = 3;
const RIGHT_STICK_Y_AXIS: usize = 4;
const RIGHT_TRIGGER_AXIS: usize = 5;
const DPAD_X_AXIS: usize = 6;
const DPAD_Y_AXIS: usize = 7;

// Button indices
const A_INDEX: usize = 0;
const B_INDEX: usize = 1;
const X_INDEX: usize = 2;
const Y_INDEX: usize = 3;
const LEFT_BUMPER_INDEX: usize = 4;
const RIGHT_BUMPER_INDEX: usize = 5;
const SELECT_INDEX: usize = 6;
const START_INDEX: usize = 7;
const GUIDE_INDEX: usize = 8;
const LEFT_STICK_BUTTON_INDEX: usize = 9;
const RIGHT_STICK_BUTTON_INDEX: usize = 10;

/// Minimum number of axes a frame must carry
pub const AXIS_COUNT: usize = 8;

/// Minimum number of buttons a frame must carry
pub const BUTTON_COUNT: usize = 11;

/// Raw controller sample as delivered by a joystick driver
///
/// Buttons are integers (non-zero means pressed) to match the usual joystick
/// message layout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputFrame {
    pub axes: Vec<f32>,
    pub buttons: Vec<i32>,
}

impl InputFrame {
    pub fn new(axes: Vec<f32>, buttons: Vec<i32>) -> Self {
        Self { axes, buttons }
    }
}

/// Which sequence of the frame was too short
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameSection {
    Axes,
    Buttons,
}

impl std::fmt::Display for FrameSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameSection::Axes => write!(f, "axes"),
            FrameSection::Buttons => write!(f, "buttons"),
        }
    }
}

// Decoder errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("Input frame out of range: {section} needs at least {required} entries, got {actual}")]
    OutOfRange {
        section: FrameSection,
        required: usize,
        actual: usize,
    },
}

/// Named view of a single controller sample
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedInput {
    // axes
    pub left_stick_x: f32,
    pub left_stick_y: f32,
    pub left_trigger: f32,
    pub right_stick_x: f32,
    pub right_stick_y: f32,
    pub right_trigger: f32,
    pub dpad_x: f32,
    pub dpad_y: f32,

    // buttons
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub left_bumper: bool,
    pub right_bumper: bool,
    pub select: bool,
    pub start: bool,
    pub guide_button: bool,
    pub left_stick_button: bool,
    pub right_stick_button: bool,
}

impl DecodedInput {
    /// Decodes a frame by fixed positional mapping
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfRange`] if the frame has fewer than [`AXIS_COUNT`]
    /// axes or fewer than [`BUTTON_COUNT`] buttons. Axes are checked first.
    pub fn decode(frame: &InputFrame) -> Result<Self, DecodeError> {
        if frame.axes.len() < AXIS_COUNT {
            return Err(DecodeError::OutOfRange {
                section: FrameSection::Axes,
                required: AXIS_COUNT,
                actual: frame.axes.len(),
            });
        }
        if frame.buttons.len() < BUTTON_COUNT {
            return Err(DecodeError::OutOfRange {
                section: FrameSection::Buttons,
                required: BUTTON_COUNT,
                actual: frame.buttons.len(),
            });
        }

        let axes = &frame.axes;
        let pressed = |index: usize| frame.buttons[index] != 0;

        Ok(Self {
            left_stick_x: axes[LEFT_STICK_X_AXIS],
            left_stick_y: axes[LEFT_STICK_Y_AXIS],
            left_trigger: axes[LEFT_TRIGGER_AXIS],
            right_stick_x: axes[RIGHT_STICK_X_AXIS],
            right_stick_y: axes[RIGHT_STICK_Y_AXIS],
            right_trigger: axes[RIGHT_TRIGGER_AXIS],
            dpad_x: axes[DPAD_X_AXIS],
            dpad_y: axes[DPAD_Y_AXIS],

            a: pressed(A_INDEX),
            b: pressed(B_INDEX),
            x: pressed(X_INDEX),
            y: pressed(Y_INDEX),
            left_bumper: pressed(LEFT_BUMPER_INDEX),
            right_bumper: pressed(RIGHT_BUMPER_INDEX),
            select: pressed(SELECT_INDEX),
            start: pressed(START_INDEX),
            guide_button: pressed(GUIDE_INDEX),
            left_stick_button: pressed(LEFT_STICK_BUTTON_INDEX),
            right_stick_button: pressed(RIGHT_STICK_BUTTON_INDEX),
        })
    }
}

impl TryFrom<&InputFrame> for DecodedInput {
    type Error = DecodeError;

    fn try_from(frame: &InputFrame) -> Result<Self, Self::Error> {
        Self::decode(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(axes: usize, buttons: usize) -> InputFrame {
        InputFrame::new(
            (0..axes).map(|i| i as f32 * 0.1).collect(),
            (0..buttons).map(|i| (i % 2) as i32).collect(),
        )
    }

    #[test]
    fn maps_axes_in_order() {
        let frame = InputFrame::new(
            vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8],
            vec![0; BUTTON_COUNT],
        );
        let input = DecodedInput::decode(&frame).unwrap();

        assert_eq!(input.left_stick_x, 0.1);
        assert_eq!(input.left_stick_y, 0.2);
        assert_eq!(input.left_trigger, 0.3);
        assert_eq!(input.right_stick_x, 0.4);
        assert_eq!(input.right_stick_y, 0.5);
        assert_eq!(input.right_trigger, 0.6);
        assert_eq!(input.dpad_x, 0.7);
        assert_eq!(input.dpad_y, 0.8);
    }

    #[test]
    fn maps_each_button_to_its_field() {
        let fields: [fn(&DecodedInput) -> bool; BUTTON_COUNT] = [
            |i| i.a,
            |i| i.b,
            |i| i.x,
            |i| i.y,
            |i| i.left_bumper,
            |i| i.right_bumper,
            |i| i.select,
            |i| i.start,
            |i| i.guide_button,
            |i| i.left_stick_button,
            |i| i.right_stick_button,
        ];

        for (index, field) in fields.iter().enumerate() {
            let mut buttons = vec![0; BUTTON_COUNT];
            buttons[index] = 1;
            let input = DecodedInput::decode(&InputFrame::new(vec![0.0; AXIS_COUNT], buttons))
                .unwrap();

            assert!(field(&input), "button {} not mapped", index);
            let pressed = fields.iter().filter(|f| f(&input)).count();
            assert_eq!(pressed, 1, "button {} leaked into other fields", index);
        }
    }

    #[test]
    fn any_non_zero_button_value_counts_as_pressed() {
        let mut buttons = vec![0; BUTTON_COUNT];
        buttons[X_INDEX] = -1;
        buttons[Y_INDEX] = 7;
        let input =
            DecodedInput::decode(&InputFrame::new(vec![0.0; AXIS_COUNT], buttons)).unwrap();

        assert!(input.x);
        assert!(input.y);
        assert!(!input.a);
    }

    #[test]
    fn out_of_range_values_pass_through() {
        let mut axes = vec![0.0; AXIS_COUNT];
        axes[LEFT_STICK_Y_AXIS] = 3.5;
        axes[DPAD_Y_AXIS] = -42.0;
        let input = DecodedInput::decode(&InputFrame::new(axes, vec![0; BUTTON_COUNT])).unwrap();

        assert_eq!(input.left_stick_y, 3.5);
        assert_eq!(input.dpad_y, -42.0);
    }

    #[test]
    fn decoding_is_deterministic_and_ignores_extra_entries() {
        let frame = frame_with(12, 15);
        let first = DecodedInput::decode(&frame).unwrap();
        let second = DecodedInput::try_from(&frame).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn short_axes_fail() {
        let err = DecodedInput::decode(&frame_with(7, BUTTON_COUNT)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::OutOfRange {
                section: FrameSection::Axes,
                required: AXIS_COUNT,
                actual: 7,
            }
        );
    }

    #[test]
    fn short_buttons_fail() {
        let err = DecodedInput::decode(&frame_with(AXIS_COUNT, 10)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::OutOfRange {
                section: FrameSection::Buttons,
                required: BUTTON_COUNT,
                actual: 10,
            }
        );
        assert!(err.to_string().contains("buttons"));
    }

    #[test]
    fn empty_frame_reports_axes_first() {
        let err = DecodedInput::decode(&InputFrame::default()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::OutOfRange {
                section: FrameSection::Axes,
                ..
            }
        ));
    }

    #[test]
    fn frame_deserializes_from_json() {
        let frame: InputFrame =
            serde_json::from_str(r#"{"axes":[0.0,1.0],"buttons":[1,0,1]}"#).unwrap();
        assert_eq!(frame.axes, vec![0.0, 1.0]);
        assert_eq!(frame.buttons, vec![1, 0, 1]);
    }
}

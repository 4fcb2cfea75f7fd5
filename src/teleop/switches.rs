//! Mode selection from decoded controller input
//!
//! Every mode switch except the emergency stop requires the deadman switch
//! (`X`) to be held. When several switches are active in the same frame the
//! first one in [`SelectedMode::PRIORITY`] wins.

use crate::controller::decoder::DecodedInput;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating mode requested by the operator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectedMode {
    Teleop,
    Autonomy,
    ReturnHome,
    Takeoff,
    Land,
    EmergencyStop,
}

impl SelectedMode {
    /// Emission order, first active switch wins
    pub const PRIORITY: [SelectedMode; 6] = [
        SelectedMode::Teleop,
        SelectedMode::Autonomy,
        SelectedMode::ReturnHome,
        SelectedMode::Takeoff,
        SelectedMode::Land,
        SelectedMode::EmergencyStop,
    ];

    /// Label published to the mode topic
    pub fn label(&self) -> &'static str {
        match self {
            SelectedMode::Teleop => "teleop",
            SelectedMode::Autonomy => "autonomy",
            SelectedMode::ReturnHome => "return_home",
            SelectedMode::Takeoff => "takeoff",
            SelectedMode::Land => "land",
            SelectedMode::EmergencyStop => "emergency_stop",
        }
    }
}

impl fmt::Display for SelectedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Boolean switches derived from one controller frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModeSwitches {
    pub deadman: bool,
    pub teleop: bool,
    pub autonomy: bool,
    pub return_home: bool,
    pub takeoff: bool,
    pub land: bool,
    pub emergency_stop: bool,
    pub turbo: bool,
    pub tank_drive: bool,
}

impl ModeSwitches {
    pub fn from_input(input: &DecodedInput) -> Self {
        let deadman = input.x;

        Self {
            deadman,
            teleop: deadman && input.y,
            autonomy: deadman && input.a,
            return_home: deadman && input.b,
            takeoff: deadman && input.dpad_y > 0.0,
            land: deadman && input.dpad_y < 0.0,
            // Emergency stop works without the deadman switch
            emergency_stop: input.left_stick_button && input.right_stick_button,
            turbo: input.right_bumper,
            tank_drive: input.left_bumper,
        }
    }

    fn is_active(&self, mode: SelectedMode) -> bool {
        match mode {
            SelectedMode::Teleop => self.teleop,
            SelectedMode::Autonomy => self.autonomy,
            SelectedMode::ReturnHome => self.return_home,
            SelectedMode::Takeoff => self.takeoff,
            SelectedMode::Land => self.land,
            SelectedMode::EmergencyStop => self.emergency_stop,
        }
    }

    /// Highest priority active mode, if any
    pub fn selected_mode(&self) -> Option<SelectedMode> {
        SelectedMode::PRIORITY
            .into_iter()
            .find(|mode| self.is_active(*mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> DecodedInput {
        DecodedInput::default()
    }

    #[test]
    fn nothing_pressed_selects_nothing() {
        assert_eq!(ModeSwitches::from_input(&input()).selected_mode(), None);
    }

    #[test]
    fn mode_buttons_need_deadman() {
        let mut i = input();
        i.y = true;
        i.a = true;
        i.b = true;
        i.dpad_y = 1.0;
        let switches = ModeSwitches::from_input(&i);

        assert!(!switches.deadman);
        assert_eq!(switches.selected_mode(), None);
    }

    #[test]
    fn teleop_wins_over_autonomy() {
        let mut i = input();
        i.x = true;
        i.y = true;
        i.a = true;
        assert_eq!(
            ModeSwitches::from_input(&i).selected_mode(),
            Some(SelectedMode::Teleop)
        );
    }

    #[test]
    fn each_mode_selected_alone() {
        let cases: [(fn(&mut DecodedInput), SelectedMode); 5] = [
            (|i| i.y = true, SelectedMode::Teleop),
            (|i| i.a = true, SelectedMode::Autonomy),
            (|i| i.b = true, SelectedMode::ReturnHome),
            (|i| i.dpad_y = 1.0, SelectedMode::Takeoff),
            (|i| i.dpad_y = -1.0, SelectedMode::Land),
        ];

        for (press, expected) in cases {
            let mut i = input();
            i.x = true;
            press(&mut i);
            assert_eq!(ModeSwitches::from_input(&i).selected_mode(), Some(expected));
        }
    }

    #[test]
    fn return_home_beats_takeoff_and_land_order() {
        let mut i = input();
        i.x = true;
        i.b = true;
        i.dpad_y = -1.0;
        i.left_stick_button = true;
        i.right_stick_button = true;
        assert_eq!(
            ModeSwitches::from_input(&i).selected_mode(),
            Some(SelectedMode::ReturnHome)
        );
    }

    #[test]
    fn emergency_stop_ignores_deadman() {
        let mut i = input();
        i.left_stick_button = true;
        i.right_stick_button = true;
        let switches = ModeSwitches::from_input(&i);

        assert!(!switches.deadman);
        assert_eq!(switches.selected_mode(), Some(SelectedMode::EmergencyStop));
    }

    #[test]
    fn emergency_stop_needs_both_stick_buttons() {
        let mut i = input();
        i.left_stick_button = true;
        assert_eq!(ModeSwitches::from_input(&i).selected_mode(), None);
    }

    #[test]
    fn land_loses_to_emergency_stop_only_when_inactive() {
        let mut i = input();
        i.x = true;
        i.dpad_y = -0.5;
        i.left_stick_button = true;
        i.right_stick_button = true;
        assert_eq!(
            ModeSwitches::from_input(&i).selected_mode(),
            Some(SelectedMode::Land)
        );
    }

    #[test]
    fn bumpers_drive_turbo_and_tank() {
        let mut i = input();
        i.right_bumper = true;
        i.left_bumper = true;
        let switches = ModeSwitches::from_input(&i);
        assert!(switches.turbo);
        assert!(switches.tank_drive);
        assert_eq!(switches.selected_mode(), None);
    }

    #[test]
    fn labels_match_topic_strings() {
        let labels: Vec<String> = SelectedMode::PRIORITY
            .iter()
            .map(|m| m.to_string())
            .collect();
        assert_eq!(
            labels,
            [
                "teleop",
                "autonomy",
                "return_home",
                "takeoff",
                "land",
                "emergency_stop"
            ]
        );
        assert_eq!(
            serde_json::to_string(&SelectedMode::ReturnHome).unwrap(),
            "\"return_home\""
        );
    }
}

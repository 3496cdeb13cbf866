//! Time-driven parameter schedules: epidemic waves and vaccine rollout.

use crate::params::{ParamKind, Params};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long waves mode waits between parameter shifts.
const WAVE_PERIOD: Duration = Duration::from_secs(5);
/// Mutation change applied per wave shift.
const WAVE_MUTATION_STEP: f64 = 0.1;
/// Recovery change applied per wave shift.
const WAVE_RECOVERY_STEP: f64 = 0.05;
/// Recovery never drops below this in waves mode.
const WAVE_RECOVERY_FLOOR: f64 = 0.05;
/// Mutation level at which the wave direction turns around.
const WAVE_TURNAROUND: f64 = 0.2;
/// Recovery gained per step while vaccine mode is active.
const VACCINE_RECOVERY_STEP: f64 = 0.005;

/// Active parameter schedule. At most one is in effect at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Off,
    Waves,
    Vaccine,
}

/// Adjusts the simulation parameters over elapsed time.
///
/// Advisory only: every adjustment goes through the clamped parameter
/// setters, so there are no failure states. Elapsed time is injected by the
/// caller, never read from a clock here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeController {
    mode: Mode,
    // The wall-clock epoch does not survive a checkpoint, so the shift
    // timer restarts with the process.
    #[serde(skip)]
    last_shift: Duration,
}

impl ModeController {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            last_shift: Duration::ZERO,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch the active schedule. Entering waves stamps the shift timer so
    /// the first oscillation waits a full period.
    pub fn set_mode(&mut self, mode: Mode, elapsed: Duration) {
        if mode == Mode::Waves && self.mode != Mode::Waves {
            self.last_shift = elapsed;
        }
        self.mode = mode;
    }

    /// Apply the active schedule's adjustment for one step.
    ///
    /// Waves fire once per period: towards higher mutation and lower
    /// recovery while mutation sits below the turnaround level, and back
    /// again once it has crossed it. Vaccine ramps recovery every step.
    pub fn apply(&mut self, params: &mut Params, elapsed: Duration) {
        match self.mode {
            Mode::Off => {}
            Mode::Vaccine => {
                params.set(
                    ParamKind::Recovery,
                    params.recovery() + VACCINE_RECOVERY_STEP,
                );
            }
            Mode::Waves => {
                if elapsed.saturating_sub(self.last_shift) < WAVE_PERIOD {
                    return;
                }

                let mutation = params.mutation();
                let recovery = params.recovery();
                if mutation < WAVE_TURNAROUND {
                    params.set(ParamKind::Mutation, mutation + WAVE_MUTATION_STEP);
                    params.set(
                        ParamKind::Recovery,
                        (recovery - WAVE_RECOVERY_STEP).max(WAVE_RECOVERY_FLOOR),
                    );
                } else {
                    params.set(ParamKind::Mutation, mutation - WAVE_MUTATION_STEP);
                    params.set(ParamKind::Recovery, recovery + WAVE_RECOVERY_STEP);
                }

                self.last_shift = elapsed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn off_leaves_params_alone() {
        let mut ctrl = ModeController::new(Mode::Off);
        let mut params = Params::new(0.3, 0.3, 0.3, 0.3, 0.3);
        let before = params;
        ctrl.apply(&mut params, secs(100));
        assert_eq!(params, before);
    }

    #[test]
    fn vaccine_ramps_recovery_every_step() {
        let mut ctrl = ModeController::new(Mode::Vaccine);
        let mut params = Params::new(0.3, 0.5, 0.3, 0.3, 0.3);
        for _ in 0..10 {
            ctrl.apply(&mut params, Duration::ZERO);
        }
        assert!((params.recovery() - 0.55).abs() < 1e-12);
    }

    #[test]
    fn vaccine_caps_recovery_at_one() {
        let mut ctrl = ModeController::new(Mode::Vaccine);
        let mut params = Params::new(0.3, 0.999, 0.3, 0.3, 0.3);
        for _ in 0..10 {
            ctrl.apply(&mut params, Duration::ZERO);
        }
        assert_eq!(params.recovery(), 1.0);
    }

    #[test]
    fn waves_wait_a_full_period() {
        let mut ctrl = ModeController::new(Mode::Waves);
        let mut params = Params::new(0.3, 0.5, 0.3, 0.3, 0.1);
        let before = params;

        ctrl.apply(&mut params, Duration::from_millis(4_900));
        assert_eq!(params, before);

        ctrl.apply(&mut params, secs(5));
        assert!((params.mutation() - 0.2).abs() < 1e-12);
        assert!((params.recovery() - 0.45).abs() < 1e-12);
    }

    #[test]
    fn waves_direction_flips_at_turnaround() {
        let mut ctrl = ModeController::new(Mode::Waves);
        let mut params = Params::new(0.3, 0.5, 0.3, 0.3, 0.15);

        // Below 0.2: mutation rises, recovery falls.
        ctrl.apply(&mut params, secs(5));
        assert!((params.mutation() - 0.25).abs() < 1e-12);
        assert!((params.recovery() - 0.45).abs() < 1e-12);

        // Now at 0.25: the shift reverses.
        ctrl.apply(&mut params, secs(10));
        assert!((params.mutation() - 0.15).abs() < 1e-12);
        assert!((params.recovery() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn waves_hold_the_recovery_floor() {
        let mut ctrl = ModeController::new(Mode::Waves);
        let mut params = Params::new(0.3, 0.07, 0.3, 0.3, 0.0);
        ctrl.apply(&mut params, secs(5));
        assert!((params.recovery() - 0.05).abs() < 1e-12);

        let mut params = Params::new(0.3, 0.02, 0.3, 0.3, 0.0);
        ctrl.apply(&mut params, secs(10));
        assert!((params.recovery() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn entering_waves_restarts_the_timer() {
        let mut ctrl = ModeController::new(Mode::Off);
        let mut params = Params::new(0.3, 0.5, 0.3, 0.3, 0.1);
        ctrl.set_mode(Mode::Waves, secs(7));

        let before = params;
        ctrl.apply(&mut params, secs(11));
        assert_eq!(params, before);

        ctrl.apply(&mut params, secs(12));
        assert_ne!(params, before);
    }

    #[test]
    fn modes_are_mutually_exclusive() {
        let mut ctrl = ModeController::new(Mode::Waves);
        ctrl.set_mode(Mode::Vaccine, Duration::ZERO);
        assert_eq!(ctrl.mode(), Mode::Vaccine);
        ctrl.set_mode(Mode::Off, Duration::ZERO);
        assert_eq!(ctrl.mode(), Mode::Off);
    }
}

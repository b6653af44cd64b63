//! Timed button presses
//!
//! A client command is a single press, but the game polls the joypad once per
//! frame. Each press therefore holds its line for a number of frames, then
//! releases it for a number of frames so a repeated press registers as a new
//! edge.

use statecast_shared::Button;

use crate::emulator::{Emulator, EmulatorFault};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Idle,
    Held {
        remaining: u32,
    },
    Releasing {
        remaining: u32,
    },
}

#[derive(Debug, Clone, Copy, Default)]
struct Line {
    phase: Phase,
    /// Presses waiting for the line to go idle
    pending: u32,
}

/// Per-button hold/release scheduler.
///
/// Call [`ButtonTimer::before_step`] and [`ButtonTimer::after_step`] around
/// every emulator frame.
#[derive(Debug, Clone)]
pub struct ButtonTimer {
    lines: [Line; Button::ALL.len()],
    hold_frames: u32,
    release_frames: u32,
}

impl ButtonTimer {
    /// Both phases are clamped to at least one frame, so back-to-back
    /// presses of one button always see a released frame between them.
    pub fn new(hold_frames: u32, release_frames: u32) -> Self {
        Self {
            lines: [Line::default(); Button::ALL.len()],
            hold_frames: hold_frames.max(1),
            release_frames: release_frames.max(1),
        }
    }

    /// Queue a press. Presses of a busy button wait their turn.
    pub fn press(&mut self, button: Button) {
        let line = &mut self.lines[button.index()];
        line.pending = line.pending.saturating_add(1);
    }

    /// Start queued presses on idle lines.
    ///
    /// Returns how many lines went down.
    pub fn before_step(&mut self, emulator: &mut impl Emulator) -> Result<usize, EmulatorFault> {
        let mut started = 0;
        for button in Button::ALL {
            let line = &mut self.lines[button.index()];
            if line.phase == Phase::Idle && line.pending > 0 {
                emulator.set_button(button, true)?;
                line.pending -= 1;
                line.phase = Phase::Held {
                    remaining: self.hold_frames,
                };
                started += 1;
            }
        }
        Ok(started)
    }

    /// Count down the frame that was just stepped.
    pub fn after_step(&mut self, emulator: &mut impl Emulator) -> Result<(), EmulatorFault> {
        for button in Button::ALL {
            let line = &mut self.lines[button.index()];
            line.phase = match line.phase {
                Phase::Idle => Phase::Idle,
                Phase::Held { remaining: 0 | 1 } => {
                    emulator.set_button(button, false)?;
                    Phase::Releasing {
                        remaining: self.release_frames,
                    }
                }
                Phase::Held { remaining } => Phase::Held {
                    remaining: remaining - 1,
                },
                Phase::Releasing { remaining: 0 | 1 } => Phase::Idle,
                Phase::Releasing { remaining } => Phase::Releasing {
                    remaining: remaining - 1,
                },
            };
        }
        Ok(())
    }

    pub fn is_held(&self, button: Button) -> bool {
        matches!(self.lines[button.index()].phase, Phase::Held { .. })
    }

    /// No press running or queued on any line
    pub fn is_idle(&self) -> bool {
        self.lines
            .iter()
            .all(|line| line.phase == Phase::Idle && line.pending == 0)
    }

    /// Presses still waiting for `button`
    pub fn pending(&self, button: Button) -> u32 {
        self.lines[button.index()].pending
    }

    /// Drop queued presses and release every held line.
    pub fn clear(&mut self, emulator: &mut impl Emulator) -> Result<(), EmulatorFault> {
        for button in Button::ALL {
            let line = &mut self.lines[button.index()];
            if matches!(line.phase, Phase::Held { .. }) {
                emulator.set_button(button, false)?;
            }
            *line = Line::default();
        }
        Ok(())
    }
}

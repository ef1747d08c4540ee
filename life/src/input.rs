//! Toolkit-independent pointer input.
//!
//! Hosts convert their own events into [`InputEvent`]s in canvas pixel
//! coordinates. [`translate`] turns one event into at most one [`Command`]
//! without side effects; [`InputState::observe`] then records which buttons
//! are held so the next translation sees them.

use crate::canvas::Canvas;

/// Interval change per scroll-wheel notch, in milliseconds.
pub const INTERVAL_STEP_MS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Pressed { button: Button, at: [f32; 2] },
    Released { button: Button, at: [f32; 2] },
    Moved { at: [f32; 2] },
    /// Positive steps scroll away from the user.
    Scrolled { steps: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleCell { x: usize, y: usize },
    ForcePause,
    /// Fresh seed, then unpause.
    ReseedAndResume,
    TogglePause,
    /// Rewind to the last seed, then toggle pause.
    ReseedReusedAndTogglePause,
    AdjustInterval(i64),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputState {
    primary_held: bool,
    secondary_held: bool,
    /// A secondary press paused the simulation and its release should reseed.
    forced_pause: bool,
    /// Last cell toggled by the current primary drag.
    drag_cell: Option<(usize, usize)>,
}

impl InputState {
    /// Record the effect of `event` on held buttons and drag tracking.
    /// `paused` is the state before the event: a secondary press only arms
    /// the reseed-on-release when it is the press that paused the simulation.
    pub fn observe(&mut self, event: &InputEvent, paused: bool, canvas: &Canvas) {
        match *event {
            InputEvent::Pressed { button: Button::Primary, at } => {
                self.primary_held = true;
                self.drag_cell = canvas.cell_at(at);
            }
            InputEvent::Released { button: Button::Primary, .. } => {
                self.primary_held = false;
                self.drag_cell = None;
            }
            InputEvent::Pressed { button: Button::Secondary, .. } => {
                self.secondary_held = true;
                self.forced_pause = !paused;
            }
            InputEvent::Released { button: Button::Secondary, .. } => {
                self.secondary_held = false;
                self.forced_pause = false;
            }
            InputEvent::Moved { at } if self.primary_held => {
                if let Some(cell) = canvas.cell_at(at) {
                    self.drag_cell = Some(cell);
                }
            }
            _ => {}
        }
    }
}

/// Map one event to the command it triggers, given the state before the event.
pub fn translate(event: &InputEvent, state: &InputState, paused: bool, canvas: &Canvas) -> Option<Command> {
    match *event {
        InputEvent::Pressed { button: Button::Primary, at } if paused => {
            let (x, y) = canvas.cell_at(at)?;
            Some(Command::ToggleCell { x, y })
        }
        InputEvent::Moved { at } if paused && state.primary_held => {
            let cell = canvas.cell_at(at)?;
            if state.drag_cell == Some(cell) {
                return None;
            }
            let (x, y) = cell;
            Some(Command::ToggleCell { x, y })
        }
        InputEvent::Pressed { button: Button::Secondary, .. } => Some(Command::ForcePause),
        InputEvent::Released { button: Button::Secondary, .. } if paused && state.forced_pause => {
            Some(Command::ReseedAndResume)
        }
        InputEvent::Pressed { button: Button::Middle, .. } if state.secondary_held => {
            Some(Command::ReseedReusedAndTogglePause)
        }
        InputEvent::Pressed { button: Button::Middle, .. } => Some(Command::TogglePause),
        InputEvent::Scrolled { steps } if steps != 0 => Some(Command::AdjustInterval(i64::from(steps) * INTERVAL_STEP_MS)),
        _ => None,
    }
}

//! Pointer gesture state machine.
//!
//! Turns raw pointer messages into camera and map commands. Exactly one
//! continuous gesture (pan or paint) is active at a time, chosen by the
//! button that started it.

use crate::config::InputConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Screen-space pointer input, independent of any UI toolkit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { button: PointerButton, x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up { button: PointerButton, x: f64, y: f64 },
    /// Pointer left the surface.
    Leave,
    /// Positive `delta_y` scrolls away (zoom out).
    Wheel { delta_y: f64, x: f64, y: f64 },
}

/// Play mode selects provinces; edit mode paints ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Play,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Primary button down in play mode; a click until it travels past the
    /// drag threshold.
    Pressed { origin: (f64, f64) },
    Panning { last: (f64, f64) },
    Painting { erase: bool },
}

/// What the engine should do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputCommand {
    PanBy { dx: f64, dy: f64 },
    ZoomAt { factor: f64, x: f64, y: f64 },
    Select { x: f64, y: f64 },
    Paint { x: f64, y: f64, erase: bool },
    Hover { x: f64, y: f64 },
    ClearHover,
}

#[derive(Debug, Clone, Default)]
pub struct GestureMachine {
    gesture: Gesture,
    config: InputConfig,
}

impl GestureMachine {
    pub fn new(config: InputConfig) -> Self {
        Self {
            gesture: Gesture::Idle,
            config,
        }
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    /// Drops any gesture in progress.
    pub fn cancel(&mut self) {
        self.gesture = Gesture::Idle;
    }

    pub fn handle(&mut self, event: PointerEvent, mode: InteractionMode) -> Vec<InputCommand> {
        match event {
            PointerEvent::Down { button, x, y } => self.on_down(button, x, y, mode),
            PointerEvent::Move { x, y } => self.on_move(x, y),
            PointerEvent::Up { button, x, y } => {
                let mut commands = Vec::new();
                if let (Gesture::Pressed { origin }, PointerButton::Primary) = (self.gesture, button)
                {
                    let threshold = self.config.drag_threshold;
                    if (x - origin.0).abs() < threshold && (y - origin.1).abs() < threshold {
                        commands.push(InputCommand::Select { x, y });
                    }
                }
                self.gesture = Gesture::Idle;
                commands.push(InputCommand::Hover { x, y });
                commands
            }
            PointerEvent::Leave => {
                self.gesture = Gesture::Idle;
                vec![InputCommand::ClearHover]
            }
            PointerEvent::Wheel { delta_y, x, y } => {
                let factor = if delta_y > 0.0 {
                    self.config.wheel_zoom_out
                } else {
                    self.config.wheel_zoom_in
                };
                vec![InputCommand::ZoomAt { factor, x, y }]
            }
        }
    }

    fn on_down(
        &mut self,
        button: PointerButton,
        x: f64,
        y: f64,
        mode: InteractionMode,
    ) -> Vec<InputCommand> {
        let (gesture, commands) = match (button, mode) {
            (PointerButton::Primary, InteractionMode::Edit) => (
                Gesture::Painting { erase: false },
                vec![InputCommand::Paint { x, y, erase: false }],
            ),
            (PointerButton::Secondary, InteractionMode::Edit) => (
                Gesture::Painting { erase: true },
                vec![InputCommand::Paint { x, y, erase: true }],
            ),
            (PointerButton::Primary, InteractionMode::Play) => {
                (Gesture::Pressed { origin: (x, y) }, Vec::new())
            }
            (PointerButton::Middle, _) => (Gesture::Panning { last: (x, y) }, Vec::new()),
            (PointerButton::Secondary, InteractionMode::Play) => (Gesture::Idle, Vec::new()),
        };
        self.gesture = gesture;
        commands
    }

    fn on_move(&mut self, x: f64, y: f64) -> Vec<InputCommand> {
        match self.gesture {
            Gesture::Idle => vec![InputCommand::Hover { x, y }],
            Gesture::Pressed { origin } => {
                let threshold = self.config.drag_threshold;
                if (x - origin.0).abs() > threshold || (y - origin.1).abs() > threshold {
                    self.gesture = Gesture::Panning { last: (x, y) };
                    vec![InputCommand::PanBy {
                        dx: x - origin.0,
                        dy: y - origin.1,
                    }]
                } else {
                    Vec::new()
                }
            }
            Gesture::Panning { last } => {
                self.gesture = Gesture::Panning { last: (x, y) };
                vec![InputCommand::PanBy {
                    dx: x - last.0,
                    dy: y - last.1,
                }]
            }
            Gesture::Painting { erase } => vec![InputCommand::Paint { x, y, erase }],
        }
    }
}

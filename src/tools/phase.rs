use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionPhase {
    #[default]
    Idle,
    /// Single-drag shapes and the marquee.
    Drawing,
    /// Polygon and crop vertex collection.
    MultiPointCollecting,
    Panning,
    /// Live move of the selection.
    Transforming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    BeginDraw,
    BeginCollect,
    AppendVertex,
    BeginPan,
    BeginTransform,
    Release,
    Finish,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: InteractionPhase,
    pub event: PhaseEvent,
    pub to: InteractionPhase,
}

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid tool transition: from {from:?} using event {event:?}")]
    InvalidTransition {
        from: InteractionPhase,
        event: PhaseEvent,
    },
}

#[derive(Debug, Default)]
pub struct PhaseMachine {
    phase: InteractionPhase,
    last: Option<PhaseTransition>,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> InteractionPhase {
        self.phase
    }

    pub fn last_transition(&self) -> Option<PhaseTransition> {
        self.last
    }

    pub fn can_transition(&self, event: PhaseEvent) -> bool {
        self.next_phase(event).is_some()
    }

    pub fn next_phase(&self, event: PhaseEvent) -> Option<InteractionPhase> {
        use InteractionPhase::*;
        use PhaseEvent::*;
        match (self.phase, event) {
            (Idle, BeginDraw) => Some(Drawing),
            (Idle, BeginCollect) => Some(MultiPointCollecting),
            (Idle, BeginPan) => Some(Panning),
            (Idle, BeginTransform) => Some(Transforming),
            (MultiPointCollecting, AppendVertex) => Some(MultiPointCollecting),
            (MultiPointCollecting, Finish) => Some(Idle),
            (Drawing | Panning | Transforming, Release) => Some(Idle),
            (_, Cancel) => Some(Idle),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: PhaseEvent) -> StateResult<InteractionPhase> {
        tracing::trace!(from = ?self.phase, event = ?event, "request tool transition");
        let next = self.next_phase(event).ok_or_else(|| {
            let from = self.phase;
            tracing::warn!(from = ?from, event = ?event, "invalid tool transition requested");
            StateError::InvalidTransition { from, event }
        })?;
        self.last = Some(PhaseTransition {
            from: self.phase,
            event,
            to: next,
        });
        self.phase = next;
        Ok(next)
    }
}

impl std::fmt::Display for PhaseMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InteractionPhase::{:?}", self.phase)
    }
}

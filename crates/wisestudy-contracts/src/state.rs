use std::sync::Arc;

use crate::analysis::AnalysisResult;

/// Single application mode. Exactly one result or error message is live.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AppState {
    #[default]
    Idle,
    Analyzing,
    Success(Arc<AnalysisResult>),
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    Submit,
    Succeed(AnalysisResult),
    Fail(String),
    Reset,
}

impl StateEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Succeed(_) => "succeed",
            Self::Fail(_) => "fail",
            Self::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event '{event}' is not valid while {state}")]
pub struct InvalidTransition {
    pub state: &'static str,
    pub event: &'static str,
}

impl AppState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Analyzing => "analyzing",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
        }
    }

    pub fn is_analyzing(&self) -> bool {
        matches!(self, Self::Analyzing)
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Success(result) => Some(result.as_ref()),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message.as_str()),
            _ => None,
        }
    }

    /// Applies one event. On an invalid transition `self` is left unchanged.
    ///
    /// `Submit` from any settled state discards the previous result or
    /// message. There is no cancellation, so `Reset` is refused mid-flight.
    pub fn apply(&mut self, event: StateEvent) -> Result<(), InvalidTransition> {
        let next = match (&*self, event) {
            (Self::Analyzing, StateEvent::Succeed(result)) => Self::Success(Arc::new(result)),
            (Self::Analyzing, StateEvent::Fail(message)) => Self::Error(message),
            (Self::Analyzing, other) => return Err(self.invalid(&other)),
            (_, StateEvent::Submit) => Self::Analyzing,
            (_, StateEvent::Reset) => Self::Idle,
            (_, other) => return Err(self.invalid(&other)),
        };
        *self = next;
        Ok(())
    }

    fn invalid(&self, event: &StateEvent) -> InvalidTransition {
        InvalidTransition {
            state: self.name(),
            event: event.name(),
        }
    }
}

//! Errors the engine reports to its owning collaborator.
//!
//! Only fatal conditions live here. A failed model fetch or decode is recovered
//! locally with the fallback token and never becomes an [`EngineError`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The rendering context could not be acquired; the engine never reached `Ready`.
    #[error("failed to initialize rendering context")]
    ContextUnavailable(String),

    /// The token model neither loaded nor failed before the deadline.
    #[error("model loading timed out")]
    ModelLoadTimedOut,

    /// The surface or device became invalid while running.
    #[error("rendering context lost")]
    ContextLost,
}

impl EngineError {
    /// Detail of the underlying cause, when there is one.
    pub fn cause(&self) -> Option<&str> {
        match self {
            EngineError::ContextUnavailable(cause) => Some(cause),
            EngineError::ModelLoadTimedOut | EngineError::ContextLost => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_render_collaborator_messages() {
        assert_eq!(
            EngineError::ContextUnavailable("no adapter".into()).to_string(),
            "failed to initialize rendering context"
        );
        assert_eq!(EngineError::ModelLoadTimedOut.to_string(), "model loading timed out");
        assert_eq!(EngineError::ContextLost.to_string(), "rendering context lost");
    }

    #[test]
    fn should_keep_acquisition_cause() {
        let err = EngineError::ContextUnavailable("no adapter".into());
        assert_eq!(err.cause(), Some("no adapter"));
        assert_eq!(EngineError::ContextLost.cause(), None);
    }
}

use uuid::Uuid;

/// Tap engine state machine.
///
/// State transitions:
/// ```text
/// idle ──(sink: none → some)──→ tap installed ──(sink: some → none)──→ idle
/// ```
/// Swapping one attached sink for another stays in `TapInstalled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TapState {
    #[default]
    Idle,
    TapInstalled { session_id: Uuid },
}

impl TapState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_installed(&self) -> bool {
        matches!(self, Self::TapInstalled { .. })
    }

    /// Identifier of the tap session backing the installed tap.
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            Self::TapInstalled { session_id } => Some(*session_id),
            Self::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        let state = TapState::default();
        assert!(state.is_idle());
        assert_eq!(state.session_id(), None);
    }

    #[test]
    fn installed_exposes_session() {
        let id = Uuid::new_v4();
        let state = TapState::TapInstalled { session_id: id };
        assert!(state.is_installed());
        assert_eq!(state.session_id(), Some(id));
    }
}

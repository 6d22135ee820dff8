use thiserror::Error;

/// Lifecycle phase of the question slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlotPhase {
    /// No question is live.
    #[default]
    Empty,
    /// A question is posted and accepting answers.
    Posted,
    /// Someone claimed the question; it stays observable until the slot is reset.
    Resolved,
}

/// Events that can be applied to the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotEvent {
    /// A freshly generated question was posted.
    Post,
    /// A correct or partially correct answer claimed the question.
    Resolve,
    /// The question was abandoned (admin or inactivity).
    Skip,
    /// Clear the slot; a no-op when already empty.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the slot was in when the invalid event was received.
    pub from: SlotPhase,
    /// The event that cannot be applied from this phase.
    pub event: SlotEvent,
}

/// `Empty -> Posted -> {Resolved | Skipped} -> Empty`, where a skip lands straight on `Empty`.
#[derive(Debug, Clone, Default)]
pub struct SlotMachine {
    phase: SlotPhase,
}

impl SlotMachine {
    /// Current phase.
    pub fn phase(&self) -> SlotPhase {
        self.phase
    }

    /// Validate and apply `event`, returning the new phase.
    pub fn apply(&mut self, event: SlotEvent) -> Result<SlotPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SlotPhase::Empty, SlotEvent::Post) => SlotPhase::Posted,
            (SlotPhase::Posted, SlotEvent::Resolve) => SlotPhase::Resolved,
            (SlotPhase::Posted | SlotPhase::Resolved, SlotEvent::Skip) => SlotPhase::Empty,
            (_, SlotEvent::Reset) => SlotPhase::Empty,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        self.phase = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_empty() {
        assert_eq!(SlotMachine::default().phase(), SlotPhase::Empty);
    }

    #[test]
    fn full_question_lifecycle() {
        let mut sm = SlotMachine::default();
        assert_eq!(sm.apply(SlotEvent::Post), Ok(SlotPhase::Posted));
        assert_eq!(sm.apply(SlotEvent::Resolve), Ok(SlotPhase::Resolved));
        assert_eq!(sm.apply(SlotEvent::Reset), Ok(SlotPhase::Empty));
        assert_eq!(sm.apply(SlotEvent::Post), Ok(SlotPhase::Posted));
        assert_eq!(sm.apply(SlotEvent::Skip), Ok(SlotPhase::Empty));
    }

    #[test]
    fn reset_on_empty_slot_is_noop() {
        let mut sm = SlotMachine::default();
        assert_eq!(sm.apply(SlotEvent::Reset), Ok(SlotPhase::Empty));
        assert_eq!(sm.apply(SlotEvent::Reset), Ok(SlotPhase::Empty));
        assert_eq!(sm.phase(), SlotPhase::Empty);
    }

    #[test]
    fn second_resolution_is_rejected() {
        let mut sm = SlotMachine::default();
        sm.apply(SlotEvent::Post).unwrap();
        sm.apply(SlotEvent::Resolve).unwrap();

        let err = sm.apply(SlotEvent::Resolve).unwrap_err();
        assert_eq!(err.from, SlotPhase::Resolved);
        assert_eq!(err.event, SlotEvent::Resolve);
    }

    #[test]
    fn posting_over_a_live_question_is_rejected() {
        let mut sm = SlotMachine::default();
        sm.apply(SlotEvent::Post).unwrap();
        assert_eq!(
            sm.apply(SlotEvent::Post),
            Err(InvalidTransition {
                from: SlotPhase::Posted,
                event: SlotEvent::Post
            })
        );
    }

    #[test]
    fn nothing_to_skip_or_resolve_when_empty() {
        let mut sm = SlotMachine::default();
        assert!(sm.apply(SlotEvent::Skip).is_err());
        assert!(sm.apply(SlotEvent::Resolve).is_err());
    }
}

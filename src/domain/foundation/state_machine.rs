//! Transition tables for status enums.
//!
//! A status enum declares its allowed edges once; writers ask the table
//! instead of re-deriving the rules at the call site.

/// A status enum backed by an explicit transition table.
///
/// `can_transition_to` and `valid_transitions` must describe the same edges.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Whether the edge `self -> target` is in the table.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Every state reachable in one step.
    fn valid_transitions(&self) -> Vec<Self>;

    /// No outgoing edges.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Whether a record whose stored status is `current` may take `target`.
    ///
    /// A record that has never had a status accepts whatever the processor
    /// reports first.
    fn admits(current: Option<&Self>, target: &Self) -> bool {
        current.map_or(true, |current| current.can_transition_to(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal payout-style table: Queued -> Sent -> (Settled | Bounced), Bounced -> Queued.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Payout {
        Queued,
        Sent,
        Settled,
        Bounced,
    }

    impl StateMachine for Payout {
        fn can_transition_to(&self, target: &Self) -> bool {
            self.valid_transitions().contains(target)
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Payout::*;
            match self {
                Queued => vec![Sent],
                Sent => vec![Settled, Bounced],
                Bounced => vec![Queued],
                Settled => vec![],
            }
        }
    }

    #[test]
    fn settled_is_the_only_terminal_state() {
        let terminal: Vec<Payout> = [Payout::Queued, Payout::Sent, Payout::Settled, Payout::Bounced]
            .into_iter()
            .filter(StateMachine::is_terminal)
            .collect();
        assert_eq!(terminal, vec![Payout::Settled]);
    }

    #[test]
    fn unset_status_admits_anything() {
        assert!(Payout::admits(None, &Payout::Settled));
        assert!(Payout::admits(None, &Payout::Queued));
    }

    #[test]
    fn set_status_follows_the_table() {
        assert!(Payout::admits(Some(&Payout::Bounced), &Payout::Queued));
        assert!(!Payout::admits(Some(&Payout::Queued), &Payout::Settled));
        assert!(!Payout::admits(Some(&Payout::Settled), &Payout::Sent));
    }
}

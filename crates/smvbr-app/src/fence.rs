// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;

/// Identifies one issued request. Later tickets compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Only the most recently issued ticket may apply its response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFence {
    issued: u64,
}

impl RequestFence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    pub fn latest(&self) -> Option<Ticket> {
        (self.issued > 0).then_some(Ticket(self.issued))
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest() == Some(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::RequestFence;

    #[test]
    fn only_latest_ticket_is_current() {
        let mut fence = RequestFence::new();
        assert_eq!(fence.latest(), None);

        let first = fence.issue();
        assert!(fence.is_current(first));

        let second = fence.issue();
        assert!(second > first);
        assert!(!fence.is_current(first));
        assert!(fence.is_current(second));
        assert_eq!(fence.latest(), Some(second));
        assert_eq!(second.to_string(), "#2");
    }
}

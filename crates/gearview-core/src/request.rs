//! Latest-request-wins tracking
//!
//! Backend requests may overlap. Each one gets a ticket; only the response for
//! the most recently issued ticket is allowed to reach the scene.

/// Identifier of one backend request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(pub u64);

/// Issues tickets and decides which response is still wanted
#[derive(Debug, Clone, Default)]
pub struct LatestRequest {
    latest: u64,
    in_flight: bool,
}

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a new request, superseding any earlier one
    pub fn issue(&mut self) -> RequestTicket {
        self.latest += 1;
        self.in_flight = true;
        RequestTicket(self.latest)
    }

    /// Whether `ticket` is the most recent request
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.latest
    }

    /// Accept a finished response; `false` means it is stale and must be dropped
    pub fn complete(&mut self, ticket: RequestTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = false;
        true
    }

    /// True while the latest request has not completed
    pub fn is_pending(&self) -> bool {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_wins() {
        let mut latest = LatestRequest::new();
        let first = latest.issue();
        let second = latest.issue();

        assert!(latest.is_pending());
        // Newer response arrives first
        assert!(latest.complete(second));
        assert!(!latest.is_pending());
        // Older one arrives later and is dropped
        assert!(!latest.complete(first));
    }

    #[test]
    fn test_stale_response_keeps_pending() {
        let mut latest = LatestRequest::new();
        let first = latest.issue();
        let _second = latest.issue();

        assert!(!latest.complete(first));
        assert!(latest.is_pending());
    }
}

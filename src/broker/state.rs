use std::fmt;

/// Lifecycle of a `Broker`.
///
/// `Unstarted -> Bound -> Relaying -> Stopped`, with a direct
/// `Unstarted -> Stopped` edge when binding fails. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    Unstarted,
    Bound,
    Relaying,
    Stopped,
}

impl BrokerState {
    pub fn is_terminal(self) -> bool {
        self == BrokerState::Stopped
    }
}

impl fmt::Display for BrokerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BrokerState::Unstarted => "unstarted",
            BrokerState::Bound => "bound",
            BrokerState::Relaying => "relaying",
            BrokerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

use std::fmt::Display;

/// Discovery progress of a unit. The order is the order of progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum UnitState {
    #[default]
    Unknown,
    /// Waiting to read the node's capabilities from the controller
    InitUnit,
    /// Querying the manufacturer ids
    GetUnitInfo,
    /// The ids are known, but the catalog has no device for them
    NoAutoMatch,
    /// The ids could not be read. A device info must be bound manually.
    WaitDevInfo,
    /// A device info is bound, the unit handler is not running yet
    HaveDevInfo,
    /// A sleeping node that did not answer. Discovery continues when it wakes up.
    WaitWakeup,
    Ready,
}

impl UnitState {
    /// States that only an administrator can resolve
    pub fn needs_action(&self) -> bool {
        matches!(self, Self::NoAutoMatch | Self::WaitDevInfo)
    }
}

impl Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "Unknown",
            Self::InitUnit => "Init",
            Self::GetUnitInfo => "Getting unit info",
            Self::NoAutoMatch => "No catalog match",
            Self::WaitDevInfo => "Waiting for device info",
            Self::HaveDevInfo => "Have device info",
            Self::WaitWakeup => "Waiting for wakeup",
            Self::Ready => "Ready",
        };
        write!(f, "{}", s)
    }
}

/// What an administrator sees at a glance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Ready,
    /// Still discovering, possibly waiting out a back-off
    Busy,
    /// Running, but a capability stopped responding
    Failed,
    /// Needs a manual device info binding or has a configuration error
    NeedsAction,
}

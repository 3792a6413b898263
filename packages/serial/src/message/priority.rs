use std::fmt::Display;

/// Send priority of an outbound message, from most to least urgent.
/// Messages of the same priority keep their relative order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MsgPriority {
    Ping,
    Control,
    #[default]
    Command,
    Low,
}

impl MsgPriority {
    pub const ALL: [MsgPriority; 4] = [Self::Ping, Self::Control, Self::Command, Self::Low];

    /// Position in [`MsgPriority::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl Display for MsgPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ping => write!(f, "ping"),
            Self::Control => write!(f, "control"),
            Self::Command => write!(f, "command"),
            Self::Low => write!(f, "low"),
        }
    }
}

#[test]
fn test_order() {
    assert!(MsgPriority::Ping < MsgPriority::Control);
    assert!(MsgPriority::Command < MsgPriority::Low);
    assert_eq!(MsgPriority::Low.index(), 3);
}

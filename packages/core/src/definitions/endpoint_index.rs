use std::fmt::Display;

/// Addresses either the node itself or one of its end points
#[derive(Default, Debug, Copy, Clone, Eq)]
pub enum EndpointIndex {
    #[default]
    Root,
    Endpoint(u8),
}

impl EndpointIndex {
    /// The raw end point id as used on the wire, 0 for the root device
    pub fn raw(&self) -> u8 {
        match self {
            Self::Root => 0,
            Self::Endpoint(index) => *index,
        }
    }

    pub fn is_root(&self) -> bool {
        self.raw() == 0
    }
}

impl From<u8> for EndpointIndex {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Root,
            _ => Self::Endpoint(value),
        }
    }
}

impl PartialEq for EndpointIndex {
    fn eq(&self, other: &EndpointIndex) -> bool {
        self.raw() == other.raw()
    }
}

impl std::hash::Hash for EndpointIndex {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw().hash(state)
    }
}

impl Ord for EndpointIndex {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw().cmp(&other.raw())
    }
}

impl PartialOrd for EndpointIndex {
    fn partial_cmp(&self, other: &EndpointIndex) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for EndpointIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.into_canonical() {
            EndpointIndex::Root => write!(f, "Root"),
            EndpointIndex::Endpoint(index) => write!(f, "EP {}", index),
        }
    }
}

impl EndpointIndex {
    fn into_canonical(self) -> Self {
        Self::from(self.raw())
    }
}

#[test]
fn test_endpoint_index_ord() {
    assert!(EndpointIndex::Root == EndpointIndex::Endpoint(0));
    assert!(EndpointIndex::Endpoint(0) < EndpointIndex::Endpoint(1));
    assert!(EndpointIndex::Endpoint(1) < EndpointIndex::Endpoint(2));
    assert_eq!(EndpointIndex::Endpoint(0).to_string(), "Root");
    assert_eq!(EndpointIndex::Endpoint(3).to_string(), "EP 3");
}

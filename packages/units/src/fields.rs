use bitflags::bitflags;
use std::fmt::Display;

/// Id of a field, assigned by the host when the field is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(pub u32);

impl Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AccessFlags: u8 {
        const READABLE = 0b0001;
        const READ_AFTER_WRITE = 0b0010;
        const READ_ON_WAKEUP = 0b0100;
        const WRITABLE = 0b1000;
    }
}

impl AccessFlags {
    /// Parses the device info notation: `R`eadable, read `A`fter write, read on wa`K`eup, `W`ritable.
    /// A single `-` means no access at all.
    pub fn from_letters(s: &str) -> Option<Self> {
        let s = s.trim();
        if s == "-" {
            return Some(Self::empty());
        }
        if s.is_empty() {
            return None;
        }
        let mut ret = Self::empty();
        for c in s.chars() {
            ret |= match c.to_ascii_uppercase() {
                'R' => Self::READABLE,
                'A' => Self::READ_AFTER_WRITE,
                'K' => Self::READ_ON_WAKEUP,
                'W' => Self::WRITABLE,
                _ => return None,
            };
        }
        Some(ret)
    }

    pub fn to_letters(&self) -> String {
        if self.is_empty() {
            return "-".to_string();
        }
        [
            (Self::READABLE, 'R'),
            (Self::READ_AFTER_WRITE, 'A'),
            (Self::READ_ON_WAKEUP, 'K'),
            (Self::WRITABLE, 'W'),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, c)| *c)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Bool,
    Card { min: u32, max: u32 },
    Int { min: i32, max: i32 },
    String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Card(u32),
    Int(i32),
    Float(f64),
    String(String),
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Card(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{:?}", v),
        }
    }
}

/// A field a capability exposes to the host
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub access: AccessFlags,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind, access: AccessFlags) -> Self {
        Self {
            name: name.into(),
            kind,
            access,
        }
    }

    /// Checks that a written value fits this field
    pub fn validate(&self, value: &FieldValue) -> Result<(), String> {
        match (&self.kind, value) {
            (FieldKind::Bool, FieldValue::Bool(_)) => Ok(()),
            (FieldKind::Card { min, max }, FieldValue::Card(v)) => {
                if v < min || v > max {
                    Err(format!("{} is outside of {}..={}", v, min, max))
                } else {
                    Ok(())
                }
            }
            (FieldKind::Int { min, max }, FieldValue::Int(v)) => {
                if v < min || v > max {
                    Err(format!("{} is outside of {}..={}", v, min, max))
                } else {
                    Ok(())
                }
            }
            (FieldKind::String, FieldValue::String(_)) => Ok(()),
            (kind, value) => Err(format!("{} is not a valid {:?} value", value, kind)),
        }
    }
}

/// Where a reported value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Sent by the device on its own
    Notification,
    /// The answer to one of our queries
    Query,
    /// Set locally after a write, without confirmation from the device
    Assumed,
}

/// Outcome of a field write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteResult {
    Ok,
    CommFailure,
    ValueRejected(String),
    NotWritable,
}

impl WriteResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrKind {
    Bool,
    Card { min: u32, max: u32 },
    Enum(Vec<&'static str>),
    String,
}

/// A user tunable option a unit handler or capability understands
#[derive(Debug, Clone, PartialEq)]
pub struct UnitAttr {
    pub key: String,
    pub kind: AttrKind,
    pub default: String,
    pub description: &'static str,
}

impl UnitAttr {
    pub fn new(
        key: impl Into<String>,
        kind: AttrKind,
        default: impl Into<String>,
        description: &'static str,
    ) -> Self {
        Self {
            key: key.into(),
            kind,
            default: default.into(),
            description,
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        match &self.kind {
            AttrKind::Bool => matches!(value, "true" | "false"),
            AttrKind::Card { min, max } => value
                .parse::<u32>()
                .is_ok_and(|v| (*min..=*max).contains(&v)),
            AttrKind::Enum(values) => values.contains(&value),
            AttrKind::String => true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_access_letters() {
        assert_eq!(
            AccessFlags::from_letters("RW"),
            Some(AccessFlags::READABLE | AccessFlags::WRITABLE)
        );
        assert_eq!(
            AccessFlags::from_letters("rkw"),
            Some(AccessFlags::READABLE | AccessFlags::READ_ON_WAKEUP | AccessFlags::WRITABLE)
        );
        assert_eq!(AccessFlags::from_letters("-"), Some(AccessFlags::empty()));
        assert_eq!(AccessFlags::from_letters("RX"), None);
        assert_eq!(AccessFlags::from_letters(""), None);

        let all = AccessFlags::all();
        assert_eq!(all.to_letters(), "RAKW");
        assert_eq!(AccessFlags::from_letters(&all.to_letters()), Some(all));
    }

    #[test]
    fn test_validate() {
        let def = FieldDef::new(
            "Level",
            FieldKind::Card { min: 0, max: 99 },
            AccessFlags::WRITABLE,
        );
        assert!(def.validate(&FieldValue::Card(99)).is_ok());
        assert!(def.validate(&FieldValue::Card(100)).is_err());
        assert!(def.validate(&FieldValue::Bool(true)).is_err());
    }

    #[test]
    fn test_attr_accepts() {
        let attr = UnitAttr::new(
            "PollSecs",
            AttrKind::Card { min: 30, max: 86400 },
            "600",
            "",
        );
        assert!(attr.accepts("60"));
        assert!(!attr.accepts("10"));
        assert!(!attr.accepts("abc"));
    }
}

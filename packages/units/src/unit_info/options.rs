use crate::fields::UnitAttr;
use std::collections::BTreeMap;

/// User options of a unit. The keys are defined by the unit handler and its capabilities,
/// this map never validates them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnitOptions {
    values: BTreeMap<String, String>,
}

impl UnitOptions {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    /// Stores a value. Returns whether anything changed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let value = value.into();
        match self.values.insert(key.into(), value.clone()) {
            Some(old) => old != value,
            None => true,
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn opt_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(str::trim) {
            Some("true" | "1" | "yes") => true,
            Some("false" | "0" | "no") => false,
            _ => default,
        }
    }

    pub fn opt_card(&self, key: &str, default: u32) -> u32 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn opt_int(&self, key: &str, default: i32) -> i32 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn opt_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Drops every option no attribute defines and adds the defaults of new attributes.
    /// Returns whether anything changed.
    pub fn prune(&mut self, attrs: &[UnitAttr]) -> bool {
        let before = self.values.len();
        self.values
            .retain(|key, _| attrs.iter().any(|attr| attr.key == *key));
        let mut changed = self.values.len() != before;
        for attr in attrs {
            if !self.values.contains_key(&attr.key) {
                self.values.insert(attr.key.clone(), attr.default.clone());
                changed = true;
            }
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, String)> for UnitOptions {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fields::AttrKind;

    #[test]
    fn test_typed_access() {
        let mut options = UnitOptions::default();
        options.set("PollSecs", " 90 ");
        options.set("Offset", "-3");
        options.set("Invert", "yes");
        assert_eq!(options.opt_card("PollSecs", 0), 90);
        assert_eq!(options.opt_card("Offset", 7), 7);
        assert_eq!(options.opt_int("Offset", 0), -3);
        assert!(options.opt_bool("Invert", false));
        assert!(options.opt_bool("Missing", true));
        assert_eq!(options.opt_str("Mode", "auto"), "auto");
    }

    #[test]
    fn test_set_reports_changes() {
        let mut options = UnitOptions::default();
        assert!(options.set("A", "1"));
        assert!(!options.set("A", "1"));
        assert!(options.set("A", "2"));
    }

    #[test]
    fn test_prune() {
        let mut options = UnitOptions::default();
        options.set("Stale", "1");
        options.set("LowBattery", "15");
        let attrs = vec![
            UnitAttr::new("LowBattery", AttrKind::Card { min: 0, max: 100 }, "20", ""),
            UnitAttr::new("PollSecs", AttrKind::Card { min: 0, max: 86400 }, "0", ""),
        ];
        assert!(options.prune(&attrs));
        let entries: Vec<_> = options.iter().collect();
        assert_eq!(entries, vec![("LowBattery", "15"), ("PollSecs", "0")]);
        assert!(!options.prune(&attrs));
    }
}

// ── Inclusion / exclusion rules ──

use serde::{Deserialize, Serialize};
use unifi_leds_api::StatDevice;

/// User-configured device id lists.
///
/// Exclusion always wins. An empty include list admits everything that is
/// not excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRules {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl FilterRules {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    pub fn is_excluded(&self, id: &str) -> bool {
        self.exclude.iter().any(|e| e == id)
    }

    pub fn is_included(&self, id: &str) -> bool {
        self.include.is_empty() || self.include.iter().any(|i| i == id)
    }

    pub fn allows(&self, id: &str) -> bool {
        self.is_included(id) && !self.is_excluded(id)
    }

    /// Apply the rules to raw devices. See [`filter_relevant_aps`].
    pub fn apply(&self, devices: Vec<StatDevice>) -> Vec<StatDevice> {
        filter_relevant_aps(devices, &self.include, &self.exclude)
    }
}

/// Keep supported devices that pass the include and exclude lists.
///
/// The class restriction is applied here again because callers may hand in
/// raw inventory. A device without an id never matches a non-empty include
/// list, but survives when everything is included.
pub fn filter_relevant_aps(
    devices: Vec<StatDevice>,
    include: &[String],
    exclude: &[String],
) -> Vec<StatDevice> {
    devices
        .into_iter()
        .filter(StatDevice::is_supported)
        .filter(|d| {
            include.is_empty()
                || d.id.as_deref().is_some_and(|id| include.iter().any(|i| i == id))
        })
        .filter(|d| {
            d.id.as_deref()
                .is_none_or(|id| !exclude.iter().any(|e| e == id))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn devices() -> Vec<StatDevice> {
        serde_json::from_value(json!([
            { "_id": "ap1", "type": "uap" },
            { "_id": "ap2", "type": "uap" },
            { "_id": "gw1", "type": "udm", "model": "UDM" },
            { "_id": "gw2", "type": "udm", "model": "UDMPROSE" },
            { "_id": "sw1", "type": "usw" },
            { "type": "uap" }
        ]))
        .unwrap()
    }

    fn ids(devices: &[StatDevice]) -> Vec<Option<&str>> {
        devices.iter().map(|d| d.id.as_deref()).collect()
    }

    fn strings(ids: &[&str]) -> Vec<String> {
        ids.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn class_restriction_applies_without_rules() {
        let out = filter_relevant_aps(devices(), &[], &[]);
        assert_eq!(ids(&out), vec![Some("ap1"), Some("ap2"), Some("gw1"), None]);
    }

    #[test]
    fn include_list_drops_devices_without_id() {
        let out = filter_relevant_aps(devices(), &strings(&["ap2", "sw1"]), &[]);
        assert_eq!(ids(&out), vec![Some("ap2")]);
    }

    #[test]
    fn exclusion_dominates_inclusion() {
        let out = filter_relevant_aps(devices(), &strings(&["ap1", "ap2"]), &strings(&["ap1"]));
        assert_eq!(ids(&out), vec![Some("ap2")]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(filter_relevant_aps(Vec::new(), &strings(&["ap1"]), &[]).is_empty());
    }

    #[test]
    fn rules_share_filter_semantics() {
        let rules = FilterRules::new(strings(&["ap1", "ap2"]), strings(&["ap2"]));
        assert!(rules.allows("ap1"));
        assert!(!rules.allows("ap2"));
        assert!(!rules.allows("ap3"));

        let open = FilterRules::new(Vec::new(), strings(&["ap2"]));
        assert!(open.allows("ap3"));
        assert!(!open.allows("ap2"));
    }
}

// Site name resolution
//
// Users configure sites by the description shown in the controller UI
// ("Home"), while every API path needs the internal name ("default").

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::error::Error;
use crate::models::SiteRecord;

/// Human site description (and internal name) → internal site name.
///
/// Rebuilt from scratch on every authentication. When one site's name
/// collides with another's description, the later record wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteMap {
    entries: BTreeMap<String, String>,
}

impl SiteMap {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a SiteRecord>) -> Self {
        let mut entries = BTreeMap::new();
        for record in records {
            let Some(name) = record.name.as_deref().filter(|n| !n.is_empty()) else {
                continue;
            };
            if let Some(desc) = record.desc.as_deref().filter(|d| !d.is_empty()) {
                entries.insert(desc.to_owned(), name.to_owned());
            }
            entries.insert(name.to_owned(), name.to_owned());
        }
        Self { entries }
    }

    /// Build from the unwrapped `self/sites` payload, which must be an array.
    pub(crate) fn from_payload(payload: Value) -> Result<Self, Error> {
        let Value::Array(items) = payload else {
            return Err(Error::api(
                "unexpected data structure in site list (expected an array)",
            ));
        };
        let records: Vec<SiteRecord> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        Ok(Self::from_records(&records))
    }

    /// Look up an internal name without logging.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Resolve a configured site name, warning with the known pairs when it
    /// is not present.
    pub fn resolve(&self, name: &str) -> Option<String> {
        if let Some(internal) = self.get(name) {
            return Some(internal.to_owned());
        }
        let known = self
            .iter()
            .filter(|(k, v)| k != v)
            .map(|(k, v)| format!("{k} -> {v}"))
            .collect::<Vec<_>>()
            .join(", ");
        warn!(site = name, known = %known, "site not found on controller");
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

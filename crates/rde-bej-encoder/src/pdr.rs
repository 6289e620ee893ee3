//! The PDR (PLDM Dictionary Resource) map: assigns small integer ids to
//! `@odata.id` URIs (or their non-fragment prefix) so deferred-binding
//! strings can reference them as `%L<id>`.

use indexmap::IndexMap;

/// Insertion-ordered URI → PDR id map. Encoding order is preserved so a
/// PDR map produced for one payload can be serialized and handed back for
/// strict re-encoding of related payloads.
#[derive(Debug, Clone, Default)]
pub struct PdrMap {
    ids: IndexMap<String, u64>,
}

impl PdrMap {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Looks up an existing PDR id without assigning one.
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<u64> {
        self.ids.get(uri).copied()
    }

    /// Returns `uri`'s PDR id, assigning the next sequential id if this is
    /// the first time `uri` has been seen.
    pub fn assign(&mut self, uri: &str) -> u64 {
        if let Some(&id) = self.ids.get(uri) {
            return id;
        }
        let id = self.ids.len() as u64;
        self.ids.insert(uri.to_string(), id);
        id
    }

    /// Iterates `(uri, id)` pairs in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.ids.iter().map(|(uri, &id)| (uri.as_str(), id))
    }

    /// Rebuilds a map from explicit `(uri, id)` pairs, e.g. one parsed back
    /// from a `-op` JSON file. Entries are re-inserted in ascending id
    /// order so [`Self::iter`] yields assignment order again regardless of
    /// the input's order.
    #[must_use]
    pub fn from_entries(mut entries: Vec<(String, u64)>) -> Self {
        entries.sort_by_key(|(_, id)| *id);
        let mut ids = IndexMap::new();
        for (uri, id) in entries {
            ids.insert(uri, id);
        }
        Self { ids }
    }

    /// Reverse lookup used by the decoder: the URI a PDR id was assigned to.
    #[must_use]
    pub fn uri_for(&self, id: u64) -> Option<&str> {
        self.ids
            .iter()
            .find(|&(_, &candidate)| candidate == id)
            .map(|(uri, _)| uri.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_is_stable_and_sequential() {
        let mut map = PdrMap::default();
        assert_eq!(map.assign("/redfish/v1/Chassis/1"), 0);
        assert_eq!(map.assign("/redfish/v1/Chassis/2"), 1);
        assert_eq!(map.assign("/redfish/v1/Chassis/1"), 0);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn get_does_not_assign() {
        let map = PdrMap::default();
        assert_eq!(map.get("/redfish/v1/Chassis/1"), None);
        assert!(map.is_empty());
    }

    #[test]
    fn uri_for_reverses_assign() {
        let mut map = PdrMap::default();
        map.assign("/redfish/v1/Chassis/1");
        map.assign("/redfish/v1/Chassis/2");
        assert_eq!(map.uri_for(1), Some("/redfish/v1/Chassis/2"));
        assert_eq!(map.uri_for(5), None);
    }
}

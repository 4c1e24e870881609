use crate::AddressFamily;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Records grouped by address family.
///
/// Families keep the order in which they were first seen, and records within a family keep
/// the order in which they were pushed. Nothing is merged or deduplicated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FamilyTable<T> {
    entries: Vec<(AddressFamily, Vec<T>)>,
}

impl<T> Default for FamilyTable<T> {
    fn default() -> Self {
        Self { entries: vec![] }
    }
}

impl<T> FamilyTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, family: AddressFamily, record: T) {
        match self.entries.iter_mut().find(|(f, _)| *f == family) {
            Some((_, records)) => records.push(record),
            None => self.entries.push((family, vec![record])),
        }
    }

    pub fn get(&self, family: AddressFamily) -> Option<&[T]> {
        self.entries
            .iter()
            .find(|(f, _)| *f == family)
            .map(|(_, records)| records.as_slice())
    }

    pub fn contains_family(&self, family: AddressFamily) -> bool {
        self.get(family).is_some()
    }

    pub fn families(&self) -> impl Iterator<Item = AddressFamily> + '_ {
        self.entries.iter().map(|(f, _)| *f)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AddressFamily, &[T])> + '_ {
        self.entries.iter().map(|(f, r)| (*f, r.as_slice()))
    }

    /// Number of families present.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Serialize> Serialize for FamilyTable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (family, records) in &self.entries {
            map.serialize_entry(family, records)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod test {
    use super::FamilyTable;
    use crate::AddressFamily;

    #[test]
    fn keeps_first_seen_order() {
        let mut table = FamilyTable::new();
        table.push(AddressFamily::INET6, "a");
        table.push(AddressFamily::INET, "b");
        table.push(AddressFamily::INET6, "c");

        let families: Vec<_> = table.families().collect();
        assert_eq!(families, vec![AddressFamily::INET6, AddressFamily::INET]);
        assert_eq!(table.get(AddressFamily::INET6), Some(&["a", "c"][..]));
        assert_eq!(table.get(AddressFamily::INET), Some(&["b"][..]));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn duplicates_are_kept() {
        let mut table = FamilyTable::new();
        table.push(AddressFamily::INET, 1);
        table.push(AddressFamily::INET, 1);
        assert_eq!(table.get(AddressFamily::INET), Some(&[1, 1][..]));
    }

    #[test]
    fn missing_family() {
        let table: FamilyTable<u8> = FamilyTable::new();
        assert!(table.is_empty());
        assert!(!table.contains_family(AddressFamily::INET));
        assert_eq!(table.get(AddressFamily::INET), None);
    }
}

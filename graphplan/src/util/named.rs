use alloc::collections::BTreeMap;

use crate::Symbol;

pub trait Named {
    fn name(&self) -> Symbol;
}

/// Name-indexed storage. Inserting a value with a name that is already
/// present replaces the old value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedStorage<T: Named>(BTreeMap<Symbol, T>);

impl<T: Named> NamedStorage<T> {
    pub fn insert(&mut self, value: T) -> Option<T> {
        self.0.insert(value.name(), value)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        Symbol::lookup(name).and_then(|s| self.0.get(&s))
    }

    pub fn get_by_symbol(&self, symbol: &Symbol) -> Option<&T> {
        self.0.get(symbol)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.values()
    }

    pub fn contains(&self, name: &str) -> bool {
        Symbol::lookup(name).is_some_and(|s| self.0.contains_key(&s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Named> Default for NamedStorage<T> {
    fn default() -> Self {
        Self(BTreeMap::default())
    }
}

impl<T: Named> FromIterator<T> for NamedStorage<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut storage = Self::default();
        for value in iter {
            storage.insert(value);
        }
        storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Thing(Symbol, u8);

    impl Named for Thing {
        fn name(&self) -> Symbol {
            self.0
        }
    }

    #[test]
    fn test_replace_by_name() {
        let mut storage = NamedStorage::default();
        assert_eq!(storage.insert(Thing(Symbol::new("a"), 1)), None);
        storage.insert(Thing(Symbol::new("b"), 2));
        let old = storage.insert(Thing(Symbol::new("a"), 3));

        assert_eq!(old, Some(Thing(Symbol::new("a"), 1)));
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.get("a").map(|t| t.1), Some(3));
        assert!(!storage.contains("c"));
    }

    #[test]
    fn test_missing_names_stay_uninterned() {
        let storage: NamedStorage<Thing> = [Thing(Symbol::new("kept"), 0)].into_iter().collect();
        assert!(storage.get("never-stored").is_none());
        assert!(!storage.contains("never-stored"));
        assert_eq!(Symbol::lookup("never-stored"), None);
        assert!(storage.contains("kept"));
    }
}

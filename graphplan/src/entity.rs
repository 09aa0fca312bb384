use alloc::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    vec,
    vec::Vec,
};

use crate::{error::TypeError, Symbol};

/// Name of the implicit type every other type inherits from.
pub const ROOT_TYPE: &str = "object";

/// Catalogue of typed objects together with the type hierarchy.
///
/// Each type has at most one direct supertype. Types without an explicit
/// supertype still inherit from [ROOT_TYPE].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStorage {
    types: BTreeSet<Symbol>,
    supertypes: BTreeMap<Symbol, Symbol>,
    subtypes: BTreeMap<Symbol, Vec<Symbol>>,
    objects: BTreeMap<Symbol, Symbol>,
}

impl Default for EntityStorage {
    fn default() -> Self {
        Self {
            types: BTreeSet::from([Self::root()]),
            supertypes: BTreeMap::new(),
            subtypes: BTreeMap::new(),
            objects: BTreeMap::new(),
        }
    }
}

impl EntityStorage {
    pub fn root() -> Symbol {
        Symbol::new(ROOT_TYPE)
    }

    pub fn get_or_create_type(&mut self, type_name: &str) -> Symbol {
        let r#type = Symbol::new(type_name);
        self.types.insert(r#type);
        r#type
    }

    pub fn has_type(&self, r#type: &Symbol) -> bool {
        self.types.contains(r#type)
    }

    pub fn types(&self) -> impl Iterator<Item = &Symbol> {
        self.types.iter()
    }

    pub fn create_inheritance(
        &mut self,
        sub_type: Symbol,
        super_type: Symbol,
    ) -> Result<(), TypeError> {
        for t in [sub_type, super_type] {
            if !self.has_type(&t) {
                return Err(TypeError::UnknownType(t));
            }
        }

        if let Some(&existing) = self.supertypes.get(&sub_type) {
            return Err(TypeError::AlreadyHasSuperType {
                sub_type,
                super_type: existing,
            });
        }

        if sub_type == super_type || self.inherits(super_type, sub_type) {
            return Err(TypeError::CreatesCircularInheritance {
                sub_type,
                super_type,
            });
        }

        self.supertypes.insert(sub_type, super_type);
        self.subtypes
            .entry(super_type)
            .and_modify(|e| e.push(sub_type))
            .or_insert_with(|| vec![sub_type]);

        Ok(())
    }

    pub fn super_type(&self, r#type: Symbol) -> Option<Symbol> {
        self.supertypes.get(&r#type).copied()
    }

    pub fn direct_subtypes(&self, r#type: Symbol) -> Vec<Symbol> {
        self.subtypes.get(&r#type).cloned().unwrap_or_default()
    }

    /// All transitive subtypes, breadth first.
    pub fn subtypes(&self, r#type: Symbol) -> Vec<Symbol> {
        let mut ts: VecDeque<_> = self.direct_subtypes(r#type).into();
        let mut subtypes = Vec::new();
        while let Some(t) = ts.pop_front() {
            ts.extend(self.direct_subtypes(t));
            subtypes.push(t);
        }
        subtypes
    }

    pub fn inherits(&self, sub_type: Symbol, super_type: Symbol) -> bool {
        let mut current = sub_type;
        while let Some(parent) = self.super_type(current) {
            if parent == super_type {
                return true;
            }
            current = parent;
        }
        super_type == Self::root() && sub_type != super_type
    }

    pub fn inherits_or_eq(&self, sub_type: Symbol, super_type: Symbol) -> bool {
        sub_type == super_type || self.inherits(sub_type, super_type)
    }

    /// Registers an object. Declaring an existing object again moves it to
    /// the new type.
    pub fn get_or_create_object(
        &mut self,
        object_name: &str,
        r#type: Symbol,
    ) -> Result<Symbol, TypeError> {
        if !self.has_type(&r#type) {
            return Err(TypeError::UnknownType(r#type));
        }
        let object = Symbol::new(object_name);
        self.objects.insert(object, r#type);
        Ok(object)
    }

    pub fn type_of(&self, object: &Symbol) -> Option<Symbol> {
        self.objects.get(object).copied()
    }

    pub fn objects(&self) -> impl Iterator<Item = (&Symbol, &Symbol)> {
        self.objects.iter()
    }

    /// Objects whose type is exactly `r#type`.
    pub fn objects_of_type_strict(&self, r#type: Symbol) -> Vec<Symbol> {
        self.objects
            .iter()
            .filter_map(|(&o, &t)| (t == r#type).then_some(o))
            .collect()
    }

    /// Objects of `r#type` or any of its subtypes.
    pub fn objects_of_type(&self, r#type: Symbol) -> Vec<Symbol> {
        self.objects
            .iter()
            .filter_map(|(&o, &t)| self.inherits_or_eq(t, r#type).then_some(o))
            .collect()
    }

    /// Whether `object` may be bound to a parameter of `r#type`.
    pub fn is_instance(&self, object: &Symbol, r#type: Symbol) -> bool {
        match self.type_of(object) {
            Some(t) => self.inherits_or_eq(t, r#type),
            None => r#type == Self::root(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_inheritance() {
        let mut entities = EntityStorage::default();
        let t1 = entities.get_or_create_type("foo");
        let t2 = entities.get_or_create_type("bar");
        let t3 = entities.get_or_create_type("baz");
        let t4 = entities.get_or_create_type("qux");

        assert!(entities.create_inheritance(t1, t2).is_ok());

        let _ = entities.create_inheritance(t2, t3);
        let res = entities.create_inheritance(t1, t3);
        assert_eq!(
            res,
            Err(TypeError::AlreadyHasSuperType {
                sub_type: t1,
                super_type: t2
            })
        );

        let _ = entities.create_inheritance(t3, t4);

        assert!(entities.inherits(t1, t2));
        assert!(entities.inherits(t2, t3));
        assert!(entities.inherits(t3, t4));

        assert!(entities.inherits(t1, t3));
        assert!(entities.inherits(t2, t4));

        let res = entities.create_inheritance(t4, t1);
        assert!(matches!(
            res,
            Err(TypeError::CreatesCircularInheritance { .. })
        ));

        assert!(!entities.inherits(t3, t1));
        assert!(entities.inherits(t1, EntityStorage::root()));

        let unknown = Symbol::new("never-declared");
        assert_eq!(
            entities.create_inheritance(unknown, t1),
            Err(TypeError::UnknownType(unknown))
        );
    }

    #[test]
    fn test_subtypes() {
        let mut entities = EntityStorage::default();
        let t: Vec<_> = (1..=8)
            .map(|i| entities.get_or_create_type(&alloc::format!("t{i}")))
            .collect();

        for (sub, sup) in [(1, 0), (2, 1), (3, 2), (4, 2), (5, 4), (6, 4), (7, 6)] {
            entities.create_inheritance(t[sub], t[sup]).unwrap();
        }

        assert_eq!(entities.subtypes(t[7]), Vec::<Symbol>::new());
        assert_eq!(entities.subtypes(t[6]), vec![t[7]]);
        assert_eq!(entities.subtypes(t[4]), vec![t[5], t[6], t[7]]);
        assert_eq!(entities.subtypes(t[2]), vec![t[3], t[4], t[5], t[6], t[7]]);
        assert_eq!(entities.subtypes(t[0]), t[1..].to_vec());
    }

    #[test]
    fn test_objects_by_type() {
        let mut entities = EntityStorage::default();
        let vehicle = entities.get_or_create_type("vehicle");
        let truck = entities.get_or_create_type("truck");
        let place = entities.get_or_create_type("place");
        entities.create_inheritance(truck, vehicle).unwrap();

        let t1 = entities.get_or_create_object("T1", truck).unwrap();
        let v1 = entities.get_or_create_object("V1", vehicle).unwrap();
        let p1 = entities.get_or_create_object("P1", place).unwrap();

        let mut vehicles = entities.objects_of_type(vehicle);
        vehicles.sort();
        let mut expected = vec![t1, v1];
        expected.sort();
        assert_eq!(vehicles, expected);
        assert_eq!(entities.objects_of_type_strict(vehicle), vec![v1]);
        assert_eq!(entities.objects_of_type(truck), vec![t1]);
        assert_eq!(entities.objects_of_type(EntityStorage::root()).len(), 3);

        assert!(entities.is_instance(&t1, vehicle));
        assert!(!entities.is_instance(&p1, vehicle));
        assert!(entities.is_instance(&Symbol::new("Loose"), EntityStorage::root()));

        let unknown = Symbol::new("spaceship");
        assert_eq!(
            entities.get_or_create_object("S1", unknown),
            Err(TypeError::UnknownType(unknown))
        );
    }
}

use std::hash::Hash;
use std::rc::Rc;

use im_rc::HashSet;

use crate::list::{List, ListBuilder};
use crate::{Object, Value};

/// Write-only staging buffer for set construction, consumed by `build`.
#[derive(Debug, Clone, Default)]
pub struct SetBuilder<T: Hash + Eq + Clone> {
    keys: HashSet<T>,
}

impl<T: Hash + Eq + Clone> SetBuilder<T> {
    pub fn new() -> Self {
        Self { keys: HashSet::new() }
    }

    pub fn insert(&mut self, key: T) {
        self.keys.insert(key);
    }

    pub fn build(self) -> Set<T> {
        Set { keys: self.keys }
    }
}

/// Persistent hash set backed by a HAMT; membership is structural equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Set<T: Hash + Eq + Clone> {
    pub keys: HashSet<T>,
}

pub type ValueSet = Set<Value>;
pub type ObjectSet = Set<Rc<Object>>;
pub type ValueSetBuilder = SetBuilder<Value>;
pub type ObjectSetBuilder = SetBuilder<Rc<Object>>;

impl<T: Hash + Eq + Clone> Set<T> {
    pub fn new() -> Self {
        Self { keys: HashSet::new() }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &T) -> bool {
        self.keys.contains(key)
    }

    pub fn insert(&self, key: T) -> Self {
        Self { keys: self.keys.update(key) }
    }

    pub fn remove(&self, key: &T) -> Self {
        Self { keys: self.keys.without(key) }
    }

    pub fn union_with(&self, other: &Self) -> Self {
        let mut keys = self.keys.clone();
        for key in other.keys.iter() {
            keys.insert(key.clone());
        }
        Self { keys }
    }

    /// Every key present in `other` is removed.
    pub fn except(&self, other: &Self) -> Self {
        let mut keys = self.keys.clone();
        for key in other.keys.iter() {
            keys.remove(key);
        }
        Self { keys }
    }

    pub fn to_list(&self) -> List<T>
    where
        T: PartialEq,
    {
        let mut builder = ListBuilder::new();
        for key in self.keys.iter() {
            builder.push(key.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(nums: &[i64]) -> ValueSet {
        let mut builder = ValueSetBuilder::new();
        for &n in nums {
            builder.insert(Value::from(n));
        }
        builder.build()
    }

    #[test]
    fn insert_leaves_original_untouched() {
        let original = set_of(&[1, 2]);
        let updated = original.insert(Value::from(3));
        assert_eq!(original.len(), 2);
        assert_eq!(updated.len(), 3);
        assert!(updated.contains(&Value::from(3)));
        assert!(!original.contains(&Value::from(3)));
    }

    #[test]
    fn union_and_except_are_pairwise() {
        let a = set_of(&[1, 2, 3]);
        let b = set_of(&[3, 4]);
        assert_eq!(a.union_with(&b), set_of(&[1, 2, 3, 4]));
        assert_eq!(a.except(&b), set_of(&[1, 2]));
    }

    #[test]
    fn object_membership_is_structural() {
        let set = ObjectSet::new().insert(Rc::new(Object::string("abc")));
        assert!(set.contains(&Rc::new(Object::string("abc"))));
        assert!(!set.contains(&Rc::new(Object::string("xyz"))));
    }
}

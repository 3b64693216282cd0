use std::hash::Hash;
use std::rc::Rc;

use im_rc::HashMap;

use crate::list::{List, ListBuilder};
use crate::{Object, Value};

/// Persistent hash association backed by a HAMT. Keys collide by structural
/// equality (numeric equality for `Value` keys, `Object` structural equality
/// for object keys), never by reference identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Map<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
{
    pub pairs: HashMap<K, V>,
}

pub type ValueToValueMap = Map<Value, Value>;
pub type ValueToObjectMap = Map<Value, Rc<Object>>;
pub type ObjectToValueMap = Map<Rc<Object>, Value>;
pub type ObjectToObjectMap = Map<Rc<Object>, Rc<Object>>;

impl<K, V> Map<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
{
    pub fn new() -> Self {
        Self { pairs: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.pairs.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.pairs.contains_key(key)
    }

    /// New map with `key` bound to `value`; an existing binding is replaced.
    pub fn insert(&self, key: K, value: V) -> Self {
        Self { pairs: self.pairs.update(key, value) }
    }

    /// New map with `key` unbound. Removing an absent key is a no-op.
    pub fn remove(&self, key: &K) -> Self {
        Self { pairs: self.pairs.without(key) }
    }

    /// Pairwise union; on key collision the right-hand operand's value wins.
    pub fn union_with(&self, other: &Self) -> Self {
        let mut pairs = self.pairs.clone();
        for (key, value) in other.pairs.iter() {
            pairs.insert(key.clone(), value.clone());
        }
        Self { pairs }
    }

    /// New map with every key of `other` removed, regardless of the value it
    /// maps to on either side.
    pub fn except(&self, other: &Self) -> Self {
        let mut pairs = self.pairs.clone();
        for key in other.pairs.keys() {
            pairs.remove(key);
        }
        Self { pairs }
    }

    pub fn keys(&self) -> List<K>
    where
        K: PartialEq,
    {
        let mut builder = ListBuilder::new();
        for key in self.pairs.keys() {
            builder.push(key.clone());
        }
        builder.build()
    }

    pub fn values(&self) -> List<V> {
        let mut builder = ListBuilder::new();
        for value in self.pairs.values() {
            builder.push(value.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(pairs: &[(i64, i64)]) -> ValueToValueMap {
        let mut map = ValueToValueMap::new();
        for &(k, v) in pairs {
            map = map.insert(Value::from(k), Value::from(v));
        }
        map
    }

    #[test]
    fn insert_leaves_original_untouched() {
        let original = map_of(&[(1, 10), (2, 20)]);
        let updated = original.insert(Value::from(2), Value::from(99));
        assert_eq!(original.get(&Value::from(2)), Some(&Value::from(20)));
        assert_eq!(updated.get(&Value::from(2)), Some(&Value::from(99)));
        assert_eq!(updated.get(&Value::from(1)), Some(&Value::from(10)));
    }

    #[test]
    fn remove_absent_key_is_noop() {
        let map = map_of(&[(1, 10)]);
        let removed = map.remove(&Value::from(5));
        assert_eq!(map, removed);
    }

    #[test]
    fn union_right_operand_wins() {
        let left = map_of(&[(1, 10), (2, 20)]);
        let right = map_of(&[(2, 99), (3, 30)]);
        let union = left.union_with(&right);
        assert_eq!(union.len(), 3);
        assert_eq!(union.get(&Value::from(2)), Some(&Value::from(99)));
    }

    #[test]
    fn except_removes_by_key_ignoring_values() {
        let left = map_of(&[(1, 10), (2, 20)]);
        let right = map_of(&[(2, 12345)]);
        let excepted = left.except(&right);
        assert_eq!(excepted.len(), 1);
        assert!(!excepted.contains_key(&Value::from(2)));
    }

    #[test]
    fn object_keys_collide_structurally() {
        let key_a = Rc::new(Object::string("same"));
        let key_b = Rc::new(Object::string("same"));
        let map = ObjectToValueMap::new().insert(key_a, Value::from(1));
        // distinct allocation, equal structure
        assert_eq!(map.get(&key_b), Some(&Value::from(1)));
    }
}

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::list::{ObjectList, ValueList};
use crate::map::{ObjectToObjectMap, ObjectToValueMap, ValueToObjectMap, ValueToValueMap};
use crate::record::Record;
use crate::set::{ObjectSet, ValueSet};
use crate::value::Value;

/// Discriminants for the closed set of heap object variants.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum ObjectType {
    String = 1,
    ProcedureReference,
    TimeZone,
    Record,
    ValueList,
    ObjectList,
    ValueToValueMap,
    ValueToObjectMap,
    ObjectToValueMap,
    ObjectToObjectMap,
    ValueSet,
    ObjectSet,
    ValueOptional,
    ObjectOptional,
}

/// A resolved time-zone rule set: an opaque fixed offset plus the name it
/// was resolved from. Rule evaluation itself lives behind the system-call
/// boundary.
#[derive(Debug, Clone)]
pub struct TimeZone {
    pub name: String,
    pub offset_minutes: i32,
}

impl PartialEq for TimeZone {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TimeZone {}

/// A bound reference to a compiled procedure: the signature identifies it
/// across program builds, the index is a cache resolved at load time.
#[derive(Debug, Clone)]
pub struct ProcedureReference {
    pub signature: String,
    pub procedure_index: usize,
}

impl PartialEq for ProcedureReference {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature
    }
}

impl Eq for ProcedureReference {}

/// Heap-resident, immutable, reference-counted data. Shared freely between
/// stack slots, globals, and collection internals via `Rc`; immutability
/// makes the sharing safe, and the object graph is a pure DAG so reference
/// counting never leaks a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    String(String),
    ValueList(ValueList),
    ObjectList(ObjectList),
    ValueToValueMap(ValueToValueMap),
    ValueToObjectMap(ValueToObjectMap),
    ObjectToValueMap(ObjectToValueMap),
    ObjectToObjectMap(ObjectToObjectMap),
    ValueSet(ValueSet),
    ObjectSet(ObjectSet),
    Record(Record),
    ValueOptional(Option<Value>),
    ObjectOptional(Option<Rc<Object>>),
    TimeZone(TimeZone),
    ProcedureReference(ProcedureReference),
}

impl Object {
    pub fn string(text: impl Into<String>) -> Self {
        Self::String(text.into())
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::String(_) => ObjectType::String,
            Self::ValueList(_) => ObjectType::ValueList,
            Self::ObjectList(_) => ObjectType::ObjectList,
            Self::ValueToValueMap(_) => ObjectType::ValueToValueMap,
            Self::ValueToObjectMap(_) => ObjectType::ValueToObjectMap,
            Self::ObjectToValueMap(_) => ObjectType::ObjectToValueMap,
            Self::ObjectToObjectMap(_) => ObjectType::ObjectToObjectMap,
            Self::ValueSet(_) => ObjectType::ValueSet,
            Self::ObjectSet(_) => ObjectType::ObjectSet,
            Self::Record(_) => ObjectType::Record,
            Self::ValueOptional(_) => ObjectType::ValueOptional,
            Self::ObjectOptional(_) => ObjectType::ObjectOptional,
            Self::TimeZone(_) => ObjectType::TimeZone,
            Self::ProcedureReference(_) => ObjectType::ProcedureReference,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "String",
            Self::ValueList(_) => "ValueList",
            Self::ObjectList(_) => "ObjectList",
            Self::ValueToValueMap(_) => "ValueToValueMap",
            Self::ValueToObjectMap(_) => "ValueToObjectMap",
            Self::ObjectToValueMap(_) => "ObjectToValueMap",
            Self::ObjectToObjectMap(_) => "ObjectToObjectMap",
            Self::ValueSet(_) => "ValueSet",
            Self::ObjectSet(_) => "ObjectSet",
            Self::Record(_) => "Record",
            Self::ValueOptional(_) => "ValueOptional",
            Self::ObjectOptional(_) => "ObjectOptional",
            Self::TimeZone(_) => "TimeZone",
            Self::ProcedureReference(_) => "ProcedureReference",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }
}

/// How many leading elements/fields contribute to a collection hash. Keeps
/// hashing O(1) in collection size while staying consistent with equality.
const HASH_PREFIX: usize = 5;

impl Hash for Object {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.object_type() as u8);
        match self {
            Self::String(s) => s.hash(state),
            Self::ValueList(list) => {
                for value in list.items.iter().take(HASH_PREFIX) {
                    value.hash(state);
                }
            }
            Self::ObjectList(list) => {
                for object in list.items.iter().take(HASH_PREFIX) {
                    object.hash(state);
                }
            }
            // Maps and sets hash by size only: their iteration order is not
            // canonical, and equal maps always have equal sizes.
            Self::ValueToValueMap(map) => state.write_usize(map.len()),
            Self::ValueToObjectMap(map) => state.write_usize(map.len()),
            Self::ObjectToValueMap(map) => state.write_usize(map.len()),
            Self::ObjectToObjectMap(map) => state.write_usize(map.len()),
            Self::ValueSet(set) => state.write_usize(set.len()),
            Self::ObjectSet(set) => state.write_usize(set.len()),
            Self::Record(record) => {
                for value in record.values.iter().take(HASH_PREFIX) {
                    value.hash(state);
                }
                for object in record.objects.iter().take(HASH_PREFIX) {
                    object.hash(state);
                }
            }
            Self::ValueOptional(item) => item.hash(state),
            Self::ObjectOptional(item) => item.hash(state),
            Self::TimeZone(zone) => zone.name.hash(state),
            Self::ProcedureReference(reference) => reference.signature.hash(state),
        }
    }
}

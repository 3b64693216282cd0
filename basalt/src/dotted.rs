//! Copy-on-write assignment through a chain of field and element accesses,
//! as in `a.b(3).c = x`. The container is never mutated: each step along the
//! path is rebuilt with one child replaced, and everything off the path is
//! shared with the original.

use std::rc::Rc;

use crate::bytecode::{
    InstructionReader, SUFFIX_OBJECT_FIELD, SUFFIX_OBJECT_KEY_OBJECT, SUFFIX_OBJECT_KEY_VALUE,
    SUFFIX_VALUE_FIELD, SUFFIX_VALUE_KEY_OBJECT, SUFFIX_VALUE_KEY_VALUE,
};
use crate::error::{Error, ErrorCode, Fault};
use crate::object::Object;
use crate::value::Value;

/// One step of the access path. Field suffixes carry their index in the
/// instruction stream; element suffixes take their key from the operand
/// stacks instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suffix {
    ValueField(u16),
    ObjectField(u16),
    ValueKeyValue,
    ValueKeyObject,
    ObjectKeyValue,
    ObjectKeyObject,
}

/// Decodes the whole suffix chain up front, leaving the reader positioned
/// past it. Rebuilding can then abort at any depth without desynchronizing
/// the instruction pointer.
pub fn decode_suffixes(
    reader: &mut InstructionReader,
    count: usize,
) -> Result<Vec<Suffix>, Fault> {
    let mut suffixes = Vec::with_capacity(count);
    for _ in 0..count {
        let suffix = match reader.read_u8()? {
            SUFFIX_VALUE_FIELD => Suffix::ValueField(reader.read_u16()?),
            SUFFIX_OBJECT_FIELD => Suffix::ObjectField(reader.read_u16()?),
            SUFFIX_VALUE_KEY_VALUE => Suffix::ValueKeyValue,
            SUFFIX_VALUE_KEY_OBJECT => Suffix::ValueKeyObject,
            SUFFIX_OBJECT_KEY_VALUE => Suffix::ObjectKeyValue,
            SUFFIX_OBJECT_KEY_OBJECT => Suffix::ObjectKeyObject,
            _ => return Err(Fault::MalformedDottedExpression("unknown suffix type")),
        };
        suffixes.push(suffix);
    }
    Ok(suffixes)
}

/// What is being written at the end of the path.
#[derive(Debug, Clone)]
pub enum AssignSource {
    Value(Value),
    Object(Rc<Object>),
}

/// A rebuild aborts either recoverably (bad index or missing key, surfaced
/// on the in-band error channel) or fatally (the compiled path contradicts
/// the data it runs against).
#[derive(Debug)]
pub enum Abort {
    Recoverable(Error),
    Fatal(Fault),
}

impl From<Error> for Abort {
    fn from(error: Error) -> Self {
        Self::Recoverable(error)
    }
}

impl From<Fault> for Abort {
    fn from(fault: Fault) -> Self {
        Self::Fatal(fault)
    }
}

pub struct Assignment<'a> {
    pub source: AssignSource,
    /// Path keys in path order (outermost first).
    pub key_values: &'a [Value],
    pub key_objects: &'a [Rc<Object>],
}

impl Assignment<'_> {
    fn source_value(&self) -> Result<Value, Fault> {
        match &self.source {
            AssignSource::Value(value) => Ok(*value),
            AssignSource::Object(_) => Err(Fault::MalformedDottedExpression(
                "path ends at a value but an object is being assigned",
            )),
        }
    }

    fn source_object(&self) -> Result<Rc<Object>, Fault> {
        match &self.source {
            AssignSource::Object(object) => Ok(object.clone()),
            AssignSource::Value(_) => Err(Fault::MalformedDottedExpression(
                "path ends at an object but a value is being assigned",
            )),
        }
    }

    fn key_value(&self, index: usize) -> Result<Value, Fault> {
        self.key_values
            .get(index)
            .copied()
            .ok_or(Fault::MalformedDottedExpression("missing key value operand"))
    }

    fn key_object(&self, index: usize) -> Result<&Rc<Object>, Fault> {
        self.key_objects
            .get(index)
            .ok_or(Fault::MalformedDottedExpression("missing key object operand"))
    }
}

fn list_index_error(index: Value, len: usize) -> Error {
    Error::new(
        ErrorCode::ListIndexOutOfRange,
        format!(
            "index {} is out of range for a list of {len} elements",
            index.num.normalize()
        ),
    )
}

fn key_not_found() -> Error {
    Error::new(ErrorCode::MapKeyNotFound, "map key not found")
}

fn wrong_target(expected: &'static str, found: &'static str) -> Fault {
    Fault::TypeConfusion { expected, found }
}

/// Rebuilds `base` with the assignment applied along `suffixes`, consuming
/// path keys from `kv`/`ko` onward. Every off-path child of every rebuilt
/// node is shared with the original.
pub fn rebuild(
    assignment: &Assignment,
    base: &Rc<Object>,
    suffixes: &[Suffix],
    kv: usize,
    ko: usize,
) -> Result<Rc<Object>, Abort> {
    let (suffix, rest) = suffixes
        .split_first()
        .ok_or(Fault::MalformedDottedExpression("empty suffix chain"))?;
    let last = rest.is_empty();

    match *suffix {
        Suffix::ValueField(field) => {
            if !last {
                return Err(Fault::MalformedDottedExpression(
                    "value field must end the path",
                )
                .into());
            }
            let Object::Record(record) = base.as_ref() else {
                return Err(wrong_target("Record", base.type_name()).into());
            };
            let updated = record
                .with_value(field as usize, assignment.source_value()?)
                .ok_or(Fault::RecordIndexOutOfRange(field as usize))?;
            Ok(Rc::new(Object::Record(updated)))
        }

        Suffix::ObjectField(field) => {
            let Object::Record(record) = base.as_ref() else {
                return Err(wrong_target("Record", base.type_name()).into());
            };
            let replacement = if last {
                assignment.source_object()?
            } else {
                let child = record
                    .object(field as usize)
                    .ok_or(Fault::RecordIndexOutOfRange(field as usize))?;
                rebuild(assignment, child, rest, kv, ko)?
            };
            let updated = record
                .with_object(field as usize, replacement)
                .ok_or(Fault::RecordIndexOutOfRange(field as usize))?;
            Ok(Rc::new(Object::Record(updated)))
        }

        Suffix::ValueKeyValue => {
            if !last {
                return Err(Fault::MalformedDottedExpression(
                    "value element must end the path",
                )
                .into());
            }
            let key = assignment.key_value(kv)?;
            match base.as_ref() {
                Object::ValueList(list) => {
                    let index = key
                        .as_index()
                        .filter(|&index| index < list.len())
                        .ok_or_else(|| list_index_error(key, list.len()))?;
                    let updated = list
                        .set(index, assignment.source_value()?)
                        .ok_or_else(|| list_index_error(key, list.len()))?;
                    Ok(Rc::new(Object::ValueList(updated)))
                }
                Object::ValueToValueMap(map) => {
                    let updated = map.insert(key, assignment.source_value()?);
                    Ok(Rc::new(Object::ValueToValueMap(updated)))
                }
                other => {
                    Err(wrong_target("ValueList or ValueToValueMap", other.type_name()).into())
                }
            }
        }

        Suffix::ValueKeyObject => {
            let key = assignment.key_value(kv)?;
            match base.as_ref() {
                Object::ObjectList(list) => {
                    let index = key
                        .as_index()
                        .filter(|&index| index < list.len())
                        .ok_or_else(|| list_index_error(key, list.len()))?;
                    let replacement = if last {
                        assignment.source_object()?
                    } else {
                        let child = list
                            .get(index)
                            .ok_or_else(|| list_index_error(key, list.len()))?;
                        rebuild(assignment, child, rest, kv + 1, ko)?
                    };
                    let updated = list
                        .set(index, replacement)
                        .ok_or_else(|| list_index_error(key, list.len()))?;
                    Ok(Rc::new(Object::ObjectList(updated)))
                }
                Object::ValueToObjectMap(map) => {
                    let replacement = if last {
                        assignment.source_object()?
                    } else {
                        let child = map.get(&key).ok_or_else(key_not_found)?;
                        rebuild(assignment, child, rest, kv + 1, ko)?
                    };
                    let updated = map.insert(key, replacement);
                    Ok(Rc::new(Object::ValueToObjectMap(updated)))
                }
                other => {
                    Err(wrong_target("ObjectList or ValueToObjectMap", other.type_name()).into())
                }
            }
        }

        Suffix::ObjectKeyValue => {
            let Object::ObjectToValueMap(map) = base.as_ref() else {
                return Err(wrong_target("ObjectToValueMap", base.type_name()).into());
            };
            if !last {
                return Err(Fault::MalformedDottedExpression(
                    "value element must end the path",
                )
                .into());
            }
            let key = assignment.key_object(ko)?.clone();
            let updated = map.insert(key, assignment.source_value()?);
            Ok(Rc::new(Object::ObjectToValueMap(updated)))
        }

        Suffix::ObjectKeyObject => {
            let Object::ObjectToObjectMap(map) = base.as_ref() else {
                return Err(wrong_target("ObjectToObjectMap", base.type_name()).into());
            };
            let key = assignment.key_object(ko)?.clone();
            let replacement = if last {
                assignment.source_object()?
            } else {
                let child = map.get(&key).ok_or_else(key_not_found)?;
                rebuild(assignment, child, rest, kv, ko + 1)?
            };
            let updated = map.insert(key, replacement);
            Ok(Rc::new(Object::ObjectToObjectMap(updated)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::{ObjectListBuilder, ValueListBuilder};
    use crate::map::ValueToObjectMap;
    use crate::record::RecordBuilder;

    fn value_list(values: &[i64]) -> Rc<Object> {
        let mut builder = ValueListBuilder::new();
        for &v in values {
            builder.push(Value::from(v));
        }
        Rc::new(Object::ValueList(builder.build()))
    }

    #[test]
    fn rebuild_shares_everything_off_the_path() {
        // record { objects: [listA, listB] }, assign into listB element 1
        let mut builder = RecordBuilder::new(0, 2);
        let list_a = value_list(&[1, 2]);
        let list_b = value_list(&[3, 4]);
        builder.set_object(0, list_a.clone());
        builder.set_object(1, list_b.clone());
        let record = Rc::new(Object::Record(builder.build().unwrap()));

        let assignment = Assignment {
            source: AssignSource::Value(Value::from(9)),
            key_values: &[Value::from(1)],
            key_objects: &[],
        };
        let suffixes = [Suffix::ObjectField(1), Suffix::ValueKeyValue];
        let updated = rebuild(&assignment, &record, &suffixes, 0, 0).unwrap();

        let Object::Record(updated) = updated.as_ref() else {
            panic!("expected record");
        };
        // off-path field is the same allocation
        assert!(Rc::ptr_eq(updated.object(0).unwrap(), &list_a));
        assert_eq!(
            updated.object(1).unwrap().as_ref(),
            value_list(&[3, 9]).as_ref()
        );
        // original untouched
        let Object::Record(original) = record.as_ref() else {
            panic!("expected record");
        };
        assert!(Rc::ptr_eq(original.object(1).unwrap(), &list_b));
    }

    #[test]
    fn untouched_sibling_elements_keep_their_allocation() {
        // [record{1}, record{2}], assign 9 into element 0's value field
        let record = |n: i64| {
            let mut builder = RecordBuilder::new(1, 0);
            builder.set_value(0, Value::from(n));
            Rc::new(Object::Record(builder.build().unwrap()))
        };
        let first = record(1);
        let second = record(2);
        let mut builder = ObjectListBuilder::new();
        builder.push(first.clone());
        builder.push(second.clone());
        let list = Rc::new(Object::ObjectList(builder.build()));

        let assignment = Assignment {
            source: AssignSource::Value(Value::from(9)),
            key_values: &[Value::from(0)],
            key_objects: &[],
        };
        let suffixes = [Suffix::ValueKeyObject, Suffix::ValueField(0)];
        let updated = rebuild(&assignment, &list, &suffixes, 0, 0).unwrap();

        let Object::ObjectList(updated) = updated.as_ref() else {
            panic!("expected list");
        };
        // the sibling element is the very same allocation, not a copy
        assert!(Rc::ptr_eq(updated.get(1).unwrap(), &second));
        assert!(!Rc::ptr_eq(updated.get(0).unwrap(), &first));
        let Object::Record(rebuilt) = updated.get(0).unwrap().as_ref() else {
            panic!("expected record");
        };
        assert_eq!(rebuilt.value(0), Some(Value::from(9)));
    }

    #[test]
    fn out_of_range_index_aborts_recoverably() {
        let list = value_list(&[1]);
        let assignment = Assignment {
            source: AssignSource::Value(Value::from(9)),
            key_values: &[Value::from(5)],
            key_objects: &[],
        };
        let result = rebuild(&assignment, &list, &[Suffix::ValueKeyValue], 0, 0);
        match result {
            Err(Abort::Recoverable(error)) => {
                assert_eq!(error.code, ErrorCode::ListIndexOutOfRange);
            }
            other => panic!("expected recoverable abort, got {other:?}"),
        }
    }

    #[test]
    fn negative_index_aborts_recoverably() {
        let list = value_list(&[1, 2, 3]);
        let assignment = Assignment {
            source: AssignSource::Value(Value::from(9)),
            key_values: &[Value::from(-1)],
            key_objects: &[],
        };
        assert!(matches!(
            rebuild(&assignment, &list, &[Suffix::ValueKeyValue], 0, 0),
            Err(Abort::Recoverable(_))
        ));
    }

    #[test]
    fn missing_map_key_while_recursing_aborts_recoverably() {
        let map = Rc::new(Object::ValueToObjectMap(ValueToObjectMap::new()));
        let assignment = Assignment {
            source: AssignSource::Value(Value::from(9)),
            key_values: &[Value::from(1), Value::from(0)],
            key_objects: &[],
        };
        let suffixes = [Suffix::ValueKeyObject, Suffix::ValueKeyValue];
        match rebuild(&assignment, &map, &suffixes, 0, 0) {
            Err(Abort::Recoverable(error)) => {
                assert_eq!(error.code, ErrorCode::MapKeyNotFound);
            }
            other => panic!("expected recoverable abort, got {other:?}"),
        }
    }

    #[test]
    fn assigning_into_a_map_inserts_missing_keys() {
        let map = Rc::new(Object::ValueToObjectMap(ValueToObjectMap::new()));
        let assignment = Assignment {
            source: AssignSource::Object(Rc::new(Object::string("x"))),
            key_values: &[Value::from(7)],
            key_objects: &[],
        };
        let updated = rebuild(&assignment, &map, &[Suffix::ValueKeyObject], 0, 0).unwrap();
        let Object::ValueToObjectMap(updated) = updated.as_ref() else {
            panic!("expected map");
        };
        assert_eq!(
            updated.get(&Value::from(7)).map(|o| o.as_ref()),
            Some(&Object::string("x"))
        );
    }

    #[test]
    fn wrong_shape_aborts_fatally() {
        let list = {
            let mut builder = ObjectListBuilder::new();
            builder.push(Rc::new(Object::string("a")));
            Rc::new(Object::ObjectList(builder.build()))
        };
        let assignment = Assignment {
            source: AssignSource::Value(Value::from(1)),
            key_values: &[],
            key_objects: &[],
        };
        // a record field suffix against a list is a compiler bug, not a
        // recoverable runtime error
        assert!(matches!(
            rebuild(&assignment, &list, &[Suffix::ValueField(0)], 0, 0),
            Err(Abort::Fatal(Fault::TypeConfusion { .. }))
        ));
    }

    #[test]
    fn decode_consumes_exactly_the_chain() {
        use crate::bytecode::InstructionWriter;
        let mut writer = InstructionWriter::new();
        writer.write_u8(SUFFIX_OBJECT_FIELD);
        writer.write_u16(3);
        writer.write_u8(SUFFIX_VALUE_KEY_VALUE);
        writer.write_u8(0xee); // trailing byte that is not part of the chain
        let procedure = writer.finish();

        let mut reader = InstructionReader::new(procedure.instructions, 0);
        let suffixes = decode_suffixes(&mut reader, 2).unwrap();
        assert_eq!(
            suffixes,
            vec![Suffix::ObjectField(3), Suffix::ValueKeyValue]
        );
        assert_eq!(reader.offset, 4);
    }
}

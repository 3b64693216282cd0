use std::io::{BufRead, Write};
use std::rc::Rc;

use crate::error::{Error, ErrorCode};
use crate::list::{ObjectList, ValueList};
use crate::map::{ObjectToObjectMap, ObjectToValueMap, ValueToObjectMap, ValueToValueMap};
use crate::object::Object;
use crate::record::Record;
use crate::set::{ObjectSet, ValueSet};
use crate::value::Value;

mod console;
mod lists;
mod maps;
mod numbers;
mod optionals;
mod records;
mod sets;
mod strings;

pub type SystemCallFn = fn(&mut SystemCallContext) -> Result<(), Error>;

#[derive(Clone, Copy)]
pub struct SystemCallDef {
    pub name: &'static str,
    pub ptr: SystemCallFn,
}

impl SystemCallDef {
    pub const fn new(name: &'static str, ptr: SystemCallFn) -> Self {
        Self { name, ptr }
    }
}

/// Everything a builtin sees: its popped arguments (oldest first), the
/// console streams, and slots for the result the dispatcher pushes back.
/// A builtin returning `Err` raises the in-band error channel instead, and
/// its result slots are discarded.
pub struct SystemCallContext<'a> {
    pub value_args: &'a [Value],
    pub object_args: &'a [Rc<Object>],
    pub out: &'a mut dyn Write,
    pub input: &'a mut dyn BufRead,
    pub result_value: Value,
    pub result_object: Option<Rc<Object>>,
}

fn confusion(expected: &'static str, found: &'static str) -> Error {
    Error::new(
        ErrorCode::InternalTypeConfusion,
        format!("expected {expected}, got {found}"),
    )
}

impl SystemCallContext<'_> {
    pub fn value(&self, index: usize) -> Result<Value, Error> {
        self.value_args
            .get(index)
            .copied()
            .ok_or_else(|| confusion("a value argument", "nothing"))
    }

    pub fn object(&self, index: usize) -> Result<&Rc<Object>, Error> {
        self.object_args
            .get(index)
            .ok_or_else(|| confusion("an object argument", "nothing"))
    }

    pub fn string(&self, index: usize) -> Result<&str, Error> {
        let object = self.object(index)?;
        object
            .as_str()
            .ok_or_else(|| confusion("String", object.type_name()))
    }

    pub fn value_list(&self, index: usize) -> Result<&ValueList, Error> {
        match self.object(index)?.as_ref() {
            Object::ValueList(list) => Ok(list),
            other => Err(confusion("ValueList", other.type_name())),
        }
    }

    pub fn object_list(&self, index: usize) -> Result<&ObjectList, Error> {
        match self.object(index)?.as_ref() {
            Object::ObjectList(list) => Ok(list),
            other => Err(confusion("ObjectList", other.type_name())),
        }
    }

    pub fn value_to_value_map(&self, index: usize) -> Result<&ValueToValueMap, Error> {
        match self.object(index)?.as_ref() {
            Object::ValueToValueMap(map) => Ok(map),
            other => Err(confusion("ValueToValueMap", other.type_name())),
        }
    }

    pub fn value_to_object_map(&self, index: usize) -> Result<&ValueToObjectMap, Error> {
        match self.object(index)?.as_ref() {
            Object::ValueToObjectMap(map) => Ok(map),
            other => Err(confusion("ValueToObjectMap", other.type_name())),
        }
    }

    pub fn object_to_value_map(&self, index: usize) -> Result<&ObjectToValueMap, Error> {
        match self.object(index)?.as_ref() {
            Object::ObjectToValueMap(map) => Ok(map),
            other => Err(confusion("ObjectToValueMap", other.type_name())),
        }
    }

    pub fn object_to_object_map(&self, index: usize) -> Result<&ObjectToObjectMap, Error> {
        match self.object(index)?.as_ref() {
            Object::ObjectToObjectMap(map) => Ok(map),
            other => Err(confusion("ObjectToObjectMap", other.type_name())),
        }
    }

    pub fn value_set(&self, index: usize) -> Result<&ValueSet, Error> {
        match self.object(index)?.as_ref() {
            Object::ValueSet(set) => Ok(set),
            other => Err(confusion("ValueSet", other.type_name())),
        }
    }

    pub fn object_set(&self, index: usize) -> Result<&ObjectSet, Error> {
        match self.object(index)?.as_ref() {
            Object::ObjectSet(set) => Ok(set),
            other => Err(confusion("ObjectSet", other.type_name())),
        }
    }

    pub fn record(&self, index: usize) -> Result<&Record, Error> {
        self.object(index)?
            .as_record()
            .ok_or_else(|| confusion("Record", self.object_args[index].type_name()))
    }

    pub fn ret_value(&mut self, value: impl Into<Value>) {
        self.result_value = value.into();
    }

    pub fn ret_object(&mut self, object: Object) {
        self.result_object = Some(Rc::new(object));
    }

    pub fn ret_shared(&mut self, object: Rc<Object>) {
        self.result_object = Some(object);
    }
}

/// Stable dispatch table: a system call's id is its position here, so new
/// entries go at the end.
pub const SYSTEM_CALLS: &[SystemCallDef] = &[
    SystemCallDef::new("Print", console::print),
    SystemCallDef::new("InputLine", console::input_line),
    SystemCallDef::new("NumberAdd", numbers::add),
    SystemCallDef::new("NumberSubtract", numbers::subtract),
    SystemCallDef::new("NumberMultiply", numbers::multiply),
    SystemCallDef::new("NumberDivide", numbers::divide),
    SystemCallDef::new("NumberModulus", numbers::modulus),
    SystemCallDef::new("NumberNegate", numbers::negate),
    SystemCallDef::new("NumberEquals", numbers::equals),
    SystemCallDef::new("NumberLessThan", numbers::less_than),
    SystemCallDef::new("NumberLessThanEquals", numbers::less_than_equals),
    SystemCallDef::new("NumberGreaterThan", numbers::greater_than),
    SystemCallDef::new("NumberGreaterThanEquals", numbers::greater_than_equals),
    SystemCallDef::new("NumberNot", numbers::not),
    SystemCallDef::new("NumberAnd", numbers::and),
    SystemCallDef::new("NumberOr", numbers::or),
    SystemCallDef::new("NumberFloor", numbers::floor),
    SystemCallDef::new("NumberAbs", numbers::abs),
    SystemCallDef::new("CounterIsPastLimit", numbers::counter_is_past_limit),
    SystemCallDef::new("StringLen", strings::len),
    SystemCallDef::new("StringConcat", strings::concat),
    SystemCallDef::new("Chr", strings::chr),
    SystemCallDef::new("Asc", strings::asc),
    SystemCallDef::new("StringMid", strings::mid),
    SystemCallDef::new("StringIndexOf", strings::index_of),
    SystemCallDef::new("NumberToString", strings::number_to_string),
    SystemCallDef::new("StringToNumber", strings::string_to_number),
    SystemCallDef::new("ListLen", lists::len),
    SystemCallDef::new("ValueListGet", lists::value_get),
    SystemCallDef::new("ObjectListGet", lists::object_get),
    SystemCallDef::new("ValueListSet", lists::value_set),
    SystemCallDef::new("ObjectListSet", lists::object_set),
    SystemCallDef::new("ValueListAdd", lists::value_add),
    SystemCallDef::new("ObjectListAdd", lists::object_add),
    SystemCallDef::new("ValueListInsertAt", lists::value_insert_at),
    SystemCallDef::new("ObjectListInsertAt", lists::object_insert_at),
    SystemCallDef::new("ListRemoveAt", lists::remove_at),
    SystemCallDef::new("ValueListFirst", lists::value_first),
    SystemCallDef::new("ValueListLast", lists::value_last),
    SystemCallDef::new("ObjectListFirst", lists::object_first),
    SystemCallDef::new("ObjectListLast", lists::object_last),
    SystemCallDef::new("ListSkip", lists::skip),
    SystemCallDef::new("ListTake", lists::take),
    SystemCallDef::new("ListConcat", lists::concat),
    SystemCallDef::new("ValueToValueMapNew", maps::value_to_value_new),
    SystemCallDef::new("ValueToObjectMapNew", maps::value_to_object_new),
    SystemCallDef::new("ObjectToValueMapNew", maps::object_to_value_new),
    SystemCallDef::new("ObjectToObjectMapNew", maps::object_to_object_new),
    SystemCallDef::new("ValueToValueMapSet", maps::value_to_value_set),
    SystemCallDef::new("ValueToObjectMapSet", maps::value_to_object_set),
    SystemCallDef::new("ObjectToValueMapSet", maps::object_to_value_set),
    SystemCallDef::new("ObjectToObjectMapSet", maps::object_to_object_set),
    SystemCallDef::new("MapLen", maps::len),
    SystemCallDef::new("ValueMapContainsKey", maps::value_contains_key),
    SystemCallDef::new("ObjectMapContainsKey", maps::object_contains_key),
    SystemCallDef::new("MapKeys", maps::keys),
    SystemCallDef::new("MapValues", maps::values),
    SystemCallDef::new("MapUnion", maps::union),
    SystemCallDef::new("MapExcept", maps::except),
    SystemCallDef::new("ValueSetNew", sets::value_new),
    SystemCallDef::new("ObjectSetNew", sets::object_new),
    SystemCallDef::new("SetLen", sets::len),
    SystemCallDef::new("ValueSetAdd", sets::value_add),
    SystemCallDef::new("ObjectSetAdd", sets::object_add),
    SystemCallDef::new("ValueSetRemove", sets::value_remove),
    SystemCallDef::new("ObjectSetRemove", sets::object_remove),
    SystemCallDef::new("ValueSetContains", sets::value_contains),
    SystemCallDef::new("ObjectSetContains", sets::object_contains),
    SystemCallDef::new("SetUnion", sets::union),
    SystemCallDef::new("SetExcept", sets::except),
    SystemCallDef::new("SetToList", sets::to_list),
    SystemCallDef::new("ValueSome", optionals::value_some),
    SystemCallDef::new("ObjectSome", optionals::object_some),
    SystemCallDef::new("ValueNone", optionals::value_none),
    SystemCallDef::new("ObjectNone", optionals::object_none),
    SystemCallDef::new("OptionalHasValue", optionals::has_value),
    SystemCallDef::new("ValueOptionalValue", optionals::value_value),
    SystemCallDef::new("ObjectOptionalValue", optionals::object_value),
    SystemCallDef::new("ObjectEquals", records::object_equals),
];

pub fn lookup(id: u16) -> Option<&'static SystemCallDef> {
    SYSTEM_CALLS.get(id as usize)
}

/// Resolves a builtin's name to its dispatch id; the compiler boundary uses
/// this when emitting `SystemCall*` instructions.
pub fn system_call_id(name: &str) -> Option<u16> {
    SYSTEM_CALLS
        .iter()
        .position(|def| def.name == name)
        .map(|index| index as u16)
}

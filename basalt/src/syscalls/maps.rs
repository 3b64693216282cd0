use crate::error::Error;
use crate::map::{ObjectToObjectMap, ObjectToValueMap, ValueToObjectMap, ValueToValueMap};
use crate::object::Object;
use crate::syscalls::{confusion, SystemCallContext};

pub fn value_to_value_new(ctx: &mut SystemCallContext) -> Result<(), Error> {
    ctx.ret_object(Object::ValueToValueMap(ValueToValueMap::new()));
    Ok(())
}

pub fn value_to_object_new(ctx: &mut SystemCallContext) -> Result<(), Error> {
    ctx.ret_object(Object::ValueToObjectMap(ValueToObjectMap::new()));
    Ok(())
}

pub fn object_to_value_new(ctx: &mut SystemCallContext) -> Result<(), Error> {
    ctx.ret_object(Object::ObjectToValueMap(ObjectToValueMap::new()));
    Ok(())
}

pub fn object_to_object_new(ctx: &mut SystemCallContext) -> Result<(), Error> {
    ctx.ret_object(Object::ObjectToObjectMap(ObjectToObjectMap::new()));
    Ok(())
}

/// Maps are written through nested assignment; `MapSet` exists for the
/// common single-level case.
pub fn value_to_value_set(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let key = ctx.value(0)?;
    let value = ctx.value(1)?;
    let updated = ctx.value_to_value_map(0)?.insert(key, value);
    ctx.ret_object(Object::ValueToValueMap(updated));
    Ok(())
}

pub fn value_to_object_set(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let key = ctx.value(0)?;
    let value = ctx.object(1)?.clone();
    let updated = ctx.value_to_object_map(0)?.insert(key, value);
    ctx.ret_object(Object::ValueToObjectMap(updated));
    Ok(())
}

pub fn object_to_value_set(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let key = ctx.object(1)?.clone();
    let value = ctx.value(0)?;
    let updated = ctx.object_to_value_map(0)?.insert(key, value);
    ctx.ret_object(Object::ObjectToValueMap(updated));
    Ok(())
}

pub fn object_to_object_set(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let key = ctx.object(1)?.clone();
    let value = ctx.object(2)?.clone();
    let updated = ctx.object_to_object_map(0)?.insert(key, value);
    ctx.ret_object(Object::ObjectToObjectMap(updated));
    Ok(())
}

/// Works on any of the four map kinds.
pub fn len(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let count = match ctx.object(0)?.as_ref() {
        Object::ValueToValueMap(map) => map.len(),
        Object::ValueToObjectMap(map) => map.len(),
        Object::ObjectToValueMap(map) => map.len(),
        Object::ObjectToObjectMap(map) => map.len(),
        other => return Err(confusion("a map", other.type_name())),
    };
    ctx.ret_value(count as i64);
    Ok(())
}

pub fn value_contains_key(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let key = ctx.value(0)?;
    let present = match ctx.object(0)?.as_ref() {
        Object::ValueToValueMap(map) => map.contains_key(&key),
        Object::ValueToObjectMap(map) => map.contains_key(&key),
        other => return Err(confusion("a value-keyed map", other.type_name())),
    };
    ctx.ret_value(present);
    Ok(())
}

pub fn object_contains_key(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let key = ctx.object(1)?.clone();
    let present = match ctx.object(0)?.as_ref() {
        Object::ObjectToValueMap(map) => map.contains_key(&key),
        Object::ObjectToObjectMap(map) => map.contains_key(&key),
        other => return Err(confusion("an object-keyed map", other.type_name())),
    };
    ctx.ret_value(present);
    Ok(())
}

/// Value-keyed maps yield a `ValueList` of keys, object-keyed maps an
/// `ObjectList`.
pub fn keys(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let keys = match ctx.object(0)?.as_ref() {
        Object::ValueToValueMap(map) => Object::ValueList(map.keys()),
        Object::ValueToObjectMap(map) => Object::ValueList(map.keys()),
        Object::ObjectToValueMap(map) => Object::ObjectList(map.keys()),
        Object::ObjectToObjectMap(map) => Object::ObjectList(map.keys()),
        other => return Err(confusion("a map", other.type_name())),
    };
    ctx.ret_object(keys);
    Ok(())
}

pub fn values(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let values = match ctx.object(0)?.as_ref() {
        Object::ValueToValueMap(map) => Object::ValueList(map.values()),
        Object::ValueToObjectMap(map) => Object::ObjectList(map.values()),
        Object::ObjectToValueMap(map) => Object::ValueList(map.values()),
        Object::ObjectToObjectMap(map) => Object::ObjectList(map.values()),
        other => return Err(confusion("a map", other.type_name())),
    };
    ctx.ret_object(values);
    Ok(())
}

/// Right-hand entries win on key collisions.
pub fn union(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let combined = match (ctx.object(0)?.as_ref(), ctx.object(1)?.as_ref()) {
        (Object::ValueToValueMap(a), Object::ValueToValueMap(b)) => {
            Object::ValueToValueMap(a.union_with(b))
        }
        (Object::ValueToObjectMap(a), Object::ValueToObjectMap(b)) => {
            Object::ValueToObjectMap(a.union_with(b))
        }
        (Object::ObjectToValueMap(a), Object::ObjectToValueMap(b)) => {
            Object::ObjectToValueMap(a.union_with(b))
        }
        (Object::ObjectToObjectMap(a), Object::ObjectToObjectMap(b)) => {
            Object::ObjectToObjectMap(a.union_with(b))
        }
        (a, _) => return Err(confusion("two maps of the same kind", a.type_name())),
    };
    ctx.ret_object(combined);
    Ok(())
}

pub fn except(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let remaining = match (ctx.object(0)?.as_ref(), ctx.object(1)?.as_ref()) {
        (Object::ValueToValueMap(a), Object::ValueToValueMap(b)) => {
            Object::ValueToValueMap(a.except(b))
        }
        (Object::ValueToObjectMap(a), Object::ValueToObjectMap(b)) => {
            Object::ValueToObjectMap(a.except(b))
        }
        (Object::ObjectToValueMap(a), Object::ObjectToValueMap(b)) => {
            Object::ObjectToValueMap(a.except(b))
        }
        (Object::ObjectToObjectMap(a), Object::ObjectToObjectMap(b)) => {
            Object::ObjectToObjectMap(a.except(b))
        }
        (a, _) => return Err(confusion("two maps of the same kind", a.type_name())),
    };
    ctx.ret_object(remaining);
    Ok(())
}

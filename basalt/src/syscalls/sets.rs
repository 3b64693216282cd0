use crate::error::Error;
use crate::object::Object;
use crate::set::{ObjectSet, ValueSet};
use crate::syscalls::{confusion, SystemCallContext};

pub fn value_new(ctx: &mut SystemCallContext) -> Result<(), Error> {
    ctx.ret_object(Object::ValueSet(ValueSet::new()));
    Ok(())
}

pub fn object_new(ctx: &mut SystemCallContext) -> Result<(), Error> {
    ctx.ret_object(Object::ObjectSet(ObjectSet::new()));
    Ok(())
}

pub fn len(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let count = match ctx.object(0)?.as_ref() {
        Object::ValueSet(set) => set.len(),
        Object::ObjectSet(set) => set.len(),
        other => return Err(confusion("a set", other.type_name())),
    };
    ctx.ret_value(count as i64);
    Ok(())
}

pub fn value_add(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let key = ctx.value(0)?;
    let updated = ctx.value_set(0)?.insert(key);
    ctx.ret_object(Object::ValueSet(updated));
    Ok(())
}

pub fn object_add(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let key = ctx.object(1)?.clone();
    let updated = ctx.object_set(0)?.insert(key);
    ctx.ret_object(Object::ObjectSet(updated));
    Ok(())
}

/// Removing an absent key is a no-op.
pub fn value_remove(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let key = ctx.value(0)?;
    let updated = ctx.value_set(0)?.remove(&key);
    ctx.ret_object(Object::ValueSet(updated));
    Ok(())
}

pub fn object_remove(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let key = ctx.object(1)?.clone();
    let updated = ctx.object_set(0)?.remove(&key);
    ctx.ret_object(Object::ObjectSet(updated));
    Ok(())
}

pub fn value_contains(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let key = ctx.value(0)?;
    let present = ctx.value_set(0)?.contains(&key);
    ctx.ret_value(present);
    Ok(())
}

pub fn object_contains(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let key = ctx.object(1)?.clone();
    let present = ctx.object_set(0)?.contains(&key);
    ctx.ret_value(present);
    Ok(())
}

pub fn union(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let combined = match (ctx.object(0)?.as_ref(), ctx.object(1)?.as_ref()) {
        (Object::ValueSet(a), Object::ValueSet(b)) => Object::ValueSet(a.union_with(b)),
        (Object::ObjectSet(a), Object::ObjectSet(b)) => Object::ObjectSet(a.union_with(b)),
        (a, _) => return Err(confusion("two sets of the same kind", a.type_name())),
    };
    ctx.ret_object(combined);
    Ok(())
}

pub fn except(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let remaining = match (ctx.object(0)?.as_ref(), ctx.object(1)?.as_ref()) {
        (Object::ValueSet(a), Object::ValueSet(b)) => Object::ValueSet(a.except(b)),
        (Object::ObjectSet(a), Object::ObjectSet(b)) => Object::ObjectSet(a.except(b)),
        (a, _) => return Err(confusion("two sets of the same kind", a.type_name())),
    };
    ctx.ret_object(remaining);
    Ok(())
}

pub fn to_list(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let listed = match ctx.object(0)?.as_ref() {
        Object::ValueSet(set) => Object::ValueList(set.to_list()),
        Object::ObjectSet(set) => Object::ObjectList(set.to_list()),
        other => return Err(confusion("a set", other.type_name())),
    };
    ctx.ret_object(listed);
    Ok(())
}

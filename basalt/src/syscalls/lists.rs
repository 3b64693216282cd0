use crate::error::{Error, ErrorCode};
use crate::list::List;
use crate::object::Object;
use crate::syscalls::{confusion, SystemCallContext};
use crate::value::Value;

fn out_of_range(index: i64, len: usize) -> Error {
    Error::new(
        ErrorCode::ListIndexOutOfRange,
        format!("index {index} is out of range for a list of {len} elements"),
    )
}

fn empty_list() -> Error {
    Error::new(ErrorCode::ListIsEmpty, "list is empty")
}

fn checked_index(value: Value, len: usize) -> Result<usize, Error> {
    value
        .as_index()
        .filter(|&index| index < len)
        .ok_or_else(|| out_of_range(value.as_i64(), len))
}

/// Works on either list kind.
pub fn len(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let count = match ctx.object(0)?.as_ref() {
        Object::ValueList(list) => list.len(),
        Object::ObjectList(list) => list.len(),
        other => return Err(confusion("a list", other.type_name())),
    };
    ctx.ret_value(count as i64);
    Ok(())
}

pub fn value_get(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let list = ctx.value_list(0)?;
    let index = checked_index(ctx.value(0)?, list.len())?;
    let item = *list.get(index).ok_or_else(|| empty_list())?;
    ctx.ret_value(item);
    Ok(())
}

pub fn object_get(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let list = ctx.object_list(0)?;
    let index = checked_index(ctx.value(0)?, list.len())?;
    let item = list.get(index).cloned().ok_or_else(|| empty_list())?;
    ctx.ret_shared(item);
    Ok(())
}

pub fn value_set(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let list = ctx.value_list(0)?;
    let index = checked_index(ctx.value(0)?, list.len())?;
    let item = ctx.value(1)?;
    let updated = list.set(index, item).ok_or_else(|| empty_list())?;
    ctx.ret_object(Object::ValueList(updated));
    Ok(())
}

pub fn object_set(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let list = ctx.object_list(0)?;
    let index = checked_index(ctx.value(0)?, list.len())?;
    let item = ctx.object(1)?.clone();
    let updated = list.set(index, item).ok_or_else(|| empty_list())?;
    ctx.ret_object(Object::ObjectList(updated));
    Ok(())
}

pub fn value_add(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let list = ctx.value_list(0)?;
    let item = ctx.value(0)?;
    let updated = list
        .insert(list.len(), item)
        .ok_or_else(|| out_of_range(list.len() as i64, list.len()))?;
    ctx.ret_object(Object::ValueList(updated));
    Ok(())
}

pub fn object_add(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let list = ctx.object_list(0)?;
    let item = ctx.object(1)?.clone();
    let updated = list
        .insert(list.len(), item)
        .ok_or_else(|| out_of_range(list.len() as i64, list.len()))?;
    ctx.ret_object(Object::ObjectList(updated));
    Ok(())
}

pub fn value_insert_at(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let list = ctx.value_list(0)?;
    let raw = ctx.value(0)?;
    let index = raw
        .as_index()
        .filter(|&index| index <= list.len())
        .ok_or_else(|| out_of_range(raw.as_i64(), list.len()))?;
    let item = ctx.value(1)?;
    let updated = list.insert(index, item).ok_or_else(|| empty_list())?;
    ctx.ret_object(Object::ValueList(updated));
    Ok(())
}

pub fn object_insert_at(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let list = ctx.object_list(0)?;
    let raw = ctx.value(0)?;
    let index = raw
        .as_index()
        .filter(|&index| index <= list.len())
        .ok_or_else(|| out_of_range(raw.as_i64(), list.len()))?;
    let item = ctx.object(1)?.clone();
    let updated = list.insert(index, item).ok_or_else(|| empty_list())?;
    ctx.ret_object(Object::ObjectList(updated));
    Ok(())
}

fn checked_indices(raw: &[Value], len: usize) -> Result<Vec<usize>, Error> {
    raw.iter().map(|value| checked_index(*value, len)).collect()
}

/// Removes every index given in the value arguments at once; duplicates are
/// collapsed and any out-of-range index fails the whole call.
pub fn remove_at(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let updated = match ctx.object(0)?.as_ref() {
        Object::ValueList(list) => {
            let indices = checked_indices(ctx.value_args, list.len())?;
            list.remove_many(&indices).map(Object::ValueList)
        }
        Object::ObjectList(list) => {
            let indices = checked_indices(ctx.value_args, list.len())?;
            list.remove_many(&indices).map(Object::ObjectList)
        }
        other => return Err(confusion("a list", other.type_name())),
    };
    let updated = updated
        .ok_or_else(|| Error::new(ErrorCode::ListIndexOutOfRange, "index out of range"))?;
    ctx.ret_object(updated);
    Ok(())
}

pub fn value_first(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let list = ctx.value_list(0)?;
    let item = *list.get(0).ok_or_else(empty_list)?;
    ctx.ret_value(item);
    Ok(())
}

pub fn value_last(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let list = ctx.value_list(0)?;
    let item = *list
        .get(list.len().wrapping_sub(1))
        .ok_or_else(empty_list)?;
    ctx.ret_value(item);
    Ok(())
}

pub fn object_first(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let list = ctx.object_list(0)?;
    let item = list.get(0).cloned().ok_or_else(empty_list)?;
    ctx.ret_shared(item);
    Ok(())
}

pub fn object_last(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let list = ctx.object_list(0)?;
    let item = list
        .get(list.len().wrapping_sub(1))
        .cloned()
        .ok_or_else(empty_list)?;
    ctx.ret_shared(item);
    Ok(())
}

/// Drops the first `count` elements; dropping past the end yields empty.
pub fn skip(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let count = ctx.value(0)?.as_index().ok_or_else(|| {
        Error::new(ErrorCode::InvalidArgument, "count must not be negative")
    })?;
    let updated = match ctx.object(0)?.as_ref() {
        Object::ValueList(list) => {
            Object::ValueList(List::from_vector(list.items.skip(count.min(list.len()))))
        }
        Object::ObjectList(list) => {
            Object::ObjectList(List::from_vector(list.items.skip(count.min(list.len()))))
        }
        other => return Err(confusion("a list", other.type_name())),
    };
    ctx.ret_object(updated);
    Ok(())
}

/// Keeps the first `count` elements; taking past the end yields the whole
/// list.
pub fn take(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let count = ctx.value(0)?.as_index().ok_or_else(|| {
        Error::new(ErrorCode::InvalidArgument, "count must not be negative")
    })?;
    let updated = match ctx.object(0)?.as_ref() {
        Object::ValueList(list) => {
            Object::ValueList(List::from_vector(list.items.take(count.min(list.len()))))
        }
        Object::ObjectList(list) => {
            Object::ObjectList(List::from_vector(list.items.take(count.min(list.len()))))
        }
        other => return Err(confusion("a list", other.type_name())),
    };
    ctx.ret_object(updated);
    Ok(())
}

pub fn concat(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let updated = match (ctx.object(0)?.as_ref(), ctx.object(1)?.as_ref()) {
        (Object::ValueList(a), Object::ValueList(b)) => {
            let mut items = a.items.clone();
            items.append(b.items.clone());
            Object::ValueList(List::from_vector(items))
        }
        (Object::ObjectList(a), Object::ObjectList(b)) => {
            let mut items = a.items.clone();
            items.append(b.items.clone());
            Object::ObjectList(List::from_vector(items))
        }
        (a, b) => {
            return Err(confusion(
                "two lists of the same kind",
                if matches!(a, Object::ValueList(_) | Object::ObjectList(_)) {
                    b.type_name()
                } else {
                    a.type_name()
                },
            ))
        }
    };
    ctx.ret_object(updated);
    Ok(())
}

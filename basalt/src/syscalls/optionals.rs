use crate::error::{Error, ErrorCode};
use crate::object::Object;
use crate::syscalls::{confusion, SystemCallContext};

fn not_present() -> Error {
    Error::new(ErrorCode::ValueNotPresent, "optional has no value")
}

pub fn value_some(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let value = ctx.value(0)?;
    ctx.ret_object(Object::ValueOptional(Some(value)));
    Ok(())
}

pub fn object_some(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let object = ctx.object(0)?.clone();
    ctx.ret_object(Object::ObjectOptional(Some(object)));
    Ok(())
}

pub fn value_none(ctx: &mut SystemCallContext) -> Result<(), Error> {
    ctx.ret_object(Object::ValueOptional(None));
    Ok(())
}

pub fn object_none(ctx: &mut SystemCallContext) -> Result<(), Error> {
    ctx.ret_object(Object::ObjectOptional(None));
    Ok(())
}

pub fn has_value(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let present = match ctx.object(0)?.as_ref() {
        Object::ValueOptional(inner) => inner.is_some(),
        Object::ObjectOptional(inner) => inner.is_some(),
        other => return Err(confusion("an optional", other.type_name())),
    };
    ctx.ret_value(present);
    Ok(())
}

pub fn value_value(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let inner = match ctx.object(0)?.as_ref() {
        Object::ValueOptional(inner) => *inner,
        other => return Err(confusion("ValueOptional", other.type_name())),
    };
    ctx.ret_value(inner.ok_or_else(not_present)?);
    Ok(())
}

pub fn object_value(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let inner = match ctx.object(0)?.as_ref() {
        Object::ObjectOptional(inner) => inner.clone(),
        other => return Err(confusion("ObjectOptional", other.type_name())),
    };
    ctx.ret_shared(inner.ok_or_else(not_present)?);
    Ok(())
}

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{Error, ErrorCode};
use crate::object::Object;
use crate::syscalls::SystemCallContext;
use crate::value::Value;

/// String length in Unicode scalar values, not bytes.
pub fn len(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let count = ctx.string(0)?.chars().count();
    ctx.ret_value(count as i64);
    Ok(())
}

pub fn concat(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let mut combined = ctx.string(0)?.to_owned();
    combined.push_str(ctx.string(1)?);
    ctx.ret_object(Object::String(combined));
    Ok(())
}

pub fn chr(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let code = ctx.value(0)?.as_u64();
    let ch = u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| {
            Error::new(
                ErrorCode::InvalidArgument,
                format!("{code} is not a Unicode scalar value"),
            )
        })?;
    ctx.ret_object(Object::String(ch.to_string()));
    Ok(())
}

pub fn asc(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let text = ctx.string(0)?;
    let ch = text
        .chars()
        .next()
        .ok_or_else(|| Error::new(ErrorCode::InvalidArgument, "string is empty"))?;
    ctx.ret_value(ch as i64);
    Ok(())
}

/// Substring by character position and length, clamped to the string.
pub fn mid(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let start = ctx.value(0)?.as_index().ok_or_else(|| {
        Error::new(ErrorCode::InvalidArgument, "start must not be negative")
    })?;
    let count = ctx.value(1)?.as_index().ok_or_else(|| {
        Error::new(ErrorCode::InvalidArgument, "length must not be negative")
    })?;
    let text = ctx.string(2)?;
    let taken: String = text.chars().skip(start).take(count).collect();
    ctx.ret_object(Object::String(taken));
    Ok(())
}

/// Character index of the first occurrence of `needle`, or -1.
pub fn index_of(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let haystack = ctx.string(0)?;
    let needle = ctx.string(1)?;
    let found = haystack.find(needle);
    let index = match found {
        Some(byte_index) => haystack[..byte_index].chars().count() as i64,
        None => -1,
    };
    ctx.ret_value(index);
    Ok(())
}

pub fn number_to_string(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let value = ctx.value(0)?;
    ctx.ret_object(Object::String(value.num.normalize().to_string()));
    Ok(())
}

pub fn string_to_number(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let text = ctx.string(0)?;
    let num = Decimal::from_str(text.trim()).map_err(|_| {
        Error::new(
            ErrorCode::InvalidNumberFormat,
            format!("cannot parse \"{text}\" as a number"),
        )
    })?;
    ctx.ret_value(Value::new(num));
    Ok(())
}

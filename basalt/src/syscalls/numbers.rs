use rust_decimal::Decimal;

use crate::error::{Error, ErrorCode};
use crate::syscalls::SystemCallContext;
use crate::value::Value;

fn binop(
    ctx: &mut SystemCallContext,
    op: fn(Decimal, Decimal) -> Decimal,
) -> Result<(), Error> {
    let a = ctx.value(0)?;
    let b = ctx.value(1)?;
    ctx.ret_value(Value::new(op(a.num, b.num)));
    Ok(())
}

fn compare(
    ctx: &mut SystemCallContext,
    op: fn(&Decimal, &Decimal) -> bool,
) -> Result<(), Error> {
    let a = ctx.value(0)?;
    let b = ctx.value(1)?;
    ctx.ret_value(op(&a.num, &b.num));
    Ok(())
}

pub fn add(ctx: &mut SystemCallContext) -> Result<(), Error> {
    binop(ctx, |a, b| a + b)
}

pub fn subtract(ctx: &mut SystemCallContext) -> Result<(), Error> {
    binop(ctx, |a, b| a - b)
}

pub fn multiply(ctx: &mut SystemCallContext) -> Result<(), Error> {
    binop(ctx, |a, b| a * b)
}

pub fn divide(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let a = ctx.value(0)?;
    let b = ctx.value(1)?;
    if b.num.is_zero() {
        return Err(Error::new(ErrorCode::DivisionByZero, "division by zero"));
    }
    ctx.ret_value(Value::new(a.num / b.num));
    Ok(())
}

pub fn modulus(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let a = ctx.value(0)?;
    let b = ctx.value(1)?;
    if b.num.is_zero() {
        return Err(Error::new(ErrorCode::DivisionByZero, "modulus by zero"));
    }
    ctx.ret_value(Value::new(a.num % b.num));
    Ok(())
}

pub fn negate(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let a = ctx.value(0)?;
    ctx.ret_value(Value::new(-a.num));
    Ok(())
}

pub fn equals(ctx: &mut SystemCallContext) -> Result<(), Error> {
    compare(ctx, |a, b| a == b)
}

pub fn less_than(ctx: &mut SystemCallContext) -> Result<(), Error> {
    compare(ctx, |a, b| a < b)
}

pub fn less_than_equals(ctx: &mut SystemCallContext) -> Result<(), Error> {
    compare(ctx, |a, b| a <= b)
}

pub fn greater_than(ctx: &mut SystemCallContext) -> Result<(), Error> {
    compare(ctx, |a, b| a > b)
}

pub fn greater_than_equals(ctx: &mut SystemCallContext) -> Result<(), Error> {
    compare(ctx, |a, b| a >= b)
}

pub fn not(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let a = ctx.value(0)?;
    ctx.ret_value(!a.as_bool());
    Ok(())
}

pub fn and(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let a = ctx.value(0)?;
    let b = ctx.value(1)?;
    ctx.ret_value(a.as_bool() && b.as_bool());
    Ok(())
}

pub fn or(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let a = ctx.value(0)?;
    let b = ctx.value(1)?;
    ctx.ret_value(a.as_bool() || b.as_bool());
    Ok(())
}

pub fn floor(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let a = ctx.value(0)?;
    ctx.ret_value(Value::new(a.num.floor()));
    Ok(())
}

pub fn abs(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let a = ctx.value(0)?;
    ctx.ret_value(Value::new(a.num.abs()));
    Ok(())
}

/// `FOR` loop termination: whether `counter` has stepped past `limit` in the
/// direction of `step`.
pub fn counter_is_past_limit(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let counter = ctx.value(0)?;
    let limit = ctx.value(1)?;
    let step = ctx.value(2)?;
    let past = if step.num.is_sign_negative() {
        counter.num < limit.num
    } else {
        counter.num > limit.num
    };
    ctx.ret_value(past);
    Ok(())
}

use crate::error::Error;
use crate::syscalls::SystemCallContext;

/// Deep structural equality over any two objects; mismatched kinds compare
/// unequal rather than erroring.
pub fn object_equals(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let equal = ctx.object(0)? == ctx.object(1)?;
    ctx.ret_value(equal);
    Ok(())
}

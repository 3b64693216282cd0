use crate::error::{Error, ErrorCode};
use crate::object::Object;
use crate::syscalls::SystemCallContext;

fn io_failure(err: std::io::Error) -> Error {
    Error::new(ErrorCode::IoFailure, err.to_string())
}

/// Writes a string to the output stream verbatim; callers append their own
/// newline.
pub fn print(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let text = ctx.string(0)?.to_owned();
    ctx.out.write_all(text.as_bytes()).map_err(io_failure)?;
    ctx.out.flush().map_err(io_failure)
}

/// Reads one line from the input stream, without the trailing newline.
pub fn input_line(ctx: &mut SystemCallContext) -> Result<(), Error> {
    let mut line = String::new();
    ctx.input.read_line(&mut line).map_err(io_failure)?;
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    ctx.ret_object(Object::String(line));
    Ok(())
}

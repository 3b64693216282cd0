use crate::error::Fault;

/// One procedure activation. Created on call, destroyed on return; addresses
/// the shared operand stacks by the cursor positions captured at call time.
/// `procedure` is the *caller's* procedure index (`None` for the synthetic
/// bottom frame) and `instruction_index` the caller's resume offset.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub procedure: Option<usize>,
    pub instruction_index: usize,
    pub num_value_args: usize,
    pub num_object_args: usize,
    pub value_args_start: usize,
    pub object_args_start: usize,
    pub value_locals_start: usize,
    pub object_locals_start: usize,
    pub returns_value: bool,
    pub returns_object: bool,
}

impl CallFrame {
    /// `value_cursor`/`object_cursor` are the stack cursors at the call
    /// instruction; the callee's arguments are already on the stacks below
    /// them, and its locals will start exactly there. A call instruction
    /// declaring more arguments than the stacks hold is a fault.
    #[expect(clippy::too_many_arguments, reason = "plain activation record")]
    pub fn new(
        procedure: Option<usize>,
        instruction_index: usize,
        num_value_args: usize,
        num_object_args: usize,
        value_cursor: usize,
        object_cursor: usize,
        returns_value: bool,
        returns_object: bool,
    ) -> Result<Self, Fault> {
        let value_args_start = value_cursor
            .checked_sub(num_value_args)
            .ok_or(Fault::ValueStackUnderflow)?;
        let object_args_start = object_cursor
            .checked_sub(num_object_args)
            .ok_or(Fault::ObjectStackUnderflow)?;
        Ok(Self {
            procedure,
            instruction_index,
            num_value_args,
            num_object_args,
            value_args_start,
            object_args_start,
            value_locals_start: value_cursor,
            object_locals_start: object_cursor,
            returns_value,
            returns_object,
        })
    }

    /// The bottom-of-stack frame representing "no caller".
    pub fn bottom() -> Self {
        Self {
            procedure: None,
            instruction_index: 0,
            num_value_args: 0,
            num_object_args: 0,
            value_args_start: 0,
            object_args_start: 0,
            value_locals_start: 0,
            object_locals_start: 0,
            returns_value: false,
            returns_object: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallStack(Vec<CallFrame>);

impl CallStack {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn push(&mut self, frame: CallFrame) {
        self.0.push(frame);
    }

    pub fn pop(&mut self) -> Result<CallFrame, Fault> {
        self.0.pop().ok_or(Fault::EmptyCallStack)
    }

    pub fn current(&self) -> Result<&CallFrame, Fault> {
        self.0.last().ok_or(Fault::EmptyCallStack)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_derives_argument_starts_from_cursors() {
        let frame = CallFrame::new(Some(0), 42, 2, 1, 10, 5, true, false).unwrap();
        assert_eq!(frame.value_args_start, 8);
        assert_eq!(frame.object_args_start, 4);
        assert_eq!(frame.value_locals_start, 10);
        assert_eq!(frame.object_locals_start, 5);
        assert!(frame.returns_value);
        assert!(!frame.returns_object);
    }

    #[test]
    fn frame_rejects_more_arguments_than_the_cursors_hold() {
        assert!(matches!(
            CallFrame::new(Some(0), 0, 3, 0, 2, 0, false, false),
            Err(Fault::ValueStackUnderflow)
        ));
        assert!(matches!(
            CallFrame::new(Some(0), 0, 0, 2, 5, 1, false, false),
            Err(Fault::ObjectStackUnderflow)
        ));
    }

    #[test]
    fn bottom_frame_has_no_caller() {
        let frame = CallFrame::bottom();
        assert!(frame.procedure.is_none());
        assert_eq!(frame.value_args_start, 0);
    }

    #[test]
    fn call_stack_orders_frames() {
        let mut stack = CallStack::new();
        stack.push(CallFrame::bottom());
        stack.push(CallFrame::new(Some(3), 7, 0, 0, 0, 0, false, false).unwrap());
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current().unwrap().procedure, Some(3));
        assert_eq!(stack.pop().unwrap().instruction_index, 7);
        assert!(stack.pop().unwrap().procedure.is_none());
        assert!(matches!(stack.pop(), Err(Fault::EmptyCallStack)));
    }
}

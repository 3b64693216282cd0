//! The dispatch loop. One interpreter owns one program and runs it
//! cooperatively: `run` executes up to a cycle budget and returns whether
//! there is more work, so the host can interleave other duties between
//! ticks.

use std::io::{self, BufRead, Write};
use std::rc::Rc;

use log::{debug, trace};

use crate::bytecode::{InstructionReader, Opcode};
use crate::dotted::{self, Abort, AssignSource, Assignment};
use crate::error::{ErrorCode, Fault};
use crate::frame::{CallFrame, CallStack};
use crate::list::{ObjectListBuilder, ValueListBuilder};
use crate::object::Object;
use crate::program::Program;
use crate::record::RecordBuilder;
use crate::stack::{ExecutionState, ExecutionStateInfo};
use crate::syscalls::{self, SystemCallContext};
use crate::value::Value;

/// The recoverable error state, readable between `run` calls. The code is a
/// program-level `Value` because programs may raise their own codes with
/// `SetError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub code: Value,
    pub message: String,
}

pub struct Interpreter {
    program: Program,
    info: ExecutionStateInfo,
    state: ExecutionState,
    call_stack: CallStack,
    /// `None` between sessions: before `init`, after halting, and after a
    /// fault.
    reader: Option<InstructionReader>,
    current_procedure: usize,
    has_error: bool,
    error_code: Value,
    error_message: String,
    out: Box<dyn Write>,
    input: Box<dyn BufRead>,
}

impl Interpreter {
    pub fn new(program: Program) -> Self {
        Self::with_info(program, ExecutionStateInfo::default())
    }

    pub fn with_info(program: Program, info: ExecutionStateInfo) -> Self {
        Self {
            program,
            info,
            state: ExecutionState::new(&info),
            call_stack: CallStack::new(),
            reader: None,
            current_procedure: 0,
            has_error: false,
            error_code: Value::default(),
            error_message: String::new(),
            out: Box::new(io::stdout()),
            input: Box::new(io::BufReader::new(io::stdin())),
        }
    }

    /// Redirects console builtins; useful for embedding and tests.
    pub fn set_output(&mut self, out: Box<dyn Write>) {
        self.out = out;
    }

    pub fn set_input(&mut self, input: Box<dyn BufRead>) {
        self.input = input;
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Prepares a fresh session at the given procedure, discarding all
    /// earlier stack and error state.
    pub fn init(&mut self, procedure_index: usize) -> Result<(), Fault> {
        let procedure = self
            .program
            .procedures
            .get(procedure_index)
            .ok_or(Fault::BadProcedureIndex(procedure_index))?;
        self.state = ExecutionState::new(&self.info);
        self.call_stack.clear();
        self.call_stack.push(CallFrame::bottom());
        self.reader = Some(InstructionReader::new(procedure.instructions.clone(), 0));
        self.current_procedure = procedure_index;
        self.has_error = false;
        self.error_code = Value::default();
        self.error_message.clear();
        debug!("session initialized at procedure {procedure_index}");
        Ok(())
    }

    pub fn error(&self) -> Option<RuntimeError> {
        self.has_error.then(|| RuntimeError {
            code: self.error_code,
            message: self.error_message.clone(),
        })
    }

    fn raise(&mut self, code: Value, message: String) {
        self.has_error = true;
        self.error_code = code;
        self.error_message = message;
    }

    /// Unwinds the current frame: everything above the callee's argument
    /// start is discarded, and execution resumes in the caller. Returns
    /// `false` when the bottom frame was unwound, i.e. the program is done.
    fn return_from_procedure(&mut self, reader: &mut InstructionReader) -> Result<bool, Fault> {
        let frame = self.call_stack.pop()?;
        self.state.truncate_values(frame.value_args_start);
        self.state.truncate_objects(frame.object_args_start);
        match frame.procedure {
            Some(index) => {
                let procedure = self
                    .program
                    .procedures
                    .get(index)
                    .ok_or(Fault::BadProcedureIndex(index))?;
                *reader =
                    InstructionReader::new(procedure.instructions.clone(), frame.instruction_index);
                self.current_procedure = index;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn pop_syscall_args(
        &mut self,
        num_values: usize,
        num_objects: usize,
    ) -> Result<(Vec<Value>, Vec<Rc<Object>>), Fault> {
        let mut values = Vec::with_capacity(num_values);
        for _ in 0..num_values {
            values.push(self.state.pop_value()?);
        }
        values.reverse();
        let mut objects = Vec::with_capacity(num_objects);
        for _ in 0..num_objects {
            let slot = self.state.pop_object()?;
            objects.push(slot.ok_or(Fault::EmptyObjectSlot(self.state.object_cursor()))?);
        }
        objects.reverse();
        Ok((values, objects))
    }

    /// Executes up to `max_cycles` instructions. `Ok(true)` means the budget
    /// ran out with more work pending; `Ok(false)` means the program halted.
    /// `Err` is a fault: the session is dead and must be re-`init`ed.
    pub fn run(&mut self, max_cycles: usize) -> Result<bool, Fault> {
        let Some(mut reader) = self.reader.take() else {
            return Ok(false);
        };

        for cycle in 0..max_cycles {
            let at = reader.offset;
            let byte = reader.read_u8()?;
            let opcode = Opcode::from_byte(byte).ok_or(Fault::UnknownOpcode(byte, at))?;
            trace!(
                "cycle {cycle:5} | proc {:3} pc {at:5} | {opcode:?}",
                self.current_procedure
            );

            match opcode {
                Opcode::Exit => {
                    return Ok(false);
                }

                Opcode::PushImmediateInt64 => {
                    let imm = reader.read_i64()?;
                    self.state.push_value(Value::from(imm))?;
                }

                Opcode::PushImmediateDecimal => {
                    let num = reader.read_decimal()?;
                    self.state.push_value(Value::new(num))?;
                }

                Opcode::PushImmediateUtf8 => {
                    let len = reader.read_u32()? as usize;
                    let bytes = reader.read_bytes(len)?;
                    let text = String::from_utf8(bytes)
                        .map_err(|_| Fault::MalformedProgram("string literal is not UTF-8"))?;
                    self.state.push_object(Rc::new(Object::String(text)))?;
                }

                Opcode::PopValue => {
                    self.state.pop_value()?;
                }

                Opcode::PopObject => {
                    self.state.pop_object()?;
                }

                Opcode::DuplicateValue => {
                    let top = self.state.value_nth(0)?;
                    self.state.push_value(top)?;
                }

                Opcode::DuplicateObject => {
                    let top = self.state.object_nth(0)?.clone();
                    self.state.push_object(top)?;
                }

                Opcode::SwapValues => {
                    self.state.swap_values()?;
                }

                Opcode::SwapObjects => {
                    self.state.swap_objects()?;
                }

                Opcode::InitLocals => {
                    let num_values = reader.read_u16()? as usize;
                    let num_objects = reader.read_u16()? as usize;
                    self.state.reserve_locals(num_values, num_objects)?;
                }

                Opcode::PushArgumentValue => {
                    let arg = reader.read_u8()? as usize;
                    let base = self.call_stack.current()?.value_args_start;
                    let value = self.state.value_at(base + arg)?;
                    self.state.push_value(value)?;
                }

                Opcode::PushArgumentObject => {
                    let arg = reader.read_u8()? as usize;
                    let base = self.call_stack.current()?.object_args_start;
                    let object = self.state.object_at(base + arg)?.clone();
                    self.state.push_object(object)?;
                }

                Opcode::SetArgumentValue => {
                    let arg = reader.read_u8()? as usize;
                    let value = self.state.pop_value()?;
                    let base = self.call_stack.current()?.value_args_start;
                    self.state.set_value_at(base + arg, value)?;
                }

                Opcode::SetArgumentObject => {
                    let arg = reader.read_u8()? as usize;
                    let object = self.state.pop_object()?;
                    let base = self.call_stack.current()?.object_args_start;
                    self.state.set_object_at(base + arg, object)?;
                }

                Opcode::PushGlobalValue => {
                    let slot = reader.read_u16()? as usize;
                    let value = *self
                        .program
                        .global_values
                        .get(slot)
                        .ok_or(Fault::BadGlobalIndex(slot))?;
                    self.state.push_value(value)?;
                }

                Opcode::PushGlobalObject => {
                    let slot = reader.read_u16()? as usize;
                    let object = self
                        .program
                        .global_objects
                        .get(slot)
                        .ok_or(Fault::BadGlobalIndex(slot))?
                        .clone();
                    match object {
                        Some(object) => self.state.push_object(object)?,
                        None => self.state.push_empty_object()?,
                    }
                }

                Opcode::SetGlobalValue => {
                    let slot = reader.read_u16()? as usize;
                    let value = self.state.pop_value()?;
                    *self
                        .program
                        .global_values
                        .get_mut(slot)
                        .ok_or(Fault::BadGlobalIndex(slot))? = value;
                }

                Opcode::SetGlobalObject => {
                    let slot = reader.read_u16()? as usize;
                    let object = self.state.pop_object()?;
                    *self
                        .program
                        .global_objects
                        .get_mut(slot)
                        .ok_or(Fault::BadGlobalIndex(slot))? = object;
                }

                Opcode::PushLocalValue => {
                    let local = reader.read_u16()? as usize;
                    let base = self.call_stack.current()?.value_locals_start;
                    let value = self.state.value_at(base + local)?;
                    self.state.push_value(value)?;
                }

                Opcode::PushLocalObject => {
                    let local = reader.read_u16()? as usize;
                    let base = self.call_stack.current()?.object_locals_start;
                    let object = self.state.object_at(base + local)?.clone();
                    self.state.push_object(object)?;
                }

                Opcode::SetLocalValue => {
                    let local = reader.read_u16()? as usize;
                    let value = self.state.pop_value()?;
                    let base = self.call_stack.current()?.value_locals_start;
                    self.state.set_value_at(base + local, value)?;
                }

                Opcode::SetLocalObject => {
                    let local = reader.read_u16()? as usize;
                    let object = self.state.pop_object()?;
                    let base = self.call_stack.current()?.object_locals_start;
                    self.state.set_object_at(base + local, object)?;
                }

                Opcode::ClearLocalObject => {
                    let local = reader.read_u16()? as usize;
                    let base = self.call_stack.current()?.object_locals_start;
                    self.state.set_object_at(base + local, None)?;
                }

                Opcode::Jump => {
                    let target = reader.read_u32()? as usize;
                    reader.jump_to(target);
                }

                Opcode::BranchIfTrue => {
                    let target = reader.read_u32()? as usize;
                    let condition = self.state.pop_value()?;
                    if condition.as_bool() {
                        reader.jump_to(target);
                    }
                }

                Opcode::BranchIfFalse => {
                    let target = reader.read_u32()? as usize;
                    let condition = self.state.pop_value()?;
                    if !condition.as_bool() {
                        reader.jump_to(target);
                    }
                }

                Opcode::Call | Opcode::CallV | Opcode::CallO => {
                    let procedure_index = reader.read_u32()? as usize;
                    let num_values = reader.read_u8()? as usize;
                    let num_objects = reader.read_u8()? as usize;
                    let procedure = self
                        .program
                        .procedures
                        .get(procedure_index)
                        .ok_or(Fault::BadProcedureIndex(procedure_index))?;
                    self.call_stack.push(CallFrame::new(
                        Some(self.current_procedure),
                        reader.offset,
                        num_values,
                        num_objects,
                        self.state.value_cursor(),
                        self.state.object_cursor(),
                        opcode == Opcode::CallV,
                        opcode == Opcode::CallO,
                    )?);
                    reader = InstructionReader::new(procedure.instructions.clone(), 0);
                    self.current_procedure = procedure_index;
                }

                Opcode::SystemCall
                | Opcode::SystemCallV
                | Opcode::SystemCallO
                | Opcode::SystemCallVO => {
                    let id = reader.read_u16()?;
                    let num_values = reader.read_u8()? as usize;
                    let num_objects = reader.read_u8()? as usize;
                    let def = syscalls::lookup(id).ok_or(Fault::UnknownSystemCall(id))?;
                    let returns_value =
                        matches!(opcode, Opcode::SystemCallV | Opcode::SystemCallVO);
                    let returns_object =
                        matches!(opcode, Opcode::SystemCallO | Opcode::SystemCallVO);
                    trace!("system call {}", def.name);

                    let (values, objects) = self.pop_syscall_args(num_values, num_objects)?;
                    let mut ctx = SystemCallContext {
                        value_args: &values,
                        object_args: &objects,
                        out: self.out.as_mut(),
                        input: self.input.as_mut(),
                        result_value: Value::default(),
                        result_object: None,
                    };
                    match (def.ptr)(&mut ctx) {
                        Ok(()) => {
                            let result_value = ctx.result_value;
                            let result_object = ctx.result_object.take();
                            if returns_value {
                                self.state.push_value(result_value)?;
                            }
                            if returns_object {
                                let object = result_object.ok_or(Fault::TypeConfusion {
                                    expected: "an object result",
                                    found: "nothing",
                                })?;
                                self.state.push_object(object)?;
                            }
                        }
                        Err(error) => {
                            self.raise(error.code.value(), error.message);
                        }
                    }
                }

                Opcode::Return => {
                    if !self.return_from_procedure(&mut reader)? {
                        return Ok(false);
                    }
                }

                Opcode::ReturnValue => {
                    let value = self.state.pop_value()?;
                    if !self.return_from_procedure(&mut reader)? {
                        return Ok(false);
                    }
                    self.state.push_value(value)?;
                }

                Opcode::ReturnObject => {
                    let object = self.state.pop_object()?;
                    if !self.return_from_procedure(&mut reader)? {
                        return Ok(false);
                    }
                    match object {
                        Some(object) => self.state.push_object(object)?,
                        None => self.state.push_empty_object()?,
                    }
                }

                Opcode::SetError => {
                    let message = match self.state.object_nth(0)?.as_ref() {
                        Object::String(text) => text.clone(),
                        other => {
                            return Err(Fault::TypeConfusion {
                                expected: "String",
                                found: other.type_name(),
                            })
                        }
                    };
                    let code = self.state.value_nth(0)?;
                    self.raise(code, message);
                    self.state.pop_value()?;
                    self.state.pop_object()?;
                }

                Opcode::ClearError => {
                    self.has_error = false;
                }

                Opcode::BubbleError => {
                    self.has_error = true;
                }

                Opcode::ReturnIfError => {
                    if self.has_error && !self.return_from_procedure(&mut reader)? {
                        return Ok(false);
                    }
                }

                Opcode::BranchIfError => {
                    let target = reader.read_u32()? as usize;
                    if self.has_error {
                        reader.jump_to(target);
                    }
                }

                Opcode::SetErrorMapKeyNotFound => {
                    self.raise(
                        ErrorCode::MapKeyNotFound.value(),
                        "key not found".to_owned(),
                    );
                }

                Opcode::RecordNew => {
                    let num_values = reader.read_u16()? as usize;
                    let num_objects = reader.read_u16()? as usize;
                    let mut builder = RecordBuilder::new(num_values, num_objects);
                    for index in (0..num_values).rev() {
                        let value = self.state.pop_value()?;
                        builder.set_value(index, value);
                    }
                    for index in (0..num_objects).rev() {
                        let slot = self.state.pop_object()?;
                        let object =
                            slot.ok_or(Fault::EmptyObjectSlot(self.state.object_cursor()))?;
                        builder.set_object(index, object);
                    }
                    let record = builder
                        .build()
                        .ok_or(Fault::MalformedProgram("record built with unset fields"))?;
                    self.state.push_object(Rc::new(Object::Record(record)))?;
                }

                Opcode::RecordGetValue => {
                    let field = reader.read_u16()? as usize;
                    let value = match self.state.object_nth(0)?.as_ref() {
                        Object::Record(record) => record
                            .value(field)
                            .ok_or(Fault::RecordIndexOutOfRange(field))?,
                        other => {
                            return Err(Fault::TypeConfusion {
                                expected: "Record",
                                found: other.type_name(),
                            })
                        }
                    };
                    self.state.pop_object()?;
                    self.state.push_value(value)?;
                }

                Opcode::RecordGetObject => {
                    let field = reader.read_u16()? as usize;
                    let object = match self.state.object_nth(0)?.as_ref() {
                        Object::Record(record) => record
                            .object(field)
                            .ok_or(Fault::RecordIndexOutOfRange(field))?
                            .clone(),
                        other => {
                            return Err(Fault::TypeConfusion {
                                expected: "Record",
                                found: other.type_name(),
                            })
                        }
                    };
                    self.state.pop_object()?;
                    self.state.push_object(object)?;
                }

                Opcode::RecordSetValue => {
                    let field = reader.read_u16()? as usize;
                    let value = self.state.value_nth(0)?;
                    let updated = match self.state.object_nth(0)?.as_ref() {
                        Object::Record(record) => record
                            .with_value(field, value)
                            .ok_or(Fault::RecordIndexOutOfRange(field))?,
                        other => {
                            return Err(Fault::TypeConfusion {
                                expected: "Record",
                                found: other.type_name(),
                            })
                        }
                    };
                    self.state.pop_object()?;
                    self.state.pop_value()?;
                    self.state.push_object(Rc::new(Object::Record(updated)))?;
                }

                Opcode::RecordSetObject => {
                    let field = reader.read_u16()? as usize;
                    let replacement = self.state.object_nth(0)?.clone();
                    let updated = match self.state.object_nth(1)?.as_ref() {
                        Object::Record(record) => record
                            .with_object(field, replacement)
                            .ok_or(Fault::RecordIndexOutOfRange(field))?,
                        other => {
                            return Err(Fault::TypeConfusion {
                                expected: "Record",
                                found: other.type_name(),
                            })
                        }
                    };
                    self.state.pop_object()?;
                    self.state.pop_object()?;
                    self.state.push_object(Rc::new(Object::Record(updated)))?;
                }

                Opcode::ValueListNew => {
                    let count = reader.read_u16()? as usize;
                    let mut builder = ValueListBuilder::new();
                    for index in (0..count).rev() {
                        builder.push(self.state.value_nth(index)?);
                    }
                    for _ in 0..count {
                        self.state.pop_value()?;
                    }
                    self.state
                        .push_object(Rc::new(Object::ValueList(builder.build())))?;
                }

                Opcode::ObjectListNew => {
                    let count = reader.read_u16()? as usize;
                    let mut builder = ObjectListBuilder::new();
                    for index in (0..count).rev() {
                        builder.push(self.state.object_nth(index)?.clone());
                    }
                    for _ in 0..count {
                        self.state.pop_object()?;
                    }
                    self.state
                        .push_object(Rc::new(Object::ObjectList(builder.build())))?;
                }

                Opcode::ValueToValueMapTryGet => {
                    let key = self.state.value_nth(0)?;
                    let found = match self.state.object_nth(0)?.as_ref() {
                        Object::ValueToValueMap(map) => map.get(&key).copied(),
                        other => {
                            return Err(Fault::TypeConfusion {
                                expected: "ValueToValueMap",
                                found: other.type_name(),
                            })
                        }
                    };
                    self.state.pop_object()?;
                    self.state.pop_value()?;
                    self.state.push_value(found.unwrap_or_default())?;
                    self.state.push_value(Value::from(found.is_some()))?;
                }

                Opcode::ValueToObjectMapTryGet => {
                    let key = self.state.value_nth(0)?;
                    let found = match self.state.object_nth(0)?.as_ref() {
                        Object::ValueToObjectMap(map) => map.get(&key).cloned(),
                        other => {
                            return Err(Fault::TypeConfusion {
                                expected: "ValueToObjectMap",
                                found: other.type_name(),
                            })
                        }
                    };
                    self.state.pop_object()?;
                    self.state.pop_value()?;
                    let success = found.is_some();
                    match found {
                        Some(object) => self.state.push_object(object)?,
                        None => self.state.push_empty_object()?,
                    }
                    self.state.push_value(Value::from(success))?;
                }

                Opcode::ObjectToValueMapTryGet => {
                    let key = self.state.object_nth(0)?.clone();
                    let found = match self.state.object_nth(1)?.as_ref() {
                        Object::ObjectToValueMap(map) => map.get(&key).copied(),
                        other => {
                            return Err(Fault::TypeConfusion {
                                expected: "ObjectToValueMap",
                                found: other.type_name(),
                            })
                        }
                    };
                    self.state.pop_object()?;
                    self.state.pop_object()?;
                    self.state.push_value(found.unwrap_or_default())?;
                    self.state.push_value(Value::from(found.is_some()))?;
                }

                Opcode::ObjectToObjectMapTryGet => {
                    let key = self.state.object_nth(0)?.clone();
                    let found = match self.state.object_nth(1)?.as_ref() {
                        Object::ObjectToObjectMap(map) => map.get(&key).cloned(),
                        other => {
                            return Err(Fault::TypeConfusion {
                                expected: "ObjectToObjectMap",
                                found: other.type_name(),
                            })
                        }
                    };
                    self.state.pop_object()?;
                    self.state.pop_object()?;
                    let success = found.is_some();
                    match found {
                        Some(object) => self.state.push_object(object)?,
                        None => self.state.push_empty_object()?,
                    }
                    self.state.push_value(Value::from(success))?;
                }

                Opcode::DottedExpressionSetValue | Opcode::DottedExpressionSetObject => {
                    let assigning_value = opcode == Opcode::DottedExpressionSetValue;
                    let num_suffixes = reader.read_u8()? as usize;
                    let num_key_values = reader.read_u8()? as usize;
                    let num_key_objects = reader.read_u8()? as usize;
                    // decoding up front moves the instruction pointer past
                    // the whole chain, whatever happens during the rebuild
                    let suffixes = dotted::decode_suffixes(&mut reader, num_suffixes)?;

                    let base = self.state.object_nth(num_key_objects)?.clone();
                    let source = if assigning_value {
                        AssignSource::Value(self.state.value_nth(num_key_values)?)
                    } else {
                        AssignSource::Object(self.state.object_nth(num_key_objects + 1)?.clone())
                    };
                    let mut key_values = Vec::with_capacity(num_key_values);
                    for index in (0..num_key_values).rev() {
                        key_values.push(self.state.value_nth(index)?);
                    }
                    let mut key_objects = Vec::with_capacity(num_key_objects);
                    for index in (0..num_key_objects).rev() {
                        key_objects.push(self.state.object_nth(index)?.clone());
                    }

                    let assignment = Assignment {
                        source,
                        key_values: &key_values,
                        key_objects: &key_objects,
                    };
                    let result = dotted::rebuild(&assignment, &base, &suffixes, 0, 0);

                    for _ in 0..num_key_values {
                        self.state.pop_value()?;
                    }
                    for _ in 0..num_key_objects {
                        self.state.pop_object()?;
                    }
                    if assigning_value {
                        self.state.pop_value()?;
                    } else {
                        self.state.pop_object()?;
                    }
                    match result {
                        Ok(updated) => self.state.push_object(updated)?,
                        Err(Abort::Recoverable(error)) => {
                            self.raise(error.code.value(), error.message);
                            // leave the base unchanged so the program can
                            // handle the error and keep using it
                            self.state.push_object(base)?;
                        }
                        Err(Abort::Fatal(fault)) => return Err(fault),
                    }
                }
            }
        }

        self.reader = Some(reader);
        Ok(true)
    }
}

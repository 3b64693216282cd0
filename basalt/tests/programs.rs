//! End-to-end programs assembled by hand and executed through the public
//! API, checking console output and the error channel.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use basalt::{
    ErrorCode, Fault, InstructionWriter, Interpreter, Opcode, Program, RuntimeError, Value,
    system_call_id,
};

#[derive(Clone, Default)]
struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn push_int(w: &mut InstructionWriter, value: i64) {
    w.emit(Opcode::PushImmediateInt64).write_i64(value);
}

fn push_str(w: &mut InstructionWriter, text: &str) {
    w.emit(Opcode::PushImmediateUtf8).write_utf8(text);
}

fn syscall(w: &mut InstructionWriter, variant: Opcode, name: &str, values: u8, objects: u8) {
    w.emit(variant)
        .write_u16(system_call_id(name).unwrap())
        .write_u8(values)
        .write_u8(objects);
}

/// Prints the value on top of the value stack.
fn print_top_value(w: &mut InstructionWriter) {
    syscall(w, Opcode::SystemCallO, "NumberToString", 1, 0);
    syscall(w, Opcode::SystemCall, "Print", 0, 1);
}

fn print_literal(w: &mut InstructionWriter, text: &str) {
    push_str(w, text);
    syscall(w, Opcode::SystemCall, "Print", 0, 1);
}

fn run_program(program: Program) -> (String, Option<RuntimeError>) {
    let output = SharedOutput::default();
    let mut interpreter = Interpreter::new(program);
    interpreter.set_output(Box::new(output.clone()));
    interpreter.init(0).unwrap();
    while interpreter.run(1_000).unwrap() {}
    let text = String::from_utf8(output.0.borrow().clone()).unwrap();
    (text, interpreter.error())
}

/// Main calls an add procedure with two arguments and prints the sum.
fn add_and_print_program() -> Program {
    let mut add = InstructionWriter::new();
    add.emit(Opcode::PushArgumentValue).write_u8(0);
    add.emit(Opcode::PushArgumentValue).write_u8(1);
    syscall(&mut add, Opcode::SystemCallV, "NumberAdd", 2, 0);
    add.emit(Opcode::ReturnValue);

    let mut main = InstructionWriter::new();
    push_int(&mut main, 1);
    push_int(&mut main, 2);
    main.emit(Opcode::CallV)
        .write_u32(1)
        .write_u8(2)
        .write_u8(0);
    print_top_value(&mut main);
    main.emit(Opcode::Exit);

    let mut program = Program::new();
    program.procedures.push(main.finish());
    program.procedures.push(add.finish());
    program
}

#[test]
fn two_procedure_add_prints_sum() {
    let (text, error) = run_program(add_and_print_program());
    assert_eq!(text, "3");
    assert_eq!(error, None);
}

#[test]
fn single_stepping_matches_batch_execution() {
    let (batch_text, batch_error) = run_program(add_and_print_program());

    let output = SharedOutput::default();
    let mut interpreter = Interpreter::new(add_and_print_program());
    interpreter.set_output(Box::new(output.clone()));
    interpreter.init(0).unwrap();
    let mut steps = 0;
    while interpreter.run(1).unwrap() {
        steps += 1;
    }
    assert!(steps > 5);
    let stepped_text = String::from_utf8(output.0.borrow().clone()).unwrap();
    assert_eq!(stepped_text, batch_text);
    assert_eq!(interpreter.error(), batch_error);
}

#[test]
fn exhausted_budget_reports_pending_work() {
    let mut main = InstructionWriter::new();
    main.emit(Opcode::Jump).write_u32(0);
    let mut program = Program::new();
    program.procedures.push(main.finish());

    let mut interpreter = Interpreter::new(program);
    interpreter.init(0).unwrap();
    assert!(interpreter.run(10).unwrap());
    assert!(interpreter.run(10).unwrap());
}

#[test]
fn call_declaring_more_arguments_than_stacked_is_a_fault() {
    let mut main = InstructionWriter::new();
    main.emit(Opcode::Call).write_u32(0).write_u8(2).write_u8(0);

    let mut program = Program::new();
    program.procedures.push(main.finish());

    let mut interpreter = Interpreter::new(program);
    interpreter.init(0).unwrap();
    assert!(matches!(
        interpreter.run(10),
        Err(Fault::ValueStackUnderflow)
    ));
}

#[test]
fn plain_return_discards_callee_arguments_and_temporaries() {
    // callee reserves locals and leaves temporaries behind on purpose
    let mut callee = InstructionWriter::new();
    callee.emit(Opcode::InitLocals).write_u16(2).write_u16(0);
    push_int(&mut callee, 7);
    push_int(&mut callee, 8);
    callee.emit(Opcode::Return);

    let mut main = InstructionWriter::new();
    push_int(&mut main, 111);
    push_int(&mut main, 1);
    push_int(&mut main, 2);
    main.emit(Opcode::Call)
        .write_u32(1)
        .write_u8(2)
        .write_u8(0);
    // with args and temporaries unwound, 111 is back on top
    print_top_value(&mut main);
    main.emit(Opcode::Exit);

    let mut program = Program::new();
    program.procedures.push(main.finish());
    program.procedures.push(callee.finish());

    let (text, error) = run_program(program);
    assert_eq!(text, "111");
    assert_eq!(error, None);
}

#[test]
fn nested_assignment_updates_an_element() {
    let mut main = InstructionWriter::new();
    push_int(&mut main, 1);
    push_int(&mut main, 2);
    main.emit(Opcode::ValueListNew).write_u16(2);
    push_int(&mut main, 9); // source
    push_int(&mut main, 1); // element index
    main.emit(Opcode::DottedExpressionSetValue)
        .write_u8(1)
        .write_u8(1)
        .write_u8(0)
        .write_u8(0x03);
    push_int(&mut main, 1);
    syscall(&mut main, Opcode::SystemCallV, "ValueListGet", 1, 1);
    print_top_value(&mut main);
    main.emit(Opcode::Exit);

    let mut program = Program::new();
    program.procedures.push(main.finish());

    let (text, error) = run_program(program);
    assert_eq!(text, "9");
    assert_eq!(error, None);
}

#[test]
fn nested_assignment_out_of_range_raises_and_advances() {
    let mut main = InstructionWriter::new();
    push_int(&mut main, 1);
    push_int(&mut main, 2);
    main.emit(Opcode::ValueListNew).write_u16(2);
    push_int(&mut main, 9); // source
    push_int(&mut main, 5); // out of range
    main.emit(Opcode::DottedExpressionSetValue)
        .write_u8(1)
        .write_u8(1)
        .write_u8(0)
        .write_u8(0x03);
    // reaching this branch at all proves the instruction pointer cleared
    // the whole suffix chain despite the early abort
    main.emit(Opcode::BranchIfError);
    let handler = main.write_u32_placeholder();
    print_literal(&mut main, "wrong");
    main.emit(Opcode::Exit);
    let target = main.position();
    main.patch_u32(handler, target as u32);
    print_literal(&mut main, "handled");
    main.emit(Opcode::Exit);

    let mut program = Program::new();
    program.procedures.push(main.finish());

    let (text, error) = run_program(program);
    assert_eq!(text, "handled");
    let error = error.unwrap();
    assert_eq!(error.code, ErrorCode::ListIndexOutOfRange.value());
}

#[test]
fn missing_map_key_try_get_then_raise() {
    let mut main = InstructionWriter::new();
    syscall(&mut main, Opcode::SystemCallO, "ValueToValueMapNew", 0, 0);
    push_int(&mut main, 7);
    main.emit(Opcode::ValueToValueMapTryGet);
    main.emit(Opcode::BranchIfTrue);
    let found = main.write_u32_placeholder();
    // missing: discard the placeholder element and raise
    main.emit(Opcode::PopValue);
    main.emit(Opcode::SetErrorMapKeyNotFound);
    main.emit(Opcode::Exit);
    let target = main.position();
    main.patch_u32(found, target as u32);
    print_literal(&mut main, "found");
    main.emit(Opcode::Exit);

    let mut program = Program::new();
    program.procedures.push(main.finish());

    let (text, error) = run_program(program);
    assert_eq!(text, "");
    let error = error.unwrap();
    assert_eq!(error.code, ErrorCode::MapKeyNotFound.value());
    assert_eq!(error.message, "key not found");
}

#[test]
fn set_error_carries_program_defined_codes() {
    let mut main = InstructionWriter::new();
    push_int(&mut main, 1234);
    push_str(&mut main, "boom");
    main.emit(Opcode::SetError);
    main.emit(Opcode::Exit);

    let mut program = Program::new();
    program.procedures.push(main.finish());

    let (_, error) = run_program(program);
    let error = error.unwrap();
    assert_eq!(error.code, Value::from(1234));
    assert_eq!(error.message, "boom");
}

#[test]
fn clear_error_recovers_the_session() {
    let mut main = InstructionWriter::new();
    push_int(&mut main, 1);
    push_int(&mut main, 0);
    syscall(&mut main, Opcode::SystemCallV, "NumberDivide", 2, 0);
    main.emit(Opcode::BranchIfError);
    let handler = main.write_u32_placeholder();
    print_literal(&mut main, "wrong");
    main.emit(Opcode::Exit);
    let target = main.position();
    main.patch_u32(handler, target as u32);
    main.emit(Opcode::ClearError);
    print_literal(&mut main, "caught");
    main.emit(Opcode::Exit);

    let mut program = Program::new();
    program.procedures.push(main.finish());

    let (text, error) = run_program(program);
    assert_eq!(text, "caught");
    assert_eq!(error, None);
}

#[test]
fn errors_unwind_through_return_if_error_and_bubble() {
    let mut callee = InstructionWriter::new();
    callee.emit(Opcode::PushArgumentValue).write_u8(0);
    callee.emit(Opcode::PushArgumentValue).write_u8(1);
    syscall(&mut callee, Opcode::SystemCallV, "NumberDivide", 2, 0);
    callee.emit(Opcode::ReturnIfError);
    print_literal(&mut callee, "unreached");
    callee.emit(Opcode::Return);

    let mut main = InstructionWriter::new();
    push_int(&mut main, 1);
    push_int(&mut main, 0);
    main.emit(Opcode::Call).write_u32(1).write_u8(2).write_u8(0);
    main.emit(Opcode::BranchIfError);
    let handler = main.write_u32_placeholder();
    print_literal(&mut main, "wrong");
    main.emit(Opcode::Exit);
    let target = main.position();
    main.patch_u32(handler, target as u32);
    // clear the flag, do some handler work, then re-raise: the code and
    // message registers survive untouched
    main.emit(Opcode::ClearError);
    print_literal(&mut main, "seen");
    main.emit(Opcode::BubbleError);
    main.emit(Opcode::Exit);

    let mut program = Program::new();
    program.procedures.push(main.finish());
    program.procedures.push(callee.finish());

    let (text, error) = run_program(program);
    assert_eq!(text, "seen");
    let error = error.unwrap();
    assert_eq!(error.code, ErrorCode::DivisionByZero.value());
    assert_eq!(error.message, "division by zero");
}

#[test]
fn global_slots_round_trip_values() {
    let mut main = InstructionWriter::new();
    push_int(&mut main, 5);
    main.emit(Opcode::SetGlobalValue).write_u16(0);
    main.emit(Opcode::PushGlobalValue).write_u16(0);
    print_top_value(&mut main);
    main.emit(Opcode::Exit);

    let mut program = Program::new();
    program.procedures.push(main.finish());
    program.global_values.push(Value::default());

    let (text, error) = run_program(program);
    assert_eq!(text, "5");
    assert_eq!(error, None);
}

#[test]
fn serialized_image_runs_identically() {
    let image = add_and_print_program().serialize().unwrap();
    let program = Program::deserialize(&image).unwrap();
    let (text, error) = run_program(program);
    assert_eq!(text, "3");
    assert_eq!(error, None);
}

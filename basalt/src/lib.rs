mod bytecode;
mod dotted;
mod error;
mod frame;
mod interpreter;
mod list;
mod map;
mod object;
mod program;
mod record;
mod set;
mod stack;
mod syscalls;
mod value;

pub use bytecode::{InstructionReader, InstructionWriter, Opcode, Procedure};
pub use dotted::{Abort, AssignSource, Assignment, Suffix};
pub use error::{Error, ErrorCode, Fault};
pub use frame::{CallFrame, CallStack};
pub use interpreter::{Interpreter, RuntimeError};
pub use list::{List, ListBuilder, ObjectList, ObjectListBuilder, ValueList, ValueListBuilder};
pub use map::{Map, ObjectToObjectMap, ObjectToValueMap, ValueToObjectMap, ValueToValueMap};
pub use object::{Object, ObjectType, ProcedureReference, TimeZone};
pub use program::Program;
pub use record::{Record, RecordBuilder};
pub use set::{ObjectSet, ObjectSetBuilder, Set, SetBuilder, ValueSet, ValueSetBuilder};
pub use stack::{ExecutionState, ExecutionStateInfo};
pub use syscalls::{
    system_call_id, SystemCallContext, SystemCallDef, SystemCallFn, SYSTEM_CALLS,
};
pub use value::Value;

use std::rc::Rc;

use log::debug;
use rust_decimal::Decimal;

use crate::bytecode::Procedure;
use crate::error::Fault;
use crate::object::Object;
use crate::value::Value;

/// Serialized program section tags.
const TAG_PROCEDURE: u8 = 1;
const TAG_GLOBAL_VALUE: u8 = 2;
const TAG_GLOBAL_OBJECT: u8 = 3;
const TAG_END: u8 = 255;

/// A loaded program: compiled procedures plus the initial contents of the
/// global value and object tables. `startup_procedure_index` names the
/// entry point.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub startup_procedure_index: usize,
    pub procedures: Vec<Procedure>,
    pub global_values: Vec<Value>,
    pub global_objects: Vec<Option<Rc<Object>>>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes to the pcode image format: a `u32` startup procedure index
    /// followed by tagged sections, terminated by an end tag. Only string
    /// global objects are representable in images; richer objects are built
    /// at runtime.
    pub fn serialize(&self) -> Result<Vec<u8>, Fault> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.startup_procedure_index as u32).to_le_bytes());
        for procedure in &self.procedures {
            out.push(TAG_PROCEDURE);
            out.extend_from_slice(&(procedure.instructions.len() as u32).to_le_bytes());
            out.extend_from_slice(&procedure.instructions);
        }
        for (index, value) in self.global_values.iter().enumerate() {
            out.push(TAG_GLOBAL_VALUE);
            out.extend_from_slice(&(index as u32).to_le_bytes());
            out.extend_from_slice(&value.num.serialize());
        }
        for (index, slot) in self.global_objects.iter().enumerate() {
            let Some(object) = slot else { continue };
            let Object::String(text) = object.as_ref() else {
                return Err(Fault::MalformedProgram(
                    "only string globals can be serialized",
                ));
            };
            out.push(TAG_GLOBAL_OBJECT);
            out.extend_from_slice(&(index as u32).to_le_bytes());
            out.extend_from_slice(&(text.len() as u32).to_le_bytes());
            out.extend_from_slice(text.as_bytes());
        }
        out.push(TAG_END);
        Ok(out)
    }

    pub fn deserialize(image: &[u8]) -> Result<Self, Fault> {
        let mut program = Self::new();
        let mut cursor = Cursor { bytes: image, offset: 0 };
        program.startup_procedure_index = cursor.read_u32()? as usize;
        loop {
            match cursor.read_u8()? {
                TAG_PROCEDURE => {
                    let len = cursor.read_u32()? as usize;
                    let instructions = cursor.read_bytes(len)?;
                    program.procedures.push(Procedure::new(instructions.to_vec()));
                }
                TAG_GLOBAL_VALUE => {
                    let index = cursor.read_u32()? as usize;
                    let raw = cursor.read_bytes(16)?;
                    let mut fixed = [0_u8; 16];
                    fixed.copy_from_slice(raw);
                    if program.global_values.len() <= index {
                        program.global_values.resize(index + 1, Value::default());
                    }
                    program.global_values[index] = Value::from(Decimal::deserialize(fixed));
                }
                TAG_GLOBAL_OBJECT => {
                    let index = cursor.read_u32()? as usize;
                    let len = cursor.read_u32()? as usize;
                    let raw = cursor.read_bytes(len)?;
                    let text = std::str::from_utf8(raw)
                        .map_err(|_| Fault::MalformedProgram("global string is not UTF-8"))?;
                    if program.global_objects.len() <= index {
                        program.global_objects.resize(index + 1, None);
                    }
                    program.global_objects[index] = Some(Rc::new(Object::string(text)));
                }
                TAG_END => break,
                _ => return Err(Fault::MalformedProgram("unknown section tag")),
            }
        }
        debug!(
            "loaded program: {} procedures, {} global values, {} global objects",
            program.procedures.len(),
            program.global_values.len(),
            program.global_objects.len()
        );
        Ok(program)
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl Cursor<'_> {
    fn read_u8(&mut self) -> Result<u8, Fault> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, Fault> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_bytes(&mut self, count: usize) -> Result<&[u8], Fault> {
        let end = self
            .offset
            .checked_add(count)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(Fault::MalformedProgram("unexpected end of image"))?;
        let bytes = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }
}

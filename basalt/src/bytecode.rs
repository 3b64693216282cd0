use std::rc::Rc;

use rust_decimal::Decimal;

use crate::error::Fault;

/// One opcode byte per instruction, followed by a fixed, opcode-specific
/// sequence of little-endian immediates. Jump operands are absolute byte
/// offsets within the current procedure's instruction stream.
macro_rules! opcodes {
    ($($name:ident = $byte:literal,)*) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq)]
        #[repr(u8)]
        pub enum Opcode {
            $($name = $byte,)*
        }

        impl Opcode {
            pub fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some(Self::$name),)*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    Exit = 0,

    PushImmediateInt64 = 1,
    PushImmediateDecimal = 2,
    PushImmediateUtf8 = 3,
    PopValue = 4,
    PopObject = 5,
    DuplicateValue = 6,
    DuplicateObject = 7,
    SwapValues = 8,
    SwapObjects = 9,

    InitLocals = 10,
    PushArgumentValue = 11,
    PushArgumentObject = 12,
    SetArgumentValue = 13,
    SetArgumentObject = 14,
    PushGlobalValue = 15,
    PushGlobalObject = 16,
    SetGlobalValue = 17,
    SetGlobalObject = 18,
    PushLocalValue = 19,
    PushLocalObject = 20,
    SetLocalValue = 21,
    SetLocalObject = 22,
    ClearLocalObject = 23,

    Jump = 24,
    BranchIfTrue = 25,
    BranchIfFalse = 26,

    Call = 27,
    CallV = 28,
    CallO = 29,
    SystemCall = 30,
    SystemCallV = 31,
    SystemCallO = 32,
    SystemCallVO = 33,
    Return = 34,
    ReturnValue = 35,
    ReturnObject = 36,

    SetError = 37,
    ClearError = 38,
    BubbleError = 39,
    ReturnIfError = 40,
    BranchIfError = 41,
    SetErrorMapKeyNotFound = 42,

    RecordNew = 43,
    RecordGetValue = 44,
    RecordGetObject = 45,
    RecordSetValue = 46,
    RecordSetObject = 47,

    ValueListNew = 48,
    ObjectListNew = 49,

    ValueToValueMapTryGet = 50,
    ValueToObjectMapTryGet = 51,
    ObjectToValueMapTryGet = 52,
    ObjectToObjectMapTryGet = 53,

    DottedExpressionSetValue = 54,
    DottedExpressionSetObject = 55,
}

/// Dotted-expression suffix descriptor tags, one byte each in the encoded
/// chain. Field suffixes carry a `u16` field index immediately after.
pub const SUFFIX_VALUE_FIELD: u8 = 0x01;
pub const SUFFIX_OBJECT_FIELD: u8 = 0x02;
pub const SUFFIX_VALUE_KEY_VALUE: u8 = 0x03;
pub const SUFFIX_VALUE_KEY_OBJECT: u8 = 0x04;
pub const SUFFIX_OBJECT_KEY_VALUE: u8 = 0x05;
pub const SUFFIX_OBJECT_KEY_OBJECT: u8 = 0x06;

/// One compiled procedure: a flat instruction stream with jump targets
/// already resolved to absolute offsets. Shared behind `Rc` so the dispatch
/// loop can hold the current stream while the rest of the program stays
/// reachable.
#[derive(Debug, Clone)]
pub struct Procedure {
    pub instructions: Rc<[u8]>,
}

impl Procedure {
    pub fn new(instructions: Vec<u8>) -> Self {
        Self { instructions: instructions.into() }
    }
}

/// Cursor over an instruction stream. Owns a cheap clone of the stream so
/// the interpreter can swap procedures without borrow gymnastics.
#[derive(Debug, Clone)]
pub struct InstructionReader {
    bytes: Rc<[u8]>,
    pub offset: usize,
}

impl InstructionReader {
    pub fn new(bytes: Rc<[u8]>, offset: usize) -> Self {
        Self { bytes, offset }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_at_end(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    pub fn jump_to(&mut self, offset: usize) {
        self.offset = offset;
    }

    fn take(&mut self, count: usize) -> Result<&[u8], Fault> {
        let end = self
            .offset
            .checked_add(count)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(Fault::TruncatedInstructions(self.offset))?;
        let bytes = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, Fault> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, Fault> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, Fault> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i64(&mut self) -> Result<i64, Fault> {
        let bytes = self.take(8)?;
        let mut raw = [0_u8; 8];
        raw.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(raw))
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, Fault> {
        Ok(self.take(count)?.to_vec())
    }

    /// Reads a 16-byte serialized decimal immediate.
    pub fn read_decimal(&mut self) -> Result<Decimal, Fault> {
        let bytes = self.take(16)?;
        let mut raw = [0_u8; 16];
        raw.copy_from_slice(bytes);
        Ok(Decimal::deserialize(raw))
    }
}

/// Builds instruction streams the way the compiler back end does: emit
/// opcodes and immediates, patch forward jump targets once they resolve.
#[derive(Debug, Clone, Default)]
pub struct InstructionWriter {
    bytes: Vec<u8>,
}

impl InstructionWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.bytes.len()
    }

    pub fn emit(&mut self, opcode: Opcode) -> &mut Self {
        self.bytes.push(opcode as u8);
        self
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.bytes.push(value);
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_decimal(&mut self, value: Decimal) -> &mut Self {
        self.bytes.extend_from_slice(&value.serialize());
        self
    }

    /// Length-prefixed UTF-8 literal.
    pub fn write_utf8(&mut self, text: &str) -> &mut Self {
        self.write_u32(text.len() as u32);
        self.bytes.extend_from_slice(text.as_bytes());
        self
    }

    /// Reserves a u32 jump operand, returning its position for `patch_u32`.
    pub fn write_u32_placeholder(&mut self) -> usize {
        let at = self.bytes.len();
        self.write_u32(0);
        at
    }

    pub fn patch_u32(&mut self, at: usize, value: u32) {
        self.bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn finish(self) -> Procedure {
        Procedure::new(self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn every_opcode_byte_round_trips() {
        let mut seen = 0;
        for byte in 0..=u8::MAX {
            if let Some(opcode) = Opcode::from_byte(byte) {
                assert_eq!(opcode as u8, byte);
                seen += 1;
            }
        }
        assert_eq!(seen, 56);
    }

    #[test]
    fn reader_round_trips_writer_output() {
        let mut writer = InstructionWriter::new();
        writer.write_u8(7);
        writer.write_u16(0x1234);
        writer.write_u32(0xdead_beef);
        writer.write_i64(-5);
        writer.write_decimal(Decimal::from_str("2.75").unwrap());
        writer.write_utf8("hi");
        let procedure = writer.finish();

        let mut reader = InstructionReader::new(procedure.instructions, 0);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0xdead_beef);
        assert_eq!(reader.read_i64().unwrap(), -5);
        assert_eq!(reader.read_decimal().unwrap(), Decimal::from_str("2.75").unwrap());
        let len = reader.read_u32().unwrap() as usize;
        assert_eq!(reader.read_bytes(len).unwrap(), b"hi");
        assert!(reader.is_at_end());
    }

    #[test]
    fn truncated_reads_fault_instead_of_panicking() {
        let procedure = Procedure::new(vec![1, 2]);
        let mut reader = InstructionReader::new(procedure.instructions, 0);
        assert!(matches!(
            reader.read_u32(),
            Err(Fault::TruncatedInstructions(0))
        ));
    }

    #[test]
    fn patched_jump_targets_land_where_written() {
        let mut writer = InstructionWriter::new();
        writer.emit(Opcode::Jump);
        let patch = writer.write_u32_placeholder();
        writer.emit(Opcode::Exit);
        let target = writer.position();
        writer.patch_u32(patch, target as u32);
        let procedure = writer.finish();

        let mut reader = InstructionReader::new(procedure.instructions, 1);
        assert_eq!(reader.read_u32().unwrap() as usize, target);
    }
}

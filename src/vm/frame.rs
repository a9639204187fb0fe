use crate::bytecode::OpCode;
use crate::value::Value;

use super::Fault;

/// Local slots per call frame.
pub const LOCAL_SLOTS: usize = 256;
/// Global slots per VM.
pub const GLOBAL_SLOTS: usize = 256;

/// Fixed-capacity, index-addressed value storage. Used for frame locals
/// and VM globals alike; every slot starts as `Number(0)`.
#[derive(Debug, Clone)]
pub struct Slots {
    values: Vec<Value>,
}

impl Slots {
    pub fn new(count: usize) -> Self {
        Slots { values: vec![Value::default(); count] }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn load(&self, op: OpCode, index: i64) -> Result<Value, Fault> {
        let slot = self.resolve(op, index)?;
        Ok(self.values[slot].clone())
    }

    pub fn store(&mut self, op: OpCode, index: i64, value: Value) -> Result<(), Fault> {
        let slot = self.resolve(op, index)?;
        self.values[slot] = value;
        Ok(())
    }

    fn resolve(&self, op: OpCode, index: i64) -> Result<usize, Fault> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.values.len())
            .ok_or(Fault::SlotOutOfRange { op, index, limit: self.values.len() })
    }
}

/// One activation record: where we are, in which function, with which locals.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub pc: usize,
    pub function: usize,
    pub locals: Slots,
}

impl CallFrame {
    pub fn new(function: usize) -> Self {
        CallFrame { pc: 0, function, locals: Slots::new(LOCAL_SLOTS) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_frame_is_zeroed() {
        let frame = CallFrame::new(3);
        assert_eq!(frame.pc, 0);
        assert_eq!(frame.function, 3);
        assert_eq!(frame.locals.len(), LOCAL_SLOTS);
        assert_eq!(frame.locals.get(255), Some(&Value::Number(0.0)));
    }

    #[test]
    fn store_then_load() {
        let mut slots = Slots::new(4);
        slots.store(OpCode::Sl, 2, Value::str("x")).unwrap();
        assert_eq!(slots.load(OpCode::Ll, 2), Ok(Value::str("x")));
    }

    #[test]
    fn out_of_range_is_a_fault() {
        let mut slots = Slots::new(GLOBAL_SLOTS);
        assert_eq!(
            slots.load(OpCode::Lg, 256),
            Err(Fault::SlotOutOfRange { op: OpCode::Lg, index: 256, limit: 256 })
        );
        assert_eq!(
            slots.store(OpCode::Sg, -1, Value::Number(1.0)),
            Err(Fault::SlotOutOfRange { op: OpCode::Sg, index: -1, limit: 256 })
        );
    }
}

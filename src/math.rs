//! Arithmetic Engine
//!
//! Overflow-checked arithmetic over 64-bit signed integers. Division and
//! modulo by zero are invalid arguments; any result outside the `i64`
//! range (including `MIN / -1`) is an overflow.

use crate::error::RequestError;

/// The five arithmetic operations of the variable family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Apply an arithmetic operation to two resolved operands.
pub fn apply(op: ArithOp, a: i64, b: i64) -> Result<i64, RequestError> {
    match op {
        ArithOp::Add => a.checked_add(b).ok_or(RequestError::Overflow),
        ArithOp::Sub => a.checked_sub(b).ok_or(RequestError::Overflow),
        ArithOp::Mul => a.checked_mul(b).ok_or(RequestError::Overflow),
        ArithOp::Div => {
            if b == 0 {
                return Err(RequestError::InvalidArgument);
            }
            a.checked_div(b).ok_or(RequestError::Overflow)
        }
        ArithOp::Rem => {
            if b == 0 {
                return Err(RequestError::InvalidArgument);
            }
            a.checked_rem(b).ok_or(RequestError::Overflow)
        }
    }
}

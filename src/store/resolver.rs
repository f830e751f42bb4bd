//! Alias-chain resolution.

use crate::error::RequestError;

use super::table::{Value, VarTable};

/// Walk an alias chain starting at `start` until a Number entry is
/// reached, following at most `max_hops` alias links.
///
/// Termination rule: resolution succeeds only at a Number entry. A name
/// missing anywhere in the chain is NotFound; exhausting the hop budget
/// (which any cycle does) is CycleLimitExceeded.
pub fn resolve(table: &VarTable, start: &str, max_hops: u64) -> Result<i64, RequestError> {
    let mut current = start;
    let mut hops: u64 = 0;

    loop {
        match table.get(current) {
            None => return Err(RequestError::NotFound),
            Some(Value::Number(v)) => return Ok(*v),
            Some(Value::Alias(target)) => {
                if hops == max_hops {
                    return Err(RequestError::CycleLimitExceeded);
                }
                hops += 1;
                current = target;
            }
        }
    }
}

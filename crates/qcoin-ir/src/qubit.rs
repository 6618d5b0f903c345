//! Qubit identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a qubit on the target machine.
///
/// Programs address qubits directly by index, the way Quil does, so there is
/// no separate allocation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl QubitId {
    /// The qubit index as a `usize`, for statevector addressing.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

impl From<i32> for QubitId {
    fn from(id: i32) -> Self {
        QubitId(u32::try_from(id).expect("QubitId must be non-negative"))
    }
}

impl From<usize> for QubitId {
    fn from(id: usize) -> Self {
        QubitId(u32::try_from(id).expect("QubitId overflow: exceeds u32::MAX"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qubit_display() {
        assert_eq!(format!("{}", QubitId(0)), "0");
        assert_eq!(format!("{}", QubitId(12)), "12");
    }

    #[test]
    fn test_qubit_ordering() {
        let mut qubits = vec![QubitId(2), QubitId(0), QubitId(1)];
        qubits.sort();
        assert_eq!(qubits, vec![QubitId(0), QubitId(1), QubitId(2)]);
        assert_eq!(QubitId(3).index(), 3);
    }
}

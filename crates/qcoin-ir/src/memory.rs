//! Classical memory declarations and references.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IrError, IrResult};

/// Element type of a classical memory region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryType {
    /// Single bit, holds 0 or 1.
    Bit,
    /// Signed 64-bit integer.
    Integer,
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryType::Bit => write!(f, "BIT"),
            MemoryType::Integer => write!(f, "INTEGER"),
        }
    }
}

/// A named, fixed-size region of classical memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryRegion {
    /// Region name, e.g. `ro`.
    pub name: String,
    /// Element type.
    pub ty: MemoryType,
    /// Number of elements.
    pub size: usize,
}

impl MemoryRegion {
    /// Create a region after validating its name and size.
    pub fn new(name: impl Into<String>, ty: MemoryType, size: usize) -> IrResult<Self> {
        let name = name.into();
        validate_identifier(&name)?;
        if size == 0 {
            return Err(IrError::EmptyRegion(name));
        }
        Ok(Self { name, ty, size })
    }

    /// Reference to element `index` of this region.
    ///
    /// Bounds are checked when the program is compiled, not here.
    pub fn at(&self, index: usize) -> MemoryReference {
        MemoryReference::new(self.name.clone(), index)
    }

    /// References to every element, in order.
    pub fn references(&self) -> impl Iterator<Item = MemoryReference> + '_ {
        (0..self.size).map(|i| self.at(i))
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DECLARE {} {}[{}]", self.name, self.ty, self.size)
    }
}

/// Reference to one element of a memory region, e.g. `ro[1]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryReference {
    /// Region name.
    pub name: String,
    /// Element index.
    pub index: usize,
}

impl MemoryReference {
    /// Create a new memory reference.
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

impl fmt::Display for MemoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.index)
    }
}

/// Check that `name` is usable as a region or label name.
pub(crate) fn validate_identifier(name: &str) -> IrResult<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(IrError::InvalidIdentifier(name.to_string()))
    }
}

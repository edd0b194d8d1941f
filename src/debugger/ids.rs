use serde::Serialize;
use std::fmt;

/// Opaque module version identifier (the module's MVID).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ModuleId(pub u128);

impl ModuleId {
    pub fn new(value: u128) -> Self {
        ModuleId(value)
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleId({self})")
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v >> 48) as u16,
            v & 0xFFFF_FFFF_FFFF
        )
    }
}

/// A method metadata token.
///
/// The high byte is the metadata table (0x06 for MethodDef), the low
/// 24 bits are the row within that table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MethodToken(pub u32);

impl MethodToken {
    pub const METHOD_DEF_TABLE: u8 = 0x06;

    pub fn new(value: u32) -> Self {
        MethodToken(value)
    }

    /// Token of the given row in the MethodDef table.
    pub fn from_method_row(row: u32) -> Self {
        MethodToken((u32::from(Self::METHOD_DEF_TABLE) << 24) | (row & 0x00FF_FFFF))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }
}

impl From<u32> for MethodToken {
    fn from(value: u32) -> Self {
        MethodToken(value)
    }
}

impl fmt::Debug for MethodToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodToken(0x{:08x})", self.0)
    }
}

impl fmt::Display for MethodToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// A method at a specific version within a debugging session.
///
/// Versions start at 1 and increase every time the method is recompiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ManagedMethodId {
    pub module: ModuleId,
    pub token: MethodToken,
    pub version: u32,
}

impl ManagedMethodId {
    pub fn new(module: ModuleId, token: MethodToken, version: u32) -> Self {
        debug_assert!(version >= 1, "method versions start at 1");
        Self {
            module,
            token,
            version,
        }
    }

    /// The id the method gets once the current delta is applied.
    pub fn next_version(&self) -> Self {
        Self {
            version: self.version + 1,
            ..*self
        }
    }
}

impl fmt::Display for ManagedMethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.token, self.version)
    }
}

/// One physical instruction pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ManagedInstructionId {
    pub method: ManagedMethodId,
    pub il_offset: u32,
}

impl ManagedInstructionId {
    pub fn new(method: ManagedMethodId, il_offset: u32) -> Self {
        Self { method, il_offset }
    }
}

impl fmt::Display for ManagedInstructionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} IL_{:04x}", self.method, self.il_offset)
    }
}

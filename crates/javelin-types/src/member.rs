use std::sync::Arc;

/// JVM access flags relevant to the type engine.
pub mod access_flags {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
    pub const ACC_VARARGS: u16 = 0x0080;
    pub const ACC_NATIVE: u16 = 0x0100;
    pub const ACC_INTERFACE: u16 = 0x0200;
    pub const ACC_ABSTRACT: u16 = 0x0400;
}

pub type FieldRef = Arc<Field>;
pub type MethodRef = Arc<Method>;

/// A declared field: symbolic name plus field type descriptor.
#[derive(Debug)]
pub struct Field {
    name: String,
    descriptor: String,
    access_flags: u16,
    slot: usize,
}

impl Field {
    pub(crate) fn new(name: String, descriptor: String, access_flags: u16, slot: usize) -> Self {
        Self {
            name,
            descriptor,
            access_flags,
            slot,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn access_flags(&self) -> u16 {
        self.access_flags
    }

    /// Slot in the declaring type's instance or static field table.
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & access_flags::ACC_STATIC != 0
    }
}

/// A declared method: symbolic name plus raw method signature descriptor.
#[derive(Debug)]
pub struct Method {
    name: String,
    signature: String,
    access_flags: u16,
}

impl Method {
    pub(crate) fn new(name: String, signature: String, access_flags: u16) -> Self {
        Self {
            name,
            signature,
            access_flags,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw `(params)ret` signature descriptor.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn access_flags(&self) -> u16 {
        self.access_flags
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & access_flags::ACC_STATIC != 0
    }

    pub fn is_native(&self) -> bool {
        self.access_flags & access_flags::ACC_NATIVE != 0
    }

    pub fn is_varargs(&self) -> bool {
        self.access_flags & access_flags::ACC_VARARGS != 0
    }
}

/// Field description handed in by the loading subsystem.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub descriptor: String,
    pub access_flags: u16,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>, access_flags: u16) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access_flags,
        }
    }
}

/// Method description handed in by the loading subsystem.
#[derive(Debug, Clone)]
pub struct MethodSpec {
    pub name: String,
    pub signature: String,
    pub access_flags: u16,
}

impl MethodSpec {
    pub fn new(name: impl Into<String>, signature: impl Into<String>, access_flags: u16) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
            access_flags,
        }
    }
}

/// Runtime value kind of a type: one of the primitive kinds or a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Void,
    Object,
}

impl ValueKind {
    pub fn is_primitive(self) -> bool {
        !matches!(self, ValueKind::Object)
    }

    /// Kinds that occupy an `int` slot on the operand stack.
    pub fn is_stack_int(self) -> bool {
        matches!(
            self,
            ValueKind::Boolean | ValueKind::Byte | ValueKind::Short | ValueKind::Char | ValueKind::Int
        )
    }

    pub fn descriptor_char(self) -> char {
        match self {
            ValueKind::Boolean => 'Z',
            ValueKind::Byte => 'B',
            ValueKind::Short => 'S',
            ValueKind::Char => 'C',
            ValueKind::Int => 'I',
            ValueKind::Long => 'J',
            ValueKind::Float => 'F',
            ValueKind::Double => 'D',
            ValueKind::Void => 'V',
            ValueKind::Object => 'L',
        }
    }

    pub fn from_descriptor_char(c: char) -> Option<ValueKind> {
        Some(match c {
            'Z' => ValueKind::Boolean,
            'B' => ValueKind::Byte,
            'S' => ValueKind::Short,
            'C' => ValueKind::Char,
            'I' => ValueKind::Int,
            'J' => ValueKind::Long,
            'F' => ValueKind::Float,
            'D' => ValueKind::Double,
            'V' => ValueKind::Void,
            'L' | '[' => ValueKind::Object,
            _ => return None,
        })
    }

    /// Kind of a full descriptor string, classified by its first character.
    pub fn of_descriptor(descriptor: &str) -> Option<ValueKind> {
        descriptor.chars().next().and_then(Self::from_descriptor_char)
    }

    /// Source-level name of the primitive kind (`int`, `void`, ...).
    pub fn primitive_name(self) -> Option<&'static str> {
        Some(match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Byte => "byte",
            ValueKind::Short => "short",
            ValueKind::Char => "char",
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::Void => "void",
            ValueKind::Object => return None,
        })
    }

    pub const PRIMITIVES: [ValueKind; 9] = [
        ValueKind::Boolean,
        ValueKind::Byte,
        ValueKind::Short,
        ValueKind::Char,
        ValueKind::Int,
        ValueKind::Long,
        ValueKind::Float,
        ValueKind::Double,
        ValueKind::Void,
    ];
}

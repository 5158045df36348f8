use crate::error::{DescriptorError, Result};
use crate::kind::ValueKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Primitive(ValueKind),
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn value_kind(&self) -> ValueKind {
        match self {
            FieldType::Primitive(kind) => *kind,
            FieldType::Object(_) | FieldType::Array(_) => ValueKind::Object,
        }
    }

    /// Renders the type back into descriptor form.
    pub fn descriptor(&self) -> String {
        let mut out = String::new();
        self.write_descriptor(&mut out);
        out
    }

    fn write_descriptor(&self, out: &mut String) {
        match self {
            FieldType::Primitive(kind) => out.push(kind.descriptor_char()),
            FieldType::Object(name) => {
                out.push('L');
                out.push_str(name);
                out.push(';');
            }
            FieldType::Array(component) => {
                out.push('[');
                component.write_descriptor(out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Type(FieldType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    pub return_type: ReturnType,
}

impl MethodDescriptor {
    pub fn descriptor(&self) -> String {
        let mut out = String::from("(");
        for param in &self.params {
            param.write_descriptor(&mut out);
        }
        out.push(')');
        match &self.return_type {
            ReturnType::Void => out.push('V'),
            ReturnType::Type(ty) => ty.write_descriptor(&mut out),
        }
        out
    }
}

pub fn parse_field_descriptor(desc: &str) -> Result<FieldType> {
    let (ty, rest) = parse_field_type(desc)?;
    if !rest.is_empty() {
        return Err(DescriptorError::InvalidFieldDescriptor(desc.to_string()));
    }
    Ok(ty)
}

pub fn parse_method_descriptor(desc: &str) -> Result<MethodDescriptor> {
    let invalid = || DescriptorError::InvalidMethodDescriptor(desc.to_string());

    let mut rest = desc.strip_prefix('(').ok_or_else(invalid)?;
    let mut params = Vec::new();
    loop {
        if let Some(after) = rest.strip_prefix(')') {
            rest = after;
            break;
        }
        if rest.is_empty() {
            return Err(invalid());
        }
        let (param, after) =
            parse_field_type(rest).map_err(|_| invalid())?;
        params.push(param);
        rest = after;
    }

    let return_type = if rest == "V" {
        ReturnType::Void
    } else {
        let (ty, after) = parse_field_type(rest).map_err(|_| invalid())?;
        if !after.is_empty() {
            return Err(invalid());
        }
        ReturnType::Type(ty)
    };

    Ok(MethodDescriptor { params, return_type })
}

fn parse_field_type(input: &str) -> Result<(FieldType, &str)> {
    let mut chars = input.chars();
    let first = chars
        .next()
        .ok_or_else(|| DescriptorError::InvalidFieldDescriptor(input.to_string()))?;
    match first {
        'L' => {
            let end = input
                .find(';')
                .ok_or_else(|| DescriptorError::InvalidFieldDescriptor(input.to_string()))?;
            let name = &input[1..end];
            if name.is_empty() {
                return Err(DescriptorError::InvalidFieldDescriptor(input.to_string()));
            }
            Ok((FieldType::Object(name.to_string()), &input[end + 1..]))
        }
        '[' => {
            let (component, rest) = parse_field_type(&input[1..])?;
            Ok((FieldType::Array(Box::new(component)), rest))
        }
        c => match ValueKind::from_descriptor_char(c) {
            Some(ValueKind::Void) | None => {
                Err(DescriptorError::InvalidFieldDescriptor(input.to_string()))
            }
            Some(kind) => Ok((FieldType::Primitive(kind), &input[1..])),
        },
    }
}

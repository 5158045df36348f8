use crate::error::Result;
use crate::field::{parse_method_descriptor, FieldType, ReturnType};
use crate::kind::ValueKind;

/// Canonicalizes a method signature to its "basic" erased form.
///
/// Every reference or array type becomes `Ljava/lang/Object;` and every
/// sub-int primitive becomes `I`; `long`, `float`, `double`, and the return
/// kind otherwise keep their shape. With `keep_last_param == false` the
/// trailing parameter is dropped (the appendix argument of `linkTo*` call
/// sites). This is the default canonicalization used before resolving
/// `linkTo*` intrinsics; embedders may substitute their own transform.
pub fn erase_to_basic(signature: &str, keep_last_param: bool) -> Result<String> {
    let parsed = parse_method_descriptor(signature)?;

    let mut params: Vec<&FieldType> = parsed.params.iter().collect();
    if !keep_last_param {
        params.pop();
    }

    let mut out = String::from("(");
    for param in params {
        out.push_str(basic_form(param));
    }
    out.push(')');
    match &parsed.return_type {
        ReturnType::Void => out.push('V'),
        ReturnType::Type(ty) => out.push_str(basic_form(ty)),
    }
    Ok(out)
}

fn basic_form(ty: &FieldType) -> &'static str {
    match ty.value_kind() {
        ValueKind::Object => "Ljava/lang/Object;",
        kind if kind.is_stack_int() => "I",
        ValueKind::Long => "J",
        ValueKind::Float => "F",
        ValueKind::Double => "D",
        // Void cannot appear in parameter position; parse rejects it.
        _ => "V",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn erases_references_and_sub_int_kinds() {
        assert_eq!(
            erase_to_basic("(Ljava/lang/String;ZC[I)Lfoo/Bar;", true).unwrap(),
            "(Ljava/lang/Object;IILjava/lang/Object;)Ljava/lang/Object;"
        );
    }

    #[test]
    fn keeps_wide_primitives() {
        assert_eq!(erase_to_basic("(JDF)V", true).unwrap(), "(JDF)V");
    }

    #[test]
    fn drops_trailing_appendix_param() {
        assert_eq!(
            erase_to_basic("(ILjava/lang/invoke/MemberName;)V", false).unwrap(),
            "(I)V"
        );
    }
}

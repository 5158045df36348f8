/// Runtime package of a class descriptor.
///
/// `Lfoo/bar/Baz;` maps to `foo/bar`; classes in the default package and
/// primitive descriptors map to the empty string. Array descriptors have no
/// runtime package of their own; callers are expected to ask about the
/// elemental type instead.
pub fn runtime_package(descriptor: &str) -> &str {
    debug_assert!(!descriptor.starts_with('['), "arrays have no runtime package");
    let Some(inner) = descriptor.strip_prefix('L').and_then(|d| d.strip_suffix(';')) else {
        return "";
    };
    match inner.rfind('/') {
        Some(idx) => &inner[..idx],
        None => "",
    }
}

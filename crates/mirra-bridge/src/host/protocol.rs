//! Host dynamic-dispatch protocol names
//!
//! Fixed translation table from native operator spellings to the host's
//! protocol names, plus the private-name mangling convention.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// Constructor protocol name
pub const PROTO_NEW: &str = "new";
/// Call-operator protocol name
pub const PROTO_CALL: &str = "call";
/// Index-read protocol name
pub const PROTO_GETITEM: &str = "getitem";
/// Index-write protocol name. A non-const reference returned from the call
/// or index operator is the native idiom for assignment-through-index, so
/// those operators register here as well.
pub const PROTO_SETITEM: &str = "setitem";

static OPERATOR_TABLE: Lazy<FxHashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut table = FxHashMap::default();
    table.insert("operator()", PROTO_CALL);
    table.insert("operator[]", PROTO_GETITEM);
    table.insert("operator+", "add");
    table.insert("operator-", "sub");
    table.insert("operator*", "mul");
    table.insert("operator/", "div");
    table.insert("operator%", "rem");
    table.insert("operator+=", "iadd");
    table.insert("operator-=", "isub");
    table.insert("operator*=", "imul");
    table.insert("operator/=", "idiv");
    table.insert("operator==", "eq");
    table.insert("operator!=", "ne");
    table.insert("operator<", "lt");
    table.insert("operator<=", "le");
    table.insert("operator>", "gt");
    table.insert("operator>=", "ge");
    table.insert("operator<<", "shl");
    table.insert("operator>>", "shr");
    table.insert("operator&", "bitand");
    table.insert("operator|", "bitor");
    table.insert("operator^", "bitxor");
    table.insert("operator~", "invert");
    table.insert("operator!", "not");
    table
});

/// Translate a native operator spelling to its host protocol name.
///
/// Non-operator names pass through unchanged; unmapped operator spellings
/// are kept under their native form so they stay reachable dynamically.
pub fn protocol_name(native: &str) -> &str {
    OPERATOR_TABLE.get(native).copied().unwrap_or(native)
}

/// True if the native spelling marks the call or index operator
pub fn is_indexing_or_call(native: &str) -> bool {
    native == "operator()" || native == "operator[]"
}

/// True if the native spelling is a destructor
pub fn is_destructor(name: &str) -> bool {
    name.starts_with('~')
}

/// Mangle a non-public member name with the owning scope's name
pub fn mangle_private(scope_name: &str, name: &str) -> String {
    format!("_{}__{}", scope_name, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_translation() {
        assert_eq!(protocol_name("operator()"), PROTO_CALL);
        assert_eq!(protocol_name("operator[]"), PROTO_GETITEM);
        assert_eq!(protocol_name("operator=="), "eq");
        assert_eq!(protocol_name("plainName"), "plainName");
        // unmapped operators keep their native spelling
        assert_eq!(protocol_name("operator->"), "operator->");
    }

    #[test]
    fn test_destructor_detection() {
        assert!(is_destructor("~Widget"));
        assert!(!is_destructor("widget"));
        assert!(!is_destructor("operator~"));
    }

    #[test]
    fn test_private_mangling() {
        assert_eq!(mangle_private("Widget", "impl"), "_Widget__impl");
    }
}

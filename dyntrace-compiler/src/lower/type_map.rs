//! Scalar type inference from a DWARF kind and type name, per language.

use crate::{LowerError, Result};
use dyntrace_dwarf::VarKind;
use dyntrace_ir::{Language, ScalarType};

fn go_base_type(name: &str) -> Option<ScalarType> {
    let scalar = match name {
        "bool" => ScalarType::Bool,
        "int" => ScalarType::Int,
        "int8" => ScalarType::Int8,
        "int16" => ScalarType::Int16,
        "int32" => ScalarType::Int32,
        "int64" => ScalarType::Int64,
        "uint" => ScalarType::UInt,
        "uint8" => ScalarType::UInt8,
        "uint16" => ScalarType::UInt16,
        "uint32" => ScalarType::UInt32,
        "uint64" => ScalarType::UInt64,
        "float32" => ScalarType::Float,
        "float64" => ScalarType::Double,
        _ => return None,
    };
    Some(scalar)
}

// Keyed by the canonical DWARF spelling.
// TODO: keep building this table out (long double, wchar_t).
fn c_base_type(name: &str) -> Option<ScalarType> {
    let scalar = match name {
        "bool" => ScalarType::Bool,

        "short" => ScalarType::Short,
        "unsigned short" => ScalarType::UShort,
        "int" => ScalarType::Int,
        "unsigned int" => ScalarType::UInt,
        "long int" => ScalarType::Long,
        "long unsigned int" => ScalarType::ULong,
        "long long int" => ScalarType::LongLong,
        "long long unsigned int" => ScalarType::ULongLong,

        "char" => ScalarType::Char,
        "signed char" => ScalarType::Char,
        "unsigned char" => ScalarType::UChar,

        "float" => ScalarType::Float,
        "double" => ScalarType::Double,
        _ => return None,
    };
    Some(scalar)
}

fn base_type(language: Language, name: &str) -> Option<ScalarType> {
    match language {
        Language::Go => go_base_type(name),
        Language::C | Language::Cpp => c_base_type(name),
        Language::Unknown => None,
    }
}

/// Map a DWARF kind and type name to a scalar type for `language`.
///
/// Pointers always collapse to `VoidPointer` regardless of pointee. Struct
/// kinds are only accepted for the two Go built-ins; any other aggregate can
/// appear as an interior node of an expression but never as a leaf.
pub(crate) fn scalar_type_for(
    language: Language,
    kind: VarKind,
    type_name: &str,
) -> Result<ScalarType> {
    let unsupported = || LowerError::TypeUnsupported {
        language,
        kind,
        type_name: type_name.to_string(),
    };

    match kind {
        VarKind::Base => base_type(language, type_name).ok_or_else(unsupported),
        VarKind::Pointer => Ok(ScalarType::VoidPointer),
        VarKind::Struct => {
            if language == Language::Go {
                if type_name == "string" {
                    return Ok(ScalarType::String);
                }
                if type_name == "[]uint8" || type_name == "[]byte" {
                    return Ok(ScalarType::ByteArray);
                }
            }
            Err(unsupported())
        }
        VarKind::Void => Err(unsupported()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_base_types() {
        assert_eq!(
            scalar_type_for(Language::Go, VarKind::Base, "int").unwrap(),
            ScalarType::Int
        );
        assert_eq!(
            scalar_type_for(Language::Go, VarKind::Base, "uint32").unwrap(),
            ScalarType::UInt32
        );
        assert_eq!(
            scalar_type_for(Language::Go, VarKind::Base, "float64").unwrap(),
            ScalarType::Double
        );
    }

    #[test]
    fn test_c_base_types() {
        assert_eq!(
            scalar_type_for(Language::C, VarKind::Base, "long unsigned int").unwrap(),
            ScalarType::ULong
        );
        assert_eq!(
            scalar_type_for(Language::Cpp, VarKind::Base, "signed char").unwrap(),
            ScalarType::Char
        );
        assert_eq!(
            scalar_type_for(Language::Cpp, VarKind::Base, "long long int").unwrap(),
            ScalarType::LongLong
        );
    }

    #[test]
    fn test_pointer_collapses_to_void_pointer() {
        assert_eq!(
            scalar_type_for(Language::Go, VarKind::Pointer, "pkg.S").unwrap(),
            ScalarType::VoidPointer
        );
        assert_eq!(
            scalar_type_for(Language::C, VarKind::Pointer, "int").unwrap(),
            ScalarType::VoidPointer
        );
    }

    #[test]
    fn test_go_string_and_byte_slice() {
        assert_eq!(
            scalar_type_for(Language::Go, VarKind::Struct, "string").unwrap(),
            ScalarType::String
        );
        assert_eq!(
            scalar_type_for(Language::Go, VarKind::Struct, "[]uint8").unwrap(),
            ScalarType::ByteArray
        );
        assert_eq!(
            scalar_type_for(Language::Go, VarKind::Struct, "[]byte").unwrap(),
            ScalarType::ByteArray
        );
    }

    #[test]
    fn test_struct_leaf_rejected_outside_go() {
        // C++ std::string is an aggregate, not a traceable leaf.
        assert!(scalar_type_for(Language::Cpp, VarKind::Struct, "string").is_err());
        assert!(scalar_type_for(Language::Go, VarKind::Struct, "pkg.S").is_err());
    }

    #[test]
    fn test_unknown_names_and_void_rejected() {
        assert!(scalar_type_for(Language::Go, VarKind::Base, "complex128").is_err());
        assert!(scalar_type_for(Language::C, VarKind::Base, "uint32").is_err());
        assert!(scalar_type_for(Language::C, VarKind::Void, "").is_err());
        assert!(scalar_type_for(Language::Unknown, VarKind::Base, "int").is_err());
    }
}

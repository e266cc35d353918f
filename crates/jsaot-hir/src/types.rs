//! C1 — the HIR type system.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Primitive scalar kinds. `Any` is the escape hatch for values whose static
/// type the generator could not narrow; `Unknown` and `Never` are bookkeeping
/// types (an un-inferred slot, and the type of a block that cannot fall
/// through, respectively).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    I8,
    I32,
    I64,
    F64,
    Bool,
    Void,
    String,
    Any,
    Unknown,
    Never,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::I8 => "i8",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::Void => "void",
            Self::String => "string",
            Self::Any => "any",
            Self::Unknown => "unknown",
            Self::Never => "never",
        };
        f.write_str(s)
    }
}

/// A single named field of a [`StructType`], in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub ty: HirType,
    pub is_public: bool,
}

impl StructField {
    pub fn new(name: impl Into<String>, ty: HirType, is_public: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            is_public,
        }
    }
}

/// A named struct type with an ordered field list. Field order is the ABI
/// field index (§3.1 invariant) and must never be reordered once a class or
/// environment has been lowered against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<StructField>,
}

impl StructType {
    pub fn new(name: impl Into<String>, fields: Vec<StructField>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            fields,
        })
    }

    /// Field index, stable for the struct's lifetime. O(n); struct field
    /// counts are small (object literals, class properties) so a linear scan
    /// beats maintaining a parallel name→index map.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// Structs compare by name identity, never by structural field comparison —
// two distinct classes with the same field shape are not the same type.
impl PartialEq for StructType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for StructType {}

/// A HIR type. Primitives compare structurally; structs compare by name
/// (§3.1). Pointer-to-T is never interchangeable with T.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HirType {
    Primitive(PrimitiveKind),
    Pointer {
        pointee: Box<HirType>,
        mutable: bool,
    },
    Array {
        element: Box<HirType>,
        /// 0 means dynamically sized.
        length: u32,
    },
    Struct(Rc<StructType>),
    Function {
        params: Vec<HirType>,
        return_type: Box<HirType>,
    },
}

impl HirType {
    pub fn i8() -> Self {
        Self::Primitive(PrimitiveKind::I8)
    }
    pub fn i32() -> Self {
        Self::Primitive(PrimitiveKind::I32)
    }
    pub fn i64() -> Self {
        Self::Primitive(PrimitiveKind::I64)
    }
    pub fn f64() -> Self {
        Self::Primitive(PrimitiveKind::F64)
    }
    pub fn bool() -> Self {
        Self::Primitive(PrimitiveKind::Bool)
    }
    pub fn void() -> Self {
        Self::Primitive(PrimitiveKind::Void)
    }
    pub fn string() -> Self {
        Self::Primitive(PrimitiveKind::String)
    }
    pub fn any() -> Self {
        Self::Primitive(PrimitiveKind::Any)
    }
    pub fn unknown() -> Self {
        Self::Primitive(PrimitiveKind::Unknown)
    }
    pub fn never() -> Self {
        Self::Primitive(PrimitiveKind::Never)
    }

    pub fn pointer_to(pointee: HirType, mutable: bool) -> Self {
        Self::Pointer {
            pointee: Box::new(pointee),
            mutable,
        }
    }

    pub fn array_of(element: HirType, length: u32) -> Self {
        Self::Array {
            element: Box::new(element),
            length,
        }
    }

    pub fn struct_ty(ty: Rc<StructType>) -> Self {
        Self::Struct(ty)
    }

    pub fn function(params: Vec<HirType>, return_type: HirType) -> Self {
        Self::Function {
            params,
            return_type: Box::new(return_type),
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Primitive(PrimitiveKind::Bool))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::Primitive(PrimitiveKind::String))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Self::Struct(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer { .. })
    }

    pub fn as_struct(&self) -> Option<&Rc<StructType>> {
        match self {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Unwraps `Pointer{pointee,..}` one level, e.g. to find the struct type
    /// a `this`-typed pointer addresses during member lowering.
    pub fn pointee(&self) -> Option<&HirType> {
        match self {
            Self::Pointer { pointee, .. } => Some(pointee),
            _ => None,
        }
    }
}

impl PartialEq for HirType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Primitive(a), Self::Primitive(b)) => a == b,
            (
                Self::Pointer {
                    pointee: p1,
                    mutable: m1,
                },
                Self::Pointer {
                    pointee: p2,
                    mutable: m2,
                },
            ) => m1 == m2 && p1 == p2,
            (
                Self::Array {
                    element: e1,
                    length: l1,
                },
                Self::Array {
                    element: e2,
                    length: l2,
                },
            ) => l1 == l2 && e1 == e2,
            (Self::Struct(a), Self::Struct(b)) => a.name == b.name,
            (
                Self::Function {
                    params: p1,
                    return_type: r1,
                },
                Self::Function {
                    params: p2,
                    return_type: r2,
                },
            ) => p1 == p2 && r1 == r2,
            _ => false,
        }
    }
}

impl fmt::Display for HirType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Pointer { pointee, mutable } => {
                write!(f, "{}*{}", pointee, if *mutable { "" } else { " const" })
            }
            Self::Array { element, length } => {
                if *length == 0 {
                    write!(f, "{element}[]")
                } else {
                    write!(f, "{element}[{length}]")
                }
            }
            Self::Struct(s) => write!(f, "struct {}", s.name),
            Self::Function {
                params,
                return_type,
            } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {return_type}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_compare_structurally() {
        assert_eq!(HirType::i64(), HirType::i64());
        assert_ne!(HirType::i64(), HirType::f64());
    }

    #[test]
    fn structs_compare_by_name_not_shape() {
        let a = StructType::new("A", vec![StructField::new("x", HirType::i64(), true)]);
        let b = StructType::new("A", vec![StructField::new("x", HirType::i64(), true)]);
        assert_eq!(HirType::struct_ty(a), HirType::struct_ty(b));

        let c = StructType::new("C", vec![StructField::new("x", HirType::i64(), true)]);
        assert_ne!(HirType::struct_ty(b), HirType::struct_ty(c));
    }

    #[test]
    fn pointer_and_pointee_are_distinguishable() {
        let s = StructType::new("Point", vec![]);
        let struct_ty = HirType::struct_ty(s);
        let ptr_ty = HirType::pointer_to(struct_ty.clone(), true);
        assert_ne!(struct_ty, ptr_ty);
    }

    #[test]
    fn field_index_is_stable() {
        let s = StructType::new(
            "P",
            vec![
                StructField::new("x", HirType::i64(), true),
                StructField::new("y", HirType::i64(), true),
            ],
        );
        assert_eq!(s.field_index("x"), Some(0));
        assert_eq!(s.field_index("y"), Some(1));
        assert_eq!(s.field_index("z"), None);
    }
}

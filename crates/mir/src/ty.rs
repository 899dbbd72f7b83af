//! A small structural type layer.
//!
//! The analyses only need enough type information to answer questions like
//! "what does this deref point to" and "is this a raw pointer"; types are
//! compared structurally and carry no interner.

use std::fmt;
use std::sync::Arc;

use crate::Mutability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntTy {
    I32,
    I64,
    Usize,
}

impl IntTy {
    pub fn name(self) -> &'static str {
        match self {
            IntTy::I32 => "i32",
            IntTy::I64 => "i64",
            IntTy::Usize => "usize",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct AdtDef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    Unit,
    Bool,
    Int(IntTy),
    Never,
    Tuple(Arc<[Ty]>),
    Adt(Arc<AdtDef>),
    Array(Arc<Ty>, u64),
    Slice(Arc<Ty>),
    Ref(Arc<Ty>, Mutability),
    RawPtr(Arc<Ty>, Mutability),
    /// A zero-sized function item; the name is kept for printing call
    /// terminators.
    FnDef(Arc<str>),
}

impl Ty {
    pub fn adt(name: &str) -> Ty {
        Ty::Adt(Arc::new(AdtDef { name: name.to_owned() }))
    }

    pub fn tuple(elements: Vec<Ty>) -> Ty {
        Ty::Tuple(elements.into())
    }

    pub fn reference(pointee: Ty, mutability: Mutability) -> Ty {
        Ty::Ref(Arc::new(pointee), mutability)
    }

    pub fn raw_ptr(pointee: Ty, mutability: Mutability) -> Ty {
        Ty::RawPtr(Arc::new(pointee), mutability)
    }

    pub fn fn_def(name: &str) -> Ty {
        Ty::FnDef(name.into())
    }

    /// The pointee, if a `*` projection applies to this type.
    pub fn builtin_deref(&self) -> Option<&Ty> {
        match self {
            Ty::Ref(pointee, _) | Ty::RawPtr(pointee, _) => Some(pointee),
            _ => None,
        }
    }

    pub fn is_unsafe_ptr(&self) -> bool {
        matches!(self, Ty::RawPtr(..))
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Unit => write!(f, "()"),
            Ty::Bool => write!(f, "bool"),
            Ty::Int(int_ty) => write!(f, "{}", int_ty.name()),
            Ty::Never => write!(f, "!"),
            Ty::Tuple(elements) => {
                write!(f, "(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                if elements.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Ty::Adt(adt) => write!(f, "{}", adt.name),
            Ty::Array(element, len) => write!(f, "[{element}; {len}]"),
            Ty::Slice(element) => write!(f, "[{element}]"),
            Ty::Ref(pointee, Mutability::Not) => write!(f, "&{pointee}"),
            Ty::Ref(pointee, Mutability::Mut) => write!(f, "&mut {pointee}"),
            Ty::RawPtr(pointee, Mutability::Not) => write!(f, "*const {pointee}"),
            Ty::RawPtr(pointee, Mutability::Mut) => write!(f, "*mut {pointee}"),
            Ty::FnDef(name) => write!(f, "fn {name}"),
        }
    }
}

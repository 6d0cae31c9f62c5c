// ============================================================
// HIR Type System
// ============================================================
//
// This is the canonical type representation used by the expansion stage.
// Every type arriving here has been fully resolved by inference.
// `Infer` only exists so a broken upstream contract can be detected.
//
// Types are plain trees (no interning) because every expansion pass
// rewrites them in place.
//
// ============================================================

use crate::hir::hir_nodes::ClosureId;
use crate::hir::lang_items;
use serde::{Deserialize, Serialize};

// ============================================================
// Paths
// ============================================================

/// Absolute path to an item, e.g. `core::ops::Add` or `demo::main::closure#0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimplePath {
    pub components: Vec<String>,
}

impl SimplePath {
    pub fn new(path: &str) -> Self {
        Self {
            components: path
                .split("::")
                .filter(|component| !component.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    pub fn join(&self, name: &str) -> Self {
        let mut components = self.components.clone();
        components.push(name.to_owned());
        Self { components }
    }

    pub fn last(&self) -> &str {
        self.components.last().map(String::as_str).unwrap_or("")
    }

    pub fn is(&self, path: &str) -> bool {
        let mut other = path.split("::").filter(|component| !component.is_empty());
        let mut own = self.components.iter();

        loop {
            match (own.next(), other.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) if a == b => continue,
                _ => return false,
            }
        }
    }
}

impl std::fmt::Display for SimplePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.components.join("::"))
    }
}

/// A path plus the generic arguments it is instantiated with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericPath {
    pub path: SimplePath,

    #[serde(default)]
    pub params: Vec<HirType>,
}

impl GenericPath {
    pub fn new(path: SimplePath, params: Vec<HirType>) -> Self {
        Self { path, params }
    }

    pub fn lang(path: &str, params: Vec<HirType>) -> Self {
        Self {
            path: SimplePath::new(path),
            params,
        }
    }

    pub fn substitute(&self, generics: &[HirType]) -> GenericPath {
        GenericPath {
            path: self.path.clone(),
            params: self
                .params
                .iter()
                .map(|param| param.substitute(generics))
                .collect(),
        }
    }
}

/// A generic parameter declared on an item.
/// `HirType::Generic { index }` refers into the owner's combined list
/// (impl/trait level parameters first, then the method's own).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericParam {
    pub name: String,

    #[serde(default)]
    pub bounds: Vec<GenericPath>,
}

// ============================================================
// Type Kinds
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BorrowKind {
    Shared,
    Unique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoreType {
    Bool,
    Char,
    Str,
    U8,
    U32,
    U64,
    Usize,
    I32,
    I64,
    Isize,
    F32,
    F64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HirType {
    /// Unresolved inference variable. Never valid inside this stage.
    Infer,

    Primitive(CoreType),

    /// The type of diverging expressions (`!`).
    Diverge,

    /// EMPTY TUPLE IS THE UNIT TYPE ()
    Tuple(Vec<HirType>),

    /// Resolved struct (or lang item such as `Box`) with generic arguments.
    Path(GenericPath),

    Generic {
        name: String,
        index: u32,
    },

    Borrow {
        kind: BorrowKind,
        inner: Box<HirType>,
    },

    /// Function pointer.
    Function {
        args: Vec<HirType>,
        ret: Box<HirType>,
    },

    /// The anonymous type of a closure literal.
    /// Removed by closure expansion.
    Closure {
        id: ClosureId,
        args: Vec<HirType>,
        ret: Box<HirType>,
    },

    /// An `impl Trait` placeholder.
    /// `origin` is the defining function (with the generic arguments at this mention),
    /// `index` distinguishes several placeholders in one signature.
    /// Removed by erased type lowering.
    ErasedType {
        origin: GenericPath,
        index: u32,
        bounds: Vec<GenericPath>,

        #[serde(default)]
        resolved: Option<Box<HirType>>,
    },

    /// `dyn Trait + ...`
    TraitObject {
        traits: Vec<GenericPath>,
    },
}

impl HirType {
    pub fn unit() -> Self {
        HirType::Tuple(Vec::new())
    }

    pub fn borrow(kind: BorrowKind, inner: HirType) -> Self {
        HirType::Borrow {
            kind,
            inner: Box::new(inner),
        }
    }

    pub fn boxed(inner: HirType) -> Self {
        HirType::Path(GenericPath::lang(lang_items::OWNED_BOX, vec![inner]))
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, HirType::Tuple(fields) if fields.is_empty())
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, HirType::Primitive(_))
    }

    pub fn is_box(&self) -> bool {
        matches!(self, HirType::Path(path) if path.path.is(lang_items::OWNED_BOX) && path.params.len() == 1)
    }

    /// Returns the borrow kind and referent if this is a reference type.
    pub fn as_reference(&self) -> Option<(BorrowKind, &HirType)> {
        match self {
            HirType::Borrow { kind, inner } => Some((*kind, inner)),
            _ => None,
        }
    }

    /// The type produced by a builtin dereference (references and boxes).
    pub fn builtin_deref_target(&self) -> Option<&HirType> {
        match self {
            HirType::Borrow { inner, .. } => Some(inner),
            HirType::Path(path) if self.is_box() => path.params.first(),
            _ => None,
        }
    }

    pub fn contains_infer(&self) -> bool {
        let mut found = false;
        self.for_each_type(&mut |ty| {
            if matches!(ty, HirType::Infer) {
                found = true;
            }
        });
        found
    }

    pub fn mentions_closure(&self, id: ClosureId) -> bool {
        let mut found = false;
        self.for_each_type(&mut |ty| {
            if matches!(ty, HirType::Closure { id: other, .. } if *other == id) {
                found = true;
            }
        });
        found
    }

    /// Visits this type and every nested type, outermost first.
    pub fn for_each_type(&self, visit: &mut impl FnMut(&HirType)) {
        visit(self);

        match self {
            HirType::Infer
            | HirType::Primitive(_)
            | HirType::Diverge
            | HirType::Generic { .. } => {}

            HirType::Tuple(fields) => {
                for field in fields {
                    field.for_each_type(visit);
                }
            }

            HirType::Path(path) => {
                for param in &path.params {
                    param.for_each_type(visit);
                }
            }

            HirType::Borrow { inner, .. } => inner.for_each_type(visit),

            HirType::Function { args, ret } | HirType::Closure { args, ret, .. } => {
                for arg in args {
                    arg.for_each_type(visit);
                }
                ret.for_each_type(visit);
            }

            HirType::ErasedType {
                origin,
                bounds,
                resolved,
                ..
            } => {
                for param in &origin.params {
                    param.for_each_type(visit);
                }
                for bound in bounds {
                    for param in &bound.params {
                        param.for_each_type(visit);
                    }
                }
                if let Some(resolved) = resolved {
                    resolved.for_each_type(visit);
                }
            }

            HirType::TraitObject { traits } => {
                for bound in traits {
                    for param in &bound.params {
                        param.for_each_type(visit);
                    }
                }
            }
        }
    }

    /// Replaces every `Generic { index }` with `generics[index]`.
    /// Indices outside the provided list are left untouched.
    pub fn substitute(&self, generics: &[HirType]) -> HirType {
        match self {
            HirType::Generic { index, .. } => match generics.get(*index as usize) {
                Some(replacement) => replacement.clone(),
                None => self.clone(),
            },

            HirType::Infer | HirType::Primitive(_) | HirType::Diverge => self.clone(),

            HirType::Tuple(fields) => HirType::Tuple(
                fields
                    .iter()
                    .map(|field| field.substitute(generics))
                    .collect(),
            ),

            HirType::Path(path) => HirType::Path(path.substitute(generics)),

            HirType::Borrow { kind, inner } => HirType::borrow(*kind, inner.substitute(generics)),

            HirType::Function { args, ret } => HirType::Function {
                args: args.iter().map(|arg| arg.substitute(generics)).collect(),
                ret: Box::new(ret.substitute(generics)),
            },

            HirType::Closure { id, args, ret } => HirType::Closure {
                id: *id,
                args: args.iter().map(|arg| arg.substitute(generics)).collect(),
                ret: Box::new(ret.substitute(generics)),
            },

            HirType::ErasedType {
                origin,
                index,
                bounds,
                resolved,
            } => HirType::ErasedType {
                origin: origin.substitute(generics),
                index: *index,
                bounds: bounds
                    .iter()
                    .map(|bound| bound.substitute(generics))
                    .collect(),
                resolved: resolved
                    .as_ref()
                    .map(|resolved| Box::new(resolved.substitute(generics))),
            },

            HirType::TraitObject { traits } => HirType::TraitObject {
                traits: traits
                    .iter()
                    .map(|bound| bound.substitute(generics))
                    .collect(),
            },
        }
    }
}

/// The identity substitution for a list of generic parameters.
pub fn generic_params_as_types(params: &[GenericParam]) -> Vec<HirType> {
    params
        .iter()
        .enumerate()
        .map(|(index, param)| HirType::Generic {
            name: param.name.clone(),
            index: index as u32,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_replaces_nested_generics() {
        let ty = HirType::borrow(
            BorrowKind::Unique,
            HirType::Tuple(vec![
                HirType::Generic {
                    name: String::from("T"),
                    index: 0,
                },
                HirType::Primitive(CoreType::Bool),
            ]),
        );

        let substituted = ty.substitute(&[HirType::Primitive(CoreType::I32)]);

        assert_eq!(
            substituted,
            HirType::borrow(
                BorrowKind::Unique,
                HirType::Tuple(vec![
                    HirType::Primitive(CoreType::I32),
                    HirType::Primitive(CoreType::Bool),
                ]),
            )
        );
    }

    #[test]
    fn box_is_a_builtin_deref() {
        let boxed = HirType::boxed(HirType::Primitive(CoreType::U8));
        assert!(boxed.is_box());
        assert_eq!(
            boxed.builtin_deref_target(),
            Some(&HirType::Primitive(CoreType::U8))
        );
    }

    #[test]
    fn simple_path_matches_written_form() {
        let path = SimplePath::new("core::ops::Add");
        assert!(path.is("core::ops::Add"));
        assert!(path.is("::core::ops::Add"));
        assert!(!path.is("core::ops"));
        assert_eq!(path.join("add").last(), "add");
    }
}

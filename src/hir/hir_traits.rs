//! Read-only view of every trait and impl in a crate.
//!
//! Built once per pass from the crate as it stands, then shared between
//! worker threads. Passes use it to answer "is this type Copy" and to
//! re-resolve explicit trait calls; it never performs inference.

use crate::hir::hir_datatypes::{BorrowKind, GenericParam, GenericPath, HirType, SimplePath};
use crate::hir::hir_nodes::{Crate, Function, ItemId, ItemKind};
use crate::hir::lang_items;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
struct ImplEntry {
    item: ItemId,
    generic_count: usize,
    trait_params: Vec<HirType>,
    self_ty: HirType,
    methods: Vec<String>,
}

#[derive(Debug, Default)]
pub struct TraitTable {
    /// Trait path -> the names of its methods, in declaration order.
    traits: FxHashMap<SimplePath, Vec<String>>,

    /// Trait path -> every impl of it in the crate.
    impls: FxHashMap<SimplePath, Vec<ImplEntry>>,

    /// Inherent impls, in crate order.
    inherent: Vec<ImplEntry>,
}

impl TraitTable {
    pub fn build(krate: &Crate) -> Self {
        let mut table = TraitTable::default();

        for (index, item) in krate.items.iter().enumerate() {
            let id = ItemId(index as u32);

            match &item.kind {
                ItemKind::Trait(declaration) => {
                    table.traits.insert(
                        item.path.clone(),
                        declaration
                            .methods
                            .iter()
                            .map(|method| method.name.to_owned())
                            .collect(),
                    );
                }

                ItemKind::TraitImpl(imp) => {
                    table
                        .impls
                        .entry(imp.trait_path.path.clone())
                        .or_default()
                        .push(ImplEntry {
                            item: id,
                            generic_count: imp.generics.len(),
                            trait_params: imp.trait_path.params.clone(),
                            self_ty: imp.self_ty.clone(),
                            methods: imp.methods.iter().map(|m| m.name.to_owned()).collect(),
                        });
                }

                ItemKind::TypeImpl(imp) => {
                    table.inherent.push(ImplEntry {
                        item: id,
                        generic_count: imp.generics.len(),
                        trait_params: Vec::new(),
                        self_ty: imp.self_ty.clone(),
                        methods: imp.methods.iter().map(|m| m.name.to_owned()).collect(),
                    });
                }

                ItemKind::Function(_) | ItemKind::Struct(_) => {}
            }
        }

        table
    }

    pub fn is_declared_trait(&self, path: &SimplePath) -> bool {
        self.traits.contains_key(path)
    }

    /// Method names of a trait declared in this crate.
    pub fn trait_methods(&self, path: &SimplePath) -> Option<&[String]> {
        self.traits.get(path).map(Vec::as_slice)
    }

    /// Finds the impl of `trait_path` for `self_ty`.
    /// Impl-level generics act as wildcards, but must bind consistently.
    pub fn find_impl(&self, trait_path: &GenericPath, self_ty: &HirType) -> Option<ItemId> {
        let candidates = self.impls.get(&trait_path.path)?;

        candidates
            .iter()
            .find(|entry| {
                let mut bound = vec![None; entry.generic_count];

                if !match_type(&entry.self_ty, self_ty, &mut bound) {
                    return false;
                }

                // An impl written without trait parameters matches any instantiation
                if entry.trait_params.is_empty() {
                    return true;
                }

                entry.trait_params.len() == trait_path.params.len()
                    && entry
                        .trait_params
                        .iter()
                        .zip(&trait_path.params)
                        .all(|(pattern, ty)| match_type(pattern, ty, &mut bound))
            })
            .map(|entry| entry.item)
    }

    /// Finds the inherent impl defining `method` for `self_ty`.
    pub fn find_inherent_method(&self, self_ty: &HirType, method: &str) -> Option<ItemId> {
        self.inherent
            .iter()
            .find(|entry| {
                let mut bound = vec![None; entry.generic_count];
                entry.methods.iter().any(|name| name == method)
                    && match_type(&entry.self_ty, self_ty, &mut bound)
            })
            .map(|entry| entry.item)
    }

    /// Whether an impl item defines `method` itself (rather than relying on a trait default).
    pub fn impl_defines_method(&self, item: ItemId, method: &str) -> bool {
        self.impls
            .values()
            .flatten()
            .chain(self.inherent.iter())
            .any(|entry| entry.item == item && entry.methods.iter().any(|name| name == method))
    }

    /// `scope` is the combined generic list of the function the type appears in.
    pub fn is_copy(&self, ty: &HirType, scope: &[GenericParam]) -> bool {
        match ty {
            HirType::Primitive(core) => *core != crate::hir::hir_datatypes::CoreType::Str,
            HirType::Diverge | HirType::Function { .. } => true,
            HirType::Borrow { kind, .. } => *kind == BorrowKind::Shared,
            HirType::Tuple(fields) => fields.iter().all(|field| self.is_copy(field, scope)),

            HirType::Path(_) => {
                let copy = GenericPath::lang(lang_items::COPY_TRAIT, Vec::new());
                self.find_impl(&copy, ty).is_some()
            }

            HirType::Generic { index, .. } => scope.get(*index as usize).is_some_and(|param| {
                param
                    .bounds
                    .iter()
                    .any(|bound| bound.path.is(lang_items::COPY_TRAIT))
            }),

            HirType::ErasedType {
                bounds, resolved, ..
            } => match resolved {
                Some(resolved) => self.is_copy(resolved, scope),
                None => bounds
                    .iter()
                    .any(|bound| bound.path.is(lang_items::COPY_TRAIT)),
            },

            HirType::Infer | HirType::Closure { .. } | HirType::TraitObject { .. } => false,
        }
    }
}

/// Structural match of an impl pattern against a concrete type.
/// `Generic { index }` in the pattern binds `bound[index]`.
fn match_type(pattern: &HirType, ty: &HirType, bound: &mut Vec<Option<HirType>>) -> bool {
    match (pattern, ty) {
        (HirType::Generic { index, .. }, _) if (*index as usize) < bound.len() => {
            match &bound[*index as usize] {
                Some(previous) => previous == ty,
                None => {
                    bound[*index as usize] = Some(ty.clone());
                    true
                }
            }
        }

        (HirType::Tuple(a), HirType::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| match_type(a, b, bound))
        }

        (HirType::Path(a), HirType::Path(b)) => {
            a.path == b.path
                && a.params.len() == b.params.len()
                && a.params
                    .iter()
                    .zip(&b.params)
                    .all(|(a, b)| match_type(a, b, bound))
        }

        (
            HirType::Borrow {
                kind: kind_a,
                inner: inner_a,
            },
            HirType::Borrow {
                kind: kind_b,
                inner: inner_b,
            },
        ) => kind_a == kind_b && match_type(inner_a, inner_b, bound),

        (
            HirType::Function {
                args: args_a,
                ret: ret_a,
            },
            HirType::Function {
                args: args_b,
                ret: ret_b,
            },
        ) => {
            args_a.len() == args_b.len()
                && args_a
                    .iter()
                    .zip(args_b)
                    .all(|(a, b)| match_type(a, b, bound))
                && match_type(ret_a, ret_b, bound)
        }

        _ => pattern == ty,
    }
}

// ============================================================
// Signatures
// ============================================================

/// Argument types of every callable in the crate, keyed the way call sites name them.
/// Used to find the slot type a call argument is passed into.
#[derive(Debug, Default)]
pub struct SignatureTable {
    /// Free functions and inherent/impl methods by their full path.
    functions: FxHashMap<SimplePath, Vec<HirType>>,

    /// Trait method declarations by (trait path, method name).
    trait_methods: FxHashMap<(SimplePath, String), Vec<HirType>>,
}

impl SignatureTable {
    pub fn build(krate: &Crate) -> Self {
        let mut table = SignatureTable::default();

        let arg_types =
            |function: &Function| function.args.iter().map(|arg| arg.ty.clone()).collect();

        for item in &krate.items {
            match &item.kind {
                ItemKind::Function(function) => {
                    table
                        .functions
                        .insert(item.path.clone(), arg_types(function));
                }

                ItemKind::Trait(declaration) => {
                    for method in &declaration.methods {
                        table.trait_methods.insert(
                            (item.path.clone(), method.name.to_owned()),
                            arg_types(&method.function),
                        );
                    }
                }

                ItemKind::TypeImpl(imp) => {
                    for method in &imp.methods {
                        table
                            .functions
                            .insert(item.path.join(&method.name), arg_types(&method.function));
                    }
                }

                ItemKind::TraitImpl(_) | ItemKind::Struct(_) => {}
            }
        }

        table
    }

    pub fn function(&self, path: &SimplePath) -> Option<&[HirType]> {
        self.functions.get(path).map(Vec::as_slice)
    }

    pub fn trait_method(&self, trait_path: &SimplePath, method: &str) -> Option<&[HirType]> {
        self.trait_methods
            .get(&(trait_path.clone(), method.to_owned()))
            .map(Vec::as_slice)
    }
}

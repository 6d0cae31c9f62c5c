//! ============================================================
//!                         HIR Nodes
//! ============================================================
//! The fully typed representation of a whole crate, as delivered by
//! type checking and trait resolution.
//!  - Every expression carries its resolved type and source location
//!  - Every implicit dispatch site carries its resolved trait/impl
//!  - Locals are owned by their function body and referenced by `BindingId`
//!
//! The expansion passes rewrite this tree in place until it contains
//! no closures, no implicit dispatch, no missing reborrows and no erased types.
//!
//! ============================================================
//!                     Item Stability
//! ============================================================
//!
//! Items are addressed by `ItemId`, their index in `Crate::items`.
//! Passes only ever append items, so an `ItemId` handed out before
//! a pass is still valid after it.

use crate::hir::hir_datatypes::{BorrowKind, GenericParam, GenericPath, HirType, SimplePath};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

// ============================================================
// Stable IDs
// ============================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BindingId(pub u32);

/// Unique across the crate; closure expansion rejects duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClosureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VTableId(pub u32);

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

impl Display for BindingId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "_{}", self.0)
    }
}

impl Display for ClosureId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "closure#{}", self.0)
    }
}

// ============================================================
// Source Locations
// ============================================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharPosition {
    pub line_number: i32,
    pub char_column: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextLocation {
    pub scope: PathBuf,
    pub start_pos: CharPosition,
    pub end_pos: CharPosition,
}

impl TextLocation {
    pub fn new(scope: PathBuf, start: CharPosition, end: CharPosition) -> Self {
        Self {
            scope,
            start_pos: start,
            end_pos: end,
        }
    }

    pub fn new_just_line(line: i32) -> Self {
        Self {
            scope: PathBuf::new(),
            start_pos: CharPosition {
                line_number: line,
                char_column: 0,
            },
            end_pos: CharPosition {
                line_number: line,
                char_column: 120, // Arbitrary number
            },
        }
    }
}

// ============================================================
// Crate
// ============================================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crate {
    pub name: String,
    pub items: Vec<Item>,

    /// Method tables for boxed erased types. Filled by erased type lowering.
    #[serde(default)]
    pub vtables: Vec<VTable>,
}

impl Crate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            vtables: Vec::new(),
        }
    }

    pub fn push_item(&mut self, item: Item) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        self.items.push(item);
        id
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.0 as usize)
    }

    pub fn item_by_path(&self, path: &SimplePath) -> Option<(ItemId, &Item)> {
        self.items
            .iter()
            .enumerate()
            .find(|(_, item)| &item.path == path)
            .map(|(index, item)| (ItemId(index as u32), item))
    }
}

// ============================================================
// Items
// ============================================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub path: SimplePath,
    pub location: TextLocation,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemKind {
    Function(Function),
    Struct(Struct),
    Trait(Trait),
    TraitImpl(TraitImpl),
    TypeImpl(TypeImpl),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Struct {
    #[serde(default)]
    pub generics: Vec<GenericParam>,
    pub fields: Vec<StructField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub ty: HirType,
}

/// Inside a trait, `Self` is `Generic { index: 0 }` and the trait's own
/// parameters follow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trait {
    #[serde(default)]
    pub generics: Vec<GenericParam>,

    /// Declarations (and default bodies) of the trait's methods.
    pub methods: Vec<NamedFunction>,

    #[serde(default)]
    pub associated_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitImpl {
    #[serde(default)]
    pub generics: Vec<GenericParam>,
    pub trait_path: GenericPath,
    pub self_ty: HirType,
    pub methods: Vec<NamedFunction>,

    #[serde(default)]
    pub types: Vec<(String, HirType)>,
}

/// Inherent `impl Type { ... }` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeImpl {
    #[serde(default)]
    pub generics: Vec<GenericParam>,
    pub self_ty: HirType,
    pub methods: Vec<NamedFunction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedFunction {
    pub name: String,
    pub function: Function,
}

// ============================================================
// Functions
// ============================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FunctionReceiver {
    #[default]
    Free,
    Value,
    Borrow,
    BorrowMut,
    Box,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Only the function's own parameters. Impl/trait parameters come first
    /// in the combined index space (see `GenericParam`).
    #[serde(default)]
    pub generics: Vec<GenericParam>,

    #[serde(default)]
    pub receiver: FunctionReceiver,

    /// When `receiver` isn't `Free`, `args[0]` is the `self` argument.
    pub args: Vec<FunctionArg>,
    pub ret: HirType,

    /// None for trait method declarations without a default body.
    pub body: Option<FunctionBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionArg {
    pub pattern: Pattern,
    pub ty: HirType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionBody {
    /// Every binding declared anywhere in this body (arguments, lets, match arms, closure args).
    pub locals: Vec<Binding>,
    pub root: Expr,
}

impl FunctionBody {
    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.locals.get(id.0 as usize)
    }
}

// ============================================================
// Bindings
// ============================================================

/// How a binding (or a single use of it) is used.
/// Ordered from weakest to strictest; merging different uses keeps the strictest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Usage {
    #[default]
    Unused,
    ByValue,
    Shared,
    Mutable,
}

impl From<BorrowKind> for Usage {
    fn from(kind: BorrowKind) -> Self {
        match kind {
            BorrowKind::Shared => Usage::Shared,
            BorrowKind::Unique => Usage::Mutable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub ty: HirType,
    pub mutable: bool,

    // Filled by usage annotation
    #[serde(default)]
    pub usage: Usage,

    /// Set when at least one use consumes a non-Copy value.
    #[serde(default)]
    pub moved: bool,

    /// Sequence number of the last use in evaluation order.
    #[serde(default)]
    pub last_use: Option<u32>,
}

impl Binding {
    pub fn new(name: impl Into<String>, ty: HirType, mutable: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            mutable,
            usage: Usage::Unused,
            moved: false,
            last_use: None,
        }
    }
}

// ============================================================
// Patterns
// ============================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternBindingMode {
    Move,
    Ref,
    MutRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub location: TextLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternKind {
    Any,

    Binding {
        binding: BindingId,
        mode: PatternBindingMode,
        sub: Option<Box<Pattern>>,
    },

    Tuple(Vec<Pattern>),

    Struct {
        path: GenericPath,
        fields: Vec<(String, Pattern)>,
    },

    Literal(Literal),
}

impl Pattern {
    pub fn binding(binding: BindingId, location: TextLocation) -> Self {
        Self {
            kind: PatternKind::Binding {
                binding,
                mode: PatternBindingMode::Move,
                sub: None,
            },
            location,
        }
    }

    /// Collects every binding declared by this pattern, in source order.
    pub fn bindings(&self, out: &mut Vec<(BindingId, PatternBindingMode)>) {
        match &self.kind {
            PatternKind::Any | PatternKind::Literal(_) => {}
            PatternKind::Binding { binding, mode, sub } => {
                out.push((*binding, *mode));
                if let Some(sub) = sub {
                    sub.bindings(out);
                }
            }
            PatternKind::Tuple(elements) => {
                for element in elements {
                    element.bindings(out);
                }
            }
            PatternKind::Struct { fields, .. } => {
                for (_, field) in fields {
                    field.bindings(out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Expr,
}

// ============================================================
// Dispatch Resolution (attached by trait resolution)
// ============================================================

/// Where the implementation of a trait method comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImplSource {
    /// A `TraitImpl` / `TypeImpl` item in this crate.
    Impl(ItemId),

    /// A where-clause bound on a generic parameter.
    Bound,

    /// Provided by the compiler (primitive operators, pointers).
    Builtin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DerefStep {
    /// `*` on a reference or a `Box`.
    Builtin,

    /// `Deref`/`DerefMut` impl, producing `target`.
    Overloaded { target: HirType, source: ImplSource },
}

/// How a method receiver is adjusted before the call: auto-deref steps then an auto-ref.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiverAdjust {
    #[serde(default)]
    pub derefs: Vec<DerefStep>,

    #[serde(default)]
    pub autoref: Option<BorrowKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResolution {
    /// None for inherent methods.
    pub trait_path: Option<GenericPath>,

    /// The implementing type.
    pub self_ty: HirType,

    #[serde(default)]
    pub method_params: Vec<HirType>,

    pub source: ImplSource,

    #[serde(default)]
    pub adjust: ReceiverAdjust,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CallPath {
    Function(GenericPath),

    /// `<self_ty as trait_path>::method::<params>`
    UfcsKnown {
        self_ty: HirType,
        trait_path: GenericPath,
        method: String,
        params: Vec<HirType>,
    },

    /// `<self_ty>::method::<params>`
    UfcsInherent {
        self_ty: HirType,
        method: String,
        params: Vec<HirType>,
    },
}

// ============================================================
// Vtables
// ============================================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VTable {
    pub trait_path: GenericPath,
    pub concrete: HirType,
    pub methods: Vec<VTableEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VTableEntry {
    pub name: String,
    pub source: ImplSource,
}

// ============================================================
// Expressions
// ============================================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: HirType,
    pub location: TextLocation,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: HirType, location: TextLocation) -> Self {
        Self { kind, ty, location }
    }

    pub fn boxed(kind: ExprKind, ty: HirType, location: TextLocation) -> Box<Self> {
        Box::new(Self::new(kind, ty, location))
    }

    /// A place expression refers to a memory location rather than producing a new value.
    pub fn is_place(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Local(_)
                | ExprKind::Field { .. }
                | ExprKind::Deref { .. }
                | ExprKind::Index { .. }
        )
    }

    /// The local a place expression is rooted at, if any.
    pub fn place_root(&self) -> Option<&LocalUse> {
        match &self.kind {
            ExprKind::Local(local) => Some(local),
            ExprKind::Field { value, .. }
            | ExprKind::Deref { value, .. }
            | ExprKind::Index { value, .. } => value.place_root(),
            _ => None,
        }
    }
}

/// A reference to a local binding.
/// `usage` and `seq` are filled by usage annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalUse {
    pub binding: BindingId,

    #[serde(default)]
    pub usage: Usage,

    #[serde(default)]
    pub seq: u32,
}

impl LocalUse {
    pub fn new(binding: BindingId) -> Self {
        Self {
            binding,
            usage: Usage::Unused,
            seq: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    // --------------------------------------------------------
    // Control flow
    // --------------------------------------------------------
    Block {
        statements: Vec<Expr>,
        tail: Option<Box<Expr>>,
    },

    Let {
        pattern: Pattern,
        value: Option<Box<Expr>>,
    },

    Return(Option<Box<Expr>>),

    Loop {
        body: Box<Expr>,
    },

    Break(Option<Box<Expr>>),

    If {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },

    Match {
        scrutinee: Box<Expr>,
        arms: Vec<MatchArm>,
    },

    // --------------------------------------------------------
    // Operations (implicit dispatch when operands are not primitive)
    // --------------------------------------------------------
    /// `target = value` or, with an operator, `target op= value`.
    Assign {
        op: Option<HirBinOp>,
        target: Box<Expr>,
        value: Box<Expr>,
        resolution: Option<MethodResolution>,
    },

    BinOp {
        op: HirBinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        resolution: Option<MethodResolution>,
    },

    UniOp {
        op: HirUniOp,
        operand: Box<Expr>,
        resolution: Option<MethodResolution>,
    },

    // --------------------------------------------------------
    // Memory
    // --------------------------------------------------------
    Borrow {
        kind: BorrowKind,
        value: Box<Expr>,
    },

    /// Builtin for references and boxes, overloaded (`Deref`) otherwise.
    Deref {
        value: Box<Expr>,
        resolution: Option<MethodResolution>,
    },

    Index {
        value: Box<Expr>,
        index: Box<Expr>,
        resolution: Option<MethodResolution>,
    },

    Field {
        value: Box<Expr>,
        field: String,
    },

    Literal(Literal),

    Local(LocalUse),

    ItemPath(GenericPath),

    // --------------------------------------------------------
    // Calls
    // --------------------------------------------------------
    /// Explicit call of a path. The only call form left after UFCS normalization
    /// (besides calls through function pointers).
    CallPath {
        path: CallPath,
        args: Vec<Expr>,
    },

    /// Call of a value: a function pointer, a closure, or a generic callable.
    CallValue {
        callee: Box<Expr>,
        args: Vec<Expr>,
        resolution: Option<MethodResolution>,
    },

    /// `receiver.method(args)`
    CallMethod {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        resolution: Option<MethodResolution>,
    },

    // --------------------------------------------------------
    // Construction
    // --------------------------------------------------------
    Closure {
        id: ClosureId,
        args: Vec<FunctionArg>,
        ret: HirType,
        body: Box<Expr>,
        is_move: bool,
    },

    StructLiteral {
        path: GenericPath,
        fields: Vec<(String, Expr)>,
    },

    Tuple(Vec<Expr>),

    /// Coercion of a box of a concrete type into a box of a trait object.
    Unsize {
        value: Box<Expr>,
        vtables: Vec<VTableId>,
    },
}

// ============================================================
// Operators
// ============================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HirBinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl HirBinOp {
    /// Comparison operators take both operands by reference when overloaded.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            HirBinOp::Eq | HirBinOp::Ne | HirBinOp::Lt | HirBinOp::Le | HirBinOp::Gt | HirBinOp::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HirUniOp {
    Neg,
    Not,
}

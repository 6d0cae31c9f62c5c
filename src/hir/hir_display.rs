//! HIR Display
//!
//! Renders a crate back into Rust-like text so the effect of each expansion
//! pass can be inspected (`--dump`, `[output] dump_hir_after`).
//! The output is for humans only and is never parsed again.

use crate::hir::hir_datatypes::{BorrowKind, CoreType, GenericParam, GenericPath, HirType};
use crate::hir::hir_nodes::{
    Binding, BindingId, CallPath, Crate, DerefStep, Expr, ExprKind, Function, FunctionReceiver,
    HirBinOp, HirUniOp, ImplSource, Item, ItemKind, Literal, MethodResolution, Pattern,
    PatternBindingMode, PatternKind, TextLocation, Usage, VTable,
};
use std::fmt::{Display, Formatter, Result as FmtResult, Write as _};

const MAX_TYPE_RENDER_DEPTH: usize = 24;
const INDENT: usize = 4;

// ============================================================================
// Rendering
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct HirDisplayOptions {
    pub include_types: bool,
    pub include_usage: bool,
    pub include_resolutions: bool,
    pub include_locations: bool,
}

impl Default for HirDisplayOptions {
    fn default() -> Self {
        Self {
            include_types: false,
            include_usage: true,
            include_resolutions: true,
            include_locations: false,
        }
    }
}

#[derive(Clone, Copy)]
pub struct HirDisplayContext {
    options: HirDisplayOptions,
}

impl HirDisplayContext {
    pub fn new() -> Self {
        Self {
            options: HirDisplayOptions::default(),
        }
    }

    pub fn with_options(mut self, options: HirDisplayOptions) -> Self {
        self.options = options;
        self
    }

    pub fn render_crate(&self, krate: &Crate) -> String {
        let mut out = String::with_capacity(krate.items.len() * 256);

        let _ = writeln!(out, "// crate {}", krate.name);
        for (index, item) in krate.items.iter().enumerate() {
            out.push('\n');
            let _ = writeln!(out, "// item#{}", index);
            out.push_str(&self.render_item(item));
        }

        if !krate.vtables.is_empty() {
            out.push('\n');
            for (index, vtable) in krate.vtables.iter().enumerate() {
                let _ = writeln!(out, "vtable#{} {}", index, self.render_vtable(vtable));
            }
        }

        out
    }

    pub fn render_item(&self, item: &Item) -> String {
        let mut out = String::new();

        if self.options.include_locations {
            let _ = writeln!(out, "// at {}", render_text_location(&item.location));
        }

        match &item.kind {
            ItemKind::Function(function) => {
                out.push_str(&self.render_function(&item.path.to_string(), function, 0));
            }

            ItemKind::Struct(definition) => {
                let _ = writeln!(
                    out,
                    "struct {}{} {{",
                    item.path,
                    render_generic_params(&definition.generics)
                );
                for field in &definition.fields {
                    push_indented_line(
                        &mut out,
                        INDENT,
                        &format!("{}: {},", field.name, field.ty),
                    );
                }
                out.push_str("}\n");
            }

            ItemKind::Trait(declaration) => {
                let _ = writeln!(
                    out,
                    "trait {}{} {{",
                    item.path,
                    render_generic_params(&declaration.generics)
                );
                for name in &declaration.associated_types {
                    push_indented_line(&mut out, INDENT, &format!("type {};", name));
                }
                for method in &declaration.methods {
                    out.push_str(&self.render_function(&method.name, &method.function, INDENT));
                }
                out.push_str("}\n");
            }

            ItemKind::TraitImpl(imp) => {
                let _ = writeln!(
                    out,
                    "impl{} {} for {} {{ // {}",
                    render_generic_params(&imp.generics),
                    imp.trait_path,
                    imp.self_ty,
                    item.path
                );
                for (name, ty) in &imp.types {
                    push_indented_line(&mut out, INDENT, &format!("type {} = {};", name, ty));
                }
                for method in &imp.methods {
                    out.push_str(&self.render_function(&method.name, &method.function, INDENT));
                }
                out.push_str("}\n");
            }

            ItemKind::TypeImpl(imp) => {
                let _ = writeln!(
                    out,
                    "impl{} {} {{ // {}",
                    render_generic_params(&imp.generics),
                    imp.self_ty,
                    item.path
                );
                for method in &imp.methods {
                    out.push_str(&self.render_function(&method.name, &method.function, INDENT));
                }
                out.push_str("}\n");
            }
        }

        out
    }

    pub fn render_function(&self, name: &str, function: &Function, indent: usize) -> String {
        let locals = function
            .body
            .as_ref()
            .map(|body| body.locals.as_slice())
            .unwrap_or_default();

        let args = function
            .args
            .iter()
            .enumerate()
            .map(|(index, arg)| {
                if index == 0 && function.receiver != FunctionReceiver::Free {
                    return receiver_label(function.receiver, &arg.ty);
                }
                format!("{}: {}", self.render_pattern(&arg.pattern, locals), arg.ty)
            })
            .collect::<Vec<_>>()
            .join(", ");

        let ret = if function.ret.is_unit() {
            String::new()
        } else {
            format!(" -> {}", function.ret)
        };

        let header = format!(
            "fn {}{}({}){}",
            name,
            render_generic_params(&function.generics),
            args,
            ret
        );

        let mut out = String::new();
        let Some(body) = &function.body else {
            push_indented_line(&mut out, indent, &format!("{};", header));
            return out;
        };

        if self.options.include_usage {
            for (index, binding) in body.locals.iter().enumerate() {
                push_indented_line(
                    &mut out,
                    indent,
                    &format!("// {}", render_binding(BindingId(index as u32), binding)),
                );
            }
        }

        let rendered_body = self.render_expr(&body.root, locals, indent);
        push_indented_line(&mut out, indent, &format!("{} {}", header, rendered_body));
        out
    }

    pub fn render_expr(&self, expr: &Expr, locals: &[Binding], indent: usize) -> String {
        let rendered = self.render_expr_kind(expr, locals, indent);

        if self.options.include_types && !matches!(expr.kind, ExprKind::Block { .. }) {
            format!("({}: {})", rendered, expr.ty)
        } else {
            rendered
        }
    }

    fn render_expr_kind(&self, expr: &Expr, locals: &[Binding], indent: usize) -> String {
        let render = |child: &Expr| self.render_expr(child, locals, indent);
        let render_list = |children: &[Expr]| {
            children
                .iter()
                .map(|child| self.render_expr(child, locals, indent))
                .collect::<Vec<_>>()
                .join(", ")
        };

        match &expr.kind {
            ExprKind::Block { statements, tail } => {
                let mut out = String::from("{\n");
                for statement in statements {
                    let line = format!("{};", self.render_expr(statement, locals, indent + INDENT));
                    push_indented_line(&mut out, indent + INDENT, &line);
                }
                if let Some(tail) = tail {
                    let line = self.render_expr(tail, locals, indent + INDENT);
                    push_indented_line(&mut out, indent + INDENT, &line);
                }
                out.push_str(&" ".repeat(indent));
                out.push('}');
                out
            }

            ExprKind::Let { pattern, value } => match value {
                Some(value) => format!("let {} = {}", self.render_pattern(pattern, locals), render(value)),
                None => format!("let {}", self.render_pattern(pattern, locals)),
            },

            ExprKind::Return(value) => match value {
                Some(value) => format!("return {}", render(value)),
                None => "return".to_owned(),
            },

            ExprKind::Loop { body } => format!("loop {}", render(body)),

            ExprKind::Break(value) => match value {
                Some(value) => format!("break {}", render(value)),
                None => "break".to_owned(),
            },

            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut out = format!("if {} {}", render(condition), render(then_branch));
                if let Some(else_branch) = else_branch {
                    let _ = write!(out, " else {}", render(else_branch));
                }
                out
            }

            ExprKind::Match { scrutinee, arms } => {
                let mut out = format!("match {} {{\n", render(scrutinee));
                for arm in arms {
                    let guard = match &arm.guard {
                        Some(guard) => format!(" if {}", render(guard)),
                        None => String::new(),
                    };
                    let line = format!(
                        "{}{} => {},",
                        self.render_pattern(&arm.pattern, locals),
                        guard,
                        self.render_expr(&arm.body, locals, indent + INDENT)
                    );
                    push_indented_line(&mut out, indent + INDENT, &line);
                }
                out.push_str(&" ".repeat(indent));
                out.push('}');
                out
            }

            ExprKind::Assign {
                op,
                target,
                value,
                resolution,
            } => {
                let op = match op {
                    Some(op) => format!("{}=", binop_symbol(*op)),
                    None => "=".to_owned(),
                };
                format!(
                    "{} {} {}{}",
                    render(target),
                    op,
                    render(value),
                    self.resolution_note(resolution.as_ref())
                )
            }

            ExprKind::BinOp {
                op,
                left,
                right,
                resolution,
            } => format!(
                "({} {} {}){}",
                render(left),
                binop_symbol(*op),
                render(right),
                self.resolution_note(resolution.as_ref())
            ),

            ExprKind::UniOp {
                op,
                operand,
                resolution,
            } => {
                let symbol = match op {
                    HirUniOp::Neg => "-",
                    HirUniOp::Not => "!",
                };
                format!("{}{}{}", symbol, render(operand), self.resolution_note(resolution.as_ref()))
            }

            ExprKind::Borrow { kind, value } => format!("{}{}", borrow_prefix(*kind), render(value)),

            ExprKind::Deref { value, resolution } => {
                format!("(*{}){}", render(value), self.resolution_note(resolution.as_ref()))
            }

            ExprKind::Index {
                value,
                index,
                resolution,
            } => format!(
                "{}[{}]{}",
                render(value),
                render(index),
                self.resolution_note(resolution.as_ref())
            ),

            ExprKind::Field { value, field } => format!("{}.{}", render(value), field),

            ExprKind::Literal(literal) => render_literal(literal),

            ExprKind::Local(local) => {
                let name = local_label(locals, local.binding);
                if self.options.include_usage && local.usage != Usage::Unused {
                    format!("{}@{}{}", name, local.seq, usage_suffix(local.usage))
                } else {
                    name
                }
            }

            ExprKind::ItemPath(path) => path.to_string(),

            ExprKind::CallPath { path, args } => {
                format!("{}({})", render_call_path(path), render_list(args))
            }

            ExprKind::CallValue {
                callee,
                args,
                resolution,
            } => format!(
                "{}({}){}",
                render(callee),
                render_list(args),
                self.resolution_note(resolution.as_ref())
            ),

            ExprKind::CallMethod {
                receiver,
                method,
                args,
                resolution,
            } => format!(
                "{}.{}({}){}",
                render(receiver),
                method,
                render_list(args),
                self.resolution_note(resolution.as_ref())
            ),

            ExprKind::Closure {
                id,
                args,
                ret,
                body,
                is_move,
            } => {
                let args = args
                    .iter()
                    .map(|arg| format!("{}: {}", self.render_pattern(&arg.pattern, locals), arg.ty))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "/* {} */ {}|{}| -> {} {}",
                    id,
                    if *is_move { "move " } else { "" },
                    args,
                    ret,
                    render(body)
                )
            }

            ExprKind::StructLiteral { path, fields } => {
                let fields = fields
                    .iter()
                    .map(|(name, value)| format!("{}: {}", name, render(value)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} {{ {} }}", path, fields)
            }

            ExprKind::Tuple(elements) => match elements.len() {
                1 => format!("({},)", render_list(elements)),
                _ => format!("({})", render_list(elements)),
            },

            ExprKind::Unsize { value, vtables } => {
                let vtables = vtables
                    .iter()
                    .map(|id| format!("vtable#{}", id.0))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({} as {} /* {} */)", render(value), expr.ty, vtables)
            }
        }
    }

    pub fn render_pattern(&self, pattern: &Pattern, locals: &[Binding]) -> String {
        match &pattern.kind {
            PatternKind::Any => "_".to_owned(),

            PatternKind::Binding { binding, mode, sub } => {
                let prefix = match mode {
                    PatternBindingMode::Move => "",
                    PatternBindingMode::Ref => "ref ",
                    PatternBindingMode::MutRef => "ref mut ",
                };
                let mutability = match locals.get(binding.0 as usize) {
                    Some(local) if local.mutable && *mode == PatternBindingMode::Move => "mut ",
                    _ => "",
                };
                let name = local_label(locals, *binding);
                match sub {
                    Some(sub) => format!(
                        "{}{}{} @ {}",
                        prefix,
                        mutability,
                        name,
                        self.render_pattern(sub, locals)
                    ),
                    None => format!("{}{}{}", prefix, mutability, name),
                }
            }

            PatternKind::Tuple(elements) => {
                let elements = elements
                    .iter()
                    .map(|element| self.render_pattern(element, locals))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({})", elements)
            }

            PatternKind::Struct { path, fields } => {
                let fields = fields
                    .iter()
                    .map(|(name, field)| format!("{}: {}", name, self.render_pattern(field, locals)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} {{ {} }}", path, fields)
            }

            PatternKind::Literal(literal) => render_literal(literal),
        }
    }

    pub fn render_vtable(&self, vtable: &VTable) -> String {
        let methods = vtable
            .methods
            .iter()
            .map(|entry| format!("{} => {}", entry.name, render_impl_source(entry.source)))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "<{} as {}> {{ {} }}",
            vtable.concrete, vtable.trait_path, methods
        )
    }

    fn resolution_note(&self, resolution: Option<&MethodResolution>) -> String {
        let Some(resolution) = resolution else {
            return String::new();
        };
        if !self.options.include_resolutions {
            return String::new();
        }

        let mut note = match &resolution.trait_path {
            Some(trait_path) => format!(
                " /* <{} as {}> via {}",
                resolution.self_ty,
                trait_path,
                render_impl_source(resolution.source)
            ),
            None => format!(
                " /* <{}> via {}",
                resolution.self_ty,
                render_impl_source(resolution.source)
            ),
        };

        if !resolution.adjust.derefs.is_empty() || resolution.adjust.autoref.is_some() {
            let derefs = resolution
                .adjust
                .derefs
                .iter()
                .map(|step| match step {
                    DerefStep::Builtin => "*".to_owned(),
                    DerefStep::Overloaded { target, .. } => format!("deref->{}", target),
                })
                .collect::<Vec<_>>()
                .join(" ");
            let _ = write!(note, ", adjust [{}]", derefs);
            if let Some(kind) = resolution.adjust.autoref {
                let _ = write!(note, " then {}", borrow_prefix(kind).trim_end());
            }
        }

        note.push_str(" */");
        note
    }
}

impl Default for HirDisplayContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Labels
// ============================================================================

fn render_type(ty: &HirType, depth: usize) -> String {
    if depth >= MAX_TYPE_RENDER_DEPTH {
        return "..".to_owned();
    }

    let join = |types: &[HirType]| {
        types
            .iter()
            .map(|inner| render_type(inner, depth + 1))
            .collect::<Vec<_>>()
            .join(", ")
    };

    match ty {
        HirType::Infer => "_".to_owned(),
        HirType::Primitive(core) => core_type_label(*core).to_owned(),
        HirType::Diverge => "!".to_owned(),

        HirType::Tuple(fields) => match fields.len() {
            1 => format!("({},)", join(fields)),
            _ => format!("({})", join(fields)),
        },

        HirType::Path(path) => render_generic_path(path, depth),
        HirType::Generic { name, .. } => name.to_owned(),

        HirType::Borrow { kind, inner } => {
            format!("{}{}", borrow_prefix(*kind), render_type(inner, depth + 1))
        }

        HirType::Function { args, ret } => {
            format!("fn({}) -> {}", join(args), render_type(ret, depth + 1))
        }

        HirType::Closure { id, args, ret } => {
            format!("{{{}: ({}) -> {}}}", id, join(args), render_type(ret, depth + 1))
        }

        HirType::ErasedType {
            origin,
            index,
            bounds,
            resolved,
        } => {
            let bounds = bounds
                .iter()
                .map(|bound| render_generic_path(bound, depth + 1))
                .collect::<Vec<_>>()
                .join(" + ");
            let mut out = format!("impl {} /* {}#{}", bounds, render_generic_path(origin, depth + 1), index);
            if let Some(resolved) = resolved {
                let _ = write!(out, " = {}", render_type(resolved, depth + 1));
            }
            out.push_str(" */");
            out
        }

        HirType::TraitObject { traits } => {
            let traits = traits
                .iter()
                .map(|bound| render_generic_path(bound, depth + 1))
                .collect::<Vec<_>>()
                .join(" + ");
            format!("dyn {}", traits)
        }
    }
}

fn render_generic_path(path: &GenericPath, depth: usize) -> String {
    if path.params.is_empty() {
        return path.path.to_string();
    }

    let params = path
        .params
        .iter()
        .map(|param| render_type(param, depth + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}<{}>", path.path, params)
}

fn render_generic_params(params: &[GenericParam]) -> String {
    if params.is_empty() {
        return String::new();
    }

    let params = params
        .iter()
        .map(|param| {
            if param.bounds.is_empty() {
                return param.name.to_owned();
            }
            let bounds = param
                .bounds
                .iter()
                .map(|bound| bound.to_string())
                .collect::<Vec<_>>()
                .join(" + ");
            format!("{}: {}", param.name, bounds)
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("<{}>", params)
}

fn render_call_path(path: &CallPath) -> String {
    let turbofish = |params: &[HirType]| {
        if params.is_empty() {
            return String::new();
        }
        let params = params
            .iter()
            .map(|param| param.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!("::<{}>", params)
    };

    match path {
        CallPath::Function(path) => render_generic_path(path, 0),
        CallPath::UfcsKnown {
            self_ty,
            trait_path,
            method,
            params,
        } => format!("<{} as {}>::{}{}", self_ty, trait_path, method, turbofish(params)),
        CallPath::UfcsInherent {
            self_ty,
            method,
            params,
        } => format!("<{}>::{}{}", self_ty, method, turbofish(params)),
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Integer(value) => value.to_string(),
        Literal::Float(value) => format!("{:?}", value),
        Literal::Bool(value) => value.to_string(),
        Literal::Char(value) => format!("{:?}", value),
        Literal::String(value) => format!("{:?}", value),
    }
}

fn render_binding(id: BindingId, binding: &Binding) -> String {
    let mut out = format!("{} {}: {} [{:?}", id, binding.name, binding.ty, binding.usage);
    if binding.moved {
        out.push_str(", moved");
    }
    if let Some(last_use) = binding.last_use {
        let _ = write!(out, ", last use @{}", last_use);
    }
    out.push(']');
    out
}

fn render_impl_source(source: ImplSource) -> String {
    match source {
        ImplSource::Impl(item) => item.to_string(),
        ImplSource::Bound => "bound".to_owned(),
        ImplSource::Builtin => "builtin".to_owned(),
    }
}

fn render_text_location(location: &TextLocation) -> String {
    format!(
        "{}:{}:{}-{}:{}",
        location.scope.to_string_lossy(),
        location.start_pos.line_number,
        location.start_pos.char_column,
        location.end_pos.line_number,
        location.end_pos.char_column
    )
}

fn receiver_label(receiver: FunctionReceiver, ty: &HirType) -> String {
    match receiver {
        FunctionReceiver::Borrow => "&self".to_owned(),
        FunctionReceiver::BorrowMut => "&mut self".to_owned(),
        FunctionReceiver::Value | FunctionReceiver::Free => "self".to_owned(),
        FunctionReceiver::Box => format!("self: {}", ty),
    }
}

fn local_label(locals: &[Binding], id: BindingId) -> String {
    match locals.get(id.0 as usize) {
        Some(binding) if !binding.name.is_empty() => binding.name.to_owned(),
        _ => id.to_string(),
    }
}

fn usage_suffix(usage: Usage) -> &'static str {
    match usage {
        Usage::Unused => "",
        Usage::ByValue => ":v",
        Usage::Shared => ":s",
        Usage::Mutable => ":m",
    }
}

fn borrow_prefix(kind: BorrowKind) -> &'static str {
    match kind {
        BorrowKind::Shared => "&",
        BorrowKind::Unique => "&mut ",
    }
}

fn binop_symbol(op: HirBinOp) -> &'static str {
    match op {
        HirBinOp::Add => "+",
        HirBinOp::Sub => "-",
        HirBinOp::Mul => "*",
        HirBinOp::Div => "/",
        HirBinOp::Rem => "%",
        HirBinOp::BitAnd => "&",
        HirBinOp::BitOr => "|",
        HirBinOp::BitXor => "^",
        HirBinOp::Shl => "<<",
        HirBinOp::Shr => ">>",
        HirBinOp::Eq => "==",
        HirBinOp::Ne => "!=",
        HirBinOp::Lt => "<",
        HirBinOp::Le => "<=",
        HirBinOp::Gt => ">",
        HirBinOp::Ge => ">=",
        HirBinOp::And => "&&",
        HirBinOp::Or => "||",
    }
}

fn core_type_label(core: CoreType) -> &'static str {
    match core {
        CoreType::Bool => "bool",
        CoreType::Char => "char",
        CoreType::Str => "str",
        CoreType::U8 => "u8",
        CoreType::U32 => "u32",
        CoreType::U64 => "u64",
        CoreType::Usize => "usize",
        CoreType::I32 => "i32",
        CoreType::I64 => "i64",
        CoreType::Isize => "isize",
        CoreType::F32 => "f32",
        CoreType::F64 => "f64",
    }
}

fn push_indented_line(out: &mut String, indent: usize, line: &str) {
    for _ in 0..indent {
        out.push(' ');
    }
    out.push_str(line);
    out.push('\n');
}

// ============================================================================
// Convenience Display Hooks
// ============================================================================

pub fn display_crate(krate: &Crate) -> String {
    HirDisplayContext::new().render_crate(krate)
}

impl Display for HirType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", render_type(self, 0))
    }
}

impl Display for GenericPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", render_generic_path(self, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::hir_builder::{
        BodyBuilder, binop, block, function, function_item, i32_ty, int, location, path_ty,
    };
    use crate::hir::hir_datatypes::SimplePath;

    #[test]
    fn types_render_like_rust() {
        let ty = HirType::borrow(
            BorrowKind::Unique,
            HirType::boxed(HirType::TraitObject {
                traits: vec![GenericPath::lang("demo::Shape", Vec::new())],
            }),
        );

        assert_eq!(ty.to_string(), "&mut alloc::boxed::Box<dyn demo::Shape>");
        assert_eq!(HirType::unit().to_string(), "()");
        assert_eq!(
            HirType::Tuple(vec![i32_ty()]).to_string(),
            "(i32,)"
        );
    }

    #[test]
    fn function_renders_locals_and_operators() {
        let mut body = BodyBuilder::new();
        let (x, declare) = body.let_binding("x", false, int(1, 2), 2);
        let sum = binop(HirBinOp::Add, body.local(x, 3), int(2, 3), None, 3);
        let root = block(vec![declare], Some(sum), 1);

        let mut krate = Crate::new("demo");
        krate.push_item(function_item(
            "demo::main",
            function(Vec::new(), i32_ty(), body.finish(root)),
            1,
        ));

        let rendered = display_crate(&krate);
        assert!(rendered.contains("fn demo::main() -> i32 {"));
        assert!(rendered.contains("let x = 1;"));
        assert!(rendered.contains("(x + 2)"));
    }

    #[test]
    fn struct_items_list_their_fields() {
        let mut krate = Crate::new("demo");
        krate.push_item(Item {
            path: SimplePath::new("demo::Point"),
            location: location(1),
            kind: ItemKind::Struct(crate::hir::hir_nodes::Struct {
                generics: Vec::new(),
                fields: vec![crate::hir::hir_nodes::StructField {
                    name: "x".to_owned(),
                    ty: path_ty("demo::Meters", Vec::new()),
                }],
            }),
        });

        let rendered = display_crate(&krate);
        assert!(rendered.contains("struct demo::Point {"));
        assert!(rendered.contains("x: demo::Meters,"));
    }
}

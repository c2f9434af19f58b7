//! Top-level declarations: `handle : decl_type(arg, ...) { body }
//! @note(args) { body } ...` (spec.md §6).

use crate::expr::ExprAst;
use crate::location::SourceLocation;
use crate::units::UnitAst;

/// The classified kind of a declared (or forward-referenced) entity
/// (spec.md §3 "Entities").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Compartment,
    Quantity,
    Property,
    Parameter,
    ParameterGroup,
    Unit,
    Function,
    Constant,
    IndexSet,
    Connection,
    Solver,
    ModuleTemplate,
    ModuleInstance,
    Library,
    DiscreteOrder,
    Flux,
    LocationAlias,
    ExternalComputation,
}

/// One positional or keyword-style argument to a declaration's
/// `decl_type(...)` argument list. Declarations are heterogeneous enough
/// (a `flux` takes two locations and a unit and a name; a `var` takes a
/// location and a unit and a value) that a single flat enum is simpler than
/// one struct per decl type, mirroring how `ExprAst` keeps expression kinds
/// in one tagged variant (see DESIGN.md, "dynamic dispatch over expression
/// kinds").
#[derive(Debug, Clone, PartialEq)]
pub enum DeclArg {
    /// A dotted location chain, e.g. `a.x`, `out`, with optional restriction.
    Location(ExprAst),
    Unit(UnitAst),
    Expr(ExprAst),
    Ident(String),
    StringLit(String),
}

/// An `@note(args) { body }` attached to a declaration, e.g. `@initial_conc`,
/// `@override_conc`, `@no_carry`, `@no_cycles`.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteDecl {
    pub name: String,
    pub args: Vec<DeclArg>,
    pub body: Option<ExprAst>,
    pub location: SourceLocation,
}

/// A single `handle : decl_type(args) { body } @note... ` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub kind: EntityKind,
    pub handle: Option<String>,
    pub serial_name: Option<String>,
    pub args: Vec<DeclArg>,
    pub body: Option<ExprAst>,
    pub notes: Vec<NoteDecl>,
    pub location: SourceLocation,
    /// False for an entity referenced (e.g. by a `has` list) before its own
    /// declaration is seen; used by C2 to distinguish forward references.
    pub declared: bool,
}

impl Decl {
    pub fn note(&self, name: &str) -> Option<&NoteDecl> {
        self.notes.iter().find(|n| n.name == name)
    }

    pub fn has_note(&self, name: &str) -> bool {
        self.note(name).is_some()
    }
}

/// A library or module body: a flat list of declarations plus import
/// statements, composed before any expression is resolved (spec.md §3
/// invariants: "composition of a module instance fully populates its scope
/// before any expression is resolved").
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub name: String,
    pub imports: Vec<ImportDecl>,
    pub decls: Vec<Decl>,
}

/// `import "path/to/lib" as handle` (allow_parameters toggles whether
/// parameter entities are importable, spec.md §4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub path: String,
    pub alias: Option<String>,
    pub allow_parameters: bool,
    pub location: SourceLocation,
}

/// The full parsed program: one top-level model module plus every library
/// it (transitively) loaded. Construction of this value is the external
/// loader/parser's job (spec.md §1); the compiler only ever reads it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub model: Module,
    pub libraries: Vec<Module>,
}

//! Module naming, resolution and dependency sets.
//!
//! ```text
//! entry name + declared lists
//!     │
//!     └── DependencySetBuilder ──► ModuleResolver ──► ModuleReference (per name)
//!                 │
//!                 └── [runtime] + system... + application...
//! ```

mod dependency;
mod name;
mod resolver;

pub use dependency::{DEFAULT_RUNTIME_MODULE, DependencySet, DependencySetBuilder};
pub use name::ModuleName;
pub use resolver::{
    Category, Extensions, FilePair, ModuleReference, ModuleResolver, NamespaceLayout,
    NamespaceTable,
};

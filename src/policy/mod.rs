//! Policy: layered kubectl permissions and the checks built on them.

pub mod checker;
pub mod guard;
pub mod merger;
pub mod namespaces;

pub use checker::{CheckedCommand, Checker};
pub use guard::{CatalogGuard, CommandGuard, GuardError, Resource};
pub use merger::{EffectivePolicy, merge, merge_fragments};
pub use namespaces::Namespaces;

//! Query compilation for the annotation repository
//!
//! A structured (JSON) query arrives as one object; each top-level key is
//! either a field path with a value or operator map, or a reserved
//! `:`-prefixed function. The compiler translates it once into an ordered
//! list of backing-store pipeline stages; pagination appends skip/limit to
//! the compiled list without recompiling.
//!
//! Also home to custom queries: named, parameterized query templates whose
//! `<placeholder>` occurrences are interpolated from an encoded call string
//! before compilation.

pub mod compiler;
pub mod custom;
pub mod stage;

pub use compiler::{QueryCompiler, RangeParameters, CONTENT_ROOT_PREFIX};
pub use custom::{CustomQuery, CustomQueryCall};
pub use stage::{Filter, Stage};

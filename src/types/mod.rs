//! TL-Pack value types.

mod value;

pub use value::{TlCustom, TlMap, TlValue};

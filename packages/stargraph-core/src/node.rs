//! Node identifiers
//!
//! The total order on identifiers is load-bearing: it defines "minimum" and
//! therefore every component's representative.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Totally ordered scalar usable as a graph node
pub trait NodeId: Copy + Ord + Hash + Debug + Display + Send + Sync + 'static {
    /// Decode one whitespace-free token of an input record
    fn parse_token(token: &str) -> Option<Self>;
}

macro_rules! impl_unsigned_node_id {
    ($($ty:ty),*) => {
        $(
            impl NodeId for $ty {
                fn parse_token(token: &str) -> Option<Self> {
                    // `str::parse` would also take a leading '+'
                    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
                        return None;
                    }
                    token.parse().ok()
                }
            }
        )*
    };
}

impl_unsigned_node_id!(u32, u64, usize);

//! Utility macros for the pipeline crate.

/// Implements identity-based equality and hashing for a node type.
///
/// Two nodes are equal exactly when their ids are equal, regardless of
/// content. Set membership inside a processing model relies on this.
///
/// # Example
///
/// ```ignore
/// node_identity!(ExternalSource);
/// ```
#[macro_export]
macro_rules! node_identity {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl PartialEq for $ty {
                fn eq(&self, other: &Self) -> bool {
                    $crate::node::Node::id(self) == $crate::node::Node::id(other)
                }
            }

            impl Eq for $ty {}

            impl std::hash::Hash for $ty {
                fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                    $crate::node::Node::id(self).hash(state);
                }
            }
        )+
    };
}

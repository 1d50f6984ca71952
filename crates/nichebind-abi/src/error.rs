use thiserror::Error;

/// A descriptor that cannot be decoded into a consistent decoding plan.
///
/// Raised once per export while bindings are synthesized, never per call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// `array_kind` byte outside `0..=10`.
    #[error("unknown array kind index {0}")]
    UnknownArrayKind(u8),

    /// `transform` byte outside the transform table.
    #[error("unknown transform index {0}")]
    UnknownTransform(u8),

    /// `is_array` and `is_dynamic` are both set.
    #[error("descriptor declares both an array and a dynamic payload")]
    ConflictingShape,

    /// An array payload without an element kind.
    #[error("array payload has no element kind")]
    MissingElementKind,

    /// The transform cannot be applied to the payload shape.
    #[error("transform {transform:?} cannot shape a {shape} payload")]
    TransformShapeMismatch {
        transform: crate::Transform,
        shape: crate::Shape,
    },
}

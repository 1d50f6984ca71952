//! Construction-time options for wrapping a module.

use serde::{Deserialize, Serialize};

/// Options applied to every export of one wrapping operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapOptions {
    /// Copy array payloads (and packed scalars) out of linear memory before
    /// returning them, so results stay valid after the module reuses or
    /// grows its memory.
    #[serde(alias = "alwaysCopyData")]
    pub always_copy_data: bool,
}

impl WrapOptions {
    pub fn always_copy() -> Self {
        Self {
            always_copy_data: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zero_copy() {
        assert!(!WrapOptions::default().always_copy_data);
    }

    #[test]
    fn test_deserialize_accepts_camel_case() {
        let opts: WrapOptions = serde_json::from_str(r#"{"alwaysCopyData": true}"#).unwrap();
        assert_eq!(opts, WrapOptions::always_copy());
        let opts: WrapOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, WrapOptions::default());
    }
}

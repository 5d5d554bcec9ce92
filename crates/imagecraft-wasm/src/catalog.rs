//! Operation catalog WASM bindings.
//!
//! Hosts describe an edit as a kind name plus a loose parameter object, for
//! example `("sepia", { intensity: 0.6 })`. These helpers validate that
//! description and return the canonical operation object the pipeline
//! accepts in `set_operations`.

use imagecraft_core::{validate, EngineError, Operation, OperationKind, OperationParams};
use wasm_bindgen::prelude::*;

/// Parse a kind name and parameter bag into a validated operation.
pub fn parse_operation(kind: &str, params: &OperationParams) -> Result<Operation, EngineError> {
    validate(kind.parse::<OperationKind>()?, params)
}

/// Read an optional parameter object. `undefined` and `null` mean "all defaults".
pub(crate) fn params_from_js(params: JsValue) -> Result<OperationParams, JsValue> {
    if params.is_undefined() || params.is_null() {
        return Ok(OperationParams::default());
    }
    serde_wasm_bindgen::from_value(params).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Validate an operation and return its canonical form.
///
/// # Errors
///
/// Returns an error naming the offending field when the kind is unknown or a
/// parameter is out of range.
#[wasm_bindgen]
pub fn validate_operation(kind: &str, params: JsValue) -> Result<JsValue, JsValue> {
    let op = parse_operation(kind, &params_from_js(params)?).map_err(crate::js_error)?;
    serde_wasm_bindgen::to_value(&op).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Names of every supported operation kind, in menu order.
#[wasm_bindgen]
pub fn operation_kinds() -> js_sys::Array {
    OperationKind::ALL
        .into_iter()
        .map(|kind| JsValue::from_str(kind.name()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagecraft_core::{Adjustment, Filter, OperationSpec};

    #[test]
    fn test_parse_known_kind() {
        let params = OperationParams {
            intensity: Some(0.5),
            ..Default::default()
        };
        let op = parse_operation("sepia", &params).unwrap();
        assert_eq!(op.spec(), &OperationSpec::Filter(Filter::Sepia { intensity: 0.5 }));
    }

    #[test]
    fn test_parse_uses_defaults() {
        let op = parse_operation("contrast", &OperationParams::default()).unwrap();
        assert_eq!(op.spec(), &OperationSpec::Adjustment(Adjustment::Contrast(1.0)));
    }

    #[test]
    fn test_parse_unknown_kind() {
        let err = parse_operation("posterize", &OperationParams::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { field: "kind", .. }));
    }

    #[test]
    fn test_parse_out_of_range() {
        let mut params = OperationParams::default();
        params.value = Some(5.0);
        let err = parse_operation("brightness", &params).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { field: "value", .. }));
    }

    #[test]
    fn test_parse_transform_requires_params() {
        assert!(parse_operation("rotate", &OperationParams::default()).is_err());
    }
}

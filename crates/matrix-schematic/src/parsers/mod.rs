pub mod config;
pub mod kicad_sexpr;
pub mod points;

use serde_yaml::Value;

/// Render a YAML scalar as a string. ergogen happily emits bare numbers
/// for names, so `1` and `"1"` are treated alike.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_string() {
        assert_eq!(scalar_string(&Value::from("col0")), Some("col0".into()));
        assert_eq!(scalar_string(&Value::from(3)), Some("3".into()));
        assert_eq!(scalar_string(&Value::from(true)), Some("true".into()));
        assert_eq!(scalar_string(&Value::Null), None);
    }
}

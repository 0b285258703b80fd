/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// Objects become `Struct` values with their members in the order written. Any other
/// expression is converted through [`to_value`](crate::to_value), falling back to
/// `Null` when it cannot be projected.
///
/// # Examples
///
/// ```rust
/// use serde_wddx::{wddx, Value};
///
/// let value = wddx!({
///     "name": "Alice",
///     "age": 30,
///     "tags": ["admin", "ops"],
///     "manager": null
/// });
///
/// if let Value::Struct(members) = value {
///     assert_eq!(members.get("age"), Some(&Value::Int32(30)));
/// }
/// ```
#[macro_export]
macro_rules! wddx {
    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::Array(vec![])
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![$($crate::wddx!($elem)),*])
    };

    ({}) => {
        $crate::Value::Struct($crate::WddxMap::new())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut members = $crate::WddxMap::new();
        $(
            members.insert($key.to_string(), $crate::wddx!($value));
        )*
        $crate::Value::Struct(members)
    }};

    ($s:expr) => {{
        $crate::to_value(&$s).unwrap_or($crate::Value::Null)
    }};
}

#[cfg(test)]
mod tests {
    use crate::{Value, WddxMap};

    #[test]
    fn test_wddx_macro_primitives() {
        assert_eq!(wddx!(null), Value::Null);
        assert_eq!(wddx!(true), Value::Bool(true));
        assert_eq!(wddx!(false), Value::Bool(false));
        assert_eq!(wddx!(42), Value::Int32(42));
        assert_eq!(wddx!(3.5), Value::Float64(3.5));
        assert_eq!(wddx!("hello"), Value::Text("hello".to_string()));
    }

    #[test]
    fn test_wddx_macro_arrays() {
        assert_eq!(wddx!([]), Value::Array(vec![]));
        assert_eq!(
            wddx!([1, "two", null]),
            Value::Array(vec![
                Value::Int32(1),
                Value::Text("two".to_string()),
                Value::Null
            ])
        );
    }

    #[test]
    fn test_wddx_macro_structs() {
        assert_eq!(wddx!({}), Value::Struct(WddxMap::new()));

        let value = wddx!({
            "name": "Alice",
            "age": 30
        });
        match value {
            Value::Struct(members) => {
                let keys: Vec<&String> = members.keys().collect();
                assert_eq!(keys, ["name", "age"]);
                assert_eq!(members.get("age"), Some(&Value::Int32(30)));
            }
            _ => panic!("Expected struct"),
        }
    }

    #[test]
    fn test_wddx_macro_expressions() {
        let big = 5_000_000_000i64;
        assert_eq!(wddx!(big), Value::Int64(big));
    }
}

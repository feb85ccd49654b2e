use indexmap::IndexMap;

use super::scalar::{Element, Scalar};

/// Value of one field in one row: one scalar per component.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    components: Vec<Scalar>,
}

impl Value {
    pub fn from_scalars(components: Vec<Scalar>) -> Self {
        Self { components }
    }

    pub fn scalar(s: impl Into<Scalar>) -> Self {
        Self {
            components: vec![s.into()],
        }
    }

    #[inline]
    pub fn components(&self) -> &[Scalar] {
        &self.components
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// First component converted to `T`, if any.
    pub fn get<T: Element>(&self) -> Option<T> {
        self.components.first().map(|s| T::from_scalar(*s))
    }

    /// All components converted to `T`.
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        self.components.iter().map(|s| T::from_scalar(*s)).collect()
    }
}

macro_rules! value_from {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            #[inline]
            fn from(v: $t) -> Self {
                Value::scalar(v)
            }
        }

        impl<const N: usize> From<[$t; N]> for Value {
            fn from(v: [$t; N]) -> Self {
                Value::from_scalars(v.into_iter().map(Scalar::from).collect())
            }
        }
    )*};
}

value_from!(i8, u8, i16, u16, i32, u32, f32);

impl From<Scalar> for Value {
    #[inline]
    fn from(s: Scalar) -> Self {
        Value::scalar(s)
    }
}

/// A record of field values keyed by field name.
///
/// Rows read back from a buffer list fields in schema order. Fields that the
/// schema does not declare are ignored on write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            values: IndexMap::with_capacity(n),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_from_array_keeps_component_order() {
        let v = Value::from([1.0f32, 2.0, 3.0]);
        assert_eq!(v.len(), 3);
        assert_eq!(v.to_vec::<f32>(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn value_get_converts() {
        let v = Value::from(7u8);
        assert_eq!(v.get::<f32>(), Some(7.0));
        assert_eq!(v.get::<i32>(), Some(7));
    }

    #[test]
    fn row_insert_replaces() {
        let mut row = Row::new().with("dx", 1.0f32);
        let prev = row.insert("dx", 2.0f32);
        assert_eq!(prev, Some(Value::from(1.0f32)));
        assert_eq!(row.get("dx"), Some(&Value::from(2.0f32)));
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn row_from_iter_preserves_insertion_order() {
        let row: Row = [("b", 1u32), ("a", 2u32)].into_iter().collect();
        let names: Vec<_> = row.names().collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}

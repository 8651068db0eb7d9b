use serde::{Deserialize, Serialize};

/// A JSON-LD value that may be given either as a single item or as an array.
///
/// An array is always deserialized as [`OneOrMany::Many`], even when it holds a
/// single element, so callers can tell `"proof": {..}` from `"proof": [{..}]`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn any<F>(&self, f: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        self.iter().any(f)
    }

    pub fn contains(&self, x: &T) -> bool
    where
        T: PartialEq<T>,
    {
        self.any(|value| value == x)
    }

    pub fn first(&self) -> Option<&T> {
        self.iter().next()
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Self::One(value) => std::slice::from_ref(value).iter(),
            Self::Many(values) => values.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        match self {
            Self::One(value) => std::slice::from_mut(value).iter_mut(),
            Self::Many(values) => values.iter_mut(),
        }
    }

    /// Append a value, turning a single value into an array.
    pub fn push(&mut self, value: T) {
        let values = match std::mem::replace(self, Self::Many(Vec::new())) {
            Self::One(first) => vec![first, value],
            Self::Many(mut values) => {
                values.push(value);
                values
            }
        };
        *self = Self::Many(values);
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values)
    }
}

impl<T> IntoIterator for OneOrMany<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            Self::One(value) => vec![value].into_iter(),
            Self::Many(values) => values.into_iter(),
        }
    }
}

impl<'a, T> IntoIterator for &'a OneOrMany<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_element_array_is_many() {
        let value: OneOrMany<u32> = serde_json::from_str("[1]").unwrap();
        assert!(value.is_many());
        let value: OneOrMany<u32> = serde_json::from_str("1").unwrap();
        assert!(!value.is_many());
    }

    #[test]
    fn push_promotes_to_array() {
        let mut value = OneOrMany::One("a".to_string());
        value.push("b".to_string());
        assert_eq!(value, OneOrMany::Many(vec!["a".to_string(), "b".to_string()]));
        assert!(value.contains(&"b".to_string()));
        assert_eq!(value.first().map(String::as_str), Some("a"));
    }
}

//! Ordered form-parameter map for gateway requests

/// Flat form body. Field order is preserved on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    fields: Vec<(String, String)>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field.
    pub fn field(mut self, name: &str, value: impl ToString) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    /// Append a field only when `value` is present and non-empty.
    ///
    /// The gateway treats an empty optional field differently from an
    /// absent one, so blank values are never sent.
    pub fn optional(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => self.field(name, v),
            _ => self,
        }
    }

    /// Replace the value of `name`, appending it if absent.
    pub fn set(&mut self, name: &str, value: impl ToString) {
        let value = value.to_string();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(field) => field.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

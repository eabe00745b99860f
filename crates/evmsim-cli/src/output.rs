//! Output formatting

use serde_json::{Map, Value};

/// Result printer: JSON object or a human-readable message
pub struct Output {
    json_mode: bool,
    fields: Map<String, Value>,
    message: Option<String>,
}

impl Output {
    /// Create a new output builder
    pub fn new(json_mode: bool) -> Self {
        Self {
            json_mode,
            fields: Map::new(),
            message: None,
        }
    }

    /// Add a string field
    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a u64 field
    pub fn field_u64(mut self, key: &str, value: u64) -> Self {
        self.fields.insert(key.to_string(), Value::Number(value.into()));
        self
    }

    /// Add a u128 field (stored as string to avoid overflow)
    pub fn field_u128(mut self, key: &str, value: u128) -> Self {
        self.fields.insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a boolean field
    pub fn field_bool(mut self, key: &str, value: bool) -> Self {
        self.fields.insert(key.to_string(), Value::Bool(value));
        self
    }

    /// Add a JSON value field
    pub fn field_value(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Set the human-readable message
    pub fn message(mut self, msg: &str) -> Self {
        self.message = Some(msg.to_string());
        self
    }

    /// Rendered text, `None` when there is nothing to print
    pub fn render(&self) -> Option<String> {
        if self.json_mode {
            serde_json::to_string_pretty(&self.fields).ok()
        } else {
            self.message.clone()
        }
    }

    /// Print the output
    pub fn print(self) {
        if let Some(text) = self.render() {
            println!("{}", text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_mode_prints_message() {
        let output = Output::new(false).field("address", "0x01").message("Created");
        assert_eq!(output.render().as_deref(), Some("Created"));
    }

    #[test]
    fn test_json_mode_prints_fields() {
        let output = Output::new(true)
            .field("address", "0x01")
            .field_u128("balance", u128::MAX)
            .field_bool("success", true)
            .message("ignored");
        let value: Value = serde_json::from_str(&output.render().unwrap()).unwrap();
        assert_eq!(value["address"], "0x01");
        assert_eq!(value["balance"], u128::MAX.to_string());
        assert_eq!(value["success"], true);
    }
}

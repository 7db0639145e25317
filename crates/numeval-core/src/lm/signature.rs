//! Typed input/output contracts for model calls.
//!
//! A [`Signature`] names a task, carries its instructions, and declares the
//! fields the caller supplies and the fields the model must return. Values
//! travel as a JSON object ([`FieldValues`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{LmError, SchemaStage};

/// Named field values passed to or returned by a model.
pub type FieldValues = serde_json::Map<String, Value>;

/// One declared field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// Contract for one kind of model call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub instructions: String,
    pub inputs: Vec<FieldSpec>,
    pub outputs: Vec<FieldSpec>,
}

impl Signature {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn input(mut self, name: &str, description: &str) -> Self {
        self.inputs.push(FieldSpec {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
        });
        self
    }

    pub fn output(mut self, name: &str, description: &str) -> Self {
        self.outputs.push(FieldSpec {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
        });
        self
    }

    /// An output the model may leave out or set to null.
    pub fn optional_output(mut self, name: &str, description: &str) -> Self {
        self.outputs.push(FieldSpec {
            name: name.to_string(),
            description: description.to_string(),
            required: false,
        });
        self
    }

    pub fn check_inputs(&self, values: &FieldValues) -> Result<(), LmError> {
        self.check(SchemaStage::Input, &self.inputs, values)
    }

    pub fn check_outputs(&self, values: &FieldValues) -> Result<(), LmError> {
        self.check(SchemaStage::Output, &self.outputs, values)
    }

    fn check(
        &self,
        stage: SchemaStage,
        fields: &[FieldSpec],
        values: &FieldValues,
    ) -> Result<(), LmError> {
        for field in fields.iter().filter(|f| f.required) {
            match values.get(&field.name) {
                None | Some(Value::Null) => {
                    return Err(LmError::SchemaViolation {
                        signature: self.name.clone(),
                        stage,
                        field: field.name.clone(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Text of a field: strings as-is, other JSON values serialized, null as
/// absent.
pub fn field_text(values: &FieldValues, name: &str) -> Option<String> {
    match values.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signature() -> Signature {
        Signature::new("demo", "Do the thing.")
            .input("text", "source text")
            .output("answer", "the answer")
            .optional_output("note", "optional remark")
    }

    fn values(v: Value) -> FieldValues {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_missing_input_is_schema_violation() {
        let err = signature().check_inputs(&FieldValues::new()).unwrap_err();
        assert_eq!(
            err,
            LmError::SchemaViolation {
                signature: "demo".to_string(),
                stage: SchemaStage::Input,
                field: "text".to_string(),
            }
        );
    }

    #[test]
    fn test_null_required_output_rejected_optional_allowed() {
        let sig = signature();
        assert!(sig
            .check_outputs(&values(json!({"answer": null})))
            .is_err());
        assert!(sig
            .check_outputs(&values(json!({"answer": "3", "note": null})))
            .is_ok());
        assert!(sig.check_outputs(&values(json!({"answer": 3}))).is_ok());
    }

    #[test]
    fn test_field_text_renders_non_strings() {
        let v = values(json!({"s": "abc", "n": 1.5, "o": {"a": 1}, "z": null}));
        assert_eq!(field_text(&v, "s").as_deref(), Some("abc"));
        assert_eq!(field_text(&v, "n").as_deref(), Some("1.5"));
        assert_eq!(field_text(&v, "o").as_deref(), Some("{\"a\":1}"));
        assert_eq!(field_text(&v, "z"), None);
        assert_eq!(field_text(&v, "missing"), None);
    }
}

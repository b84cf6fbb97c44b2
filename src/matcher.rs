//! Compatibility matching between an output field set and an input field set.
//!
//! The check is all-or-nothing: every input field must be satisfied by some
//! output field, and the first failing field rejects the pair.

use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::projector::{FieldDescriptor, FieldMap};

/// Why an input field set can't be supplied by an output field set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Mismatch {
    #[error("no input fields to match")]
    NoInputs,

    #[error("input field \"{field}\" has no counterpart in the output")]
    MissingField { field: String },

    #[error("input field \"{field}\" is {input}, output field \"{output_field}\" is {output}")]
    TypeMismatch {
        field: String,
        output_field: String,
        input: String,
        output: String,
    },

    #[error("business tag missing on input field \"{field}\" or output field \"{output_field}\"")]
    MissingTag { field: String, output_field: String },

    #[error("input field \"{field}\" is tagged {input}, output field \"{output_field}\" is tagged {output}")]
    TagMismatch {
        field: String,
        output_field: String,
        input: String,
        output: String,
    },

    #[error("nested field of \"{field}\": {source}")]
    Nested {
        field: String,
        #[source]
        source: Box<Mismatch>,
    },
}

/// Returns true when every input field can be supplied by `output`.
///
/// An empty input set is never satisfiable.
pub fn is_compatible(output: &FieldMap, input: &FieldMap, config: &AnalysisConfig) -> bool {
    check_compatibility(output, input, config).is_ok()
}

/// Like [`is_compatible`], reporting the first failing rule.
///
/// # Errors
///
/// Returns the `Mismatch` of the first input field that fails, in field
/// order.
pub fn check_compatibility(
    output: &FieldMap,
    input: &FieldMap,
    config: &AnalysisConfig,
) -> Result<(), Mismatch> {
    if input.is_empty() {
        return Err(Mismatch::NoInputs);
    }
    for (field, input_spec) in input {
        let (output_field, output_spec) = lookup(output, field, config).ok_or_else(|| {
            Mismatch::MissingField {
                field: field.clone(),
            }
        })?;

        if let (Some(input_type), Some(output_type)) =
            (input_spec.field_type.as_deref(), output_spec.field_type.as_deref())
        {
            if !types_compatible(input_type, output_type) {
                return Err(Mismatch::TypeMismatch {
                    field: field.clone(),
                    output_field: output_field.to_string(),
                    input: input_type.to_string(),
                    output: output_type.to_string(),
                });
            }
        }

        match (
            non_empty(&input_spec.business_tag),
            non_empty(&output_spec.business_tag),
        ) {
            (Some(input_tag), Some(output_tag)) if input_tag == output_tag => {}
            (Some(input_tag), Some(output_tag)) => {
                return Err(Mismatch::TagMismatch {
                    field: field.clone(),
                    output_field: output_field.to_string(),
                    input: input_tag.to_string(),
                    output: output_tag.to_string(),
                })
            }
            _ => {
                return Err(Mismatch::MissingTag {
                    field: field.clone(),
                    output_field: output_field.to_string(),
                })
            }
        }

        if input_spec.is_object() && output_spec.is_object() {
            check_compatibility(&output_spec.nested, &input_spec.nested, config).map_err(
                |source| Mismatch::Nested {
                    field: field.clone(),
                    source: Box::new(source),
                },
            )?;
        }
    }
    Ok(())
}

/// Find the output field for an input name, directly or through the alias
/// table.
fn lookup<'a>(
    output: &'a FieldMap,
    field: &'a str,
    config: &'a AnalysisConfig,
) -> Option<(&'a str, &'a FieldDescriptor)> {
    if let Some(desc) = output.get(field) {
        return Some((field, desc));
    }
    let alias = config.field_aliases.get(field)?;
    output.get(alias).map(|desc| (alias.as_str(), desc))
}

/// Declared types match when equal or when one is an integer and the other
/// a number.
pub fn types_compatible(input: &str, output: &str) -> bool {
    const INTEGERS: &[&str] = &["int", "integer"];
    input == output
        || (INTEGERS.contains(&input) && output == "number")
        || (input == "number" && INTEGERS.contains(&output))
}

fn non_empty(tag: &Option<String>) -> Option<&str> {
    tag.as_deref().filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(ty: &str, tag: &str) -> FieldDescriptor {
        FieldDescriptor::new(Some(ty)).with_tag(tag)
    }

    fn fields(entries: &[(&str, FieldDescriptor)]) -> FieldMap {
        entries
            .iter()
            .map(|(name, desc)| (name.to_string(), desc.clone()))
            .collect()
    }

    fn project_fields() -> FieldMap {
        fields(&[
            ("id", field("integer", "project")),
            ("name", field("string", "project")),
        ])
    }

    #[test]
    fn empty_input_never_matches() {
        let config = AnalysisConfig::default();
        assert!(!is_compatible(&project_fields(), &FieldMap::new(), &config));
        assert_eq!(
            check_compatibility(&project_fields(), &FieldMap::new(), &config),
            Err(Mismatch::NoInputs)
        );
    }

    #[test]
    fn identical_sets_match_and_tag_perturbation_breaks() {
        let config = AnalysisConfig::default();
        let output = project_fields();
        assert!(is_compatible(&output, &project_fields(), &config));

        let mut input = project_fields();
        input.insert("name".into(), field("string", "group"));
        assert!(!is_compatible(&output, &input, &config));
        assert!(matches!(
            check_compatibility(&output, &input, &config),
            Err(Mismatch::TagMismatch { ref field, .. }) if field == "name"
        ));
    }

    #[test]
    fn alias_resolves_to_output_name() {
        let config = AnalysisConfig::default();
        let input = fields(&[("project_id", field("integer", "project"))]);
        assert!(is_compatible(&project_fields(), &input, &config));

        let input = fields(&[("namespace_id", field("integer", "project"))]);
        assert_eq!(
            check_compatibility(&project_fields(), &input, &config),
            Err(Mismatch::MissingField {
                field: "namespace_id".into()
            })
        );
    }

    #[test]
    fn integer_number_cross_compatible() {
        assert!(types_compatible("integer", "number"));
        assert!(types_compatible("number", "integer"));
        assert!(types_compatible("int", "number"));
        assert!(!types_compatible("string", "integer"));
        assert!(!types_compatible("int", "integer"));

        let config = AnalysisConfig::default();
        let output = fields(&[("id", field("number", "job"))]);
        let input = fields(&[("id", field("integer", "job"))]);
        assert!(is_compatible(&output, &input, &config));

        let input = fields(&[("id", field("string", "job"))]);
        assert!(matches!(
            check_compatibility(&output, &input, &config),
            Err(Mismatch::TypeMismatch { .. })
        ));
    }

    #[test]
    fn missing_type_skips_type_check() {
        let config = AnalysisConfig::default();
        let output = fields(&[("id", FieldDescriptor::new(None).with_tag("job"))]);
        let input = fields(&[("id", field("string", "job"))]);
        assert!(is_compatible(&output, &input, &config));
    }

    #[test]
    fn missing_tag_is_hard_failure() {
        let config = AnalysisConfig::default();
        let output = fields(&[("id", FieldDescriptor::new(Some("integer")))]);
        let input = fields(&[("id", field("integer", "job"))]);
        assert!(matches!(
            check_compatibility(&output, &input, &config),
            Err(Mismatch::MissingTag { .. })
        ));

        let output = fields(&[("id", field("integer", ""))]);
        assert!(!is_compatible(&output, &input, &config));
    }

    #[test]
    fn every_input_field_must_match() {
        let config = AnalysisConfig::default();
        let input = fields(&[
            ("id", field("integer", "project")),
            ("ref", field("string", "project")),
        ]);
        assert!(!is_compatible(&project_fields(), &input, &config));
    }

    #[test]
    fn nested_objects_recurse() {
        let config = AnalysisConfig::default();
        let owner_out = field("object", "project").with_nested(fields(&[
            ("id", field("integer", "project")),
            ("username", field("string", "project")),
        ]));
        let output = fields(&[("owner", owner_out)]);

        let owner_in = field("object", "project")
            .with_nested(fields(&[("id", field("integer", "project"))]));
        let input = fields(&[("owner", owner_in)]);
        assert!(is_compatible(&output, &input, &config));

        let owner_in = field("object", "project")
            .with_nested(fields(&[("email", field("string", "project"))]));
        let input = fields(&[("owner", owner_in)]);
        let err = check_compatibility(&output, &input, &config).unwrap_err();
        assert!(matches!(err, Mismatch::Nested { ref field, .. } if field == "owner"));
        assert_eq!(
            err.to_string(),
            "nested field of \"owner\": input field \"email\" has no counterpart in the output"
        );
    }

    #[test]
    fn empty_nested_input_never_matches() {
        let config = AnalysisConfig::default();
        let owner_out = field("object", "project")
            .with_nested(fields(&[("id", field("integer", "project"))]));
        let output = fields(&[("owner", owner_out)]);

        let input = fields(&[("owner", field("object", "project"))]);
        let err = check_compatibility(&output, &input, &config).unwrap_err();
        assert_eq!(
            err,
            Mismatch::Nested {
                field: "owner".into(),
                source: Box::new(Mismatch::NoInputs),
            }
        );
        assert!(!is_compatible(&output, &input, &config));
    }
}

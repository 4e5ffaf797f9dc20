//! Blueprint validation.
//!
//! Validation is a pure function over the parsed document: every structural,
//! type, range, and path-safety defect is accumulated into one
//! [`ValidationErrorSet`] rather than failing on the first, so the caller
//! gets the whole picture in a single response. Only a document that fails
//! to parse at all short-circuits, as a single-element set.

use crate::domain::blueprint::Blueprint;
use crate::domain::paths::check_reference;
use serde_json::Value;
use std::fmt;

const DIFFICULTY_LEVELS: [&str; 3] = ["beginner", "intermediate", "advanced"];
const TRANSITION_TYPES: [&str; 4] = ["cut", "crossfade", "fade_black", "fade_white"];

/// One defect: where it is and what is wrong with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every defect found in one validation pass, in document order.
#[derive(Debug)]
pub struct ValidationErrorSet {
    pub errors: Vec<ValidationError>,
}

impl std::error::Error for ValidationErrorSet {}

impl fmt::Display for ValidationErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blueprint validation failed ({} error(s)): ", self.errors.len())?;
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

impl ValidationErrorSet {
    fn single(field: &str, message: String) -> Self {
        Self {
            errors: vec![ValidationError {
                field: field.to_string(),
                message,
            }],
        }
    }

    /// True if any error mentions the given field path.
    pub fn mentions(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field.contains(field))
    }
}

#[derive(Default)]
struct Errors(Vec<ValidationError>);

impl Errors {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

/// Blueprint validator. `allow_absolute_paths` must stay `false` for
/// untrusted input; `strict_timeline` additionally enforces non-decreasing,
/// non-overlapping move start times.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    pub allow_absolute_paths: bool,
    pub strict_timeline: bool,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            allow_absolute_paths: false,
            strict_timeline: false,
        }
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a serialized blueprint document.
    pub fn validate_json(&self, raw: &str) -> Result<Blueprint, ValidationErrorSet> {
        let doc: Value = serde_json::from_str(raw).map_err(|e| {
            ValidationErrorSet::single("blueprint", format!("malformed JSON document: {}", e))
        })?;
        self.validate_value(&doc)
    }

    /// Validate an already-parsed blueprint document.
    pub fn validate_value(&self, doc: &Value) -> Result<Blueprint, ValidationErrorSet> {
        let obj = match doc.as_object() {
            Some(obj) => obj,
            None => {
                return Err(ValidationErrorSet::single(
                    "blueprint",
                    "expected a JSON object at the top level".to_string(),
                ))
            }
        };

        let mut errors = Errors::default();

        self.check_string(obj.get("task_id"), "task_id", &mut errors);
        self.check_path(obj.get("audio_path"), "audio_path", &mut errors);
        self.check_moves(obj.get("moves"), &mut errors);
        self.check_output_config(obj.get("output_config"), &mut errors);

        self.check_optional_positive(obj.get("audio_tempo"), "audio_tempo", &mut errors);
        self.check_optional_positive(obj.get("total_duration"), "total_duration", &mut errors);
        self.check_optional_enum(
            obj.get("difficulty_level"),
            "difficulty_level",
            &DIFFICULTY_LEVELS,
            &mut errors,
        );
        self.check_optional_enum(
            obj.get("transition_type"),
            "transition_type",
            &TRANSITION_TYPES,
            &mut errors,
        );
        if let Some(params) = obj.get("generation_parameters") {
            if !params.is_object() {
                errors.push("generation_parameters", "must be an object");
            }
        }

        if !errors.0.is_empty() {
            return Err(ValidationErrorSet { errors: errors.0 });
        }

        // Every check above passed; the typed deserialization cannot fail on
        // the fields we control, but a surprise still surfaces as a set.
        serde_json::from_value(doc.clone()).map_err(|e| {
            ValidationErrorSet::single("blueprint", format!("deserialization failed: {}", e))
        })
    }

    fn check_string(&self, value: Option<&Value>, field: &str, errors: &mut Errors) {
        match value {
            None => errors.push(field, "required field is missing"),
            Some(Value::String(s)) if s.is_empty() => errors.push(field, "must not be empty"),
            Some(Value::String(_)) => {}
            Some(other) => errors.push(field, format!("expected a string, got {}", kind(other))),
        }
    }

    fn check_path(&self, value: Option<&Value>, field: &str, errors: &mut Errors) {
        match value {
            None => errors.push(field, "required field is missing"),
            Some(Value::String(s)) => {
                if let Err(violation) = check_reference(s, self.allow_absolute_paths) {
                    errors.push(
                        field,
                        format!("unsafe path {:?}: {}", s, violation.describe()),
                    );
                }
            }
            Some(other) => errors.push(field, format!("expected a string, got {}", kind(other))),
        }
    }

    fn check_moves(&self, value: Option<&Value>, errors: &mut Errors) {
        let moves = match value {
            None => {
                errors.push("moves", "required field is missing");
                return;
            }
            Some(Value::Array(moves)) => moves,
            Some(other) => {
                errors.push("moves", format!("expected an array, got {}", kind(other)));
                return;
            }
        };

        if moves.is_empty() {
            errors.push("moves", "must contain at least one move");
            return;
        }

        let mut seen_ids: Vec<&str> = Vec::with_capacity(moves.len());
        let mut previous: Option<(f64, f64)> = None;

        for (i, entry) in moves.iter().enumerate() {
            let prefix = format!("moves[{}]", i);
            let obj = match entry.as_object() {
                Some(obj) => obj,
                None => {
                    errors.push(prefix, format!("expected an object, got {}", kind(entry)));
                    continue;
                }
            };

            match obj.get("clip_id") {
                None => errors.push(format!("{}.clip_id", prefix), "required field is missing"),
                Some(Value::String(id)) if id.is_empty() => {
                    errors.push(format!("{}.clip_id", prefix), "must not be empty")
                }
                Some(Value::String(id)) => {
                    if seen_ids.contains(&id.as_str()) {
                        errors.push(
                            format!("{}.clip_id", prefix),
                            format!("duplicate clip_id {:?}", id),
                        );
                    } else {
                        seen_ids.push(id);
                    }
                }
                Some(other) => errors.push(
                    format!("{}.clip_id", prefix),
                    format!("expected a string, got {}", kind(other)),
                ),
            }

            self.check_path(
                obj.get("video_path"),
                &format!("{}.video_path", prefix),
                errors,
            );

            let start_time = match obj.get("start_time") {
                None => {
                    errors.push(format!("{}.start_time", prefix), "required field is missing");
                    None
                }
                Some(value) => match value.as_f64() {
                    Some(t) if t < 0.0 => {
                        errors.push(
                            format!("{}.start_time", prefix),
                            format!("must be non-negative (got {})", t),
                        );
                        None
                    }
                    Some(t) => Some(t),
                    None => {
                        errors.push(
                            format!("{}.start_time", prefix),
                            format!("expected a number, got {}", kind(value)),
                        );
                        None
                    }
                },
            };

            let duration = match obj.get("duration") {
                None => {
                    errors.push(format!("{}.duration", prefix), "required field is missing");
                    None
                }
                Some(value) => match value.as_f64() {
                    Some(d) if d <= 0.0 => {
                        errors.push(
                            format!("{}.duration", prefix),
                            format!("must be strictly positive (got {})", d),
                        );
                        None
                    }
                    Some(d) => Some(d),
                    None => {
                        errors.push(
                            format!("{}.duration", prefix),
                            format!("expected a number, got {}", kind(value)),
                        );
                        None
                    }
                },
            };

            if self.strict_timeline {
                if let (Some(start), Some((prev_start, prev_duration))) = (start_time, previous) {
                    if start < prev_start {
                        errors.push(
                            format!("{}.start_time", prefix),
                            format!(
                                "must not decrease (got {} after {})",
                                start, prev_start
                            ),
                        );
                    } else if start + 1e-9 < prev_start + prev_duration {
                        errors.push(
                            format!("{}.start_time", prefix),
                            format!(
                                "overlaps previous move ending at {}",
                                prev_start + prev_duration
                            ),
                        );
                    }
                }
            }

            if let (Some(start), Some(dur)) = (start_time, duration) {
                previous = Some((start, dur));
            }
        }
    }

    fn check_output_config(&self, value: Option<&Value>, errors: &mut Errors) {
        let obj = match value {
            None => {
                errors.push("output_config", "required field is missing");
                return;
            }
            Some(Value::Object(obj)) => obj,
            Some(other) => {
                errors.push(
                    "output_config",
                    format!("expected an object, got {}", kind(other)),
                );
                return;
            }
        };

        self.check_path(
            obj.get("output_path"),
            "output_config.output_path",
            errors,
        );

        for field in ["video_codec", "audio_codec", "video_bitrate", "audio_bitrate"] {
            if let Some(value) = obj.get(field) {
                if !value.is_string() {
                    errors.push(
                        format!("output_config.{}", field),
                        format!("expected a string, got {}", kind(value)),
                    );
                }
            }
        }
    }

    fn check_optional_positive(&self, value: Option<&Value>, field: &str, errors: &mut Errors) {
        if let Some(value) = value {
            match value.as_f64() {
                Some(n) if n <= 0.0 => {
                    errors.push(field, format!("must be strictly positive (got {})", n))
                }
                Some(_) => {}
                None => errors.push(field, format!("expected a number, got {}", kind(value))),
            }
        }
    }

    fn check_optional_enum(
        &self,
        value: Option<&Value>,
        field: &str,
        allowed: &[&str],
        errors: &mut Errors,
    ) {
        if let Some(value) = value {
            match value.as_str() {
                Some(s) if allowed.contains(&s) => {}
                Some(s) => errors.push(
                    field,
                    format!("{:?} is not one of {}", s, allowed.join("|")),
                ),
                None => errors.push(field, format!("expected a string, got {}", kind(value))),
            }
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

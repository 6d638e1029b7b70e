// src/core/repair_executor.rs

//! # Repair-Retry Executor
//!
//! Wraps one "create entity" call. When the remote service rejects the payload with a
//! field-level validation error, the missing fields are collected from the user (shaped
//! by [`field_schema`](crate::core::field_schema)) and the call is retried exactly once.
//!
//! ```text
//! Attempting ──ok──────────────────────────────▶ Terminal(created)
//!     │ validation (first time)                        ▲
//!     ▼                                                │
//! Repairing ──all fields collected──▶ Attempting ──────┘
//!     any other failure, or a second validation ─▶ Terminal(error)
//! ```

use crate::core::field_schema::{self, FieldShape};
use crate::core::prompter::{PromptError, Prompter};
use crate::models::{CreateContext, CreatedEntity, FieldMap, FieldOption, MissingField};
use crate::system::http::{RemoteError, RemoteResult};
use serde_json::{Value, json};
use thiserror::Error;

/// Enumerates the legal values of an extension field for a create context.
pub trait FieldOptionSource {
    fn allowed_values(&self, field: &str, context: &CreateContext) -> RemoteResult<Vec<FieldOption>>;
}

#[derive(Error, Debug)]
pub enum RepairError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("The remote service still rejects these fields: {}", list_fields(.fields))]
    StillInvalid { fields: Vec<MissingField> },
    #[error("{0}")]
    Prompt(#[from] PromptError),
}

fn list_fields(fields: &[MissingField]) -> String {
    fields
        .iter()
        .map(|f| format!("{} ({})", f.name, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

enum State {
    Attempting { repaired: bool },
    Repairing(Vec<MissingField>),
    Terminal(Result<CreatedEntity, RepairError>),
}

/// Drives a create call through at most one interactive repair round.
pub struct RepairExecutor<'a> {
    prompter: &'a mut dyn Prompter,
    options: Option<&'a dyn FieldOptionSource>,
    context: CreateContext,
}

impl std::fmt::Debug for RepairExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairExecutor")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl<'a> RepairExecutor<'a> {
    pub fn new(prompter: &'a mut dyn Prompter) -> Self {
        Self {
            prompter,
            options: None,
            context: CreateContext::default(),
        }
    }

    /// Lets extension fields be answered by picking among their allowed values.
    pub fn with_options(mut self, source: &'a dyn FieldOptionSource, context: CreateContext) -> Self {
        self.options = Some(source);
        self.context = context;
        self
    }

    /// Runs `creator` with `initial`, repairing and retrying once on a validation failure.
    pub fn create_with_repair<F>(&mut self, initial: FieldMap, mut creator: F) -> Result<CreatedEntity, RepairError>
    where
        F: FnMut(&FieldMap) -> RemoteResult<CreatedEntity>,
    {
        let mut fields = initial;
        let mut state = State::Attempting { repaired: false };

        loop {
            state = match state {
                State::Attempting { repaired } => match creator(&fields) {
                    Ok(created) => State::Terminal(Ok(created)),
                    Err(RemoteError::Validation { fields: missing, .. }) if !repaired => {
                        log::debug!("Create rejected for {} field(s); repairing.", missing.len());
                        State::Repairing(missing)
                    }
                    Err(RemoteError::Validation { fields: missing, .. }) => {
                        State::Terminal(Err(RepairError::StillInvalid { fields: missing }))
                    }
                    Err(other) => State::Terminal(Err(other.into())),
                },
                State::Repairing(missing) => match self.collect(&mut fields, &missing) {
                    Ok(()) => State::Attempting { repaired: true },
                    Err(e) => State::Terminal(Err(e)),
                },
                State::Terminal(outcome) => return outcome,
            };
        }
    }

    fn collect(&mut self, fields: &mut FieldMap, missing: &[MissingField]) -> Result<(), RepairError> {
        for field in missing {
            if is_supplied(fields, &field.name) {
                log::debug!("'{}' was already supplied; keeping the given value.", field.name);
                continue;
            }
            let value = self.ask(field)?;
            fields.insert(field.name.clone(), value);
        }
        Ok(())
    }

    fn ask(&mut self, field: &MissingField) -> Result<Value, RepairError> {
        let prompt = format!(t!("repair.prompt.field"), field = field.name, reason = field.reason);

        let value = match field_schema::shape_of(&field.name) {
            FieldShape::Text => Value::String(self.prompter.text(&prompt, None)?),
            FieldShape::Integer => Value::from(self.prompter.integer(&prompt)?),
            FieldShape::Float => Value::from(self.prompter.float(&prompt)?),
            FieldShape::TextList => {
                let prompt = format!(t!("repair.prompt.list"), prompt = prompt);
                Value::from(split_list(&self.prompter.text(&prompt, None)?))
            }
            FieldShape::Object if field.name == "issuetype" => {
                json!({ "name": title_case(&self.prompter.text(&prompt, None)?) })
            }
            FieldShape::Object if field_schema::is_custom_field(&field.name) => {
                self.ask_custom(&field.name, &prompt)?
            }
            FieldShape::Object => json!({ "name": self.prompter.text(&prompt, None)? }),
        };
        Ok(value)
    }

    fn ask_custom(&mut self, name: &str, prompt: &str) -> Result<Value, RepairError> {
        let options = match self.options {
            Some(source) => source.allowed_values(name, &self.context).unwrap_or_else(|e| {
                log::warn!("Could not fetch the allowed values of '{}': {}", name, e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        if options.is_empty() {
            return Ok(json!({ "value": self.prompter.text(prompt, None)? }));
        }

        let items: Vec<String> = options
            .iter()
            .map(|option| format!("{} ({})", option.value, option.id))
            .collect();
        let index = self.prompter.select(prompt, &items, 0)?;
        let chosen = options.get(index).ok_or(PromptError::Cancelled)?;
        Ok(json!({ "id": chosen.id }))
    }
}

/// A field counts as supplied when it is present and not `null`.
fn is_supplied(fields: &FieldMap, name: &str) -> bool {
    fields.get(name).is_some_and(|value| !value.is_null())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Upper-cases the first letter of every word and lower-cases the rest, keeping separators.
fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompter::{Answer, ScriptedPrompter};
    use crate::system::http::translate;

    fn validation(fields: &[(&str, &str)]) -> RemoteError {
        RemoteError::Validation {
            status: 400,
            fields: fields
                .iter()
                .map(|(name, reason)| MissingField {
                    name: name.to_string(),
                    reason: reason.to_string(),
                })
                .collect(),
        }
    }

    fn created(id: &str) -> CreatedEntity {
        CreatedEntity {
            id: id.into(),
            key: None,
        }
    }

    fn fields(value: Value) -> FieldMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    struct FixedOptions(Vec<FieldOption>);

    impl FieldOptionSource for FixedOptions {
        fn allowed_values(&self, _field: &str, _context: &CreateContext) -> RemoteResult<Vec<FieldOption>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_success_without_repair() {
        let mut prompter = ScriptedPrompter::new([]);
        let mut executor = RepairExecutor::new(&mut prompter);

        let result = executor
            .create_with_repair(fields(json!({ "summary": "x" })), |_| Ok(created("1")))
            .unwrap();

        assert_eq!(result.id, "1");
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn test_repeated_validation_failure_stops_after_one_retry() {
        let mut prompter = ScriptedPrompter::new([Answer::Text("High".into())]);
        let mut executor = RepairExecutor::new(&mut prompter);
        let mut calls = 0;

        let err = executor
            .create_with_repair(FieldMap::new(), |_| {
                calls += 1;
                Err(validation(&[("priority", "Priority is required.")]))
            })
            .unwrap_err();

        assert_eq!(calls, 2);
        assert!(matches!(err, RepairError::StillInvalid { ref fields } if fields[0].name == "priority"));
    }

    #[test]
    fn test_supplied_fields_are_not_prompted_or_overridden() {
        let mut prompter = ScriptedPrompter::new([Answer::Text("A detailed description".into())]);
        let mut executor = RepairExecutor::new(&mut prompter);
        let mut seen = Vec::new();

        let result = executor.create_with_repair(
            fields(json!({ "summary": "Original" })),
            |payload| {
                seen.push(payload.clone());
                if seen.len() == 1 {
                    Err(validation(&[
                        ("summary", "Summary is invalid."),
                        ("description", "Description is required."),
                    ]))
                } else {
                    Ok(created("10001"))
                }
            },
        );

        assert_eq!(result.unwrap().id, "10001");
        let retried = &seen[1];
        assert_eq!(retried["summary"], json!("Original"));
        assert_eq!(retried["description"], json!("A detailed description"));
        assert_eq!(prompter.asked.len(), 1);
        assert!(prompter.asked[0].contains("description"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let mut prompter = ScriptedPrompter::new([Answer::Text("Fix it".into())]);
        let mut executor = RepairExecutor::new(&mut prompter);
        let mut attempt = 0;

        let result = executor.create_with_repair(fields(json!({ "summary": null })), |payload| {
            attempt += 1;
            if attempt == 1 {
                Err(validation(&[("summary", "required")]))
            } else {
                assert_eq!(payload["summary"], json!("Fix it"));
                Ok(created("2"))
            }
        });

        assert!(result.is_ok());
    }

    #[test]
    fn test_answers_follow_field_shapes() {
        let mut prompter = ScriptedPrompter::new([
            Answer::Text("bug , urgent,, backend ".into()),
            Answer::Text("sub-task".into()),
            Answer::Integer(3600),
            Answer::Float(2.5),
            Answer::Text("jdoe".into()),
        ]);
        let mut executor = RepairExecutor::new(&mut prompter);
        let mut retried = None;

        executor
            .create_with_repair(FieldMap::new(), |payload| {
                if retried.is_none() && payload.is_empty() {
                    return Err(validation(&[
                        ("labels", "required"),
                        ("issuetype", "required"),
                        ("timeoriginalestimate", "required"),
                        ("customfield_10019", "required"),
                        ("assignee", "required"),
                    ]));
                }
                retried = Some(payload.clone());
                Ok(created("3"))
            })
            .unwrap();

        let payload = retried.unwrap();
        assert_eq!(payload["labels"], json!(["bug", "urgent", "backend"]));
        assert_eq!(payload["issuetype"], json!({ "name": "Sub-Task" }));
        assert_eq!(payload["timeoriginalestimate"], json!(3600));
        assert_eq!(payload["customfield_10019"], json!(2.5));
        assert_eq!(payload["assignee"], json!({ "name": "jdoe" }));
    }

    #[test]
    fn test_prompts_follow_remote_order() {
        let mut prompter = ScriptedPrompter::new([Answer::Text("b".into()), Answer::Text("a".into())]);
        let mut executor = RepairExecutor::new(&mut prompter);
        let mut attempt = 0;

        executor
            .create_with_repair(FieldMap::new(), |_| {
                attempt += 1;
                if attempt == 1 {
                    Err(validation(&[("zeta", "required"), ("alpha", "required")]))
                } else {
                    Ok(created("4"))
                }
            })
            .unwrap();

        assert!(prompter.asked[0].starts_with("zeta"));
        assert!(prompter.asked[1].starts_with("alpha"));
    }

    #[test]
    fn test_custom_field_selected_by_id() {
        let source = FixedOptions(vec![
            FieldOption {
                id: "10100".into(),
                value: "Red".into(),
            },
            FieldOption {
                id: "10101".into(),
                value: "Blue".into(),
            },
        ]);
        let mut prompter = ScriptedPrompter::new([Answer::Select(1)]);
        let context = CreateContext {
            project_key: Some("OPS".into()),
            issue_type: Some("Task".into()),
        };
        let mut executor = RepairExecutor::new(&mut prompter).with_options(&source, context);
        let mut retried = None;

        executor
            .create_with_repair(FieldMap::new(), |payload| {
                if payload.is_empty() {
                    return Err(validation(&[("customfield_10033", "Team is required.")]));
                }
                retried = Some(payload.clone());
                Ok(created("5"))
            })
            .unwrap();

        assert_eq!(retried.unwrap()["customfield_10033"], json!({ "id": "10101" }));
    }

    #[test]
    fn test_custom_field_without_options_falls_back_to_text() {
        let source = FixedOptions(Vec::new());
        let mut prompter = ScriptedPrompter::new([Answer::Text("Platform".into())]);
        let mut executor =
            RepairExecutor::new(&mut prompter).with_options(&source, CreateContext::default());
        let mut retried = None;

        executor
            .create_with_repair(FieldMap::new(), |payload| {
                if payload.is_empty() {
                    return Err(validation(&[("customfield_10011", "Epic Name is required.")]));
                }
                retried = Some(payload.clone());
                Ok(created("6"))
            })
            .unwrap();

        assert_eq!(retried.unwrap()["customfield_10011"], json!({ "value": "Platform" }));
    }

    #[test]
    fn test_other_failures_are_not_repaired() {
        let mut prompter = ScriptedPrompter::new([]);
        let mut executor = RepairExecutor::new(&mut prompter);
        let mut calls = 0;

        let err = executor
            .create_with_repair(FieldMap::new(), |_| {
                calls += 1;
                Err(translate(403, r#"{"errorMessages":["Forbidden"]}"#))
            })
            .unwrap_err();

        assert_eq!(calls, 1);
        assert!(matches!(err, RepairError::Remote(RemoteError::Authorization { .. })));
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn test_prompt_failure_stops_before_retry() {
        let mut prompter = ScriptedPrompter::new([]);
        let mut executor = RepairExecutor::new(&mut prompter);
        let mut calls = 0;

        let err = executor
            .create_with_repair(FieldMap::new(), |_| {
                calls += 1;
                Err(validation(&[("summary", "required")]))
            })
            .unwrap_err();

        assert_eq!(calls, 1);
        assert!(matches!(err, RepairError::Prompt(PromptError::NonInteractive { .. })));
    }

    #[test]
    fn test_title_case_keeps_separators() {
        assert_eq!(title_case("bug"), "Bug");
        assert_eq!(title_case("  user STORY "), "User Story");
        assert_eq!(title_case("sub-task"), "Sub-Task");
    }
}

//! Bounded retry loop that coerces model output into a schema

use super::input::TaskInput;
use super::prompt::PromptTemplate;
use super::recovery::strip_code_fences;
use super::schema::Schema;
use super::StructuredOutput;
use crate::error::TaskError;
use crate::llm::{ModelOptions, TextGenerator, TextStream};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Appended to every structured task template
const INSTRUCTION_BLOCK: &str = "\n\nRespond ONLY with a valid JSON object matching the format:\n\
{format_instructions}\n\n\
If a previous attempt failed, you may also receive an \"error\" message explaining what went wrong. \
Use that info to fix the formatting or fill missing fields.\n\n\
{error}\n";

/// Result of a best-effort task
#[derive(Clone, Debug, PartialEq)]
pub struct BestEffort<T> {
    /// Validated model output, or the type's fallback
    pub value: T,
    /// Whether `value` is the fallback
    pub fallback: bool,
}

/// Runs structured tasks against a [`TextGenerator`]
///
/// Each attempt renders the prompt, calls the generator once, strips code
/// fences, and validates. The previous attempt's error is fed back into the
/// next prompt so the model can correct itself.
#[derive(Clone)]
pub struct StructuredTaskExecutor {
    generator: Arc<dyn TextGenerator>,
    defaults: ModelOptions,
}

impl StructuredTaskExecutor {
    /// Create an executor that uses `defaults` unless a call overrides them
    pub fn new(generator: Arc<dyn TextGenerator>, defaults: ModelOptions) -> Self {
        Self {
            generator,
            defaults,
        }
    }

    /// Model options applied when a call supplies none
    pub fn defaults(&self) -> &ModelOptions {
        &self.defaults
    }

    /// Run a task with the default model options
    pub async fn run<T: StructuredOutput>(
        &self,
        template: &PromptTemplate,
        input: &TaskInput,
    ) -> Result<T, TaskError> {
        self.run_with(template, input, &self.defaults).await
    }

    /// Run a task, failing once `options.max_retries` attempts are spent
    ///
    /// A budget of zero still makes one attempt.
    pub async fn run_with<T: StructuredOutput>(
        &self,
        template: &PromptTemplate,
        input: &TaskInput,
        options: &ModelOptions,
    ) -> Result<T, TaskError> {
        let schema = T::schema();
        let template = template.clone().append(INSTRUCTION_BLOCK);
        let attempts = options.max_retries.max(1);

        let mut vars = input.render();
        vars.insert("format_instructions".to_string(), schema.format_instructions());

        let mut last_error: Option<TaskError> = None;

        for attempt in 1..=attempts {
            let feedback = match &last_error {
                Some(error) => format!("Previous attempt failed: {error}"),
                None => String::new(),
            };
            vars.insert("error".to_string(), feedback);

            match self.attempt::<T>(&template, &vars, &schema, options).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "structured task succeeded after retry");
                    }
                    return Ok(value);
                }
                // Deterministic; another attempt would fail the same way
                Err(error @ (TaskError::MissingVariable(_) | TaskError::InvalidSchema(_))) => {
                    return Err(error);
                }
                Err(error) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = attempts,
                        error = %error,
                        "structured task attempt failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        Err(TaskError::RetriesExhausted {
            attempts,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// Run a task, substituting the type's fallback on terminal failure
    ///
    /// Types without a fallback propagate the error.
    pub async fn run_best_effort<T: StructuredOutput>(
        &self,
        template: &PromptTemplate,
        input: &TaskInput,
    ) -> Result<BestEffort<T>, TaskError> {
        match self.run::<T>(template, input).await {
            Ok(value) => Ok(BestEffort {
                value,
                fallback: false,
            }),
            Err(error) => match T::fallback() {
                Some(value) => {
                    tracing::warn!(error = %error, "structured task failed, using fallback");
                    Ok(BestEffort {
                        value,
                        fallback: true,
                    })
                }
                None => Err(error),
            },
        }
    }

    /// Stream free text for a template, without schema or retries
    pub async fn stream_text(
        &self,
        template: &PromptTemplate,
        input: &TaskInput,
    ) -> Result<TextStream, TaskError> {
        let prompt = template.render(&input.render())?;
        let stream = self
            .generator
            .generate_stream(&self.defaults.request(prompt))
            .await?;
        Ok(stream)
    }

    async fn attempt<T: StructuredOutput>(
        &self,
        template: &PromptTemplate,
        vars: &BTreeMap<String, String>,
        schema: &Schema,
        options: &ModelOptions,
    ) -> Result<T, TaskError> {
        let prompt = template.render(vars)?;
        let raw = self.generator.generate(&options.request(prompt)).await?;
        let value = schema.validate_text(&strip_code_fences(&raw))?;
        serde_json::from_value(value).map_err(|e| TaskError::Validation(e.to_string()))
    }
}

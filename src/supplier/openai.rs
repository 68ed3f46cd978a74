use super::*;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use serde::Deserialize;

/// LLM-backed content supplier.
///
/// Every failure path falls back to the built-in bank, so the trait methods
/// always return something usable.
pub struct OpenAiSupplier {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

const CATEGORY_SYSTEM_PROMPT: &str = "You generate category names for a party quiz game. \
    Respond with a JSON array of short category name strings and nothing else. \
    No markdown, no commentary. Categories should be fun, broad and answerable \
    by a casual crowd.";

const QUESTION_SYSTEM_PROMPT: &str = "You generate multiple-choice questions for a party quiz game. \
    Respond with a JSON array and nothing else. Each element must be an object with \
    \"text\" (the question), \"options\" (exactly 4 answer strings), \
    \"correct_index\" (0-3) and optionally \"explanation\" (one short sentence). \
    Questions must be distinct from each other and suitable for a casual crowd.";

/// Wire shape of a generated question, before validation.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    text: String,
    options: Vec<String>,
    correct_index: usize,
    #[serde(default)]
    explanation: Option<String>,
}

impl OpenAiSupplier {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        let client = Client::with_config(config);

        Self {
            client,
            model,
            timeout,
        }
    }

    /// One chat completion round trip, bounded by the configured timeout.
    async fn complete(&self, system: &str, user: String) -> SupplierResult<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()
                    .map_err(|e| SupplierError::ApiError(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user)
                    .build()
                    .map_err(|e| SupplierError::ApiError(e.to_string()))?
                    .into(),
            ])
            .build()
            .map_err(|e| SupplierError::ApiError(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| SupplierError::Timeout(self.timeout))?
            .map_err(|e| SupplierError::ApiError(e.to_string()))?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| SupplierError::ParseError("No content in response".to_string()))
    }

    async fn try_categories(&self, level: u32) -> SupplierResult<Vec<String>> {
        let user = format!(
            "Give me 4 quiz categories for level {} of the game. \
             Later levels may be slightly harder topics.",
            level
        );
        let content = self.complete(CATEGORY_SYSTEM_PROMPT, user).await?;
        let categories: Vec<String> = serde_json::from_str(strip_code_fences(&content))
            .map_err(|e| SupplierError::ParseError(e.to_string()))?;

        let categories: Vec<String> = categories
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        if categories.is_empty() {
            return Err(SupplierError::ParseError(
                "Model returned no categories".to_string(),
            ));
        }
        Ok(categories)
    }

    async fn try_questions(
        &self,
        category: &str,
        count: usize,
        is_blitz: bool,
    ) -> SupplierResult<Vec<Question>> {
        let user = if is_blitz {
            format!(
                "Generate {} rapid-fire questions mixing many different topics.",
                count
            )
        } else {
            format!(
                "Generate {} questions for the category \"{}\".",
                count, category
            )
        };
        let content = self.complete(QUESTION_SYSTEM_PROMPT, user).await?;
        let raw: Vec<RawQuestion> = serde_json::from_str(strip_code_fences(&content))
            .map_err(|e| SupplierError::ParseError(e.to_string()))?;

        // Drop anything malformed rather than failing the whole batch; the
        // fetcher validates again, this just keeps the logs closer to the
        // source of the problem.
        let questions: Vec<Question> = raw
            .into_iter()
            .filter(|q| q.options.len() == 4 && q.correct_index < 4 && !q.text.trim().is_empty())
            .map(|q| Question {
                text: q.text,
                options: q.options,
                correct_index: q.correct_index,
                category: category.to_string(),
                explanation: q.explanation,
            })
            .collect();

        if questions.is_empty() {
            return Err(SupplierError::ParseError(
                "Model returned no usable questions".to_string(),
            ));
        }
        Ok(questions)
    }
}

/// Models love to wrap JSON in ```json fences despite instructions.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[async_trait]
impl ContentSupplier for OpenAiSupplier {
    async fn generate_categories(&self, level: u32) -> Vec<String> {
        match self.try_categories(level).await {
            Ok(categories) => categories,
            Err(e) => {
                tracing::warn!("Category generation failed: {}, using fallback", e);
                fallback_categories(level)
            }
        }
    }

    async fn generate_questions(
        &self,
        category: &str,
        count: usize,
        is_blitz: bool,
    ) -> Vec<Question> {
        match self.try_questions(category, count, is_blitz).await {
            Ok(questions) => questions,
            Err(e) => {
                tracing::warn!("Question generation failed: {}, using fallback", e);
                FallbackSupplier::bank_questions(category, count, is_blitz)
            }
        }
    }

    fn name(&self) -> &str {
        "openai"
    }
}

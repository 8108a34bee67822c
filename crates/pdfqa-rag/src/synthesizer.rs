use pdfqa_ai::{GenerationConfig, LLMProvider};
use pdfqa_core::{PdfQaError, Result};
use pulldown_cmark::{html, Options, Parser};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, instrument};

/// LaTeX delimiters the model tends to leave in financial answers.
const LATEX_ARTIFACTS: [&str; 7] = ["\\[", "\\]", "\\(", "\\)", "$$", "\\text{", "}"];

/// What the caller wants the answer rendered as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    /// Guess from the answer text; see [`looks_like_markdown_table`].
    #[default]
    Auto,
    Text,
    Html,
}

impl OutputShape {
    pub fn renders_html(&self, answer: &str) -> bool {
        match self {
            Self::Html => true,
            Self::Text => false,
            Self::Auto => looks_like_markdown_table(answer),
        }
    }
}

impl FromStr for OutputShape {
    type Err = PdfQaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "text" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            other => Err(PdfQaError::invalid_input(format!(
                "Unknown output shape: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizedAnswer {
    pub text: String,
    /// Whether `text` is HTML
    pub html: bool,
    pub model: String,
    pub total_tokens: Option<usize>,
}

/// Calls the generation oracle once per question and cleans up its output.
pub struct AnswerSynthesizer {
    llm: Arc<dyn LLMProvider>,
    generation: GenerationConfig,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LLMProvider>, generation: GenerationConfig) -> Self {
        Self { llm, generation }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    #[instrument(skip(self, context), fields(context_chars = context.len()))]
    pub async fn synthesize(
        &self,
        context: &str,
        question: &str,
        shape: OutputShape,
    ) -> Result<SynthesizedAnswer> {
        let prompt = build_prompt(context, question);
        let response = self
            .llm
            .generate_with_config(&prompt, &self.generation)
            .await
            .map_err(|e| PdfQaError::synthesis(format!("{:#}", e)))?;

        let cleaned = clean_latex(&response.content);
        let html = shape.renders_html(&cleaned);
        debug!(
            "Answer from {}: {} chars, html={}",
            response.model,
            cleaned.len(),
            html
        );

        Ok(SynthesizedAnswer {
            text: if html { markdown_to_html(&cleaned) } else { cleaned },
            html,
            model: response.model,
            total_tokens: response.total_tokens,
        })
    }
}

pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful analyst. Based on the context below, answer the question accurately.\n\n\
         Context:\n{}\n\nQuestion: {}\nAnswer:",
        context, question
    )
}

/// Removes LaTeX delimiter artifacts and trims.
pub fn clean_latex(answer: &str) -> String {
    LATEX_ARTIFACTS
        .iter()
        .fold(answer.to_string(), |text, artifact| text.replace(artifact, ""))
        .trim()
        .to_string()
}

/// Best-effort guess that the answer contains a markdown table: both a
/// pipe and a hyphen appear somewhere. Prose with a dash and a pipe also
/// matches; callers that know better should ask for an explicit shape.
pub fn looks_like_markdown_table(answer: &str) -> bool {
    answer.contains('|') && answer.contains('-')
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_latex() {
        assert_eq!(
            clean_latex("  \\[ \\text{Margin} = 42\\% \\]  "),
            "Margin = 42\\%"
        );
        assert_eq!(clean_latex("$$x$$ and \\(y\\)"), "x and y");
        assert_eq!(clean_latex("plain answer"), "plain answer");
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt("ctx", "Why?");
        assert!(prompt.starts_with(
            "You are a helpful analyst. Based on the context below, answer the question accurately."
        ));
        assert!(prompt.ends_with("Context:\nctx\n\nQuestion: Why?\nAnswer:"));
    }

    #[test]
    fn test_auto_shape_heuristic() {
        assert!(OutputShape::Auto.renders_html("| a | b |\n|---|---|\n| 1 | 2 |"));
        assert!(!OutputShape::Auto.renders_html("a | b"));
        assert!(!OutputShape::Auto.renders_html("year-over-year growth"));
        assert!(!OutputShape::Text.renders_html("| a |\n|---|"));
        assert!(OutputShape::Html.renders_html("no table at all"));
    }

    #[test]
    fn test_table_rendering() {
        let html = markdown_to_html("| Year | Revenue |\n|------|---------|\n| 2023 | 10 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<th>Year</th>"));
        assert!(html.contains("<td>2023</td>"));
    }

    #[test]
    fn test_output_shape_parse() {
        assert_eq!("HTML".parse::<OutputShape>().unwrap(), OutputShape::Html);
        assert!("pdf".parse::<OutputShape>().is_err());
    }
}

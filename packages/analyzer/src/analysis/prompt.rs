use crate::models::Article;

const SYSTEM_ANALYSIS: &str = include_str!("../../prompts/system_analysis.txt");

/// JSON layout the model must produce. The parser expects exactly these keys.
pub const ANALYSIS_SCHEMA: &str = r#"{
  "main_topic": "Brief description of the main research topic",
  "methodology": "Research methodology used",
  "key_findings": ["Finding 1", "Finding 2", "Finding 3"],
  "techniques": ["Technique 1", "Technique 2"],
  "category": {
    "domain": "Main domain (e.g., Computer Science, Physics, Mathematics, Biology)",
    "subcategory": "Specific subcategory (e.g., Machine Learning, Cryptography, Quantum Physics)",
    "complexity": "Basic, Intermediate, or Advanced",
    "article_type": "Theory, Empirical, Survey, Application, or Other"
  },
  "summary": {
    "brief": "A 2-3 sentence summary of the article",
    "key_points": ["Key point 1", "Key point 2", "Key point 3"]
  },
  "confidence": 0.85
}"#;

/// Renders articles into LLM prompts.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    full_text_max_chars: usize,
}

impl PromptBuilder {
    pub fn new(full_text_max_chars: usize) -> Self {
        Self {
            full_text_max_chars,
        }
    }

    /// System prompt sent alongside every analysis request.
    pub fn system_prompt(&self) -> &'static str {
        SYSTEM_ANALYSIS
    }

    /// Build the user prompt for one article. Same article, same prompt.
    pub fn build(&self, article: &Article) -> String {
        let mut prompt = String::from(
            "You are an expert scientific article analyzer. Analyze the following research \
             article and provide a structured analysis in JSON format.\n\n",
        );

        prompt.push_str(&format!("Title: {}\n\n", article.title()));
        if !article.authors().is_empty() {
            prompt.push_str(&format!("Authors: {}\n\n", article.authors().join(", ")));
        }
        if !article.categories().is_empty() {
            prompt.push_str(&format!(
                "Categories: {}\n\n",
                article.categories().join(", ")
            ));
        }
        prompt.push_str(&format!("Abstract:\n{}\n\n", article.abstract_text()));

        if let Some(full_text) = article.full_text() {
            let excerpt = truncate_at_boundary(full_text, self.full_text_max_chars);
            prompt.push_str(&format!("Full Text (excerpt):\n{excerpt}\n\n"));
        }

        prompt.push_str(
            "Provide your analysis in the following JSON structure. All string fields are \
             required and must not be empty. \"confidence\" is your certainty in the analysis \
             as a number between 0 and 1.\n\n",
        );
        prompt.push_str(ANALYSIS_SCHEMA);
        prompt.push_str("\n\nRespond with ONLY the JSON object, no additional text or formatting.");

        prompt
    }
}

/// Cut `text` to at most `max_chars` characters, backing up to the last
/// whitespace so no word is split. Falls back to a hard cut when the prefix
/// has no whitespace at all.
pub fn truncate_at_boundary(text: &str, max_chars: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };
    let prefix = &text[..cut];
    match prefix.rfind(char::is_whitespace) {
        Some(boundary) if boundary > 0 => prefix[..boundary].trim_end(),
        _ => prefix,
    }
}

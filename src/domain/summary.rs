use serde::{Deserialize, Serialize};

pub const DEFAULT_LANGUAGE: &str = "en";

const ACADEMIC_PREAMBLE: &str = "An academic analysis of the provided text indicates that the central theme revolves around the following key points:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthTier {
    Short,
    #[default]
    Medium,
    Long,
}

/// Token-count bounds handed to the summarization model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBounds {
    pub min_length: u32,
    pub max_length: u32,
}

impl LengthTier {
    /// Parses the form value `"1"`, `"2"` or `"3"`. Anything else is `Medium`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "1" => LengthTier::Short,
            "3" => LengthTier::Long,
            _ => LengthTier::Medium,
        }
    }

    pub fn bounds(self) -> LengthBounds {
        let (min_length, max_length) = match self {
            LengthTier::Short => (30, 80),
            LengthTier::Medium => (80, 150),
            LengthTier::Long => (150, 300),
        };
        LengthBounds {
            min_length,
            max_length,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Paragraph,
    BulletPoints,
    OneLiner,
    Academic,
}

impl OutputFormat {
    /// Parses the form value; unknown names fall back to `Paragraph`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "bullet_points" => OutputFormat::BulletPoints,
            "one_liner" => OutputFormat::OneLiner,
            "academic" => OutputFormat::Academic,
            _ => OutputFormat::Paragraph,
        }
    }

    pub fn apply(self, summary: &str) -> String {
        match self {
            OutputFormat::BulletPoints => summary
                .split('.')
                .map(str::trim)
                .filter(|sentence| !sentence.is_empty())
                .map(|sentence| format!("• {sentence}"))
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::OneLiner => {
                let first = summary.split('.').next().unwrap_or_default();
                format!("{first}.")
            }
            OutputFormat::Academic => format!("{ACADEMIC_PREAMBLE} {summary}"),
            OutputFormat::Paragraph => summary.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SummarizeRequest {
    pub text: Option<String>,
    pub upload: Option<UploadedFile>,
    pub format: OutputFormat,
    pub language: String,
    pub length: LengthTier,
}

impl Default for SummarizeRequest {
    fn default() -> Self {
        Self {
            text: None,
            upload: None,
            format: OutputFormat::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            length: LengthTier::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizeResult {
    pub summary: String,
    pub keywords: Vec<String>,
}

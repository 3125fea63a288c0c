use serde::Deserialize;

/// Query parameters for one Google results page.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    /// Interface language (`hl`).
    pub language: String,
    /// Two-letter country code (`gl`).
    pub country: String,
    /// `desktop`, `mobile` or `tablet`.
    pub device: String,
    /// Free-form SerpAPI location, only sent for city-level targeting.
    pub location: Option<String>,
    pub num: u32,
}

/// The subset of a SerpAPI response this workspace reads. Every field is
/// optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub ai_overview: Option<AiOverviewBlock>,
    #[serde(default)]
    pub answer_box: Option<AnswerBox>,
    #[serde(default)]
    pub organic_results: Vec<OrganicResult>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiOverviewBlock {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceLink>,
    /// Newer responses list citations as `references` instead of `sources`.
    #[serde(default)]
    pub references: Vec<SourceLink>,
    #[serde(default)]
    pub followup_questions: Vec<serde_json::Value>,
}

impl AiOverviewBlock {
    /// `sources` followed by `references`, skipping entries without a link.
    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .chain(self.references.iter())
            .filter_map(|s| s.link.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnswerBox {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<SourceLink>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceLink {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

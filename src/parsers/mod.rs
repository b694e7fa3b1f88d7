pub mod html;
pub mod text;


use serde::{Deserialize, Serialize};

/// How page content is serialized before it reaches the extraction engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    /// Markup exactly as the browser returned it
    RawHtml,
    /// Markup without scripts, styles and inline graphics
    #[default]
    Html,
    /// Visible text only
    Text,
}

impl ContentFormat {
    /// Label used when describing the content to the model
    pub fn label(&self) -> &'static str {
        match self {
            ContentFormat::RawHtml | ContentFormat::Html => "HTML",
            ContentFormat::Text => "plain text",
        }
    }
}

/// Reduce raw page content according to the format
pub fn reduce(raw_content: &str, format: ContentFormat) -> String {
    let reduced = match format {
        ContentFormat::RawHtml => raw_content.to_string(),
        ContentFormat::Html => html::clean_markup(raw_content),
        ContentFormat::Text => html::visible_text(raw_content),
    };
    ::log::debug!(
        "Reduced content from {} to {} bytes ({:?})",
        raw_content.len(),
        reduced.len(),
        format
    );
    reduced
}

use pulldown_cmark::{html, Event, Options, Parser};
use serde::Serialize;

use crate::{gemini::GeminiError, models::{ItemPhoto, ListingResult}};

pub const SUCCESS_BANNER: &str = "Listing Ready!";
pub const MISSING_KEY_BANNER: &str = "Please enter an API Key in the sidebar first!";
pub const INTERRUPTED_BANNER: &str = "Omo, something broke: generation was interrupted before it finished";

/// What the page shows after a Generate press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Presentation {
    Success {
        banner: String,
        image_caption: String,
        image_data_url: String,
        /// Model output exactly as returned.
        listing: String,
        listing_html: String,
    },
    Error {
        banner: String,
    },
}

impl Presentation {
    pub fn from_outcome(outcome: Result<ListingResult, GeminiError>, photo: &ItemPhoto) -> Self {
        match outcome {
            Ok(result) => Presentation::Success {
                banner: SUCCESS_BANNER.to_string(),
                image_caption: "Your Item".to_string(),
                image_data_url: photo.data_url(),
                listing_html: render_markdown(&result.text),
                listing: result.text,
            },
            Err(e) => Presentation::Error {
                banner: format!("Omo, something broke: {e}"),
            },
        }
    }

    pub fn missing_credential() -> Self {
        Presentation::Error { banner: MISSING_KEY_BANNER.to_string() }
    }

    pub fn interrupted() -> Self {
        Presentation::Error { banner: INTERRUPTED_BANNER.to_string() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Presentation::Success { .. })
    }
}

/// Markdown to HTML. Raw HTML in the model output is escaped, not passed through.
pub fn render_markdown(text: &str) -> String {
    let parser = Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

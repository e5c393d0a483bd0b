use crate::models::{Condition, Platform};

const PREAMBLE: &str = "You are an expert Nigerian social media marketer.
Look at this image. I want to sell this item.
";

const CLOSING: &str = "
Format the output clearly.
";

/// Platform-specific tone and formatting instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleBlock {
    Story,
    Status,
    Classified,
}

impl StyleBlock {
    /// Anything that is not WhatsApp Status or Jiji gets the Instagram treatment.
    pub fn for_platform(platform: &Platform) -> Self {
        match platform {
            Platform::WhatsAppStatus => StyleBlock::Status,
            Platform::Jiji => StyleBlock::Classified,
            Platform::Instagram | Platform::Unlisted(_) => StyleBlock::Story,
        }
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            StyleBlock::Status => "- Keep it short and punchy.
- Use plenty of emojis.
- Focus on urgency (e.g., \"Fastest fingers!\").
",
            StyleBlock::Classified => "- Write a formal, clear description.
- List key specifications in bullet points.
- Maintain a professional tone. No unnecessary emojis.
",
            StyleBlock::Story => "- Write a catchy, engaging story or hook.
- Use a friendly and persuasive tone.
- Add 5-10 relevant hashtags.
",
        }
    }
}

pub fn build_prompt(condition: Condition, platform: &Platform) -> String {
    let mut prompt = String::from(PREAMBLE);
    prompt.push_str(&format!(
        "
**Context:**
- Condition: {condition}
- Platform: {platform}

**Tasks:**
1. Identify the item precisely.
2. Estimate a price range in NGN (Naira) based on current Nigerian market value for this condition.
3. Write a sales caption tailored for {platform}:
"
    ));
    prompt.push_str(StyleBlock::for_platform(platform).instructions());
    prompt.push_str(CLOSING);
    prompt
}

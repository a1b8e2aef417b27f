//! Prompt text sent to the provider.

use crate::context::CompactContext;

/// Coach persona, sent as the system turn (or prepended, for Gemini).
pub const SYSTEM_PROMPT: &str = "You are FusBuddy360, a friendly and helpful Fusion 360 learning coach. \
Provide a concise summary of the user's request.\n\
And provide a numbered list of clear steps in Fusion UI terms to help the user.\n\
When an image of the viewport is provided, use it as visual context to better understand user intent, geometry, and orientation.\n";

/// User turn: the question, then the compact context as indented JSON.
pub fn user_prompt(question: &str, context: &CompactContext<'_>) -> String {
    format!(
        "User question:\n{question}\n\nCurrent context (JSON):\n{}",
        context.to_prompt_json()
    )
}

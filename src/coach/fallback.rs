//! Templated answer used whenever no provider reply is available.
//!
//! Built purely from the question and the session context, so it is the
//! same for the same inputs and needs no network.

use crate::context::{SessionContext, summarise_selection};

pub const GENERIC_STEPS: [&str; 4] = [
    "1. Identify which geometry or feature this question refers to (use the selection to be explicit).",
    "2. Locate the appropriate tool in Fusion’s UI (toolbar panel or right‑click menu).",
    "3. Adjust the key inputs (distance/angle/feature count/etc.) while watching the preview.",
    "4. Confirm the operation and inspect the result from a few camera angles.",
];

pub const GENERIC_TIPS: [&str; 3] = [
    "- Make sure you are in the correct workspace for the tool you expect (e.g. Solid vs Surface).",
    "- Select only the edges/faces you actually want to affect before running modify commands.",
    "- If a command is greyed out, check that the right type of object is active (body vs component vs sketch).",
];

const CLOSING: &str = "If this doesn’t match what you’re trying to do, try re‑asking with a bit more detail \
about the feature or share what you currently have selected.";

/// Goal, where-we-are, selection, generic steps, tips, closing line.
pub fn structured_answer(question: &str, ctx: &SessionContext) -> String {
    let doc_name = non_empty(ctx.document.name.as_deref()).unwrap_or("your current design");
    let ws_name = non_empty(ctx.workspace.name.as_deref()).unwrap_or("your current workspace");

    let mut lines: Vec<String> = vec![
        format!("**Goal (from you):** {question}"),
        String::new(),
        format!("**Where we are:** Working in {ws_name} on *{doc_name}*."),
        summarise_selection(&ctx.selection),
        String::new(),
        "**What we’re going to do next (generic template):**".to_string(),
    ];
    lines.extend(GENERIC_STEPS.iter().map(|s| s.to_string()));
    lines.push(String::new());
    lines.push("**Tips / common mistakes:**".to_string());
    lines.extend(GENERIC_TIPS.iter().map(|s| s.to_string()));
    lines.push(String::new());
    lines.push(CLOSING.to_string());
    lines.join("\n")
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

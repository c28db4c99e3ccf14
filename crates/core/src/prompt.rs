//! Prompt construction for the text generator.

use std::fmt::Write as _;

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::catalog::{category_profile, ContentUnit};
use crate::content::{truncate_to, MAX_POST_CHARS};

/// Angles the bot rotates through so consecutive posts don't read alike.
pub const CONTENT_STYLES: [&str; 7] = [
    "analytical deep dive",
    "market perspective",
    "technical analysis",
    "ecosystem comparison",
    "future potential assessment",
    "innovation spotlight",
    "competitive analysis",
];

/// How many recent posts are quoted back to the model.
pub const RECENT_POSTS_IN_PROMPT: usize = 3;

/// Characters kept from each quoted recent post.
const RECENT_POST_EXCERPT_CHARS: usize = 100;

/// Pick a content style at random.
pub fn pick_style<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    CONTENT_STYLES
        .choose(rng)
        .copied()
        .unwrap_or(CONTENT_STYLES[0])
}

/// Build the generation prompt for `unit`.
///
/// `recent_posts` is newest first; only the first [`RECENT_POSTS_IN_PROMPT`]
/// are quoted, each cut to a short excerpt.
pub fn build_prompt(unit: &ContentUnit, style: &str, recent_posts: &[String]) -> String {
    let mut prompt = String::with_capacity(2048);

    let _ = writeln!(
        prompt,
        "Write a {style} Twitter thread about {} ({}, {}).",
        unit.name, unit.website, unit.handle
    );
    let _ = writeln!(prompt, "Project summary: {}", unit.description);
    let _ = writeln!(prompt, "Category: {}", unit.category);

    if let Some(profile) = category_profile(&unit.category) {
        let _ = writeln!(
            prompt,
            "Relevant angles for this category: {}.",
            profile.focus_areas.join(", ")
        );
        let _ = writeln!(
            prompt,
            "Metrics worth referencing: {}.",
            profile.key_metrics.join(", ")
        );
    }

    prompt.push_str("\nREQUIREMENTS:\n");
    for (i, line) in [
        "Offer analysis and a point of view, not a product description.".to_string(),
        "Explain why the project matters, including its strengths and open challenges."
            .to_string(),
        "Compare with similar projects where it helps the reader.".to_string(),
        format!("Keep every tweet under {MAX_POST_CHARS} characters."),
        "Write 2 to 4 connected tweets, separated by a blank line.".to_string(),
        format!("Mention {} and add a few relevant hashtags.", unit.handle),
    ]
    .iter()
    .enumerate()
    {
        let _ = writeln!(prompt, "{}. {line}", i + 1);
    }

    prompt.push_str(
        "\nTONE: professional but conversational; concrete data points over buzzwords.\n\
         \nDO NOT: restate the website copy, use generic marketing language, or stay at \
         surface level.\n",
    );

    if !recent_posts.is_empty() {
        prompt.push_str("\nThese topics were covered recently. Do not repeat them:\n");
        for post in recent_posts.iter().take(RECENT_POSTS_IN_PROMPT) {
            let excerpt = truncate_to(post.trim(), RECENT_POST_EXCERPT_CHARS);
            let _ = writeln!(prompt, "- {excerpt}");
        }
    }

    prompt.push_str("\nWrite the thread now:");
    prompt
}

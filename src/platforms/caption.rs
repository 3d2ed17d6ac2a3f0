//! Caption assembly shared by all publishers

use crate::core::traits::VideoRecord;

const ELLIPSIS: &str = "...";

/// Build a caption from title, description and tags
///
/// Layout is `title\n\ndescription`, followed by `\n\n#tag #tag` when at least
/// one tag is non-blank. Whitespace inside a tag is removed. Content longer than
/// `max_length` characters is cut to `max_length - 3` characters plus `...`;
/// limits too small for the ellipsis keep the first `max_length` characters.
pub fn prepare_caption(video: &VideoRecord, max_length: Option<usize>) -> String {
    let mut content = format!("{}\n\n{}", video.title, video.description);

    let hashtags: Vec<String> = video
        .tags
        .iter()
        .map(|tag| tag.split_whitespace().collect::<String>())
        .filter(|tag| !tag.is_empty())
        .map(|tag| format!("#{}", tag))
        .collect();

    if !hashtags.is_empty() {
        content.push_str("\n\n");
        content.push_str(&hashtags.join(" "));
    }

    // Trimming first keeps truncated captions at exactly `max_length` characters.
    let content = content.trim();

    match max_length {
        Some(max) if max < ELLIPSIS.len() => content.chars().take(max).collect(),
        Some(max) if content.chars().count() > max => {
            let keep = max - ELLIPSIS.len();
            let mut truncated: String = content.chars().take(keep).collect();
            truncated.push_str(ELLIPSIS);
            truncated
        }
        _ => content.to_string(),
    }
}

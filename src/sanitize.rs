//! Cleans model output before it is returned to the caller.
//!
//! Heuristic only: fenced blocks are cut out and a reply that still looks
//! like a JSON object is replaced with a fixed apology.

use std::sync::LazyLock;

use regex::Regex;

/// Returned instead of a reply that is a bare JSON object.
pub const FALLBACK_SUMMARY: &str = "Sorry, I could not generate a summary.";

/// Opening fence with an optional language tag, then a line break or a literal `\n`.
static TAGGED_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[a-zA-Z]*(?:\n|\\n).*?```").expect("tagged fence regex must compile")
});

static PLAIN_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("plain fence regex must compile"));

/// Strip fenced blocks, trim, and reject JSON-object-shaped output.
pub fn sanitize(text: &str) -> String {
    let stripped = strip_fences(text);
    let trimmed = stripped.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return FALLBACK_SUMMARY.to_string();
    }
    trimmed.to_string()
}

/// Removes fenced blocks until none remain.
///
/// A single pass can join two stray fences into a new block, so removal repeats.
fn strip_fences(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let tagged = TAGGED_FENCE_RE.replace_all(&current, "");
        let next = PLAIN_FENCE_RE.replace_all(&tagged, "").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_text_is_trimmed() {
        assert_eq!(
            sanitize("  Here are your todos: buy milk, walk dog.  "),
            "Here are your todos: buy milk, walk dog."
        );
    }

    #[test]
    fn bare_object_becomes_fallback() {
        assert_eq!(sanitize("{\"a\": 1}"), FALLBACK_SUMMARY);
        assert_eq!(sanitize("\n  {\"todos\": []}\n"), FALLBACK_SUMMARY);
    }

    #[test]
    fn json_array_passes_through() {
        assert_eq!(sanitize("[1, 2]"), "[1, 2]");
    }

    #[test]
    fn fenced_block_is_removed_with_its_content() {
        let text = "You have 2 todos.\n```json\n{\"title\": \"buy milk\"}\n```\nBoth are open.";
        let out = sanitize(text);
        assert!(!out.contains("buy milk"));
        assert!(!out.contains("```"));
        assert!(out.starts_with("You have 2 todos."));
        assert!(out.ends_with("Both are open."));
    }

    #[test]
    fn literal_escaped_newline_fence_is_removed() {
        assert_eq!(
            sanitize(r#"Done. ```json\n{"a": 1}``` Bye"#),
            "Done.  Bye"
        );
    }

    #[test]
    fn fenced_json_only_leaves_nothing() {
        assert_eq!(sanitize("```json\n{\"a\": 1}\n```"), "");
    }

    #[test]
    fn text_around_fence_that_is_an_object_falls_back() {
        assert_eq!(sanitize("{ ```x``` }"), FALLBACK_SUMMARY);
    }

    #[test]
    fn unmatched_fence_is_left_alone() {
        assert_eq!(sanitize("one ``` fence"), "one ``` fence");
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let samples = [
            "plain answer",
            "  padded  ",
            "{\"a\": 1}",
            "a ```b``` c ```d",
            "`````` ``` x ```",
            "``````json\nx```",
            "```\n```\n```",
            "{ ```x``` } tail",
        ];
        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "input: {sample:?}");
        }
    }
}

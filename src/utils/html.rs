// src/utils/html.rs

use std::collections::HashSet;

/// Reduces imported question text to plain text.
///
/// Every tag is stripped; `<script>` and `<style>` lose their content too.
/// Remaining special characters come back entity-escaped, so the stored text
/// is what clients display and what answers are compared against.
pub fn clean_html(input: &str) -> String {
    ammonia::Builder::default()
        .tags(HashSet::new())
        .clean(input.trim())
        .to_string()
}

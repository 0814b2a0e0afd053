use std::collections::BTreeMap;

/// Structured representation of a parsed JSDoc comment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedJsDoc {
    /// Summary text before any tags.
    pub summary: Option<String>,
    /// Tag payloads keyed by tag name; repeated tags are joined with newlines.
    pub tags: BTreeMap<String, String>,
}

impl ParsedJsDoc {
    /// Returns `true` if the comment does not contain any meaningful data.
    pub fn is_empty(&self) -> bool {
        self.summary
            .as_ref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
            && self.tags.is_empty()
    }

    /// Value of `@displayName`, if present.
    pub fn display_name(&self) -> Option<&str> {
        self.tags
            .get("displayName")
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Value of `@default` or `@defaultValue`, if present.
    pub fn default_value(&self) -> Option<&str> {
        self.tags
            .get("default")
            .or_else(|| self.tags.get("defaultValue"))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Parse a JSDoc block (without comment delimiters) into structured data.
///
/// The block is a summary followed by `@tag payload` lines; payloads may
/// continue over following untagged lines.
pub fn parse_jsdoc(raw: &str) -> ParsedJsDoc {
    let mut summary_lines = Vec::new();
    let mut tags: BTreeMap<String, String> = BTreeMap::new();
    let mut current: Option<(String, Vec<String>)> = None;

    for line in normalize_lines(raw) {
        if let Some(rest) = line.strip_prefix('@') {
            if let Some((tag, payload)) = current.take() {
                push_tag(&mut tags, tag, payload);
            }
            let (tag, payload) = split_tag_payload(rest);
            let mut lines = Vec::new();
            if !payload.is_empty() {
                lines.push(payload.to_string());
            }
            current = Some((tag.to_string(), lines));
        } else if let Some((_, payload)) = current.as_mut() {
            if !line.is_empty() || !payload.is_empty() {
                payload.push(line);
            }
        } else {
            summary_lines.push(line);
        }
    }
    if let Some((tag, payload)) = current.take() {
        push_tag(&mut tags, tag, payload);
    }

    ParsedJsDoc {
        summary: compose_summary(summary_lines),
        tags,
    }
}

fn push_tag(tags: &mut BTreeMap<String, String>, tag: String, payload: Vec<String>) {
    if tag.is_empty() {
        return;
    }
    let value = payload.join("\n").trim().to_string();
    tags.entry(tag)
        .and_modify(|existing| {
            if !value.is_empty() {
                if !existing.is_empty() {
                    existing.push('\n');
                }
                existing.push_str(&value);
            }
        })
        .or_insert(value);
}

fn normalize_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            let line = line.trim();
            let line = line.strip_prefix('*').unwrap_or(line);
            line.trim().to_string()
        })
        .collect()
}

fn compose_summary(lines: Vec<String>) -> Option<String> {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = Vec::new();
    for line in lines.into_iter().skip_while(|line| line.is_empty()) {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }
    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n"))
    }
}

fn split_tag_payload(input: &str) -> (&str, &str) {
    let mut parts = input.splitn(2, char::is_whitespace);
    let tag = parts.next().unwrap_or("");
    let payload = parts.next().unwrap_or("").trim();
    (tag, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_and_tags() {
        let parsed = parse_jsdoc(
            "*\n * Primary UI component.\n * Renders a button.\n *\n * @displayName FancyButton\n * @see https://example.com\n ",
        );
        assert_eq!(
            parsed.summary.as_deref(),
            Some("Primary UI component. Renders a button.")
        );
        assert_eq!(parsed.display_name(), Some("FancyButton"));
        assert_eq!(parsed.tags["see"], "https://example.com");
    }

    #[test]
    fn default_tag_variants() {
        assert_eq!(parse_jsdoc("@default 'md'").default_value(), Some("'md'"));
        assert_eq!(parse_jsdoc("@defaultValue 3").default_value(), Some("3"));
        assert_eq!(parse_jsdoc("Just text").default_value(), None);
    }

    #[test]
    fn multiline_tag_payload_and_paragraphs() {
        let parsed = parse_jsdoc("First.\n\nSecond.\n@example\n<Button />\n<Button primary />");
        assert_eq!(parsed.summary.as_deref(), Some("First.\nSecond."));
        assert_eq!(parsed.tags["example"], "<Button />\n<Button primary />");
    }

    #[test]
    fn repeated_tags_are_joined() {
        let parsed = parse_jsdoc("@see one\n@see two");
        assert_eq!(parsed.tags["see"], "one\ntwo");
        assert!(!parsed.is_empty());
        assert!(parse_jsdoc("  ").is_empty());
    }
}

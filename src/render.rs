//! Turning a [`FoundMessage`] into a display-ready HTML fragment.
//!
//! The scanner returns structured data; this module is the only place markup is
//! produced. Codes are wrapped in `<strong>` wherever they occur in text content.
//! Tag markup, comments, and `<style>`/`<script>` blocks are never touched.

use crate::scanner::{FoundMessage, MessageBody};
use regex::Regex;
use std::sync::LazyLock;

/// Markup that must be copied verbatim: style/script blocks, comments, and tags.
static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style\b.*?</style\s*>|<script\b.*?</script\s*>|<!--.*?-->|<[^>]*>")
        .expect("valid regex")
});

/// Renders the fragment shown to the user: subject, date, then the body with codes highlighted.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use streamcode_scan::render::render_fragment;
/// use streamcode_scan::{FoundMessage, MessageBody};
///
/// let found = FoundMessage {
///     uid: 7,
///     subject: "Netflix: Your sign-in code".into(),
///     from: "info@account.netflix.com".into(),
///     date: Utc.with_ymd_and_hms(2025, 10, 14, 10, 30, 0).unwrap(),
///     body: MessageBody::Html("<p>Your code is 482913</p>".into()),
///     codes: vec!["482913".into()],
/// };
///
/// let html = render_fragment(&found);
/// assert!(html.contains("<p>Your code is <strong>482913</strong></p>"));
/// ```
#[must_use]
pub fn render_fragment(found: &FoundMessage) -> String {
    let body = match &found.body {
        MessageBody::Html(html) => highlight_codes(html, &found.codes),
        MessageBody::Text(text) => format!(
            "<pre class=\"mail-text\">{}</pre>",
            highlight_codes(&escape_html(text), &found.codes)
        ),
    };

    format!(
        "<div class=\"mail-result\">\
         <p class=\"mail-subject\">{}</p>\
         <p class=\"mail-date\">{}</p>\
         <div class=\"mail-body\">{body}</div>\
         </div>",
        escape_html(&found.subject),
        found.date.format("%Y-%m-%d %H:%M UTC"),
    )
}

/// Wraps every whole-word occurrence of each code in `<strong>` within text content.
///
/// With no codes the input is returned unchanged.
#[must_use]
pub fn highlight_codes(html: &str, codes: &[String]) -> String {
    if codes.is_empty() {
        return html.to_string();
    }

    let alternation = codes
        .iter()
        .map(|c| regex::escape(c))
        .collect::<Vec<_>>()
        .join("|");
    let Ok(code_re) = Regex::new(&format!(r"\b(?:{alternation})\b")) else {
        return html.to_string();
    };

    let mut out = String::with_capacity(html.len() + codes.len() * 32);
    let mut last = 0;
    for markup in MARKUP.find_iter(html) {
        out.push_str(&code_re.replace_all(&html[last..markup.start()], "<strong>$0</strong>"));
        out.push_str(markup.as_str());
        last = markup.end();
    }
    out.push_str(&code_re.replace_all(&html[last..], "<strong>$0</strong>"));
    out
}

/// Reduces HTML to its visible text: markup replaced by spaces, common entities decoded.
///
/// Plain text passes through unchanged apart from entity decoding.
#[must_use]
pub fn visible_text(html: &str) -> String {
    let text = MARKUP.replace_all(html, " ");
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Escapes text for inclusion in HTML.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn found(body: MessageBody, codes: &[&str]) -> FoundMessage {
        FoundMessage {
            uid: 1,
            subject: "Seu código <Netflix>".into(),
            from: "info@account.netflix.com".into(),
            date: Utc.with_ymd_and_hms(2025, 10, 14, 10, 30, 0).unwrap(),
            body,
            codes: codes.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_highlight_skips_markup() {
        let html = r#"<td data-code="482913" style="x">482913</td><style>.c{color:#482913}</style>"#;
        let out = highlight_codes(html, &["482913".into()]);
        assert_eq!(
            out,
            r#"<td data-code="482913" style="x"><strong>482913</strong></td><style>.c{color:#482913}</style>"#
        );
    }

    #[test]
    fn test_highlight_whole_words_only() {
        let out = highlight_codes("4829 and 48291", &["4829".into()]);
        assert_eq!(out, "<strong>4829</strong> and 48291");
    }

    #[test]
    fn test_highlight_without_codes_is_identity() {
        let html = "<p>Welcome</p>";
        assert_eq!(highlight_codes(html, &[]), html);
    }

    #[test]
    fn test_render_html_body() {
        let out = render_fragment(&found(
            MessageBody::Html("<p>code 4829</p>".into()),
            &["4829"],
        ));
        assert!(out.contains("<p class=\"mail-subject\">Seu código &lt;Netflix&gt;</p>"));
        assert!(out.contains("<p class=\"mail-date\">2025-10-14 10:30 UTC</p>"));
        assert!(out.contains("<p>code <strong>4829</strong></p>"));
    }

    #[test]
    fn test_render_text_body_is_escaped() {
        let out = render_fragment(&found(
            MessageBody::Text("Use <4829> now & then".into()),
            &["4829"],
        ));
        assert!(out.contains(
            "<pre class=\"mail-text\">Use &lt;<strong>4829</strong>&gt; now &amp; then</pre>"
        ));
    }

    #[test]
    fn test_visible_text() {
        let html = "<html><head><style>p{color:#123456}</style></head>\
                    <body><!-- 999999 --><p>Tom&nbsp;&amp;&nbsp;Jerry</p></body></html>";
        let text = visible_text(html);
        assert!(!text.contains("123456"));
        assert!(!text.contains("999999"));
        assert!(text.contains("Tom & Jerry"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}

//! Whitelist sanitizer for annotated recipe HTML.
//!
//! Only `<span>` elements survive, carrying at most `class` and `id`. All
//! other markup is dropped (text content kept, except inside `script` and
//! `style`). The output is rebuilt from scratch, so every tag in it was
//! emitted here and every text run is escaped. Character references are
//! decoded against the full HTML5 table; unknown `&name;` references pass
//! through verbatim.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<!--.*?(?:-->|\z)|<(/?)([A-Za-z][A-Za-z0-9:-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#,
    )
    .expect("valid markup regex")
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("valid attribute regex")
});

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
        .expect("valid entity regex")
});

const ALLOWED_TAG: &str = "span";
const ALLOWED_ATTRS: [&str; 2] = ["class", "id"];
const RAW_TEXT_TAGS: [&str; 5] = ["script", "style", "template", "iframe", "noscript"];

pub fn sanitize_annotated_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut open_spans = 0usize;
    let mut skip_until: Option<String> = None;
    let mut cursor = 0;

    for caps in MARKUP_RE.captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        if skip_until.is_none() {
            push_text(&mut out, &html[cursor..whole.start()]);
        }
        cursor = whole.end();

        // Comment
        let Some(name) = caps.get(2) else { continue };
        let name = name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());

        if let Some(raw) = &skip_until {
            if closing && *raw == name {
                skip_until = None;
            }
            continue;
        }

        if RAW_TEXT_TAGS.contains(&name.as_str()) {
            if !closing {
                skip_until = Some(name);
            }
            continue;
        }

        if name != ALLOWED_TAG {
            continue;
        }

        if closing {
            if open_spans > 0 {
                out.push_str("</span>");
                open_spans -= 1;
            }
            continue;
        }

        let attrs = caps.get(3).map_or("", |m| m.as_str());
        out.push_str(&span_open_tag(attrs));
        if attrs.trim_end().ends_with('/') {
            out.push_str("</span>");
        } else {
            open_spans += 1;
        }
    }

    if skip_until.is_none() {
        push_text(&mut out, &html[cursor..]);
    }
    for _ in 0..open_spans {
        out.push_str("</span>");
    }
    out
}

fn span_open_tag(attrs: &str) -> String {
    let mut kept: Vec<(&str, &str)> = Vec::new();
    for caps in ATTR_RE.captures_iter(attrs) {
        let name = caps[1].to_ascii_lowercase();
        let Some(&allowed) = ALLOWED_ATTRS.iter().find(|a| **a == name) else {
            continue;
        };
        if kept.iter().any(|(n, _)| *n == allowed) {
            continue;
        }
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        kept.push((allowed, value));
    }
    kept.sort_by_key(|(name, _)| ALLOWED_ATTRS.iter().position(|a| a == name));

    let mut tag = String::from("<span");
    for (name, value) in kept {
        tag.push(' ');
        tag.push_str(name);
        tag.push_str("=\"");
        tag.push_str(&reencode(value, escape_attr));
        tag.push('"');
    }
    tag.push('>');
    tag
}

fn push_text(out: &mut String, raw: &str) {
    if !raw.is_empty() {
        out.push_str(&reencode(raw, escape_text));
    }
}

/// Decode known references and escape the result; unknown references are
/// kept as written so they are never escaped twice.
fn reencode(raw: &str, escape: fn(&str) -> String) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut cursor = 0;
    for reference in ENTITY_RE.find_iter(raw) {
        out.push_str(&escape(&raw[cursor..reference.start()]));
        match decode_reference(reference.as_str()) {
            Some(decoded) => out.push_str(&escape(&decoded)),
            None => out.push_str(reference.as_str()),
        }
        cursor = reference.end();
    }
    out.push_str(&escape(&raw[cursor..]));
    out
}

/// Decode character references for display. Unknown named references are
/// left as-is.
pub fn decode_entities(raw: &str) -> String {
    ENTITY_RE
        .replace_all(raw, |caps: &Captures| {
            decode_reference(&caps[0]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// A whole reference decodes to one or two code points. Anything longer means
/// only a legacy prefix such as `&not` matched, so the reference is unknown.
fn decode_reference(reference: &str) -> Option<String> {
    let decoded = html_escape::decode_html_entities(reference);
    (decoded != reference && decoded.chars().count() <= 2).then(|| decoded.into_owned())
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    escape_text(value)
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_spans_with_class_and_id() {
        let html = r#"Add <span class="unit" id="u1">2 cups</span> of flour"#;
        assert_eq!(sanitize_annotated_html(html), html);
    }

    #[test]
    fn drops_disallowed_attributes() {
        let html = r#"<span onclick="steal()" ID='u1' style="color:red" class=unit>2 cups</span>"#;
        assert_eq!(
            sanitize_annotated_html(html),
            r#"<span class="unit" id="u1">2 cups</span>"#
        );
    }

    #[test]
    fn strips_other_tags_but_keeps_their_text() {
        let html = r#"<p>Mix <b>well</b><br/> then <a href="javascript:x">bake</a></p>"#;
        assert_eq!(sanitize_annotated_html(html), "Mix well then bake");
    }

    #[test]
    fn drops_script_and_style_content() {
        let html = "a<script>alert('x')</script>b<STYLE>p{}</STYLE>c<!-- note -->d";
        assert_eq!(sanitize_annotated_html(html), "abcd");
    }

    #[test]
    fn unterminated_script_swallows_the_rest() {
        assert_eq!(sanitize_annotated_html("ok<script>alert(1)"), "ok");
    }

    #[test]
    fn escapes_stray_markup_characters() {
        assert_eq!(
            sanitize_annotated_html("1 < 2 & 3 > 2 <img src=x onerror=y"),
            "1 &lt; 2 &amp; 3 &gt; 2 &lt;img src=x onerror=y"
        );
    }

    #[test]
    fn does_not_double_escape_entities() {
        assert_eq!(
            sanitize_annotated_html("salt &amp; pepper &lt;b&gt; &frac12; cup"),
            "salt &amp; pepper &lt;b&gt; ½ cup"
        );
    }

    #[test]
    fn decodes_the_full_named_reference_table() {
        let html = r#"Grandma&rsquo;s <span class="unit" id="u1">&frac13; cup</span> &ndash; stir &times;2, &frac18; tsp"#;
        assert_eq!(
            sanitize_annotated_html(html),
            r#"Grandma’s <span class="unit" id="u1">⅓ cup</span> – stir ×2, ⅛ tsp"#
        );
        assert_eq!(decode_entities("&#8531; &#x2153; &frac13;"), "⅓ ⅓ ⅓");
    }

    #[test]
    fn unknown_references_are_kept_verbatim() {
        let html = "stir &notarealentity; well <span id=\"u1\" class=\"a&bogusref;b\">1 cup</span>";
        let once = sanitize_annotated_html(html);
        assert_eq!(
            once,
            "stir &notarealentity; well <span class=\"a&bogusref;b\" id=\"u1\">1 cup</span>"
        );
        assert_eq!(sanitize_annotated_html(&once), once);
        assert_eq!(decode_entities("&notarealentity;"), "&notarealentity;");
    }

    #[test]
    fn escaped_ampersand_before_a_name_stays_literal() {
        assert_eq!(sanitize_annotated_html("&amp;frac13;"), "&amp;frac13;");
    }

    #[test]
    fn attribute_values_cannot_break_out() {
        let html = r#"<span id="u1&quot; onclick=&quot;x">t</span>"#;
        assert_eq!(
            sanitize_annotated_html(html),
            r#"<span id="u1&quot; onclick=&quot;x">t</span>"#
        );
    }

    #[test]
    fn balances_span_tags() {
        assert_eq!(
            sanitize_annotated_html("</span>a<span id=\"u1\">b"),
            "a<span id=\"u1\">b</span>"
        );
    }

    #[test]
    fn sanitizing_twice_is_stable() {
        let once = sanitize_annotated_html(r#"<div><span id=u1 class="q">2 &amp; 3</span><i>x</i></div>"#);
        assert_eq!(sanitize_annotated_html(&once), once);
    }
}

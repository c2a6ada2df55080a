//! HTML-to-markdown conversion for section content.

use regex::Regex;
use std::sync::LazyLock;

static HEADER_OPEN_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    (1..=6)
        .map(|level| {
            Regex::new(&format!(r"(?i)<h{level}\s*[^>]*>")).expect("header open regex")
        })
        .collect()
});
static STRONG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<strong[^>]*>([^<]*)</strong>").expect("STRONG_RE"));
static B_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<b[^>]*>([^<]*)</b>").expect("B_RE"));
static EM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<em[^>]*>([^<]*)</em>").expect("EM_RE"));
static I_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<i[^>]*>([^<]*)</i>").expect("I_RE"));
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a[^>]*href=["']([^"']+)["'][^>]*>([^<]*)</a>"#).expect("LINK_RE")
});
static IMG_SRC_ALT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img[^>]*src=["']([^"']+)["'][^>]*alt=["']([^"']*)["'][^>]*/?>"#)
        .expect("IMG_SRC_ALT_RE")
});
static IMG_ALT_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img[^>]*alt=["']([^"']*)["'][^>]*src=["']([^"']+)["'][^>]*/?>"#)
        .expect("IMG_ALT_SRC_RE")
});
static P_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<p[^>]*>").expect("P_OPEN_RE"));
static BR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("BR_RE"));
static LI_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<li[^>]*>").expect("LI_RE"));
static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?[uo]l[^>]*>").expect("LIST_RE"));
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<code[^>]*>([^<]*)</code>").expect("CODE_RE"));
static PRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<pre[^>]*>([^<]*)</pre>").expect("PRE_RE"));
static BLOCKQUOTE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<blockquote[^>]*>").expect("BLOCKQUOTE_OPEN_RE"));
static ANY_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("ANY_TAG_RE"));
static MULTI_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("MULTI_SPACE_RE"));
static MULTI_BLANK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("MULTI_BLANK_RE"));

/// Convert a chunk of structural HTML into markdown. Lossy by design: layout
/// markup disappears, headings, emphasis, links, lists, and code survive.
pub fn html_to_markdown(html: &str) -> String {
    let mut result = html.to_string();

    for level in 1..=6 {
        let hashes = "#".repeat(level);
        let close = format!("</h{}>", level);
        result = HEADER_OPEN_RES[level - 1]
            .replace_all(&result, format!("\n\n{} ", hashes))
            .to_string();
        result = result.replace(&close, "\n\n");
    }

    result = STRONG_RE.replace_all(&result, "**$1**").to_string();
    result = B_RE.replace_all(&result, "**$1**").to_string();
    result = EM_RE.replace_all(&result, "*$1*").to_string();
    result = I_RE.replace_all(&result, "*$1*").to_string();
    result = LINK_RE.replace_all(&result, "[$2]($1)").to_string();
    result = IMG_SRC_ALT_RE.replace_all(&result, "![$2]($1)").to_string();
    result = IMG_ALT_SRC_RE.replace_all(&result, "![$1]($2)").to_string();
    result = P_OPEN_RE.replace_all(&result, "\n\n").to_string();
    result = result.replace("</p>", "\n\n");
    result = BR_RE.replace_all(&result, "\n").to_string();
    result = LI_RE.replace_all(&result, "\n- ").to_string();
    result = result.replace("</li>", "");
    result = LIST_RE.replace_all(&result, "\n").to_string();
    result = CODE_RE.replace_all(&result, "`$1`").to_string();
    result = PRE_RE.replace_all(&result, "\n```\n$1\n```\n").to_string();
    result = BLOCKQUOTE_OPEN_RE.replace_all(&result, "\n> ").to_string();
    result = result.replace("</blockquote>", "\n");
    result = ANY_TAG_RE.replace_all(&result, "").to_string();
    result = decode_entities(&result);
    result = MULTI_SPACE_RE.replace_all(&result, " ").to_string();

    // Trim per line, then cap blank runs so paragraphs stay separated
    let result = result
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    MULTI_BLANK_RE
        .replace_all(&result, "\n\n")
        .trim()
        .to_string()
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

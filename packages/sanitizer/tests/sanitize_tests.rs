//! Integration tests for the sanitizer crate

use berry_sanitizer::{sanitize, sanitize_fallback, SanitizeMode, Sanitizer};

const HOSTILE: &[&str] = &[
    "<p>hi</p><script>alert(1)</script>",
    "<img src=x onerror=alert(1)>",
    "<a href=\"javascript:alert(1)\">x</a>",
    "<a href=\" JaVaScRiPt:alert(1)\">x</a>",
    "<a href=\"java&#x09;script:alert(1)\">x</a>",
    "<svg><script>alert(1)</script></svg>",
    "<iframe src=\"https://evil.test\"></iframe>",
    "<p style=\"background-image: url(javascript:alert(1))\">x</p>",
    "<div onmouseover=\"x()\">y</div>",
    "<math><mi xlink:href=\"javascript:alert(1)\">x</mi></math>",
    "<<script>script>alert(1)<</script>/script>",
    "<img src=\"data:text/html;base64,PHNjcmlwdD4=\">",
];

fn assert_inert(output: &str) {
    let lowered = output.to_ascii_lowercase();
    assert!(!lowered.contains("<script"), "script survived: {output}");
    assert!(!lowered.contains("javascript:"), "javascript url survived: {output}");
    assert!(!lowered.contains(" on"), "handler survived: {output}");
    assert!(!lowered.contains("<iframe"), "iframe survived: {output}");
    assert!(!lowered.contains("<svg"), "svg survived: {output}");
}

#[test]
fn test_hostile_inputs_are_inert() {
    for input in HOSTILE {
        assert_inert(&sanitize(input));
        assert_inert(&sanitize_fallback(input));
    }
}

#[test]
fn test_sanitize_is_idempotent() {
    let inputs = [
        "<p>plain</p>",
        "<h4>small heading</h4><p>1 &lt; 2 &amp;&amp; 3 &gt; 2</p>",
        "<ul><li>one<ul><li>nested</li></ul></li></ul>",
        "<p><span style=\"color:RED;font-size:14PX\">x</span><b>y</b></p>",
        "<table><tr><td style=\"border:1px solid black\">a</td></tr></table>",
        "<p>unclosed <em>emphasis",
        "<a href=\"https://x.test\" target=\"_blank\">link</a>",
        "<figure data-berry-attachment-id=\"a1\"><img src=\"blob:https://x/1\" style=\"width:50%\"><figcaption>c</figcaption></figure>",
    ];

    for input in inputs {
        let once = sanitize(input);
        assert_eq!(sanitize(&once), once, "tree sanitizer not idempotent for {input}");

        let once = sanitize_fallback(input);
        assert_eq!(
            sanitize_fallback(&once),
            once,
            "fallback sanitizer not idempotent for {input}"
        );
    }
}

#[test]
fn test_modes_agree_on_clean_markup() {
    let clean = "<p style=\"text-align: center\">a <strong>b</strong> <a href=\"https://x.test\">c</a></p>";
    let tree = Sanitizer::with_mode(SanitizeMode::Tree).sanitize(clean);
    let fallback = Sanitizer::with_mode(SanitizeMode::Fallback).sanitize(clean);
    assert_eq!(tree, clean);
    assert_eq!(fallback, clean);
}

#[test]
fn test_report_serializes_camel_case() {
    let (_, report) = Sanitizer::new().sanitize_with_report("<p onclick=\"x\">a</p>");
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["removedAttributes"][0], "onclick");
}

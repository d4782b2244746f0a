//! Round-trip tests: parse → serialize → parse is stable

use berry_document::{
    create_empty_document, document_from_html, document_to_html, parse_html, serialize_html,
    BlockNode, EditorDocument,
};

const SAMPLES: &[&str] = &[
    "",
    "plain text",
    "<p>Hello <strong>bold</strong> and <em>italic <u>under</u></em></p>",
    "<h1>Title</h1><h3 style=\"text-align: right\">Sub</h3><p>Body</p>",
    "<blockquote><p>one</p><p>two</p></blockquote>",
    "<ul><li>a</li><li>b<ol><li>nested</li></ol></li></ul><p>after</p><ul><li>c</li></ul>",
    "<p style=\"line-height: 1.5; font-size: 18px; font-family: 'Open Sans', Arial\">typed</p>",
    "<p><span style=\"color: rgb(0, 128, 0); background-color: #ff0\">green</span> <mark>hl</mark></p>",
    "<p><a href=\"https://x.test\" target=\"_blank\">new tab</a> <a href=\"/rel\">same</a></p>",
    "<p>line<br>break<br></p>",
    "<p>a &amp; b &lt; c&nbsp;d</p>",
    "<hr style=\"text-align: center\"><p>x</p>",
    "<table style=\"border-collapse: collapse\"><tr><th style=\"border: 1px solid black\">H</th>\
     <td colspan=\"2\" style=\"text-align: center\"><p>a</p><p><b>b</b></p></td></tr>\
     <tr><td></td><td>x<br>y</td></tr></table>",
    "<p>see <figure data-berry-attachment-id=\"att-1\" data-berry-filename=\"a.png\" \
     data-berry-filesize=\"1024\" data-berry-content-type=\"image/png\" data-berry-align=\"center\" \
     data-berry-wrap=\"true\" data-berry-wrap-side=\"right\" style=\"padding: 4px\">\
     <a href=\"https://x.test\"><img src=\"https://cdn.test/a.png\" alt=\"A\" height=\"40\" style=\"width: 240px\"></a>\
     <figcaption>Cap</figcaption></figure> done</p>",
    "<p><img data-berry-attachment-id=\"att-2\" src=\"blob:https://x/1\" style=\"width: 50%\"></p>",
    "<figure data-berry-attachment-id=\"att-3\" data-berry-pending=\"true\" data-berry-progress=\"40\"></figure>",
    "<p><a data-berry-attachment-id=\"f-1\" href=\"https://x.test/r.pdf\" data-berry-content-type=\"application/pdf\">r.pdf</a></p>",
    "<div><p>nested</p>tail</div><section>unknown</section>",
    "<p><img src=\"https://x.test/pasted.png\"></p>",
];

#[test]
fn test_parse_serialize_parse_is_stable() {
    for sample in SAMPLES {
        let first = parse_html(sample);
        let html = serialize_html(&first);
        let second = parse_html(&html);
        assert_eq!(second, first, "round trip changed the model for {sample}\nserialized: {html}");
    }
}

#[test]
fn test_serialized_output_is_sanitizer_stable() {
    for sample in SAMPLES {
        let html = serialize_html(&parse_html(sample));
        assert_eq!(berry_sanitizer::sanitize(&html), html, "sanitizer rewrote {html}");
    }
}

#[test]
fn test_never_zero_blocks() {
    for sample in ["", "<br>", "<!-- c -->", "<ul></ul>", "<table></table>"] {
        let doc = document_from_html(sample);
        assert!(!doc.blocks.is_empty(), "{sample} produced no blocks");
    }
    assert_eq!(document_to_html(&create_empty_document()), "<p></p>");
}

#[test]
fn test_json_round_trip() {
    let doc = parse_html(SAMPLES[13]);
    let json = doc.to_json().unwrap();
    assert_eq!(EditorDocument::from_json(&json).unwrap(), doc);
}

#[test]
fn test_hostile_markup_never_reaches_the_model() {
    let doc = parse_html("<p onclick=\"x\">a<script>alert(1)</script><a href=\"javascript:x\">b</a></p>");
    let html = serialize_html(&doc);
    assert_eq!(html, "<p>ab</p>");
    assert!(matches!(doc.blocks[0], BlockNode::Text(_)));
}

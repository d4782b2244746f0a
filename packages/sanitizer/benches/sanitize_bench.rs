use berry_sanitizer::{sanitize, sanitize_fallback};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn pasted_document() -> String {
    let block = r#"
        <div class="MsoNormal" style="margin: 0; font-family: Calibri; color: rgb(34, 34, 34)">
            <span style="font-size: 14px; mso-bidi-font-size: 11pt">Quarterly <b>numbers</b></span>
            <a href="https://example.com/report" target="_blank" onclick="track()">report</a>
            <img src="https://cdn.example.com/chart.png" style="width: 320px; border: 2px" onerror="x()">
            <!-- [if gte mso 9]><xml></xml><![endif] -->
            <script>window.evil = true</script>
        </div>
        <table style="border-collapse: collapse"><tr><td style="border: 1px solid black">a</td><td>b</td></tr></table>
    "#;
    block.repeat(50)
}

fn sanitize_tree(c: &mut Criterion) {
    let source = pasted_document();
    c.bench_function("sanitize_tree", |b| b.iter(|| sanitize(black_box(&source))));
}

fn sanitize_regex_fallback(c: &mut Criterion) {
    let source = pasted_document();
    c.bench_function("sanitize_fallback", |b| {
        b.iter(|| sanitize_fallback(black_box(&source)))
    });
}

criterion_group!(benches, sanitize_tree, sanitize_regex_fallback);
criterion_main!(benches);

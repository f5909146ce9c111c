use adapdict_rs::{SearchMode, classify, present};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serde_json::{Value, json};

fn sentence_card(index: usize) -> Value {
    json!({
        "sentence": {
            "l2_sentence": format!("Sentence number {index} <with> markup & entities."),
            "l2_lang": "en",
            "l1_lang": "ko",
            "main_l1_sentence": format!("{index}번째 문장입니다."),
            "sentence_explanation_l1": "설명\n두 번째 줄"
        },
        "l2_focus_sentence": "with markup",
        "word_explanations": [{
            "l2_word": "markup",
            "meaning_l1": "마크업",
            "examples": [{"source_sentence": "Escape the markup.", "target_sentence": "마크업을 이스케이프하라."}]
        }]
    })
}

fn paragraph(cards: usize) -> Value {
    let cards: Vec<Value> = (0..cards).map(sentence_card).collect();
    json!({
        "query_analysis": {"status": "VALID", "reason_l1": ""},
        "l2_paragraph": "First. Second. Third.",
        "l2_lang": "en",
        "l1_lang": "ko",
        "paragraph_l1_translation": "첫째. 둘째. 셋째.",
        "sentence_cards": cards
    })
}

fn word_dict(variants: usize) -> Value {
    let variants: Vec<Value> = (0..variants)
        .map(|i| json!({"target_text": format!("뜻 {i}"), "explanation": "**강조** 설명", "alternatives": ["a", "b"]}))
        .collect();
    json!({"entries": [{"source_text": "apple", "source_lang": "en", "target_lang": "ko", "variants": variants}]})
}

fn bench_classify(c: &mut Criterion) {
    let documents = [
        ("word_dict", word_dict(4)),
        ("paragraph", paragraph(8)),
        ("fallback", json!({"result": "plain"})),
    ];
    for (label, document) in &documents {
        c.bench_with_input(BenchmarkId::new("classify", label), document, |b, document| {
            b.iter(|| black_box(classify(document, SearchMode::Dictionary)));
        });
    }
}

fn bench_render(c: &mut Criterion) {
    for cards in [1usize, 8, 32] {
        let document = paragraph(cards);
        c.bench_with_input(BenchmarkId::new("render_paragraph", cards), &document, |b, document| {
            b.iter(|| black_box(present(document, SearchMode::Dictionary)));
        });
    }
    let document = word_dict(16);
    c.bench_function("render_word_dict_16", |b| {
        b.iter(|| black_box(present(&document, SearchMode::Dictionary)));
    });
}

criterion_group!(benches, bench_classify, bench_render);
criterion_main!(benches);

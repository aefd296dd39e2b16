//! Sequencing over the wire-ingestion path: parse, normalize, order.

use rand::rngs::StdRng;
use rand::SeedableRng;

use testlock_core::question::{sequence, QuestionKind};
use testlock_core::wire::{normalize_questions, parse_questions};

fn batch_json() -> &'static str {
    r#"[
        {"_id": "essay-1", "query": "Discuss A", "test_id": "t1", "type": "PARAGRAPH", "dur_millis": 0},
        {"_id": "mcq-1", "query": "Pick A", "test_id": "t1", "type": "MCQ", "dur_millis": 30000,
         "options": ["one", {"text": "two"}]},
        {"_id": "short-1", "query": "Name A", "test_id": "t1", "type": "SHORT", "dur_millis": 20000},
        {"_id": "gobj-1", "query": "Fill A", "test_id": "t1", "type": "G_OBJ", "dur_millis": 15000},
        {"_id": "essay-2", "query": "Discuss B", "test_id": "t1", "type": "PARAGRAPH", "dur_millis": 0},
        {"_id": "mcq-2", "query": "Pick B", "test_id": "t1", "type": "MCQ", "dur_millis": 30000,
         "options": ["three", "four"]},
        {"_id": "short-2", "query": "Name B", "test_id": "t1", "type": "SHORT", "dur_millis": 20000},
        {"_id": "gobj-2", "query": "Fill B", "test_id": "t1", "type": "G_OBJ", "dur_millis": 15000}
    ]"#
}

#[test]
fn mixed_batch_sequences_into_category_blocks() {
    let questions = normalize_questions(parse_questions(batch_json()).unwrap()).unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let ordered = sequence(questions, &mut rng);

    let kinds: Vec<QuestionKind> = ordered.iter().map(|q| q.kind).collect();
    assert_eq!(
        kinds,
        vec![
            QuestionKind::MultipleChoice,
            QuestionKind::MultipleChoice,
            QuestionKind::GeneralObjective,
            QuestionKind::GeneralObjective,
            QuestionKind::ShortText,
            QuestionKind::ShortText,
            QuestionKind::LongForm,
            QuestionKind::LongForm,
        ]
    );

    // MCQ options normalized to plain strings either way they arrived.
    assert!(ordered[0].choices.iter().all(|c| !c.is_empty()));
    // Untimed essays carry no duration.
    assert!(ordered[6].is_untimed() && ordered[7].is_untimed());
}

#[test]
fn every_question_survives_sequencing() {
    let questions = normalize_questions(parse_questions(batch_json()).unwrap()).unwrap();
    let mut expected: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
    expected.sort_unstable();

    for seed in 0..16 {
        let mut rng = StdRng::seed_from_u64(seed);
        let ordered = sequence(questions.clone(), &mut rng);
        let mut ids: Vec<String> = ordered.iter().map(|q| q.id.clone()).collect();
        ids.sort_unstable();
        assert_eq!(ids, expected, "seed {seed}");
    }
}

#[test]
fn unknown_kind_tags_sort_with_long_form() {
    let raw = r#"[
        {"_id": "x1", "query": "Mystery", "test_id": "t1", "type": "ESSAY_V2", "dur_millis": 0},
        {"_id": "m1", "query": "Pick", "test_id": "t1", "type": "MCQ", "dur_millis": 10000}
    ]"#;
    let questions = normalize_questions(parse_questions(raw).unwrap()).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let ordered = sequence(questions, &mut rng);
    assert_eq!(ordered[0].id, "m1");
    assert_eq!(ordered[1].kind, QuestionKind::LongForm);
}

#[test]
fn malformed_entry_rejects_the_whole_batch() {
    let raw = r#"[
        {"_id": "ok", "query": "Fine", "test_id": "t1", "type": "SHORT", "dur_millis": 1000},
        {"_id": "bad", "query": "   ", "test_id": "t1", "type": "SHORT", "dur_millis": 1000}
    ]"#;
    assert!(normalize_questions(parse_questions(raw).unwrap()).is_err());
}

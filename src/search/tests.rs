use super::*;

fn candidates(pairs: &[(&str, &[f32])]) -> Vec<(String, Vec<f32>)> {
    pairs
        .iter()
        .map(|(id, v)| (id.to_string(), v.to_vec()))
        .collect()
}

#[test]
fn self_similarity_is_one() {
    let vectors: Vec<Vec<f32>> = vec![
        vec![1.0, 0.0, 0.0],
        vec![0.3, -0.8, 0.5],
        vec![100.0, 200.0, -50.0],
    ];

    for v in vectors {
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6, "self similarity was {}", sim);
    }
}

#[test]
fn zero_vector_similarity_is_zero() {
    let zero = vec![0.0, 0.0, 0.0];
    let other = vec![1.0, 2.0, 3.0];
    assert_eq!(cosine_similarity(&zero, &other), 0.0);
    assert_eq!(cosine_similarity(&other, &zero), 0.0);
}

#[test]
fn normalize_three_four_five() {
    let normalized = normalize(&[3.0, 4.0]);
    assert!((normalized[0] - 0.6).abs() < 1e-6);
    assert!((normalized[1] - 0.8).abs() < 1e-6);

    let length: f32 = normalized.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((length - 1.0).abs() < 1e-6);
}

#[test]
fn normalize_zero_vector_is_unchanged() {
    assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
}

#[test]
fn ranks_by_descending_similarity() {
    let candidates = candidates(&[
        ("a", &[1.0, 0.0, 0.0]),
        ("b", &[0.0, 1.0, 0.0]),
        ("c", &[0.7, 0.7, 0.0]),
    ]);

    let results = search(&[1.0, 0.0, 0.0], &candidates, 2);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "a");
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert_eq!(results[1].id, "c");
    assert!((results[1].score - 0.707).abs() < 1e-3);
}

#[test]
fn returns_at_most_top_k() {
    let candidates = candidates(&[
        ("a", &[1.0, 0.0]),
        ("b", &[0.9, 0.1]),
        ("c", &[0.8, 0.2]),
    ]);

    assert_eq!(search(&[1.0, 0.0], &candidates, 2).len(), 2);
    assert_eq!(search(&[1.0, 0.0], &candidates, 10).len(), 3);
    assert!(search(&[1.0, 0.0], &candidates, 0).is_empty());
}

#[test]
fn results_sorted_with_no_duplicates() {
    let candidates = candidates(&[
        ("a", &[0.5, 0.5]),
        ("b", &[1.0, 0.0]),
        ("c", &[0.0, 1.0]),
        ("d", &[0.9, 0.1]),
    ]);

    let results = search(&[1.0, 0.0], &candidates, 4);

    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let mut ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), results.len());
}

#[test]
fn ties_keep_candidate_order() {
    // b and c are identical, so they tie exactly; stable sort keeps b first.
    let candidates = candidates(&[
        ("a", &[1.0, 0.0]),
        ("b", &[0.0, 1.0]),
        ("c", &[0.0, 1.0]),
    ]);

    let results = search(&[1.0, 0.0], &candidates, 3);
    assert_eq!(results[0].id, "a");
    assert_eq!(results[1].id, "b");
    assert_eq!(results[2].id, "c");
}

#[test]
fn dimension_mismatch_skips_candidate_only() {
    let candidates = candidates(&[
        ("good", &[1.0, 0.0, 0.0]),
        ("short", &[1.0, 0.0]),
        ("long", &[1.0, 0.0, 0.0, 0.0]),
        ("also_good", &[0.5, 0.5, 0.0]),
    ]);

    let results = search(&[1.0, 0.0, 0.0], &candidates, 10);

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["good", "also_good"]);
}

#[test]
fn empty_query_returns_nothing() {
    let candidates = candidates(&[("a", &[1.0, 0.0])]);
    assert!(search(&[], &candidates, 5).is_empty());
}

#[test]
fn magnitude_does_not_affect_ranking() {
    // Cosine is direction-only, so a scaled copy of the query outranks a
    // closer-by-magnitude but differently-oriented vector.
    let candidates = candidates(&[
        ("scaled", &[10.0, 0.0]),
        ("near", &[0.8, 0.6]),
    ]);

    let results = search(&[1.0, 0.0], &candidates, 2);
    assert_eq!(results[0].id, "scaled");
    assert!((results[0].score - 1.0).abs() < 1e-6);
}

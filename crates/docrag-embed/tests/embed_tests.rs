use docrag_core::config::EmbeddingSettings;
use docrag_core::traits::Embedder;
use docrag_core::Error;
use docrag_embed::{get_default_embedder, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn hash_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { use_fake: true, fake_dim: 64, ..Default::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embedder.dim(), 64);
    assert_eq!(embs[0].len(), 64);

    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in embs[0].iter().zip(embs[1].iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn blank_texts_produce_no_vector() {
    let embedder = HashEmbedder::new(32);
    let texts = vec!["pump".to_string(), "   ".to_string(), String::new(), "valve".to_string()];
    assert_eq!(embedder.embed_batch(&texts).unwrap().len(), 2);
}

#[test]
fn shared_words_are_closer_than_unrelated_text() {
    let embedder = HashEmbedder::new(384);
    let query = embedder.embed_text("hydraulic pressure relief valve");
    let related = embedder.embed_text("Inspect the Hydraulic pressure relief valve monthly.");
    let unrelated = embedder.embed_text("cabin lighting and seat upholstery");
    assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    assert!(cosine(&query, &related) > 0.3);
}

#[test]
fn missing_model_dir_is_a_configuration_error() {
    let settings = EmbeddingSettings { model_dir: Some("/definitely/not/here".into()), ..Default::default() };
    assert!(matches!(get_default_embedder(&settings), Err(Error::Configuration(_))));
}

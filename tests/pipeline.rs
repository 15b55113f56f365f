use std::io::Cursor;
use std::path::PathBuf;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};

use ferrite_face::dataset::read_dir_samples;
use ferrite_face::engine::{CompileConfig, FitConfig, ModelSpec, OptimizerConfig};
use ferrite_face::{
    assemble, decode, normalize, CancelToken, Gender, HostEngine, ImageConfig, PipelineConfig,
    PipelineError, Race, Session,
};

fn encode(width: u32, height: u32, rgb: [u8; 3], format: ImageOutputFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(rgb));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut out, format).unwrap();
    out.into_inner()
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ferrite-face-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn small_config(epochs: usize) -> PipelineConfig {
    let image = ImageConfig { width: 16, height: 16 };
    PipelineConfig {
        model: ModelSpec::face_default(&image),
        image,
        sample_limit: 100,
        compile: CompileConfig {
            optimizer: OptimizerConfig::Sgd { learning_rate: 0.5 },
            ..CompileConfig::default()
        },
        fit: FitConfig { epochs, batch_size: 4, validation_split: 0.25 },
    }
}

#[test]
fn directory_to_prediction() {
    let dir = scratch_dir("e2e");
    for i in 0..8 {
        let bytes = encode(20 + i, 24, [200, 120, 40], ImageOutputFormat::Png);
        std::fs::write(dir.join(format!("40_0_1_{i}.png")), bytes).unwrap();
    }
    std::fs::write(dir.join("40_0_1_j.jpg"), encode(32, 32, [10, 10, 10], ImageOutputFormat::Jpeg(90))).unwrap();
    std::fs::write(dir.join("readme.png"), encode(4, 4, [0, 0, 0], ImageOutputFormat::Png)).unwrap();

    let samples = read_dir_samples(&dir).unwrap();
    assert_eq!(samples.len(), 10);

    let session = Session::new(HostEngine::new(), small_config(40));
    let run = session.train(samples, CancelToken::new()).unwrap();
    assert_eq!(run.samples(), 9);
    assert_eq!(run.dropped(), 1);

    let summary = run.finish().unwrap();
    assert_eq!(summary.epochs_completed, 40);
    assert!(!summary.was_cancelled);
    assert!(session.has_model());
    assert!(session.status().starts_with("Training complete"));

    let face = encode(50, 70, [90, 90, 90], ImageOutputFormat::Png);
    let prediction = session.predict(&face).unwrap();
    assert_eq!(prediction.age, 40);
    assert_eq!(prediction.gender, Gender::Male);
    assert_eq!(prediction.race, Race::Black);
    assert_eq!(session.engine().live_tensors(), 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn assembled_batch_matches_normalized_images() {
    let engine = HostEngine::new();
    let config = ImageConfig { width: 4, height: 4 };
    let samples = vec![
        ferrite_face::RawSample::new("1_0_0.png", encode(4, 4, [255, 0, 0], ImageOutputFormat::Png)),
        ferrite_face::RawSample::new("99_1_4.png", encode(9, 3, [0, 0, 255], ImageOutputFormat::Png)),
    ];

    let batch = assemble(&engine, samples, 100, &config).unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(engine.live_tensors(), 2);

    use ferrite_face::Engine;
    let xs = engine.extract_values(&batch.xs).unwrap();
    let ys = engine.extract_values(&batch.ys).unwrap();
    assert_eq!(xs.len(), 2 * 4 * 4 * 3);
    assert_eq!(&xs[..3], &[1.0, 0.0, 0.0]);
    // Second sample was resized from 9x3, so allow one quantization step.
    for (got, want) in xs[48..51].iter().zip([0.0, 0.0, 1.0]) {
        assert!((got - want).abs() <= 1.0 / 255.0, "{got} vs {want}");
    }
    assert_eq!(decode(&ys[..8]).unwrap().age, 1);
    assert_eq!(decode(&ys[8..]).unwrap().race, Race::Others);

    drop(batch);
    assert_eq!(engine.live_tensors(), 0);
}

#[test]
fn corrupt_image_fails_training_and_leaves_session_idle() {
    let session = Session::new(HostEngine::new(), small_config(3));
    let samples = vec![
        ferrite_face::RawSample::new("20_1_0.png", encode(8, 8, [1, 1, 1], ImageOutputFormat::Png)),
        ferrite_face::RawSample::new("21_1_0.png", b"definitely not an image".to_vec()),
    ];

    match session.train(samples, CancelToken::new()) {
        Err(PipelineError::Decode(_)) => {}
        other => panic!("expected a decode error, got {:?}", other.map(|r| r.samples())),
    }
    assert!(!session.is_busy());
    assert!(!session.has_model());
    assert!(session.status().starts_with("Error"));
    assert_eq!(session.engine().live_tensors(), 0);
}

#[test]
fn normalize_rejects_garbage() {
    assert!(matches!(normalize(b"GIF89a?"), Err(PipelineError::Decode(_))));
}

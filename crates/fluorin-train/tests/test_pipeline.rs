use fluorin_plms::EncoderKind;
use candle_core::Device;
use fluorin_test_data::{FluorescenceSplits, TestFile};
use fluorin_train::{
    load_splits, pipeline, read_split, select_best, DataConfig, DatasetSource, TrainingArgs,
    TrainingConfig,
};
use std::path::Path;

fn one_hot_config(splits: &FluorescenceSplits, output_root: &std::path::Path) -> TrainingConfig {
    TrainingConfig {
        run_name: "gfp-onehot".to_string(),
        output_root: output_root.to_path_buf(),
        encoder: EncoderKind::OneHot,
        max_length: 64,
        cpu: true,
        embedding_cache: Some(output_root.join("cache")),
        data: DataConfig {
            source: DatasetSource::local_dir(splits.dir()),
            ..Default::default()
        },
        training: TrainingArgs {
            num_epochs: 2,
            batch_size: 4,
            save_total_limit: Some(1),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_local_splits_load() -> anyhow::Result<()> {
    let splits = FluorescenceSplits::create_temp()?;
    let data = DataConfig {
        source: DatasetSource::local_dir(splits.dir()),
        ..Default::default()
    };
    let DatasetSource::Local { files } = &data.source else {
        panic!("expected a local source");
    };
    assert_eq!(files.train, splits.train());
    assert_eq!(files.validation, splits.valid());
    assert_eq!(files.test, splits.test());
    let records = load_splits(&data)?;
    assert_eq!(records.train.len(), 24);
    assert_eq!(records.validation.len(), 8);
    assert_eq!(records.test.len(), 8);
    assert!(records.train[0].sequence.starts_with("MSKGEELFTG"));
    Ok(())
}

#[test]
fn test_one_hot_run_end_to_end() -> anyhow::Result<()> {
    let splits = FluorescenceSplits::create_temp()?;
    let out = tempfile::tempdir()?;
    let config = one_hot_config(&splits, out.path());
    let paths = config.paths();

    let report = pipeline::run(&config)?;
    assert_eq!(report.epochs.len(), 2);
    assert_eq!(
        Some(report.best_epoch),
        select_best(&report.epochs).map(|r| r.epoch)
    );
    assert_eq!(report.test.num_samples, 8);
    assert!(report.test.loss.is_finite());

    assert!(paths.best_checkpoint().exists());
    assert!(paths.metrics_csv().exists());
    assert!(paths.report_json().exists());
    let saved = TrainingConfig::load(&paths.config_json())?;
    assert_eq!(saved.encoder, EncoderKind::OneHot);
    assert_eq!(saved.max_length, 64);

    // embeddings were cached and a second run reads them back
    assert!(out.path().join("cache").join("meta.json").exists());
    let rerun = pipeline::run(&TrainingConfig {
        run_name: "gfp-onehot-rerun".to_string(),
        ..config
    })?;
    assert_eq!(rerun.epochs.len(), 2);
    Ok(())
}

#[test]
fn test_single_split_file() -> anyhow::Result<()> {
    let (test_csv, _temp) = TestFile::fluorescence_test().create_temp()?;
    let records = read_split(Path::new(&test_csv), "primary", "log_fluorescence")?;
    assert_eq!(records.len(), 8);
    assert!(records.iter().all(|r| r.label.is_finite()));
    Ok(())
}

fn constant_label_dir(label: f32) -> anyhow::Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()?;
    for name in ["train.csv", "valid.csv", "test.csv"] {
        std::fs::write(
            dir.path().join(name),
            format!("primary,log_fluorescence\nMSKGEELF,{label}\nMSKGEQLF,{label}\n"),
        )?;
    }
    Ok(dir)
}

#[test]
fn test_embedding_cache_follows_the_dataset() -> anyhow::Result<()> {
    let dataset_a = constant_label_dir(1.0)?;
    let dataset_b = constant_label_dir(9.0)?;
    let cache = tempfile::tempdir()?;
    let config_for = |dir: &Path| TrainingConfig {
        encoder: EncoderKind::OneHot,
        max_length: 16,
        cpu: true,
        embedding_cache: Some(cache.path().to_path_buf()),
        data: DataConfig {
            source: DatasetSource::local_dir(dir),
            ..Default::default()
        },
        ..Default::default()
    };

    let first = pipeline::prepare_embeddings(&config_for(dataset_a.path()), &Device::Cpu)?;
    assert_eq!(first.train.labels(), &[1.0, 1.0]);
    let second = pipeline::prepare_embeddings(&config_for(dataset_b.path()), &Device::Cpu)?;
    assert_eq!(second.train.labels(), &[9.0, 9.0]);
    assert_eq!(second.test.labels(), &[9.0, 9.0]);
    Ok(())
}

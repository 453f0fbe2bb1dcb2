use assert_cmd::Command;
use fluorin_test_data::FluorescenceSplits;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("fluorin").unwrap();
    cmd.arg("--help");
    cmd.assert().success();
}

#[test]
fn test_cli_rejects_unknown_encoder() {
    let mut cmd = Command::cargo_bin("fluorin").unwrap();
    cmd.args(["train", "--encoder", "esm-9000"]);
    cmd.assert().failure();
}

#[test]
fn test_cli_train_embed_evaluate() {
    let splits = FluorescenceSplits::create_temp().unwrap();
    let out = tempfile::tempdir().unwrap();
    let common = |cmd: &mut Command| {
        cmd.arg("--encoder")
            .arg("one-hot")
            .arg("--max-length")
            .arg("48")
            .arg("--data-dir")
            .arg(splits.dir())
            .arg("--output-root")
            .arg(out.path())
            .arg("--run-name")
            .arg("cli")
            .arg("--cpu");
    };

    let mut train = Command::cargo_bin("fluorin").unwrap();
    train.arg("train").arg("--epochs").arg("1");
    common(&mut train);
    train.assert().success();
    let best = out
        .path()
        .join("cli")
        .join("checkpoints")
        .join("best")
        .join("model.safetensors");
    assert!(best.exists());

    let mut embed = Command::cargo_bin("fluorin").unwrap();
    embed.arg("embed").arg("--out").arg(out.path().join("cache"));
    common(&mut embed);
    embed.assert().success();
    assert!(out.path().join("cache").join("train.safetensors").exists());

    let mut evaluate = Command::cargo_bin("fluorin").unwrap();
    evaluate.arg("evaluate").arg("--checkpoint").arg(&best);
    common(&mut evaluate);
    let output = evaluate.output().unwrap();
    assert!(output.status.success());
    let metrics: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(metrics["num_samples"], 8);
}

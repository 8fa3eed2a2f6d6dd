use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn runs_without_arguments() {
    let mut cmd = Command::cargo_bin("vole").unwrap();
    cmd.assert().success();
}

#[test]
fn runs_sum_program() {
    let mut cmd = Command::cargo_bin("vole").unwrap();
    cmd.arg("run").arg("tests/files/sum.asm").arg("--minimal");

    cmd.assert()
        .success()
        .stdout(contains("Halted"))
        .stdout(contains("R4 0x15 21"));
}

#[test]
fn runs_float_program() {
    let mut cmd = Command::cargo_bin("vole").unwrap();
    cmd.arg("run").arg("tests/files/float.asm").arg("--minimal");

    cmd.assert().success().stdout(contains("R3 0x4C"));
}

#[test]
fn checks_valid_source() {
    let mut cmd = Command::cargo_bin("vole").unwrap();
    cmd.arg("check").arg("tests/files/sum.asm");

    cmd.assert().success().stdout(contains("Success"));
}

#[test]
fn reports_unknown_mnemonic() {
    let mut cmd = Command::cargo_bin("vole").unwrap();
    cmd.arg("check").arg("tests/files/bad.asm");

    cmd.assert().failure().stderr(contains("frobnicate"));
}

#[test]
fn compiles_then_runs_binary_image() {
    let dest = std::env::temp_dir().join("vole-sum-test.vole");

    let mut cmd = Command::cargo_bin("vole").unwrap();
    cmd.arg("compile")
        .arg("tests/files/sum.asm")
        .arg(&dest);
    cmd.assert().success().stdout(contains("Saved"));

    let image = std::fs::read(&dest).unwrap();
    assert_eq!(image.len() % 2, 0);

    let mut cmd = Command::cargo_bin("vole").unwrap();
    cmd.arg("run").arg(&dest).arg("--minimal");
    cmd.assert().success().stdout(contains("R4 0x15 21"));

    let _ = std::fs::remove_file(&dest);
}

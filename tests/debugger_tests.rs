use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn runs_to_halt_and_inspects_memory() {
    let mut cmd = Command::cargo_bin("vole").unwrap();
    cmd.arg("debug")
        .arg("tests/files/sum.asm")
        .arg("--minimal")
        .arg("--command")
        .arg("run; mem 0xF0; quit");

    cmd.assert()
        .success()
        .stdout(contains("Halted"))
        .stdout(contains("mem[0xF0] 0x15"));
}

#[test]
fn steps_and_reads_the_program_counter() {
    let mut cmd = Command::cargo_bin("vole").unwrap();
    cmd.arg("debug")
        .arg("tests/files/sum.asm")
        .arg("--minimal")
        .arg("--command")
        .arg("step 2; pc; quit");

    cmd.assert().success().stdout(contains("pc 0x04"));
}

#[test]
fn dumps_registers() {
    let mut cmd = Command::cargo_bin("vole").unwrap();
    cmd.arg("debug")
        .arg("tests/files/sum.asm")
        .arg("--minimal")
        .arg("--command")
        .arg("run; regs; quit");

    cmd.assert()
        .success()
        .stdout(contains("R4 0x15 21"))
        .stdout(contains("PC 0x14"));
}

#[test]
fn prints_help() {
    let mut cmd = Command::cargo_bin("vole").unwrap();
    cmd.arg("debug")
        .arg("tests/files/sum.asm")
        .arg("--minimal")
        .arg("--command")
        .arg("help; quit");

    cmd.assert().success().stdout(contains("commands:"));
}

#[test]
fn rejects_binary_files() {
    let mut cmd = Command::cargo_bin("vole").unwrap();
    cmd.arg("debug").arg("tests/files/sum.vole");

    cmd.assert().failure();
}

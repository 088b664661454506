use std::fs;

fn argv(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn run_with_source(xml: &str, extra: &[&str]) -> (i32, String, String) {
    let mut path = std::env::temp_dir();
    path.push(format!("ippcode22-e2e-{}-{}.xml", std::process::id(), rand_suffix()));
    fs::write(&path, xml).unwrap();

    let mut args = vec![format!("--source={}", path.display())];
    args.extend(extra.iter().map(|s| s.to_string()));

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = ippcode22_cli::run(&args, &mut stdout, &mut stderr);

    fs::remove_file(&path).ok();
    (code, String::from_utf8(stdout).unwrap(), String::from_utf8(stderr).unwrap())
}

// Cheap, dependency-free uniqueness for parallel test temp files: no RNG available in this
// workspace's dependency set, so a monotonically increasing static counter is used instead.
fn rand_suffix() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[test]
fn arithmetic_and_write() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<program language="IPPcode22">
    <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@a</arg1></instruction>
    <instruction order="2" opcode="DEFVAR"><arg1 type="var">GF@b</arg1></instruction>
    <instruction order="3" opcode="DEFVAR"><arg1 type="var">GF@c</arg1></instruction>
    <instruction order="4" opcode="MOVE"><arg1 type="var">GF@a</arg1><arg2 type="int">6</arg2></instruction>
    <instruction order="5" opcode="MOVE"><arg1 type="var">GF@b</arg1><arg2 type="int">7</arg2></instruction>
    <instruction order="6" opcode="MUL">
        <arg1 type="var">GF@c</arg1>
        <arg2 type="var">GF@a</arg2>
        <arg3 type="var">GF@b</arg3>
    </instruction>
    <instruction order="7" opcode="WRITE"><arg1 type="var">GF@c</arg1></instruction>
</program>"#;
    let (code, stdout, stderr) = run_with_source(xml, &[]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert_eq!(stdout, "42");
}

#[test]
fn frames_read_of_uninitialized_local_is_exit_56() {
    let xml = r#"<program language="IPPcode22">
    <instruction order="1" opcode="CREATEFRAME"/>
    <instruction order="2" opcode="DEFVAR"><arg1 type="var">TF@x</arg1></instruction>
    <instruction order="3" opcode="MOVE"><arg1 type="var">TF@x</arg1><arg2 type="string">foo</arg2></instruction>
    <instruction order="4" opcode="PUSHFRAME"/>
    <instruction order="5" opcode="DEFVAR"><arg1 type="var">LF@x</arg1></instruction>
    <instruction order="6" opcode="WRITE"><arg1 type="var">LF@x</arg1></instruction>
</program>"#;
    let (code, _stdout, stderr) = run_with_source(xml, &[]);
    assert_eq!(code, 56, "stderr: {}", stderr);
    assert!(stderr.starts_with("ERROR - "));
}

#[test]
fn labels_and_loop_counts_down() {
    let xml = r#"<program language="IPPcode22">
    <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@i</arg1></instruction>
    <instruction order="2" opcode="MOVE"><arg1 type="var">GF@i</arg1><arg2 type="int">3</arg2></instruction>
    <instruction order="3" opcode="LABEL"><arg1 type="label">loop</arg1></instruction>
    <instruction order="4" opcode="WRITE"><arg1 type="var">GF@i</arg1></instruction>
    <instruction order="5" opcode="SUB">
        <arg1 type="var">GF@i</arg1>
        <arg2 type="var">GF@i</arg2>
        <arg3 type="int">1</arg3>
    </instruction>
    <instruction order="6" opcode="JUMPIFNEQ">
        <arg1 type="label">loop</arg1>
        <arg2 type="var">GF@i</arg2>
        <arg3 type="int">0</arg3>
    </instruction>
</program>"#;
    let (code, stdout, stderr) = run_with_source(xml, &[]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert_eq!(stdout, "321");
}

#[test]
fn nil_comparison() {
    let xml = r#"<program language="IPPcode22">
    <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@r</arg1></instruction>
    <instruction order="2" opcode="EQ">
        <arg1 type="var">GF@r</arg1>
        <arg2 type="nil">nil</arg2>
        <arg3 type="nil">nil</arg3>
    </instruction>
    <instruction order="3" opcode="WRITE"><arg1 type="var">GF@r</arg1></instruction>
    <instruction order="4" opcode="LT">
        <arg1 type="var">GF@r</arg1>
        <arg2 type="nil">nil</arg2>
        <arg3 type="int">0</arg3>
    </instruction>
</program>"#;
    let (code, stdout, stderr) = run_with_source(xml, &[]);
    assert_eq!(stdout, "true");
    assert_eq!(code, 53, "stderr: {}", stderr);
}

#[test]
fn read_int_failure_reports_nil() {
    let xml = r#"<program language="IPPcode22">
    <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@v</arg1></instruction>
    <instruction order="2" opcode="DEFVAR"><arg1 type="var">GF@t</arg1></instruction>
    <instruction order="3" opcode="READ"><arg1 type="var">GF@v</arg1><arg2 type="type">int</arg2></instruction>
    <instruction order="4" opcode="TYPE"><arg1 type="var">GF@t</arg1><arg2 type="var">GF@v</arg2></instruction>
    <instruction order="5" opcode="WRITE"><arg1 type="var">GF@t</arg1></instruction>
</program>"#;
    let mut path = std::env::temp_dir();
    path.push(format!("ippcode22-e2e-input-{}.txt", rand_suffix()));
    fs::write(&path, "xyz\n").unwrap();

    let mut source_path = std::env::temp_dir();
    source_path.push(format!("ippcode22-e2e-source-{}.xml", rand_suffix()));
    fs::write(&source_path, xml).unwrap();

    let args = argv(&[
        &format!("--source={}", source_path.display()),
        &format!("--input={}", path.display()),
    ]);
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = ippcode22_cli::run(&args, &mut stdout, &mut stderr);

    fs::remove_file(&path).ok();
    fs::remove_file(&source_path).ok();

    assert_eq!(code, 0, "stderr: {}", String::from_utf8(stderr).unwrap());
    assert_eq!(String::from_utf8(stdout).unwrap(), "nil");
}

#[test]
fn exit_value_writes_stats_and_exits_with_code() {
    let xml = r#"<program language="IPPcode22">
    <instruction order="1" opcode="EXIT"><arg1 type="int">2</arg1></instruction>
</program>"#;
    let mut stats_path = std::env::temp_dir();
    stats_path.push(format!("ippcode22-e2e-stats-{}.txt", rand_suffix()));

    let (code, stdout, stderr) = run_with_source(
        xml,
        &["--insts", &format!("--stats={}", stats_path.display())],
    );
    assert_eq!(code, 2, "stderr: {}", stderr);
    assert_eq!(stdout, "");

    let report = fs::read_to_string(&stats_path).unwrap();
    fs::remove_file(&stats_path).ok();
    assert_eq!(report, "1\n");
}

#[test]
fn stats_file_alone_is_created_empty() {
    // No --insts/--vars/--hot: the stats file is still written, just with nothing in it.
    let xml = r#"<program language="IPPcode22">
    <instruction order="1" opcode="EXIT"><arg1 type="int">0</arg1></instruction>
</program>"#;
    let mut stats_path = std::env::temp_dir();
    stats_path.push(format!("ippcode22-e2e-empty-stats-{}.txt", rand_suffix()));

    let (code, _stdout, stderr) =
        run_with_source(xml, &[&format!("--stats={}", stats_path.display())]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    let report = fs::read_to_string(&stats_path).unwrap();
    fs::remove_file(&stats_path).ok();
    assert_eq!(report, "");
}

#[test]
fn help_must_be_sole_argument() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = ippcode22_cli::run(&argv(&["--help"]), &mut stdout, &mut stderr);
    assert_eq!(code, 0);
    assert!(String::from_utf8(stdout).unwrap().contains("USAGE"));

    let mut stdout2 = Vec::new();
    let mut stderr2 = Vec::new();
    let code2 = ippcode22_cli::run(&argv(&["--help", "--source=x"]), &mut stdout2, &mut stderr2);
    assert_eq!(code2, 10);
}

use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn voxchat_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_voxchat").expect("voxchat test binary not built")
}

#[test]
fn help_mentions_the_assistant() {
    let output = Command::new(voxchat_bin())
        .arg("--help")
        .output()
        .expect("run voxchat --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("voice assistant"));
    assert!(combined.contains("--whisper-model"));
}

#[test]
fn rejects_invalid_seconds() {
    let output = Command::new(voxchat_bin())
        .args(["--seconds", "0"])
        .output()
        .expect("run voxchat --seconds 0");
    assert!(!output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("--seconds"));
}

#[test]
fn list_input_devices_prints_a_message() {
    let output = Command::new(voxchat_bin())
        .arg("--list-input-devices")
        .output()
        .expect("run voxchat --list-input-devices");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(
        combined.contains("audio input devices")
            || combined.contains("Failed to list audio input devices")
    );
}

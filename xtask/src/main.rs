use anyhow::{Context, Result, bail};
use bootloader::DiskImageBuilder;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const KERNEL_TARGET: &str = "x86_64-unknown-none";
const KERNEL_PACKAGE: &str = "laskar-kernel";
const BUILD_STD: &str = "-Zbuild-std=core,compiler_builtins";
const BUILD_STD_FEATURES: &str = "-Zbuild-std-features=compiler-builtins-mem";
const VERSION_MAJOR: u64 = 0;
const VERSION_MINOR: u64 = 1;
const BUILD_COUNTER_FILE: &str = ".laskar_build_count";
const PROMPT: &str = "laskar> ";
const OUTCOME_MARKER: &str = "snake: outcome=";
// Must match the kernel's default initial length; a run can never score below it.
const MIN_SCORE: u64 = 8;

type SharedLog = Arc<Mutex<Vec<u8>>>;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("build") => build(),
        Some("run") => run_qemu(),
        Some("smoke-snake") => smoke_snake(),
        _ => {
            eprintln!("Usage: cargo xtask <build|run|smoke-snake>");
            Ok(())
        }
    }
}

fn build() -> Result<()> {
    let build_count = next_build_count()?;
    let version = format!("{VERSION_MAJOR}.{VERSION_MINOR}.{build_count}");
    println!("laskar build version: {version}");
    for name in ["LASKAR_SNAKE_CADENCE", "LASKAR_SNAKE_INITIAL_LENGTH", "LASKAR_LOG"] {
        if let Ok(value) = std::env::var(name) {
            println!("laskar build override: {name}={value}");
        }
    }

    let status = Command::new("cargo")
        .env("LASKAR_BUILD_COUNT", build_count.to_string())
        .env("LASKAR_VERSION_MAJOR", VERSION_MAJOR.to_string())
        .env("LASKAR_VERSION_MINOR", VERSION_MINOR.to_string())
        .args([
            "build",
            "-p",
            KERNEL_PACKAGE,
            "--target",
            KERNEL_TARGET,
            BUILD_STD,
            BUILD_STD_FEATURES,
        ])
        .status()
        .context("cargo build failed")?;
    if !status.success() {
        bail!("kernel build failed");
    }

    let kernel_binary = PathBuf::from(format!("target/{KERNEL_TARGET}/debug/{KERNEL_PACKAGE}"));
    if !kernel_binary.exists() {
        bail!("missing kernel binary at {}", kernel_binary.display());
    }

    let disk_image = disk_image_path();
    DiskImageBuilder::new(kernel_binary)
        .create_uefi_image(&disk_image)
        .context("failed to create UEFI disk image")?;
    println!("laskar disk image: {}", disk_image.display());

    Ok(())
}

fn disk_image_path() -> PathBuf {
    PathBuf::from(format!(
        "target/{KERNEL_TARGET}/debug/bootimage-{KERNEL_PACKAGE}.bin"
    ))
}

fn next_build_count() -> Result<u64> {
    let path = PathBuf::from(BUILD_COUNTER_FILE);
    let current = std::fs::read_to_string(&path)
        .ok()
        .and_then(|content| content.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let next = current.saturating_add(1);
    std::fs::write(&path, format!("{next}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(next)
}

fn run_qemu() -> Result<()> {
    let status = Command::new("bash")
        .args(["scripts/qemu.sh"])
        .status()
        .context("qemu run failed")?;
    if !status.success() {
        bail!("qemu exited with error");
    }
    Ok(())
}

fn smoke_snake() -> Result<()> {
    let disk_image = disk_image_path();
    if !disk_image.exists() {
        bail!(
            "missing kernel image at {}; run `cargo xtask build` first",
            disk_image.display()
        );
    }

    let mut child = Command::new("bash")
        .args(["scripts/qemu.sh"])
        .env("QEMU_DISPLAY", "none")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("failed to start qemu for smoke-snake")?;

    let stdout = child
        .stdout
        .take()
        .context("failed to capture qemu stdout")?;
    let stderr = child
        .stderr
        .take()
        .context("failed to capture qemu stderr")?;

    let log: SharedLog = Arc::new(Mutex::new(Vec::new()));
    let stdout_reader = spawn_log_reader(stdout, Arc::clone(&log));
    let stderr_reader = spawn_log_reader(stderr, Arc::clone(&log));

    let smoke_result = drive_snake_session(&mut child, &log);

    if child
        .try_wait()
        .context("failed to query qemu process status")?
        .is_none()
    {
        let _ = child.kill();
    }
    let _ = child.wait();
    let _ = stdout_reader.join();
    let _ = stderr_reader.join();

    let log_snapshot = snapshot_log(&log);
    if let Err(error) = smoke_result {
        eprintln!("smoke-snake failed: {error}");
        eprintln!("----- serial tail -----");
        eprintln!("{}", log_tail(&log_snapshot, 60));
        return Err(error);
    }

    println!("smoke-snake: PASS");
    for marker in ["Clock: source=", "Console: backend=", OUTCOME_MARKER] {
        if let Some(line) = last_matching_line(&log_snapshot, marker) {
            println!("smoke-snake: {line}");
        }
    }
    Ok(())
}

fn drive_snake_session(child: &mut Child, log: &SharedLog) -> Result<()> {
    wait_for_log(log, PROMPT, Duration::from_secs(40), "shell prompt")?;
    wait_for_log(log, "Clock: source=pit-ch0-polled", Duration::from_secs(1), "clock report")?;
    let stdin = child
        .stdin
        .as_mut()
        .context("failed to capture qemu stdin")?;

    let prompts = prompt_count(log);
    send_serial_command(stdin, "versionx\u{7f}\n")?;
    wait_for_log_count(log, PROMPT, prompts + 1, Duration::from_secs(8), "version prompt")?;
    wait_for_log(log, "version: ", Duration::from_secs(1), "serial backspace")?;

    // Untouched, the snake heads right until it meets the wall.
    let prompts = prompt_count(log);
    send_serial_command(stdin, "snake\n")?;
    wait_for_log(log, "snake: start", Duration::from_secs(8), "snake start")?;
    let ended = wait_for_outcome(log, prompts, Duration::from_secs(60))?;
    if ended.outcome != "ended" {
        bail!("expected a wall collision, got outcome={}", ended.outcome);
    }
    if ended.score < MIN_SCORE {
        bail!("score {} below the initial length {MIN_SCORE}", ended.score);
    }
    wait_for_log(
        log,
        &format!("Your score is: {}", ended.score),
        Duration::from_secs(1),
        "score message",
    )?;

    // A second run quit from serial returns to the shell.
    let prompts = prompt_count(log);
    send_serial_command(stdin, "snake\n")?;
    wait_for_log_count(log, "snake: start", 2, Duration::from_secs(8), "second snake start")?;
    send_serial_command(stdin, "q")?;
    let quit = wait_for_outcome(log, prompts, Duration::from_secs(20))?;
    if quit.outcome != "quit" {
        bail!("expected outcome=quit after `q`, got outcome={}", quit.outcome);
    }

    let prompts = prompt_count(log);
    send_serial_command(stdin, "ticks\n")?;
    wait_for_log_count(log, PROMPT, prompts + 1, Duration::from_secs(8), "ticks command")?;
    let snapshot = snapshot_log(log);
    let ticks = last_matching_line(&snapshot, "ticks=")
        .and_then(|line| parse_metric_value(line, "ticks="))
        .context("missing ticks value")?;
    if ticks == 0 {
        bail!("tick clock did not advance during the smoke run");
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
struct OutcomeLine {
    outcome: String,
    score: u64,
    steps: u64,
}

fn parse_outcome_line(line: &str) -> Option<OutcomeLine> {
    let start = line.find(OUTCOME_MARKER)?;
    let outcome = line[start + OUTCOME_MARKER.len()..]
        .split_whitespace()
        .next()?
        .to_string();
    Some(OutcomeLine {
        outcome,
        score: parse_metric_value(line, "score=")?,
        steps: parse_metric_value(line, "steps=")?,
    })
}

/// Waits for the shell prompt that follows a finished run, then parses its outcome line.
fn wait_for_outcome(log: &SharedLog, prompts_before: usize, timeout: Duration) -> Result<OutcomeLine> {
    wait_for_log_count(log, PROMPT, prompts_before + 1, timeout, "snake outcome")?;
    let snapshot = snapshot_log(log);
    let line = last_matching_line(&snapshot, OUTCOME_MARKER).context("missing outcome line")?;
    let parsed = parse_outcome_line(line)
        .with_context(|| format!("malformed outcome line `{line}`"))?;
    println!(
        "smoke-snake: outcome={} score={} steps={}",
        parsed.outcome, parsed.score, parsed.steps
    );
    Ok(parsed)
}

fn prompt_count(log: &SharedLog) -> usize {
    snapshot_log(log).matches(PROMPT).count()
}

fn send_serial_command(stdin: &mut ChildStdin, command: &str) -> Result<()> {
    stdin
        .write_all(command.as_bytes())
        .with_context(|| format!("failed to send command `{}`", command.trim_end()))?;
    stdin
        .flush()
        .with_context(|| format!("failed to flush command `{}`", command.trim_end()))?;
    Ok(())
}

fn wait_for_log(log: &SharedLog, needle: &str, timeout: Duration, stage: &str) -> Result<()> {
    wait_for_log_count(log, needle, 1, timeout, stage)
}

fn wait_for_log_count(
    log: &SharedLog,
    needle: &str,
    count: usize,
    timeout: Duration,
    stage: &str,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let snapshot = snapshot_log(log);
        if snapshot.matches(needle).count() >= count {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!("timeout waiting for {stage}: expected `{needle}` x{count}");
        }
        thread::sleep(Duration::from_millis(50));
    }
}

fn spawn_log_reader<R: Read + Send + 'static>(
    mut reader: R,
    log: SharedLog,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buffer = [0u8; 2048];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) | Err(_) => break,
                Ok(len) => match log.lock() {
                    Ok(mut bytes) => bytes.extend_from_slice(&buffer[..len]),
                    Err(_) => break,
                },
            }
        }
    })
}

fn snapshot_log(log: &SharedLog) -> String {
    match log.lock() {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

fn last_matching_line<'a>(log: &'a str, marker: &str) -> Option<&'a str> {
    log.lines().rev().find(|line| line.contains(marker))
}

fn parse_metric_value(line: &str, key: &str) -> Option<u64> {
    let start = line.find(key)?;
    let rest = &line[start + key.len()..];
    let value = rest
        .split(|ch: char| ch.is_whitespace() || ch == ',')
        .next()?;
    value.parse::<u64>().ok()
}

fn log_tail(log: &str, lines: usize) -> String {
    let mut tail: Vec<&str> = log.lines().rev().take(lines).collect();
    tail.reverse();
    tail.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_outcome_log_line() {
        let line = "[INFO  laskar_core::game_loop] snake: outcome=ended score=11 steps=42\r";
        assert_eq!(
            parse_outcome_line(line),
            Some(OutcomeLine {
                outcome: "ended".to_string(),
                score: 11,
                steps: 42,
            })
        );
        assert_eq!(parse_outcome_line("snake: start cadence=4"), None);
    }

    #[test]
    fn metric_values_stop_at_separators() {
        assert_eq!(parse_metric_value("ticks=120\r", "ticks="), Some(120));
        assert_eq!(parse_metric_value("a=1, b=2", "b="), Some(2));
        assert_eq!(parse_metric_value("a=x", "a="), None);
        assert_eq!(parse_metric_value("nothing", "a="), None);
    }

    #[test]
    fn last_match_and_tail() {
        let log = "one\nsnake: start\ntwo\nsnake: start again\nthree";
        assert_eq!(last_matching_line(log, "snake: start"), Some("snake: start again"));
        assert_eq!(log_tail(log, 2), "snake: start again\nthree");
    }
}

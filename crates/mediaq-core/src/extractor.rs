//! External extractor (yt-dlp compatible) as a blocking download operation.
//!
//! Builds the command line from [`MediaqConfig`], runs the program, turns its
//! progress lines into [`TaskContext::report`] calls and collects the final
//! file paths. A cancelled task kills the child process at the next progress
//! line.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

#[cfg(unix)]
use std::os::unix::process::CommandExt;

use crate::config::MediaqConfig;
use crate::scheduler::{DownloadOutput, TaskContext};

const PROGRESS_PREFIX: &str = "mediaq-progress ";
const FILE_PREFIX: &str = "mediaq-file ";
const STDERR_TAIL_LINES: usize = 20;

/// A fully resolved extractor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ExtractorCommand {
    /// Command line downloading `url` according to `cfg`.
    pub fn from_config(cfg: &MediaqConfig, url: &str) -> Self {
        let ex = &cfg.extractor;
        let mut args: Vec<String> = Vec::new();

        let mut format = ex.format.clone();
        if ex.audio_only {
            format = "bestaudio/best".to_string();
            args.extend(["-x", "--audio-format", "mp3"].map(String::from));
        }
        if ex.quality != "best" {
            format = format!("{}+bestaudio/best", ex.quality);
        }
        args.extend(["-f".to_string(), format]);

        args.push(if ex.playlist { "--yes-playlist" } else { "--no-playlist" }.to_string());

        args.extend(["-P".to_string(), format!("home:{}", cfg.download_dir.display())]);
        if let Some(temp) = &cfg.temp_dir {
            args.extend(["-P".to_string(), format!("temp:{}", temp.display())]);
        }
        args.extend(["-o".to_string(), ex.output_template.clone()]);

        if cfg.max_file_size > 0 {
            args.extend(["--max-filesize".to_string(), cfg.max_file_size.to_string()]);
        }

        args.extend(
            [
                "--newline",
                "--progress",
                "--progress-template",
                "download:mediaq-progress %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s",
                "--print",
                "after_move:mediaq-file %(filepath)s",
            ]
            .map(String::from),
        );
        args.extend(["--".to_string(), url.to_string()]);

        Self {
            program: ex.program.clone(),
            args,
        }
    }

    /// Run the extractor to completion. Blocking; call from the scheduler's
    /// blocking pool.
    pub fn run(&self, ctx: &mut TaskContext) -> Result<DownloadOutput> {
        ctx.checkpoint()?;
        tracing::debug!(task_id = ctx.task_id(), program = %self.program, "spawning extractor");

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so cancel also reaches ffmpeg and other helpers.
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command
            .spawn()
            .with_context(|| format!("spawn {}", self.program))?;

        let stderr = child.stderr.take().context("extractor stderr not captured")?;
        let stderr_tail = std::thread::spawn(move || tail_lines(stderr, STDERR_TAIL_LINES));

        let files = match self.read_output(&mut child, ctx) {
            Ok(files) => files,
            Err(e) => {
                kill_quietly(&mut child);
                return Err(e);
            }
        };

        let status = child.wait().context("wait for extractor")?;
        let tail = stderr_tail.join().unwrap_or_default();

        // No checkpoint past this point: a clean exit means the files are final.
        if !status.success() {
            let detail = Vec::from(tail).join("\n");
            anyhow::bail!("{} exited with {}: {}", self.program, status, detail.trim());
        }
        Ok(DownloadOutput { files })
    }

    fn read_output(&self, child: &mut Child, ctx: &mut TaskContext) -> Result<Vec<PathBuf>> {
        let stdout = child.stdout.take().context("extractor stdout not captured")?;
        let mut reader = BufReader::new(stdout);
        let mut files = Vec::new();
        let mut raw = Vec::new();
        loop {
            raw.clear();
            let n = reader
                .read_until(b'\n', &mut raw)
                .context("read extractor output")?;
            if n == 0 {
                break;
            }
            // Titles are not guaranteed to be UTF-8; only our own markers matter.
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some((done, total)) = parse_progress_line(line) {
                ctx.report(done, total)?;
            } else if let Some(path) = parse_file_line(line) {
                tracing::debug!(task_id = ctx.task_id(), path = %path.display(), "extractor wrote file");
                files.push(path);
            } else {
                ctx.checkpoint()?;
            }
        }
        Ok(files)
    }

    /// Wrap the command as an operation for `Scheduler::submit`.
    pub fn into_operation(
        self,
    ) -> impl FnOnce(&mut TaskContext) -> Result<DownloadOutput> + Send + 'static {
        move |ctx| self.run(ctx)
    }
}

/// Kill the extractor and everything it spawned, then reap it.
fn kill_quietly(child: &mut Child) {
    #[cfg(unix)]
    {
        // Negative pid addresses the process group created at spawn.
        let pgid = child.id() as libc::pid_t;
        let r = unsafe { libc::kill(-pgid, libc::SIGKILL) };
        if r != 0 {
            tracing::debug!(pgid, "kill process group failed, killing extractor only");
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn tail_lines(reader: impl Read, keep: usize) -> VecDeque<String> {
    let mut tail = VecDeque::with_capacity(keep);
    let mut reader = BufReader::new(reader);
    let mut raw = Vec::new();
    loop {
        raw.clear();
        if !matches!(reader.read_until(b'\n', &mut raw), Ok(n) if n > 0) {
            break;
        }
        if tail.len() == keep {
            tail.pop_front();
        }
        let line = String::from_utf8_lossy(&raw);
        tail.push_back(line.trim_end_matches(['\n', '\r']).to_string());
    }
    tail
}

/// Parse an extractor value that may be `NA`, an integer or a float.
fn parse_bytes(field: &str) -> Option<u64> {
    let v: f64 = field.parse().ok()?;
    (v.is_finite() && v >= 0.0).then_some(v as u64)
}

/// `mediaq-progress <done> <total> <estimate>` → (done, total or estimate).
pub fn parse_progress_line(line: &str) -> Option<(u64, Option<u64>)> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX.trim_end())?;
    let mut fields = rest.split_whitespace();
    let done = parse_bytes(fields.next()?)?;
    let total = fields.next().and_then(parse_bytes);
    let estimate = fields.next().and_then(parse_bytes);
    Some((done, total.or(estimate)))
}

/// `mediaq-file <path>` → path.
pub fn parse_file_line(line: &str) -> Option<PathBuf> {
    let path = line.strip_prefix(FILE_PREFIX)?.trim();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaqConfig;
    use crate::scheduler::{Task, TaskContext};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn cfg() -> MediaqConfig {
        MediaqConfig {
            download_dir: PathBuf::from("/srv/dl"),
            ..MediaqConfig::default()
        }
    }

    fn arg_after<'a>(cmd: &'a ExtractorCommand, flag: &str) -> Option<&'a str> {
        let i = cmd.args.iter().position(|a| a == flag)?;
        cmd.args.get(i + 1).map(String::as_str)
    }

    #[test]
    fn default_command_line() {
        let cmd = ExtractorCommand::from_config(&cfg(), "https://youtu.be/x");
        assert_eq!(cmd.program, "yt-dlp");
        assert_eq!(arg_after(&cmd, "-f"), Some("best"));
        assert!(cmd.args.contains(&"--no-playlist".to_string()));
        assert_eq!(arg_after(&cmd, "-P"), Some("home:/srv/dl"));
        assert_eq!(arg_after(&cmd, "-o"), Some("%(title)s.%(ext)s"));
        assert_eq!(arg_after(&cmd, "--max-filesize"), Some("5000000000"));
        assert_eq!(cmd.args.last().map(String::as_str), Some("https://youtu.be/x"));
        assert_eq!(cmd.args[cmd.args.len() - 2], "--");
    }

    #[test]
    fn output_template_never_embeds_download_dir() {
        let cmd = ExtractorCommand::from_config(&cfg(), "https://youtu.be/x");
        assert!(!arg_after(&cmd, "-o").unwrap().contains("/srv/dl"));
    }

    #[test]
    fn temp_dir_and_playlist() {
        let mut c = cfg();
        c.temp_dir = Some(PathBuf::from("/tmp/mq"));
        c.extractor.playlist = true;
        c.max_file_size = 0;
        let cmd = ExtractorCommand::from_config(&c, "https://youtube.com/playlist?list=1");
        assert!(cmd.args.contains(&"temp:/tmp/mq".to_string()));
        assert!(cmd.args.contains(&"--yes-playlist".to_string()));
        assert!(!cmd.args.contains(&"--max-filesize".to_string()));
    }

    #[test]
    fn audio_only_and_quality() {
        let mut c = cfg();
        c.extractor.audio_only = true;
        let cmd = ExtractorCommand::from_config(&c, "u");
        assert_eq!(arg_after(&cmd, "-f"), Some("bestaudio/best"));
        assert_eq!(arg_after(&cmd, "--audio-format"), Some("mp3"));
        assert!(cmd.args.contains(&"-x".to_string()));

        c.extractor.audio_only = false;
        c.extractor.quality = "bestvideo[height<=720]".to_string();
        let cmd = ExtractorCommand::from_config(&c, "u");
        assert_eq!(
            arg_after(&cmd, "-f"),
            Some("bestvideo[height<=720]+bestaudio/best")
        );
    }

    #[test]
    fn progress_lines() {
        assert_eq!(
            parse_progress_line("mediaq-progress 1024 4096 NA"),
            Some((1024, Some(4096)))
        );
        assert_eq!(
            parse_progress_line("mediaq-progress 10 NA 2048.5"),
            Some((10, Some(2048)))
        );
        assert_eq!(parse_progress_line("mediaq-progress 10 NA NA"), Some((10, None)));
        assert_eq!(parse_progress_line("mediaq-progress NA NA NA"), None);
        assert_eq!(parse_progress_line("[download] 50%"), None);
    }

    #[test]
    fn file_lines() {
        assert_eq!(
            parse_file_line("mediaq-file /srv/dl/My Video.mp4"),
            Some(PathBuf::from("/srv/dl/My Video.mp4"))
        );
        assert_eq!(parse_file_line("mediaq-file   "), None);
        assert_eq!(parse_file_line("other"), None);
    }

    fn ctx() -> (Arc<Task>, TaskContext) {
        let task = Arc::new(Task::new(
            1,
            crate::scheduler::TaskRequest {
                kind: crate::scheduler::TaskKind::Link,
                identifier: "https://youtu.be/x".into(),
                requester: 1,
                destination: 1,
            },
        ));
        let ctx = TaskContext::detached(Arc::clone(&task));
        (task, ctx)
    }

    fn sh(script: &str) -> ExtractorCommand {
        ExtractorCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    #[cfg(unix)]
    #[test]
    fn run_collects_files_and_progress() {
        let (task, mut ctx) = ctx();
        let cmd = sh("echo 'mediaq-progress 5 10 NA'; echo 'mediaq-progress 10 10 NA'; echo 'mediaq-file /tmp/a.mp4'");
        let out = cmd.run(&mut ctx).unwrap();
        assert_eq!(out.files, vec![PathBuf::from("/tmp/a.mp4")]);
        assert_eq!(task.last_progress().unwrap().bytes_done, 10);
    }

    #[cfg(unix)]
    #[test]
    fn run_reports_exit_failure_with_stderr() {
        let (_task, mut ctx) = ctx();
        let err = sh("echo 'ERROR: Unsupported URL' >&2; exit 3")
            .run(&mut ctx)
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("Unsupported URL"), "{msg}");
    }

    #[cfg(unix)]
    #[test]
    fn run_stops_when_cancelled() {
        let (task, mut ctx) = ctx();
        let canceller = {
            let task = Arc::clone(&task);
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(100));
                task.cancel();
            })
        };
        let err = sh("while true; do echo 'mediaq-progress 1 NA NA'; sleep 0.05; done")
            .run(&mut ctx)
            .unwrap_err();
        canceller.join().unwrap();
        assert!(err.downcast_ref::<crate::error::CancellationRequested>().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn run_tolerates_non_utf8_output() {
        let (_task, mut ctx) = ctx();
        let cmd = sh(r"printf '[download] Destination: caf\351.mp4\n'; printf 'bad \377\n' >&2; echo 'mediaq-file /tmp/x.mp4'");
        let out = cmd.run(&mut ctx).unwrap();
        assert_eq!(out.files, vec![PathBuf::from("/tmp/x.mp4")]);
    }

    #[test]
    fn stderr_tail_keeps_lines_after_invalid_bytes() {
        let input: &[u8] = b"one\n\xff two\nthree\r\n";
        let tail = tail_lines(input, 2);
        assert_eq!(tail, ["\u{fffd} two", "three"]);
    }

    #[cfg(unix)]
    #[test]
    fn cancel_after_extractor_finished_keeps_result() {
        let (task, mut ctx) = ctx();
        let canceller = {
            let task = Arc::clone(&task);
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(100));
                task.cancel();
            })
        };
        // Output is complete before the cancel lands; the process then lingers.
        let out = sh("echo 'mediaq-file /tmp/done.mp4'; exec 1>&-; sleep 0.3")
            .run(&mut ctx)
            .unwrap();
        canceller.join().unwrap();
        assert!(task.is_cancelled());
        assert_eq!(out.files, vec![PathBuf::from("/tmp/done.mp4")]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn cancel_kills_helper_processes() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("helper.pid");
        let (task, mut ctx) = ctx();
        let canceller = {
            let task = Arc::clone(&task);
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(200));
                task.cancel();
            })
        };
        let script = format!(
            "sleep 30 & echo $! > '{}'; while true; do echo 'mediaq-progress 1 NA NA'; sleep 0.05; done",
            pid_file.display()
        );
        let err = sh(&script).run(&mut ctx).unwrap_err();
        canceller.join().unwrap();
        assert!(err.downcast_ref::<crate::error::CancellationRequested>().is_some());

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let stat = PathBuf::from(format!("/proc/{}/stat", pid.trim()));
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            // Gone, or a zombie waiting for init to reap it.
            let alive = match std::fs::read_to_string(&stat) {
                Ok(s) => !s.rsplit(')').next().unwrap_or("").trim_start().starts_with('Z'),
                Err(_) => false,
            };
            if !alive {
                break;
            }
            assert!(std::time::Instant::now() < deadline, "helper {} survived cancel", pid.trim());
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
    }

    #[test]
    fn missing_program_is_an_error() {
        let (_task, mut ctx) = ctx();
        let cmd = ExtractorCommand {
            program: "/nonexistent/mediaq-extractor".to_string(),
            args: vec![],
        };
        assert!(cmd.run(&mut ctx).is_err());
    }
}

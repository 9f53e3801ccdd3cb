// Adapters for the remote image classifier.
//
// The classifier is a noisy oracle: it gets one JPEG plus a fixed
// instruction and answers free text, ideally a few comma-separated labels.
// Implementations run on the poll worker thread, never on the frame path.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::Error;

/// Sent with every snapshot.
pub const INSTRUCTION: &str = "Look at this sketch. Describe what you see instantly. \
If it's just random lines, say \"Line\" or \"Scribble\". \
If it's a shape, say \"Circle\" or \"Square\". \
If it looks like an object, guess the object. \
Return ONLY a comma-separated list of 3 short guesses. e.g. \"Line, Curve, House\".";

/// How long one request may take before it counts as failed.
pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(3);

// How often a running classifier process is checked for exit.
const EXIT_POLL: Duration = Duration::from_millis(10);

/// Guess shown in place of real guesses when a request fails.
pub const ERROR_GUESS: &str = "API Error...";

/// Anything that can turn a sketch into text guesses.
pub trait Classifier: Send + 'static {
    fn classify(&mut self, jpeg: &[u8], instruction: &str) -> Result<String, Error>;
}

impl Classifier for Box<dyn Classifier> {
    fn classify(&mut self, jpeg: &[u8], instruction: &str) -> Result<String, Error> {
        (**self).classify(jpeg, instruction)
    }
}

/// Split a classifier answer into ranked guesses: comma-separated, trimmed,
/// empties dropped. Order is preserved (first = most confident).
pub fn parse_guesses(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ════════════════════════════════════════════════════════════════════════════
// ProcessClassifier: external command per request
// ════════════════════════════════════════════════════════════════════════════

/// Runs `argv` once per request: JPEG on stdin, instruction as the last
/// argument, answer on stdout. Any wrapper around a hosted vision model works.
/// Stdin is fed and stdout drained on their own threads, so the child may
/// write before it has read the whole image. A child still running after
/// `timeout` is killed and the request fails.
pub struct ProcessClassifier {
    argv: Vec<String>,
    timeout: Duration,
}

impl ProcessClassifier {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Result<Self, Error> {
        if argv.is_empty() {
            return Err(Error::Config("classifier_command is empty".into()));
        }
        Ok(Self { argv, timeout })
    }
}

impl Classifier for ProcessClassifier {
    fn classify(&mut self, jpeg: &[u8], instruction: &str) -> Result<String, Error> {
        let program = &self.argv[0];
        let fail = |what: &str, e: &dyn std::fmt::Display| {
            Error::ClassifierRequestFailed(format!("{program} ({what}): {e}"))
        };

        let mut child = Command::new(program)
            .args(&self.argv[1..])
            .arg(instruction)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| fail("spawn", &e))?;

        // Dropping stdin after the write closes it, so the child sees EOF.
        if let Some(mut stdin) = child.stdin.take() {
            let image = jpeg.to_vec();
            thread::spawn(move || {
                if let Err(e) = stdin.write_all(&image) {
                    debug!("classifier stopped reading its input: {e}");
                }
            });
        }
        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                stdout.read_to_end(&mut buf).map(|_| buf)
            })
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait().map_err(|e| fail("wait", &e))? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(fail("timeout", &format!("no answer within {:?}", self.timeout)));
                }
                None => thread::sleep(EXIT_POLL),
            }
        };
        if !status.success() {
            return Err(fail("exit", &status));
        }

        let stdout = match reader.map(|r| r.join()) {
            Some(Ok(Ok(buf))) => buf,
            Some(Ok(Err(e))) => return Err(fail("read", &e)),
            Some(Err(_)) => return Err(fail("read", &"output reader panicked")),
            None => Vec::new(),
        };
        let text = String::from_utf8_lossy(&stdout).trim().to_string();
        if text.is_empty() {
            return Err(Error::ClassifierRequestFailed(format!("{program}: empty answer")));
        }
        debug!(bytes = jpeg.len(), answer = %text, "classifier answered");
        Ok(text)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ScriptedClassifier: offline play and tests
// ════════════════════════════════════════════════════════════════════════════

/// Cycles through canned answers; an `Err` entry simulates a failed request.
pub struct ScriptedClassifier {
    answers: Vec<Result<String, String>>,
    next: usize,
}

impl ScriptedClassifier {
    pub fn new(answers: Vec<String>) -> Self {
        Self { answers: answers.into_iter().map(Ok).collect(), next: 0 }
    }

    pub fn with_failures(answers: Vec<Result<String, String>>) -> Self {
        Self { answers, next: 0 }
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&mut self, _jpeg: &[u8], _instruction: &str) -> Result<String, Error> {
        if self.answers.is_empty() {
            return Err(Error::ClassifierRequestFailed("no scripted answers".into()));
        }
        let answer = self.answers[self.next % self.answers.len()].clone();
        self.next += 1;
        answer.map_err(Error::ClassifierRequestFailed)
    }
}

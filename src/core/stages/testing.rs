//! Scripted command runner for stage and workflow tests.
//!
//! Mimics the file effects of each tool without spawning anything.

use super::runner::{CommandOutput, CommandRunner};
use crate::error::StageError;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

pub(crate) type Call = (String, Vec<String>);

#[derive(Default)]
pub(crate) struct FakeRunner {
    calls: Mutex<Vec<Call>>,
    failing: HashSet<String>,
    silent: HashSet<String>,
    /// Remaining responses with this stderr and exit 1, per program
    locked: Mutex<HashMap<String, u32>>,
    /// Aligner writes this many fewer outputs than inputs
    drop_outputs: usize,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// `program` exits with status 1 and writes nothing
    pub fn failing(mut self, program: &str) -> Self {
        self.failing.insert(program.to_string());
        self
    }

    /// `program` exits 0 but writes nothing
    pub fn silent(mut self, program: &str) -> Self {
        self.silent.insert(program.to_string());
        self
    }

    /// The first `times` runs of `program` report a locked database
    pub fn locked(self, program: &str, times: u32) -> Self {
        if let Ok(mut locked) = self.locked.lock() {
            locked.insert(program.to_string(), times);
        }
        self
    }

    pub fn dropping_outputs(mut self, count: usize) -> Self {
        self.drop_outputs = count;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls().into_iter().map(|(program, _)| program).collect()
    }

    fn write(path: &str) {
        fs::write(path, b"fake image").unwrap();
    }
}

impl CommandRunner for FakeRunner {
    fn execute(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, StageError> {
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.clone()));

        {
            let mut locked = self.locked.lock().unwrap();
            if let Some(remaining) = locked.get_mut(program) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Ok(CommandOutput {
                        stderr: "ERROR: can't acquire the database lock file".to_string(),
                        code: Some(1),
                        ..Default::default()
                    });
                }
            }
        }

        if self.failing.contains(program) {
            return Ok(CommandOutput {
                stderr: format!("{} failed", program),
                code: Some(1),
                ..Default::default()
            });
        }
        if self.silent.contains(program) {
            return Ok(CommandOutput::ok());
        }

        match program {
            "darktable-cli" => Self::write(&args[1]),
            "align_image_stack" => {
                let prefix = PathBuf::from(&args[1]);
                let inputs = args.iter().skip(2).filter(|a| a.ends_with(".tif")).count();
                for index in 0..inputs.saturating_sub(self.drop_outputs) {
                    let mut name = prefix.as_os_str().to_owned();
                    name.push(format!("{:04}.tif", index));
                    fs::write(PathBuf::from(name), b"fake image").unwrap();
                }
            }
            "enfuse" => Self::write(&args[1]),
            "exiftool" => {
                let dest = &args[3];
                if fs::metadata(dest).is_ok() {
                    fs::copy(dest, format!("{}_original", dest)).unwrap();
                }
            }
            _ => {}
        }

        Ok(CommandOutput::ok())
    }
}

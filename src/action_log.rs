//! Durable record of admitted actions.
//!
//! Replaying [`ActionLog::load`] in order through a fresh engine rebuilds the
//! state the live engine had when the log was written.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::warn;

use crate::types::Action;

#[derive(Debug)]
pub enum ActionLogError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Parse {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
    Encode(serde_json::Error),
}

impl fmt::Display for ActionLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionLogError::Io { path, source } => {
                write!(f, "action log i/o failed at {}: {source}", path.display())
            }
            ActionLogError::Parse { path, line, source } => {
                write!(
                    f,
                    "action log {} has a malformed entry on line {line}: {source}",
                    path.display()
                )
            }
            ActionLogError::Encode(source) => write!(f, "failed to encode action: {source}"),
        }
    }
}

impl std::error::Error for ActionLogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ActionLogError::Io { source, .. } => Some(source),
            ActionLogError::Parse { source, .. } => Some(source),
            ActionLogError::Encode(source) => Some(source),
        }
    }
}

pub trait ActionLog: Send {
    fn append(&mut self, action: &Action) -> Result<(), ActionLogError>;
    fn load(&self) -> Result<Vec<Action>, ActionLogError>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryActionLog {
    actions: Vec<Action>,
}

impl MemoryActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actions(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

impl ActionLog for MemoryActionLog {
    fn append(&mut self, action: &Action) -> Result<(), ActionLogError> {
        self.actions.push(*action);
        Ok(())
    }

    fn load(&self) -> Result<Vec<Action>, ActionLogError> {
        Ok(self.actions.clone())
    }
}

/// One JSON-encoded [`Action`] per line, appended and synced per call.
#[derive(Clone, Debug)]
pub struct JsonLinesActionLog {
    file_path: PathBuf,
}

impl JsonLinesActionLog {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn io_error(&self, source: io::Error) -> ActionLogError {
        ActionLogError::Io {
            path: self.file_path.clone(),
            source,
        }
    }
}

impl ActionLog for JsonLinesActionLog {
    fn append(&mut self, action: &Action) -> Result<(), ActionLogError> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|error| self.io_error(error))?;
            }
        }

        let mut line = serde_json::to_string(action).map_err(ActionLogError::Encode)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.file_path)
            .map_err(|error| self.io_error(error))?;
        let cut = drop_torn_tail(&mut file).map_err(|error| self.io_error(error))?;
        if let Some(end) = cut {
            warn!(
                "[action-log] truncated incomplete last entry in {} at byte {end}",
                self.file_path.display()
            );
        }
        file.seek(SeekFrom::End(0))
            .map_err(|error| self.io_error(error))?;
        file.write_all(line.as_bytes())
            .map_err(|error| self.io_error(error))?;
        file.flush().map_err(|error| self.io_error(error))?;
        file.sync_data().map_err(|error| self.io_error(error))
    }

    fn load(&self) -> Result<Vec<Action>, ActionLogError> {
        let text = match fs::read_to_string(&self.file_path) {
            Ok(value) => value,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(self.io_error(error)),
        };
        parse_lines(&self.file_path, &text)
    }
}

/// Makes sure the next entry starts on a fresh line. An unterminated last
/// line that is not a whole action is cut; the new length is returned then.
fn drop_torn_tail(file: &mut File) -> io::Result<Option<u64>> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(None);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(None);
    }

    let mut bytes = Vec::with_capacity(len as usize);
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut bytes)?;
    let keep = bytes
        .iter()
        .rposition(|byte| *byte == b'\n')
        .map(|idx| idx as u64 + 1)
        .unwrap_or(0);
    if serde_json::from_slice::<Action>(&bytes[keep as usize..]).is_ok() {
        file.seek(SeekFrom::End(0))?;
        file.write_all(b"\n")?;
        return Ok(None);
    }
    file.set_len(keep)?;
    Ok(Some(keep))
}

fn parse_lines(path: &Path, text: &str) -> Result<Vec<Action>, ActionLogError> {
    let entries: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    let mut actions = Vec::with_capacity(entries.len());
    for (position, (line_number, line)) in entries.iter().enumerate() {
        match serde_json::from_str::<Action>(line) {
            Ok(action) => actions.push(action),
            // A torn final write only loses the action that was being admitted.
            Err(error) if position + 1 == entries.len() && !text.ends_with('\n') => {
                warn!(
                    "[action-log] skipping incomplete last entry at {}:{line_number}: {error}",
                    path.display()
                );
            }
            Err(source) => {
                return Err(ActionLogError::Parse {
                    path: path.to_path_buf(),
                    line: *line_number,
                    source,
                });
            }
        }
    }
    Ok(actions)
}

//! Test-only helpers: scripted oracle executors and fixture trees.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::io::executor::{ExecRequest, Executor};

/// What a scripted executor does for one call.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Write this JSON as the output file.
    Json(Value),
    /// Write this text verbatim as the output file.
    Raw(String),
    /// Fail the call with this message and write nothing.
    Fail(String),
}

/// Executor that replays responses in order and records every request.
///
/// Running out of responses is an executor failure.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: RefCell<VecDeque<ScriptedResponse>>,
    requests: RefCell<Vec<ExecRequest>>,
}

impl ScriptedExecutor {
    pub fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ExecRequest> {
        self.requests.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl Executor for ScriptedExecutor {
    fn exec(&self, request: &ExecRequest) -> Result<()> {
        self.requests.borrow_mut().push(request.clone());
        let response = self
            .responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted response left"))?;
        if let Some(parent) = request.output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        match response {
            ScriptedResponse::Json(value) => {
                let mut buf = serde_json::to_string_pretty(&value)?;
                buf.push('\n');
                fs::write(&request.output_path, buf)?;
            }
            ScriptedResponse::Raw(text) => fs::write(&request.output_path, text)?,
            ScriptedResponse::Fail(message) => return Err(anyhow!(message)),
        }
        Ok(())
    }
}

/// Write `contents` to `base/rel`, creating parent directories.
pub fn write_file(base: &Path, rel: &str, contents: &str) {
    let path = base.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture dir");
    }
    fs::write(&path, contents).expect("write fixture file");
}

/// Entry file importing `./other` with enough structure to skip escalation.
pub const SAMPLE_TS: &str = r#"import { Something } from "./other";
import fs from "fs";

interface User {
  id: number;
  name: string;
}

type UserId = number | string;

export function getUser(id: UserId): User | null {
  return null;
}
"#;

/// Tiny module whose outline is always short enough to escalate.
pub const OTHER_TS: &str = "export const Something = 42;\n";

/// A temp tree holding `Sample.ts` and `other.ts`.
pub fn sample_repo() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("tempdir");
    write_file(temp.path(), "Sample.ts", SAMPLE_TS);
    write_file(temp.path(), "other.ts", OTHER_TS);
    temp
}

//! File and folder tools, plus the text summary tool.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};

use crate::tools::{ToolContext, ToolError, ToolResult};

pub fn create_file(ctx: &ToolContext, path: &str, content: &str) -> ToolResult {
    let full = ctx.workspace().resolve(path)?;
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&full, content)?;
    Ok(format!("Success: File '{path}' created."))
}

pub fn create_folder(ctx: &ToolContext, path: &str) -> ToolResult {
    let full = ctx.workspace().resolve(path)?;
    fs::create_dir_all(&full)?;
    Ok(format!("Success: Folder '{path}' created."))
}

pub fn list_directory(ctx: &ToolContext, path: &str) -> ToolResult {
    let full = ctx.workspace().resolve(path)?;
    if !full.is_dir() {
        return Err(ToolError::NotADirectory(path.to_string()));
    }
    let mut names = fs::read_dir(&full)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<Vec<_>, _>>()?;
    if names.is_empty() {
        return Ok(format!("Directory '{path}' is empty."));
    }
    names.sort();
    Ok(names.join("\n"))
}

pub fn read_file(ctx: &ToolContext, path: &str) -> ToolResult {
    let full = ctx.workspace().resolve(path)?;
    match fs::read_to_string(&full) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            Err(ToolError::FileNotFound(path.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Append,
    Overwrite,
}

impl WriteMode {
    fn parse(mode: &str) -> Option<Self> {
        match mode {
            "append" => Some(WriteMode::Append),
            "overwrite" => Some(WriteMode::Overwrite),
            _ => None,
        }
    }
}

pub fn write_to_file(ctx: &ToolContext, path: &str, content: &str, mode: &str) -> ToolResult {
    let mode = WriteMode::parse(mode).ok_or_else(|| ToolError::InvalidMode(mode.to_string()))?;
    let full = ctx.workspace().resolve(path)?;
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        WriteMode::Append => options.append(true),
        WriteMode::Overwrite => options.write(true).truncate(true),
    };
    options.open(&full)?.write_all(content.as_bytes())?;
    Ok(match mode {
        WriteMode::Append => format!("Success: Content appended to file '{path}'."),
        WriteMode::Overwrite => format!("Success: Content written to file '{path}'."),
    })
}

pub fn analyze_data(ctx: &ToolContext, path: &str, analysis_type: &str) -> ToolResult {
    if analysis_type != "summary" {
        return Err(ToolError::UnsupportedAnalysis(analysis_type.to_string()));
    }
    let text = read_file(ctx, path)?;
    Ok(format!(
        "Analysis of '{path}':\n- Lines: {}\n- Words: {}\n- Characters: {}",
        text.lines().count(),
        text.split_whitespace().count(),
        text.chars().count()
    ))
}

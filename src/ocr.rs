use crate::error::ExtractError;
use crate::ports::TextExtractor;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

const IMAGE_PLACEHOLDER: &str = "{image}";

/// Runs an external OCR program and returns what it prints.
///
/// The command line is split on whitespace; every `{image}` argument is
/// replaced by the image path, which is appended when no placeholder is given.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn parse(command_line: &str) -> Result<Self, ExtractError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(ExtractError::NotConfigured)?;
        let mut args: Vec<String> = parts.collect();
        if !args.iter().any(|arg| arg.contains(IMAGE_PLACEHOLDER)) {
            args.push(IMAGE_PLACEHOLDER.to_string());
        }
        Ok(Self { program, args })
    }

    fn args_for(&self, image: &Path) -> Vec<String> {
        let image = image.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(IMAGE_PLACEHOLDER, &image))
            .collect()
    }
}

#[async_trait]
impl TextExtractor for CommandExtractor {
    async fn extract_text(&self, image: &Path) -> Result<String, ExtractError> {
        let args = self.args_for(image);
        log::debug!("Running {} {:?}", self.program, args);
        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            log::error!("{} failed: {}", self.program, stderr);
            return Err(ExtractError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

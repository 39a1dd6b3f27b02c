//! Device platform definition: prompts, enable handling, priming commands.

use regex::bytes::Regex;

/// Prompt and command conventions for one CLI family.
///
/// Only the Extreme/Avaya ERS and VOSS CLI is built in; the collector's
/// command set and templates target that family.
#[derive(Debug, Clone)]
pub struct DevicePlatform {
    /// Platform name.
    pub name: String,

    /// Matches any prompt (user, privileged, or configuration).
    pub prompt: Regex,

    /// Matches a privileged prompt only.
    pub privileged_prompt: Regex,

    /// Matches the password prompt shown after the enable command.
    pub enable_password_prompt: Regex,

    /// Command that enters privileged mode.
    pub enable_command: String,

    /// Session normalization commands sent after enable; failures are ignored.
    pub prime_commands: Vec<String>,

    /// Output fragments that mark a rejected command.
    pub failed_when_contains: Vec<String>,
}

impl DevicePlatform {
    /// Build a platform from its prompt patterns.
    pub fn new(
        name: impl Into<String>,
        prompt: &str,
        privileged_prompt: &str,
        enable_password_prompt: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            prompt: Regex::new(prompt)?,
            privileged_prompt: Regex::new(privileged_prompt)?,
            enable_password_prompt: Regex::new(enable_password_prompt)?,
            enable_command: "enable".to_string(),
            prime_commands: vec![],
            failed_when_contains: vec![],
        })
    }

    /// Add a priming command.
    pub fn with_prime_command(mut self, command: impl Into<String>) -> Self {
        self.prime_commands.push(command.into());
        self
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Extreme/Avaya ERS and VOSS (VSP) switches and routers.
    ///
    /// ```text
    /// ERS-4850GTS-PWR+>                  # user exec
    /// ERS-4850GTS-PWR+#                  # privileged exec
    /// VSP-8404C:1#                       # VOSS privileged exec
    /// VSP-8404C:1(config)#               # configuration
    /// ```
    pub fn extreme_ers() -> Self {
        Self::new(
            "extreme_ers",
            r"(?m)^[\w.\-+@():/ ]{1,63}[>#]\s?$",
            r"(?m)^[\w.\-+@:/ ]{1,63}#\s?$",
            r"(?mi)^\s*password:\s?$",
        )
        .expect("built-in prompt patterns are valid")
        .with_prime_command("terminal length 0")
        .with_prime_command("terminal more disable")
        .with_prime_command("disable clipaging")
        .with_failure_pattern("% Invalid input")
        .with_failure_pattern("% Bad port number")
        .with_failure_pattern("% Cannot modify settings")
        .with_failure_pattern("% Permission denied")
    }

    /// Strip the command echo and the trailing prompt from raw output.
    pub fn normalize_output(&self, raw: &str, command: &str) -> String {
        let body = match raw.find(command) {
            Some(pos) if raw[..pos].trim().is_empty() => &raw[pos + command.len()..],
            _ => raw,
        };
        let body = body.trim_start_matches(['\r', '\n']);

        let body = match memchr::memrchr(b'\n', body.as_bytes()) {
            Some(pos) if self.prompt.is_match(body[pos + 1..].as_bytes()) => {
                body[..pos].trim_end_matches('\r')
            }
            None if self.prompt.is_match(body.as_bytes()) => "",
            _ => body,
        };

        body.replace("\r\n", "\n")
    }

    /// First failure pattern present in `output`, if any.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .map(String::as_str)
    }
}

impl Default for DevicePlatform {
    fn default() -> Self {
        Self::extreme_ers()
    }
}

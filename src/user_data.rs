// Copyright (c) 2025 - Cowboy AI, Inc.
//! Instance boot scripts
//!
//! User data is a shell script run once by the instance on first boot. The
//! rendered script is passed to the launch configuration as `Fn::Base64`.

use serde_json::Value;
use thiserror::Error;

use crate::template::intrinsic;

/// Shebang of Linux user data
pub const LINUX_SHEBANG: &str = "#!/bin/bash";

/// Errors raised while building user data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserDataError {
    #[error("user data commands must not be empty")]
    EmptyCommand,

    #[error("user data command must be a single line: {0:?}")]
    MultilineCommand(String),
}

/// A boot script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    shebang: String,
    commands: Vec<String>,
}

impl UserData {
    pub fn for_linux() -> Self {
        Self {
            shebang: LINUX_SHEBANG.to_string(),
            commands: Vec::new(),
        }
    }

    /// Append commands in order
    ///
    /// Nothing is appended unless every command is valid.
    pub fn add_commands<I, S>(&mut self, commands: I) -> Result<&mut Self, UserDataError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let commands = commands
            .into_iter()
            .map(|command| {
                let command = command.into();
                if command.trim().is_empty() {
                    return Err(UserDataError::EmptyCommand);
                }
                if command.contains('\n') {
                    return Err(UserDataError::MultilineCommand(command));
                }
                Ok(command)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.commands.extend(commands);
        Ok(self)
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Script text: the shebang, then one command per line
    pub fn render(&self) -> String {
        std::iter::once(self.shebang.as_str())
            .chain(self.commands.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Property value for a launch configuration
    pub fn to_property(&self) -> Value {
        intrinsic::base64(self.render())
    }
}

/// Web server bootstrap: install and enable httpd and write a page naming the host
pub fn web_server() -> Result<UserData, UserDataError> {
    let mut user_data = UserData::for_linux();
    user_data.add_commands([
        "yum update -y",
        "yum install -y httpd",
        "systemctl start httpd",
        "systemctl enable httpd",
        r#"echo "<h1>Hello World from $(hostname -f)</h1>" >> /var/www/html/index.html"#,
    ])?;
    Ok(user_data)
}

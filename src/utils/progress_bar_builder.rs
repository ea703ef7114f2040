use indicatif::{ProgressBar, ProgressStyle};
use anyhow::Result;
use std::time::Duration;

pub struct ProgressBarBuilder {
    style_template: &'static str,
    message: String,
    enable_tick: bool,
    hidden: bool,
}

impl ProgressBarBuilder {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            style_template: "{spinner:.green} {msg}",
            message: message.into(),
            enable_tick: false,
            hidden: false,
        }
    }

    pub fn with_template(mut self, template: &'static str) -> Self {
        self.style_template = template;
        self
    }

    pub fn with_tick(mut self) -> Self {
        self.enable_tick = true;
        self
    }

    /// Builds a bar that draws nothing, for quiet runs.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn build(self) -> Result<ProgressBar> {
        let pb = if self.hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };

        pb.set_style(ProgressStyle::default_spinner().template(self.style_template)?);
        pb.set_message(self.message);

        if self.enable_tick && !self.hidden {
            pb.enable_steady_tick(Duration::from_millis(250));
        }

        Ok(pb)
    }
}

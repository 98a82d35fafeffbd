use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Builds a progress bar, which is hidden if the command runs quietly.
pub(crate) struct ProgressBarBuilder {
    template: &'static str,
    quiet: bool,
    len: Option<u64>,
}

impl ProgressBarBuilder {
    pub(crate) fn new(template: &'static str, quiet: bool) -> Self {
        Self {
            template,
            quiet,
            len: None,
        }
    }

    /// Sets the number of steps. Without a length a spinner is shown.
    pub(crate) fn len(mut self, len: u64) -> Self {
        self.len = Some(len);
        self
    }

    pub(crate) fn build(self) -> ProgressBar {
        let pbar = match self.len {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };

        if self.quiet {
            pbar.set_draw_target(ProgressDrawTarget::hidden());
        }

        pbar.set_style(
            ProgressStyle::with_template(self.template)
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        pbar
    }
}

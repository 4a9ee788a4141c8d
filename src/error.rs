use thiserror::Error;

/// Failures raised while driving the search form and reading its results.
///
/// Row-level problems (`QuantityParse`) are recovered by the normaliser and never
/// leave it; everything else is request-level and travels up to the pipeline.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("element not found: {locator}")]
    ElementNotFound { locator: String },

    #[error("no option labelled {label:?} in {locator}")]
    OptionNotFound { locator: String, label: String },

    #[error("arrival quantity {raw:?} for market {market:?} is not a number")]
    QuantityParse { market: String, raw: String },

    #[error("unexpected page structure: {0}")]
    UnexpectedPage(String),

    #[error("arrival columns do not line up ({markets} markets, {quantities} quantities)")]
    MisalignedArrivals { markets: usize, quantities: usize },

    #[error("browser command failed: {0}")]
    Browser(String),

    #[error("could not start browser session: {0}")]
    Launch(String),
}

impl ScrapeError {
    /// Whether retrying the same unit of work could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ScrapeError::ElementNotFound { .. }
            | ScrapeError::UnexpectedPage(_)
            | ScrapeError::Browser(_)
            | ScrapeError::Launch(_) => true,
            ScrapeError::OptionNotFound { .. }
            | ScrapeError::QuantityParse { .. }
            | ScrapeError::MisalignedArrivals { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ScrapeError::ElementNotFound { locator: "id=x".into() }.is_transient());
        assert!(ScrapeError::Browser("socket closed".into()).is_transient());
        assert!(
            !ScrapeError::OptionNotFound { locator: "id=ddlState".into(), label: "Atlantis".into() }
                .is_transient()
        );
        assert!(!ScrapeError::MisalignedArrivals { markets: 3, quantities: 2 }.is_transient());
    }

    #[test]
    fn test_display_names_the_label() {
        let e = ScrapeError::OptionNotFound { locator: "id=ddlCommodity".into(), label: "Kinnow".into() };
        assert_eq!(e.to_string(), "no option labelled \"Kinnow\" in id=ddlCommodity");
    }
}

use core::error::Error;
use core::fmt;

use css_ext_stylesheet::StylesheetError;

/// Why an engine could not be constructed.
#[derive(Debug)]
pub enum ExtCssError {
    /// Neither a stylesheet nor a rule list was configured.
    NoRuleSource,
    Stylesheet(StylesheetError),
}

impl fmt::Display for ExtCssError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleSource => {
                formatter.write_str("either a stylesheet or a list of css rules is required")
            }
            Self::Stylesheet(err) => write!(formatter, "invalid stylesheet: {err}"),
        }
    }
}

impl Error for ExtCssError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoRuleSource => None,
            Self::Stylesheet(err) => Some(err),
        }
    }
}

impl From<StylesheetError> for ExtCssError {
    fn from(err: StylesheetError) -> Self {
        Self::Stylesheet(err)
    }
}

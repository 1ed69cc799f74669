use crate::domain::validation::InvalidInput;

/// UI surface a newsletter signup came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SignupSource {
    Footer,
    Popup,
    Sidebar,
    Homepage,
    Blog,
    ProductPage,
    #[default]
    Website,
}

impl SignupSource {
    pub const ALL: [SignupSource; 7] = [
        SignupSource::Footer,
        SignupSource::Popup,
        SignupSource::Sidebar,
        SignupSource::Homepage,
        SignupSource::Blog,
        SignupSource::ProductPage,
        SignupSource::Website,
    ];

    /// Case-sensitive, unknown values are rejected rather than coerced.
    pub fn parse(source: &str) -> Result<SignupSource, InvalidInput> {
        SignupSource::ALL
            .into_iter()
            .find(|candidate| candidate.as_ref() == source)
            .ok_or_else(|| InvalidInput::new(format!("{} is not a valid signup source", source)))
    }
}

impl AsRef<str> for SignupSource {
    fn as_ref(&self) -> &str {
        match self {
            SignupSource::Footer => "footer",
            SignupSource::Popup => "popup",
            SignupSource::Sidebar => "sidebar",
            SignupSource::Homepage => "homepage",
            SignupSource::Blog => "blog",
            SignupSource::ProductPage => "product-page",
            SignupSource::Website => "website",
        }
    }
}

impl TryFrom<String> for SignupSource {
    type Error = InvalidInput;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SignupSource::parse(&value)
    }
}

impl From<SignupSource> for String {
    fn from(source: SignupSource) -> Self {
        source.as_ref().to_string()
    }
}

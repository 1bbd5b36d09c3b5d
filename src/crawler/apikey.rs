use std::{borrow::Borrow, fmt};

/// What a documentation ID names, from its one-letter prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiKind {
    /// `N:`
    Namespace,
    /// `T:`
    Type,
    /// `M:`, constructors and accessors included
    Method,
    /// `F:`
    Field,
    /// `P:`
    Property,
    /// `E:`
    Event,
}

impl ApiKind {
    /// The prefix letter.
    #[must_use]
    pub fn tag(self) -> char {
        match self {
            ApiKind::Namespace => 'N',
            ApiKind::Type => 'T',
            ApiKind::Method => 'M',
            ApiKind::Field => 'F',
            ApiKind::Property => 'P',
            ApiKind::Event => 'E',
        }
    }

    fn from_tag(tag: u8) -> Option<ApiKind> {
        match tag {
            b'N' => Some(ApiKind::Namespace),
            b'T' => Some(ApiKind::Type),
            b'M' => Some(ApiKind::Method),
            b'F' => Some(ApiKind::Field),
            b'P' => Some(ApiKind::Property),
            b'E' => Some(ApiKind::Event),
            _ => None,
        }
    }
}

/// The canonical documentation ID of a type or member, e.g. `M:System.Console.WriteLine(System.String)`.
///
/// Keys compare and hash by their text only. A key can be looked up in a set by `&str`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a documentation ID. The text is not validated.
    #[must_use]
    pub fn new(documentation_id: impl Into<String>) -> Self {
        ApiKey(documentation_id.into())
    }

    /// The documentation ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The kind named by the `X:` prefix, `None` if the key has no known prefix.
    #[must_use]
    pub fn kind(&self) -> Option<ApiKind> {
        match self.0.as_bytes() {
            [tag, b':', ..] => ApiKind::from_tag(*tag),
            _ => None,
        }
    }

    /// The text after the `X:` prefix; the whole key if it has none.
    #[must_use]
    pub fn name(&self) -> &str {
        if self.kind().is_some() {
            &self.0[2..]
        } else {
            &self.0
        }
    }

    /// Splits a type key into its namespace and type name at the last `.`.
    ///
    /// `None` for keys that don't name a type. The namespace is empty for types in the global
    /// namespace.
    #[must_use]
    pub fn split_type_name(&self) -> Option<(&str, &str)> {
        if self.kind() != Some(ApiKind::Type) {
            return None;
        }

        let name = self.name();
        let generic_start = name.find('{').unwrap_or(name.len());
        match name[..generic_start].rfind('.') {
            Some(dot) => Some((&name[..dot], &name[dot + 1..])),
            None => Some(("", name)),
        }
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ApiKey {
    fn from(value: String) -> Self {
        ApiKey(value)
    }
}

impl From<&str> for ApiKey {
    fn from(value: &str) -> Self {
        ApiKey(value.to_string())
    }
}

impl AsRef<str> for ApiKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ApiKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

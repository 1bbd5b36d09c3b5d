//! Target framework monikers.
//!
//! Package folders name frameworks by their short form (`lib/net472/`, `lib/net8.0-windows/`)
//! while the `TargetFrameworkAttribute` of a module carries the long form
//! (`.NETCoreApp,Version=v8.0`). Both parse into a [`TargetFramework`].

use std::fmt;

/// The family of a target framework.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrameworkIdentifier {
    /// `.NETFramework` (`net472`)
    NetFramework,
    /// `.NETCoreApp` (`netcoreapp3.1`, `net8.0`)
    NetCoreApp,
    /// `.NETStandard` (`netstandard2.0`)
    NetStandard,
    /// `.NETCore`, the Windows Store profile (`netcore45`)
    NetCore,
    /// Any other family, by its lowercase short or long name.
    Other(String),
}

impl FrameworkIdentifier {
    /// The long name used in monikers.
    #[must_use]
    pub fn full_name(&self) -> &str {
        match self {
            FrameworkIdentifier::NetFramework => ".NETFramework",
            FrameworkIdentifier::NetCoreApp => ".NETCoreApp",
            FrameworkIdentifier::NetStandard => ".NETStandard",
            FrameworkIdentifier::NetCore => ".NETCore",
            FrameworkIdentifier::Other(name) => name,
        }
    }

    fn from_full_name(name: &str) -> FrameworkIdentifier {
        match name.to_ascii_lowercase().as_str() {
            ".netframework" => FrameworkIdentifier::NetFramework,
            ".netcoreapp" => FrameworkIdentifier::NetCoreApp,
            ".netstandard" => FrameworkIdentifier::NetStandard,
            ".netcore" => FrameworkIdentifier::NetCore,
            _ => FrameworkIdentifier::Other(name.to_string()),
        }
    }
}

/// A four-part framework version. Ordering is component-wise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameworkVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Build component.
    pub build: u32,
    /// Revision component.
    pub revision: u32,
}

impl FrameworkVersion {
    /// `major.minor.0.0`
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        FrameworkVersion {
            major,
            minor,
            build: 0,
            revision: 0,
        }
    }

    /// Parses `4.7.2` or `v4.7.2`; one to four components.
    fn parse_dotted(text: &str) -> Option<FrameworkVersion> {
        let text = text.strip_prefix(['v', 'V']).unwrap_or(text);
        let mut parts = [0u32; 4];
        let mut count = 0;

        for part in text.split('.') {
            if count == 4 {
                return None;
            }
            parts[count] = part.parse().ok()?;
            count += 1;
        }

        Some(FrameworkVersion {
            major: parts[0],
            minor: parts[1],
            build: parts[2],
            revision: parts[3],
        })
    }

    /// Parses the compact form of short names, one digit per component: `472` is `4.7.2`.
    fn parse_compact(text: &str) -> Option<FrameworkVersion> {
        if text.is_empty() {
            return Some(FrameworkVersion::default());
        }
        if text.len() > 4 || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let mut parts = [0u32; 4];
        for (slot, digit) in parts.iter_mut().zip(text.bytes()) {
            *slot = u32::from(digit - b'0');
        }

        Some(FrameworkVersion {
            major: parts[0],
            minor: parts[1],
            build: parts[2],
            revision: parts[3],
        })
    }

    fn components(&self) -> [u32; 4] {
        [self.major, self.minor, self.build, self.revision]
    }

    /// The components without trailing zeros, keeping at least `minimum`.
    fn significant(&self, minimum: usize) -> &'static [usize] {
        const LENGTHS: [&[usize]; 5] = [&[], &[0], &[0, 1], &[0, 1, 2], &[0, 1, 2, 3]];
        let mut len = 4;
        while len > minimum && self.components()[len - 1] == 0 {
            len -= 1;
        }
        LENGTHS[len]
    }

    fn dotted(&self, minimum: usize) -> String {
        let components = self.components();
        self.significant(minimum)
            .iter()
            .map(|index| components[*index].to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for FrameworkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted(2))
    }
}

/// A specific target framework, e.g. `net8.0` or `.NETFramework,Version=v4.7.2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetFramework {
    /// The framework family.
    pub identifier: FrameworkIdentifier,
    /// The framework version.
    pub version: FrameworkVersion,
    /// The OS suffix of `net5.0` and later, e.g. `windows` in `net6.0-windows`.
    pub platform: Option<String>,
}

impl TargetFramework {
    /// A framework without platform.
    #[must_use]
    pub fn new(identifier: FrameworkIdentifier, version: FrameworkVersion) -> Self {
        TargetFramework {
            identifier,
            version,
            platform: None,
        }
    }

    /// Parses a short folder name (`net472`, `netstandard2.0`, `net5.0-windows`) or a full
    /// moniker (`.NETCoreApp,Version=v8.0`).
    ///
    /// `None` for text that is not a single specific framework, such as `portable-net45+win8`
    /// or `any`.
    #[must_use]
    pub fn parse(text: &str) -> Option<TargetFramework> {
        let text = text.trim();
        if text.starts_with('.') || text.contains(',') {
            Self::parse_full_name(text)
        } else {
            Self::parse_short_name(text)
        }
    }

    fn parse_full_name(text: &str) -> Option<TargetFramework> {
        let mut parts = text.split(',').map(str::trim);
        let identifier = parts.next().filter(|name| !name.is_empty())?;

        let mut version = None;
        for part in parts {
            if let Some((key, value)) = part.split_once('=') {
                if key.trim().eq_ignore_ascii_case("version") {
                    version = Some(FrameworkVersion::parse_dotted(value.trim())?);
                }
            }
        }

        Some(TargetFramework::new(
            FrameworkIdentifier::from_full_name(identifier),
            version?,
        ))
    }

    fn parse_short_name(text: &str) -> Option<TargetFramework> {
        let lower = text.to_ascii_lowercase();
        if lower.contains('+') {
            return None;
        }

        let (name, platform) = match lower.split_once('-') {
            Some((name, platform)) if !platform.is_empty() => (name, Some(platform.to_string())),
            Some(_) => return None,
            None => (lower.as_str(), None),
        };

        let digits = name
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(name.len());
        let (family, version) = name.split_at(digits);
        if family.is_empty() {
            return None;
        }

        let version = if version.contains('.') {
            FrameworkVersion::parse_dotted(version)?
        } else {
            FrameworkVersion::parse_compact(version)?
        };

        let identifier = match family {
            "net" if version.major >= 5 => FrameworkIdentifier::NetCoreApp,
            "net" => FrameworkIdentifier::NetFramework,
            "netcoreapp" => FrameworkIdentifier::NetCoreApp,
            "netstandard" => FrameworkIdentifier::NetStandard,
            "netcore" => FrameworkIdentifier::NetCore,
            _ if family.bytes().all(|b| b.is_ascii_alphabetic())
                && version != FrameworkVersion::default() =>
            {
                FrameworkIdentifier::Other(family.to_string())
            }
            _ => return None,
        };

        if platform.is_some()
            && !(identifier == FrameworkIdentifier::NetCoreApp && version.major >= 5)
        {
            return None;
        }

        Some(TargetFramework {
            identifier,
            version,
            platform,
        })
    }

    /// The folder name form, e.g. `net472`, `netcoreapp3.1`, `net8.0-windows`.
    #[must_use]
    pub fn short_name(&self) -> String {
        let compact = || {
            let components = self.version.components();
            self.version
                .significant(2)
                .iter()
                .map(|index| components[*index].to_string())
                .collect::<String>()
        };

        let mut name = match &self.identifier {
            FrameworkIdentifier::NetFramework => format!("net{}", compact()),
            FrameworkIdentifier::NetCore => format!("netcore{}", compact()),
            FrameworkIdentifier::NetCoreApp if self.version.major >= 5 => {
                format!("net{}", self.version.dotted(2))
            }
            FrameworkIdentifier::NetCoreApp => format!("netcoreapp{}", self.version.dotted(2)),
            FrameworkIdentifier::NetStandard => format!("netstandard{}", self.version.dotted(2)),
            FrameworkIdentifier::Other(family) => format!("{family}{}", self.version.dotted(2)),
        };

        if let Some(platform) = &self.platform {
            name.push('-');
            name.push_str(platform);
        }
        name
    }

    /// The moniker form, e.g. `.NETFramework,Version=v4.7.2`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!(
            "{},Version=v{}",
            self.identifier.full_name(),
            self.version.dotted(2)
        )
    }

    /// Returns `true` for `.NETCoreApp` or `.NETCore` at or above `major.minor`.
    #[must_use]
    pub fn is_net_core_at_least(&self, major: u32, minor: u32) -> bool {
        matches!(
            self.identifier,
            FrameworkIdentifier::NetCoreApp | FrameworkIdentifier::NetCore
        ) && self.version >= FrameworkVersion::new(major, minor)
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

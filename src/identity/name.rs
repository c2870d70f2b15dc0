//! Module reference names, versions and architectures.
//!
//! A [`ModuleName`] is what a resolution request carries and what every loaded module
//! reports about itself. Only the simple name takes part in the consistency check that
//! guards the resolution pipeline; version and culture are used when probing already
//! bound modules through [`ModuleName::satisfies`].
//!
//! # Display Name Format
//!
//! ```text
//! Name[, Version=Major.Minor.Build.Revision][, Culture=culture][, PublicKeyToken=token][, ProcessorArchitecture=arch]
//! ```
//!
//! `Culture=neutral` and `PublicKeyToken=null` parse to `None`. Unknown keys are ignored
//! so that names produced by other tools still round-trip through the simple name.

use std::{fmt, fmt::Write as _, str::FromStr};

use crate::{identity::PublicKeyToken, Error, Result};

/// A reference to a module: simple name plus version and identity metadata.
///
/// # Examples
///
/// ```rust,ignore
/// use alcove::identity::{ModuleName, ModuleVersion};
///
/// let name = ModuleName::new("MyLibrary", ModuleVersion::new(1, 0, 0, 0))
///     .with_culture("en-US");
/// assert_eq!(
///     name.display_name(),
///     "MyLibrary, Version=1.0.0.0, Culture=en-US, PublicKeyToken=null"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleName {
    /// Simple module name (e.g. "Plugin.Core").
    ///
    /// Compared case-insensitively wherever two names are matched.
    pub name: String,

    /// Four-part version number.
    ///
    /// [`ModuleVersion::UNKNOWN`] on a request means "any version".
    pub version: ModuleVersion,

    /// Culture of a localized module; `None` for culture-neutral modules.
    pub culture: Option<String>,

    /// Strong name token, if the module is strong-named.
    pub public_key_token: Option<PublicKeyToken>,

    /// Target processor architecture, if the module is architecture specific.
    pub processor_architecture: Option<ProcessorArchitecture>,
}

/// Four-part version numbering (major.minor.build.revision).
///
/// Versions are compared component-wise in order: major, minor, build, revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleVersion {
    /// Major version component.
    pub major: u16,
    /// Minor version component.
    pub minor: u16,
    /// Build version component.
    pub build: u16,
    /// Revision version component.
    pub revision: u16,
}

/// Processor architecture qualifier of a module.
///
/// Both "AMD64" and "x64" are accepted when parsing; the canonical display name is
/// "AMD64".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorArchitecture {
    /// Architecture neutral.
    MSIL,
    /// 32-bit x86.
    X86,
    /// Itanium.
    IA64,
    /// 64-bit x86-64.
    AMD64,
    /// 32-bit ARM.
    ARM,
    /// 64-bit ARM.
    ARM64,
}

impl ModuleName {
    /// Create a culture-neutral, non-strong-named module reference.
    ///
    /// # Arguments
    ///
    /// * `name` - Simple module name
    /// * `version` - Four-part version number
    pub fn new(name: impl Into<String>, version: ModuleVersion) -> Self {
        Self {
            name: name.into(),
            version,
            culture: None,
            public_key_token: None,
            processor_architecture: None,
        }
    }

    /// Create a reference that only carries a simple name, accepting any version.
    pub fn simple(name: impl Into<String>) -> Self {
        Self::new(name, ModuleVersion::UNKNOWN)
    }

    /// Set the culture of this reference. `"neutral"` clears it.
    #[must_use]
    pub fn with_culture(mut self, culture: impl Into<String>) -> Self {
        let culture = culture.into();
        self.culture = if culture.eq_ignore_ascii_case("neutral") {
            None
        } else {
            Some(culture)
        };
        self
    }

    /// Set the strong name token of this reference.
    #[must_use]
    pub fn with_public_key_token(mut self, token: PublicKeyToken) -> Self {
        self.public_key_token = Some(token);
        self
    }

    /// Set the processor architecture of this reference.
    #[must_use]
    pub fn with_architecture(mut self, arch: ProcessorArchitecture) -> Self {
        self.processor_architecture = Some(arch);
        self
    }

    /// Parse a module reference from its display name.
    ///
    /// # Arguments
    ///
    /// * `display_name` - Display name string to parse
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use alcove::identity::ModuleName;
    ///
    /// let simple = ModuleName::parse("MyLibrary")?;
    /// let full = ModuleName::parse(
    ///     "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089"
    /// )?;
    /// # Ok::<(), alcove::Error>(())
    /// ```
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] if the simple name is empty or a recognised
    /// component has an invalid value.
    pub fn parse(display_name: &str) -> Result<Self> {
        let mut parts = display_name.split(',').map(str::trim);

        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(malformed_error!("Module name cannot be empty"));
        }

        let mut result = Self::simple(name);
        for part in parts {
            let Some((key, value)) = part.split_once('=') else {
                return Err(malformed_error!("Expected 'Key=Value', found '{}'", part));
            };

            match key.trim() {
                "Version" => result.version = ModuleVersion::parse(value.trim())?,
                "Culture" => result = result.with_culture(value.trim()),
                "PublicKeyToken" => {
                    let value = value.trim();
                    if value != "null" && !value.is_empty() {
                        result.public_key_token = Some(PublicKeyToken::parse(value)?);
                    }
                }
                "ProcessorArchitecture" => {
                    result.processor_architecture = Some(ProcessorArchitecture::parse(value)?);
                }
                _ => {}
            }
        }

        Ok(result)
    }

    /// Render the display name of this reference.
    ///
    /// Culture and token are always present (as `neutral` / `null` when unset); the
    /// architecture is only emitted when specified.
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut result = String::with_capacity(self.name.len() + 80);

        result.push_str(&self.name);
        let _ = write!(result, ", Version={}", self.version);
        let _ = write!(
            result,
            ", Culture={}",
            self.culture.as_deref().unwrap_or("neutral")
        );

        match &self.public_key_token {
            Some(token) => {
                let _ = write!(result, ", PublicKeyToken={}", token);
            }
            None => result.push_str(", PublicKeyToken=null"),
        }

        if let Some(arch) = &self.processor_architecture {
            let _ = write!(result, ", ProcessorArchitecture={}", arch);
        }

        result
    }

    /// The simple name of this reference.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive comparison against a simple name.
    #[must_use]
    pub fn has_simple_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// The key under which modules of this name are indexed inside a context.
    pub(crate) fn key(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// Whether this module can be bound in place of `required`.
    ///
    /// The simple name must match case-insensitively, the culture exactly, and the
    /// version must be compatible (see [`ModuleVersion::is_compatible_with`]). When the
    /// request carries a public key token, this name must carry the same one.
    #[must_use]
    pub fn satisfies(&self, required: &ModuleName) -> bool {
        if !self.has_simple_name(&required.name) {
            return false;
        }

        if self.culture != required.culture {
            return false;
        }

        if required.public_key_token.is_some() && self.public_key_token != required.public_key_token
        {
            return false;
        }

        self.version.is_compatible_with(&required.version)
    }
}

impl ModuleVersion {
    /// Version 0.0.0.0, used on requests to accept any version.
    pub const UNKNOWN: Self = Self {
        major: 0,
        minor: 0,
        build: 0,
        revision: 0,
    };

    /// Create a new version from its four components.
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Whether this is [`ModuleVersion::UNKNOWN`].
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        self.major == 0 && self.minor == 0 && self.build == 0 && self.revision == 0
    }

    /// Whether a module of this version can satisfy a request for `required`.
    ///
    /// An unknown requirement accepts everything. Otherwise the major versions must
    /// match and this version must be greater than or equal to the requirement.
    #[must_use]
    pub fn is_compatible_with(&self, required: &ModuleVersion) -> bool {
        if required.is_unknown() {
            return true;
        }

        self.major == required.major && *self >= *required
    }

    /// Parse a version string with one to four dot separated components.
    ///
    /// Missing components default to 0.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] for empty strings, more than four components or
    /// components that do not fit into 16 bits.
    pub fn parse(version_str: &str) -> Result<Self> {
        let parts: Vec<&str> = version_str.split('.').collect();

        if parts.len() > 4 {
            return Err(malformed_error!("Invalid version format: {}", version_str));
        }

        let mut components = [0u16; 4];
        for (i, part) in parts.iter().enumerate() {
            components[i] = part
                .parse::<u16>()
                .map_err(|_| malformed_error!("Invalid version component: '{}'", part))?;
        }

        Ok(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}

impl ProcessorArchitecture {
    /// Parse an architecture name, case-insensitively.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] for unknown names.
    pub fn parse(arch_str: &str) -> Result<Self> {
        match arch_str.trim().to_ascii_lowercase().as_str() {
            "msil" => Ok(Self::MSIL),
            "x86" => Ok(Self::X86),
            "ia64" => Ok(Self::IA64),
            "amd64" | "x64" => Ok(Self::AMD64),
            "arm" => Ok(Self::ARM),
            "arm64" => Ok(Self::ARM64),
            _ => Err(malformed_error!(
                "Unknown processor architecture: '{}'",
                arch_str.trim()
            )),
        }
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl fmt::Display for ProcessorArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arch_str = match self {
            Self::MSIL => "MSIL",
            Self::X86 => "x86",
            Self::IA64 => "IA64",
            Self::AMD64 => "AMD64",
            Self::ARM => "ARM",
            Self::ARM64 => "ARM64",
        };
        write!(f, "{}", arch_str)
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for ModuleVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromStr for ModuleName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromStr for ProcessorArchitecture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

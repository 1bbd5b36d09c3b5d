//! Best-effort resolution of enum underlying types.
//!
//! An enum argument in an attribute blob is stored as a bare integer, with nothing in the blob
//! saying how wide it is. The width is the underlying type of the enum, which usually lives in
//! another assembly. Lookups go through the [`EnumResolver`] trait; both ways an enum can be
//! named (a `TypeRef` in the constructor signature, or an assembly-qualified name in a named
//! argument) end up as an [`EnumTypeName`].

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::DashMap;
use sha1::{Digest, Sha1};

use crate::{
    file::parser::Parser,
    metadata::{
        reader::ModuleReader,
        signatures::{PrimitiveTypeCode, SignatureHeader, SignatureKind},
        tables::{AssemblyRefRaw, TableId, TypeDefRaw, TypeRefRaw},
    },
    Result,
};

/// Where an enum is defined and what it is called. All assembly parts are hints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumTypeName {
    /// Simple name of the defining assembly.
    pub assembly: String,
    /// Culture of the defining assembly; `None` for neutral.
    pub culture: Option<String>,
    /// Public key token of the defining assembly.
    pub public_key_token: Option<[u8; 8]>,
    /// Namespace of the outermost type, possibly empty.
    pub namespace: String,
    /// Name of the outermost type.
    pub name: String,
    /// Name of the enum when it is nested in `name`.
    pub nested: Option<String>,
}

impl EnumTypeName {
    /// The name as reflection spells it: `Namespace.Outer+Inner`.
    #[must_use]
    pub fn full_name(&self) -> String {
        let mut full = if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        };

        if let Some(nested) = &self.nested {
            full.push('+');
            full.push_str(nested);
        }

        full
    }

    /// Builds the name of a referenced type from its resolution scope chain.
    ///
    /// Returns `None` unless the type, or the type it is nested in, is scoped to an assembly
    /// reference.
    ///
    /// # Errors
    ///
    /// Returns an error if a row or heap entry of the chain is malformed.
    pub fn from_type_ref(reader: &ModuleReader, typeref: &TypeRefRaw) -> Result<Option<EnumTypeName>> {
        let (outer, nested) = if typeref.resolution_scope.tag == TableId::TypeRef {
            let parent = reader.row::<TypeRefRaw>(typeref.resolution_scope.row)?;
            (parent, Some(reader.string(typeref.type_name)?.to_string()))
        } else {
            (typeref.clone(), None)
        };

        if outer.resolution_scope.tag != TableId::AssemblyRef {
            return Ok(None);
        }

        let assembly_ref = reader.row::<AssemblyRefRaw>(outer.resolution_scope.row)?;
        let culture = reader.string(assembly_ref.culture)?;
        let key = reader.blob(assembly_ref.public_key_or_token)?;

        let public_key_token = if assembly_ref.has_full_public_key() && !key.is_empty() {
            Some(public_key_token(key))
        } else {
            <[u8; 8]>::try_from(key).ok()
        };

        Ok(Some(EnumTypeName {
            assembly: reader.string(assembly_ref.name)?.to_string(),
            culture: (!culture.is_empty()).then(|| culture.to_string()),
            public_key_token,
            namespace: reader.string(outer.type_namespace)?.to_string(),
            name: reader.string(outer.type_name)?.to_string(),
            nested,
        }))
    }

    /// Parses an assembly-qualified type name such as
    /// `System.AttributeTargets, System.Runtime, Version=8.0.0.0, Culture=neutral,
    /// PublicKeyToken=b03f5f7f11d50a3a`.
    ///
    /// Returns `None` for names without an assembly, for generic, array, pointer and by-ref
    /// types, and for types nested more than one level deep.
    #[must_use]
    pub fn parse(assembly_qualified: &str) -> Option<EnumTypeName> {
        let (type_part, assembly_part) = assembly_qualified.split_once(',')?;
        let type_part = type_part.trim();

        if type_part.is_empty() || type_part.contains(|c: char| matches!(c, '[' | ']' | '*' | '&' | '`' | '\\')) {
            return None;
        }

        let mut segments = type_part.split('+');
        let outer = segments.next()?;
        let nested = segments.next().map(str::to_string);
        if segments.next().is_some() || nested.as_deref() == Some("") {
            return None;
        }

        let (namespace, name) = match outer.rsplit_once('.') {
            Some((namespace, name)) => (namespace.to_string(), name.to_string()),
            None => (String::new(), outer.to_string()),
        };
        if name.is_empty() {
            return None;
        }

        let mut properties = assembly_part.split(',').map(str::trim);
        let assembly = properties.next().filter(|name| !name.is_empty())?.to_string();

        let mut culture = None;
        let mut public_key_token = None;
        for property in properties {
            let Some((key, value)) = property.split_once('=') else {
                continue;
            };

            match key.trim() {
                "Culture" if !value.trim().eq_ignore_ascii_case("neutral") => {
                    culture = Some(value.trim().to_string());
                }
                "PublicKeyToken" => public_key_token = parse_token(value.trim()),
                _ => {}
            }
        }

        Some(EnumTypeName {
            assembly,
            culture,
            public_key_token,
            namespace,
            name,
            nested,
        })
    }
}

impl fmt::Display for EnumTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.full_name(), self.assembly)
    }
}

/// The last 8 bytes of the SHA-1 of a public key, reversed.
fn public_key_token(key: &[u8]) -> [u8; 8] {
    let hash = Sha1::digest(key);
    let mut token = [0u8; 8];
    for (slot, byte) in token.iter_mut().zip(hash.iter().rev()) {
        *slot = *byte;
    }
    token
}

fn parse_token(text: &str) -> Option<[u8; 8]> {
    if text.len() != 16 || !text.is_ascii() {
        return None;
    }

    let mut token = [0u8; 8];
    for (index, slot) in token.iter_mut().enumerate() {
        *slot = u8::from_str_radix(&text[index * 2..index * 2 + 2], 16).ok()?;
    }
    Some(token)
}

/// Looks up the underlying type of an enum defined outside the module being crawled.
///
/// Implementations must be safe to share between the workers of a package crawl.
pub trait EnumResolver: Send + Sync {
    /// The underlying integral type of `name`, or `None` if unknown.
    fn underlying_type(&self, name: &EnumTypeName) -> Option<PrimitiveTypeCode>;
}

/// A fixed table of enums, keyed by assembly simple name and full type name.
///
/// ```rust
/// use usagescope::metadata::customattributes::{EnumResolver, EnumTypeName, FixedEnumResolver};
/// use usagescope::metadata::signatures::PrimitiveTypeCode;
///
/// let resolver = FixedEnumResolver::new()
///     .with("System.Runtime", "System.AttributeTargets", PrimitiveTypeCode::Int32);
///
/// let name = EnumTypeName::parse("System.AttributeTargets, System.Runtime").unwrap();
/// assert_eq!(resolver.underlying_type(&name), Some(PrimitiveTypeCode::Int32));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FixedEnumResolver {
    entries: HashMap<(String, String), PrimitiveTypeCode>,
}

impl FixedEnumResolver {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `full_name` (`Namespace.Outer+Inner`) in `assembly` with underlying type `code`.
    #[must_use]
    pub fn with(mut self, assembly: &str, full_name: &str, code: PrimitiveTypeCode) -> Self {
        self.insert(assembly, full_name, code);
        self
    }

    /// Adds `full_name` (`Namespace.Outer+Inner`) in `assembly` with underlying type `code`.
    pub fn insert(&mut self, assembly: &str, full_name: &str, code: PrimitiveTypeCode) {
        self.entries
            .insert((assembly.to_string(), full_name.to_string()), code);
    }
}

impl EnumResolver for FixedEnumResolver {
    fn underlying_type(&self, name: &EnumTypeName) -> Option<PrimitiveTypeCode> {
        self.entries
            .get(&(name.assembly.clone(), name.full_name()))
            .copied()
    }
}

type EnumIndex = HashMap<String, PrimitiveTypeCode>;

/// Finds referenced assemblies as `<name>.dll` in a list of directories and reads their enum
/// definitions with [`ModuleReader`].
///
/// Each assembly is opened at most once. The outcome, including "not found" and "not a
/// module", is cached per assembly name for the lifetime of the resolver.
pub struct AssemblyDirectoryResolver {
    probe_paths: Vec<PathBuf>,
    cache: DashMap<String, Option<Arc<EnumIndex>>>,
}

impl AssemblyDirectoryResolver {
    /// Creates a resolver probing `probe_paths` in order.
    #[must_use]
    pub fn new(probe_paths: Vec<PathBuf>) -> Self {
        AssemblyDirectoryResolver {
            probe_paths,
            cache: DashMap::new(),
        }
    }

    /// The directories probed, in order.
    #[must_use]
    pub fn probe_paths(&self) -> &[PathBuf] {
        &self.probe_paths
    }

    fn index(&self, assembly: &str) -> Option<Arc<EnumIndex>> {
        let key = assembly.to_ascii_lowercase();
        if let Some(entry) = self.cache.get(&key) {
            return entry.value().clone();
        }

        let index = self.load(assembly).map(Arc::new);
        self.cache.entry(key).or_insert(index).value().clone()
    }

    fn load(&self, assembly: &str) -> Option<EnumIndex> {
        let path = self
            .probe_paths
            .iter()
            .map(|dir| dir.join(format!("{assembly}.dll")))
            .find(|path| path.is_file())?;

        match index_file(&path) {
            Ok(index) => Some(index),
            Err(error) => {
                log::debug!("Cannot index enums of {}: {error}", path.display());
                None
            }
        }
    }
}

impl EnumResolver for AssemblyDirectoryResolver {
    fn underlying_type(&self, name: &EnumTypeName) -> Option<PrimitiveTypeCode> {
        let found = self.index(&name.assembly)?.get(&name.full_name()).copied();
        if found.is_none() {
            log::debug!("Unresolved enum {name}");
        }
        found
    }
}

fn index_file(path: &Path) -> Result<EnumIndex> {
    let reader = ModuleReader::from_file(path)?;
    enum_index(&reader)
}

/// Every enum defined in a module, by full name, nested enums one level deep included.
///
/// # Errors
///
/// Returns an error if a type definition or one of its fields is malformed.
pub fn enum_index(reader: &ModuleReader) -> Result<HashMap<String, PrimitiveTypeCode>> {
    let mut index = HashMap::new();

    for typedef in reader.type_defs().iter() {
        let typedef = typedef?;
        let Some(code) = local_enum_underlying_type(reader, &typedef)? else {
            continue;
        };

        let name = reader.string(typedef.type_name)?;
        let full_name = match reader.declaring_type(typedef.rid) {
            Some(outer) => {
                let outer = reader.row::<TypeDefRaw>(outer)?;
                if reader.declaring_type(outer.rid).is_some() {
                    continue;
                }
                format!("{}+{name}", qualified_name(reader, &outer)?)
            }
            None => qualified_name(reader, &typedef)?,
        };

        index.insert(full_name, code);
    }

    Ok(index)
}

fn qualified_name(reader: &ModuleReader, typedef: &TypeDefRaw) -> Result<String> {
    let namespace = reader.string(typedef.type_namespace)?;
    let name = reader.string(typedef.type_name)?;
    Ok(if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    })
}

/// The underlying type of an enum defined in this module: the type of its `value__` field.
///
/// Returns `None` for types without such a field or with a non-integral one.
///
/// # Errors
///
/// Returns an error if a field row, its name or its signature cannot be read.
pub fn local_enum_underlying_type(
    reader: &ModuleReader,
    typedef: &TypeDefRaw,
) -> Result<Option<PrimitiveTypeCode>> {
    for field in reader.fields(typedef)? {
        if reader.string(field.name)? != "value__" {
            continue;
        }

        let mut parser = Parser::new(reader.blob(field.signature)?);
        if SignatureHeader(parser.read_le::<u8>()?).kind() != SignatureKind::Field {
            return Ok(None);
        }

        let code = PrimitiveTypeCode::from_element_type(parser.read_le::<u8>()?);
        return Ok(code.filter(|code| {
            matches!(
                code,
                PrimitiveTypeCode::SByte
                    | PrimitiveTypeCode::Byte
                    | PrimitiveTypeCode::Int16
                    | PrimitiveTypeCode::UInt16
                    | PrimitiveTypeCode::Int32
                    | PrimitiveTypeCode::UInt32
                    | PrimitiveTypeCode::Int64
                    | PrimitiveTypeCode::UInt64
            )
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::ModuleBuilder;

    #[test]
    fn parses_assembly_qualified_names() {
        let name = EnumTypeName::parse(
            "System.Diagnostics.DebuggableAttribute+DebuggingModes, System.Runtime, \
             Version=8.0.0.0, Culture=neutral, PublicKeyToken=b03f5f7f11d50a3a",
        )
        .unwrap();

        assert_eq!(name.assembly, "System.Runtime");
        assert_eq!(name.namespace, "System.Diagnostics");
        assert_eq!(name.name, "DebuggableAttribute");
        assert_eq!(name.nested.as_deref(), Some("DebuggingModes"));
        assert_eq!(name.culture, None);
        assert_eq!(
            name.public_key_token,
            Some([0xb0, 0x3f, 0x5f, 0x7f, 0x11, 0xd5, 0x0a, 0x3a])
        );
        assert_eq!(
            name.full_name(),
            "System.Diagnostics.DebuggableAttribute+DebuggingModes"
        );

        let plain = EnumTypeName::parse("Color, Lib, Culture=de-DE, PublicKeyToken=null").unwrap();
        assert_eq!(plain.namespace, "");
        assert_eq!(plain.culture.as_deref(), Some("de-DE"));
        assert_eq!(plain.public_key_token, None);
    }

    #[test]
    fn rejects_unsupported_names() {
        assert!(EnumTypeName::parse("System.AttributeTargets").is_none());
        assert!(EnumTypeName::parse("A+B+C, Lib").is_none());
        assert!(EnumTypeName::parse("List`1[[System.Int32]], Lib").is_none());
        assert!(EnumTypeName::parse("Color[], Lib").is_none());
        assert!(EnumTypeName::parse("Color, ").is_none());
    }

    #[test]
    fn public_key_tokens() {
        // The ECMA key's token is the well-known b77a5c561934e089.
        let ecma_key = [0u8, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            public_key_token(&ecma_key),
            [0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89]
        );
        assert_eq!(parse_token("b77a5c561934e089"), Some([0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89]));
        assert_eq!(parse_token("xyz"), None);
    }

    #[test]
    fn fixed_resolver() {
        let resolver = FixedEnumResolver::new().with("Lib", "Ns.Outer+Mode", PrimitiveTypeCode::Byte);

        let nested = EnumTypeName::parse("Ns.Outer+Mode, Lib").unwrap();
        assert_eq!(resolver.underlying_type(&nested), Some(PrimitiveTypeCode::Byte));

        let other_assembly = EnumTypeName::parse("Ns.Outer+Mode, Other").unwrap();
        assert_eq!(resolver.underlying_type(&other_assembly), None);
    }

    #[test]
    fn names_from_type_references() {
        let mut builder = ModuleBuilder::new("Sample");
        let targets = builder.type_ref("System", "AttributeTargets");
        let outer = builder.type_ref("System.Diagnostics", "DebuggableAttribute");
        let modes = builder.nested_type_ref(outer, "DebuggingModes");
        let reader = ModuleReader::open(builder.build()).unwrap();

        let name = |token: crate::metadata::token::Token| {
            let typeref = reader.row::<TypeRefRaw>(token.row()).unwrap();
            EnumTypeName::from_type_ref(&reader, &typeref).unwrap().unwrap()
        };

        let targets = name(targets);
        assert_eq!(targets.full_name(), "System.AttributeTargets");
        assert_eq!(targets.assembly, "System.Runtime");

        assert_eq!(
            name(modes).full_name(),
            "System.Diagnostics.DebuggableAttribute+DebuggingModes"
        );
    }

    #[test]
    fn indexes_local_enums() {
        let mut builder = ModuleBuilder::new("Sample");
        let enum_base = builder.type_ref("System", "Enum");
        let object = builder.type_ref("System", "Object");
        let color = builder.type_def("Lib", "Color", enum_base);
        builder.field(color, "value__", &[0x06, 0x05]);
        builder.field(color, "Red", &[0x06, 0x11, 0x08]);
        let holder = builder.type_def("Lib", "Holder", object);
        let mode = builder.nested_type_def(holder, "Mode", enum_base);
        builder.field(mode, "value__", &[0x06, 0x0A]);
        let reader = ModuleReader::open(builder.build()).unwrap();

        let index = enum_index(&reader).unwrap();
        assert_eq!(index.get("Lib.Color"), Some(&PrimitiveTypeCode::Byte));
        assert_eq!(index.get("Lib.Holder+Mode"), Some(&PrimitiveTypeCode::Int64));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn directory_resolver_caches_misses() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Broken.dll"), b"not a module").unwrap();

        let resolver = AssemblyDirectoryResolver::new(vec![dir.path().to_path_buf()]);
        let name = EnumTypeName::parse("Lib.Color, Broken").unwrap();
        assert_eq!(resolver.underlying_type(&name), None);
        assert_eq!(resolver.underlying_type(&name), None);
        assert_eq!(resolver.cache.len(), 1);

        let missing = EnumTypeName::parse("Lib.Color, Missing").unwrap();
        assert_eq!(resolver.underlying_type(&missing), None);
        assert_eq!(resolver.cache.len(), 2);
    }

    #[test]
    fn directory_resolver_reads_enums() {
        let mut builder = ModuleBuilder::new("Colors");
        let enum_base = builder.type_ref("System", "Enum");
        let color = builder.type_def("Lib", "Color", enum_base);
        builder.field(color, "value__", &[0x06, 0x07]);

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Colors.dll"), builder.build()).unwrap();

        let resolver = AssemblyDirectoryResolver::new(vec![dir.path().to_path_buf()]);
        let name = EnumTypeName::parse("Lib.Color, Colors").unwrap();
        assert_eq!(resolver.underlying_type(&name), Some(PrimitiveTypeCode::UInt16));
    }
}
